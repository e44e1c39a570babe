//! Wildcard path classifier (spec §4.6): compiles a rule set into a
//! byte-driven DFA ([`dfa`]) and classifies paths against it in O(path
//! length). Rules are read in the tab-separated line format of spec §6.

pub mod dfa;

pub use dfa::Tag;

use crate::error::{CoreError, Result};
use dfa::CompiledRule;

const FIELD_COUNT: usize = 8;

/// One parsed line of the classifier's rule input.
#[derive(Debug, Clone)]
pub struct ClassifierRule {
    pub reporting_name: Box<[u8]>,
    pub reporting_root: Box<[u8]>,
    pub requestor: Box<[u8]>,
    pub faculty: Box<[u8]>,
    pub directory: Box<[u8]>,
    pub instruction: Tag,
    pub file_types_backup: Vec<Box<[u8]>>,
    pub file_types_ignore: Vec<Box<[u8]>>,
}

impl ClassifierRule {
    /// Parses one tab-separated rule line: `reporting_name`,
    /// `reporting_root`, `requestor`, `faculty`, `directory`, `instruction`
    /// (`backup`|`nobackup`|`tempbackup`), `file_types_backup`,
    /// `file_types_ignore` — the last two comma-separated.
    pub fn parse_line(line: &[u8], line_number: usize) -> Result<Self> {
        let fields: Vec<&[u8]> = line.split(|&b| b == b'\t').collect();
        if fields.len() != FIELD_COUNT {
            return Err(CoreError::MalformedRecord {
                record_number: line_number as u64,
                reason: "classifier rule has the wrong field count",
            });
        }
        let instruction = match fields[5] {
            b"backup" => Tag::Backup,
            b"nobackup" => Tag::NoBackup,
            b"tempbackup" => Tag::TempBackup,
            _ => {
                return Err(CoreError::MalformedRecord {
                    record_number: line_number as u64,
                    reason: "unrecognised classifier instruction",
                })
            }
        };
        Ok(Self {
            reporting_name: fields[0].into(),
            reporting_root: fields[1].into(),
            requestor: fields[2].into(),
            faculty: fields[3].into(),
            directory: fields[4].into(),
            instruction,
            file_types_backup: split_list(fields[6]),
            file_types_ignore: split_list(fields[7]),
        })
    }
}

fn split_list(field: &[u8]) -> Vec<Box<[u8]>> {
    if field.is_empty() {
        return Vec::new();
    }
    field.split(|&b| b == b',').map(Box::from).collect()
}

/// A compiled rule set, ready to classify paths.
pub struct Classifier {
    dfa: dfa::Dfa,
}

impl Classifier {
    /// Compiles `rules` into a DFA, in the order given. Two rules matching
    /// the same path with the same specificity fail compilation with
    /// [`CoreError::Ambiguous`].
    pub fn compile(rules: &[ClassifierRule]) -> Result<Self> {
        tracing::debug!(rule_count = rules.len(), "compiling classifier rule set");
        let compiled: Vec<CompiledRule> = rules
            .iter()
            .map(|r| CompiledRule::from_pattern(&r.directory, r.instruction))
            .collect();
        let dfa = dfa::Dfa::compile(&compiled).inspect_err(|err| {
            tracing::error!(%err, "classifier compilation failed");
        })?;
        Ok(Self { dfa })
    }

    /// Classifies `path`, returning the best-matching rule's tag, or `None`
    /// if no rule matches.
    #[must_use]
    pub fn classify(&self, path: &[u8]) -> Option<Tag> {
        self.dfa.classify(path)
    }
}
