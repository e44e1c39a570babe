//! The compiled byte-driven automaton backing the wildcard classifier
//! (spec §4.6): an NFA built from the rule set, subject to the classical
//! subset construction, producing a table-driven DFA where every byte of
//! the input advances exactly one state. State 0 is the sink (total,
//! self-looping); state 1 is the start state.

use std::collections::HashMap;

use crate::error::{CoreError, Result};

/// The terminal value a compiled rule set assigns to a matched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Backup,
    TempBackup,
    NoBackup,
    Warn,
}

#[derive(Debug, Clone, Copy)]
struct Accept {
    tag: Tag,
    specificity: usize,
    rule_index: usize,
}

struct NfaState {
    byte_edges: Vec<(u8, usize)>,
    epsilon_edges: Vec<usize>,
    wildcard_self: bool,
    accept: Option<Accept>,
}

impl NfaState {
    fn new() -> Self {
        Self {
            byte_edges: Vec::new(),
            epsilon_edges: Vec::new(),
            wildcard_self: false,
            accept: None,
        }
    }
}

/// One token of a compiled rule pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Byte(u8),
    Star,
}

/// A single rule: a pattern (bytes and `*` wildcards) plus the tag it
/// contributes when matched.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub tokens: Vec<Token>,
    pub tag: Tag,
}

impl CompiledRule {
    #[must_use]
    pub fn from_pattern(pattern: &[u8], tag: Tag) -> Self {
        let tokens = pattern
            .iter()
            .map(|&b| if b == b'*' { Token::Star } else { Token::Byte(b) })
            .collect();
        Self { tokens, tag }
    }

    fn specificity(&self) -> usize {
        self.tokens.iter().filter(|t| matches!(t, Token::Byte(_))).count()
    }
}

/// One DFA state: a total byte-to-state transition table plus an optional
/// terminal tag.
struct DfaState {
    transitions: Box<[u32; 256]>,
    tag: Option<Tag>,
}

/// The compiled classifier automaton.
pub struct Dfa {
    states: Vec<DfaState>,
}

impl Dfa {
    /// Compiles `rules` into a DFA. Rule order does not affect the result
    /// (classifier determinism, spec §8) except for which rule index is
    /// blamed in an [`CoreError::Ambiguous`] error.
    pub fn compile(rules: &[CompiledRule]) -> Result<Self> {
        let mut nfa: Vec<NfaState> = vec![NfaState::new()]; // state 0: shared start
        for (rule_index, rule) in rules.iter().enumerate() {
            // Every rule gets its own epsilon-reachable start state, even an
            // empty pattern — otherwise two empty-pattern rules would both
            // terminate on the shared state 0 and collide before subset
            // construction's ambiguity check ever sees them.
            let rule_start = nfa.len();
            nfa.push(NfaState::new());
            nfa[0].epsilon_edges.push(rule_start);
            let mut prev = rule_start;
            for token in &rule.tokens {
                match *token {
                    Token::Byte(b) => {
                        let next = nfa.len();
                        nfa.push(NfaState::new());
                        nfa[prev].byte_edges.push((b, next));
                        prev = next;
                    }
                    Token::Star => {
                        let skip = nfa.len();
                        nfa.push(NfaState::new());
                        nfa[skip].wildcard_self = true;
                        nfa[prev].epsilon_edges.push(skip);
                        prev = skip;
                    }
                }
            }
            nfa[prev].accept = Some(Accept {
                tag: rule.tag,
                specificity: rule.specificity(),
                rule_index,
            });
        }

        let epsilon_closure = |start: &[usize]| -> Vec<usize> {
            let mut seen: Vec<usize> = start.to_vec();
            let mut stack: Vec<usize> = start.to_vec();
            while let Some(s) = stack.pop() {
                for &e in &nfa[s].epsilon_edges {
                    if !seen.contains(&e) {
                        seen.push(e);
                        stack.push(e);
                    }
                }
            }
            seen.sort_unstable();
            seen.dedup();
            seen
        };

        let resolve_tag = |set: &[usize]| -> Result<Option<Tag>> {
            let mut best: Option<Accept> = None;
            let mut tie = false;
            for &s in set {
                if let Some(acc) = nfa[s].accept {
                    match &best {
                        None => best = Some(acc),
                        Some(b) if acc.specificity > b.specificity => {
                            best = Some(acc);
                            tie = false;
                        }
                        Some(b) if acc.specificity == b.specificity && acc.tag != b.tag => {
                            tie = true;
                            if acc.rule_index > b.rule_index {
                                best = Some(acc);
                            }
                        }
                        _ => {}
                    }
                }
            }
            if tie {
                return Err(CoreError::Ambiguous {
                    rule_index: best.map_or(0, |b| b.rule_index),
                });
            }
            Ok(best.map(|a| a.tag))
        };

        let mut dfa_states: Vec<DfaState> = vec![
            DfaState {
                transitions: Box::new([0u32; 256]),
                tag: None,
            }, // 0: sink
        ];
        let mut memo: HashMap<Vec<usize>, usize> = HashMap::new();
        memo.insert(Vec::new(), 0);

        let start_set = epsilon_closure(&[0]);
        let start_tag = resolve_tag(&start_set)?;
        dfa_states.push(DfaState {
            transitions: Box::new([0u32; 256]),
            tag: start_tag,
        });
        memo.insert(start_set.clone(), 1);

        let mut worklist: Vec<(usize, Vec<usize>)> = vec![(1, start_set)];
        while let Some((dfa_idx, set)) = worklist.pop() {
            for b in 0u16..256 {
                let byte = b as u8;
                let mut next_set: Vec<usize> = Vec::new();
                for &s in &set {
                    if nfa[s].wildcard_self {
                        next_set.push(s);
                    }
                    for &(eb, target) in &nfa[s].byte_edges {
                        if eb == byte {
                            next_set.push(target);
                        }
                    }
                }
                if next_set.is_empty() {
                    dfa_states[dfa_idx].transitions[byte as usize] = 0;
                    continue;
                }
                let closure = epsilon_closure(&next_set);
                let target_idx = if let Some(&idx) = memo.get(&closure) {
                    idx
                } else {
                    let tag = resolve_tag(&closure)?;
                    let idx = dfa_states.len();
                    dfa_states.push(DfaState {
                        transitions: Box::new([0u32; 256]),
                        tag,
                    });
                    memo.insert(closure.clone(), idx);
                    worklist.push((idx, closure));
                    idx
                };
                dfa_states[dfa_idx].transitions[byte as usize] = target_idx as u32;
            }
        }

        Ok(Self { states: dfa_states })
    }

    /// Classifies `path`, stepping one byte at a time from the start
    /// state. O(path length).
    #[must_use]
    pub fn classify(&self, path: &[u8]) -> Option<Tag> {
        let mut state = 1usize;
        for &b in path {
            state = self.states[state].transitions[b as usize] as usize;
        }
        self.states[state].tag
    }
}
