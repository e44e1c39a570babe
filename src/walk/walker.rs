//! The Walker/Summariser (spec §4.2): reconstructs the directory tree from
//! the sorted record stream and drives the operation protocol at directory
//! boundaries.

use std::io::BufRead;

use crate::dirpath::DirectoryPath;
use crate::error::{CoreError, Result};
use crate::fileinfo::FileInfo;
use crate::ops::{GlobalOperation, PerDirectoryOperationGenerator};
use crate::parser::RecordParser;
use crate::walk::frame::Frame;

/// Isolates the final `name/` segment (with trailing slash) from a
/// directory's full path, e.g. `/a/b/` -> `b/`.
fn directory_segment(path: &[u8]) -> &[u8] {
    let trimmed = &path[..path.len().saturating_sub(1)];
    match trimmed.iter().rposition(|&b| b == b'/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Drives one pass over a sorted stats stream, dispatching every record to
/// every registered consumer exactly once.
pub struct Walker<R> {
    parser: RecordParser<R>,
    generators: Vec<Box<dyn PerDirectoryOperationGenerator>>,
    globals: Vec<Box<dyn GlobalOperation>>,
}

impl<R: BufRead> Walker<R> {
    #[must_use]
    pub fn new(parser: RecordParser<R>) -> Self {
        Self {
            parser,
            generators: Vec::new(),
            globals: Vec::new(),
        }
    }

    /// Registers a per-directory operation generator. Generators are
    /// invoked, and their operations dispatched, in registration order.
    pub fn register_per_directory(&mut self, generator: Box<dyn PerDirectoryOperationGenerator>) {
        tracing::debug!(total = self.generators.len() + 1, "registered per-directory operation generator");
        self.generators.push(generator);
    }

    /// Registers a global operation, dispatched in registration order.
    pub fn register_global(&mut self, operation: Box<dyn GlobalOperation>) {
        tracing::debug!(total = self.globals.len() + 1, "registered global operation");
        self.globals.push(operation);
    }

    /// Runs the walk to completion. Returns the first error raised by the
    /// parser or by any operation; already-open frames still have `Output`
    /// called (best-effort, in reverse order) before the error is returned.
    pub fn run(&mut self) -> Result<()> {
        let mut stack: Vec<Frame> = Vec::new();
        let mut previous_path: Option<Vec<u8>> = None;
        let mut record_number: u64 = 0;

        match self.run_inner(&mut stack, &mut previous_path, &mut record_number) {
            Ok(()) => {
                while let Some(mut frame) = stack.pop() {
                    for op in frame.ops.iter_mut().rev() {
                        op.output()?;
                    }
                }
                for global in self.globals.iter_mut().rev() {
                    global.output()?;
                }
                Ok(())
            }
            Err(first_err) => {
                for mut frame in stack.into_iter().rev() {
                    for op in frame.ops.iter_mut().rev() {
                        let _ = op.output();
                    }
                }
                Err(first_err)
            }
        }
    }

    fn run_inner(
        &mut self,
        stack: &mut Vec<Frame>,
        previous_path: &mut Option<Vec<u8>>,
        record_number: &mut u64,
    ) -> Result<()> {
        loop {
            let Some(record) = self.parser.scan()? else {
                break;
            };
            *record_number += 1;
            let record_number = *record_number;

            if let Some(previous) = previous_path.as_ref() {
                if record.path <= previous.as_slice() {
                    tracing::error!(
                        record_number,
                        previous = %String::from_utf8_lossy(previous),
                        offending = %String::from_utf8_lossy(record.path),
                        "out-of-order record"
                    );
                    return Err(CoreError::OutOfOrder {
                        record_number,
                        previous: previous.clone().into_boxed_slice(),
                        offending: record.path.into(),
                    });
                }
            }
            *previous_path = Some(record.path.to_vec());

            let depth = record.depth();
            while stack.last().is_some_and(|frame| frame.dir.depth() as usize >= depth) {
                let mut frame = stack.pop().expect("checked non-empty above");
                tracing::trace!(dir = %String::from_utf8_lossy(&frame.dir.to_path_bytes()), "popping directory frame");
                for op in frame.ops.iter_mut().rev() {
                    op.output()?;
                }
            }

            let current = if record.entry_type.is_directory() {
                let new_dir = match stack.last() {
                    Some(parent) => parent.dir.child(directory_segment(record.path)),
                    None => DirectoryPath::root(),
                };
                tracing::trace!(dir = %String::from_utf8_lossy(&new_dir.to_path_bytes()), "pushing directory frame");
                let ops = self
                    .generators
                    .iter_mut()
                    .map(|generator| generator.generate(&new_dir))
                    .collect();
                stack.push(Frame {
                    dir: new_dir.clone(),
                    ops,
                });
                new_dir
            } else {
                stack
                    .last()
                    .map(|frame| frame.dir.clone())
                    .expect("a file record always has an already-open containing directory")
            };

            let info = FileInfo::new(&record, current);
            for global in &mut self.globals {
                global.add(&info)?;
            }
            for frame in stack.iter_mut() {
                for op in frame.ops.iter_mut() {
                    op.add(&info)?;
                }
            }
        }
        Ok(())
    }
}
