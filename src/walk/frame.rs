//! A single stack frame: one directory and the per-directory operation
//! instances the [`super::walker::Walker`] minted for it.

use crate::dirpath::DirectoryPath;
use crate::ops::PerDirectoryOperation;

pub(super) struct Frame {
    pub(super) dir: DirectoryPath,
    pub(super) ops: Vec<Box<dyn PerDirectoryOperation>>,
}
