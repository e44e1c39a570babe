//! [`FileInfo`]: the per-record dispatch view handed to operations by the
//! walker. For a directory record, `dir` is the directory itself; for a
//! file record, `dir` is its parent.

use crate::dirpath::DirectoryPath;
use crate::record::{EntryType, Record};

#[derive(Clone)]
pub struct FileInfo<'a> {
    pub dir: DirectoryPath,
    pub name: &'a [u8],
    pub size: i64,
    pub uid: u32,
    pub gid: u32,
    pub atime: i64,
    pub mtime: i64,
    pub ctime: i64,
    pub entry_type: EntryType,
    pub inode: u64,
    pub apparent_size: Option<i64>,
    pub hardlink_count: Option<u64>,
    pub block_count: Option<i64>,
}

impl<'a> FileInfo<'a> {
    pub(crate) fn new(record: &Record<'a>, dir: DirectoryPath) -> Self {
        Self {
            dir,
            name: record.name(),
            size: record.size,
            uid: record.uid,
            gid: record.gid,
            atime: record.atime,
            mtime: record.mtime,
            ctime: record.ctime,
            entry_type: record.entry_type,
            inode: record.inode,
            apparent_size: record.apparent_size,
            hardlink_count: record.hardlink_count,
            block_count: record.block_count,
        }
    }

    #[must_use]
    #[inline(always)]
    pub const fn is_directory(&self) -> bool {
        self.entry_type.is_directory()
    }
}
