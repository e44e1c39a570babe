//! External interfaces (spec §6). Concrete implementations (Bolt files,
//! ClickHouse batches, CSV/JSON writers) live outside this crate; these
//! traits are the seam the operations in `ops/` are built against.

use crate::age::AgeBucket;
use crate::dirpath::DirectoryPath;
use crate::error::Result;
use crate::filetype::FileTypeClass;

/// One row of the dir/group/user/type/age aggregator's output.
#[derive(Debug, Clone)]
pub struct AggregatorRow {
    pub path: DirectoryPath,
    pub gid: u32,
    pub uid: u32,
    pub filetype_class: FileTypeClass,
    pub age_bucket: AgeBucket,
    pub count: u64,
    pub size: i64,
    pub oldest_atime: i64,
    pub newest_mtime: i64,
}

/// Accepts aggregator rows, emitted depth-first in traversal order.
pub trait RowSink {
    fn accept(&mut self, row: AggregatorRow) -> Result<()>;
}

/// Which principal a basedir row is reported for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Principal {
    Uid(u32),
    Gid(u32),
}

/// Accepts basedir resolution results and exposes the append-only history
/// query named in spec §6. The history itself (persistence across scans)
/// is provided by the external store; this trait is only the seam.
pub trait BasedirStore {
    fn record(&mut self, principal: Principal, bucket: AgeBucket, basedir: DirectoryPath) -> Result<()>;

    /// Previously recorded basedirs for `principal`/`bucket`, oldest first.
    fn history(&self, principal: Principal, bucket: AgeBucket) -> Vec<DirectoryPath>;
}

/// A node of the mtime tree (spec §4.8): either a directory (with its own
/// per-uid/per-gid newest-mtime arrays and its children) or a file leaf.
#[derive(Debug, Clone)]
pub enum TreeNode {
    Directory {
        name: Box<[u8]>,
        by_uid: Vec<(u32, i64)>,
        by_gid: Vec<(u32, i64)>,
        children: Vec<TreeNode>,
    },
    File {
        name: Box<[u8]>,
        uid: u32,
        gid: u32,
        mtime: i64,
        size: i64,
    },
}

/// Accepts the recursive tree the mtime serializer builds, one root
/// invocation per scan.
pub trait TreeWriter {
    fn write_tree(&mut self, root: TreeNode) -> Result<()>;
}

/// One hard-link-set representative within a duplicate-size block: the
/// printed path plus its hard-link siblings.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub representative: Vec<u8>,
    pub siblings: Vec<Vec<u8>>,
}

/// Accepts `size -> groups` blocks from the duplicate detector, in
/// strictly increasing size order.
pub trait DuplicateWriter {
    fn write_size_block(&mut self, size: i64, groups: Vec<DuplicateGroup>) -> Result<()>;
}
