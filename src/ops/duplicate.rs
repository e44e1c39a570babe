//! Duplicate detector (spec §4.7): a global operation that groups files by
//! exact size, then by `(mountpoint, inode)` hard-link set, backed by an
//! online AVL tree keyed by `(size, mountpoint, inode)` so an in-order
//! walk yields groups already sorted for streaming output.

use crate::config::DuplicateConfig;
use crate::dirpath::DirectoryPath;
use crate::error::Result;
use crate::fileinfo::FileInfo;
use crate::ops::GlobalOperation;
use crate::sinks::{DuplicateGroup, DuplicateWriter};

type TreeKey = (i64, u16, u64);

struct Node {
    key: TreeKey,
    dir: DirectoryPath,
    name: Box<[u8]>,
    height: i32,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

impl Node {
    fn new(key: TreeKey, dir: DirectoryPath, name: Box<[u8]>) -> Box<Self> {
        Box::new(Self {
            key,
            dir,
            name,
            height: 1,
            left: None,
            right: None,
        })
    }
}

fn height(node: &Option<Box<Node>>) -> i32 {
    node.as_ref().map_or(0, |n| n.height)
}

fn balance_factor(node: &Node) -> i32 {
    height(&node.left) - height(&node.right)
}

fn update_height(node: &mut Node) {
    node.height = 1 + height(&node.left).max(height(&node.right));
}

fn rotate_right(mut y: Box<Node>) -> Box<Node> {
    let mut x = y.left.take().expect("rotate_right requires a left child");
    y.left = x.right.take();
    update_height(&mut y);
    x.right = Some(y);
    update_height(&mut x);
    x
}

fn rotate_left(mut x: Box<Node>) -> Box<Node> {
    let mut y = x.right.take().expect("rotate_left requires a right child");
    x.right = y.left.take();
    update_height(&mut x);
    y.left = Some(x);
    update_height(&mut y);
    y
}

fn rebalance(mut node: Box<Node>) -> Box<Node> {
    update_height(&mut node);
    let bf = balance_factor(&node);
    if bf > 1 {
        if balance_factor(node.left.as_ref().unwrap()) < 0 {
            node.left = Some(rotate_left(node.left.take().unwrap()));
        }
        return rotate_right(node);
    }
    if bf < -1 {
        if balance_factor(node.right.as_ref().unwrap()) > 0 {
            node.right = Some(rotate_right(node.right.take().unwrap()));
        }
        return rotate_left(node);
    }
    node
}

fn insert(
    node: Option<Box<Node>>,
    key: TreeKey,
    dir: DirectoryPath,
    name: Box<[u8]>,
) -> Box<Node> {
    let Some(mut node) = node else {
        return Node::new(key, dir, name);
    };
    if key < node.key {
        node.left = Some(insert(node.left.take(), key, dir, name));
    } else {
        node.right = Some(insert(node.right.take(), key, dir, name));
    }
    rebalance(node)
}

fn in_order(node: &Option<Box<Node>>, visit: &mut impl FnMut(&Node)) {
    if let Some(n) = node {
        in_order(&n.left, visit);
        visit(n);
        in_order(&n.right, visit);
    }
}

/// Assigns stable small indices to mountpoint names, used as the middle
/// component of the duplicate tree's ordering key.
#[derive(Default)]
pub struct MountpointTable {
    names: Vec<Box<[u8]>>,
}

impl MountpointTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `name`, returning its index. Re-interning the same name
    /// returns the same index.
    pub fn intern(&mut self, name: &[u8]) -> u16 {
        if let Some(idx) = self.names.iter().position(|n| n.as_ref() == name) {
            return u16::try_from(idx).expect("mountpoint table overflow");
        }
        self.names.push(name.into());
        u16::try_from(self.names.len() - 1).expect("mountpoint table overflow")
    }
}

/// Groups files by exact size, then by hard-link set, emitting only sizes
/// that contain more than one distinct hard-link set.
pub struct DuplicateDetector<W> {
    root: Option<Box<Node>>,
    writer: W,
    config: DuplicateConfig,
    mountpoint: u16,
}

impl<W: DuplicateWriter> DuplicateDetector<W> {
    #[must_use]
    pub fn new(writer: W, config: DuplicateConfig) -> Self {
        Self {
            root: None,
            writer,
            config,
            mountpoint: 0,
        }
    }

    /// Sets the mountpoint index attributed to subsequently-added records;
    /// callers switch this when dispatching records from a different
    /// mount than the previous one.
    pub fn set_mountpoint(&mut self, mountpoint: u16) {
        self.mountpoint = mountpoint;
    }
}

impl<W: DuplicateWriter> GlobalOperation for DuplicateDetector<W> {
    fn add(&mut self, info: &FileInfo<'_>) -> Result<()> {
        if info.is_directory() || info.size < self.config.min_file_size {
            return Ok(());
        }
        let key = (info.size, self.mountpoint, info.inode);
        self.root = Some(insert(
            self.root.take(),
            key,
            info.dir.clone(),
            info.name.into(),
        ));
        Ok(())
    }

    fn output(&mut self) -> Result<()> {
        // (size, mountpoint, inode) -> representative path + siblings.
        struct RunningSize {
            size: i64,
            groups: Vec<(u16, u64, DuplicateGroup)>,
        }
        let mut current: Option<RunningSize> = None;

        let mut flush = |run: RunningSize, writer: &mut W| -> Result<()> {
            if run.groups.len() > 1 {
                tracing::debug!(size = run.size, groups = run.groups.len(), "emitting duplicate size block");
                let groups = run.groups.into_iter().map(|(_, _, g)| g).collect();
                writer.write_size_block(run.size, groups)?;
            }
            Ok(())
        };

        let mut pending_err: Option<crate::error::CoreError> = None;
        in_order(&self.root, &mut |node| {
            if pending_err.is_some() {
                return;
            }
            let mut path = node.dir.to_path_bytes();
            if path.last() != Some(&b'/') {
                path.push(b'/');
            }
            path.extend_from_slice(&node.name);

            match &mut current {
                Some(run) if run.size == node.key.0 => {
                    if let Some(last) = run
                        .groups
                        .last_mut()
                        .filter(|(mnt, ino, _)| *mnt == node.key.1 && *ino == node.key.2)
                    {
                        last.2.siblings.push(path);
                    } else {
                        run.groups.push((
                            node.key.1,
                            node.key.2,
                            DuplicateGroup {
                                representative: path,
                                siblings: Vec::new(),
                            },
                        ));
                    }
                }
                _ => {
                    if let Some(prev) = current.take() {
                        if let Err(e) = flush(prev, &mut self.writer) {
                            pending_err = Some(e);
                            return;
                        }
                    }
                    current = Some(RunningSize {
                        size: node.key.0,
                        groups: vec![(
                            node.key.1,
                            node.key.2,
                            DuplicateGroup {
                                representative: path,
                                siblings: Vec::new(),
                            },
                        )],
                    });
                }
            }
        });
        if let Some(e) = pending_err {
            return Err(e);
        }
        if let Some(run) = current {
            flush(run, &mut self.writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{EntryType, Record};

    #[derive(Default)]
    struct VecWriter(Vec<(i64, Vec<DuplicateGroup>)>);
    impl DuplicateWriter for VecWriter {
        fn write_size_block(&mut self, size: i64, groups: Vec<DuplicateGroup>) -> Result<()> {
            self.0.push((size, groups));
            Ok(())
        }
    }

    fn file(name: &'static str, size: i64, inode: u64) -> Record<'static> {
        Record {
            path: name.as_bytes(),
            size,
            uid: 0,
            gid: 0,
            atime: 0,
            mtime: 0,
            ctime: 0,
            entry_type: EntryType::RegularFile,
            inode,
            apparent_size: None,
            hardlink_count: None,
            block_count: None,
        }
    }

    #[test]
    fn emits_only_sizes_with_more_than_one_hardlink_set() {
        let mut detector = DuplicateDetector::new(VecWriter::default(), DuplicateConfig { min_file_size: 1 });
        let dir = DirectoryPath::root();

        let r200 = file("a", 200, 7);
        let r300a = file("b", 300, 1);
        let r300b = file("c", 300, 1); // hardlink sibling of r300a
        let r300c = file("d", 300, 3);

        for r in [&r200, &r300a, &r300b, &r300c] {
            detector.add(&FileInfo::new(r, dir.clone())).unwrap();
        }
        detector.output().unwrap();

        assert_eq!(detector.writer.0.len(), 1, "only size 300 has >1 hardlink set");
        let (size, groups) = &detector.writer.0[0];
        assert_eq!(*size, 300);
        assert_eq!(groups.len(), 2);
        let hardlinked = groups.iter().find(|g| !g.siblings.is_empty()).unwrap();
        assert_eq!(hardlinked.siblings.len(), 1);
    }

    #[test]
    fn skips_files_below_min_file_size() {
        let mut detector = DuplicateDetector::new(VecWriter::default(), DuplicateConfig { min_file_size: 100 });
        let dir = DirectoryPath::root();
        let small_a = file("a", 10, 1);
        let small_b = file("b", 10, 2);
        detector.add(&FileInfo::new(&small_a, dir.clone())).unwrap();
        detector.add(&FileInfo::new(&small_b, dir.clone())).unwrap();
        detector.output().unwrap();
        assert!(detector.writer.0.is_empty());
    }

    #[test]
    fn emitted_size_blocks_are_strictly_increasing() {
        let mut detector = DuplicateDetector::new(VecWriter::default(), DuplicateConfig { min_file_size: 1 });
        let dir = DirectoryPath::root();
        for (name, size, inode) in [
            ("a", 50, 1),
            ("b", 50, 2),
            ("c", 10, 1),
            ("d", 10, 2),
            ("e", 999, 1),
            ("f", 999, 2),
        ] {
            let r = file(name, size, inode);
            detector.add(&FileInfo::new(&r, dir.clone())).unwrap();
        }
        detector.output().unwrap();
        let sizes: Vec<i64> = detector.writer.0.iter().map(|(s, _)| *s).collect();
        let mut sorted = sizes.clone();
        sorted.sort_unstable();
        assert_eq!(sizes, sorted);
        assert!(sizes.windows(2).all(|w| w[0] < w[1]));
    }
}
