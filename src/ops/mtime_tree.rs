//! Mtime tree serializer (spec §4.8): each directory's `Output` contributes
//! a node carrying its subtree's newest-mtime-by-uid and newest-mtime-by-gid
//! arrays plus its already-finished children; the root node is handed to a
//! background worker over a bounded channel (spec §5), which owns the
//! external [`TreeWriter`] and writes it exactly once per scan.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::Sender;

use crate::dirpath::DirectoryPath;
use crate::error::{CoreError, Result};
use crate::fileinfo::FileInfo;
use crate::ops::{PerDirectoryOperation, PerDirectoryOperationGenerator};
use crate::sinks::{TreeNode, TreeWriter};

type PendingChildren = Rc<RefCell<HashMap<DirectoryPath, Vec<TreeNode>>>>;

fn bump_max(map: &mut BTreeMap<u32, i64>, key: u32, value: i64) {
    map.entry(key)
        .and_modify(|existing| *existing = (*existing).max(value))
        .or_insert(value);
}

/// Owns the background worker thread and the channel feeding it. Dropping
/// the generator joins the worker, so the writer's `write_tree` has
/// finished by the time the generator goes out of scope.
pub struct MtimeTreeGenerator {
    sender: Option<Sender<TreeNode>>,
    pending: PendingChildren,
    worker_error: Arc<Mutex<Option<CoreError>>>,
    worker: Option<JoinHandle<()>>,
}

impl MtimeTreeGenerator {
    pub fn new<W>(mut writer: W) -> Self
    where
        W: TreeWriter + Send + 'static,
    {
        let (sender, receiver) = crossbeam_channel::bounded::<TreeNode>(1);
        let worker_error = Arc::new(Mutex::new(None));
        let error_slot = Arc::clone(&worker_error);
        let worker = std::thread::spawn(move || {
            if let Ok(root) = receiver.recv() {
                if let Err(e) = writer.write_tree(root) {
                    tracing::error!(err = %e, "mtime tree writer failed");
                    *error_slot.lock().unwrap_or_else(|p| p.into_inner()) = Some(e);
                }
            }
        });
        Self {
            sender: Some(sender),
            pending: Rc::new(RefCell::new(HashMap::new())),
            worker_error,
            worker: Some(worker),
        }
    }
}

impl Drop for MtimeTreeGenerator {
    fn drop(&mut self) {
        // Drop the real sender (not a clone) so the worker's `recv()`
        // unblocks with `Err` if the root frame never sent a tree.
        self.sender.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl PerDirectoryOperationGenerator for MtimeTreeGenerator {
    fn generate(&mut self, dir: &DirectoryPath) -> Box<dyn PerDirectoryOperation> {
        Box::new(MtimeTreeBuilder {
            dir: dir.clone(),
            by_uid: BTreeMap::new(),
            by_gid: BTreeMap::new(),
            leaves: Vec::new(),
            pending: Rc::clone(&self.pending),
            sender: self
                .sender
                .as_ref()
                .expect("generator dropped while still producing operations")
                .clone(),
            worker_error: Arc::clone(&self.worker_error),
        })
    }
}

struct MtimeTreeBuilder {
    dir: DirectoryPath,
    by_uid: BTreeMap<u32, i64>,
    by_gid: BTreeMap<u32, i64>,
    leaves: Vec<TreeNode>,
    pending: PendingChildren,
    sender: Sender<TreeNode>,
    worker_error: Arc<Mutex<Option<CoreError>>>,
}

impl MtimeTreeBuilder {
    fn check_worker(&self) -> Result<()> {
        let mut slot = self.worker_error.lock().unwrap_or_else(|p| p.into_inner());
        match slot.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl PerDirectoryOperation for MtimeTreeBuilder {
    fn add(&mut self, info: &FileInfo<'_>) -> Result<()> {
        self.check_worker()?;
        if info.is_directory() {
            return Ok(());
        }
        bump_max(&mut self.by_uid, info.uid, info.mtime);
        bump_max(&mut self.by_gid, info.gid, info.mtime);
        if info.dir == self.dir {
            self.leaves.push(TreeNode::File {
                name: info.name.into(),
                uid: info.uid,
                gid: info.gid,
                mtime: info.mtime,
                size: info.size,
            });
        }
        Ok(())
    }

    fn output(&mut self) -> Result<()> {
        self.check_worker()?;
        let mut children = self.pending.borrow_mut().remove(&self.dir).unwrap_or_default();
        children.extend(self.leaves.drain(..));
        let node = TreeNode::Directory {
            name: self.dir.name().into(),
            by_uid: self.by_uid.iter().map(|(&u, &t)| (u, t)).collect(),
            by_gid: self.by_gid.iter().map(|(&g, &t)| (g, t)).collect(),
            children,
        };
        match self.dir.parent() {
            Some(parent) => {
                self.pending.borrow_mut().entry(parent).or_default().push(node);
                Ok(())
            }
            None => self.sender.send(node).map_err(|e| CoreError::OperationFailure {
                operation: "mtime_tree",
                source: Box::new(e),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{EntryType, Record};
    use std::sync::mpsc;

    struct ChannelWriter(mpsc::Sender<TreeNode>);
    impl TreeWriter for ChannelWriter {
        fn write_tree(&mut self, root: TreeNode) -> Result<()> {
            let _ = self.0.send(root);
            Ok(())
        }
    }

    fn file(path: &'static [u8], uid: u32, gid: u32, mtime: i64, size: i64) -> Record<'static> {
        Record {
            path,
            size,
            uid,
            gid,
            atime: 0,
            mtime,
            ctime: mtime,
            entry_type: EntryType::RegularFile,
            inode: 1,
            apparent_size: None,
            hardlink_count: None,
            block_count: None,
        }
    }

    #[test]
    fn root_node_carries_merged_subtree_mtime_arrays_and_nested_children() {
        let (tx, rx) = mpsc::channel();
        let mut generator = MtimeTreeGenerator::new(ChannelWriter(tx));

        let root = DirectoryPath::root();
        let a = root.child(b"a/");

        let mut op_root = generator.generate(&root);
        let mut op_a = generator.generate(&a);

        let r_child = file(b"/a/f", 1, 1, 500, 10);
        // the walker dispatches every record to every open ancestor frame,
        // so root's operation sees the descendant too.
        op_root.add(&FileInfo::new(&r_child, a.clone())).unwrap();
        op_a.add(&FileInfo::new(&r_child, a.clone())).unwrap();
        op_a.output().unwrap();

        let r_root_file = file(b"/g", 1, 1, 900, 20);
        op_root.add(&FileInfo::new(&r_root_file, root.clone())).unwrap();
        op_root.output().unwrap();

        drop(generator);
        let tree = rx.recv().expect("worker wrote the tree");
        match tree {
            TreeNode::Directory { by_uid, children, .. } => {
                assert_eq!(by_uid, vec![(1, 900)], "root's subtree max mtime across /g and /a/f");
                assert_eq!(children.len(), 2, "one file leaf plus the nested /a directory node");
                let nested = children
                    .iter()
                    .find(|c| matches!(c, TreeNode::Directory { .. }))
                    .expect("nested directory node present");
                if let TreeNode::Directory { by_uid, children, .. } = nested {
                    assert_eq!(by_uid, &vec![(1, 500)]);
                    assert_eq!(children.len(), 1);
                } else {
                    unreachable!()
                }
            }
            TreeNode::File { .. } => panic!("root must serialize as a directory node"),
        }
    }
}
