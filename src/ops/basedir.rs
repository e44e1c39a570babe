//! Basedir resolver (spec §4.5): for every owner principal and age bucket,
//! finds the deepest directory that is an ancestor of all of that
//! principal's matching files — the least common ancestor of a set of
//! paths, computed bottom-up as the walker closes directories.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::age::AgeBucket;
use crate::config::BasedirConfig;
use crate::dirpath::DirectoryPath;
use crate::error::Result;
use crate::fileinfo::FileInfo;
use crate::ops::{PerDirectoryOperation, PerDirectoryOperationGenerator};
use crate::sinks::{BasedirStore, Principal};

type Key = (Principal, AgeBucket);

/// A directory's running candidate for a given `(principal, bucket)`:
/// either every contributing descendant has agreed on one directory so
/// far ("shared"), or two disagreed and this directory becomes the
/// answer ("collapsed").
#[derive(Clone, PartialEq, Eq)]
enum Slot {
    Shared(DirectoryPath),
    Collapsed,
}

fn merge(existing: Option<Slot>, incoming: &DirectoryPath, splits: bool) -> Slot {
    match existing {
        None => Slot::Shared(incoming.clone()),
        Some(Slot::Shared(ref x)) if x == incoming => Slot::Shared(incoming.clone()),
        Some(Slot::Shared(_)) => {
            if splits {
                Slot::Collapsed
            } else {
                existing.unwrap()
            }
        }
        Some(Slot::Collapsed) => Slot::Collapsed,
    }
}

/// Per-directory pending state, shared across the instances on the stack
/// so a child's `output` can merge its finalised contribution straight
/// into its still-open parent's entry.
type PendingMap = Rc<RefCell<HashMap<DirectoryPath, BTreeMap<Key, Slot>>>>;

pub struct BasedirGenerator<S> {
    store: Rc<RefCell<S>>,
    config: BasedirConfig,
    pending: PendingMap,
}

impl<S: BasedirStore + 'static> BasedirGenerator<S> {
    pub fn new(store: S, config: BasedirConfig) -> Self {
        Self {
            store: Rc::new(RefCell::new(store)),
            config,
            pending: Rc::new(RefCell::new(HashMap::new())),
        }
    }
}

impl<S: BasedirStore + 'static> PerDirectoryOperationGenerator for BasedirGenerator<S> {
    fn generate(&mut self, dir: &DirectoryPath) -> Box<dyn PerDirectoryOperation> {
        self.pending
            .borrow_mut()
            .entry(dir.clone())
            .or_default();
        Box::new(BasedirResolver {
            dir: dir.clone(),
            store: Rc::clone(&self.store),
            config: self.config,
            pending: Rc::clone(&self.pending),
        })
    }
}

struct BasedirResolver<S> {
    dir: DirectoryPath,
    store: Rc<RefCell<S>>,
    config: BasedirConfig,
    pending: PendingMap,
}

impl<S: BasedirStore> BasedirResolver<S> {
    fn contribute(&self, key: Key) {
        let mut pending = self.pending.borrow_mut();
        let entry = pending.entry(self.dir.clone()).or_default();
        let existing = entry.remove(&key);
        entry.insert(key, merge(existing, &self.dir, self.config.splits));
    }
}

impl<S: BasedirStore> PerDirectoryOperation for BasedirResolver<S> {
    fn add(&mut self, info: &FileInfo<'_>) -> Result<()> {
        if info.is_directory() || info.dir != self.dir {
            return Ok(());
        }
        for bucket in AgeBucket::matching(info.atime, info.mtime, self.config.reference_time) {
            self.contribute((Principal::Uid(info.uid), bucket));
            self.contribute((Principal::Gid(info.gid), bucket));
        }
        Ok(())
    }

    fn output(&mut self) -> Result<()> {
        let my_state = self
            .pending
            .borrow_mut()
            .remove(&self.dir)
            .unwrap_or_default();

        let parent = self.dir.parent();
        let mut store = self.store.borrow_mut();
        for (key, slot) in my_state {
            // A collapse resolves this directory as the candidate as far as
            // this subtree goes, but that candidate still has to reach the
            // parent unconditionally: a sibling directory may contribute the
            // same key, and only the parent's merge can detect that and
            // collapse one level further up. Recording straight to the store
            // here would freeze the basedir one level too deep whenever a
            // same-key sibling exists.
            let candidate = match slot {
                Slot::Collapsed => self.dir.clone(),
                Slot::Shared(candidate) => candidate,
            };
            match &parent {
                Some(parent) => {
                    let mut pending = self.pending.borrow_mut();
                    let entry = pending.entry(parent.clone()).or_default();
                    let existing = entry.remove(&key);
                    entry.insert(key, merge(existing, &candidate, self.config.splits));
                }
                None => {
                    if candidate.depth() >= self.config.min_depth {
                        store.record(key.0, key.1, candidate)?;
                    }
                }
            }
        }
        Ok(())
    }
}
