//! Dir/Group/User/Type/Age aggregator (spec §4.4): a per-directory
//! operation that rolls entries up by `(gid, uid, filetype_class,
//! age_bucket)` and emits one row per non-empty key on directory exit.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::age::AgeBucket;
use crate::config::AggregatorConfig;
use crate::dirpath::DirectoryPath;
use crate::error::Result;
use crate::fileinfo::FileInfo;
use crate::filetype::FileTypeClass;
use crate::ops::{PerDirectoryOperation, PerDirectoryOperationGenerator};
use crate::sinks::{AggregatorRow, RowSink};

type Key = (u32, u32, FileTypeClass, AgeBucket);

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    count: u64,
    size: i64,
    oldest_atime: i64,
    newest_mtime: i64,
}

impl Counters {
    fn absorb(&mut self, info: &FileInfo<'_>) {
        if self.count == 0 {
            self.oldest_atime = info.atime;
            self.newest_mtime = info.mtime;
        } else {
            self.oldest_atime = self.oldest_atime.min(info.atime);
            self.newest_mtime = self.newest_mtime.max(info.mtime);
        }
        self.count += 1;
        self.size += info.size;
    }
}

/// Produces a fresh [`Aggregator`] per directory, all sharing one sink.
pub struct AggregatorGenerator<S> {
    sink: Rc<RefCell<S>>,
    config: AggregatorConfig,
}

impl<S: RowSink + 'static> AggregatorGenerator<S> {
    pub fn new(sink: S, config: AggregatorConfig) -> Self {
        Self {
            sink: Rc::new(RefCell::new(sink)),
            config,
        }
    }
}

impl<S: RowSink + 'static> PerDirectoryOperationGenerator for AggregatorGenerator<S> {
    fn generate(&mut self, dir: &DirectoryPath) -> Box<dyn PerDirectoryOperation> {
        Box::new(Aggregator {
            dir: dir.clone(),
            sink: Rc::clone(&self.sink),
            config: self.config,
            counters: BTreeMap::new(),
        })
    }
}

struct Aggregator<S> {
    dir: DirectoryPath,
    sink: Rc<RefCell<S>>,
    config: AggregatorConfig,
    counters: BTreeMap<Key, Counters>,
}

impl<S: RowSink> PerDirectoryOperation for Aggregator<S> {
    fn add(&mut self, info: &FileInfo<'_>) -> Result<()> {
        if info.is_directory() {
            return Ok(());
        }
        let class = FileTypeClass::from_name(info.name);
        for bucket in AgeBucket::matching(info.atime, info.mtime, self.config.reference_time) {
            self.counters
                .entry((info.gid, info.uid, class, bucket))
                .or_default()
                .absorb(info);
        }
        Ok(())
    }

    fn output(&mut self) -> Result<()> {
        let mut sink = self.sink.borrow_mut();
        for (&(gid, uid, filetype_class, age_bucket), counters) in &self.counters {
            sink.accept(AggregatorRow {
                path: self.dir.clone(),
                gid,
                uid,
                filetype_class,
                age_bucket,
                count: counters.count,
                size: counters.size,
                oldest_atime: counters.oldest_atime,
                newest_mtime: counters.newest_mtime,
            })?;
        }
        Ok(())
    }
}
