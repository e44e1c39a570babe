//! In-memory configuration consumed by operations. Reading these values
//! from a CLI or a config file is the excluded outer layer (spec §1
//! Non-goals); callers of this crate construct them directly.

/// Configuration for the basedir resolver (spec §4.5).
#[derive(Debug, Clone, Copy)]
pub struct BasedirConfig {
    /// Never report a basedir shallower than this depth.
    pub min_depth: u32,
    /// If `true`, a directory whose owner-bearing children number more
    /// than one is itself eligible as the basedir, per the splits policy.
    pub splits: bool,
    /// Seconds-since-epoch reference time age buckets are computed
    /// against; shared with the aggregator's notion of "now".
    pub reference_time: i64,
}

impl Default for BasedirConfig {
    fn default() -> Self {
        Self {
            min_depth: 1,
            splits: true,
            reference_time: 0,
        }
    }
}

/// Configuration for the dir/group/user/type/age aggregator (spec §4.4).
#[derive(Debug, Clone, Copy)]
pub struct AggregatorConfig {
    /// Seconds-since-epoch reference time age buckets are computed
    /// against.
    pub reference_time: i64,
}

/// Configuration for the duplicate detector (spec §4.7).
#[derive(Debug, Clone, Copy)]
pub struct DuplicateConfig {
    /// Files smaller than this are skipped at `Add` time.
    pub min_file_size: i64,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self { min_file_size: 1 }
    }
}
