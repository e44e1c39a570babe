//! Age buckets (spec §4.4): a closed set of named thresholds against a
//! file's atime or mtime, relative to a reference time.

use std::fmt;

use chrono::{DateTime, Months, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeBucket {
    All,
    A1m,
    A2m,
    A6m,
    A1y,
    A2y,
    A3y,
    A5y,
    A7y,
    M1m,
    M2m,
    M6m,
    M1y,
    M2y,
    M3y,
    M5y,
    M7y,
}

/// Which timestamp field a bucket (other than `All`) is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceField {
    Atime,
    Mtime,
}

/// `(bucket, reference field, minimum age in calendar months)`. Expressed
/// as a table rather than per-bucket branches, so adding a bucket is a
/// table edit, not new control flow. Months (not fixed-length seconds) so
/// a "7y" bucket lands on the calendar date 7 years back, leap years
/// included, rather than drifting by a day or two per decade.
const THRESHOLDS: &[(AgeBucket, ReferenceField, u32)] = &[
    (AgeBucket::A1m, ReferenceField::Atime, 1),
    (AgeBucket::A2m, ReferenceField::Atime, 2),
    (AgeBucket::A6m, ReferenceField::Atime, 6),
    (AgeBucket::A1y, ReferenceField::Atime, 12),
    (AgeBucket::A2y, ReferenceField::Atime, 24),
    (AgeBucket::A3y, ReferenceField::Atime, 36),
    (AgeBucket::A5y, ReferenceField::Atime, 60),
    (AgeBucket::A7y, ReferenceField::Atime, 84),
    (AgeBucket::M1m, ReferenceField::Mtime, 1),
    (AgeBucket::M2m, ReferenceField::Mtime, 2),
    (AgeBucket::M6m, ReferenceField::Mtime, 6),
    (AgeBucket::M1y, ReferenceField::Mtime, 12),
    (AgeBucket::M2y, ReferenceField::Mtime, 24),
    (AgeBucket::M3y, ReferenceField::Mtime, 36),
    (AgeBucket::M5y, ReferenceField::Mtime, 60),
    (AgeBucket::M7y, ReferenceField::Mtime, 84),
];

impl AgeBucket {
    /// All buckets, `All` first, in the order used for stable output.
    #[must_use]
    pub fn all() -> Vec<Self> {
        let mut v = vec![Self::All];
        v.extend(THRESHOLDS.iter().map(|&(b, _, _)| b));
        v
    }

    /// Every bucket that `atime`/`mtime` (seconds since epoch) satisfy
    /// relative to `reference_time` (also seconds since epoch). `All`
    /// always matches. A bucket matches only if its timestamp falls
    /// strictly before the calendar cutoff, so a file exactly N
    /// years/months old does not yet count as "older than N".
    #[must_use]
    pub fn matching(atime: i64, mtime: i64, reference_time: i64) -> Vec<Self> {
        let mut matched = vec![Self::All];
        let Some(reference_dt) = DateTime::<Utc>::from_timestamp(reference_time, 0) else {
            return matched;
        };
        for &(bucket, field, months) in THRESHOLDS {
            let ts = match field {
                ReferenceField::Atime => atime,
                ReferenceField::Mtime => mtime,
            };
            let Some(ts_dt) = DateTime::<Utc>::from_timestamp(ts, 0) else {
                continue;
            };
            let Some(cutoff) = reference_dt.checked_sub_months(Months::new(months)) else {
                continue;
            };
            if ts_dt < cutoff {
                matched.push(bucket);
            }
        }
        matched
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "All",
            Self::A1m => "A1m",
            Self::A2m => "A2m",
            Self::A6m => "A6m",
            Self::A1y => "A1y",
            Self::A2y => "A2y",
            Self::A3y => "A3y",
            Self::A5y => "A5y",
            Self::A7y => "A7y",
            Self::M1m => "M1m",
            Self::M2m => "M2m",
            Self::M6m => "M6m",
            Self::M1y => "M1y",
            Self::M2y => "M2y",
            Self::M3y => "M3y",
            Self::M5y => "M5y",
            Self::M7y => "M7y",
        })
    }
}
