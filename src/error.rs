use std::fmt;

/// Generic result type used throughout the crate.
pub type Result<T> = core::result::Result<T, CoreError>;

/// The closed error taxonomy described by the operation protocol and the
/// walker: every fallible path in this crate resolves to one of these.
#[derive(Debug)]
pub enum CoreError {
    /// The record parser rejected a line. Fatal for the run.
    MalformedRecord {
        record_number: u64,
        reason: &'static str,
    },
    /// A record's path was not strictly greater than the previous one.
    OutOfOrder {
        record_number: u64,
        previous: Box<[u8]>,
        offending: Box<[u8]>,
    },
    /// An operation's `Add` or `Output` returned an error.
    OperationFailure {
        operation: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The classifier compiled two rules that are indistinguishable.
    Ambiguous { rule_index: usize },
    /// A downstream sink failed; always fatal for the operation driving it.
    SinkError {
        sink: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRecord {
                record_number,
                reason,
            } => write!(f, "malformed record at line {record_number}: {reason}"),
            Self::OutOfOrder {
                record_number,
                previous,
                offending,
            } => write!(
                f,
                "out-of-order record at line {record_number}: {:?} did not strictly follow {:?}",
                String::from_utf8_lossy(offending),
                String::from_utf8_lossy(previous)
            ),
            Self::OperationFailure { operation, source } => {
                write!(f, "operation {operation} failed: {source}")
            }
            Self::Ambiguous { rule_index } => {
                write!(f, "classifier rule {rule_index} is ambiguous with an earlier rule")
            }
            Self::SinkError { sink, source } => write!(f, "sink {sink} failed: {source}"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::OperationFailure { source, .. } | Self::SinkError { source, .. } => {
                Some(source.as_ref())
            }
            Self::MalformedRecord { .. } | Self::OutOfOrder { .. } | Self::Ambiguous { .. } => None,
        }
    }
}
