// In crates/core-types/src/error.rs

use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid date range, entry window or delay. Aborts a run before any computation.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Unparseable date input '{input}'")]
    Format { input: String },

    /// A record that breaks the matched-trade invariant (entry before exit, same day).
    #[error("Invalid trade: {0}")]
    InvalidTrade(String),

    #[error("No trades in set '{0}'")]
    EmptySet(String),

    #[error("Partition '{0}' is empty")]
    PartitionEmpty(String),

    #[error("Cannot compute metrics for trade entered at {entry_time}: {reason}")]
    Computation {
        entry_time: NaiveDateTime,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
