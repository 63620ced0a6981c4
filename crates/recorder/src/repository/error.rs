//! Error types raised by log sinks.

use thiserror::Error;

use crate::events::Category;

/// Errors surfaced by [`LogSink`](super::LogSink) implementations.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("log sink lock was poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{category} sink unavailable: {reason}")]
    Unavailable { category: Category, reason: String },

    #[error(
        "partial write in {category} at offset {offset}: expected {expected} bytes, found {actual}"
    )]
    PartialWrite {
        category: Category,
        offset: u64,
        expected: usize,
        actual: u64,
    },
}

pub type Result<T> = std::result::Result<T, SinkError>;
