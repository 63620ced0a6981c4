//! Unified error type surfaced by the recorder API.
//!
//! Per-event extraction failures never reach this type; they are logged and
//! counted where they happen.
use thiserror::Error;

pub use crate::events::AdapterError;
pub use crate::flush::FlushError;
pub use crate::query::QueryError;
pub use crate::repository::SinkError;

pub type Result<T> = std::result::Result<T, RecorderError>;

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Flush(#[from] FlushError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("recorder requires a log sink before building")]
    MissingSink,
}
