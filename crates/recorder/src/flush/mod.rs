//! Category buffers and the flusher that drains them.

mod buffer;
mod flusher;

use thiserror::Error;

use crate::events::Category;
use crate::repository::SinkError;

pub use buffer::CategoryBuffer;
pub use flusher::{FlushOutcome, FlushPolicy, FlushReport, Flusher};

/// A batch could not be written; its lines are still buffered.
#[derive(Debug, Error)]
#[error("failed to flush {pending} {category} lines")]
pub struct FlushError {
    pub category: Category,
    pub pending: usize,
    #[source]
    pub source: SinkError,
}
