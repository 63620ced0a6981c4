//! Output layer for flushed records.
//!
//! Sinks receive whole batches of already-serialized lines per category:
//! - [`FileSink`] appends to `<session_dir>/<category>.jsonl`
//! - [`MemorySink`] keeps lines in memory and can inject failures

mod error;
mod file;
mod memory;
mod traits;

pub use error::{Result, SinkError};
pub use file::FileSink;
pub use memory::MemorySink;
pub use traits::LogSink;
