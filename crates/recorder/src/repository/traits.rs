//! Output contract for flushed record batches.

use super::Result;
use crate::events::Category;

/// Append-only destination for serialized records, one stream per category.
///
/// A call either persists the whole batch or returns an error; callers retry
/// failed batches, so a sink must not leave a partial batch behind.
pub trait LogSink: Send {
    /// Appends `lines` to the category's stream, one record per line.
    fn append_lines(&mut self, category: Category, lines: &[String]) -> Result<()>;

    /// Pushes buffered bytes to durable storage.
    fn sync(&mut self) -> Result<()> {
        Ok(())
    }
}
