//! In-memory sink implementation.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::{LogSink, Result, SinkError};
use crate::events::Category;

#[derive(Debug, Default)]
struct MemoryLog {
    lines: BTreeMap<Category, Vec<String>>,
    writes: usize,
    attempts: usize,
    fail_next: usize,
}

/// In-memory sink for testing and development.
///
/// Clones share the same storage, so a test can keep a handle while the
/// recorder owns the sink. Failures can be injected for the next `n` writes.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    log: Arc<Mutex<MemoryLog>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` batches fail without storing anything.
    pub fn fail_next(&self, count: usize) {
        if let Ok(mut log) = self.log.lock() {
            log.fail_next = count;
        }
    }

    /// Lines written to `category` so far.
    pub fn lines(&self, category: Category) -> Vec<String> {
        self.log
            .lock()
            .map(|log| log.lines.get(&category).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Written lines parsed back into JSON values.
    pub fn records(&self, category: Category) -> Vec<serde_json::Value> {
        self.lines(category)
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// Number of successful batch writes.
    pub fn write_count(&self) -> usize {
        self.log.lock().map(|log| log.writes).unwrap_or_default()
    }

    /// Number of batch writes tried, failed ones included.
    pub fn attempt_count(&self) -> usize {
        self.log.lock().map(|log| log.attempts).unwrap_or_default()
    }
}

impl LogSink for MemorySink {
    fn append_lines(&mut self, category: Category, lines: &[String]) -> Result<()> {
        let mut log = self.log.lock().map_err(|_| SinkError::LockPoisoned)?;
        log.attempts += 1;

        if log.fail_next > 0 {
            log.fail_next -= 1;
            return Err(SinkError::Unavailable {
                category,
                reason: "injected failure".into(),
            });
        }

        log.lines
            .entry(category)
            .or_default()
            .extend(lines.iter().cloned());
        log.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_storage_and_failures() {
        let handle = MemorySink::new();
        let mut sink = handle.clone();

        handle.fail_next(1);
        assert!(sink.append_lines(Category::Gui, &["x".into()]).is_err());
        sink.append_lines(Category::Gui, &["x".into()]).unwrap();

        assert_eq!(handle.lines(Category::Gui), vec!["x".to_string()]);
        assert_eq!(handle.write_count(), 1);
        assert_eq!(handle.attempt_count(), 2);
    }
}
