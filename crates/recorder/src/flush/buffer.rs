//! Per-category line buffer.

use std::collections::VecDeque;

/// Serialized lines waiting for the next flush of one category.
#[derive(Debug, Default)]
pub struct CategoryBuffer {
    lines: VecDeque<String>,
}

impl CategoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: String) {
        self.lines.push_back(line);
    }

    /// Drops the oldest lines until at most `max` remain; returns how many
    /// were dropped.
    pub fn truncate_front(&mut self, max: usize) -> usize {
        let excess = self.lines.len().saturating_sub(max);
        self.lines.drain(..excess);
        excess
    }

    /// Contiguous view of all pending lines, oldest first.
    pub fn pending(&mut self) -> &[String] {
        self.lines.make_contiguous()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_keeps_the_newest_lines() {
        let mut buffer = CategoryBuffer::new();
        for n in 0..5 {
            buffer.push(n.to_string());
        }

        assert_eq!(buffer.truncate_front(3), 2);
        assert_eq!(buffer.pending(), &["2", "3", "4"]);
        assert_eq!(buffer.truncate_front(3), 0);
    }
}
