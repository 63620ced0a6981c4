//! Buffered, batched writes of sanitized lines to a [`LogSink`].

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};
use world_core::Tick;

use super::{CategoryBuffer, FlushError};
use crate::config::RecorderConfig;
use crate::events::Category;
use crate::repository::LogSink;

/// When buffers are written and how much they may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    pub interval_ticks: u64,
    pub threshold: usize,
    pub max_buffered: usize,
}

impl FlushPolicy {
    pub fn from_config(config: &RecorderConfig) -> Self {
        Self {
            interval_ticks: config.flush_interval_ticks,
            threshold: config.flush_threshold,
            max_buffered: config.max_buffered_lines,
        }
    }
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self::from_config(&RecorderConfig::default())
    }
}

/// Result of a single category flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was buffered; the sink was not touched.
    Empty,
    Written(usize),
}

/// Result of flushing every category.
#[derive(Debug, Default)]
pub struct FlushReport {
    pub written: usize,
    pub failures: Vec<FlushError>,
}

impl FlushReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Owner of the category buffers and the sink they drain into.
pub struct Flusher<S> {
    sink: S,
    buffers: BTreeMap<Category, CategoryBuffer>,
    policy: FlushPolicy,
    last_flush: Tick,
    dropped: u64,
    /// Categories whose last write failed. The threshold leaves them alone
    /// until another flush of the category succeeds.
    failing: BTreeSet<Category>,
}

impl<S: LogSink> Flusher<S> {
    pub fn new(sink: S, policy: FlushPolicy) -> Self {
        Self {
            sink,
            buffers: BTreeMap::new(),
            policy,
            last_flush: Tick::ZERO,
            dropped: 0,
            failing: BTreeSet::new(),
        }
    }

    /// Buffers one line. Never writes.
    ///
    /// Returns the number of old lines dropped to stay under the cap.
    pub fn append(&mut self, category: Category, line: String) -> usize {
        let buffer = self.buffers.entry(category).or_default();
        buffer.push(line);

        let dropped = buffer.truncate_front(self.policy.max_buffered);
        if dropped > 0 {
            self.dropped += dropped as u64;
            warn!(
                target: "recorder::flush",
                %category,
                dropped,
                max = self.policy.max_buffered,
                "buffer full, dropped oldest lines"
            );
        }
        dropped
    }

    /// True when the category reached the flush threshold and its last
    /// write did not fail.
    ///
    /// After a failure, retries wait for the interval flush (or an explicit
    /// one) instead of hitting the sink on every append.
    pub fn should_flush(&self, category: Category) -> bool {
        !self.failing.contains(&category) && self.buffered(category) >= self.policy.threshold
    }

    pub fn is_failing(&self, category: Category) -> bool {
        self.failing.contains(&category)
    }

    /// Writes the category's buffered lines as one batch and clears them.
    ///
    /// On failure the lines stay buffered for the next attempt.
    pub fn flush(&mut self, category: Category) -> Result<FlushOutcome, FlushError> {
        let buffer = match self.buffers.get_mut(&category) {
            Some(buffer) if !buffer.is_empty() => buffer,
            _ => return Ok(FlushOutcome::Empty),
        };

        let lines = buffer.pending();
        let count = lines.len();
        if let Err(source) = self.sink.append_lines(category, lines) {
            self.failing.insert(category);
            return Err(FlushError {
                category,
                pending: count,
                source,
            });
        }
        buffer.clear();
        self.failing.remove(&category);

        debug!(target: "recorder::flush", %category, lines = count, "flushed");
        Ok(FlushOutcome::Written(count))
    }

    /// Flushes every category, continuing past failures.
    pub fn flush_all(&mut self) -> FlushReport {
        let categories: Vec<_> = self.buffers.keys().copied().collect();
        let mut report = FlushReport::default();
        for category in categories {
            match self.flush(category) {
                Ok(FlushOutcome::Written(count)) => report.written += count,
                Ok(FlushOutcome::Empty) => {}
                Err(error) => {
                    warn!(
                        target: "recorder::flush",
                        error = %error,
                        "flush failed, keeping buffer"
                    );
                    report.failures.push(error);
                }
            }
        }
        report
    }

    /// Interval trigger. Flushes everything once `interval_ticks` have passed
    /// since the previous interval flush.
    pub fn on_tick(&mut self, now: Tick) -> Option<FlushReport> {
        if now.since(self.last_flush) < self.policy.interval_ticks {
            return None;
        }
        self.last_flush = now;
        Some(self.flush_all())
    }

    /// Pushes written data to durable storage.
    pub fn sync(&mut self) -> Result<(), crate::repository::SinkError> {
        self.sink.sync()
    }

    pub fn buffered(&self, category: Category) -> usize {
        self.buffers.get(&category).map_or(0, CategoryBuffer::len)
    }

    /// Lines dropped by the buffer cap since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn policy(&self) -> FlushPolicy {
        self.policy
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemorySink;

    fn policy(threshold: usize, max_buffered: usize) -> FlushPolicy {
        FlushPolicy {
            interval_ticks: 600,
            threshold,
            max_buffered,
        }
    }

    #[test]
    fn second_flush_without_appends_is_a_noop() {
        let handle = MemorySink::new();
        let mut flusher = Flusher::new(handle.clone(), policy(10, 100));
        flusher.append(Category::Gui, "a".into());

        assert_eq!(flusher.flush(Category::Gui).unwrap(), FlushOutcome::Written(1));
        assert_eq!(flusher.flush(Category::Gui).unwrap(), FlushOutcome::Empty);
        assert_eq!(handle.write_count(), 1);
    }

    #[test]
    fn failed_flush_keeps_lines_for_retry() {
        let handle = MemorySink::new();
        let mut flusher = Flusher::new(handle.clone(), policy(10, 100));
        flusher.append(Category::Construction, "a".into());
        flusher.append(Category::Construction, "b".into());

        handle.fail_next(1);
        let error = flusher.flush(Category::Construction).unwrap_err();
        assert_eq!(error.pending, 2);
        assert_eq!(flusher.buffered(Category::Construction), 2);

        flusher.append(Category::Construction, "c".into());
        assert_eq!(
            flusher.flush(Category::Construction).unwrap(),
            FlushOutcome::Written(3)
        );
        assert_eq!(handle.lines(Category::Construction), vec!["a", "b", "c"]);
    }

    #[test]
    fn cap_drops_oldest_lines() {
        let mut flusher = Flusher::new(MemorySink::new(), policy(10, 2));
        flusher.append(Category::Movement, "1".into());
        flusher.append(Category::Movement, "2".into());

        assert_eq!(flusher.append(Category::Movement, "3".into()), 1);
        assert_eq!(flusher.buffered(Category::Movement), 2);
        assert_eq!(flusher.dropped(), 1);
    }

    #[test]
    fn threshold_and_interval_triggers() {
        let handle = MemorySink::new();
        let mut flusher = Flusher::new(handle.clone(), policy(2, 100));

        flusher.append(Category::Gui, "a".into());
        assert!(!flusher.should_flush(Category::Gui));
        flusher.append(Category::Gui, "b".into());
        assert!(flusher.should_flush(Category::Gui));

        assert!(flusher.on_tick(Tick(599)).is_none());
        let report = flusher.on_tick(Tick(600)).expect("interval elapsed");
        assert_eq!(report.written, 2);
        assert!(report.is_ok());
        assert!(flusher.on_tick(Tick(1000)).is_none());
    }

    #[test]
    fn failed_write_pauses_the_threshold_until_the_interval() {
        let handle = MemorySink::new();
        let mut flusher = Flusher::new(handle.clone(), policy(2, 100));
        flusher.append(Category::Gui, "a".into());
        flusher.append(Category::Gui, "b".into());

        handle.fail_next(1);
        assert!(flusher.flush(Category::Gui).is_err());
        assert!(flusher.is_failing(Category::Gui));

        flusher.append(Category::Gui, "c".into());
        assert!(!flusher.should_flush(Category::Gui));

        let report = flusher.on_tick(Tick(600)).expect("interval elapsed");
        assert_eq!(report.written, 3);
        assert!(!flusher.is_failing(Category::Gui));
        assert_eq!(handle.attempt_count(), 2);
    }
}
