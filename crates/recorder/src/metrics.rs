//! Recorder counters.
//!
//! Tracks how host notifications were handled and how flushing went, for
//! the end-of-session summary and for tests.

use tracing::info;

/// Counters maintained by the [`Recorder`](crate::Recorder).
///
/// The recorder is single-threaded, so plain integers are enough.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecorderStats {
    /// Notifications handed to the recorder
    pub events_seen: u64,

    /// Notifications without an actor
    pub skipped_no_actor: u64,

    /// Notifications in categories this session does not record
    pub skipped_unsubscribed: u64,

    /// Lines appended to category buffers (including synthetic records)
    pub records_emitted: u64,

    /// Notifications whose own record was suppressed by their extractor
    pub vetoed: u64,

    /// Notifications whose extractor returned an error
    pub extract_failures: u64,

    /// Host lines that could not be decoded
    pub decode_failures: u64,

    /// Successful non-empty flushes
    pub flushes: u64,

    /// Failed flush attempts
    pub flush_failures: u64,

    /// Lines dropped by the buffer cap
    pub dropped_lines: u64,

    /// Scheduled tasks that ran
    pub tasks_fired: u64,
}

impl RecorderStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications that reached an extractor.
    pub fn dispatched(&self) -> u64 {
        self.events_seen - self.skipped_no_actor - self.skipped_unsubscribed
    }

    /// Emits the counters as one structured log line.
    pub fn log_summary(&self, session_id: &str) {
        info!(
            target: "recorder::stats",
            session = session_id,
            events = self.events_seen,
            dispatched = self.dispatched(),
            records = self.records_emitted,
            vetoed = self.vetoed,
            extract_failures = self.extract_failures,
            decode_failures = self.decode_failures,
            flushes = self.flushes,
            flush_failures = self.flush_failures,
            dropped = self.dropped_lines,
            tasks = self.tasks_fired,
            "session summary"
        );
    }
}
