//! Event observation and structured logging for a tick-driven game host.
//!
//! The host hands every notification to a [`Recorder`]. The recorder routes
//! it to a category, runs the registered extractor against a staged copy of
//! the actor's context, and buffers a sanitized JSON line per record. Buffers
//! are flushed to one append-only file per category.
//!
//! Modules are organized by responsibility:
//! - [`events`] decodes host lines and routes them to categories
//! - [`extractors`] turns notifications into record fields
//! - [`context`] holds cross-event actor state
//! - [`record`] builds and sanitizes records
//! - [`flush`] and [`repository`] buffer and persist lines
//! - [`scheduler`] runs fire-once timers such as inspection release
//! - [`query`] answers spatial lookups for inspection and area dumps
//! - [`recorder`] wires everything together
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod extractors;
pub mod flush;
pub mod metrics;
pub mod query;
pub mod record;
pub mod recorder;
pub mod repository;
pub mod scheduler;

pub use config::RecorderConfig;
pub use context::{ActorContext, ContextStore, GuiState, Subfield};
pub use error::{RecorderError, Result};
pub use events::{Category, HostAdapter, Route, SkipReason};
pub use extractors::{
    Emit, ExtractContext, ExtractError, Extractor, ExtractorRegistry, ExtractorTable,
    UnregisteredPolicy,
};
pub use flush::{FlushError, FlushOutcome, FlushPolicy, FlushReport, Flusher};
pub use metrics::RecorderStats;
pub use query::{ContentsSource, QueryError, SerializedEntity, WorldQuery, WorldSnapshot};
pub use record::{Record, SanitizedRecord, Value, sanitize};
pub use recorder::{DispatchOutcome, HostCommand, InspectionReport, Recorder, RecorderBuilder};
pub use repository::{FileSink, LogSink, MemorySink, SinkError};
pub use scheduler::{ScheduledAction, TaskId, TaskScheduler};
