//! Session orchestrator.
//!
//! The recorder owns the actor contexts, the scheduler and the flusher, and
//! drives one notification at a time through route, extract, commit and
//! buffer. It is synchronous; the host calls it from its tick loop.

use tracing::{debug, info, trace, warn};
use world_core::{ActorId, EntityRef, HostEvent, Tick};

use crate::config::RecorderConfig;
use crate::context::{ActorContext, ContextStore, Inspection, Subfield};
use crate::error::{RecorderError, Result};
use crate::events::{Category, HostAdapter, Route, SkipReason};
use crate::extractors::{Effects, Emit, ExtractContext, ExtractorRegistry, close_open_actions};
use crate::flush::{FlushOutcome, FlushPolicy, FlushReport, Flusher};
use crate::metrics::RecorderStats;
use crate::query::{Contents, ContentsSource, SerializedEntity, WorldQuery, encode_area};
use crate::record::{Record, build_base, sanitize, synthetic};
use crate::repository::{FileSink, LogSink};
use crate::scheduler::{ScheduledAction, ScheduledTask, TaskId, TaskScheduler};

/// Request for the host, drained with [`Recorder::drain_commands`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    OpenView { actor: ActorId, target: EntityRef },
    CloseView { actor: ActorId, target: EntityRef },
}

/// What happened to one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The event's record was buffered; `lines` includes synthetic records.
    Logged { lines: usize },
    /// The extractor suppressed the event's record. Synthetic records may
    /// still have been buffered.
    Vetoed { lines: usize },
    /// The extractor failed; nothing was committed.
    Failed,
    Skipped(SkipReason),
}

/// Result of [`Recorder::inspect_nearest`].
#[derive(Debug, Clone, PartialEq)]
pub struct InspectionReport {
    pub target: EntityRef,
    pub contents: Contents,
    /// Release timer, absent when `inspection_release_ticks` is zero.
    pub release_task: Option<TaskId>,
}

pub struct Recorder<S> {
    config: RecorderConfig,
    session_id: String,
    adapter: HostAdapter,
    registry: ExtractorRegistry,
    contexts: ContextStore,
    scheduler: TaskScheduler,
    flusher: Flusher<S>,
    commands: Vec<HostCommand>,
    stats: RecorderStats,
    current_tick: Tick,
}

impl Recorder<FileSink> {
    /// Recorder writing to `<output_dir>/<session_id>/`.
    pub fn with_file_sink(config: RecorderConfig) -> Result<Self> {
        let session_id = config.resolve_session_id();
        let sink = FileSink::open(config.session_dir(&session_id))?;
        Recorder::builder()
            .config(RecorderConfig {
                session_id: Some(session_id),
                ..config
            })
            .sink(sink)
            .build()
    }
}

impl<S: LogSink> Recorder<S> {
    pub fn builder() -> RecorderBuilder<S> {
        RecorderBuilder::new()
    }

    /// Handles one host notification.
    ///
    /// Extractor failures are logged and counted here and never returned.
    pub fn handle_event(&mut self, event: &HostEvent) -> DispatchOutcome {
        self.stats.events_seen += 1;
        if event.tick > self.current_tick {
            self.on_tick(event.tick);
        }

        let (actor, category) = match self.adapter.route(event) {
            Route::Dispatch { actor, category } => (actor, category),
            Route::Skip(reason) => {
                match reason {
                    SkipReason::NoActor => self.stats.skipped_no_actor += 1,
                    SkipReason::Unsubscribed(_) => self.stats.skipped_unsubscribed += 1,
                }
                trace!(target: "recorder::dispatch", kind = %event.kind(), ?reason, "skipped");
                return DispatchOutcome::Skipped(reason);
            }
        };

        let kind = event.kind();
        let extractor = self.registry.resolve(category, kind);
        let name = extractor.name();
        let mut record = build_base(category, event);
        let mut staged = self.contexts.get(actor);
        let mut cx = ExtractContext::new(actor, category, &mut staged, &self.config);
        let result = extractor.extract(event, &mut record, &mut cx);
        let effects = cx.into_effects();

        match result {
            Ok(emit) => {
                let lines = self.commit(actor, staged, effects);
                trace!(
                    target: "recorder::dispatch",
                    %actor,
                    %kind,
                    extractor = name,
                    ?emit,
                    "dispatched"
                );
                match emit {
                    Emit::Log => {
                        self.append(category, &record);
                        self.flush_if_full(category);
                        DispatchOutcome::Logged { lines: lines + 1 }
                    }
                    Emit::Veto => {
                        self.stats.vetoed += 1;
                        DispatchOutcome::Vetoed { lines }
                    }
                }
            }
            Err(error) => {
                self.stats.extract_failures += 1;
                warn!(
                    target: "recorder::dispatch",
                    %actor,
                    %kind,
                    extractor = name,
                    tick = event.tick.0,
                    error = %error,
                    "extractor failed, event dropped"
                );
                DispatchOutcome::Failed
            }
        }
    }

    /// Decodes and handles one line of the host wire format.
    pub fn handle_raw(&mut self, line: &str) -> Result<DispatchOutcome> {
        match self.adapter.decode(line) {
            Ok(event) => Ok(self.handle_event(&event)),
            Err(error) => {
                self.stats.decode_failures += 1;
                Err(error.into())
            }
        }
    }

    /// Advances the clock: runs due tasks, then the interval flush.
    pub fn on_tick(&mut self, now: Tick) {
        if now > self.current_tick {
            self.current_tick = now;
        }

        for task in self.scheduler.pop_due(now) {
            self.stats.tasks_fired += 1;
            self.run_task(task);
        }

        if let Some(report) = self.flusher.on_tick(now) {
            self.count_report(&report);
        }
    }

    /// Opens the nearest structure around `actor` for inspection and arms the
    /// release timer.
    ///
    /// All world lookups happen before any state changes, so a failed lookup
    /// leaves the session untouched.
    pub fn inspect_nearest(
        &mut self,
        world: &dyn WorldQuery,
        actor: ActorId,
        radius: f64,
        filter: Option<&str>,
    ) -> Result<InspectionReport> {
        let position = world.actor_position(actor)?;
        let target = world.find_nearest_structure(position, radius, filter)?;
        let contents = world.read_contents(ContentsSource::Entity(&target))?;

        let now = self.current_tick;
        let previous = self
            .contexts
            .peek(actor)
            .and_then(|context| context.inspection.as_ref())
            .and_then(|inspection| inspection.release_task);
        if let Some(task) = previous {
            self.scheduler.cancel(task);
        }

        let delay = self.config.inspection_release_ticks;
        let release_task = (delay > 0).then(|| {
            self.scheduler.schedule(
                now,
                delay,
                ScheduledAction::ReleaseInspection {
                    actor,
                    target: target.clone(),
                },
            )
        });

        self.contexts.get_mut(actor).inspection = Some(Inspection {
            target: target.clone(),
            opened_at: now,
            auto_close: release_task.is_some(),
            release_task,
        });
        self.commands.push(HostCommand::OpenView {
            actor,
            target: target.clone(),
        });

        if self.adapter.is_subscribed(Category::Gui) {
            let mut record = synthetic(Category::Gui, now, actor, "inspect");
            record.set("action", "inspect_container").set(
                "entity",
                SerializedEntity {
                    entity: target.clone(),
                    contents: contents.clone(),
                }
                .to_record(),
            );
            self.append(Category::Gui, &record);
            self.flush_if_full(Category::Gui);
        }

        debug!(
            target: "recorder::dispatch",
            %actor,
            entity = %target.name,
            release_at = release_task.map(|_| (now + delay).0),
            "inspection opened"
        );
        Ok(InspectionReport {
            target,
            contents,
            release_task,
        })
    }

    /// Encodes every structure around `actor`, nearest first.
    pub fn dump_area(
        &self,
        world: &dyn WorldQuery,
        actor: ActorId,
        radius: f64,
        filter: Option<&str>,
    ) -> Result<Vec<String>> {
        let position = world.actor_position(actor)?;
        Ok(encode_area(&world.dump_area(position, radius, filter)))
    }

    /// Takes the queued host commands.
    pub fn drain_commands(&mut self) -> Vec<HostCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Flushes one category now.
    pub fn flush(&mut self, category: Category) -> Result<FlushOutcome> {
        match self.flusher.flush(category) {
            Ok(outcome) => {
                if let FlushOutcome::Written(_) = outcome {
                    self.stats.flushes += 1;
                }
                Ok(outcome)
            }
            Err(error) => {
                self.stats.flush_failures += 1;
                Err(error.into())
            }
        }
    }

    /// Closes every actor's open actions, flushes every category and syncs
    /// the sink.
    ///
    /// Flush failures are reported in the returned report; a failing sync is
    /// returned as an error.
    pub fn end_session(&mut self) -> Result<FlushReport> {
        for actor in self.contexts.actors() {
            for (category, record) in close_open_actions(actor, self.contexts.get_mut(actor)) {
                self.append(category, &record);
            }
        }

        let report = self.flusher.flush_all();
        let written = report.written;
        let failures = report.failures.len();
        self.count_report(&report);
        self.flusher.sync()?;

        self.stats.dropped_lines = self.flusher.dropped();
        self.stats.log_summary(&self.session_id);
        info!(
            target: "recorder::flush",
            session = %self.session_id,
            written,
            failures,
            "session ended"
        );
        Ok(report)
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn contexts(&self) -> &ContextStore {
        &self.contexts
    }

    /// Context of `actor`, empty when unknown.
    pub fn context(&self, actor: ActorId) -> ActorContext {
        self.contexts.get(actor)
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    pub fn stats(&self) -> &RecorderStats {
        &self.stats
    }

    pub fn sink(&self) -> &S {
        self.flusher.sink()
    }

    pub fn buffered(&self, category: Category) -> usize {
        self.flusher.buffered(category)
    }

    /// Commits a successful extraction and buffers its synthetic records.
    fn commit(&mut self, actor: ActorId, staged: ActorContext, effects: Effects) -> usize {
        self.contexts.replace(actor, staged);
        for task in effects.cancelled {
            self.scheduler.cancel(task);
        }
        if effects.end_session {
            self.contexts.remove(actor);
            debug!(target: "recorder::context", %actor, "context dropped");
        }

        let mut lines = 0;
        for (category, record) in &effects.synthetic {
            if self.append(*category, record) {
                lines += 1;
            }
        }
        for (category, _) in &effects.synthetic {
            self.flush_if_full(*category);
        }
        lines
    }

    /// Sanitizes and buffers one record. Returns `false` for unsubscribed
    /// categories.
    fn append(&mut self, category: Category, record: &Record) -> bool {
        if !self.adapter.is_subscribed(category) {
            return false;
        }
        let line = sanitize(record).to_line();
        let dropped = self.flusher.append(category, line);
        self.stats.records_emitted += 1;
        self.stats.dropped_lines += dropped as u64;
        true
    }

    fn flush_if_full(&mut self, category: Category) {
        if !self.flusher.should_flush(category) {
            return;
        }
        match self.flusher.flush(category) {
            Ok(FlushOutcome::Written(_)) => self.stats.flushes += 1,
            Ok(FlushOutcome::Empty) => {}
            Err(error) => {
                self.stats.flush_failures += 1;
                warn!(
                    target: "recorder::flush",
                    error = %error,
                    "threshold flush failed, retrying at the next interval flush"
                );
            }
        }
    }

    fn count_report(&mut self, report: &FlushReport) {
        if report.written > 0 {
            self.stats.flushes += 1;
        }
        self.stats.flush_failures += report.failures.len() as u64;
    }

    fn run_task(&mut self, task: ScheduledTask) {
        match task.action {
            ScheduledAction::ReleaseInspection { actor, target } => {
                let still_open = self
                    .contexts
                    .peek(actor)
                    .and_then(|context| context.inspection.as_ref())
                    .is_some_and(|inspection| {
                        inspection.auto_close && inspection.release_task == Some(task.id)
                    });
                if !still_open {
                    debug!(
                        target: "recorder::scheduler",
                        task = task.id.0,
                        %actor,
                        "inspection already closed, nothing to release"
                    );
                    return;
                }

                self.contexts.clear(actor, Subfield::Inspection);
                debug!(
                    target: "recorder::scheduler",
                    task = task.id.0,
                    %actor,
                    entity = %target.name,
                    "releasing inspection view"
                );
                self.commands.push(HostCommand::CloseView { actor, target });
            }
        }
    }
}

/// Builder for [`Recorder`].
pub struct RecorderBuilder<S> {
    config: RecorderConfig,
    registry: Option<ExtractorRegistry>,
    sink: Option<S>,
}

impl<S: LogSink> RecorderBuilder<S> {
    fn new() -> Self {
        Self {
            config: RecorderConfig::default(),
            registry: None,
            sink: None,
        }
    }

    pub fn config(mut self, config: RecorderConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default extractor tables.
    pub fn registry(mut self, registry: ExtractorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn sink(mut self, sink: S) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<Recorder<S>> {
        self.config.validate()?;
        let sink = self.sink.ok_or(RecorderError::MissingSink)?;
        let session_id = self.config.resolve_session_id();
        let adapter = HostAdapter::new(self.config.categories.iter().copied());
        let flusher = Flusher::new(sink, FlushPolicy::from_config(&self.config));

        info!(
            target: "recorder::dispatch",
            session = %session_id,
            categories = ?self.config.categories,
            "recorder started"
        );
        Ok(Recorder {
            session_id,
            adapter,
            registry: self.registry.unwrap_or_default(),
            contexts: ContextStore::new(),
            scheduler: TaskScheduler::new(),
            flusher,
            commands: Vec::new(),
            stats: RecorderStats::new(),
            current_tick: Tick::ZERO,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use world_core::{BuiltEntity, EventPayload, GuiType, Position};

    use super::*;
    use crate::query::WorldSnapshot;
    use crate::repository::MemorySink;

    fn recorder(sink: MemorySink) -> Recorder<MemorySink> {
        Recorder::builder()
            .config(RecorderConfig {
                session_id: Some("replay_test".into()),
                ..RecorderConfig::default()
            })
            .sink(sink)
            .build()
            .unwrap()
    }

    #[test]
    fn build_requires_a_sink() {
        let result = Recorder::<MemorySink>::builder().build();
        assert!(matches!(result, Err(RecorderError::MissingSink)));
    }

    #[test]
    fn actorless_events_are_counted_and_skipped() {
        let mut recorder = recorder(MemorySink::new());
        let event = HostEvent::new(
            Tick(1),
            None,
            EventPayload::BuiltEntity(BuiltEntity::default()),
        );

        assert_eq!(
            recorder.handle_event(&event),
            DispatchOutcome::Skipped(SkipReason::NoActor)
        );
        assert_eq!(recorder.stats().skipped_no_actor, 1);
        assert_eq!(recorder.buffered(Category::Construction), 0);
    }

    #[test]
    fn malformed_lines_are_reported() {
        let mut recorder = recorder(MemorySink::new());

        assert!(matches!(
            recorder.handle_raw("{not json"),
            Err(RecorderError::Adapter(_))
        ));
        assert_eq!(recorder.stats().decode_failures, 1);
    }

    #[test]
    fn reinspection_replaces_the_release_timer() {
        let world = WorldSnapshot::new()
            .with_actor(ActorId(1), Position::ORIGIN)
            .with_structure(
                EntityRef::new("wooden-chest").at(Position::new(1.0, 0.0)),
                &[("coal", 5)],
            );
        let mut recorder = recorder(MemorySink::new());

        let first = recorder
            .inspect_nearest(&world, ActorId(1), 5.0, None)
            .unwrap();
        recorder.on_tick(Tick(30));
        let second = recorder
            .inspect_nearest(&world, ActorId(1), 5.0, None)
            .unwrap();

        let first_task = first.release_task.unwrap();
        assert!(!recorder.scheduler().is_pending(first_task));
        assert_eq!(recorder.scheduler().next_fire_tick(), Some(Tick(90)));
        assert_eq!(second.contents["coal"], 5);

        recorder.on_tick(Tick(60));
        assert_eq!(recorder.drain_commands().len(), 2);
        recorder.on_tick(Tick(90));
        let commands = recorder.drain_commands();
        assert!(matches!(commands.as_slice(), [HostCommand::CloseView { .. }]));
        assert!(recorder.context(ActorId(1)).inspection.is_none());
    }

    #[test]
    fn failed_lookup_changes_nothing() {
        let world = WorldSnapshot::new().with_actor(ActorId(1), Position::ORIGIN);
        let mut recorder = recorder(MemorySink::new());

        let result = recorder.inspect_nearest(&world, ActorId(1), 5.0, Some("iron-chest"));
        assert!(matches!(result, Err(RecorderError::Query(_))));
        assert!(recorder.scheduler().is_empty());
        assert!(recorder.contexts().is_empty());
        assert!(recorder.drain_commands().is_empty());
    }

    #[test]
    fn gui_records_reach_the_gui_buffer() {
        let mut recorder = recorder(MemorySink::new());
        let line = r#"{"tick":5,"player":2,"kind":"gui_opened","gui_type":"blueprint_book"}"#;

        assert_eq!(
            recorder.handle_raw(line).unwrap(),
            DispatchOutcome::Logged { lines: 1 }
        );
        assert_eq!(recorder.buffered(Category::Gui), 1);
        assert_eq!(
            recorder.context(ActorId(2)).tracked_gui(),
            Some(GuiType::BlueprintBook)
        );
    }
}
