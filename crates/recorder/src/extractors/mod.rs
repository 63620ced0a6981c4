//! Per-category field extractors.
//!
//! Extractors turn one host notification into record fields and actor
//! context changes. They are keyed by [`EventKind`] in an
//! [`ExtractorTable`] per category.
//!
//! # Staging
//!
//! An extractor never touches the [`ContextStore`](crate::context::ContextStore)
//! directly. It works on a staged copy of the actor's context exposed by
//! [`ExtractContext`], and records follow-up work (synthetic records, task
//! cancellations, session end) as effects. The dispatcher commits both only
//! when the extractor returns `Ok`, so a failing extractor leaves no trace.

mod construction;
mod gui;
mod harvest;
mod inventory;
mod meta;
mod movement;
mod production;
mod registry;

pub use construction::{
    BlueprintConfiguredExtractor, BlueprintSetupExtractor, BuildExtractor, CursorExtractor,
    DeconstructExtractor, EquipmentExtractor, MineEntityExtractor, PasteSettingsExtractor,
    PipetteExtractor, RotateExtractor, SelectionExtractor, TileExtractor,
};
pub use gui::{
    GuiCheckedExtractor, GuiClickExtractor, GuiClosedExtractor, GuiOpenedExtractor,
    GuiTextExtractor,
};
pub use harvest::{HarvestExtractor, harvest_record};
pub use inventory::ItemTransferExtractor;
pub use meta::{PlayerJoinedExtractor, PlayerLeftExtractor};
pub use movement::{DrivingExtractor, WalkExtractor, segment_record};
pub use production::{
    CraftCancelledExtractor, CraftStartedExtractor, CraftedItemExtractor, RecipeChangedExtractor,
    ResearchStartedExtractor, craft_record,
};
pub use registry::{ExtractorRegistry, ExtractorTable, UnregisteredPolicy};

use thiserror::Error;
use world_core::{ActorId, EventKind, HostEvent};

use crate::config::RecorderConfig;
use crate::context::{ActorContext, WalkSegment};
use crate::events::Category;
use crate::record::Record;
use crate::scheduler::TaskId;

/// Whether the base record of the current event is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    Log,
    Veto,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{kind} payload is missing required {field}")]
    MalformedPayload {
        kind: EventKind,
        field: &'static str,
    },

    #[error("extractor {extractor} cannot handle {kind} payloads")]
    UnexpectedPayload {
        extractor: &'static str,
        kind: EventKind,
    },
}

impl ExtractError {
    pub fn missing(event: &HostEvent, field: &'static str) -> Self {
        ExtractError::MalformedPayload {
            kind: event.kind(),
            field,
        }
    }

    pub fn unexpected(extractor: &'static str, event: &HostEvent) -> Self {
        ExtractError::UnexpectedPayload {
            extractor,
            kind: event.kind(),
        }
    }
}

/// Turns one kind of notification into record fields.
///
/// Extractors are stateless; all cross-event state lives in the staged
/// [`ActorContext`].
pub trait Extractor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Fills `record` (already holding the base fields) and updates the
    /// staged context.
    ///
    /// Returning [`Emit::Veto`] suppresses the record while keeping context
    /// changes and effects.
    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError>;
}

/// Work an extractor asked for beyond its own record.
#[derive(Debug, Default)]
pub struct Effects {
    /// Extra records, written before the event's own record.
    pub synthetic: Vec<(Category, Record)>,
    pub cancelled: Vec<TaskId>,
    /// Drop the actor's context after committing.
    pub end_session: bool,
}

/// What an extractor can see and change while handling one event.
pub struct ExtractContext<'a> {
    actor: ActorId,
    category: Category,
    context: &'a mut ActorContext,
    config: &'a RecorderConfig,
    effects: Effects,
}

impl<'a> ExtractContext<'a> {
    pub fn new(
        actor: ActorId,
        category: Category,
        context: &'a mut ActorContext,
        config: &'a RecorderConfig,
    ) -> Self {
        Self {
            actor,
            category,
            context,
            config,
            effects: Effects::default(),
        }
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Staged context of the acting actor.
    pub fn context(&self) -> &ActorContext {
        &*self.context
    }

    pub fn context_mut(&mut self) -> &mut ActorContext {
        &mut *self.context
    }

    pub fn config(&self) -> &RecorderConfig {
        self.config
    }

    /// Queues an extra record in the current category.
    pub fn emit(&mut self, record: Record) {
        self.emit_to(self.category, record);
    }

    pub fn emit_to(&mut self, category: Category, record: Record) {
        self.effects.synthetic.push((category, record));
    }

    /// Cancels a scheduled task once the event commits.
    pub fn cancel_task(&mut self, id: TaskId) {
        self.effects.cancelled.push(id);
    }

    /// Drops the actor's context once the event commits.
    pub fn end_session(&mut self) {
        self.effects.end_session = true;
    }

    pub fn into_effects(self) -> Effects {
        self.effects
    }
}

/// Records for the actions still open in `context`: the walk segment, the
/// harvest run and partly crafted jobs. They are removed from `context`.
///
/// Called when the actor leaves and when the session ends.
pub fn close_open_actions(actor: ActorId, context: &mut ActorContext) -> Vec<(Category, Record)> {
    let mut records = Vec::new();
    if let Some(segment) = context.movement.take().filter(WalkSegment::has_moved) {
        records.push((Category::Movement, segment_record(actor, &segment)));
    }
    if let Some(run) = context.harvest.take() {
        records.push((Category::Harvest, harvest_record(actor, &run)));
    }
    for job in context.crafting.drain(..).filter(|job| job.crafted > 0) {
        records.push((Category::Crafting, craft_record(actor, &job)));
    }
    records
}

/// Writes the base record unchanged.
#[derive(Debug, Default)]
pub struct BaseOnly;

impl Extractor for BaseOnly {
    fn name(&self) -> &'static str {
        "base_only"
    }

    fn extract(
        &self,
        _event: &HostEvent,
        _record: &mut Record,
        _cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        Ok(Emit::Log)
    }
}

/// Writes nothing.
#[derive(Debug, Default)]
pub struct Skip;

impl Extractor for Skip {
    fn name(&self) -> &'static str {
        "skip"
    }

    fn extract(
        &self,
        _event: &HostEvent,
        _record: &mut Record,
        _cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        Ok(Emit::Veto)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for running one extractor against a context in isolation.

    use super::*;
    use crate::record::build_base;

    pub struct Run {
        pub emit: Result<Emit, ExtractError>,
        pub record: Record,
        pub effects: Effects,
    }

    pub fn run(
        extractor: &dyn Extractor,
        event: &HostEvent,
        context: &mut ActorContext,
        config: &RecorderConfig,
    ) -> Run {
        let category = Category::of(event.kind());
        let actor = event.player.unwrap_or(ActorId(0));
        let mut record = build_base(category, event);
        let mut cx = ExtractContext::new(actor, category, context, config);
        let emit = extractor.extract(event, &mut record, &mut cx);
        Run {
            emit,
            record,
            effects: cx.into_effects(),
        }
    }

    pub fn text<'r>(record: &'r Record, key: &str) -> Option<&'r str> {
        record.get(key).and_then(crate::record::Value::as_text)
    }
}
