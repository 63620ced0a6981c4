//! Hand-mining collation.
//!
//! The host reports one notification per mining cycle. Cycles on the same
//! resource that follow each other within `harvest_gap_ticks` are folded
//! into one run, written as a single record when the actor moves on to
//! another resource, leaves, or the session ends.

use tracing::trace;
use world_core::{ActorId, EventKind, EventPayload, HostEvent};

use super::{Emit, ExtractContext, ExtractError, Extractor};
use crate::context::HarvestRun;
use crate::events::Category;
use crate::record::{Record, set_position, synthetic};

/// Record for a closed harvest run. `entity` is the resource name and the
/// run's start is `tick - duration_ticks`.
pub fn harvest_record(actor: ActorId, run: &HarvestRun) -> Record {
    let mut record = synthetic(
        Category::Harvest,
        run.last_tick,
        actor,
        EventKind::PlayerHarvestedResource.name(),
    );
    record
        .set("action", "harvest_resource")
        .set("entity", run.entity.name.as_str());
    if let Some(position) = run.entity.position {
        set_position(&mut record, position);
    }
    record
        .set("duration_ticks", run.last_tick.since(run.start_tick))
        .set("cycles", run.cycles)
        .set("count", run.products);
    record
}

/// `player_harvested_resource`.
#[derive(Debug, Default)]
pub struct HarvestExtractor;

impl Extractor for HarvestExtractor {
    fn name(&self) -> &'static str {
        "harvest"
    }

    fn extract(
        &self,
        event: &HostEvent,
        _record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::PlayerHarvestedResource(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };
        let entity = payload
            .entity
            .as_ref()
            .ok_or_else(|| ExtractError::missing(event, "entity"))?;

        let products: u32 = payload.products.iter().map(|stack| stack.count).sum();
        let gap_limit = cx.config().harvest_gap_ticks;
        let actor = cx.actor();

        let next = match cx.context_mut().harvest.take() {
            Some(mut run)
                if run.entity.same_entity(entity)
                    && event.tick.since(run.last_tick) <= gap_limit =>
            {
                run.last_tick = event.tick;
                run.cycles += 1;
                run.products += products;
                run
            }
            previous => {
                if let Some(run) = previous {
                    cx.emit(harvest_record(actor, &run));
                }
                HarvestRun::starting(entity.clone(), event.tick, products)
            }
        };

        trace!(
            target: "recorder::dispatch",
            %actor,
            resource = %next.entity.name,
            cycles = next.cycles,
            "harvest run"
        );
        cx.context_mut().harvest = Some(next);
        Ok(Emit::Veto)
    }
}
