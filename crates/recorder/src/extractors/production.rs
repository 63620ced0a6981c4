//! Production extractors: hand crafting, machine recipes and research.
//!
//! A hand craft spans several notifications. `player_craft_started` queues a
//! [`CraftJob`] in the actor context, every `player_crafted_item` credits one
//! craft to the oldest job of that recipe, and the finish that completes the
//! job is written as one `craft_item` record carrying the queue and finish
//! ticks. Finishes for recipes with no queued job are intermediate products
//! crafted on the way to a queued one and are not recorded.

use tracing::debug;
use world_core::{ActorId, EventKind, EventPayload, HostEvent};

use super::{Emit, ExtractContext, ExtractError, Extractor};
use crate::context::CraftJob;
use crate::events::Category;
use crate::record::{Record, entity_record, set_position, synthetic};

fn fill_craft(record: &mut Record, job: &CraftJob) {
    let end = job.last_crafted_at.unwrap_or(job.queued_at);
    record
        .set("action", "craft_item")
        .set(
            "timing",
            Record::new()
                .with("start_tick", job.queued_at.0)
                .with("end_tick", end.0)
                .with("duration", end.since(job.queued_at)),
        )
        .set(
            "crafting",
            Record::new()
                .with("recipe", job.recipe.as_str())
                .with("total_crafted", job.crafted)
                .with("queued", job.queued),
        );
}

/// `craft_item` record for a job closed before all its crafts finished.
pub fn craft_record(actor: ActorId, job: &CraftJob) -> Record {
    let end = job.last_crafted_at.unwrap_or(job.queued_at);
    let mut record = synthetic(
        Category::Crafting,
        end,
        actor,
        EventKind::PlayerCraftedItem.name(),
    );
    fill_craft(&mut record, job);
    record
}

fn required_recipe<'e>(
    recipe: &'e Option<String>,
    event: &HostEvent,
) -> Result<&'e str, ExtractError> {
    recipe
        .as_deref()
        .ok_or_else(|| ExtractError::missing(event, "recipe"))
}

/// `player_craft_started`: queues a job; nothing is written yet.
#[derive(Debug, Default)]
pub struct CraftStartedExtractor;

impl Extractor for CraftStartedExtractor {
    fn name(&self) -> &'static str {
        "craft_started"
    }

    fn extract(
        &self,
        event: &HostEvent,
        _record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::PlayerCraftStarted(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };
        let recipe = required_recipe(&payload.recipe, event)?;

        if payload.count > 0 {
            cx.context_mut()
                .crafting
                .push_back(CraftJob::queued(recipe, event.tick, payload.count));
        }
        Ok(Emit::Veto)
    }
}

/// `player_crafted_item`: credits one craft and logs `craft_item` once the
/// job is complete.
#[derive(Debug, Default)]
pub struct CraftedItemExtractor;

impl Extractor for CraftedItemExtractor {
    fn name(&self) -> &'static str {
        "crafted_item"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::PlayerCraftedItem(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };
        let recipe = required_recipe(&payload.recipe, event)?;

        let actor = cx.actor();
        let queue = &mut cx.context_mut().crafting;
        let Some(index) = queue.iter().position(|job| job.recipe == recipe) else {
            debug!(target: "recorder::dispatch", %actor, recipe, "intermediate craft");
            return Ok(Emit::Veto);
        };

        let job = &mut queue[index];
        job.crafted += 1;
        job.last_crafted_at = Some(event.tick);
        if !job.is_done() {
            return Ok(Emit::Veto);
        }

        if let Some(job) = queue.remove(index) {
            fill_craft(record, &job);
        }
        Ok(Emit::Log)
    }
}

/// `player_craft_cancelled`: shrinks the newest job of the recipe. Crafts
/// that already finished are logged when the job closes.
#[derive(Debug, Default)]
pub struct CraftCancelledExtractor;

impl Extractor for CraftCancelledExtractor {
    fn name(&self) -> &'static str {
        "craft_cancelled"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::PlayerCraftCancelled(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };
        let recipe = required_recipe(&payload.recipe, event)?;

        let queue = &mut cx.context_mut().crafting;
        let Some(index) = queue.iter().rposition(|job| job.recipe == recipe) else {
            return Ok(Emit::Veto);
        };

        let job = &mut queue[index];
        job.queued = job.queued.saturating_sub(payload.count).max(job.crafted);
        if !job.is_done() {
            return Ok(Emit::Veto);
        }

        match queue.remove(index) {
            Some(job) if job.crafted > 0 => {
                fill_craft(record, &job);
                record.set("cancelled", payload.count);
                Ok(Emit::Log)
            }
            _ => Ok(Emit::Veto),
        }
    }
}

/// `entity_recipe_changed`: `set_entity_recipe`, with the actor's last known
/// location under `player`.
#[derive(Debug, Default)]
pub struct RecipeChangedExtractor;

impl Extractor for RecipeChangedExtractor {
    fn name(&self) -> &'static str {
        "set_entity_recipe"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::EntityRecipeChanged(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };
        let entity = payload
            .entity
            .as_ref()
            .ok_or_else(|| ExtractError::missing(event, "entity"))?;

        let mut player = Record::new().with("index", cx.actor().get());
        if let Some(position) = cx.context().position {
            set_position(&mut player, position);
        }

        let mut machine = entity_record(entity);
        machine
            .set_opt("new_recipe", payload.recipe.as_deref())
            .set_opt("previous_recipe", payload.previous_recipe.as_deref());
        record
            .set("player", player)
            .set("action", "set_entity_recipe")
            .set("entity", machine);
        Ok(Emit::Log)
    }
}

/// `research_started`.
#[derive(Debug, Default)]
pub struct ResearchStartedExtractor;

impl Extractor for ResearchStartedExtractor {
    fn name(&self) -> &'static str {
        "research_started"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        _cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::ResearchStarted(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };
        let research = payload
            .research
            .as_deref()
            .ok_or_else(|| ExtractError::missing(event, "research"))?;

        record
            .set("action", "research_started")
            .set("research", research)
            .set_opt("previous", payload.previous.as_deref());
        Ok(Emit::Log)
    }
}
