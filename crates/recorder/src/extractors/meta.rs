//! Session lifecycle extractors.

use world_core::{EventPayload, HostEvent};

use super::{Emit, ExtractContext, ExtractError, Extractor, close_open_actions};
use crate::record::Record;

/// `player_joined_game`.
#[derive(Debug, Default)]
pub struct PlayerJoinedExtractor;

impl Extractor for PlayerJoinedExtractor {
    fn name(&self) -> &'static str {
        "player_joined"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        _cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::PlayerJoinedGame(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };
        record
            .set("action", "player_joined")
            .set_opt("name", payload.name.as_deref());
        Ok(Emit::Log)
    }
}

/// `player_left_game`: closes open walks, harvest runs and crafts, then drops
/// the actor's context.
#[derive(Debug, Default)]
pub struct PlayerLeftExtractor;

impl Extractor for PlayerLeftExtractor {
    fn name(&self) -> &'static str {
        "player_left"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::PlayerLeftGame(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };

        let actor = cx.actor();
        for (category, closed) in close_open_actions(actor, cx.context_mut()) {
            cx.emit_to(category, closed);
        }
        if let Some(task) = cx.context().inspection.as_ref().and_then(|i| i.release_task) {
            cx.cancel_task(task);
        }
        cx.end_session();

        record
            .set("action", "player_left")
            .set_opt("reason", payload.reason.as_deref());
        Ok(Emit::Log)
    }
}
