//! Manual inventory transfers between the actor and an entity.

use world_core::{EventPayload, HostEvent};

use super::{Emit, ExtractContext, ExtractError, Extractor};
use crate::record::{Record, entity_record, items_value};

/// `player_inserted_items` / `player_extracted_items`: the touched entity
/// and the moved stacks. Transfers that moved nothing are not logged.
#[derive(Debug)]
pub struct ItemTransferExtractor {
    action: &'static str,
}

impl ItemTransferExtractor {
    pub fn new(action: &'static str) -> Self {
        Self { action }
    }
}

impl Extractor for ItemTransferExtractor {
    fn name(&self) -> &'static str {
        self.action
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        _cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let payload = match &event.payload {
            EventPayload::PlayerInsertedItems(payload)
            | EventPayload::PlayerExtractedItems(payload) => payload,
            _ => return Err(ExtractError::unexpected(self.name(), event)),
        };
        let entity = payload
            .entity
            .as_ref()
            .ok_or_else(|| ExtractError::missing(event, "entity"))?;

        if payload.items.iter().all(|stack| stack.count == 0) {
            return Ok(Emit::Veto);
        }

        record
            .set("action", self.action)
            .set("entity", entity_record(entity))
            .set("items", items_value(&payload.items));
        Ok(Emit::Log)
    }
}

#[cfg(test)]
mod tests {
    use world_core::{ActorId, EntityRef, ItemStack, ItemsTransferred, Position};

    use super::*;
    use crate::config::RecorderConfig;
    use crate::context::ActorContext;
    use crate::extractors::testing::run;
    use crate::record::sanitize;

    fn inserted(entity: Option<EntityRef>, items: Vec<ItemStack>) -> HostEvent {
        HostEvent::by(
            ActorId(1),
            40,
            EventPayload::PlayerInsertedItems(ItemsTransferred { entity, items }),
        )
    }

    #[test]
    fn insertion_lists_entity_and_items() {
        let config = RecorderConfig::default();
        let mut context = ActorContext::default();
        let furnace = EntityRef::new("stone-furnace").at(Position::new(0.5, 1.5));
        let event = inserted(Some(furnace), vec![ItemStack::new("coal", 5)]);

        let run = run(&ItemTransferExtractor::new("insert_item"), &event, &mut context, &config);
        assert_eq!(run.emit.unwrap(), Emit::Log);

        let line = sanitize(&run.record).to_line();
        assert!(line.contains(concat!(
            r#""action":"insert_item","#,
            r#""entity":{"name":"stone-furnace","x":"0.5","y":"1.5"},"#,
            r#""items":[{"name":"coal","count":5}]"#
        )));
    }

    #[test]
    fn extraction_shares_the_record_shape() {
        let config = RecorderConfig::default();
        let mut context = ActorContext::default();
        let event = HostEvent::by(
            ActorId(1),
            41,
            EventPayload::PlayerExtractedItems(ItemsTransferred {
                entity: Some(EntityRef::new("iron-chest")),
                items: vec![ItemStack::new("iron-plate", 50)],
            }),
        );

        let run = run(&ItemTransferExtractor::new("extract_item"), &event, &mut context, &config);
        assert_eq!(run.emit.unwrap(), Emit::Log);
        assert!(run.record.contains("items"));
        assert_eq!(
            run.record.get("action").and_then(crate::record::Value::as_text),
            Some("extract_item")
        );
    }

    #[test]
    fn empty_transfers_are_vetoed_and_orphans_rejected() {
        let config = RecorderConfig::default();
        let mut context = ActorContext::default();
        let insert = ItemTransferExtractor::new("insert_item");

        let empty = inserted(Some(EntityRef::new("wooden-chest")), Vec::new());
        assert_eq!(run(&insert, &empty, &mut context, &config).emit.unwrap(), Emit::Veto);

        let orphan = inserted(None, vec![ItemStack::new("coal", 1)]);
        assert!(run(&insert, &orphan, &mut context, &config).emit.is_err());
    }
}
