//! Construction extractors: building, mining, rotating, tiles, equipment,
//! blueprints, and what the actor holds or hovers.

use tracing::debug;
use world_core::{EventPayload, HostEvent};

use super::{Emit, ExtractContext, ExtractError, Extractor};
use crate::context::{BlueprintDraft, Ephemeral};
use crate::record::{
    Record, Value, area_record, direction_record, entity_record, item_record, items_value,
    position_record,
};

/// `built_entity`: one `build` record. The item falls back to what the
/// actor holds when the host does not report it.
#[derive(Debug, Default)]
pub struct BuildExtractor;

impl Extractor for BuildExtractor {
    fn name(&self) -> &'static str {
        "build"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::BuiltEntity(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };

        let context = cx.context();
        let (item, count) = match &payload.item {
            Some(stack) => (Some(stack.name.clone()), Some(stack.count)),
            None => (context.cursor_item.clone(), context.cursor_count),
        };

        record.set("action", "build");
        if let Some(entity) = &payload.entity {
            record.set("entity", entity_record(entity));
        }
        record.set(
            "item",
            Record::new().with_opt("name", item).with_opt("count", count),
        );
        Ok(Emit::Log)
    }
}

/// `rotated_entity`: `rotate_entity`, with the entity's `direction` holding
/// the `previous` and `new` orientation.
#[derive(Debug, Default)]
pub struct RotateExtractor;

impl Extractor for RotateExtractor {
    fn name(&self) -> &'static str {
        "rotate"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        _cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::RotatedEntity(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };
        let entity = payload
            .entity
            .as_ref()
            .ok_or_else(|| ExtractError::missing(event, "entity"))?;

        let mut rotated = entity_record(entity);
        rotated.set(
            "direction",
            Record::new()
                .with_opt("previous", payload.previous_direction.map(direction_record))
                .with_opt("new", entity.direction.map(direction_record)),
        );
        record
            .set("action", "rotate_entity")
            .set("entity", rotated);
        Ok(Emit::Log)
    }
}

/// `player_mined_entity`: `mine_entity` with the products received.
#[derive(Debug, Default)]
pub struct MineEntityExtractor;

impl Extractor for MineEntityExtractor {
    fn name(&self) -> &'static str {
        "mine_entity"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::PlayerMinedEntity(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };

        record.set("action", "mine_entity");
        if let Some(entity) = &payload.entity {
            record.set("entity", entity_record(entity));
            let context = cx.context_mut();
            if context
                .selected
                .as_ref()
                .is_some_and(|selected| selected.same_entity(entity))
            {
                context.selected = None;
            }
        }
        if !payload.products.is_empty() {
            record.set("products", items_value(&payload.products));
        }
        Ok(Emit::Log)
    }
}

/// `player_built_tile` / `player_mined_tile`.
#[derive(Debug)]
pub struct TileExtractor {
    action: &'static str,
}

impl TileExtractor {
    pub fn new(action: &'static str) -> Self {
        Self { action }
    }
}

impl Extractor for TileExtractor {
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
            EventPayload::PlayerBuiltTile(payload) | EventPayload::PlayerMinedTile(payload) => {
                payload
            }
            _ => return Err(ExtractError::unexpected(self.name(), event)),
        };

        record
            .set("action", self.action)
            .set_opt("tile", payload.tile.as_deref())
            .set("count", payload.positions.len());
        if let Some(item) = &payload.item {
            record.set("item", item_record(item));
        }
        if !payload.positions.is_empty() {
            let tiles: Vec<Value> = payload
                .positions
                .iter()
                .map(|p| Value::Map(position_record(*p)))
                .collect();
            record.set("tiles", tiles);
        }
        Ok(Emit::Log)
    }
}

/// `player_placed_equipment` / `player_removed_equipment`.
#[derive(Debug)]
pub struct EquipmentExtractor {
    action: &'static str,
}

impl EquipmentExtractor {
    pub fn new(action: &'static str) -> Self {
        Self { action }
    }
}

impl Extractor for EquipmentExtractor {
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
            EventPayload::PlayerPlacedEquipment(payload)
            | EventPayload::PlayerRemovedEquipment(payload) => payload,
            _ => return Err(ExtractError::unexpected(self.name(), event)),
        };

        record
            .set("action", self.action)
            .set_opt("equipment", payload.equipment.as_deref())
            .set_opt("count", payload.count);
        if let Some(owner) = &payload.grid_owner {
            record.set("grid_owner", entity_record(owner));
        }
        if let Some(position) = payload.grid_position {
            record.set("grid_position", position_record(position));
        }
        Ok(Emit::Log)
    }
}

/// `player_setup_blueprint`: stages the blueprint draft until it is
/// configured.
#[derive(Debug, Default)]
pub struct BlueprintSetupExtractor;

impl Extractor for BlueprintSetupExtractor {
    fn name(&self) -> &'static str {
        "blueprint_setup"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::PlayerSetupBlueprint(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };

        let actor = cx.actor();
        let context = cx.context_mut();
        if let Some(Ephemeral::BlueprintSetup(previous)) = &context.ephemeral {
            debug!(
                target: "recorder::dispatch",
                %actor,
                previous_tick = ?previous.tick,
                "blueprint setup superseded before configuration"
            );
        }
        context.ephemeral = Some(Ephemeral::BlueprintSetup(BlueprintDraft {
            tick: Some(event.tick),
            area: payload.area,
            item: payload.item.clone(),
            entity_count: payload.entity_count,
        }));
        context.blueprint.setups += 1;

        record.set("action", "blueprint_setup");
        if let Some(area) = &payload.area {
            record.set("area", area_record(area));
        }
        record
            .set_opt("item", payload.item.as_deref())
            .set_opt("entity_count", payload.entity_count)
            .set_opt("alt", payload.alt.then_some(true));
        Ok(Emit::Log)
    }
}

/// `player_configured_blueprint`: consumes the staged draft, or a default
/// one when no setup preceded it.
#[derive(Debug, Default)]
pub struct BlueprintConfiguredExtractor;

impl Extractor for BlueprintConfiguredExtractor {
    fn name(&self) -> &'static str {
        "blueprint_configured"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::PlayerConfiguredBlueprint(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };

        let context = cx.context_mut();
        let draft = match context.ephemeral.take() {
            Some(Ephemeral::BlueprintSetup(draft)) => draft,
            other => {
                context.ephemeral = other;
                BlueprintDraft::default()
            }
        };
        context.blueprint.configured += 1;
        context.blueprint.last_configured_at = Some(event.tick);
        let counts = Record::new()
            .with("setups", context.blueprint.setups)
            .with("configured", context.blueprint.configured);

        record
            .set("action", "blueprint_configured")
            .set_opt("label", payload.label.as_deref())
            .set_opt("entity_count", payload.entity_count.or(draft.entity_count))
            .set_opt("item", draft.item)
            .set_opt("setup_tick", draft.tick.map(|t| t.0))
            .set_opt("setup_duration", draft.tick.map(|t| event.tick.since(t)));
        if let Some(area) = &draft.area {
            record.set("area", area_record(area));
        }
        record.set("blueprints", counts);
        Ok(Emit::Log)
    }
}

/// `player_deconstructed_area`.
#[derive(Debug, Default)]
pub struct DeconstructExtractor;

impl Extractor for DeconstructExtractor {
    fn name(&self) -> &'static str {
        "deconstruct_area"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        _cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::PlayerDeconstructedArea(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };

        record.set("action", "deconstruct_area");
        if let Some(area) = &payload.area {
            record.set("area", area_record(area));
        }
        record
            .set_opt("item", payload.item.as_deref())
            .set_opt("cancel", payload.alt.then_some(true));
        Ok(Emit::Log)
    }
}

/// `entity_settings_pasted`: needs the destination to be meaningful.
#[derive(Debug, Default)]
pub struct PasteSettingsExtractor;

impl Extractor for PasteSettingsExtractor {
    fn name(&self) -> &'static str {
        "paste_settings"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        _cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::EntitySettingsPasted(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };
        let destination = payload
            .destination
            .as_ref()
            .ok_or_else(|| ExtractError::missing(event, "destination"))?;

        record.set("action", "paste_settings");
        if let Some(source) = &payload.source {
            record.set("source", entity_record(source));
        }
        record.set("destination", entity_record(destination));
        Ok(Emit::Log)
    }
}

/// `player_pipette`, enriched with the hovered entity.
#[derive(Debug, Default)]
pub struct PipetteExtractor;

impl Extractor for PipetteExtractor {
    fn name(&self) -> &'static str {
        "pipette"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::PlayerPipette(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };

        record
            .set("action", "pipette")
            .set_opt("item", payload.item.as_deref())
            .set_opt("cheat_mode", payload.used_cheat_mode.then_some(true));
        if let Some(selected) = &cx.context().selected {
            record.set("source", entity_record(selected));
        }
        Ok(Emit::Log)
    }
}

/// `player_cursor_stack_changed`: tracks the held item; empty hands are not
/// logged.
#[derive(Debug, Default)]
pub struct CursorExtractor;

impl Extractor for CursorExtractor {
    fn name(&self) -> &'static str {
        "cursor"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::PlayerCursorStackChanged(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };

        let context = cx.context_mut();
        let Some(stack) = &payload.cursor else {
            context.cursor_item = None;
            context.cursor_count = None;
            return Ok(Emit::Veto);
        };

        context.cursor_item = Some(stack.name.clone());
        context.cursor_count = Some(stack.count);
        record
            .set("action", "cursor_changed")
            .set("item", item_record(stack));
        if let Some(gui) = context.tracked_gui() {
            record.set("gui", gui.to_string());
        }
        Ok(Emit::Log)
    }
}

/// `selected_entity_changed`: context only.
#[derive(Debug, Default)]
pub struct SelectionExtractor;

impl Extractor for SelectionExtractor {
    fn name(&self) -> &'static str {
        "selection"
    }

    fn extract(
        &self,
        event: &HostEvent,
        _record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::SelectedEntityChanged(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };
        cx.context_mut().selected = payload.selected.clone();
        Ok(Emit::Veto)
    }
}

#[cfg(test)]
mod tests {
    use world_core::{
        ActorId, Area, BlueprintConfigured, BlueprintSetup, BuiltEntity, CursorStackChanged,
        Direction, EntityRef, ItemStack, Pipette, Position, RotatedEntity, SelectedEntityChanged,
        SettingsPasted, Tick,
    };

    use super::*;
    use crate::config::RecorderConfig;
    use crate::context::ActorContext;
    use crate::extractors::testing::{run, text};
    use crate::record::sanitize;

    fn event(tick: u64, payload: EventPayload) -> HostEvent {
        HostEvent::by(ActorId(2), tick, payload)
    }

    fn setup(tick: u64, count: u32) -> HostEvent {
        event(
            tick,
            EventPayload::PlayerSetupBlueprint(BlueprintSetup {
                area: Some(Area::new(Position::new(0.0, 0.0), Position::new(4.0, 4.0))),
                item: Some("blueprint".into()),
                entity_count: Some(count),
                alt: false,
            }),
        )
    }

    fn configured(tick: u64) -> HostEvent {
        event(
            tick,
            EventPayload::PlayerConfiguredBlueprint(BlueprintConfigured {
                label: Some("smelting".into()),
                entity_count: None,
            }),
        )
    }

    #[test]
    fn build_falls_back_to_the_held_item() {
        let config = RecorderConfig::default();
        let mut context = ActorContext {
            cursor_item: Some("assembling-machine-1".into()),
            cursor_count: Some(4),
            ..ActorContext::default()
        };
        let built = event(
            10,
            EventPayload::BuiltEntity(BuiltEntity {
                entity: Some(
                    EntityRef::new("assembling-machine-1")
                        .at(Position::new(5.5, 6.5))
                        .facing(Direction::North),
                ),
                item: None,
            }),
        );

        let run = run(&BuildExtractor, &built, &mut context, &config);
        assert_eq!(run.emit.unwrap(), Emit::Log);
        assert!(context.ephemeral.is_none());
        assert_eq!(context.cursor_count, Some(4));

        let line = sanitize(&run.record).to_line();
        assert!(line.contains(r#""x":"5.5","y":"6.5","action":"build""#));
        assert!(line.contains(r#""item":{"name":"assembling-machine-1","count":4}"#));
    }

    #[test]
    fn build_leaves_pending_blueprint_setup() {
        let config = RecorderConfig::default();
        let mut context = ActorContext::default();
        run(&BlueprintSetupExtractor, &setup(1, 3), &mut context, &config);

        let built = event(2, EventPayload::BuiltEntity(BuiltEntity::default()));
        run(&BuildExtractor, &built, &mut context, &config);

        assert!(matches!(context.ephemeral, Some(Ephemeral::BlueprintSetup(_))));
    }

    #[test]
    fn configured_consumes_the_setup() {
        let config = RecorderConfig::default();
        let mut context = ActorContext::default();
        run(&BlueprintSetupExtractor, &setup(40, 12), &mut context, &config);
        let run = run(&BlueprintConfiguredExtractor, &configured(45), &mut context, &config);

        assert!(context.ephemeral.is_none());
        assert_eq!(context.blueprint.setups, 1);
        assert_eq!(context.blueprint.configured, 1);
        assert_eq!(run.record.get("entity_count"), Some(&Value::UInt(12)));
        assert_eq!(run.record.get("setup_duration"), Some(&Value::UInt(5)));
        assert!(run.record.contains("area"));

        let line = sanitize(&run.record).to_line();
        assert!(line.contains(r#""blueprints":{"setups":1,"configured":1}"#));
    }

    #[test]
    fn configured_reports_running_blueprint_counts() {
        let config = RecorderConfig::default();
        let mut context = ActorContext::default();
        run(&BlueprintSetupExtractor, &setup(1, 2), &mut context, &config);
        run(&BlueprintConfiguredExtractor, &configured(2), &mut context, &config);
        run(&BlueprintSetupExtractor, &setup(10, 4), &mut context, &config);
        run(&BlueprintSetupExtractor, &setup(11, 5), &mut context, &config);
        let run = run(&BlueprintConfiguredExtractor, &configured(12), &mut context, &config);

        let counts = run.record.get("blueprints").and_then(Value::as_map).unwrap();
        assert_eq!(counts.get("setups"), Some(&Value::UInt(3)));
        assert_eq!(counts.get("configured"), Some(&Value::UInt(2)));
        assert_eq!(run.record.get("entity_count"), Some(&Value::UInt(5)));
    }

    #[test]
    fn configured_without_setup_uses_default_payload() {
        let config = RecorderConfig::default();
        let mut context = ActorContext::default();
        let run = run(&BlueprintConfiguredExtractor, &configured(45), &mut context, &config);

        assert_eq!(run.emit.unwrap(), Emit::Log);
        assert!(!run.record.contains("setup_tick"));
        assert!(!run.record.contains("area"));
        assert_eq!(text(&run.record, "label"), Some("smelting"));
        assert_eq!(context.blueprint.last_configured_at, Some(Tick(45)));
    }

    #[test]
    fn rotation_nests_previous_and_new_direction() {
        let config = RecorderConfig::default();
        let mut context = ActorContext::default();
        let rotated = event(
            8,
            EventPayload::RotatedEntity(RotatedEntity {
                entity: Some(
                    EntityRef::new("inserter")
                        .at(Position::new(2.5, 3.5))
                        .facing(Direction::East),
                ),
                previous_direction: Some(Direction::North),
            }),
        );

        let run = run(&RotateExtractor, &rotated, &mut context, &config);
        assert_eq!(run.emit.unwrap(), Emit::Log);
        assert_eq!(text(&run.record, "action"), Some("rotate_entity"));

        let line = sanitize(&run.record).to_line();
        assert!(line.contains(concat!(
            r#""entity":{"name":"inserter","x":"2.5","y":"3.5","direction":{"#,
            r#""previous":{"name":"north","value":0},"new":{"name":"east","value":2}}}"#
        )));
        assert!(!line.contains("previous_direction"));
    }

    #[test]
    fn rotation_without_entity_is_malformed() {
        let config = RecorderConfig::default();
        let mut context = ActorContext::default();
        let rotated = event(3, EventPayload::RotatedEntity(RotatedEntity::default()));

        let run = run(&RotateExtractor, &rotated, &mut context, &config);
        assert!(matches!(
            run.emit,
            Err(ExtractError::MalformedPayload { field: "entity", .. })
        ));
    }

    #[test]
    fn paste_requires_destination() {
        let config = RecorderConfig::default();
        let mut context = ActorContext::default();
        let pasted = event(
            3,
            EventPayload::EntitySettingsPasted(SettingsPasted {
                source: Some(EntityRef::new("assembling-machine-2")),
                destination: None,
            }),
        );

        assert!(run(&PasteSettingsExtractor, &pasted, &mut context, &config).emit.is_err());
    }

    #[test]
    fn empty_cursor_is_vetoed_and_clears_context() {
        let config = RecorderConfig::default();
        let mut context = ActorContext::default();
        let held = event(
            1,
            EventPayload::PlayerCursorStackChanged(CursorStackChanged {
                cursor: Some(ItemStack::new("transport-belt", 100)),
            }),
        );
        let empty = event(2, EventPayload::PlayerCursorStackChanged(CursorStackChanged::default()));

        assert_eq!(run(&CursorExtractor, &held, &mut context, &config).emit.unwrap(), Emit::Log);
        assert_eq!(context.cursor_count, Some(100));
        assert_eq!(run(&CursorExtractor, &empty, &mut context, &config).emit.unwrap(), Emit::Veto);
        assert!(context.cursor_item.is_none());
    }

    #[test]
    fn pipette_reports_hovered_entity() {
        let config = RecorderConfig::default();
        let mut context = ActorContext::default();
        let hovered = EntityRef::new("inserter").at(Position::new(1.5, 1.5));
        let select = event(
            1,
            EventPayload::SelectedEntityChanged(SelectedEntityChanged {
                selected: Some(hovered.clone()),
            }),
        );
        let pipette = event(
            2,
            EventPayload::PlayerPipette(Pipette {
                item: Some("inserter".into()),
                used_cheat_mode: false,
            }),
        );

        let selection = run(&SelectionExtractor, &select, &mut context, &config);
        assert_eq!(selection.emit.unwrap(), Emit::Veto);
        assert_eq!(context.selected, Some(hovered));

        let run = run(&PipetteExtractor, &pipette, &mut context, &config);
        let source = run.record.get("source").and_then(Value::as_map).unwrap();
        assert_eq!(source.get("name").and_then(Value::as_text), Some("inserter"));
        assert!(!run.record.contains("cheat_mode"));
    }
}
