//! World notifications reported by the simulation host.
//!
//! Each notification is a [`HostEvent`]: the tick it happened on, the acting
//! actor (when there is one) and a tagged [`EventPayload`]. Payload structs
//! spell out every field the host may send; anything the host could not
//! resolve is `None` rather than a sentinel.

use crate::types::{ActorId, Area, Direction, EntityRef, GuiType, ItemStack, Position, Tick};

/// Discriminant of every notification the recorder understands.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    PlayerChangedPosition,
    PlayerDrivingChanged,
    BuiltEntity,
    RotatedEntity,
    PlayerMinedEntity,
    PlayerBuiltTile,
    PlayerMinedTile,
    PlayerPlacedEquipment,
    PlayerRemovedEquipment,
    PlayerSetupBlueprint,
    PlayerConfiguredBlueprint,
    PlayerDeconstructedArea,
    EntitySettingsPasted,
    PlayerPipette,
    PlayerCursorStackChanged,
    SelectedEntityChanged,
    PlayerHarvestedResource,
    PlayerCraftStarted,
    PlayerCraftedItem,
    PlayerCraftCancelled,
    EntityRecipeChanged,
    PlayerInsertedItems,
    PlayerExtractedItems,
    ResearchStarted,
    GuiOpened,
    GuiClosed,
    GuiClick,
    GuiTextChanged,
    GuiCheckedStateChanged,
    PlayerJoinedGame,
    PlayerLeftGame,
}

impl EventKind {
    /// Snake-case name used as the `event` discriminator in records.
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// The actor's character moved.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PositionChanged {
    pub position: Position,
    /// Walking direction when the host knows it; derived from the
    /// displacement otherwise.
    pub walking_direction: Option<Direction>,
}

/// The actor entered (`driving = true`) or left a vehicle.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DrivingChanged {
    pub vehicle: Option<EntityRef>,
    pub driving: bool,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BuiltEntity {
    pub entity: Option<EntityRef>,
    /// Item consumed by the build, when reported.
    pub item: Option<ItemStack>,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RotatedEntity {
    pub entity: Option<EntityRef>,
    pub previous_direction: Option<Direction>,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MinedEntity {
    pub entity: Option<EntityRef>,
    /// Items that went into the actor's inventory.
    pub products: Vec<ItemStack>,
}

/// Shared payload of tile placement and tile removal.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TilesChanged {
    pub tile: Option<String>,
    pub item: Option<ItemStack>,
    pub positions: Vec<Position>,
}

/// Shared payload of equipment placement and removal.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EquipmentChanged {
    pub equipment: Option<String>,
    pub count: Option<u32>,
    /// Entity owning the equipment grid (armor wearer, vehicle).
    pub grid_owner: Option<EntityRef>,
    pub grid_position: Option<Position>,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BlueprintSetup {
    pub area: Option<Area>,
    pub item: Option<String>,
    pub entity_count: Option<u32>,
    pub alt: bool,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BlueprintConfigured {
    pub label: Option<String>,
    pub entity_count: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeconstructedArea {
    pub area: Option<Area>,
    pub item: Option<String>,
    pub alt: bool,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SettingsPasted {
    pub source: Option<EntityRef>,
    pub destination: Option<EntityRef>,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Pipette {
    pub item: Option<String>,
    pub used_cheat_mode: bool,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CursorStackChanged {
    /// Stack now held on the cursor; `None` when the hand is empty.
    pub cursor: Option<ItemStack>,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SelectedEntityChanged {
    pub selected: Option<EntityRef>,
}

/// One hand-mining cycle on a resource, tree or rock completed.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ResourceHarvested {
    pub entity: Option<EntityRef>,
    pub products: Vec<ItemStack>,
}

/// `count` crafts of `recipe` were queued.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CraftStarted {
    pub recipe: Option<String>,
    pub count: u32,
}

/// One craft of `recipe` finished and `item` went into the inventory.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CraftedItem {
    pub recipe: Option<String>,
    pub item: Option<ItemStack>,
}

/// `count` queued crafts of `recipe` were removed from the queue.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CraftCancelled {
    pub recipe: Option<String>,
    pub count: u32,
}

/// The actor changed the recipe of a crafting machine.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RecipeChanged {
    pub entity: Option<EntityRef>,
    /// `None` when the recipe was cleared.
    pub recipe: Option<String>,
    pub previous_recipe: Option<String>,
}

/// Shared payload of manual inventory insertion and extraction.
#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ItemsTransferred {
    /// Entity whose inventory was touched.
    pub entity: Option<EntityRef>,
    pub items: Vec<ItemStack>,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ResearchStarted {
    pub research: Option<String>,
    /// Research that was in progress before, if any.
    pub previous: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GuiOpened {
    pub gui_type: GuiType,
    pub entity: Option<EntityRef>,
    pub element: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GuiClosed {
    pub gui_type: GuiType,
    pub entity: Option<EntityRef>,
    pub element: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GuiClick {
    pub element: Option<String>,
    pub button: Option<String>,
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GuiTextChanged {
    pub element: Option<String>,
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GuiCheckedChanged {
    pub element: Option<String>,
    pub state: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlayerJoined {
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlayerLeft {
    pub reason: Option<String>,
}

/// Kind-specific body of a host notification.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum EventPayload {
    PlayerChangedPosition(PositionChanged),
    PlayerDrivingChanged(DrivingChanged),
    BuiltEntity(BuiltEntity),
    RotatedEntity(RotatedEntity),
    PlayerMinedEntity(MinedEntity),
    PlayerBuiltTile(TilesChanged),
    PlayerMinedTile(TilesChanged),
    PlayerPlacedEquipment(EquipmentChanged),
    PlayerRemovedEquipment(EquipmentChanged),
    PlayerSetupBlueprint(BlueprintSetup),
    PlayerConfiguredBlueprint(BlueprintConfigured),
    PlayerDeconstructedArea(DeconstructedArea),
    EntitySettingsPasted(SettingsPasted),
    PlayerPipette(Pipette),
    PlayerCursorStackChanged(CursorStackChanged),
    SelectedEntityChanged(SelectedEntityChanged),
    PlayerHarvestedResource(ResourceHarvested),
    PlayerCraftStarted(CraftStarted),
    PlayerCraftedItem(CraftedItem),
    PlayerCraftCancelled(CraftCancelled),
    EntityRecipeChanged(RecipeChanged),
    PlayerInsertedItems(ItemsTransferred),
    PlayerExtractedItems(ItemsTransferred),
    ResearchStarted(ResearchStarted),
    GuiOpened(GuiOpened),
    GuiClosed(GuiClosed),
    GuiClick(GuiClick),
    GuiTextChanged(GuiTextChanged),
    GuiCheckedStateChanged(GuiCheckedChanged),
    PlayerJoinedGame(PlayerJoined),
    PlayerLeftGame(PlayerLeft),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::PlayerChangedPosition(_) => EventKind::PlayerChangedPosition,
            EventPayload::PlayerDrivingChanged(_) => EventKind::PlayerDrivingChanged,
            EventPayload::BuiltEntity(_) => EventKind::BuiltEntity,
            EventPayload::RotatedEntity(_) => EventKind::RotatedEntity,
            EventPayload::PlayerMinedEntity(_) => EventKind::PlayerMinedEntity,
            EventPayload::PlayerBuiltTile(_) => EventKind::PlayerBuiltTile,
            EventPayload::PlayerMinedTile(_) => EventKind::PlayerMinedTile,
            EventPayload::PlayerPlacedEquipment(_) => EventKind::PlayerPlacedEquipment,
            EventPayload::PlayerRemovedEquipment(_) => EventKind::PlayerRemovedEquipment,
            EventPayload::PlayerSetupBlueprint(_) => EventKind::PlayerSetupBlueprint,
            EventPayload::PlayerConfiguredBlueprint(_) => EventKind::PlayerConfiguredBlueprint,
            EventPayload::PlayerDeconstructedArea(_) => EventKind::PlayerDeconstructedArea,
            EventPayload::EntitySettingsPasted(_) => EventKind::EntitySettingsPasted,
            EventPayload::PlayerPipette(_) => EventKind::PlayerPipette,
            EventPayload::PlayerCursorStackChanged(_) => EventKind::PlayerCursorStackChanged,
            EventPayload::SelectedEntityChanged(_) => EventKind::SelectedEntityChanged,
            EventPayload::PlayerHarvestedResource(_) => EventKind::PlayerHarvestedResource,
            EventPayload::PlayerCraftStarted(_) => EventKind::PlayerCraftStarted,
            EventPayload::PlayerCraftedItem(_) => EventKind::PlayerCraftedItem,
            EventPayload::PlayerCraftCancelled(_) => EventKind::PlayerCraftCancelled,
            EventPayload::EntityRecipeChanged(_) => EventKind::EntityRecipeChanged,
            EventPayload::PlayerInsertedItems(_) => EventKind::PlayerInsertedItems,
            EventPayload::PlayerExtractedItems(_) => EventKind::PlayerExtractedItems,
            EventPayload::ResearchStarted(_) => EventKind::ResearchStarted,
            EventPayload::GuiOpened(_) => EventKind::GuiOpened,
            EventPayload::GuiClosed(_) => EventKind::GuiClosed,
            EventPayload::GuiClick(_) => EventKind::GuiClick,
            EventPayload::GuiTextChanged(_) => EventKind::GuiTextChanged,
            EventPayload::GuiCheckedStateChanged(_) => EventKind::GuiCheckedStateChanged,
            EventPayload::PlayerJoinedGame(_) => EventKind::PlayerJoinedGame,
            EventPayload::PlayerLeftGame(_) => EventKind::PlayerLeftGame,
        }
    }

    /// Single map location the notification refers to, if it has one.
    ///
    /// Area selections and GUI interactions are not located; tile events use
    /// the first affected tile.
    pub fn position(&self) -> Option<Position> {
        let entity_position = |entity: &Option<EntityRef>| entity.as_ref().and_then(|e| e.position);
        match self {
            EventPayload::PlayerChangedPosition(p) => Some(p.position),
            EventPayload::PlayerDrivingChanged(p) => entity_position(&p.vehicle),
            EventPayload::BuiltEntity(p) => entity_position(&p.entity),
            EventPayload::RotatedEntity(p) => entity_position(&p.entity),
            EventPayload::PlayerMinedEntity(p) => entity_position(&p.entity),
            EventPayload::PlayerBuiltTile(p) | EventPayload::PlayerMinedTile(p) => {
                p.positions.first().copied()
            }
            EventPayload::EntitySettingsPasted(p) => entity_position(&p.destination),
            EventPayload::SelectedEntityChanged(p) => entity_position(&p.selected),
            EventPayload::PlayerHarvestedResource(p) => entity_position(&p.entity),
            EventPayload::EntityRecipeChanged(p) => entity_position(&p.entity),
            EventPayload::PlayerInsertedItems(p) | EventPayload::PlayerExtractedItems(p) => {
                entity_position(&p.entity)
            }
            EventPayload::GuiOpened(p) => entity_position(&p.entity),
            EventPayload::GuiClosed(p) => entity_position(&p.entity),
            _ => None,
        }
    }
}

/// One notification from the host.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostEvent {
    pub tick: Tick,
    /// Acting actor; notifications without one are not attributable.
    #[cfg_attr(feature = "serde", serde(default))]
    pub player: Option<ActorId>,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub payload: EventPayload,
}

impl HostEvent {
    pub fn new(tick: Tick, player: Option<ActorId>, payload: EventPayload) -> Self {
        Self {
            tick,
            player,
            payload,
        }
    }

    /// Shorthand for an attributed event.
    pub fn by(player: ActorId, tick: u64, payload: EventPayload) -> Self {
        Self::new(Tick(tick), Some(player), payload)
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn position(&self) -> Option<Position> {
        self.payload.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn kind_names_are_snake_case() {
        assert_eq!(EventKind::PlayerChangedPosition.name(), "player_changed_position");
        assert_eq!(EventKind::GuiCheckedStateChanged.to_string(), "gui_checked_state_changed");
        assert_eq!("built_entity".parse::<EventKind>().ok(), Some(EventKind::BuiltEntity));
        assert_eq!(EventKind::iter().count(), 31);
    }

    #[test]
    fn tile_events_locate_first_tile() {
        let payload = EventPayload::PlayerBuiltTile(TilesChanged {
            tile: Some("stone-path".into()),
            item: None,
            positions: vec![Position::new(3.0, 4.0), Position::new(5.0, 6.0)],
        });
        assert_eq!(payload.position(), Some(Position::new(3.0, 4.0)));
        assert_eq!(payload.kind(), EventKind::PlayerBuiltTile);
    }

    #[test]
    fn destroyed_entity_has_no_position() {
        let payload = EventPayload::RotatedEntity(RotatedEntity {
            entity: None,
            previous_direction: Some(Direction::East),
        });
        assert_eq!(payload.position(), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn decodes_host_wire_format() {
        let line = concat!(
            r#"{"tick":10,"player":2,"kind":"built_entity","#,
            r#""entity":{"name":"assembling-machine-1","#,
            r#""position":{"x":1.5,"y":-2.5},"direction":"north"}}"#
        );
        let event: HostEvent = serde_json::from_str(line).expect("decodes");
        assert_eq!(event.tick, Tick(10));
        assert_eq!(event.player, Some(ActorId(2)));
        assert_eq!(event.kind(), EventKind::BuiltEntity);
        assert_eq!(event.position(), Some(Position::new(1.5, -2.5)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn decodes_inventory_transfers() {
        let line = concat!(
            r#"{"tick":40,"player":1,"kind":"player_inserted_items","#,
            r#""entity":{"name":"stone-furnace","position":{"x":0.5,"y":0.5}},"#,
            r#""items":[{"name":"coal","count":5}]}"#
        );
        let event: HostEvent = serde_json::from_str(line).expect("decodes");
        let EventPayload::PlayerInsertedItems(payload) = &event.payload else {
            panic!("decoded {:?}", event.kind());
        };
        assert_eq!(payload.items, vec![ItemStack::new("coal", 5)]);
        assert_eq!(event.position(), Some(Position::new(0.5, 0.5)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn missing_player_decodes_as_none() {
        let line = r#"{"tick":3,"kind":"gui_click","element":"ok"}"#;
        let event: HostEvent = serde_json::from_str(line).expect("decodes");
        assert_eq!(event.player, None);
        assert_eq!(event.kind(), EventKind::GuiClick);
    }
}
