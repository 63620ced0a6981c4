//! Per-actor cross-event state.

use std::collections::VecDeque;

use world_core::{Area, Direction, EntityRef, GuiType, Position, Tick};

use crate::scheduler::TaskId;

/// Everything the recorder remembers about one actor between events.
///
/// A default value is indistinguishable from "no context".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorContext {
    pub gui_state: GuiState,
    pub ephemeral: Option<Ephemeral>,
    pub cursor_item: Option<String>,
    pub cursor_count: Option<u32>,
    pub selected: Option<EntityRef>,
    pub blueprint: BlueprintState,
    pub movement: Option<WalkSegment>,
    pub vehicle: Option<VehicleState>,
    /// Last reported character position.
    pub position: Option<Position>,
    pub harvest: Option<HarvestRun>,
    /// Hand-crafting queue, oldest first.
    pub crafting: VecDeque<CraftJob>,
    pub inspection: Option<Inspection>,
}

impl ActorContext {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Resets one sub-state to empty.
    pub fn clear(&mut self, field: Subfield) {
        match field {
            Subfield::GuiState => self.gui_state = GuiState::None,
            Subfield::Ephemeral => self.ephemeral = None,
            Subfield::Cursor => {
                self.cursor_item = None;
                self.cursor_count = None;
            }
            Subfield::Selected => self.selected = None,
            Subfield::Blueprint => self.blueprint = BlueprintState::default(),
            Subfield::Movement => self.movement = None,
            Subfield::Vehicle => self.vehicle = None,
            Subfield::Position => self.position = None,
            Subfield::Harvest => self.harvest = None,
            Subfield::Crafting => self.crafting.clear(),
            Subfield::Inspection => self.inspection = None,
        }
    }

    pub fn tracked_gui(&self) -> Option<GuiType> {
        match self.gui_state {
            GuiState::Opened { kind, .. } => Some(kind),
            GuiState::None => None,
        }
    }
}

/// Named sub-states that can be cleared individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Subfield {
    GuiState,
    Ephemeral,
    Cursor,
    Selected,
    Blueprint,
    Movement,
    Vehicle,
    Position,
    Harvest,
    Crafting,
    Inspection,
}

/// Tracked GUI session.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum GuiState {
    #[default]
    None,
    Opened { kind: GuiType, opened_at: Tick },
}

/// Payload of an action that spans several notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum Ephemeral {
    /// Kept until the matching configuration event.
    BlueprintSetup(BlueprintDraft),
}

/// What is known about a blueprint between setup and configuration.
///
/// `Default` is the payload used when a configuration arrives without a
/// preceding setup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlueprintDraft {
    pub tick: Option<Tick>,
    pub area: Option<Area>,
    pub item: Option<String>,
    pub entity_count: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlueprintState {
    pub setups: u32,
    pub configured: u32,
    pub last_configured_at: Option<Tick>,
}

/// Open straight-line walk, closed when direction changes or the actor
/// stops reporting positions.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkSegment {
    pub start_tick: Tick,
    pub start: Position,
    pub last_tick: Tick,
    pub last: Position,
    pub direction: Option<Direction>,
}

impl WalkSegment {
    pub fn starting(tick: Tick, position: Position, direction: Option<Direction>) -> Self {
        Self {
            start_tick: tick,
            start: position,
            last_tick: tick,
            last: position,
            direction,
        }
    }

    pub fn distance(&self) -> f64 {
        self.start.distance(&self.last)
    }

    /// True once the actor has actually moved away from the start.
    pub fn has_moved(&self) -> bool {
        self.last_tick > self.start_tick && self.start != self.last
    }
}

/// Consecutive hand-mining cycles on one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestRun {
    pub entity: EntityRef,
    pub start_tick: Tick,
    pub last_tick: Tick,
    pub cycles: u32,
    /// Items received over the run.
    pub products: u32,
}

impl HarvestRun {
    pub fn starting(entity: EntityRef, tick: Tick, products: u32) -> Self {
        Self {
            entity,
            start_tick: tick,
            last_tick: tick,
            cycles: 1,
            products,
        }
    }
}

/// Queued crafts of one recipe, from queueing until the last one finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct CraftJob {
    pub recipe: String,
    pub queued_at: Tick,
    pub queued: u32,
    pub crafted: u32,
    pub last_crafted_at: Option<Tick>,
}

impl CraftJob {
    pub fn queued(recipe: impl Into<String>, tick: Tick, count: u32) -> Self {
        Self {
            recipe: recipe.into(),
            queued_at: tick,
            queued: count,
            crafted: 0,
            last_crafted_at: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.crafted >= self.queued
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    pub name: Option<String>,
    pub since: Tick,
}

/// Container view opened on the actor's behalf.
#[derive(Debug, Clone, PartialEq)]
pub struct Inspection {
    pub target: EntityRef,
    pub opened_at: Tick,
    pub auto_close: bool,
    pub release_task: Option<TaskId>,
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn clearing_every_subfield_empties_the_context() {
        let mut context = ActorContext {
            gui_state: GuiState::Opened {
                kind: GuiType::BlueprintBook,
                opened_at: Tick(4),
            },
            ephemeral: Some(Ephemeral::BlueprintSetup(BlueprintDraft::default())),
            cursor_item: Some("iron-plate".into()),
            cursor_count: Some(50),
            selected: Some(EntityRef::new("stone-furnace")),
            blueprint: BlueprintState {
                setups: 1,
                ..BlueprintState::default()
            },
            movement: Some(WalkSegment::starting(Tick(1), Position::ORIGIN, None)),
            vehicle: Some(VehicleState {
                name: Some("car".into()),
                since: Tick(2),
            }),
            position: Some(Position::new(1.0, 2.0)),
            harvest: Some(HarvestRun::starting(EntityRef::new("iron-ore"), Tick(3), 1)),
            crafting: VecDeque::from([CraftJob::queued("iron-gear-wheel", Tick(3), 5)]),
            inspection: Some(Inspection {
                target: EntityRef::new("wooden-chest"),
                opened_at: Tick(3),
                auto_close: true,
                release_task: None,
            }),
        };

        for field in Subfield::iter() {
            assert!(!context.is_empty(), "{field} cleared too early");
            context.clear(field);
        }
        assert!(context.is_empty());
    }
}
