//! Host-facing data model for the session recorder.
//!
//! `world-core` describes what the simulation host reports: actors, ticks,
//! positions, entity and tile references, and the tagged set of world
//! notifications ([`HostEvent`]). It performs no I/O and holds no state, so
//! both the recorder and offline tools can depend on it.
pub mod event;
pub mod types;

pub use event::{
    BlueprintConfigured, BlueprintSetup, BuiltEntity, CraftCancelled, CraftStarted, CraftedItem,
    CursorStackChanged, DeconstructedArea, DrivingChanged, EquipmentChanged, EventKind,
    EventPayload, GuiCheckedChanged, GuiClick, GuiClosed, GuiOpened, GuiTextChanged, HostEvent,
    ItemsTransferred, MinedEntity, Pipette, PlayerJoined, PlayerLeft, PositionChanged,
    RecipeChanged, ResearchStarted, ResourceHarvested, RotatedEntity, SelectedEntityChanged,
    SettingsPasted, TilesChanged,
};
pub use types::{ActorId, Area, Direction, EntityRef, GuiType, ItemStack, Position, Tick};
