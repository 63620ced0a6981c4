//! Output categories and the kind-to-category routing table.

use serde::{Deserialize, Serialize};
use world_core::EventKind;

/// Output stream a record is written to.
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    Eq,
    PartialEq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    /// Walking segments and vehicle use
    Movement,
    /// Building, mining, rotating, blueprints and cursor changes
    Construction,
    /// Hand-mining runs on resources, trees and rocks
    #[serde(rename = "harvest_resource_collated", alias = "harvest")]
    #[strum(to_string = "harvest_resource_collated", serialize = "harvest")]
    Harvest,
    /// Hand crafting and machine recipe changes
    Crafting,
    /// Manual insertion into and extraction from entity inventories
    Inventory,
    Research,
    /// GUI interaction and GUI session summaries
    Gui,
    /// Session lifecycle (joins and leaves)
    #[serde(rename = "core-meta", alias = "meta")]
    #[strum(to_string = "core-meta", serialize = "meta")]
    Meta,
}

impl Category {
    /// Category every notification of `kind` is routed to.
    pub fn of(kind: EventKind) -> Self {
        match kind {
            EventKind::PlayerChangedPosition | EventKind::PlayerDrivingChanged => {
                Category::Movement
            }
            EventKind::BuiltEntity
            | EventKind::RotatedEntity
            | EventKind::PlayerMinedEntity
            | EventKind::PlayerBuiltTile
            | EventKind::PlayerMinedTile
            | EventKind::PlayerPlacedEquipment
            | EventKind::PlayerRemovedEquipment
            | EventKind::PlayerSetupBlueprint
            | EventKind::PlayerConfiguredBlueprint
            | EventKind::PlayerDeconstructedArea
            | EventKind::EntitySettingsPasted
            | EventKind::PlayerPipette
            | EventKind::PlayerCursorStackChanged
            | EventKind::SelectedEntityChanged => Category::Construction,
            EventKind::PlayerHarvestedResource => Category::Harvest,
            EventKind::PlayerCraftStarted
            | EventKind::PlayerCraftedItem
            | EventKind::PlayerCraftCancelled
            | EventKind::EntityRecipeChanged => Category::Crafting,
            EventKind::PlayerInsertedItems | EventKind::PlayerExtractedItems => {
                Category::Inventory
            }
            EventKind::ResearchStarted => Category::Research,
            EventKind::GuiOpened
            | EventKind::GuiClosed
            | EventKind::GuiClick
            | EventKind::GuiTextChanged
            | EventKind::GuiCheckedStateChanged => Category::Gui,
            EventKind::PlayerJoinedGame | EventKind::PlayerLeftGame => Category::Meta,
        }
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    /// File the category is written to inside a session directory.
    pub fn file_name(self) -> String {
        format!("{}.jsonl", self.name())
    }

    pub fn all() -> [Category; 8] {
        [
            Category::Movement,
            Category::Construction,
            Category::Harvest,
            Category::Crafting,
            Category::Inventory,
            Category::Research,
            Category::Gui,
            Category::Meta,
        ]
    }
}
