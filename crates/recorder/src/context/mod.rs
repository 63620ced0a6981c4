//! Cross-event actor state.
mod actor;
mod store;

pub use actor::{
    ActorContext, BlueprintDraft, BlueprintState, CraftJob, Ephemeral, GuiState, HarvestRun,
    Inspection, Subfield, VehicleState, WalkSegment,
};
pub use store::ContextStore;
