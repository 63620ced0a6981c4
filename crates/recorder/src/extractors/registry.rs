//! Extractor tables keyed by event kind.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::warn;
use world_core::EventKind;

use super::{BaseOnly, Extractor, Skip};
use super::{
    BlueprintConfiguredExtractor, BlueprintSetupExtractor, BuildExtractor,
    CraftCancelledExtractor, CraftStartedExtractor, CraftedItemExtractor, CursorExtractor,
    DeconstructExtractor, DrivingExtractor, EquipmentExtractor, GuiCheckedExtractor,
    GuiClickExtractor, GuiClosedExtractor, GuiOpenedExtractor, GuiTextExtractor,
    HarvestExtractor, ItemTransferExtractor, MineEntityExtractor, PasteSettingsExtractor,
    PipetteExtractor, PlayerJoinedExtractor, PlayerLeftExtractor, RecipeChangedExtractor,
    ResearchStartedExtractor, RotateExtractor, SelectionExtractor, TileExtractor, WalkExtractor,
};
use crate::events::Category;

static BASE_ONLY: BaseOnly = BaseOnly;
static SKIP: Skip = Skip;

/// What a table does with kinds it has no extractor for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnregisteredPolicy {
    /// Write the base record.
    BaseOnly,
    /// Write nothing.
    Skip,
}

/// Extractors of one category.
pub struct ExtractorTable {
    category: Category,
    policy: UnregisteredPolicy,
    extractors: HashMap<EventKind, Arc<dyn Extractor>>,
}

impl ExtractorTable {
    pub fn new(category: Category, policy: UnregisteredPolicy) -> Self {
        Self {
            category,
            policy,
            extractors: HashMap::new(),
        }
    }

    /// Registers `extractor` for `kind`, replacing any previous one.
    pub fn register(&mut self, kind: EventKind, extractor: Arc<dyn Extractor>) -> &mut Self {
        if Category::of(kind) != self.category {
            warn!(
                target: "recorder::dispatch",
                %kind,
                table = %self.category,
                "extractor registered for a kind routed to another category"
            );
        }
        self.extractors.insert(kind, extractor);
        self
    }

    pub fn with(mut self, kind: EventKind, extractor: impl Extractor + 'static) -> Self {
        self.register(kind, Arc::new(extractor));
        self
    }

    pub fn unregister(&mut self, kind: EventKind) -> Option<Arc<dyn Extractor>> {
        self.extractors.remove(&kind)
    }

    /// Extractor for `kind`; falls back to the table's default.
    pub fn resolve(&self, kind: EventKind) -> &dyn Extractor {
        match self.extractors.get(&kind) {
            Some(extractor) => extractor.as_ref(),
            None => match self.policy {
                UnregisteredPolicy::BaseOnly => &BASE_ONLY,
                UnregisteredPolicy::Skip => &SKIP,
            },
        }
    }

    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.extractors.contains_key(&kind)
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn policy(&self) -> UnregisteredPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

/// One table per category.
pub struct ExtractorRegistry {
    tables: BTreeMap<Category, ExtractorTable>,
}

impl ExtractorRegistry {
    /// Tables with default policies and no extractors.
    ///
    /// Movement and harvest skip unregistered kinds since raw position
    /// reports and mining cycles are only useful once collated; every other
    /// category logs base records.
    pub fn empty() -> Self {
        let tables = Category::all()
            .into_iter()
            .map(|category| {
                let policy = match category {
                    Category::Movement | Category::Harvest => UnregisteredPolicy::Skip,
                    _ => UnregisteredPolicy::BaseOnly,
                };
                (category, ExtractorTable::new(category, policy))
            })
            .collect();
        Self { tables }
    }

    /// Tables with every built-in extractor registered.
    pub fn default_tables() -> Self {
        let mut registry = Self::empty();

        registry
            .insert(
                ExtractorTable::new(Category::Movement, UnregisteredPolicy::Skip)
                    .with(EventKind::PlayerChangedPosition, WalkExtractor)
                    .with(EventKind::PlayerDrivingChanged, DrivingExtractor),
            )
            .insert(
                ExtractorTable::new(Category::Construction, UnregisteredPolicy::BaseOnly)
                    .with(EventKind::BuiltEntity, BuildExtractor)
                    .with(EventKind::RotatedEntity, RotateExtractor)
                    .with(EventKind::PlayerMinedEntity, MineEntityExtractor)
                    .with(EventKind::PlayerBuiltTile, TileExtractor::new("build_tile"))
                    .with(EventKind::PlayerMinedTile, TileExtractor::new("mine_tile"))
                    .with(
                        EventKind::PlayerPlacedEquipment,
                        EquipmentExtractor::new("place_equipment"),
                    )
                    .with(
                        EventKind::PlayerRemovedEquipment,
                        EquipmentExtractor::new("remove_equipment"),
                    )
                    .with(EventKind::PlayerSetupBlueprint, BlueprintSetupExtractor)
                    .with(EventKind::PlayerConfiguredBlueprint, BlueprintConfiguredExtractor)
                    .with(EventKind::PlayerDeconstructedArea, DeconstructExtractor)
                    .with(EventKind::EntitySettingsPasted, PasteSettingsExtractor)
                    .with(EventKind::PlayerPipette, PipetteExtractor)
                    .with(EventKind::PlayerCursorStackChanged, CursorExtractor)
                    .with(EventKind::SelectedEntityChanged, SelectionExtractor),
            )
            .insert(
                ExtractorTable::new(Category::Harvest, UnregisteredPolicy::Skip)
                    .with(EventKind::PlayerHarvestedResource, HarvestExtractor),
            )
            .insert(
                ExtractorTable::new(Category::Crafting, UnregisteredPolicy::BaseOnly)
                    .with(EventKind::PlayerCraftStarted, CraftStartedExtractor)
                    .with(EventKind::PlayerCraftedItem, CraftedItemExtractor)
                    .with(EventKind::PlayerCraftCancelled, CraftCancelledExtractor)
                    .with(EventKind::EntityRecipeChanged, RecipeChangedExtractor),
            )
            .insert(
                ExtractorTable::new(Category::Inventory, UnregisteredPolicy::BaseOnly)
                    .with(
                        EventKind::PlayerInsertedItems,
                        ItemTransferExtractor::new("insert_item"),
                    )
                    .with(
                        EventKind::PlayerExtractedItems,
                        ItemTransferExtractor::new("extract_item"),
                    ),
            )
            .insert(
                ExtractorTable::new(Category::Research, UnregisteredPolicy::BaseOnly)
                    .with(EventKind::ResearchStarted, ResearchStartedExtractor),
            )
            .insert(
                ExtractorTable::new(Category::Gui, UnregisteredPolicy::BaseOnly)
                    .with(EventKind::GuiOpened, GuiOpenedExtractor)
                    .with(EventKind::GuiClosed, GuiClosedExtractor)
                    .with(EventKind::GuiClick, GuiClickExtractor)
                    .with(EventKind::GuiTextChanged, GuiTextExtractor)
                    .with(EventKind::GuiCheckedStateChanged, GuiCheckedExtractor),
            )
            .insert(
                ExtractorTable::new(Category::Meta, UnregisteredPolicy::BaseOnly)
                    .with(EventKind::PlayerJoinedGame, PlayerJoinedExtractor)
                    .with(EventKind::PlayerLeftGame, PlayerLeftExtractor),
            );

        registry
    }

    /// Installs `table` for its category, replacing the previous one.
    pub fn insert(&mut self, table: ExtractorTable) -> &mut Self {
        self.tables.insert(table.category(), table);
        self
    }

    pub fn table(&self, category: Category) -> Option<&ExtractorTable> {
        self.tables.get(&category)
    }

    pub fn table_mut(&mut self, category: Category) -> Option<&mut ExtractorTable> {
        self.tables.get_mut(&category)
    }

    /// Extractor for `kind` in `category`, or [`Skip`] when the category has
    /// no table.
    pub fn resolve(&self, category: Category, kind: EventKind) -> &dyn Extractor {
        match self.tables.get(&category) {
            Some(table) => table.resolve(kind),
            None => &SKIP,
        }
    }

    /// Total number of registered extractors.
    pub fn total_extractors(&self) -> usize {
        self.tables.values().map(ExtractorTable::len).sum()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::default_tables()
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn every_kind_resolves() {
        let registry = ExtractorRegistry::empty();
        for kind in EventKind::iter() {
            let category = Category::of(kind);
            let expected = match category {
                Category::Movement | Category::Harvest => "skip",
                _ => "base_only",
            };
            assert_eq!(registry.resolve(category, kind).name(), expected);
        }
    }

    #[test]
    fn default_tables_cover_every_kind() {
        let registry = ExtractorRegistry::default_tables();
        for kind in EventKind::iter() {
            let table = registry.table(Category::of(kind)).expect("table per category");
            assert!(table.is_registered(kind), "{kind} has no extractor");
        }
        assert_eq!(registry.total_extractors(), EventKind::iter().count());
    }

    #[test]
    fn unregistering_falls_back_to_policy() {
        let mut registry = ExtractorRegistry::default_tables();
        let table = registry.table_mut(Category::Gui).unwrap();
        assert!(table.unregister(EventKind::GuiClick).is_some());

        assert_eq!(table.resolve(EventKind::GuiClick).name(), "base_only");
        assert_eq!(table.resolve(EventKind::GuiOpened).name(), "gui_opened");
    }
}
