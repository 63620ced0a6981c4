//! Read-only world lookups used for container inspection and area dumps.
//!
//! Implementations keep no session state. Results are encoded with the same
//! sanitizer as regular records.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::debug;
use world_core::{ActorId, EntityRef, Position};

use crate::record::{Record, Value, entity_record, sanitize};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("actor {0} is not connected")]
    MissingActor(ActorId),

    #[error(
        "no {} within {radius} tiles of ({x:.1}, {y:.1})",
        .filter.as_deref().unwrap_or("structure")
    )]
    NoTargetFound {
        x: f64,
        y: f64,
        radius: f64,
        filter: Option<String>,
    },

    #[error("entity {0} no longer exists")]
    MissingEntity(String),
}

/// Item name to count, sorted by name.
pub type Contents = BTreeMap<String, u32>;

/// Whose inventory to read.
#[derive(Debug, Clone, Copy)]
pub enum ContentsSource<'a> {
    Entity(&'a EntityRef),
    Actor(ActorId),
}

/// An entity together with its inventory, as returned by area dumps.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedEntity {
    pub entity: EntityRef,
    pub contents: Contents,
}

impl SerializedEntity {
    pub fn to_record(&self) -> Record {
        let mut record = entity_record(&self.entity);
        let items: Vec<Value> = self
            .contents
            .iter()
            .map(|(name, count)| {
                Value::Map(Record::new().with("name", name.as_str()).with("count", *count))
            })
            .collect();
        if !items.is_empty() {
            record.set("contents", items);
        }
        record
    }

    pub fn to_line(&self) -> String {
        sanitize(&self.to_record()).to_line()
    }
}

/// World lookups the host answers on the recorder's behalf.
pub trait WorldQuery {
    fn actor_position(&self, actor: ActorId) -> Result<Position, QueryError>;

    /// Closest structure within `radius` of `position`, optionally restricted
    /// to one prototype name.
    fn find_nearest_structure(
        &self,
        position: Position,
        radius: f64,
        filter: Option<&str>,
    ) -> Result<EntityRef, QueryError>;

    /// Every structure within `radius`, nearest first.
    fn dump_area(&self, position: Position, radius: f64, filter: Option<&str>)
    -> Vec<SerializedEntity>;

    fn read_contents(&self, source: ContentsSource<'_>) -> Result<Contents, QueryError>;
}

/// Encodes an area dump as one line per entity.
pub fn encode_area(entities: &[SerializedEntity]) -> Vec<String> {
    entities.iter().map(SerializedEntity::to_line).collect()
}

/// In-memory world used by tools and tests.
#[derive(Debug, Clone, Default)]
pub struct WorldSnapshot {
    actors: HashMap<ActorId, (Position, Contents)>,
    structures: Vec<SerializedEntity>,
}

impl WorldSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actor(mut self, actor: ActorId, position: Position) -> Self {
        self.actors.insert(actor, (position, Contents::new()));
        self
    }

    pub fn with_actor_item(mut self, actor: ActorId, item: &str, count: u32) -> Self {
        if let Some((_, contents)) = self.actors.get_mut(&actor) {
            *contents.entry(item.to_owned()).or_default() += count;
        }
        self
    }

    /// Adds a structure. Structures without a position are never found by
    /// spatial lookups.
    pub fn with_structure(mut self, entity: EntityRef, contents: &[(&str, u32)]) -> Self {
        let contents = contents
            .iter()
            .map(|(name, count)| ((*name).to_owned(), *count))
            .collect();
        self.structures.push(SerializedEntity { entity, contents });
        self
    }

    fn within<'a>(
        &'a self,
        position: Position,
        radius: f64,
        filter: Option<&'a str>,
    ) -> impl Iterator<Item = (f64, &'a SerializedEntity)> + 'a {
        self.structures.iter().filter_map(move |structure| {
            if filter.is_some_and(|name| structure.entity.name != name) {
                return None;
            }
            let distance = structure.entity.position?.distance(&position);
            (distance <= radius).then_some((distance, structure))
        })
    }
}

impl WorldQuery for WorldSnapshot {
    fn actor_position(&self, actor: ActorId) -> Result<Position, QueryError> {
        self.actors
            .get(&actor)
            .map(|(position, _)| *position)
            .ok_or(QueryError::MissingActor(actor))
    }

    fn find_nearest_structure(
        &self,
        position: Position,
        radius: f64,
        filter: Option<&str>,
    ) -> Result<EntityRef, QueryError> {
        let mut nearest: Option<(f64, &SerializedEntity)> = None;
        for (distance, structure) in self.within(position, radius, filter) {
            if nearest.is_none_or(|(best, _)| distance < best) {
                nearest = Some((distance, structure));
            }
        }

        match nearest {
            Some((distance, structure)) => {
                debug!(
                    target: "recorder::query",
                    entity = %structure.entity.name,
                    distance,
                    "nearest structure"
                );
                Ok(structure.entity.clone())
            }
            None => Err(QueryError::NoTargetFound {
                x: position.x,
                y: position.y,
                radius,
                filter: filter.map(str::to_owned),
            }),
        }
    }

    fn dump_area(
        &self,
        position: Position,
        radius: f64,
        filter: Option<&str>,
    ) -> Vec<SerializedEntity> {
        let mut found: Vec<_> = self.within(position, radius, filter).collect();
        found.sort_by(|a, b| a.0.total_cmp(&b.0));
        found.into_iter().map(|(_, s)| s.clone()).collect()
    }

    fn read_contents(&self, source: ContentsSource<'_>) -> Result<Contents, QueryError> {
        match source {
            ContentsSource::Actor(actor) => self
                .actors
                .get(&actor)
                .map(|(_, contents)| contents.clone())
                .ok_or(QueryError::MissingActor(actor)),
            ContentsSource::Entity(entity) => self
                .structures
                .iter()
                .find(|s| s.entity.same_entity(entity))
                .map(|s| s.contents.clone())
                .ok_or_else(|| QueryError::MissingEntity(entity.name.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> WorldSnapshot {
        WorldSnapshot::new()
            .with_actor(ActorId(1), Position::new(0.0, 0.0))
            .with_actor_item(ActorId(1), "iron-plate", 20)
            .with_structure(
                EntityRef::new("wooden-chest")
                    .at(Position::new(3.0, 4.0))
                    .with_unit_number(10),
                &[("coal", 50)],
            )
            .with_structure(
                EntityRef::new("iron-chest")
                    .at(Position::new(1.0, 1.0))
                    .with_unit_number(11),
                &[],
            )
    }

    #[test]
    fn nearest_structure_respects_filter_and_radius() {
        let world = world();
        let origin = Position::ORIGIN;

        assert_eq!(world.find_nearest_structure(origin, 10.0, None).unwrap().name, "iron-chest");
        assert_eq!(
            world
                .find_nearest_structure(origin, 10.0, Some("wooden-chest"))
                .unwrap()
                .unit_number,
            Some(10)
        );
        assert!(matches!(
            world.find_nearest_structure(origin, 1.0, None),
            Err(QueryError::NoTargetFound { .. })
        ));
    }

    #[test]
    fn contents_by_entity_or_actor() {
        let world = world();
        let chest = world
            .find_nearest_structure(Position::ORIGIN, 10.0, Some("wooden-chest"))
            .unwrap();

        assert_eq!(world.read_contents(ContentsSource::Entity(&chest)).unwrap()["coal"], 50);
        assert_eq!(
            world.read_contents(ContentsSource::Actor(ActorId(1))).unwrap()["iron-plate"],
            20
        );
        assert!(matches!(
            world.read_contents(ContentsSource::Actor(ActorId(9))),
            Err(QueryError::MissingActor(ActorId(9)))
        ));
    }

    #[test]
    fn area_dump_is_sorted_and_sanitized() {
        let lines = encode_area(&world().dump_area(Position::ORIGIN, 10.0, None));

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"name":"iron-chest","unit_number":11,"x":"1.0","y":"1.0"}"#);
        assert!(lines[1].contains(r#""contents":[{"name":"coal","count":50}]"#));
    }
}
