//! Base record construction and shared field encoders.

use world_core::{ActorId, Area, Direction, EntityRef, HostEvent, ItemStack, Position, Tick};

use super::value::{Record, Value};
use crate::events::Category;

/// Fields every record of `category` starts with.
///
/// `x`/`y` are only written when the notification is located.
pub fn build_base(category: Category, event: &HostEvent) -> Record {
    let mut record = header(category, event.tick, event.player, event.kind().name());
    if let Some(position) = event.position() {
        set_position(&mut record, position);
    }
    record
}

/// Header for records that do not mirror a single host notification, such
/// as GUI session summaries and closed walking segments.
pub fn synthetic(category: Category, tick: Tick, actor: ActorId, event: &str) -> Record {
    header(category, tick, Some(actor), event)
}

fn header(category: Category, tick: Tick, actor: Option<ActorId>, event: &str) -> Record {
    let mut record = Record::new();
    record
        .set("tick", tick.0)
        .set_opt("player", actor.map(ActorId::get))
        .set("category", category.name())
        .set("event", event);
    record
}

pub fn set_position(record: &mut Record, position: Position) {
    record
        .set("x", Value::coord(position.x))
        .set("y", Value::coord(position.y));
}

pub fn position_record(position: Position) -> Record {
    let mut record = Record::new();
    set_position(&mut record, position);
    record
}

pub fn area_record(area: &Area) -> Record {
    Record::new()
        .with("left_top", position_record(area.left_top))
        .with("right_bottom", position_record(area.right_bottom))
}

pub fn entity_record(entity: &EntityRef) -> Record {
    let mut record = Record::new()
        .with("name", entity.name.as_str())
        .with_opt("type", entity.entity_type.as_deref())
        .with_opt("unit_number", entity.unit_number);
    if let Some(position) = entity.position {
        set_position(&mut record, position);
    }
    record.set_opt("direction", entity.direction.map(|d| d.value()));
    record
}

/// `{name, value}` with the clockwise 0..7 numbering.
pub fn direction_record(direction: Direction) -> Record {
    Record::new()
        .with("name", direction.to_string())
        .with("value", direction.value())
}

pub fn item_record(stack: &ItemStack) -> Record {
    Record::new()
        .with("name", stack.name.as_str())
        .with("count", stack.count)
}

pub fn items_value(stacks: &[ItemStack]) -> Value {
    Value::List(
        stacks
            .iter()
            .map(|stack| Value::Map(item_record(stack)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use world_core::{BuiltEntity, EventPayload, GuiClick};

    use super::*;
    use crate::record::sanitize;

    #[test]
    fn base_record_carries_location_when_known() {
        let event = HostEvent::by(
            ActorId(2),
            10,
            EventPayload::BuiltEntity(BuiltEntity {
                entity: Some(EntityRef::new("assembling-machine-1").at(Position::new(3.5, -1.5))),
                item: None,
            }),
        );

        let line = sanitize(&build_base(Category::Construction, &event)).to_line();
        assert_eq!(
            line,
            concat!(
                r#"{"tick":10,"player":2,"category":"construction","#,
                r#""event":"built_entity","x":"3.5","y":"-1.5"}"#
            )
        );
    }

    #[test]
    fn unlocated_events_have_no_coordinates() {
        let event = HostEvent::by(ActorId(1), 4, EventPayload::GuiClick(GuiClick::default()));
        let record = build_base(Category::Gui, &event);

        assert!(!record.contains("x"));
        assert_eq!(record.get("event").and_then(Value::as_text), Some("gui_click"));
    }
}
