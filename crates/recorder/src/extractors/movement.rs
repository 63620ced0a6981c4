//! Movement extractors.
//!
//! Raw position reports arrive every tick the character moves. They are
//! folded into straight-line walk segments held in the actor context, and a
//! `move_to_direction` record is written when a segment closes: on a change
//! of direction, after a pause longer than `segment_gap_ticks`, on entering a
//! vehicle, or at session end.

use tracing::trace;
use world_core::{ActorId, Direction, EventKind, EventPayload, HostEvent, Position, Tick};

use super::{Emit, ExtractContext, ExtractError, Extractor};
use crate::context::{VehicleState, WalkSegment};
use crate::events::Category;
use crate::record::{Record, Value, entity_record, set_position, synthetic};

/// Record for a closed walk segment.
///
/// `player` is an object here: the actor index plus the tick and location
/// where the segment started and ended.
pub fn segment_record(actor: ActorId, segment: &WalkSegment) -> Record {
    let mut record = synthetic(
        Category::Movement,
        segment.last_tick,
        actor,
        EventKind::PlayerChangedPosition.name(),
    );
    record.set(
        "player",
        Record::new()
            .with("index", actor.get())
            .with("start_movement", waypoint(segment.start_tick, segment.start))
            .with("end_movement", waypoint(segment.last_tick, segment.last)),
    );
    set_position(&mut record, segment.last);
    record
        .set("action", "move_to_direction")
        .set_opt("direction", segment.direction.map(|d| d.to_string()))
        .set("duration", segment.last_tick.since(segment.start_tick))
        .set("distance", Value::coord(segment.distance()));
    record
}

fn waypoint(tick: Tick, position: Position) -> Record {
    let mut record = Record::new().with("tick", tick.0);
    set_position(&mut record, position);
    record
}

/// Closes the open segment, queueing its record when the actor actually
/// moved.
fn close_segment(cx: &mut ExtractContext<'_>) {
    let actor = cx.actor();
    if let Some(segment) = cx.context_mut().movement.take()
        && segment.has_moved()
    {
        cx.emit_to(Category::Movement, segment_record(actor, &segment));
    }
}

/// `player_changed_position`: walk segmentation, or `drive` records while in
/// a vehicle.
#[derive(Debug, Default)]
pub struct WalkExtractor;

impl Extractor for WalkExtractor {
    fn name(&self) -> &'static str {
        "walk"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::PlayerChangedPosition(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };
        cx.context_mut().position = Some(payload.position);

        if let Some(vehicle) = &cx.context().vehicle {
            record
                .set("action", "drive")
                .set_opt("vehicle", vehicle.name.as_deref());
            return Ok(Emit::Log);
        }

        let gap_limit = cx.config().segment_gap_ticks;
        let actor = cx.actor();
        let position = payload.position;

        let next = match cx.context_mut().movement.take() {
            None => WalkSegment::starting(event.tick, position, payload.walking_direction),
            Some(mut segment) => {
                let direction = payload.walking_direction.or_else(|| {
                    Direction::from_delta(position.x - segment.last.x, position.y - segment.last.y)
                });
                let paused = event.tick.since(segment.last_tick) > gap_limit;
                let turned = matches!(
                    (segment.direction, direction),
                    (Some(current), Some(new)) if current != new
                );

                if paused {
                    if segment.has_moved() {
                        cx.emit(segment_record(actor, &segment));
                    }
                    WalkSegment::starting(event.tick, position, payload.walking_direction)
                } else if turned {
                    if segment.has_moved() {
                        cx.emit(segment_record(actor, &segment));
                    }
                    // The new leg starts where the previous one ended.
                    let mut leg =
                        WalkSegment::starting(segment.last_tick, segment.last, direction);
                    leg.last_tick = event.tick;
                    leg.last = position;
                    leg
                } else {
                    segment.last_tick = event.tick;
                    segment.last = position;
                    if segment.direction.is_none() {
                        segment.direction = direction;
                    }
                    segment
                }
            }
        };

        trace!(
            target: "recorder::dispatch",
            %actor,
            start = next.start_tick.0,
            last = next.last_tick.0,
            "walk segment"
        );
        cx.context_mut().movement = Some(next);
        Ok(Emit::Veto)
    }
}

/// `player_driving_changed`: `enter_vehicle` / `exit_vehicle`.
#[derive(Debug, Default)]
pub struct DrivingExtractor;

impl Extractor for DrivingExtractor {
    fn name(&self) -> &'static str {
        "driving"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::PlayerDrivingChanged(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };

        if let Some(vehicle) = &payload.vehicle {
            record.set("vehicle", entity_record(vehicle));
        }

        if payload.driving {
            close_segment(cx);
            cx.context_mut().vehicle = Some(VehicleState {
                name: payload.vehicle.as_ref().map(|v| v.name.clone()),
                since: event.tick,
            });
            record.set("action", "enter_vehicle");
        } else {
            let previous = cx.context_mut().vehicle.take();
            if payload.vehicle.is_none() {
                let name = previous.as_ref().and_then(|p| p.name.as_deref());
                record.set("vehicle", Record::new().with_opt("name", name));
            }
            record
                .set("action", "exit_vehicle")
                .set_opt("duration", previous.map(|p| event.tick.since(p.since)));
        }
        Ok(Emit::Log)
    }
}
