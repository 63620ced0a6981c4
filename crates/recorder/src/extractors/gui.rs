//! GUI extractors.
//!
//! Every GUI interaction is logged directly. Independently of that, opening
//! a tracked GUI kind starts a session in the actor context and closing the
//! same kind writes a summary with the session duration.

use tracing::debug;
use world_core::{EntityRef, EventPayload, GuiType, HostEvent, Tick};

use super::{Emit, ExtractContext, ExtractError, Extractor};
use crate::context::GuiState;
use crate::record::{Record, entity_record, synthetic};

fn set_gui_fields(
    record: &mut Record,
    gui_type: GuiType,
    entity: Option<&EntityRef>,
    element: Option<&str>,
) {
    record.set_opt(
        "gui_type",
        (gui_type != GuiType::None).then(|| gui_type.to_string()),
    );
    if let Some(entity) = entity {
        record.set("entity", entity_record(entity));
    }
    record.set_opt("element", element);
}

/// Summary of a closed GUI session.
fn session_record(
    cx: &ExtractContext<'_>,
    kind: GuiType,
    opened_at: Tick,
    closed_at: Tick,
) -> Record {
    let action = if kind.is_blueprint() {
        "blueprint_session"
    } else {
        "gui_session"
    };
    let mut record = synthetic(cx.category(), closed_at, cx.actor(), "gui_closed");
    record
        .set("action", action)
        .set("gui_type", kind.to_string())
        .set("opened_at", opened_at.0)
        .set("closed_at", closed_at.0)
        .set("duration", closed_at.since(opened_at));
    record
}

/// `gui_opened`.
#[derive(Debug, Default)]
pub struct GuiOpenedExtractor;

impl Extractor for GuiOpenedExtractor {
    fn name(&self) -> &'static str {
        "gui_opened"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::GuiOpened(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };

        record.set("action", "gui_opened");
        set_gui_fields(
            record,
            payload.gui_type,
            payload.entity.as_ref(),
            payload.element.as_deref(),
        );

        if cx.config().is_tracked(payload.gui_type) {
            let actor = cx.actor();
            let context = cx.context_mut();
            if let GuiState::Opened { kind, opened_at } = context.gui_state {
                debug!(
                    target: "recorder::dispatch",
                    %actor,
                    %kind,
                    opened_at = opened_at.0,
                    "tracked gui replaced without close"
                );
            }
            context.gui_state = GuiState::Opened {
                kind: payload.gui_type,
                opened_at: event.tick,
            };
        }
        Ok(Emit::Log)
    }
}

/// `gui_closed`: closes a matching tracked session and any inspection view
/// the actor closed by hand.
#[derive(Debug, Default)]
pub struct GuiClosedExtractor;

impl Extractor for GuiClosedExtractor {
    fn name(&self) -> &'static str {
        "gui_closed"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::GuiClosed(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };

        record.set("action", "gui_closed");
        set_gui_fields(
            record,
            payload.gui_type,
            payload.entity.as_ref(),
            payload.element.as_deref(),
        );

        if let GuiState::Opened { kind, opened_at } = cx.context().gui_state
            && kind == payload.gui_type
        {
            let summary = session_record(cx, kind, opened_at, event.tick);
            cx.emit(summary);
            cx.context_mut().gui_state = GuiState::None;
        }

        if payload.gui_type == GuiType::Entity {
            let context = cx.context_mut();
            let closes_inspection = context.inspection.as_ref().is_some_and(|inspection| {
                payload
                    .entity
                    .as_ref()
                    .is_none_or(|entity| entity.same_entity(&inspection.target))
            });
            if closes_inspection {
                // The release task stays scheduled and finds nothing to do.
                context.inspection = None;
            }
        }
        Ok(Emit::Log)
    }
}

/// `gui_click`.
#[derive(Debug, Default)]
pub struct GuiClickExtractor;

impl Extractor for GuiClickExtractor {
    fn name(&self) -> &'static str {
        "gui_click"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::GuiClick(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };

        record
            .set("action", "gui_click")
            .set_opt("element", payload.element.as_deref())
            .set_opt("button", payload.button.as_deref())
            .set_opt("shift", payload.shift.then_some(true))
            .set_opt("control", payload.control.then_some(true))
            .set_opt("alt", payload.alt.then_some(true))
            .set_opt("session", cx.context().tracked_gui().map(|g| g.to_string()));
        Ok(Emit::Log)
    }
}

/// `gui_text_changed`.
#[derive(Debug, Default)]
pub struct GuiTextExtractor;

impl Extractor for GuiTextExtractor {
    fn name(&self) -> &'static str {
        "gui_text_changed"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        _cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::GuiTextChanged(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };

        record
            .set("action", "gui_text_changed")
            .set_opt("element", payload.element.as_deref())
            .set_opt("text", payload.text.as_deref());
        Ok(Emit::Log)
    }
}

/// `gui_checked_state_changed`.
#[derive(Debug, Default)]
pub struct GuiCheckedExtractor;

impl Extractor for GuiCheckedExtractor {
    fn name(&self) -> &'static str {
        "gui_checked"
    }

    fn extract(
        &self,
        event: &HostEvent,
        record: &mut Record,
        _cx: &mut ExtractContext<'_>,
    ) -> Result<Emit, ExtractError> {
        let EventPayload::GuiCheckedStateChanged(payload) = &event.payload else {
            return Err(ExtractError::unexpected(self.name(), event));
        };

        record
            .set("action", "gui_checked_changed")
            .set_opt("element", payload.element.as_deref())
            .set_opt("state", payload.state);
        Ok(Emit::Log)
    }
}

#[cfg(test)]
mod tests {
    use world_core::{ActorId, GuiClick, GuiClosed, GuiOpened, Position};

    use super::*;
    use crate::config::RecorderConfig;
    use crate::context::{ActorContext, Inspection};
    use crate::extractors::testing::{run, text};
    use crate::record::Value;

    fn opened(tick: u64, gui_type: GuiType) -> HostEvent {
        HostEvent::by(
            ActorId(1),
            tick,
            EventPayload::GuiOpened(GuiOpened {
                gui_type,
                ..GuiOpened::default()
            }),
        )
    }

    fn closed(tick: u64, gui_type: GuiType) -> HostEvent {
        HostEvent::by(
            ActorId(1),
            tick,
            EventPayload::GuiClosed(GuiClosed {
                gui_type,
                ..GuiClosed::default()
            }),
        )
    }

    #[test]
    fn tracked_session_reports_duration() {
        let config = RecorderConfig::default();
        let mut context = ActorContext::default();

        run(&GuiOpenedExtractor, &opened(100, GuiType::BlueprintLibrary), &mut context, &config);
        assert_eq!(context.tracked_gui(), Some(GuiType::BlueprintLibrary));

        let close = run(
            &GuiClosedExtractor,
            &closed(250, GuiType::BlueprintLibrary),
            &mut context,
            &config,
        );
        assert_eq!(close.emit.unwrap(), Emit::Log);
        assert_eq!(context.gui_state, GuiState::None);

        let (_, summary) = &close.effects.synthetic[0];
        assert_eq!(text(summary, "action"), Some("blueprint_session"));
        assert_eq!(summary.get("duration"), Some(&Value::UInt(150)));
    }

    #[test]
    fn close_without_open_has_no_summary() {
        let config = RecorderConfig::default();
        let mut context = ActorContext::default();

        let close = run(
            &GuiClosedExtractor,
            &closed(5, GuiType::BlueprintBook),
            &mut context,
            &config,
        );
        assert_eq!(close.emit.unwrap(), Emit::Log);
        assert!(close.effects.synthetic.is_empty());
    }

    #[test]
    fn untracked_guis_do_not_touch_the_session() {
        let config = RecorderConfig::default();
        let mut context = ActorContext::default();
        run(&GuiOpenedExtractor, &opened(1, GuiType::BlueprintBook), &mut context, &config);

        let open = run(&GuiOpenedExtractor, &opened(2, GuiType::Production), &mut context, &config);
        assert_eq!(text(&open.record, "gui_type"), Some("production"));
        let close = run(
            &GuiClosedExtractor,
            &closed(3, GuiType::Production),
            &mut context,
            &config,
        );
        assert!(close.effects.synthetic.is_empty());
        assert_eq!(context.tracked_gui(), Some(GuiType::BlueprintBook));
    }

    #[test]
    fn reopening_a_tracked_gui_restarts_the_session() {
        let config = RecorderConfig::default();
        let mut context = ActorContext::default();
        run(&GuiOpenedExtractor, &opened(10, GuiType::BlueprintBook), &mut context, &config);
        run(&GuiOpenedExtractor, &opened(20, GuiType::BlueprintLibrary), &mut context, &config);

        let stale = run(
            &GuiClosedExtractor,
            &closed(30, GuiType::BlueprintBook),
            &mut context,
            &config,
        );
        assert!(stale.effects.synthetic.is_empty());

        let close = run(
            &GuiClosedExtractor,
            &closed(35, GuiType::BlueprintLibrary),
            &mut context,
            &config,
        );
        assert_eq!(close.effects.synthetic[0].1.get("duration"), Some(&Value::UInt(15)));
    }

    #[test]
    fn clicks_note_the_open_session() {
        let config = RecorderConfig::default();
        let mut context = ActorContext::default();
        run(&GuiOpenedExtractor, &opened(1, GuiType::BlueprintLibrary), &mut context, &config);

        let click = HostEvent::by(
            ActorId(1),
            2,
            EventPayload::GuiClick(GuiClick {
                element: Some("blueprint_record_3".into()),
                shift: true,
                ..GuiClick::default()
            }),
        );
        let run = run(&GuiClickExtractor, &click, &mut context, &config);
        assert_eq!(text(&run.record, "session"), Some("blueprint_library"));
        assert_eq!(run.record.get("shift"), Some(&Value::Bool(true)));
        assert!(!run.record.contains("control"));
    }

    #[test]
    fn closing_the_inspected_entity_ends_the_inspection() {
        let config = RecorderConfig::default();
        let chest = EntityRef::new("wooden-chest").at(Position::new(2.5, 2.5));
        let mut context = ActorContext {
            inspection: Some(Inspection {
                target: chest.clone(),
                opened_at: Tick(500),
                auto_close: true,
                release_task: None,
            }),
            ..ActorContext::default()
        };
        let close = HostEvent::by(
            ActorId(1),
            530,
            EventPayload::GuiClosed(GuiClosed {
                gui_type: GuiType::Entity,
                entity: Some(chest),
                element: None,
            }),
        );

        run(&GuiClosedExtractor, &close, &mut context, &config);
        assert!(context.inspection.is_none());
    }
}
