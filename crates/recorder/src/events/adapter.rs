//! Inbound edge: decodes host notifications and decides whether they are
//! dispatched at all.

use std::collections::BTreeSet;

use thiserror::Error;
use world_core::{ActorId, EventKind, HostEvent};

use super::Category;

/// A host line that could not be turned into a [`HostEvent`].
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("malformed host payload: {source}")]
    MalformedPayload {
        #[source]
        source: serde_json::Error,
    },

    #[error("empty host line")]
    EmptyLine,
}

/// Why a notification was not dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not attributable to any actor.
    NoActor,
    /// Its category is not subscribed in this session.
    Unsubscribed(Category),
}

/// Dispatch decision for one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Dispatch { actor: ActorId, category: Category },
    Skip(SkipReason),
}

/// Subscription filter between the host and the extractor tables.
#[derive(Debug, Clone)]
pub struct HostAdapter {
    subscribed: BTreeSet<Category>,
}

impl HostAdapter {
    pub fn new(categories: impl IntoIterator<Item = Category>) -> Self {
        Self {
            subscribed: categories.into_iter().collect(),
        }
    }

    /// Adapter subscribed to every category.
    pub fn all() -> Self {
        Self::new(Category::all())
    }

    pub fn is_subscribed(&self, category: Category) -> bool {
        self.subscribed.contains(&category)
    }

    pub fn subscribes_to(&self, kind: EventKind) -> bool {
        self.is_subscribed(Category::of(kind))
    }

    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.subscribed.iter().copied()
    }

    /// Decodes one line of the host wire format.
    pub fn decode(&self, line: &str) -> Result<HostEvent, AdapterError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(AdapterError::EmptyLine);
        }
        serde_json::from_str(line).map_err(|source| AdapterError::MalformedPayload { source })
    }

    pub fn route(&self, event: &HostEvent) -> Route {
        let Some(actor) = event.player else {
            return Route::Skip(SkipReason::NoActor);
        };
        let category = Category::of(event.kind());
        if !self.is_subscribed(category) {
            return Route::Skip(SkipReason::Unsubscribed(category));
        }
        Route::Dispatch { actor, category }
    }
}

impl Default for HostAdapter {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use world_core::{EventPayload, GuiClick, HostEvent, PlayerJoined, Tick};

    use super::*;

    #[test]
    fn actorless_events_are_skipped() {
        let adapter = HostAdapter::all();
        let event = HostEvent::new(
            Tick(3),
            None,
            EventPayload::PlayerJoinedGame(PlayerJoined::default()),
        );

        assert_eq!(adapter.route(&event), Route::Skip(SkipReason::NoActor));
    }

    #[test]
    fn unsubscribed_categories_are_skipped() {
        let adapter = HostAdapter::new([Category::Movement, Category::Construction]);
        let event = HostEvent::by(ActorId(1), 3, EventPayload::GuiClick(GuiClick::default()));

        assert_eq!(
            adapter.route(&event),
            Route::Skip(SkipReason::Unsubscribed(Category::Gui))
        );
        assert!(adapter.subscribes_to(EventKind::BuiltEntity));
    }

    #[test]
    fn decodes_and_routes_wire_lines() {
        let adapter = HostAdapter::all();
        let event = adapter
            .decode(r#"{"tick":100,"player":1,"kind":"gui_opened","gui_type":"blueprint_library"}"#)
            .expect("valid line");

        assert_eq!(
            adapter.route(&event),
            Route::Dispatch {
                actor: ActorId(1),
                category: Category::Gui
            }
        );
        assert!(matches!(
            adapter.decode(r#"{"tick":1,"kind":"no_such_event"}"#),
            Err(AdapterError::MalformedPayload { .. })
        ));
        assert!(matches!(adapter.decode("  "), Err(AdapterError::EmptyLine)));
    }
}
