//! Keyed table of actor contexts.

use std::collections::HashMap;

use tracing::trace;
use world_core::ActorId;

use super::actor::{ActorContext, Subfield};

/// Owner of all cross-event actor state.
///
/// Entries are created by writes only. Reads of an unknown actor see an
/// empty context without inserting one.
#[derive(Debug, Default)]
pub struct ContextStore {
    contexts: HashMap<ActorId, ActorContext>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the actor's context, or an empty one.
    pub fn get(&self, actor: ActorId) -> ActorContext {
        self.contexts.get(&actor).cloned().unwrap_or_default()
    }

    pub fn peek(&self, actor: ActorId) -> Option<&ActorContext> {
        self.contexts.get(&actor)
    }

    /// Write access, inserting an empty context on first use.
    pub fn get_mut(&mut self, actor: ActorId) -> &mut ActorContext {
        self.contexts.entry(actor).or_default()
    }

    /// Resets one sub-state. No-op for unknown actors.
    pub fn clear(&mut self, actor: ActorId, field: Subfield) {
        if let Some(context) = self.contexts.get_mut(&actor) {
            context.clear(field);
        }
    }

    /// Stores a staged context produced by a successful dispatch.
    ///
    /// Unchanged contexts are not written back, and an empty context is never
    /// inserted for an actor that had none.
    pub fn replace(&mut self, actor: ActorId, context: ActorContext) {
        match self.contexts.get_mut(&actor) {
            Some(current) if *current == context => {}
            Some(current) => *current = context,
            None if context.is_empty() => {}
            None => {
                trace!(target: "recorder::context", %actor, "context created");
                self.contexts.insert(actor, context);
            }
        }
    }

    /// Drops the actor's context at session end.
    pub fn remove(&mut self, actor: ActorId) -> Option<ActorContext> {
        self.contexts.remove(&actor)
    }

    pub fn contains(&self, actor: ActorId) -> bool {
        self.contexts.contains_key(&actor)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Known actors in ascending id order.
    pub fn actors(&self) -> Vec<ActorId> {
        let mut actors: Vec<_> = self.contexts.keys().copied().collect();
        actors.sort();
        actors
    }
}
