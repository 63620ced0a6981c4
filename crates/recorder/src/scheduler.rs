//! Fire-once task scheduler driven by host ticks.
//!
//! Tasks are ordered by `(fire tick, task id)` in a min-heap. Cancellation
//! removes the task body; its heap entry is skipped when it surfaces.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use tracing::debug;
use world_core::{ActorId, EntityRef, Tick};

/// Identifier handed out by [`TaskScheduler::schedule_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

/// Deferred work the recorder performs when a task comes due.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduledAction {
    /// Release an inspection view opened for `actor`, if it is still open.
    ReleaseInspection { actor: ActorId, target: EntityRef },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub fire_at: Tick,
    pub action: ScheduledAction,
}

#[derive(Debug, Default)]
pub struct TaskScheduler {
    queue: BinaryHeap<Reverse<(Tick, TaskId)>>,
    tasks: HashMap<TaskId, ScheduledTask>,
    next_id: u64,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `action` to run `delay` ticks after `now`.
    pub fn schedule(&mut self, now: Tick, delay: u64, action: ScheduledAction) -> TaskId {
        self.schedule_at(now + delay, action)
    }

    pub fn schedule_at(&mut self, fire_at: Tick, action: ScheduledAction) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        debug!(
            target: "recorder::scheduler",
            task = id.0,
            fire_at = fire_at.0,
            "task scheduled"
        );
        self.queue.push(Reverse((fire_at, id)));
        self.tasks.insert(
            id,
            ScheduledTask {
                id,
                fire_at,
                action,
            },
        );
        id
    }

    /// Cancels a pending task. Returns `false` when it already ran or was
    /// never scheduled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let cancelled = self.tasks.remove(&id).is_some();
        if cancelled {
            debug!(target: "recorder::scheduler", task = id.0, "task cancelled");
        }
        cancelled
    }

    /// Removes and returns every task due at or before `now`, earliest first.
    ///
    /// Each task is returned exactly once.
    pub fn pop_due(&mut self, now: Tick) -> Vec<ScheduledTask> {
        let mut due = Vec::new();
        while let Some(Reverse((fire_at, id))) = self.queue.peek().copied() {
            if fire_at > now {
                break;
            }
            self.queue.pop();
            if let Some(task) = self.tasks.remove(&id) {
                due.push(task);
            }
        }
        due
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Fire tick of the earliest live task.
    pub fn next_fire_tick(&self) -> Option<Tick> {
        self.tasks.values().map(|task| task.fire_at).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(actor: u32) -> ScheduledAction {
        ScheduledAction::ReleaseInspection {
            actor: ActorId(actor),
            target: EntityRef::new("wooden-chest"),
        }
    }

    #[test]
    fn tasks_fire_once_in_tick_order() {
        let mut scheduler = TaskScheduler::new();
        let late = scheduler.schedule(Tick(500), 60, release(1));
        let early = scheduler.schedule(Tick(500), 10, release(2));

        assert!(scheduler.pop_due(Tick(509)).is_empty());

        let due = scheduler.pop_due(Tick(600));
        let ids: Vec<_> = due.iter().map(|task| task.id).collect();
        assert_eq!(ids, vec![early, late]);
        assert_eq!(due[1].fire_at, Tick(560));

        assert!(scheduler.pop_due(Tick(700)).is_empty());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn same_tick_tasks_run_in_schedule_order() {
        let mut scheduler = TaskScheduler::new();
        let first = scheduler.schedule_at(Tick(10), release(1));
        let second = scheduler.schedule_at(Tick(10), release(2));

        let ids: Vec<_> = scheduler.pop_due(Tick(10)).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let mut scheduler = TaskScheduler::new();
        let id = scheduler.schedule(Tick(0), 5, release(1));

        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert_eq!(scheduler.next_fire_tick(), None);
        assert!(scheduler.pop_due(Tick(10)).is_empty());
    }
}
