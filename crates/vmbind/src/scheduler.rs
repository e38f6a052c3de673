//! Debounced task scheduling on a virtual clock
//!
//! Every task is keyed by what it does; scheduling a task that is already
//! pending pushes its deadline back instead of queueing a second run
//! (trailing-edge debounce, no maximum wait). Time only moves when the
//! host advances it.

use std::time::Duration;

use indexmap::IndexMap;
use tracing::trace;

/// Deferred work for one controller root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Task {
    /// Update every live controller of the root, then notify observe
    /// listeners.
    Flush(String),
    /// Instantiate controllers found by a scan and sweep dead ones.
    Settle(String),
}

impl Task {
    /// Name of the controller root the task belongs to.
    pub fn root(&self) -> &str {
        match self {
            Task::Flush(name) | Task::Settle(name) => name,
        }
    }
}

/// Virtual-time debouncer.
#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    pending: IndexMap<Task, Duration>,
}

impl Scheduler {
    /// An empty scheduler at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Run `task` after `delay`, replacing a pending run of the same task.
    pub fn schedule(&mut self, task: Task, delay: Duration) {
        let due = self.now + delay;
        trace!(?task, due_ms = due.as_millis() as u64, "task scheduled");
        self.pending.shift_remove(&task);
        self.pending.insert(task, due);
    }

    /// Drop a pending task.
    pub fn cancel(&mut self, task: &Task) -> bool {
        self.pending.shift_remove(task).is_some()
    }

    /// Whether `task` is pending.
    pub fn is_pending(&self, task: &Task) -> bool {
        self.pending.contains_key(task)
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Deadline of the earliest pending task.
    pub fn next_due(&self) -> Option<Duration> {
        self.pending.values().min().copied()
    }

    /// Take the earliest task due at or before `up_to`, moving the clock
    /// to its deadline. Tasks with equal deadlines run in scheduling
    /// order.
    pub fn pop_due(&mut self, up_to: Duration) -> Option<Task> {
        let mut earliest: Option<(usize, Duration)> = None;
        for (i, &due) in self.pending.values().enumerate() {
            if due <= up_to && earliest.map_or(true, |(_, best)| due < best) {
                earliest = Some((i, due));
            }
        }
        let (index, due) = earliest?;
        let (task, _) = self.pending.shift_remove_index(index)?;
        self.now = self.now.max(due);
        Some(task)
    }

    /// Move the clock forward without running anything.
    pub fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }
}
