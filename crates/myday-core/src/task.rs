use std::collections::BTreeSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};

pub type TaskId = u64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,

    pub title: String,

    #[serde(default)]
    pub completed: bool,

    /// Transient UI flag; omitted from storage while unset.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub editing: bool,
}

impl Task {
    pub fn new_pending(id: TaskId, title: String) -> Self {
        Self {
            id,
            title,
            completed: false,
            editing: false,
        }
    }
}

/// Hands out ids shaped like millisecond timestamps, bumped past the last
/// issued id whenever the clock has not advanced.
pub struct IdGenerator {
    last: TaskId,
    clock: Box<dyn Fn() -> TaskId>,
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdGenerator")
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::with_clock(|| u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0))
    }
}

impl IdGenerator {
    pub fn with_clock<F>(clock: F) -> Self
    where
        F: Fn() -> TaskId + 'static,
    {
        Self {
            last: 0,
            clock: Box::new(clock),
        }
    }

    /// `taken` is only consulted once the id space above the last issued
    /// id is used up; then the lowest free id is handed out instead.
    pub fn next_id(&mut self, taken: &[Task]) -> TaskId {
        let Some(floor) = self.last.checked_add(1) else {
            return lowest_free_id(taken);
        };
        let id = (self.clock)().max(floor);
        self.last = id;
        id
    }

    /// Raises the floor so later ids never reuse one already present.
    pub fn observe(&mut self, tasks: &[Task]) {
        if let Some(max) = tasks.iter().map(|task| task.id).max() {
            self.last = self.last.max(max);
        }
    }
}

fn lowest_free_id(taken: &[Task]) -> TaskId {
    let used: BTreeSet<TaskId> = taken.iter().map(|task| task.id).collect();
    (1..=TaskId::MAX)
        .find(|id| !used.contains(id))
        .unwrap_or_default()
}
