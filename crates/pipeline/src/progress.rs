use std::time::Duration;

use ledgerport_core::{TaskId, TaskStatus, TaskUpdate};

use crate::store::TaskStore;

/// Cosmetic pauses that keep intermediate progress visible to pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub per_step: Duration,
    pub finalize: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            per_step: Duration::from_millis(300),
            finalize: Duration::from_millis(500),
        }
    }
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            per_step: Duration::ZERO,
            finalize: Duration::ZERO,
        }
    }
}

/// Handle a converter uses to publish progress for its task. Meant for the
/// blocking thread a converter runs on: pacing sleeps the current thread.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    store: TaskStore,
    task_id: TaskId,
    pacing: Pacing,
}

impl ProgressReporter {
    pub fn new(store: TaskStore, task_id: TaskId, pacing: Pacing) -> Self {
        Self {
            store,
            task_id,
            pacing,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn report(&self, progress: u8, message: impl Into<String>) {
        self.store.update(
            &self.task_id,
            TaskUpdate::new()
                .status(TaskStatus::Running)
                .progress(progress)
                .message(message),
        );
        if !self.pacing.per_step.is_zero() {
            std::thread::sleep(self.pacing.per_step);
        }
    }
}

/// Maps step `index` of `total` onto the progress range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSpan {
    pub start: u8,
    pub end: u8,
}

impl ProgressSpan {
    pub const fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    pub fn at(&self, index: usize, total: usize) -> u8 {
        if total == 0 {
            return self.start;
        }
        let width = usize::from(self.end.saturating_sub(self.start));
        let offset = (index.min(total) * width) / total;
        self.start.saturating_add(u8::try_from(offset).unwrap_or(u8::MAX))
    }
}
