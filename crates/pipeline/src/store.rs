use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use ledgerport_core::{Task, TaskId, TaskStatus, TaskUpdate};
use tracing::debug;

/// Shared, in-process task table. Each task is written by the worker that
/// runs it and read by any number of pollers. The lock is never held across
/// an `.await`.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    inner: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh task in `Starting` and return its id.
    pub fn create(&self) -> TaskId {
        let id = TaskId::generate();
        let task = Task::new(id.clone());
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), task);
        id
    }

    /// Merge `update` into the task. Returns false when the id is unknown or
    /// the task already reached a terminal status.
    pub fn update(&self, id: &TaskId, update: TaskUpdate) -> bool {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match map.get_mut(id) {
            Some(task) => {
                let applied = task.apply(update);
                if !applied {
                    debug!("Ignoring update for finished task {id}");
                }
                applied
            }
            None => {
                debug!("Ignoring update for unknown task {id}");
                false
            }
        }
    }

    /// Snapshot of the task, or the not-found record.
    pub fn get(&self, id: &TaskId) -> Task {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .unwrap_or_else(|| Task::not_found(id.clone()))
    }

    /// Whether `filename` is the output of a task that finished successfully.
    pub fn is_finished_result(&self, filename: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .any(|task| {
                task.status == TaskStatus::Done
                    && task.result_filename.as_deref() == Some(filename)
            })
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_starts_queued() {
        let store = TaskStore::new();
        let id = store.create();
        let task = store.get(&id);
        assert_eq!(task.status, TaskStatus::Starting);
        assert_eq!(task.progress, 0);
        assert_eq!(task.message, "Queued");
        assert!(task.started_at.is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_id_yields_not_found() {
        let store = TaskStore::new();
        let task = store.get(&TaskId::from("nope"));
        assert_eq!(task.status, TaskStatus::NotFound);
        assert_eq!(task.progress, 0);
        assert_eq!(task.message, "Task not found");
    }

    #[test]
    fn update_unknown_is_ignored() {
        let store = TaskStore::new();
        assert!(!store.update(&TaskId::from("ghost"), TaskUpdate::new().progress(10)));
        assert!(store.is_empty());
    }

    #[test]
    fn progress_never_goes_back() {
        let store = TaskStore::new();
        let id = store.create();
        store.update(&id, TaskUpdate::new().status(TaskStatus::Running).progress(40));
        store.update(&id, TaskUpdate::new().progress(20).message("late"));
        let task = store.get(&id);
        assert_eq!(task.progress, 40);
        assert_eq!(task.message, "late");
    }

    #[test]
    fn terminal_task_is_frozen() {
        let store = TaskStore::new();
        let id = store.create();
        store.update(&id, TaskUpdate::new().status(TaskStatus::Done).progress(100));
        assert!(!store.update(&id, TaskUpdate::new().status(TaskStatus::Error).message("x")));
        assert_eq!(store.get(&id).status, TaskStatus::Done);
    }

    #[test]
    fn only_done_tasks_expose_results() {
        let store = TaskStore::new();
        let running = store.create();
        store.update(
            &running,
            TaskUpdate::new()
                .status(TaskStatus::Running)
                .result_filename("pending.xlsx"),
        );
        let done = store.create();
        store.update(
            &done,
            TaskUpdate::new()
                .status(TaskStatus::Done)
                .progress(100)
                .result_filename("abc12345_vendas.xlsx"),
        );

        assert!(store.is_finished_result("abc12345_vendas.xlsx"));
        assert!(!store.is_finished_result("pending.xlsx"));
        assert!(!store.is_finished_result("abc12345_vendas.xlsb"));
    }

    #[test]
    fn concurrent_writers_on_distinct_tasks() {
        let store = TaskStore::new();
        let ids: Vec<TaskId> = (0..8).map(|_| store.create()).collect();
        std::thread::scope(|s| {
            for id in &ids {
                let store = store.clone();
                s.spawn(move || {
                    for p in 0..=100u8 {
                        store.update(id, TaskUpdate::new().progress(p));
                    }
                });
            }
        });
        assert!(ids.iter().all(|id| store.get(id).progress == 100));
    }
}
