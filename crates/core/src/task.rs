use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn generate() -> Self {
        TaskId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        TaskId(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Starting,
    Running,
    Finalizing,
    Done,
    Error,
    NotFound,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Error)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Starting => write!(f, "starting"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Finalizing => write!(f, "finalizing"),
            TaskStatus::Done => write!(f, "done"),
            TaskStatus::Error => write!(f, "error"),
            TaskStatus::NotFound => write!(f, "not_found"),
        }
    }
}

pub type TaskDetails = BTreeMap<String, serde_json::Value>;

/// Progress record for one background conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub status: TaskStatus,
    /// 0–100, never decreases over the life of the task.
    pub progress: u8,
    pub message: String,
    pub error: Option<String>,
    pub result_filename: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: TaskDetails,
}

impl Task {
    pub fn new(id: TaskId) -> Self {
        Task {
            id,
            status: TaskStatus::Starting,
            progress: 0,
            message: "Queued".to_string(),
            error: None,
            result_filename: None,
            started_at: Some(Utc::now()),
            ended_at: None,
            details: TaskDetails::new(),
        }
    }

    /// Sentinel returned for ids the store has never seen.
    pub fn not_found(id: TaskId) -> Self {
        Task {
            id,
            status: TaskStatus::NotFound,
            progress: 0,
            message: "Task not found".to_string(),
            error: None,
            result_filename: None,
            started_at: None,
            ended_at: None,
            details: TaskDetails::new(),
        }
    }

    /// Merge a partial update. Returns `false` (and changes nothing) once the
    /// task is terminal. Progress is clamped so it never moves backwards.
    pub fn apply(&mut self, update: TaskUpdate) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(progress) = update.progress {
            self.progress = self.progress.max(progress.min(100));
        }
        if let Some(message) = update.message {
            self.message = message;
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        if let Some(filename) = update.result_filename {
            self.result_filename = Some(filename);
        }
        if let Some(ended_at) = update.ended_at {
            self.ended_at = Some(ended_at);
        }
        self.details.extend(update.details);
        true
    }
}

/// Partial set of task fields; unset fields are left untouched by
/// [`Task::apply`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub progress: Option<u8>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub result_filename: Option<String>,
    pub ended_at: Option<DateTime<Utc>>,
    pub details: TaskDetails,
}

impl TaskUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn result_filename(mut self, filename: impl Into<String>) -> Self {
        self.result_filename = Some(filename.into());
        self
    }

    pub fn ended_now(mut self) -> Self {
        self.ended_at = Some(Utc::now());
        self
    }

    pub fn details(mut self, details: TaskDetails) -> Self {
        self.details.extend(details);
        self
    }
}
