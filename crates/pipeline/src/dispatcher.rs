use std::sync::Arc;

use ledgerport_core::{ConversionRequest, TaskDetails, TaskId, TaskStatus, TaskUpdate};
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::convert::{Converter, ConverterSet};
use crate::error::ConvertError;
use crate::progress::{Pacing, ProgressReporter};
use crate::store::TaskStore;

pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// A request bound to the task that tracks it.
#[derive(Debug, Clone)]
pub struct Job {
    pub task_id: TaskId,
    pub request: ConversionRequest,
}

/// Accepts conversion requests and runs each on its own tokio task.
///
/// At most `max_concurrent` conversions run at once. Every request is
/// accepted; the rest wait in `Starting` / `"Queued"` for a permit, in
/// arrival order.
#[derive(Clone)]
pub struct Dispatcher {
    store: TaskStore,
    gate: Arc<Semaphore>,
    max: usize,
    pacing: Pacing,
    converters: ConverterSet,
}

impl Dispatcher {
    pub fn new(store: TaskStore, max_concurrent: usize, pacing: Pacing) -> Self {
        let max = max_concurrent.max(1);
        Self {
            store,
            gate: Arc::new(Semaphore::new(max)),
            max,
            pacing,
            converters: ConverterSet::default(),
        }
    }

    pub fn with_converters(mut self, converters: ConverterSet) -> Self {
        self.converters = converters;
        self
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Conversions currently holding a permit.
    pub fn running(&self) -> usize {
        self.max.saturating_sub(self.gate.available_permits())
    }

    pub fn max_concurrent(&self) -> usize {
        self.max
    }

    /// Dispatch with the converter registered for the request's kind.
    pub fn submit(&self, request: ConversionRequest) -> TaskId {
        let converter = self.converters.get(request.kind);
        self.dispatch(request, converter)
    }

    /// Create the task and start the conversion in the background. Must be
    /// called from within a tokio runtime.
    pub fn dispatch(&self, request: ConversionRequest, converter: Arc<dyn Converter>) -> TaskId {
        let task_id = self.store.create();
        info!(
            "Task {task_id} queued: {} ({})",
            request.input_path.display(),
            request.kind
        );
        let job = Job {
            task_id: task_id.clone(),
            request,
        };
        let store = self.store.clone();
        let gate = Arc::clone(&self.gate);
        let pacing = self.pacing;
        tokio::spawn(async move {
            // The gate is never closed.
            let Ok(_permit) = gate.acquire_owned().await else {
                error!("Task {} dropped: dispatcher gate closed", job.task_id);
                return;
            };
            if let Err(e) = drive(&job, converter, &store, pacing).await {
                fail(&store, &job.task_id, &e);
            }
        });
        task_id
    }
}

fn fail(store: &TaskStore, task_id: &TaskId, e: &ConvertError) {
    error!("Task {task_id} failed: {e}");
    let mut details = TaskDetails::new();
    details.insert("error_kind".into(), Value::from(e.kind_label()));
    store.update(
        task_id,
        TaskUpdate::new()
            .status(TaskStatus::Error)
            .message(e.task_message())
            .error(e.to_string())
            .ended_now()
            .details(details),
    );
}

/// Lifecycle of one task after it obtained a permit.
async fn drive(
    job: &Job,
    converter: Arc<dyn Converter>,
    store: &TaskStore,
    pacing: Pacing,
) -> Result<(), ConvertError> {
    let request = &job.request;
    if !tokio::fs::try_exists(&request.input_path).await.unwrap_or(false) {
        return Err(ConvertError::InputMissing(request.input_path.clone()));
    }

    store.update(
        &job.task_id,
        TaskUpdate::new()
            .status(TaskStatus::Running)
            .progress(0)
            .message("Starting conversion"),
    );

    let reporter = ProgressReporter::new(store.clone(), job.task_id.clone(), pacing);
    let blocking_request = request.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        converter.convert(&blocking_request, &reporter)
    })
    .await
    .map_err(|e| {
        error!("Task {} worker aborted: {e}", job.task_id);
        ConvertError::WorkerPanicked
    })??;

    if !tokio::fs::try_exists(&request.output_path).await.unwrap_or(false) {
        return Err(ConvertError::OutputWriteFailure(request.output_path.clone()));
    }

    store.update(
        &job.task_id,
        TaskUpdate::new()
            .status(TaskStatus::Finalizing)
            .progress(95)
            .message("Finalizing"),
    );
    if !pacing.finalize.is_zero() {
        tokio::time::sleep(pacing.finalize).await;
    }

    let mut done = TaskUpdate::new()
        .status(TaskStatus::Done)
        .progress(100)
        .message(outcome.message)
        .ended_now()
        .details(outcome.details);
    if let Some(filename) = request.output_filename() {
        done = done.result_filename(filename);
    }
    store.update(&job.task_id, done);
    info!("Task {} done", job.task_id);
    Ok(())
}
