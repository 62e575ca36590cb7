//! Task state, cancellation token, and the concurrent task registry

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// State machine of an import task.
///
/// Completed, Failed, and Cancelled are terminal; only non-terminal states
/// are cancellable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    AnalyzingData,
    CreatingIndex,
    ProcessingData,
    OptimizingIndex,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }
}

/// Status of one import task.
///
/// Owned by the coordinator: created at start and mutated only by the
/// executing pipeline (plus the cancel path flipping to a terminal state).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportTask {
    pub task_id: Uuid,
    pub space_id: String,
    pub state: TaskState,
    pub total_records: usize,
    /// Never exceeds total_records
    pub processed_records: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub current_batch: usize,
    pub total_batches: usize,
    pub error_details: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Failure message or completion summary
    pub result_summary: Option<String>,
}

impl ImportTask {
    pub fn new(task_id: Uuid, space_id: impl Into<String>) -> Self {
        Self {
            task_id,
            space_id: space_id.into(),
            state: TaskState::Pending,
            total_records: 0,
            processed_records: 0,
            success_count: 0,
            error_count: 0,
            current_batch: 0,
            total_batches: 0,
            error_details: Vec::new(),
            start_time: Utc::now(),
            end_time: None,
            result_summary: None,
        }
    }

    /// Progress in [0, 100]. An empty dataset that completed successfully
    /// reports 100.
    pub fn progress_percentage(&self) -> f64 {
        if self.total_records == 0 {
            if self.state == TaskState::Completed {
                100.0
            } else {
                0.0
            }
        } else {
            self.processed_records as f64 / self.total_records as f64 * 100.0
        }
    }
}

/// Cooperative cancellation flag threaded through the pipeline and checked
/// at defined checkpoints. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Concurrent map of task ids to statuses and cancellation tokens
#[derive(Default)]
pub struct TaskRegistry {
    tasks: DashMap<Uuid, ImportTask>,
    tokens: DashMap<Uuid, CancellationToken>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task, returning its cancellation token. Re-registering an
    /// id overwrites the previous status and issues a fresh token.
    pub fn register(&self, task: ImportTask) -> CancellationToken {
        let token = CancellationToken::new();
        self.tokens.insert(task.task_id, token.clone());
        self.tasks.insert(task.task_id, task);
        token
    }

    /// Snapshot of a task's status; None for unknown ids
    pub fn get(&self, task_id: &Uuid) -> Option<ImportTask> {
        self.tasks.get(task_id).map(|t| t.clone())
    }

    pub fn token(&self, task_id: &Uuid) -> Option<CancellationToken> {
        self.tokens.get(task_id).map(|t| t.clone())
    }

    /// Mutate a task's status under the map lock
    pub fn update(&self, task_id: &Uuid, f: impl FnOnce(&mut ImportTask)) {
        if let Some(mut task) = self.tasks.get_mut(task_id) {
            f(&mut task);
        }
    }

    /// Cancel a task. Returns false for unknown or already-terminal tasks;
    /// otherwise marks it cancelled, trips its token, and returns true.
    /// The running pipeline observes the token at its next checkpoint.
    pub fn cancel(&self, task_id: &Uuid) -> bool {
        let Some(mut task) = self.tasks.get_mut(task_id) else {
            return false;
        };
        if task.state.is_terminal() {
            return false;
        }
        info!("Cancelling task {}", task_id);
        task.state = TaskState::Cancelled;
        task.end_time = Some(Utc::now());
        task.result_summary = Some("cancelled by caller".to_string());
        drop(task);

        if let Some(token) = self.tokens.get(task_id) {
            token.cancel();
        }
        true
    }

    /// Drop terminal tasks whose end time is older than the retention
    /// window. Returns the number removed.
    pub fn cleanup(&self, retention: Duration) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(retention).unwrap_or_else(|_| chrono::Duration::zero());
        let expired: Vec<Uuid> = self
            .tasks
            .iter()
            .filter(|entry| {
                entry.state.is_terminal() && entry.end_time.is_some_and(|t| t < cutoff)
            })
            .map(|entry| entry.task_id)
            .collect();

        for id in &expired {
            self.tasks.remove(id);
            self.tokens.remove(id);
            debug!("Removed expired task {}", id);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
