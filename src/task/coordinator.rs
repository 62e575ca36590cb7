//! The task coordinator
//!
//! Drives one import end to end: analyze the staged data, generate and
//! provision the index configuration, bulk-load the records, optionally
//! optimize, and record the terminal state. Each task runs on its own
//! blocking worker; callers interact only through start/status/cancel.

use super::registry::{CancellationToken, ImportTask, TaskRegistry, TaskState};
use crate::config::EngineConfig;
use crate::embedding::VectorProvider;
use crate::error::{ImportError, ImportResult};
use crate::loader::{BulkLoader, LoadReport};
use crate::mapping::{IndexConfigGenerator, MappingOptions};
use crate::provision::IndexProvisioner;
use crate::schema::SchemaAnalyzer;
use crate::staging::StagedFile;
use crate::store::{StoreAdmin, StoreWriter};
use crate::types::ImportParams;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct TaskCoordinator {
    analyzer: SchemaAnalyzer,
    generator: IndexConfigGenerator,
    provisioner: IndexProvisioner,
    loader: BulkLoader,
    admin: Arc<dyn StoreAdmin>,
    registry: Arc<TaskRegistry>,
}

impl TaskCoordinator {
    /// Wire a coordinator from its collaborators. Vector mappings are only
    /// generated when the provider reports itself available.
    pub fn new(
        admin: Arc<dyn StoreAdmin>,
        writer: Arc<dyn StoreWriter>,
        vectors: Arc<dyn VectorProvider>,
        config: EngineConfig,
    ) -> Self {
        let options = MappingOptions {
            vector_dims: vectors.is_available().then(|| vectors.dimensions()),
            ..MappingOptions::default()
        };
        Self {
            analyzer: SchemaAnalyzer::new(config.analysis.clone()),
            generator: IndexConfigGenerator::new(options),
            provisioner: IndexProvisioner::new(admin.clone()),
            loader: BulkLoader::new(writer, vectors, config.bulk.clone()),
            admin,
            registry: Arc::new(TaskRegistry::new()),
        }
    }

    pub fn registry(&self) -> Arc<TaskRegistry> {
        self.registry.clone()
    }

    /// Start an import on a blocking worker and return the initial status.
    ///
    /// Must be called at most once per task id; re-calling with the same id
    /// overwrites the previous status.
    pub fn start(
        self: &Arc<Self>,
        space_id: &str,
        staged: StagedFile,
        params: ImportParams,
    ) -> ImportTask {
        let task = self.register(space_id, &params);
        let coordinator = self.clone();
        let task_id = task.task_id;
        let space = space_id.to_string();
        tokio::task::spawn_blocking(move || {
            coordinator.run(task_id, &space, staged, &params);
        });
        task
    }

    /// Run an import synchronously and return the terminal status.
    pub fn start_blocking(
        &self,
        space_id: &str,
        staged: StagedFile,
        params: ImportParams,
    ) -> ImportTask {
        let task = self.register(space_id, &params);
        self.run(task.task_id, space_id, staged, &params);
        self.registry.get(&task.task_id).unwrap_or(task)
    }

    /// Status snapshot; None for unknown ids
    pub fn status(&self, task_id: &Uuid) -> Option<ImportTask> {
        self.registry.get(task_id)
    }

    /// Cancel a task. False for unknown or terminal ids. The running
    /// pipeline observes the cancellation at its next checkpoint.
    pub fn cancel(&self, task_id: &Uuid) -> bool {
        self.registry.cancel(task_id)
    }

    fn register(&self, space_id: &str, params: &ImportParams) -> ImportTask {
        let task = ImportTask::new(params.task_id, space_id);
        self.registry.register(task.clone());
        task
    }

    fn run(&self, task_id: Uuid, space_id: &str, staged: StagedFile, params: &ImportParams) {
        let token = self.registry.token(&task_id).unwrap_or_default();
        let outcome = self.execute(task_id, space_id, &staged, params, &token);
        self.finish(task_id, outcome);
        // staged drops here, removing the temporary input on every outcome
    }

    fn execute(
        &self,
        task_id: Uuid,
        space_id: &str,
        staged: &StagedFile,
        params: &ImportParams,
        token: &CancellationToken,
    ) -> ImportResult<LoadReport> {
        self.set_state(task_id, TaskState::AnalyzingData);
        let records = staged.read_records()?;
        let batch_size = params.batch_size.max(1);
        self.registry.update(&task_id, |t| {
            t.total_records = records.len();
            t.total_batches = records.len().div_ceil(batch_size);
        });

        let analysis = self.analyzer.analyze(&records);
        if !analysis.report.ready_for_import && !records.is_empty() {
            warn!(
                "Space '{}' dataset looks problematic ({} anomalies), importing anyway",
                space_id,
                analysis.report.anomalies.len()
            );
        }
        self.checkpoint(token)?;

        self.set_state(task_id, TaskState::CreatingIndex);
        let index_config = self.generator.generate(space_id, &analysis);
        self.provisioner.apply(&index_config, params.mode)?;
        self.checkpoint(token)?;

        self.set_state(task_id, TaskState::ProcessingData);
        let registry = self.registry.clone();
        let report = self.loader.load(
            &index_config,
            space_id,
            &records,
            params,
            token,
            &mut |progress| {
                registry.update(&task_id, |t| {
                    t.processed_records = progress.processed_records;
                    t.success_count = progress.success_count;
                    t.error_count = progress.error_count;
                    t.current_batch = progress.current_batch;
                    t.error_details = progress.error_details.clone();
                });
            },
        )?;

        if params.optimize_index {
            self.set_state(task_id, TaskState::OptimizingIndex);
            // Best effort: a failed optimize never fails the import
            if let Err(e) = self.admin.optimize_index(&index_config.index_name) {
                warn!(
                    "Optimize of '{}' failed after load: {}",
                    index_config.index_name, e
                );
            }
        }

        Ok(report)
    }

    fn checkpoint(&self, token: &CancellationToken) -> ImportResult<()> {
        if token.is_cancelled() {
            Err(ImportError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Advance a non-terminal task to the next stage. A concurrently
    /// cancelled task keeps its terminal state.
    fn set_state(&self, task_id: Uuid, state: TaskState) {
        self.registry.update(&task_id, |t| {
            if !t.state.is_terminal() {
                t.state = state;
            }
        });
    }

    fn finish(&self, task_id: Uuid, outcome: ImportResult<LoadReport>) {
        match outcome {
            Ok(report) => self.registry.update(&task_id, |t| {
                // Cancellation observed elsewhere wins over completion
                if t.state.is_terminal() {
                    return;
                }
                t.state = TaskState::Completed;
                t.end_time = Some(Utc::now());
                let duration = t
                    .end_time
                    .map(|end| (end - t.start_time).num_milliseconds() as f64 / 1000.0)
                    .unwrap_or(0.0);
                t.result_summary = Some(format!(
                    "imported {} of {} records ({} failed) in {:.1}s",
                    report.success_count, report.total_records, report.error_count, duration
                ));
                info!("Task {} completed: {}", task_id, t.result_summary.as_deref().unwrap_or(""));
            }),
            Err(ImportError::Cancelled) => self.registry.update(&task_id, |t| {
                t.state = TaskState::Cancelled;
                if t.end_time.is_none() {
                    t.end_time = Some(Utc::now());
                }
                if t.result_summary.is_none() {
                    t.result_summary = Some("cancelled by caller".to_string());
                }
                info!("Task {} cancelled", task_id);
            }),
            Err(e) => self.registry.update(&task_id, |t| {
                // A cancellation that raced the failure takes priority
                if t.state == TaskState::Cancelled {
                    return;
                }
                t.state = TaskState::Failed;
                t.end_time = Some(Utc::now());
                t.result_summary = Some(e.to_string());
                error!("Task {} failed: {}", task_id, e);
            }),
        }
    }
}
