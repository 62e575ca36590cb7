//! Core types shared across the import pipeline

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A flat JSON record from the staged dataset
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Logical search-space identifier documents are loaded into
pub type SpaceId = String;

/// How an import interacts with an existing index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Reuse the existing index, creating it only if missing
    #[default]
    Append,
    /// Delete and recreate the index before loading
    Replace,
}

/// What to do when individual documents fail to write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStrategy {
    /// Abort the whole import at the first batch containing any failure
    #[default]
    StopOnError,
    /// Continue past failed documents, recording error summaries
    SkipError,
}

/// Parameters for starting an import task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportParams {
    /// Task identifier; generated when the caller does not supply one
    pub task_id: Uuid,
    /// Append to or replace the target index
    pub mode: ImportMode,
    /// Requested outer batch size; the loader may sub-chunk further
    pub batch_size: usize,
    /// Per-document failure handling
    pub error_strategy: ErrorStrategy,
    /// Run a best-effort index optimize after loading
    pub optimize_index: bool,
}

impl Default for ImportParams {
    fn default() -> Self {
        Self {
            task_id: Uuid::new_v4(),
            mode: ImportMode::Append,
            batch_size: 1000,
            error_strategy: ErrorStrategy::StopOnError,
            optimize_index: false,
        }
    }
}

impl ImportParams {
    /// Create parameters with a fresh task id and the given batch size
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            batch_size,
            ..Self::default()
        }
    }
}
