//! jindex — bulk JSON ingestion into a document-search space
//!
//! The pipeline stages staged JSON input through schema analysis
//! ([`schema::SchemaAnalyzer`]), storage-schema generation
//! ([`mapping::IndexConfigGenerator`]), index provisioning
//! ([`provision::IndexProvisioner`]), and resilient bulk loading
//! ([`loader::BulkLoader`]), orchestrated by a cancellable task state
//! machine ([`task::TaskCoordinator`]).

pub mod config;
pub mod embedding;
pub mod error;
pub mod loader;
pub mod mapping;
pub mod provision;
pub mod schema;
pub mod staging;
pub mod store;
pub mod task;
pub mod types;

pub use config::EngineConfig;
pub use error::{ImportError, ImportResult};
pub use task::{ImportTask, TaskCoordinator, TaskState};
pub use types::{ErrorStrategy, ImportMode, ImportParams};
