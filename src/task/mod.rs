//! Import task orchestration
//!
//! [`TaskRegistry`] is the process-wide map of task ids to statuses, safe
//! for unsynchronized concurrent callers. [`TaskCoordinator`] drives the
//! pipeline state machine and exposes start/status/cancel.

mod coordinator;
mod registry;

pub use coordinator::TaskCoordinator;
pub use registry::{CancellationToken, ImportTask, TaskRegistry, TaskState};
