//! Bulk loading
//!
//! Writes staged records into the provisioned index: adaptive sub-chunking
//! against the payload ceiling, system-field and vector augmentation,
//! retry with backoff on throttling, per-batch progress reporting, and
//! cooperative cancellation checkpoints.

mod chunker;
#[allow(clippy::module_inception)]
mod loader;

pub use chunker::{estimate_payload_bytes, estimate_record_bytes, sub_chunk_size};
pub use loader::{BulkLoader, LoadReport};
