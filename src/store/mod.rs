//! Store collaborator interfaces
//!
//! The import pipeline talks to the document store through two narrow
//! traits: [`StoreAdmin`] for index lifecycle and [`StoreWriter`] for bulk
//! document writes. Production code wires a real store client; tests and
//! the CLI's dry-run path use [`InMemoryStore`].

mod memory;

pub use memory::InMemoryStore;

use crate::error::{ImportError, ImportResult};
use crate::mapping::IndexConfig;
use serde_json::Value;

/// Store error fragments that indicate transient capacity pressure.
/// Writes failing with one of these are worth retrying; anything else is
/// treated as a hard failure.
const THROTTLING_SIGNATURES: &[&str] = &[
    "429",
    "too_many_requests",
    "circuit_breaking_exception",
    "rejected_execution",
    "request_entity_too_large",
    "throttl",
];

/// Whether a store error message matches a known throttling signature
pub fn is_throttling_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    THROTTLING_SIGNATURES.iter().any(|sig| lower.contains(sig))
}

/// Classify a bulk-request-level store error into the import taxonomy
pub fn classify_bulk_error(message: &str) -> ImportError {
    if is_throttling_error(message) {
        ImportError::StoreCapacity(message.to_string())
    } else {
        ImportError::StoreWrite(message.to_string())
    }
}

/// One document in a bulk write request
#[derive(Debug, Clone)]
pub struct BulkDoc {
    pub id: String,
    pub document: Value,
}

/// Per-document outcome of a bulk write
#[derive(Debug, Clone)]
pub struct BulkItem {
    pub id: String,
    /// None on success, the store's error text on failure
    pub error: Option<String>,
}

impl BulkItem {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of one bulk write
#[derive(Debug, Clone, Default)]
pub struct BulkResponse {
    /// True when any item in the request failed
    pub overall_error: bool,
    pub items: Vec<BulkItem>,
}

impl BulkResponse {
    pub fn success_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &BulkItem> {
        self.items.iter().filter(|i| !i.is_ok())
    }
}

/// Index lifecycle operations
pub trait StoreAdmin: Send + Sync {
    fn create_index(&self, config: &IndexConfig) -> ImportResult<()>;
    fn delete_index(&self, index_name: &str) -> ImportResult<()>;
    fn index_exists(&self, index_name: &str) -> ImportResult<bool>;
    /// Best-effort segment optimization after a bulk load
    fn optimize_index(&self, index_name: &str) -> ImportResult<()>;
}

/// Bulk document writes
pub trait StoreWriter: Send + Sync {
    fn bulk_write(&self, index_name: &str, docs: &[BulkDoc]) -> ImportResult<BulkResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttling_signatures() {
        assert!(is_throttling_error("HTTP 429 Too Many Requests"));
        assert!(is_throttling_error("circuit_breaking_exception: data too large"));
        assert!(is_throttling_error("es_rejected_execution_exception"));
        assert!(is_throttling_error("request throttled by server"));
        assert!(!is_throttling_error("mapper_parsing_exception"));
        assert!(!is_throttling_error("index_not_found_exception"));
    }

    #[test]
    fn test_classify_bulk_error() {
        assert!(matches!(
            classify_bulk_error("429 slow down"),
            ImportError::StoreCapacity(_)
        ));
        assert!(matches!(
            classify_bulk_error("mapper_parsing_exception"),
            ImportError::StoreWrite(_)
        ));
    }

    #[test]
    fn test_bulk_response_counts() {
        let response = BulkResponse {
            overall_error: true,
            items: vec![
                BulkItem { id: "1".into(), error: None },
                BulkItem { id: "2".into(), error: Some("boom".into()) },
                BulkItem { id: "3".into(), error: None },
            ],
        };
        assert_eq!(response.success_count(), 2);
        assert_eq!(response.failures().count(), 1);
    }
}
