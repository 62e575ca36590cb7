//! In-memory store used by tests and the CLI dry-run path
//!
//! Implements both store traits over a map of indexes, with scripted
//! failure injection so pipeline error paths (throttling retries, partial
//! batch failures) are exercisable without a real store.

use super::{BulkDoc, BulkItem, BulkResponse, StoreAdmin, StoreWriter};
use crate::error::{ImportError, ImportResult};
use crate::mapping::IndexConfig;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

#[derive(Debug, Default)]
struct IndexState {
    docs: Vec<BulkDoc>,
    optimize_calls: usize,
}

/// Thread-safe in-memory store with failure injection.
///
/// Scripted errors fail whole bulk requests (popped FIFO, one per write
/// attempt); `fail_every_nth_doc` fails individual documents while the
/// request as a whole succeeds.
#[derive(Default)]
pub struct InMemoryStore {
    indexes: Mutex<HashMap<String, IndexState>>,
    scripted_errors: Mutex<VecDeque<String>>,
    fail_every_nth_doc: Option<usize>,
    doc_counter: AtomicUsize,
    write_attempts: AtomicUsize,
    /// Artificial per-write delay, for cancellation-timing tests
    pub write_delay: Option<std::time::Duration>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue request-level errors; each bulk write attempt consumes one
    /// until the queue is empty. Throttling-shaped messages surface as
    /// capacity errors, anything else as write errors.
    pub fn with_scripted_errors(self, errors: Vec<&str>) -> Self {
        *self.scripted_errors.lock() = errors.into_iter().map(String::from).collect();
        self
    }

    /// Fail every nth document (1-based, counted across all writes)
    pub fn with_doc_failure_every(mut self, n: usize) -> Self {
        self.fail_every_nth_doc = Some(n.max(1));
        self
    }

    pub fn with_write_delay(mut self, delay: std::time::Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Number of bulk write attempts observed, retries included
    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::Relaxed)
    }

    pub fn doc_count(&self, index_name: &str) -> usize {
        self.indexes
            .lock()
            .get(index_name)
            .map(|s| s.docs.len())
            .unwrap_or(0)
    }

    pub fn optimize_calls(&self, index_name: &str) -> usize {
        self.indexes
            .lock()
            .get(index_name)
            .map(|s| s.optimize_calls)
            .unwrap_or(0)
    }

    /// Stored documents for an index, for test assertions
    pub fn documents(&self, index_name: &str) -> Vec<serde_json::Value> {
        self.indexes
            .lock()
            .get(index_name)
            .map(|s| s.docs.iter().map(|d| d.document.clone()).collect())
            .unwrap_or_default()
    }
}

impl StoreAdmin for InMemoryStore {
    fn create_index(&self, config: &IndexConfig) -> ImportResult<()> {
        let mut indexes = self.indexes.lock();
        if indexes.contains_key(&config.index_name) {
            return Err(ImportError::Validation(format!(
                "index '{}' already exists",
                config.index_name
            )));
        }
        debug!("Creating in-memory index '{}'", config.index_name);
        indexes.insert(config.index_name.clone(), IndexState::default());
        Ok(())
    }

    fn delete_index(&self, index_name: &str) -> ImportResult<()> {
        if self.indexes.lock().remove(index_name).is_none() {
            return Err(ImportError::NotFound(format!(
                "index '{}' does not exist",
                index_name
            )));
        }
        Ok(())
    }

    fn index_exists(&self, index_name: &str) -> ImportResult<bool> {
        Ok(self.indexes.lock().contains_key(index_name))
    }

    fn optimize_index(&self, index_name: &str) -> ImportResult<()> {
        let mut indexes = self.indexes.lock();
        match indexes.get_mut(index_name) {
            Some(state) => {
                state.optimize_calls += 1;
                Ok(())
            }
            None => Err(ImportError::NotFound(format!(
                "index '{}' does not exist",
                index_name
            ))),
        }
    }
}

impl StoreWriter for InMemoryStore {
    fn bulk_write(&self, index_name: &str, docs: &[BulkDoc]) -> ImportResult<BulkResponse> {
        self.write_attempts.fetch_add(1, Ordering::Relaxed);

        if let Some(delay) = self.write_delay {
            std::thread::sleep(delay);
        }

        if let Some(message) = self.scripted_errors.lock().pop_front() {
            return Err(super::classify_bulk_error(&message));
        }

        let mut indexes = self.indexes.lock();
        let state = indexes
            .get_mut(index_name)
            .ok_or_else(|| ImportError::NotFound(format!("index '{}' does not exist", index_name)))?;

        let mut items = Vec::with_capacity(docs.len());
        let mut any_error = false;
        for doc in docs {
            let seq = self.doc_counter.fetch_add(1, Ordering::Relaxed) + 1;
            let fails = self.fail_every_nth_doc.is_some_and(|n| seq % n == 0);
            if fails {
                any_error = true;
                items.push(BulkItem {
                    id: doc.id.clone(),
                    error: Some("simulated document rejection".to_string()),
                });
            } else {
                state.docs.push(doc.clone());
                items.push(BulkItem {
                    id: doc.id.clone(),
                    error: None,
                });
            }
        }

        Ok(BulkResponse {
            overall_error: any_error,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{IndexConfigGenerator, MappingOptions};
    use crate::schema::SchemaAnalyzer;
    use crate::config::AnalysisConfig;
    use serde_json::json;

    fn test_config(name: &str) -> IndexConfig {
        let records = vec![json!({"a": 1}).as_object().unwrap().clone()];
        let analysis = SchemaAnalyzer::new(AnalysisConfig::default()).analyze(&records);
        let mut config =
            IndexConfigGenerator::new(MappingOptions::default()).generate("t", &analysis);
        config.index_name = name.to_string();
        config
    }

    fn doc(id: &str) -> BulkDoc {
        BulkDoc {
            id: id.to_string(),
            document: json!({"id": id}),
        }
    }

    #[test]
    fn test_create_exists_delete() {
        let store = InMemoryStore::new();
        assert!(!store.index_exists("idx").unwrap());
        store.create_index(&test_config("idx")).unwrap();
        assert!(store.index_exists("idx").unwrap());
        store.delete_index("idx").unwrap();
        assert!(!store.index_exists("idx").unwrap());
        assert!(store.delete_index("idx").is_err());
    }

    #[test]
    fn test_scripted_error_consumed_per_attempt() {
        let store = InMemoryStore::new().with_scripted_errors(vec!["429 too_many_requests"]);
        store.create_index(&test_config("idx")).unwrap();

        let err = store.bulk_write("idx", &[doc("1")]).unwrap_err();
        assert!(err.is_retryable());

        // Queue exhausted: next attempt succeeds
        let response = store.bulk_write("idx", &[doc("1")]).unwrap();
        assert_eq!(response.success_count(), 1);
        assert_eq!(store.write_attempts(), 2);
    }

    #[test]
    fn test_doc_failure_injection() {
        let store = InMemoryStore::new().with_doc_failure_every(3);
        store.create_index(&test_config("idx")).unwrap();

        let docs: Vec<BulkDoc> = (1..=6).map(|i| doc(&i.to_string())).collect();
        let response = store.bulk_write("idx", &docs).unwrap();
        assert!(response.overall_error);
        assert_eq!(response.success_count(), 4);
        assert_eq!(response.failures().count(), 2);
        assert_eq!(store.doc_count("idx"), 4);
    }

    #[test]
    fn test_write_to_missing_index() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.bulk_write("nope", &[doc("1")]),
            Err(ImportError::NotFound(_))
        ));
    }
}
