//! Staged input parsing and cleanup
//!
//! Accepts three staged JSON shapes: a top-level array of flat objects, an
//! object whose first array-valued property holds the records, or a bare
//! object treated as a one-record dataset. Anything else is a format error.
//!
//! [`StagedFile`] owns the temporary file backing an import and removes it
//! when dropped, so cleanup runs on every pipeline outcome.

use crate::error::{ImportError, ImportResult};
use crate::types::Record;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Parse staged JSON text into a record list
pub fn parse_records(raw: &str) -> ImportResult<Vec<Record>> {
    let value: Value = serde_json::from_str(raw)?;
    records_from_value(value)
}

fn records_from_value(value: Value) -> ImportResult<Vec<Record>> {
    match value {
        Value::Array(items) => collect_records(items),
        Value::Object(map) => {
            // First array-valued property wins; a bare object becomes a
            // one-record dataset
            let array_prop = map
                .iter()
                .find(|(_, v)| v.is_array())
                .map(|(k, _)| k.clone());
            match array_prop {
                Some(key) => {
                    debug!("Using array property '{}' as the record list", key);
                    let mut map = map;
                    let Some(Value::Array(items)) = map.remove(&key) else {
                        unreachable!("property '{key}' was array-valued");
                    };
                    collect_records(items)
                }
                None => Ok(vec![map]),
            }
        }
        other => Err(ImportError::Validation(format!(
            "staged input must be a JSON array or object, got {}",
            json_kind(&other)
        ))),
    }
}

fn collect_records(items: Vec<Value>) -> ImportResult<Vec<Record>> {
    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(map) => records.push(map),
            other => {
                return Err(ImportError::Validation(format!(
                    "record {} is not an object, got {}",
                    i,
                    json_kind(&other)
                )))
            }
        }
    }
    Ok(records)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A staged temporary input file, removed on drop.
///
/// Removal failure is logged and swallowed: cleanup must never mask the
/// pipeline outcome it runs after.
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the staged records
    pub fn read_records(&self) -> ImportResult<Vec<Record>> {
        if !self.path.exists() {
            return Err(ImportError::NotFound(format!(
                "staged file '{}' does not exist",
                self.path.display()
            )));
        }
        let raw = std::fs::read_to_string(&self.path)?;
        parse_records(&raw)
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed staged file '{}'", self.path.display()),
            Err(e) => warn!(
                "Failed to remove staged file '{}': {}",
                self.path.display(),
                e
            ),
        }
    }
}
