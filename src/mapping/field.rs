//! Storage-level field mapping types
//!
//! [`StorageType`] is an exhaustively-matched tagged union over the storage
//! kinds the store understands; both configuration generation and wire
//! serialization branch on it, so adding a kind forces both sites to be
//! updated.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Storage kind a field maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    /// Analyzed full-text field
    Text,
    /// Exact-match, unanalyzed field
    Keyword,
    /// 64-bit integer
    Long,
    /// 64-bit float
    Double,
    Boolean,
    Date,
    /// Nested structure stored opaquely
    Object,
    /// Dense embedding vector
    Vector { dims: usize },
}

impl StorageType {
    /// Wire name of this storage kind
    pub fn wire_name(self) -> &'static str {
        match self {
            StorageType::Text => "text",
            StorageType::Keyword => "keyword",
            StorageType::Long => "long",
            StorageType::Double => "double",
            StorageType::Boolean => "boolean",
            StorageType::Date => "date",
            StorageType::Object => "object",
            StorageType::Vector { .. } => "dense_vector",
        }
    }
}

/// Mapping of one field (or subfield) to its storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub storage_type: StorageType,
    /// Index-time analyzer, text fields only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    /// Query-time analyzer, when it differs from the index-time one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_analyzer: Option<String>,
    /// Accepted input formats, date fields only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formats: Option<String>,
    /// Coerce instead of rejecting malformed values
    #[serde(default)]
    pub ignore_malformed: bool,
    /// Keyword length guard
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_above: Option<u32>,
    /// Named subfields (keyword / pinyin variants)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subfields: BTreeMap<String, FieldMapping>,
}

impl FieldMapping {
    pub fn new(storage_type: StorageType) -> Self {
        Self {
            storage_type,
            analyzer: None,
            search_analyzer: None,
            formats: None,
            ignore_malformed: false,
            ignore_above: None,
            subfields: BTreeMap::new(),
        }
    }

    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    pub fn with_search_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.search_analyzer = Some(analyzer.into());
        self
    }

    pub fn with_formats(mut self, formats: impl Into<String>) -> Self {
        self.formats = Some(formats.into());
        self
    }

    pub fn with_ignore_malformed(mut self) -> Self {
        self.ignore_malformed = true;
        self
    }

    pub fn with_ignore_above(mut self, limit: u32) -> Self {
        self.ignore_above = Some(limit);
        self
    }

    pub fn with_subfield(mut self, name: impl Into<String>, mapping: FieldMapping) -> Self {
        self.subfields.insert(name.into(), mapping);
        self
    }

    /// Serialize to the store's wire mapping format.
    ///
    /// The match over [`StorageType`] is deliberately exhaustive so a new
    /// storage kind cannot silently serialize wrong.
    pub fn to_wire(&self) -> Value {
        let mut wire = Map::new();
        wire.insert("type".to_string(), json!(self.storage_type.wire_name()));

        match self.storage_type {
            StorageType::Text => {
                if let Some(analyzer) = &self.analyzer {
                    wire.insert("analyzer".to_string(), json!(analyzer));
                }
                if let Some(search) = &self.search_analyzer {
                    wire.insert("search_analyzer".to_string(), json!(search));
                }
            }
            StorageType::Keyword => {
                if let Some(limit) = self.ignore_above {
                    wire.insert("ignore_above".to_string(), json!(limit));
                }
            }
            StorageType::Long | StorageType::Double => {
                if self.ignore_malformed {
                    wire.insert("ignore_malformed".to_string(), json!(true));
                }
            }
            StorageType::Date => {
                if let Some(formats) = &self.formats {
                    wire.insert("format".to_string(), json!(formats));
                }
                if self.ignore_malformed {
                    wire.insert("ignore_malformed".to_string(), json!(true));
                }
            }
            StorageType::Boolean => {}
            StorageType::Object => {
                wire.insert("enabled".to_string(), json!(true));
            }
            StorageType::Vector { dims } => {
                wire.insert("dims".to_string(), json!(dims));
            }
        }

        if !self.subfields.is_empty() {
            let fields: Map<String, Value> = self
                .subfields
                .iter()
                .map(|(name, sub)| (name.clone(), sub.to_wire()))
                .collect();
            wire.insert("fields".to_string(), Value::Object(fields));
        }

        Value::Object(wire)
    }
}
