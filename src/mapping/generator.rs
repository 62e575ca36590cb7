//! Schema-to-index configuration generation

use super::field::{FieldMapping, StorageType};
use crate::schema::{is_id_like_name, FieldType, SchemaAnalysis};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Space-id system field, keyword
pub const SYSTEM_FIELD_SPACE_ID: &str = "_space_id";
/// Per-document UUID system field, keyword
pub const SYSTEM_FIELD_DOC_ID: &str = "_doc_id";
/// Import timestamp system field, strict date
pub const SYSTEM_FIELD_IMPORTED_AT: &str = "_imported_at";
/// Schema version system field, integer
pub const SYSTEM_FIELD_SCHEMA_VERSION: &str = "_schema_version";

/// Version stamped into every imported document
pub const SCHEMA_VERSION: i64 = 1;

/// Input formats accepted by generated date fields
const DATE_INPUT_FORMATS: &str =
    "yyyy-MM-dd HH:mm:ss||yyyy-MM-dd||yyyy/MM/dd||strict_date_optional_time||epoch_millis";

const PINYIN_FULL_ANALYZER: &str = "pinyin_full_analyzer";
const PINYIN_SEARCH_ANALYZER: &str = "pinyin_search_analyzer";
const PINYIN_INITIALS_ANALYZER: &str = "pinyin_initials_analyzer";

/// Shard count as a step function of the dataset size
pub fn shard_count_for(total_records: usize) -> u32 {
    if total_records < 10_000 {
        1
    } else if total_records < 100_000 {
        2
    } else if total_records < 1_000_000 {
        3
    } else {
        5
    }
}

/// Index-level shard and refresh settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardSettings {
    pub shards: u32,
    pub replicas: u32,
    /// Kept short so imported documents become searchable quickly
    pub refresh_interval: String,
}

impl Default for ShardSettings {
    fn default() -> Self {
        Self {
            shards: 1,
            replicas: 1,
            refresh_interval: "1s".to_string(),
        }
    }
}

/// Complete generated index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub index_name: String,
    pub settings: ShardSettings,
    /// Per-field mappings, system fields included
    pub field_mappings: BTreeMap<String, FieldMapping>,
    /// Custom analyzer definitions referenced by the mappings
    pub analyzer_definitions: Map<String, Value>,
    pub aliases: Vec<String>,
}

impl IndexConfig {
    /// Structural validation. Never errors: returns false for an unusable
    /// configuration (empty name or mappings, shard count outside [1, 10]).
    pub fn validate(&self) -> bool {
        if self.index_name.trim().is_empty() {
            return false;
        }
        if self.field_mappings.is_empty() {
            return false;
        }
        (1..=10).contains(&self.settings.shards)
    }

    /// Fields that should receive a companion `<field>_vector` embedding,
    /// derived from the generated vector mappings.
    pub fn vector_source_fields(&self) -> Vec<String> {
        self.field_mappings
            .keys()
            .filter_map(|name| name.strip_suffix("_vector"))
            .filter(|base| self.field_mappings.contains_key(*base))
            .map(|base| base.to_string())
            .collect()
    }

    /// Serialize settings and mappings to the store's wire format
    pub fn to_wire(&self) -> Value {
        let mappings: Map<String, Value> = self
            .field_mappings
            .iter()
            .map(|(name, mapping)| (name.clone(), mapping.to_wire()))
            .collect();
        let mut settings = json!({
            "number_of_shards": self.settings.shards,
            "number_of_replicas": self.settings.replicas,
            "refresh_interval": self.settings.refresh_interval,
        });
        if !self.analyzer_definitions.is_empty() {
            settings["analysis"] = json!({ "analyzer": self.analyzer_definitions });
        }
        json!({
            "settings": settings,
            "mappings": { "properties": mappings },
            "aliases": self.aliases,
        })
    }
}

/// Tunables for mapping generation
#[derive(Debug, Clone)]
pub struct MappingOptions {
    /// Minimum chinese_ratio before a text field gets pinyin subfields
    pub pinyin_ratio_threshold: f64,
    /// Minimum importance before a pinyin field also gets an initials subfield
    pub initials_importance_min: u8,
    /// Length guard on keyword subfields
    pub keyword_ignore_above: u32,
    /// When set, high-value text fields get a `<field>_vector` mapping
    pub vector_dims: Option<usize>,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            pinyin_ratio_threshold: 0.2,
            initials_importance_min: 70,
            keyword_ignore_above: 256,
            vector_dims: None,
        }
    }
}

/// Generates a concrete [`IndexConfig`] from a schema analysis
pub struct IndexConfigGenerator {
    options: MappingOptions,
}

impl Default for IndexConfigGenerator {
    fn default() -> Self {
        Self::new(MappingOptions::default())
    }
}

impl IndexConfigGenerator {
    pub fn new(options: MappingOptions) -> Self {
        Self { options }
    }

    /// Generate the index configuration for a space from its analysis
    pub fn generate(&self, space_id: &str, analysis: &SchemaAnalysis) -> IndexConfig {
        let mut field_mappings = BTreeMap::new();
        let mut needs_pinyin = false;

        for field in analysis.fields.values() {
            let mapping = self.map_field(field, &mut needs_pinyin);
            field_mappings.insert(field.field_name.clone(), mapping);

            if self.wants_vector(field) {
                if let Some(dims) = self.options.vector_dims {
                    field_mappings.insert(
                        format!("{}_vector", field.field_name),
                        FieldMapping::new(StorageType::Vector { dims }),
                    );
                }
            }
        }

        // System fields last so they win over colliding dataset fields
        field_mappings.insert(
            SYSTEM_FIELD_SPACE_ID.to_string(),
            FieldMapping::new(StorageType::Keyword),
        );
        field_mappings.insert(
            SYSTEM_FIELD_DOC_ID.to_string(),
            FieldMapping::new(StorageType::Keyword),
        );
        field_mappings.insert(
            SYSTEM_FIELD_IMPORTED_AT.to_string(),
            FieldMapping::new(StorageType::Date).with_formats("strict_date_optional_time"),
        );
        field_mappings.insert(
            SYSTEM_FIELD_SCHEMA_VERSION.to_string(),
            FieldMapping::new(StorageType::Long),
        );

        let settings = ShardSettings {
            shards: shard_count_for(analysis.total_records),
            ..ShardSettings::default()
        };

        debug!(
            "Generated {} field mappings for space '{}' ({} shards)",
            field_mappings.len(),
            space_id,
            settings.shards
        );

        IndexConfig {
            index_name: index_name_for(space_id),
            settings,
            field_mappings,
            analyzer_definitions: if needs_pinyin {
                pinyin_analyzer_definitions()
            } else {
                Map::new()
            },
            aliases: vec![space_id.to_string()],
        }
    }

    fn map_field(
        &self,
        field: &crate::schema::FieldAnalysis,
        needs_pinyin: &mut bool,
    ) -> FieldMapping {
        // Id-like fields store exact-match regardless of inferred type
        if field.suggest_as_id || is_id_like_name(&field.field_name) {
            return FieldMapping::new(StorageType::Keyword)
                .with_ignore_above(self.options.keyword_ignore_above);
        }

        match field.inferred_type {
            FieldType::Integer => FieldMapping::new(StorageType::Long).with_ignore_malformed(),
            FieldType::Float => FieldMapping::new(StorageType::Double).with_ignore_malformed(),
            FieldType::Boolean => FieldMapping::new(StorageType::Boolean),
            FieldType::Date => FieldMapping::new(StorageType::Date)
                .with_formats(DATE_INPUT_FORMATS)
                .with_ignore_malformed(),
            FieldType::String | FieldType::Email | FieldType::Url | FieldType::Unknown => {
                self.map_text_field(field, needs_pinyin)
            }
        }
    }

    fn map_text_field(
        &self,
        field: &crate::schema::FieldAnalysis,
        needs_pinyin: &mut bool,
    ) -> FieldMapping {
        let mut mapping = FieldMapping::new(StorageType::Text)
            .with_analyzer("standard")
            .with_subfield(
                "keyword",
                FieldMapping::new(StorageType::Keyword)
                    .with_ignore_above(self.options.keyword_ignore_above),
            );

        if self.wants_pinyin(field) {
            *needs_pinyin = true;
            mapping = mapping.with_subfield(
                "pinyin",
                FieldMapping::new(StorageType::Text)
                    .with_analyzer(PINYIN_FULL_ANALYZER)
                    .with_search_analyzer(PINYIN_SEARCH_ANALYZER),
            );
            if field.importance >= self.options.initials_importance_min {
                mapping = mapping.with_subfield(
                    "initials",
                    FieldMapping::new(StorageType::Text).with_analyzer(PINYIN_INITIALS_ANALYZER),
                );
            }
        }

        mapping
    }

    fn wants_pinyin(&self, field: &crate::schema::FieldAnalysis) -> bool {
        field.has_chinese_content
            && (field.chinese_ratio >= self.options.pinyin_ratio_threshold
                || is_content_like_name(&field.field_name))
    }

    fn wants_vector(&self, field: &crate::schema::FieldAnalysis) -> bool {
        matches!(
            field.inferred_type,
            FieldType::String | FieldType::Email | FieldType::Url
        ) && !field.suggest_as_id
            && !is_id_like_name(&field.field_name)
            && (is_content_like_name(&field.field_name)
                || field.importance >= self.options.initials_importance_min)
    }
}

fn index_name_for(space_id: &str) -> String {
    format!("space_{}", space_id.to_lowercase())
}

/// Whether a field name suggests free-form content worth phonetic search
fn is_content_like_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    ["title", "name", "content", "description", "summary"]
        .iter()
        .any(|hint| lower.contains(hint))
}

fn pinyin_analyzer_definitions() -> Map<String, Value> {
    let mut definitions = Map::new();
    definitions.insert(
        PINYIN_FULL_ANALYZER.to_string(),
        json!({
            "tokenizer": "standard",
            "filter": ["lowercase", "pinyin_full"],
        }),
    );
    definitions.insert(
        PINYIN_SEARCH_ANALYZER.to_string(),
        json!({
            "tokenizer": "standard",
            "filter": ["lowercase"],
        }),
    );
    definitions.insert(
        PINYIN_INITIALS_ANALYZER.to_string(),
        json!({
            "tokenizer": "standard",
            "filter": ["lowercase", "pinyin_initials"],
        }),
    );
    definitions
}
