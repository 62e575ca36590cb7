//! Index configuration generation
//!
//! Turns a [`SchemaAnalysis`](crate::schema::SchemaAnalysis) into a concrete
//! storage schema: shard settings, per-field mappings (with keyword and
//! pinyin subfields where warranted), analyzer definitions, and the system
//! fields every imported document carries.

mod field;
mod generator;

pub use field::{FieldMapping, StorageType};
pub use generator::{
    shard_count_for, IndexConfig, IndexConfigGenerator, MappingOptions, ShardSettings,
    SCHEMA_VERSION, SYSTEM_FIELD_DOC_ID, SYSTEM_FIELD_IMPORTED_AT, SYSTEM_FIELD_SCHEMA_VERSION,
    SYSTEM_FIELD_SPACE_ID,
};
