//! Schema analysis for staged JSON datasets
//!
//! Infers per-field types and statistics from sampled records and derives
//! indexing recommendations (id field, index-worthy fields, CJK phonetic
//! search candidates) used by the mapping generator.

mod analyzer;
mod inference;
mod types;

pub use analyzer::{is_id_like_name, SchemaAnalyzer};
pub use inference::{classify_value, contains_cjk, infer_type, TypeInference};
pub use types::{
    ConsistencyReport, FieldAnalysis, FieldStatistics, FieldType, SchemaAnalysis,
};
