//! Analysis result types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inferred logical type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    Email,
    Url,
    Unknown,
}

impl FieldType {
    /// Tie-break precedence used when candidate types score equally.
    ///
    /// The ordering is a documented design choice: more specific types win
    /// over the types they are parseable as (every date string is also a
    /// string, every integer also parses as a float).
    pub fn precedence(self) -> u8 {
        match self {
            FieldType::Date => 0,
            FieldType::Email => 1,
            FieldType::Url => 2,
            FieldType::Boolean => 3,
            FieldType::Integer => 4,
            FieldType::Float => 5,
            FieldType::String => 6,
            FieldType::Unknown => 7,
        }
    }
}

/// Statistics computed over the full (unsampled) value set of a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FieldStatistics {
    /// Total number of records in the dataset
    pub total_count: usize,
    /// Number of records with a non-null value for this field
    pub non_null_count: usize,
    /// 1 - non_null_count / total_count
    pub null_ratio: f64,
    /// Number of distinct non-null values
    pub unique_count: usize,
    /// unique_count / non_null_count (0 when the field is all-null)
    pub unique_ratio: f64,
    /// Blended quality score in [0, 1]
    pub quality_score: f64,
    /// Whether numeric values fall outside mean +/- 3 standard deviations
    pub has_outliers: bool,
}

/// Per-field analysis result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldAnalysis {
    pub field_name: String,
    pub inferred_type: FieldType,
    /// Share of sampled values matching the inferred type, in [0, 1]
    pub confidence: f64,
    pub stats: FieldStatistics,
    /// A few representative values for display
    pub sample_values: Vec<String>,
    /// Human-readable problems found during analysis
    pub issues: Vec<String>,
    /// Whether this field is a good primary-id candidate
    pub suggest_as_id: bool,
    /// Whether this field should be indexed for querying
    pub suggest_index: bool,
    /// Heuristic importance score in [0, 100]
    pub importance: u8,
    /// Whether any non-null value contains CJK codepoints
    pub has_chinese_content: bool,
    /// Fraction of non-null values containing at least one CJK codepoint
    pub chinese_ratio: f64,
}

impl FieldAnalysis {
    /// Fallback analysis used when a field's analysis fails; carries the
    /// failure as an issue instead of aborting the whole dataset analysis.
    pub fn unknown(field_name: impl Into<String>, issue: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            inferred_type: FieldType::Unknown,
            confidence: 0.0,
            stats: FieldStatistics::default(),
            sample_values: Vec::new(),
            issues: vec![issue.into()],
            suggest_as_id: false,
            suggest_index: false,
            importance: 0,
            has_chinese_content: false,
            chinese_ratio: 0.0,
        }
    }
}

/// Dataset-level readiness report
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConsistencyReport {
    /// Average non-null ratio across fields, in [0, 1]
    pub completeness_score: f64,
    /// Average type-inference confidence across fields, in [0, 1]
    pub consistency_score: f64,
    /// Fields or patterns that look problematic
    pub anomalies: Vec<String>,
    /// Suggested actions before importing
    pub recommendations: Vec<String>,
    /// Whether the dataset looks safe to import as-is
    pub ready_for_import: bool,
}

/// Full analysis of a staged dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaAnalysis {
    pub total_records: usize,
    pub total_fields: usize,
    /// Per-field analyses, keyed by field name
    pub fields: BTreeMap<String, FieldAnalysis>,
    /// Average per-field quality score, in [0, 1]
    pub overall_quality_score: f64,
    /// Best primary-id candidate, if any field qualifies
    pub recommended_id_field: Option<String>,
    /// Index-worthy fields, ordered by importance descending
    pub recommended_index_fields: Vec<String>,
    pub report: ConsistencyReport,
    /// Dataset fingerprint; identical datasets produce identical values
    pub fingerprint: u64,
}

impl SchemaAnalysis {
    /// Well-formed all-zero analysis for an empty dataset
    pub fn empty() -> Self {
        Self {
            total_records: 0,
            total_fields: 0,
            fields: BTreeMap::new(),
            overall_quality_score: 0.0,
            recommended_id_field: None,
            recommended_index_fields: Vec::new(),
            report: ConsistencyReport::default(),
            fingerprint: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_ordering() {
        assert!(FieldType::Date.precedence() < FieldType::Email.precedence());
        assert!(FieldType::Email.precedence() < FieldType::Url.precedence());
        assert!(FieldType::Url.precedence() < FieldType::Boolean.precedence());
        assert!(FieldType::Boolean.precedence() < FieldType::Integer.precedence());
        assert!(FieldType::Integer.precedence() < FieldType::Float.precedence());
        assert!(FieldType::Float.precedence() < FieldType::String.precedence());
        assert!(FieldType::String.precedence() < FieldType::Unknown.precedence());
    }

    #[test]
    fn test_empty_analysis_is_all_zero() {
        let analysis = SchemaAnalysis::empty();
        assert_eq!(analysis.total_records, 0);
        assert_eq!(analysis.total_fields, 0);
        assert!(analysis.fields.is_empty());
        assert!(analysis.recommended_id_field.is_none());
        assert!(!analysis.report.ready_for_import);
    }

    #[test]
    fn test_unknown_fallback_carries_issue() {
        let fa = FieldAnalysis::unknown("weird", "analysis failed: nested array");
        assert_eq!(fa.inferred_type, FieldType::Unknown);
        assert_eq!(fa.issues.len(), 1);
        assert!(!fa.suggest_index);
    }

    #[test]
    fn test_field_type_serde_uppercase() {
        assert_eq!(serde_json::to_string(&FieldType::Date).unwrap(), "\"DATE\"");
        assert_eq!(serde_json::to_string(&FieldType::Unknown).unwrap(), "\"UNKNOWN\"");
    }
}
