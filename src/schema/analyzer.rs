//! Schema analyzer
//!
//! Computes per-field type inference, statistics, and indexing
//! recommendations for a staged dataset. Type inference runs over a
//! deterministic leading sample; statistics always cover the full value
//! set. Results for identical datasets are served from a fingerprint
//! cache.

use super::inference::{contains_cjk, infer_type};
use super::types::{
    ConsistencyReport, FieldAnalysis, FieldStatistics, FieldType, SchemaAnalysis,
};
use crate::config::AnalysisConfig;
use crate::types::Record;
use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::num::NonZeroUsize;
use tracing::{debug, warn};
use xxhash_rust::xxh3::Xxh3;

/// Number of leading records hashed into the dataset fingerprint
const FINGERPRINT_RECORDS: usize = 5;

/// Quality-score weights: completeness, type confidence, uniqueness.
/// The exact blend is a design choice; each component is monotone, so a
/// more complete, more consistently typed, more distinctive field always
/// scores at least as high.
const QUALITY_WEIGHT_COMPLETENESS: f64 = 0.5;
const QUALITY_WEIGHT_CONFIDENCE: f64 = 0.3;
const QUALITY_WEIGHT_UNIQUENESS: f64 = 0.2;

/// Analyzer for staged JSON datasets
pub struct SchemaAnalyzer {
    config: AnalysisConfig,
    cache: Mutex<LruCache<u64, SchemaAnalysis>>,
}

impl SchemaAnalyzer {
    /// Create an analyzer with the given configuration
    pub fn new(config: AnalysisConfig) -> Self {
        let entries = NonZeroUsize::new(config.cache_entries.max(1)).expect("non-zero");
        Self {
            config,
            cache: Mutex::new(LruCache::new(entries)),
        }
    }

    /// Compute a fingerprint for a dataset: record count, the sorted set of
    /// field names, and a hash of the first few records. Identical datasets
    /// always produce identical fingerprints.
    pub fn fingerprint(records: &[Record]) -> u64 {
        let mut hasher = Xxh3::new();
        hasher.update(&(records.len() as u64).to_le_bytes());

        let names: BTreeSet<&str> = records
            .iter()
            .flat_map(|r| r.keys().map(|k| k.as_str()))
            .collect();
        for name in names {
            hasher.update(name.as_bytes());
            hasher.update(&[0]);
        }

        for record in records.iter().take(FINGERPRINT_RECORDS) {
            // Insertion order is preserved, so identical files hash identically
            if let Ok(bytes) = serde_json::to_vec(&Value::Object(record.clone())) {
                hasher.update(&bytes);
            }
        }

        hasher.digest()
    }

    /// Analyze a dataset.
    ///
    /// Null/empty input yields a well-formed all-zero analysis. A failure
    /// analyzing one field never aborts the rest; the field is reported as
    /// `Unknown` with the failure recorded as an issue.
    pub fn analyze(&self, records: &[Record]) -> SchemaAnalysis {
        if records.is_empty() {
            return SchemaAnalysis::empty();
        }

        let fingerprint = Self::fingerprint(records);
        if let Some(cached) = self.cache.lock().get(&fingerprint) {
            debug!("Schema analysis cache hit for fingerprint {:016x}", fingerprint);
            return cached.clone();
        }

        let field_names: BTreeSet<String> = records
            .iter()
            .flat_map(|r| r.keys().cloned())
            .collect();

        let mut analysis = SchemaAnalysis::empty();
        analysis.total_records = records.len();
        analysis.total_fields = field_names.len();
        analysis.fingerprint = fingerprint;

        for name in &field_names {
            let field = match self.analyze_field(name, records) {
                Ok(field) => field,
                Err(e) => {
                    warn!("Analysis of field '{}' failed: {}", name, e);
                    FieldAnalysis::unknown(name.clone(), format!("analysis failed: {}", e))
                }
            };
            analysis.fields.insert(name.clone(), field);
        }

        analysis.recommended_id_field = recommend_id_field(&analysis);
        analysis.recommended_index_fields = recommend_index_fields(&analysis);
        analysis.overall_quality_score = average(
            analysis.fields.values().map(|f| f.stats.quality_score),
        );
        analysis.report = build_report(&analysis);

        self.cache.lock().put(fingerprint, analysis.clone());
        analysis
    }

    /// Analyze one field across the full dataset
    fn analyze_field(&self, name: &str, records: &[Record]) -> Result<FieldAnalysis, String> {
        let total_count = records.len();
        let values: Vec<&Value> = records
            .iter()
            .filter_map(|r| r.get(name))
            .filter(|v| !v.is_null())
            .collect();
        let non_null_count = values.len();

        // Type inference over a deterministic leading sample only
        let sample: Vec<&Value> = values
            .iter()
            .take(self.config.sample_size)
            .copied()
            .collect();
        let inference = infer_type(&sample);

        // Statistics over the full, unsampled value set
        let mut distinct: HashSet<String> = HashSet::new();
        let mut cjk_count = 0usize;
        for value in &values {
            distinct.insert(canonical(value));
            if value.as_str().is_some_and(contains_cjk) {
                cjk_count += 1;
            }
        }
        let unique_count = distinct.len();
        let null_ratio = if total_count > 0 {
            1.0 - non_null_count as f64 / total_count as f64
        } else {
            0.0
        };
        let unique_ratio = if non_null_count > 0 {
            unique_count as f64 / non_null_count as f64
        } else {
            0.0
        };
        let chinese_ratio = if non_null_count > 0 {
            cjk_count as f64 / non_null_count as f64
        } else {
            0.0
        };

        let has_outliers = detect_outliers(inference.field_type, &values);
        let completeness = 1.0 - null_ratio;
        let quality_score = (QUALITY_WEIGHT_COMPLETENESS * completeness
            + QUALITY_WEIGHT_CONFIDENCE * inference.confidence
            + QUALITY_WEIGHT_UNIQUENESS * unique_ratio)
            .clamp(0.0, 1.0);

        let stats = FieldStatistics {
            total_count,
            non_null_count,
            null_ratio,
            unique_count,
            unique_ratio,
            quality_score,
            has_outliers,
        };

        let mut issues = Vec::new();
        if null_ratio > 0.5 {
            issues.push(format!("{:.0}% of records have no value", null_ratio * 100.0));
        }
        if non_null_count > 0 && inference.confidence < 0.7 {
            issues.push(format!(
                "mixed value types ({:.0}% {:?})",
                inference.confidence * 100.0,
                inference.field_type
            ));
        }
        if has_outliers {
            issues.push("numeric values contain outliers".to_string());
        }

        let suggest_as_id = is_id_like_name(name)
            && unique_ratio > 0.95
            && null_ratio < 0.01
            && matches!(inference.field_type, FieldType::String | FieldType::Integer);

        let suggest_index = suggest_index_for(
            name,
            inference.field_type,
            unique_ratio,
            chinese_ratio,
        );

        let importance = field_importance(name, inference.field_type, null_ratio, chinese_ratio);

        let sample_values = values
            .iter()
            .take(self.config.sample_values)
            .map(|v| truncate(&canonical(v), 50))
            .collect();

        Ok(FieldAnalysis {
            field_name: name.to_string(),
            inferred_type: inference.field_type,
            confidence: inference.confidence,
            stats,
            sample_values,
            issues,
            suggest_as_id,
            suggest_index,
            importance,
            has_chinese_content: cjk_count > 0,
            chinese_ratio,
        })
    }
}

/// Whether a field name looks like a primary identifier
pub fn is_id_like_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    matches!(lower.as_str(), "id" | "_id" | "uuid" | "key") || lower.ends_with("_id")
}

/// Whether a field name suggests a value users query by
fn is_query_value_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    ["id", "name", "code", "status", "type", "category", "title"]
        .iter()
        .any(|hint| lower.contains(hint))
}

fn suggest_index_for(
    name: &str,
    field_type: FieldType,
    unique_ratio: f64,
    chinese_ratio: f64,
) -> bool {
    if field_type == FieldType::Unknown {
        return false;
    }
    // Chinese text is indexed more eagerly: it needs phonetic search
    // support regardless of cardinality.
    if chinese_ratio >= 0.3 {
        return true;
    }
    let (lo, hi) = (0.1, 0.9);
    is_query_value_name(name) || (unique_ratio > lo && unique_ratio < hi)
}

/// Heuristic field importance in [0, 100].
///
/// Starts at a neutral 50 and gains bonuses for id/name/date/status-like
/// names, completeness, and Chinese content (scaled by ratio).
fn field_importance(
    name: &str,
    field_type: FieldType,
    null_ratio: f64,
    chinese_ratio: f64,
) -> u8 {
    let lower = name.to_lowercase();
    let mut score: f64 = 50.0;

    if is_id_like_name(name) {
        score += 20.0;
    }
    if lower.contains("name") || lower.contains("title") {
        score += 15.0;
    }
    if field_type == FieldType::Date || lower.contains("date") || lower.contains("time") {
        score += 10.0;
    }
    if lower.contains("status") || lower.contains("state") || lower.contains("category") {
        score += 10.0;
    }
    if null_ratio < 0.1 {
        score += 10.0;
    } else if null_ratio < 0.3 {
        score += 5.0;
    }
    score += chinese_ratio * 20.0;

    score.clamp(0.0, 100.0) as u8
}

/// Stable string form used for uniqueness counting and display
fn canonical(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}

/// Mean +/- 3 standard deviations outlier check for numeric fields
fn detect_outliers(field_type: FieldType, values: &[&Value]) -> bool {
    if !matches!(field_type, FieldType::Integer | FieldType::Float) {
        return false;
    }
    let nums: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
    if nums.len() < 4 {
        return false;
    }
    let mean = nums.iter().sum::<f64>() / nums.len() as f64;
    let variance = nums.iter().map(|n| (n - mean).powi(2)).sum::<f64>() / nums.len() as f64;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return false;
    }
    nums.iter().any(|n| (n - mean).abs() > 3.0 * std_dev)
}

fn recommend_id_field(analysis: &SchemaAnalysis) -> Option<String> {
    let mut candidates: Vec<&FieldAnalysis> = analysis
        .fields
        .values()
        .filter(|f| f.suggest_as_id)
        .collect();
    // Prefer the canonical "id" name, then the most distinctive candidate
    candidates.sort_by(|a, b| {
        let a_exact = a.field_name.eq_ignore_ascii_case("id");
        let b_exact = b.field_name.eq_ignore_ascii_case("id");
        b_exact
            .cmp(&a_exact)
            .then_with(|| {
                b.stats
                    .unique_ratio
                    .partial_cmp(&a.stats.unique_ratio)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.field_name.cmp(&b.field_name))
    });
    candidates.first().map(|f| f.field_name.clone())
}

fn recommend_index_fields(analysis: &SchemaAnalysis) -> Vec<String> {
    let mut fields: Vec<&FieldAnalysis> = analysis
        .fields
        .values()
        .filter(|f| f.suggest_index)
        .collect();
    fields.sort_by(|a, b| {
        b.importance
            .cmp(&a.importance)
            .then_with(|| a.field_name.cmp(&b.field_name))
    });
    fields.iter().map(|f| f.field_name.clone()).collect()
}

fn build_report(analysis: &SchemaAnalysis) -> ConsistencyReport {
    let completeness_score = average(
        analysis
            .fields
            .values()
            .map(|f| 1.0 - f.stats.null_ratio),
    );
    let consistency_score = average(analysis.fields.values().map(|f| f.confidence));

    let mut anomalies = Vec::new();
    let mut recommendations = Vec::new();

    for field in analysis.fields.values() {
        if field.stats.null_ratio > 0.5 {
            anomalies.push(format!(
                "field '{}' is {:.0}% null",
                field.field_name,
                field.stats.null_ratio * 100.0
            ));
        }
        if field.stats.non_null_count > 0 && field.confidence < 0.7 {
            anomalies.push(format!(
                "field '{}' has inconsistent value types",
                field.field_name
            ));
        }
    }

    if analysis.recommended_id_field.is_none() {
        recommendations.push(
            "no reliable id field found; documents will receive generated UUIDs".to_string(),
        );
    }
    if completeness_score < 0.8 {
        recommendations.push("dataset is sparse; consider cleaning mostly-null fields".to_string());
    }

    ConsistencyReport {
        completeness_score,
        consistency_score,
        anomalies,
        recommendations,
        ready_for_import: analysis.total_records > 0 && completeness_score >= 0.5,
    }
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        0.0
    } else {
        collected.iter().sum::<f64>() / collected.len() as f64
    }
}
