//! Per-value type classification and sample-based type inference

use super::types::FieldType;
use chrono::NaiveDate;
use regex_lite::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Date layouts accepted during classification, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y"];

/// Datetime layouts accepted during classification, tried in order
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid regex")
    })
}

/// Check whether a string contains at least one CJK codepoint.
///
/// Covers the unified ideograph block, extension A, and the supplementary
/// extension planes (B and C).
pub fn contains_cjk(s: &str) -> bool {
    s.chars().any(|c| {
        matches!(c,
            '\u{4E00}'..='\u{9FFF}'
            | '\u{3400}'..='\u{4DBF}'
            | '\u{20000}'..='\u{2A6DF}'
            | '\u{2A700}'..='\u{2B73F}'
        )
    })
}

/// Classify a single JSON value into a logical field type.
///
/// Strings are probed against progressively weaker interpretations; nested
/// arrays and objects classify as `Unknown` since the importer expects flat
/// records.
pub fn classify_value(value: &Value) -> FieldType {
    match value {
        Value::Bool(_) => FieldType::Boolean,
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                FieldType::Integer
            } else {
                FieldType::Float
            }
        }
        Value::String(s) => classify_string(s.trim()),
        Value::Null | Value::Array(_) | Value::Object(_) => FieldType::Unknown,
    }
}

fn classify_string(s: &str) -> FieldType {
    if s.is_empty() {
        return FieldType::Unknown;
    }
    if is_date_like(s) {
        return FieldType::Date;
    }
    if email_pattern().is_match(s) {
        return FieldType::Email;
    }
    if is_url_like(s) {
        return FieldType::Url;
    }
    if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") {
        return FieldType::Boolean;
    }
    if s.parse::<i64>().is_ok() {
        return FieldType::Integer;
    }
    if s.parse::<f64>().is_ok() {
        return FieldType::Float;
    }
    FieldType::String
}

fn is_date_like(s: &str) -> bool {
    if chrono::DateTime::parse_from_rfc3339(s).is_ok() {
        return true;
    }
    if DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(s, fmt).is_ok())
    {
        return true;
    }
    DATETIME_FORMATS
        .iter()
        .any(|fmt| chrono::NaiveDateTime::parse_from_str(s, fmt).is_ok())
}

fn is_url_like(s: &str) -> bool {
    match url::Url::parse(s) {
        Ok(u) => matches!(u.scheme(), "http" | "https" | "ftp"),
        Err(_) => false,
    }
}

/// Outcome of sample-based type inference for one field
#[derive(Debug, Clone)]
pub struct TypeInference {
    pub field_type: FieldType,
    /// Share of samples classified as the winning type, in [0, 1]
    pub confidence: f64,
    /// All observed candidates with their vote share, best first
    pub candidates: Vec<(FieldType, f64)>,
}

/// Infer a field's type from a deterministic sample of its values.
///
/// Each sample votes for one type; the winner is the type with the most
/// votes, tie-broken by [`FieldType::precedence`]. An empty sample yields
/// `Unknown` with zero confidence.
pub fn infer_type(samples: &[&Value]) -> TypeInference {
    if samples.is_empty() {
        return TypeInference {
            field_type: FieldType::Unknown,
            confidence: 0.0,
            candidates: Vec::new(),
        };
    }

    let mut votes: HashMap<FieldType, usize> = HashMap::new();
    for value in samples {
        *votes.entry(classify_value(value)).or_insert(0) += 1;
    }

    let total = samples.len() as f64;
    let mut candidates: Vec<(FieldType, f64)> = votes
        .into_iter()
        .map(|(ty, count)| (ty, count as f64 / total))
        .collect();
    candidates.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.precedence().cmp(&b.0.precedence()))
    });

    let (field_type, confidence) = candidates[0];
    TypeInference {
        field_type,
        confidence,
        candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_primitives() {
        assert_eq!(classify_value(&json!(true)), FieldType::Boolean);
        assert_eq!(classify_value(&json!(42)), FieldType::Integer);
        assert_eq!(classify_value(&json!(3.25)), FieldType::Float);
        assert_eq!(classify_value(&json!("hello")), FieldType::String);
        assert_eq!(classify_value(&json!(null)), FieldType::Unknown);
        assert_eq!(classify_value(&json!([1, 2])), FieldType::Unknown);
        assert_eq!(classify_value(&json!({"a": 1})), FieldType::Unknown);
    }

    #[test]
    fn test_classify_string_specializations() {
        assert_eq!(classify_value(&json!("2024-03-15")), FieldType::Date);
        assert_eq!(classify_value(&json!("2024-03-15 10:30:00")), FieldType::Date);
        assert_eq!(classify_value(&json!("2024-03-15T10:30:00Z")), FieldType::Date);
        assert_eq!(classify_value(&json!("user@example.com")), FieldType::Email);
        assert_eq!(classify_value(&json!("https://example.com/a")), FieldType::Url);
        assert_eq!(classify_value(&json!("true")), FieldType::Boolean);
        assert_eq!(classify_value(&json!("123")), FieldType::Integer);
        assert_eq!(classify_value(&json!("1.5")), FieldType::Float);
        assert_eq!(classify_value(&json!("just text")), FieldType::String);
    }

    #[test]
    fn test_classify_cjk_string_is_string() {
        assert_eq!(classify_value(&json!("张三")), FieldType::String);
    }

    #[test]
    fn test_contains_cjk() {
        assert!(contains_cjk("张三"));
        assert!(contains_cjk("mixed 北京 text"));
        assert!(contains_cjk("\u{3400}")); // extension A
        assert!(!contains_cjk("plain ascii"));
        assert!(!contains_cjk("русский"));
        assert!(!contains_cjk(""));
    }

    #[test]
    fn test_infer_majority_wins() {
        let values = vec![json!("a"), json!("b"), json!("c"), json!(1)];
        let refs: Vec<&Value> = values.iter().collect();
        let inference = infer_type(&refs);
        assert_eq!(inference.field_type, FieldType::String);
        assert!((inference.confidence - 0.75).abs() < 1e-9);
        assert_eq!(inference.candidates.len(), 2);
    }

    #[test]
    fn test_infer_tie_broken_by_precedence() {
        // Two integers, two floats: Integer has higher precedence
        let values = vec![json!(1), json!(2), json!(1.5), json!(2.5)];
        let refs: Vec<&Value> = values.iter().collect();
        assert_eq!(infer_type(&refs).field_type, FieldType::Integer);

        // Date vs String tie: Date wins
        let values = vec![json!("2024-01-01"), json!("not a date")];
        let refs: Vec<&Value> = values.iter().collect();
        assert_eq!(infer_type(&refs).field_type, FieldType::Date);
    }

    #[test]
    fn test_infer_empty_sample() {
        let inference = infer_type(&[]);
        assert_eq!(inference.field_type, FieldType::Unknown);
        assert_eq!(inference.confidence, 0.0);
    }
}
