//! Payload size estimation and adaptive sub-chunking

use crate::config::BulkConfig;
use crate::types::Record;
use serde_json::Value;

/// Fraction added to the raw estimate for bulk-protocol overhead
/// (action lines, field names, framing)
const PROTOCOL_OVERHEAD: f64 = 0.30;

/// Estimate the serialized size of one JSON value in bytes: 2 bytes per
/// UTF-16 unit for strings, 8 bytes per number/boolean, recursive for
/// nested structures.
fn estimate_value_bytes(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::Bool(_) | Value::Number(_) => 8,
        Value::String(s) => 2 * s.encode_utf16().count(),
        Value::Array(items) => items.iter().map(estimate_value_bytes).sum(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| 2 * k.encode_utf16().count() + estimate_value_bytes(v))
            .sum(),
    }
}

/// Estimate the serialized size of one record, keys included
pub fn estimate_record_bytes(record: &Record) -> usize {
    record
        .iter()
        .map(|(k, v)| 2 * k.encode_utf16().count() + estimate_value_bytes(v))
        .sum()
}

/// Estimate the total payload of a batch, protocol overhead included
pub fn estimate_payload_bytes(batch: &[Record]) -> usize {
    let raw: usize = batch.iter().map(estimate_record_bytes).sum();
    (raw as f64 * (1.0 + PROTOCOL_OVERHEAD)) as usize
}

/// Decide whether a batch needs sub-chunking.
///
/// Returns `None` when the estimated payload fits under the ceiling, else
/// a sub-chunk size derived from the average document size and clamped to
/// the configured bounds.
pub fn sub_chunk_size(batch: &[Record], config: &BulkConfig) -> Option<usize> {
    if batch.is_empty() {
        return None;
    }
    let estimated = estimate_payload_bytes(batch);
    if estimated <= config.max_payload_bytes {
        return None;
    }
    let avg_doc = (estimated / batch.len()).max(1);
    let fitting = config.max_payload_bytes / avg_doc;
    Some(fitting.clamp(config.min_chunk_docs, config.max_chunk_docs))
}
