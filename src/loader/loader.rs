//! The bulk loader

use super::chunker::sub_chunk_size;
use crate::config::BulkConfig;
use crate::embedding::VectorProvider;
use crate::error::{ImportError, ImportResult};
use crate::mapping::{
    IndexConfig, SCHEMA_VERSION, SYSTEM_FIELD_DOC_ID, SYSTEM_FIELD_IMPORTED_AT,
    SYSTEM_FIELD_SCHEMA_VERSION, SYSTEM_FIELD_SPACE_ID,
};
use crate::store::{BulkDoc, StoreWriter};
use crate::task::CancellationToken;
use crate::types::{ErrorStrategy, ImportParams, Record};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Running totals reported after each outer batch and returned on completion
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub total_records: usize,
    pub processed_records: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub current_batch: usize,
    pub total_batches: usize,
    /// Human-readable summaries of failed documents, capped by configuration
    pub error_details: Vec<String>,
}

/// Writes staged records into a provisioned index
pub struct BulkLoader {
    writer: Arc<dyn StoreWriter>,
    vectors: Arc<dyn VectorProvider>,
    config: BulkConfig,
}

impl BulkLoader {
    pub fn new(
        writer: Arc<dyn StoreWriter>,
        vectors: Arc<dyn VectorProvider>,
        config: BulkConfig,
    ) -> Self {
        Self {
            writer,
            vectors,
            config,
        }
    }

    /// Load all records, reporting progress after every outer batch.
    ///
    /// Cancellation is checked once per outer batch boundary; batches
    /// committed before the check remain written. Under stop-on-error the
    /// first batch containing any document failure aborts the load; under
    /// skip-error failures are summarized and the load continues.
    pub fn load(
        &self,
        index_config: &IndexConfig,
        space_id: &str,
        records: &[Record],
        params: &ImportParams,
        cancel: &CancellationToken,
        on_progress: &mut dyn FnMut(&LoadReport),
    ) -> ImportResult<LoadReport> {
        let batch_size = params.batch_size.max(1);
        let mut report = LoadReport {
            total_records: records.len(),
            total_batches: records.len().div_ceil(batch_size),
            ..LoadReport::default()
        };

        if records.is_empty() {
            debug!("Nothing to load for space '{}'", space_id);
            return Ok(report);
        }

        let vector_fields = index_config.vector_source_fields();
        let embed = self.vectors.is_available() && !vector_fields.is_empty();
        info!(
            "Loading {} records into '{}' in {} batches of up to {}",
            records.len(),
            index_config.index_name,
            report.total_batches,
            batch_size
        );

        for (batch_index, batch) in records.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                info!(
                    "Cancellation observed before batch {}/{}",
                    batch_index + 1,
                    report.total_batches
                );
                return Err(ImportError::Cancelled);
            }

            let docs: Vec<BulkDoc> = batch
                .iter()
                .map(|r| self.augment(r, space_id, &vector_fields, embed))
                .collect();

            let mut batch_failed = false;
            match sub_chunk_size(batch, &self.config) {
                Some(chunk_docs) => {
                    debug!(
                        "Batch {} exceeds payload ceiling, splitting into sub-chunks of {}",
                        batch_index + 1,
                        chunk_docs
                    );
                    let chunk_count = docs.len().div_ceil(chunk_docs);
                    for (i, chunk) in docs.chunks(chunk_docs).enumerate() {
                        let response = self.write_with_retry(&index_config.index_name, chunk)?;
                        self.absorb(&response, &mut report, &mut batch_failed);
                        if i + 1 < chunk_count && self.config.inter_chunk_delay_ms > 0 {
                            std::thread::sleep(Duration::from_millis(
                                self.config.inter_chunk_delay_ms,
                            ));
                        }
                    }
                }
                None => {
                    let response = self.write_with_retry(&index_config.index_name, &docs)?;
                    self.absorb(&response, &mut report, &mut batch_failed);
                }
            }

            report.processed_records += batch.len();
            report.current_batch = batch_index + 1;
            on_progress(&report);

            if batch_failed && params.error_strategy == ErrorStrategy::StopOnError {
                let detail = report
                    .error_details
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "document write failed".to_string());
                return Err(ImportError::StoreWrite(format!(
                    "batch {} contained failures: {}",
                    batch_index + 1,
                    detail
                )));
            }
        }

        info!(
            "Load finished for '{}': {} ok, {} failed",
            index_config.index_name, report.success_count, report.error_count
        );
        Ok(report)
    }

    /// Attach system fields and best-effort vectors to one record
    fn augment(
        &self,
        record: &Record,
        space_id: &str,
        vector_fields: &[String],
        embed: bool,
    ) -> BulkDoc {
        let doc_id = Uuid::new_v4().to_string();
        let mut doc = record.clone();
        doc.insert(SYSTEM_FIELD_SPACE_ID.to_string(), json!(space_id));
        doc.insert(SYSTEM_FIELD_DOC_ID.to_string(), json!(doc_id));
        doc.insert(
            SYSTEM_FIELD_IMPORTED_AT.to_string(),
            json!(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        doc.insert(SYSTEM_FIELD_SCHEMA_VERSION.to_string(), json!(SCHEMA_VERSION));

        if embed {
            for field in vector_fields {
                let Some(text) = record.get(field).and_then(Value::as_str) else {
                    continue;
                };
                // A failing embed never fails the document
                if let Some(vector) = self.vectors.embed(text) {
                    doc.insert(format!("{}_vector", field), json!(vector));
                }
            }
        }

        BulkDoc {
            id: doc_id,
            document: Value::Object(doc),
        }
    }

    /// Fold one bulk response into the running report
    fn absorb(
        &self,
        response: &crate::store::BulkResponse,
        report: &mut LoadReport,
        batch_failed: &mut bool,
    ) {
        report.success_count += response.success_count();
        for item in response.failures() {
            report.error_count += 1;
            *batch_failed = true;
            if report.error_details.len() < self.config.max_error_details {
                let error = item.error.as_deref().unwrap_or("unknown error");
                report
                    .error_details
                    .push(format!("doc {}: {}", item.id, error));
            }
        }
    }

    /// One bulk write with backoff-retried throttling errors.
    ///
    /// Non-retryable errors propagate on the first attempt; exhausted
    /// retries become a hard write failure.
    fn write_with_retry(&self, index_name: &str, docs: &[BulkDoc]) -> ImportResult<crate::store::BulkResponse> {
        let mut attempt: u32 = 1;
        loop {
            match self.writer.bulk_write(index_name, docs) {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.config.max_write_attempts => {
                    let delay = self.config.retry_base_delay_ms * 2u64.pow(attempt - 1);
                    warn!(
                        "Bulk write attempt {}/{} throttled ({}), retrying in {}ms",
                        attempt, self.config.max_write_attempts, e, delay
                    );
                    std::thread::sleep(Duration::from_millis(delay));
                    attempt += 1;
                }
                Err(e) if e.is_retryable() => {
                    return Err(ImportError::StoreWrite(format!(
                        "retries exhausted after {} attempts: {}",
                        attempt, e
                    )));
                }
                Err(e) => return Err(e),
            }
        }
    }
}
