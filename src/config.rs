//! Configuration for the import engine

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for the import engine
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Schema analysis configuration
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Bulk loading configuration
    #[serde(default)]
    pub bulk: BulkConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: EngineConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together so the user
    /// can fix everything in one pass rather than playing whack-a-mole.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.analysis.sample_size == 0 {
            errors.push("analysis sample_size must be positive".to_string());
        }
        if self.analysis.cache_entries == 0 {
            errors.push("analysis cache_entries must be positive".to_string());
        }

        if self.bulk.max_payload_bytes == 0 {
            errors.push("bulk max_payload_bytes must be positive".to_string());
        }
        if self.bulk.min_chunk_docs == 0 {
            errors.push("bulk min_chunk_docs must be positive".to_string());
        }
        if self.bulk.max_chunk_docs < self.bulk.min_chunk_docs {
            errors.push(format!(
                "bulk max_chunk_docs ({}) must be >= min_chunk_docs ({})",
                self.bulk.max_chunk_docs, self.bulk.min_chunk_docs
            ));
        }
        if self.bulk.max_write_attempts == 0 {
            errors.push("bulk max_write_attempts must be positive".to_string());
        }
        if self.bulk.default_batch_size == 0 {
            errors.push("bulk default_batch_size must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

/// Schema analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of leading non-null values sampled per field for type inference
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// Number of analysis results kept in the fingerprint cache
    #[serde(default = "default_cache_entries")]
    pub cache_entries: usize,
    /// Number of sample values retained per field in the analysis output
    #[serde(default = "default_sample_values")]
    pub sample_values: usize,
}

fn default_sample_size() -> usize {
    1000
}

fn default_cache_entries() -> usize {
    16
}

fn default_sample_values() -> usize {
    5
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            cache_entries: default_cache_entries(),
            sample_values: default_sample_values(),
        }
    }
}

/// Bulk loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    /// Batch size used when the caller does not request one
    #[serde(default = "default_batch_size")]
    pub default_batch_size: usize,
    /// Safety ceiling for an estimated bulk payload, in bytes.
    /// Kept well under the store's request-size limit.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
    /// Lower bound on adaptive sub-chunk size (documents)
    #[serde(default = "default_min_chunk_docs")]
    pub min_chunk_docs: usize,
    /// Upper bound on adaptive sub-chunk size (documents)
    #[serde(default = "default_max_chunk_docs")]
    pub max_chunk_docs: usize,
    /// Delay between sub-chunks of a split batch, in milliseconds
    #[serde(default = "default_inter_chunk_delay_ms")]
    pub inter_chunk_delay_ms: u64,
    /// Maximum attempts per bulk write (first attempt included)
    #[serde(default = "default_max_write_attempts")]
    pub max_write_attempts: u32,
    /// Base backoff delay for retried writes, in milliseconds; doubles per attempt
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Maximum error summaries retained per task
    #[serde(default = "default_max_error_details")]
    pub max_error_details: usize,
}

fn default_batch_size() -> usize {
    1000
}

fn default_max_payload_bytes() -> usize {
    4 * 1024 * 1024
}

fn default_min_chunk_docs() -> usize {
    10
}

fn default_max_chunk_docs() -> usize {
    500
}

fn default_inter_chunk_delay_ms() -> u64 {
    50
}

fn default_max_write_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_max_error_details() -> usize {
    20
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            default_batch_size: default_batch_size(),
            max_payload_bytes: default_max_payload_bytes(),
            min_chunk_docs: default_min_chunk_docs(),
            max_chunk_docs: default_max_chunk_docs(),
            inter_chunk_delay_ms: default_inter_chunk_delay_ms(),
            max_write_attempts: default_max_write_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_error_details: default_max_error_details(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn default_config_passes_validation() {
        assert!(valid_config().validate().is_ok(), "default config should be valid");
    }

    #[test]
    fn validate_rejects_zero_sample_size() {
        let mut cfg = valid_config();
        cfg.analysis.sample_size = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("sample_size must be positive"));
    }

    #[test]
    fn validate_rejects_inverted_chunk_bounds() {
        let mut cfg = valid_config();
        cfg.bulk.min_chunk_docs = 100;
        cfg.bulk.max_chunk_docs = 50;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("max_chunk_docs"));
    }

    #[test]
    fn validate_collects_multiple_errors() {
        let mut cfg = valid_config();
        cfg.analysis.sample_size = 0;
        cfg.bulk.max_write_attempts = 0;
        let msg = cfg.validate().unwrap_err().to_string();
        assert!(msg.contains("sample_size must be positive"));
        assert!(msg.contains("max_write_attempts must be positive"));
    }

    #[test]
    fn default_bulk_config_values() {
        let bulk = BulkConfig::default();
        assert_eq!(bulk.default_batch_size, 1000);
        assert_eq!(bulk.max_payload_bytes, 4 * 1024 * 1024);
        assert_eq!(bulk.min_chunk_docs, 10);
        assert_eq!(bulk.max_chunk_docs, 500);
        assert_eq!(bulk.max_write_attempts, 3);
        assert_eq!(bulk.retry_base_delay_ms, 1000);
        assert_eq!(bulk.max_error_details, 20);
    }

    #[test]
    fn config_deserializes_with_partial_toml() {
        let cfg: EngineConfig = toml::from_str("[bulk]\ndefault_batch_size = 200\n").unwrap();
        assert_eq!(cfg.bulk.default_batch_size, 200);
        // Everything else falls back to defaults
        assert_eq!(cfg.analysis.sample_size, 1000);
        assert_eq!(cfg.bulk.max_write_attempts, 3);
    }
}
