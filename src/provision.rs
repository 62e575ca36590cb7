//! Index provisioning
//!
//! Applies a generated [`IndexConfig`] to the store ahead of loading:
//! replace mode rebuilds the index from scratch, append mode creates it
//! only when missing.

use crate::error::{ImportError, ImportResult};
use crate::mapping::IndexConfig;
use crate::store::StoreAdmin;
use crate::types::ImportMode;
use std::sync::Arc;
use tracing::info;

pub struct IndexProvisioner {
    admin: Arc<dyn StoreAdmin>,
}

impl IndexProvisioner {
    pub fn new(admin: Arc<dyn StoreAdmin>) -> Self {
        Self { admin }
    }

    /// Ensure the target index exists per the import mode.
    ///
    /// Store-admin failures surface unchanged; an invalid configuration is
    /// rejected before touching the store.
    pub fn apply(&self, config: &IndexConfig, mode: ImportMode) -> ImportResult<()> {
        if !config.validate() {
            return Err(ImportError::Validation(format!(
                "generated index configuration for '{}' is invalid",
                config.index_name
            )));
        }

        let exists = self.admin.index_exists(&config.index_name)?;
        match mode {
            ImportMode::Replace => {
                if exists {
                    info!("Replacing existing index '{}'", config.index_name);
                    self.admin.delete_index(&config.index_name)?;
                }
                self.admin.create_index(config)?;
            }
            ImportMode::Append => {
                if exists {
                    info!("Appending to existing index '{}'", config.index_name);
                } else {
                    self.admin.create_index(config)?;
                }
            }
        }
        Ok(())
    }
}
