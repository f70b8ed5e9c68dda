//! Existence probe against the object store.

use std::sync::Arc;

use tracing::error;

use super::error::UploadError;
use super::types::StorageKey;
use crate::storage::ObjectStore;

/// Answers whether a key already has an object.
#[derive(Clone)]
pub struct ExistenceChecker {
    store: Arc<dyn ObjectStore>,
}

impl ExistenceChecker {
    /// Create a checker over a store handle.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Probe `key`. Absence is `false`; a failed probe is `StorageUnavailable`,
    /// never `false`.
    pub async fn exists(&self, key: &StorageKey) -> Result<bool, UploadError> {
        self.store.exists(key.as_str()).await.map_err(|source| {
            error!(key = %key, error = %source, "Existence check failed");
            UploadError::StorageUnavailable {
                key: key.to_string(),
                source,
            }
        })
    }
}
