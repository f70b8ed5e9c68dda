//! Writes new assets and makes them public.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error, info, warn};

use super::error::UploadError;
use super::types::{PublicUrl, StorageKey};
use crate::storage::ObjectStore;

/// Writes a buffered payload and publishes it under a key.
#[derive(Clone)]
pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    public_base_url: String,
}

impl Publisher {
    /// Create a publisher; URLs are rooted at `public_base_url`.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, public_base_url: impl Into<String>) -> Self {
        Self {
            store,
            public_base_url: public_base_url.into(),
        }
    }

    /// URL an object at `key` is served from.
    #[must_use]
    pub fn url_for(&self, key: &StorageKey) -> PublicUrl {
        PublicUrl::compute(&self.public_base_url, self.store.bucket(), key)
    }

    /// Write `bytes` under `key`, then make the object public.
    ///
    /// A URL is returned only when both steps succeed. On either failure the
    /// key is rolled back so no unpublished or partial object is left behind.
    pub async fn publish(
        &self,
        key: &StorageKey,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<PublicUrl, UploadError> {
        let size = bytes.len();

        if let Err(source) = self.store.write(key.as_str(), bytes, content_type).await {
            error!(key = %key, error = %source, "Upload failed");
            self.discard(key).await;
            return Err(UploadError::UploadFailed {
                key: key.to_string(),
                source,
            });
        }

        if let Err(source) = self.store.make_public(key.as_str()).await {
            error!(key = %key, error = %source, "Publish failed");
            self.discard(key).await;
            return Err(UploadError::PublishFailed {
                key: key.to_string(),
                source,
            });
        }

        info!(key = %key, content_type, size, "Asset published");
        Ok(self.url_for(key))
    }

    /// Best-effort removal of whatever was written under `key`.
    pub async fn discard(&self, key: &StorageKey) {
        match self.store.delete(key.as_str()).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => debug!(key = %key, "Nothing to discard"),
            Err(e) => warn!(key = %key, error = %e, "Rollback delete failed"),
        }
    }
}
