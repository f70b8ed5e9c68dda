//! Object store abstraction used by the ingestion pipeline.

use async_trait::async_trait;
use bytes::Bytes;

use super::error::StorageError;

/// Bucket-and-key blob store.
///
/// Implementations are long-lived handles shared across concurrent uploads,
/// so every method takes `&self`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket the store writes into. Part of every public URL.
    fn bucket(&self) -> &str;

    /// Probe for an object at `key`.
    ///
    /// Absence (including a missing parent folder) is `Ok(false)`; only
    /// communication failures are errors.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Write `body` under `key` with the given content type.
    ///
    /// The payload is fully buffered, so this is a single bounded write.
    async fn write(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// Make a written object readable without authentication.
    async fn make_public(&self, key: &str) -> Result<(), StorageError>;

    /// Delete the object at `key`. Deleting a missing object succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}
