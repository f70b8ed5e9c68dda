//! Storage service implementation using Apache OpenDAL.

use async_trait::async_trait;
use bytes::Bytes;
use opendal::{ErrorKind, Operator, services};
use tracing::debug;

use super::config::StorageProvider;
use super::error::StorageError;
use super::store::ObjectStore;

/// OpenDAL-backed object store.
pub struct StorageService {
    operator: Operator,
    provider: StorageProvider,
}

impl StorageService {
    /// Create a new storage service from a provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_provider(provider: StorageProvider) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&provider)?;
        Ok(Self { operator, provider })
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        let operator = match provider {
            StorageProvider::Gcs {
                bucket,
                credential_path,
                endpoint,
                predefined_acl,
            } => {
                let mut builder = services::Gcs::default().bucket(bucket);
                if let Some(acl) = predefined_acl {
                    builder = builder.predefined_acl(acl);
                }
                if let Some(path) = credential_path {
                    builder = builder.credential_path(path);
                }
                if let Some(endpoint) = endpoint {
                    builder = builder.endpoint(endpoint);
                }
                Operator::new(builder)?.finish()
            }
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);
                Operator::new(builder)?.finish()
            }
            StorageProvider::LocalFs { root, .. } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::configuration("invalid path"))?,
                );
                Operator::new(builder)?.finish()
            }
            StorageProvider::Memory { .. } => Operator::new(services::Memory::default())?.finish(),
        };

        Ok(operator)
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

#[async_trait]
impl ObjectStore for StorageService {
    fn bucket(&self) -> &str {
        self.provider.bucket()
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.operator.stat(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError> {
        let capability = self.operator.info().full_capability();
        if capability.write_with_content_type {
            self.operator
                .write_with(key, body)
                .content_type(content_type)
                .await?;
        } else {
            debug!(
                provider = self.provider_name(),
                key, "Provider does not record content type"
            );
            self.operator.write(key, body).await?;
        }
        Ok(())
    }

    /// GCS objects carry the provider's predefined ACL from the write itself.
    /// OpenDAL has no separate ACL call, so this step confirms the object is
    /// committed and reports when no object ACL was applied.
    async fn make_public(&self, key: &str) -> Result<(), StorageError> {
        self.operator.stat(key).await?;
        match self.provider.public_acl() {
            Some(acl) => debug!(key, acl, "Object readable via predefined ACL"),
            None => debug!(
                key,
                provider = self.provider_name(),
                "Object readable via bucket policy"
            ),
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.operator.delete(key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_service() -> StorageService {
        StorageService::from_provider(StorageProvider::memory("test-bucket"))
            .expect("should create service")
    }

    #[tokio::test]
    async fn test_exists_on_empty_store() {
        let service = memory_service();
        let exists = service
            .exists("albums/images/cover.png")
            .await
            .expect("stat should succeed");
        assert!(!exists);
    }

    #[tokio::test]
    async fn test_write_then_exists() {
        let service = memory_service();
        service
            .write(
                "albums/images/cover.png",
                Bytes::from_static(b"png"),
                "image/png",
            )
            .await
            .expect("write should succeed");

        assert!(service.exists("albums/images/cover.png").await.unwrap());
        assert!(!service.exists("albums/images/other.png").await.unwrap());
    }

    #[test]
    fn test_gcs_operator_built_with_public_acl() {
        let provider = StorageProvider::gcs("melodia-media");
        assert_eq!(provider.public_acl(), Some("publicRead"));

        let service = StorageService::from_provider(provider).expect("gcs operator");
        assert_eq!(service.provider_name(), "gcs");
        assert_eq!(service.bucket(), "melodia-media");
    }

    #[tokio::test]
    async fn test_make_public_requires_object() {
        let service = memory_service();
        let err = service.make_public("songs/audio/missing.mp3").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let service = memory_service();
        service
            .write("genres/images/rock.gif", Bytes::from_static(b"gif"), "image/gif")
            .await
            .unwrap();

        service.delete("genres/images/rock.gif").await.unwrap();
        service.delete("genres/images/rock.gif").await.unwrap();
        assert!(!service.exists("genres/images/rock.gif").await.unwrap());
    }

    #[test]
    fn test_bucket_and_provider_name() {
        let service = memory_service();
        assert_eq!(service.bucket(), "test-bucket");
        assert_eq!(service.provider_name(), "memory");
    }
}
