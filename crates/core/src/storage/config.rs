//! Storage configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use melodia_shared::StorageConfig;

use super::error::StorageError;

/// GCS predefined ACL granting all users read access.
pub const GCS_PUBLIC_READ_ACL: &str = "publicRead";

/// Storage provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// Google Cloud Storage
    Gcs {
        /// GCS bucket name.
        bucket: String,
        /// Service account credential file, if not using ambient credentials.
        credential_path: Option<String>,
        /// Custom endpoint (emulators).
        endpoint: Option<String>,
        /// Predefined ACL applied to every written object, e.g. `publicRead`.
        /// `None` leaves access to the bucket policy.
        predefined_acl: Option<String>,
    },
    /// S3-compatible storage: Cloudflare R2, Supabase, AWS S3, DigitalOcean Spaces
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// AWS access key ID.
        access_key_id: String,
        /// AWS secret access key.
        secret_access_key: String,
        /// AWS region.
        region: String,
    },
    /// Local filesystem (development only)
    LocalFs {
        /// Logical bucket name used in public URLs.
        bucket: String,
        /// Root directory path.
        root: PathBuf,
    },
    /// In-process memory (tests only)
    Memory {
        /// Logical bucket name used in public URLs.
        bucket: String,
    },
}

impl StorageProvider {
    /// Create Google Cloud Storage provider. Objects are written with the
    /// `publicRead` ACL.
    #[must_use]
    pub fn gcs(bucket: impl Into<String>) -> Self {
        Self::Gcs {
            bucket: bucket.into(),
            credential_path: None,
            endpoint: None,
            predefined_acl: Some(GCS_PUBLIC_READ_ACL.to_string()),
        }
    }

    /// Set the service account credential file (GCS only).
    #[must_use]
    pub fn with_credential_path(mut self, path: Option<String>) -> Self {
        if let Self::Gcs { credential_path, .. } = &mut self {
            *credential_path = path;
        }
        self
    }

    /// Set a custom endpoint (GCS only; S3 takes it in the constructor).
    #[must_use]
    pub fn with_endpoint(mut self, url: Option<String>) -> Self {
        if let Self::Gcs { endpoint, .. } = &mut self {
            *endpoint = url;
        }
        self
    }

    /// Set the predefined ACL for written objects (GCS only).
    #[must_use]
    pub fn with_predefined_acl(mut self, acl: Option<String>) -> Self {
        if let Self::Gcs { predefined_acl, .. } = &mut self {
            *predefined_acl = acl;
        }
        self
    }

    /// Create S3-compatible provider (Cloudflare R2, Supabase, AWS S3).
    #[must_use]
    pub fn s3(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self::S3 {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
        }
    }

    /// Create local filesystem provider (development only).
    #[must_use]
    pub fn local_fs(bucket: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self::LocalFs {
            bucket: bucket.into(),
            root: root.into(),
        }
    }

    /// Create in-memory provider.
    #[must_use]
    pub fn memory(bucket: impl Into<String>) -> Self {
        Self::Memory {
            bucket: bucket.into(),
        }
    }

    /// Build a provider from the application storage settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown provider name or a
    /// missing provider-specific field.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let bucket = config.bucket.clone();
        if bucket.trim().is_empty() {
            return Err(StorageError::configuration("bucket must not be empty"));
        }

        match config.provider.as_str() {
            "gcs" => Ok(Self::gcs(bucket)
                .with_credential_path(config.credential_path.clone())
                .with_endpoint(config.endpoint.clone())
                .with_predefined_acl(gcs_acl(config.predefined_acl.as_deref()))),
            "s3" => Ok(Self::s3(
                required(config.endpoint.as_ref(), "endpoint")?,
                bucket,
                required(config.access_key_id.as_ref(), "access_key_id")?,
                required(config.secret_access_key.as_ref(), "secret_access_key")?,
                config.region.clone().unwrap_or_else(|| "auto".to_string()),
            )),
            "fs" => Ok(Self::local_fs(
                bucket,
                required(config.root.as_ref(), "root")?,
            )),
            "memory" => Ok(Self::memory(bucket)),
            other => Err(StorageError::configuration(format!(
                "unknown storage provider '{other}'"
            ))),
        }
    }

    /// ACL applied to written objects, if the provider sets one.
    ///
    /// Only GCS sets an object ACL. S3, local and memory stores rely on the
    /// bucket policy (or have no access control).
    #[must_use]
    pub fn public_acl(&self) -> Option<&str> {
        match self {
            Self::Gcs { predefined_acl, .. } => predefined_acl.as_deref(),
            _ => None,
        }
    }

    /// Get the provider name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gcs { .. } => "gcs",
            Self::S3 { .. } => "s3",
            Self::LocalFs { .. } => "local",
            Self::Memory { .. } => "memory",
        }
    }

    /// Get the bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::Gcs { bucket, .. }
            | Self::S3 { bucket, .. }
            | Self::LocalFs { bucket, .. }
            | Self::Memory { bucket } => bucket,
        }
    }
}

/// Unset means `publicRead`; an empty value disables the object ACL for
/// buckets with uniform bucket-level access.
fn gcs_acl(configured: Option<&str>) -> Option<String> {
    match configured.map(str::trim) {
        None => Some(GCS_PUBLIC_READ_ACL.to_string()),
        Some("") => None,
        Some(acl) => Some(acl.to_string()),
    }
}

fn required(value: Option<&String>, field: &str) -> Result<String, StorageError> {
    value
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| StorageError::configuration(format!("storage.{field} is required")))
}
