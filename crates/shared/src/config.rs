//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Object storage configuration.
    pub storage: StorageConfig,
    /// Upload policy configuration.
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Object storage configuration.
///
/// Only the fields relevant to the selected `provider` are read; the others
/// may be left unset.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Provider name: `gcs`, `s3`, `fs` or `memory`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Bucket (or container) holding the assets.
    pub bucket: String,
    /// Base of public asset URLs, without trailing slash.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Custom endpoint (S3-compatible services, GCS emulators).
    pub endpoint: Option<String>,
    /// Region (S3).
    pub region: Option<String>,
    /// Access key ID (S3).
    pub access_key_id: Option<String>,
    /// Secret access key (S3).
    pub secret_access_key: Option<String>,
    /// Service account credential file (GCS).
    pub credential_path: Option<String>,
    /// Root directory (fs).
    pub root: Option<String>,
    /// Predefined object ACL (GCS). Unset means `publicRead`; an empty value
    /// disables object ACLs for buckets with uniform bucket-level access.
    pub predefined_acl: Option<String>,
}

fn default_provider() -> String {
    "gcs".to_string()
}

fn default_public_base_url() -> String {
    "https://storage.googleapis.com".to_string()
}

impl StorageConfig {
    /// Creates an in-memory storage config, mostly useful for tests.
    #[must_use]
    pub fn memory(bucket: impl Into<String>) -> Self {
        Self {
            provider: "memory".to_string(),
            bucket: bucket.into(),
            public_base_url: default_public_base_url(),
            endpoint: None,
            region: None,
            access_key_id: None,
            secret_access_key: None,
            credential_path: None,
            root: None,
            predefined_acl: None,
        }
    }
}

/// Upload policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Key policy: `name_stable` or `always_unique`.
    #[serde(default = "default_dedup_policy")]
    pub dedup_policy: String,
    /// Maximum image size in bytes.
    #[serde(default = "default_image_max_bytes")]
    pub image_max_bytes: u64,
    /// Maximum audio size in bytes.
    #[serde(default = "default_audio_max_bytes")]
    pub audio_max_bytes: u64,
    /// Overall deadline for one upload, in seconds.
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    /// Reject folders outside the known image/audio sets.
    #[serde(default)]
    pub strict_folders: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dedup_policy: default_dedup_policy(),
            image_max_bytes: default_image_max_bytes(),
            audio_max_bytes: default_audio_max_bytes(),
            deadline_secs: default_deadline_secs(),
            strict_folders: false,
        }
    }
}

fn default_dedup_policy() -> String {
    "name_stable".to_string()
}

fn default_image_max_bytes() -> u64 {
    2 * 1024 * 1024 // 2 MiB
}

fn default_audio_max_bytes() -> u64 {
    15 * 1024 * 1024 // 15 MiB
}

fn default_deadline_secs() -> u64 {
    30
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("MELODIA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
