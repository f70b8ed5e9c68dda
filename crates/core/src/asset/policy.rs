//! Per-class upload constraints.

use melodia_shared::UploadConfig;

use super::types::AssetClass;

/// Folders holding image assets.
pub const IMAGE_FOLDERS: &[&str] = &[
    "songs/images",
    "artists/images",
    "albums/images",
    "genres/images",
    "countries/images",
];

/// Folder holding song audio.
pub const AUDIO_FOLDER: &str = "songs/audio";

/// How storage keys are derived from file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// `folder/name`. Re-uploading a name returns the existing asset.
    #[default]
    NameStable,
    /// `folder/<millis>_name`. Every upload is a new object.
    AlwaysUnique,
}

impl DedupPolicy {
    /// Convert to config string value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NameStable => "name_stable",
            Self::AlwaysUnique => "always_unique",
        }
    }

    /// Parse from config string value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name_stable" => Some(Self::NameStable),
            "always_unique" => Some(Self::AlwaysUnique),
            _ => None,
        }
    }
}

/// Limits for one asset class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLimits {
    /// Accepted MIME types.
    pub allowed_mime_types: Vec<String>,
    /// Maximum payload size in bytes.
    pub max_size_bytes: u64,
    /// Folders governed by this class.
    pub folders: Vec<String>,
}

impl ClassLimits {
    /// Check if a MIME type is allowed.
    #[must_use]
    pub fn is_mime_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_mime_types.iter().any(|t| t == mime_type)
    }

    /// Check if this class governs `folder`.
    #[must_use]
    pub fn governs(&self, folder: &str) -> bool {
        self.folders.iter().any(|f| f == folder)
    }
}

/// Immutable upload policy injected into the pipeline at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPolicy {
    /// Image limits.
    pub image: ClassLimits,
    /// Audio limits.
    pub audio: ClassLimits,
    /// Storage key policy.
    pub dedup: DedupPolicy,
    /// Reject folders outside every class instead of passing them through.
    pub strict_folders: bool,
}

impl Default for AssetPolicy {
    fn default() -> Self {
        Self {
            image: ClassLimits {
                allowed_mime_types: to_strings(&["image/jpeg", "image/png", "image/gif"]),
                max_size_bytes: Self::DEFAULT_IMAGE_MAX_BYTES,
                folders: to_strings(IMAGE_FOLDERS),
            },
            audio: ClassLimits {
                allowed_mime_types: to_strings(&["audio/mpeg", "audio/wav"]),
                max_size_bytes: Self::DEFAULT_AUDIO_MAX_BYTES,
                folders: to_strings(&[AUDIO_FOLDER]),
            },
            dedup: DedupPolicy::default(),
            strict_folders: false,
        }
    }
}

impl AssetPolicy {
    /// Default image cap: 2 MiB.
    pub const DEFAULT_IMAGE_MAX_BYTES: u64 = 2 * 1024 * 1024;
    /// Default audio cap: 15 MiB.
    pub const DEFAULT_AUDIO_MAX_BYTES: u64 = 15 * 1024 * 1024;

    /// Build a policy from upload settings.
    ///
    /// Returns `None` if the dedup policy name is unknown.
    #[must_use]
    pub fn from_config(config: &UploadConfig) -> Option<Self> {
        let dedup = DedupPolicy::parse(&config.dedup_policy)?;
        Some(
            Self::default()
                .with_dedup(dedup)
                .with_image_max_bytes(config.image_max_bytes)
                .with_audio_max_bytes(config.audio_max_bytes)
                .with_strict_folders(config.strict_folders),
        )
    }

    /// Set the storage key policy.
    #[must_use]
    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }

    /// Set the image size cap.
    #[must_use]
    pub fn with_image_max_bytes(mut self, max: u64) -> Self {
        self.image.max_size_bytes = max;
        self
    }

    /// Set the audio size cap.
    #[must_use]
    pub fn with_audio_max_bytes(mut self, max: u64) -> Self {
        self.audio.max_size_bytes = max;
        self
    }

    /// Set strict folder handling.
    #[must_use]
    pub fn with_strict_folders(mut self, strict: bool) -> Self {
        self.strict_folders = strict;
        self
    }

    /// Limits for a class.
    #[must_use]
    pub fn limits(&self, class: AssetClass) -> &ClassLimits {
        match class {
            AssetClass::Image => &self.image,
            AssetClass::Audio => &self.audio,
        }
    }

    /// Class governing `folder`, if any.
    #[must_use]
    pub fn class_for_folder(&self, folder: &str) -> Option<AssetClass> {
        if self.image.governs(folder) {
            Some(AssetClass::Image)
        } else if self.audio.governs(folder) {
            Some(AssetClass::Audio)
        } else {
            None
        }
    }

    /// Largest payload any class accepts.
    #[must_use]
    pub fn max_upload_bytes(&self) -> u64 {
        self.image.max_size_bytes.max(self.audio.max_size_bytes)
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}
