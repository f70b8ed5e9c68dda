//! Asset types and data structures.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Asset class governing validation limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    /// Cover art, artist photos, avatars.
    Image,
    /// Song audio.
    Audio,
}

impl AssetClass {
    /// Convert to string value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }

    /// Multipart field name that carries this class.
    #[must_use]
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "file_song",
        }
    }

    /// Class carried by a multipart field name.
    #[must_use]
    pub fn from_field_name(field: &str) -> Option<Self> {
        match field {
            "image" => Some(Self::Image),
            "file_song" => Some(Self::Audio),
            _ => None,
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded file bound for a target folder.
///
/// Built by the upstream multipart decoder and consumed by value exactly once
/// by [`AssetService`](super::AssetService).
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Multipart field the file arrived in.
    pub field_name: String,
    /// File name supplied by the client.
    pub original_name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// Payload size in bytes.
    pub size_bytes: u64,
    /// Fully buffered payload.
    pub bytes: Bytes,
    /// Target folder, e.g. `songs/images`.
    pub folder: String,
}

impl UploadRequest {
    /// Create a request; the size is taken from the buffer.
    #[must_use]
    pub fn new(
        field_name: impl Into<String>,
        original_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Bytes,
        folder: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            original_name: original_name.into(),
            mime_type: mime_type.into(),
            size_bytes: bytes.len() as u64,
            bytes,
            folder: folder.into(),
        }
    }
}

/// Path-like identifier of an object in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    pub(crate) fn new(key: String) -> Self {
        Self(key)
    }

    /// Borrow the key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path segment (the stored file name).
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public locator of a stored asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PublicUrl(String);

impl PublicUrl {
    /// Derive the URL of `key` in `bucket`.
    ///
    /// Deterministic: the same inputs always give a byte-identical URL.
    #[must_use]
    pub fn compute(base_url: &str, bucket: &str, key: &StorageKey) -> Self {
        Self(format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            bucket,
            key.as_str()
        ))
    }

    /// Borrow the URL as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the URL string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PublicUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Key the asset lives under.
    pub key: StorageKey,
    /// Public URL of the asset.
    pub url: PublicUrl,
    /// True when the key already existed and nothing was written.
    pub deduplicated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_class_field_names() {
        for class in [AssetClass::Image, AssetClass::Audio] {
            assert_eq!(AssetClass::from_field_name(class.field_name()), Some(class));
        }
        assert_eq!(AssetClass::from_field_name("avatar"), None);
    }

    #[test]
    fn test_upload_request_size_from_buffer() {
        let req = UploadRequest::new(
            "image",
            "cover.png",
            "image/png",
            Bytes::from(vec![0u8; 1234]),
            "albums/images",
        );
        assert_eq!(req.size_bytes, 1234);
    }

    #[test]
    fn test_public_url_compute() {
        let key = StorageKey::new("albums/images/cover.png".to_string());
        let url = PublicUrl::compute("https://storage.googleapis.com", "melodia", &key);
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/melodia/albums/images/cover.png"
        );
    }

    #[test]
    fn test_public_url_trims_trailing_slash() {
        let key = StorageKey::new("songs/audio/a.mp3".to_string());
        let url = PublicUrl::compute("https://cdn.example.com/", "b", &key);
        assert_eq!(url.as_str(), "https://cdn.example.com/b/songs/audio/a.mp3");
    }

    #[test]
    fn test_storage_key_file_name() {
        let key = StorageKey::new("songs/images/1700000000000_cover.png".to_string());
        assert_eq!(key.file_name(), "1700000000000_cover.png");
    }
}
