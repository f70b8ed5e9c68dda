//! Upload error types.

use std::time::Duration;

use thiserror::Error;

use super::types::AssetClass;
use crate::storage::StorageError;

/// Asset ingestion errors.
///
/// Validation variants are raised before any store call and are terminal.
/// Store variants carry the key and the underlying cause.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Multipart field is neither the image nor the audio field.
    #[error("unexpected field '{field}'")]
    UnexpectedField {
        /// Offending field name.
        field: String,
    },

    /// MIME type not accepted for the asset class.
    #[error("invalid {class} format '{mime_type}' for {folder}: allowed {}", .allowed.join(", "))]
    InvalidFormat {
        /// Target folder.
        folder: String,
        /// Asset class of the folder (or field).
        class: AssetClass,
        /// Declared MIME type.
        mime_type: String,
        /// Accepted MIME types.
        allowed: Vec<String>,
    },

    /// Payload exceeds the class size cap.
    #[error("{class} size {size} bytes exceeds {limit} byte limit for {folder}")]
    TooLarge {
        /// Target folder.
        folder: String,
        /// Asset class of the folder.
        class: AssetClass,
        /// Actual size.
        size: u64,
        /// Size cap.
        limit: u64,
    },

    /// Folder outside every class while strict folder handling is on.
    #[error("unknown upload folder '{folder}'")]
    UnknownFolder {
        /// Offending folder.
        folder: String,
    },

    /// Folder is empty or has an empty, `.` or `..` segment.
    #[error("invalid upload folder '{folder}'")]
    InvalidFolder {
        /// Offending folder.
        folder: String,
    },

    /// File name is empty once reduced to a safe key segment.
    #[error("invalid file name '{name}'")]
    InvalidFileName {
        /// Original name.
        name: String,
    },

    /// The store could not answer whether the key exists.
    #[error("storage unavailable while checking {key}: {source}")]
    StorageUnavailable {
        /// Key being probed.
        key: String,
        /// Underlying cause.
        #[source]
        source: StorageError,
    },

    /// Writing the payload failed.
    #[error("upload of {key} failed: {source}")]
    UploadFailed {
        /// Key being written.
        key: String,
        /// Underlying cause.
        #[source]
        source: StorageError,
    },

    /// The payload was written but could not be made public.
    #[error("publishing {key} failed: {source}")]
    PublishFailed {
        /// Key being published.
        key: String,
        /// Underlying cause.
        #[source]
        source: StorageError,
    },

    /// The whole operation ran past its deadline.
    #[error("upload of {key} exceeded deadline of {}s", .after.as_secs())]
    DeadlineExceeded {
        /// Key being processed.
        key: String,
        /// Configured deadline.
        after: Duration,
    },
}

impl UploadError {
    /// Create an unexpected field error.
    #[must_use]
    pub fn unexpected_field(field: impl Into<String>) -> Self {
        Self::UnexpectedField {
            field: field.into(),
        }
    }

    /// Whether the caller may retry the same upload.
    ///
    /// Store failures are potentially transient; validation failures need a
    /// corrected file.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable { .. }
                | Self::UploadFailed { .. }
                | Self::PublishFailed { .. }
                | Self::DeadlineExceeded { .. }
        )
    }
}
