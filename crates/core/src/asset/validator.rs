//! Policy checks applied before any store call.

use super::error::UploadError;
use super::key::normalize_folder;
use super::policy::AssetPolicy;
use super::types::{AssetClass, UploadRequest};

/// Applies an [`AssetPolicy`] to incoming files. Pure, no I/O.
#[derive(Debug, Clone)]
pub struct Validator {
    policy: AssetPolicy,
}

impl Validator {
    /// Create a validator over a policy.
    #[must_use]
    pub fn new(policy: AssetPolicy) -> Self {
        Self { policy }
    }

    /// The policy this validator applies.
    #[must_use]
    pub fn policy(&self) -> &AssetPolicy {
        &self.policy
    }

    /// Gate a multipart part by field name and declared MIME type, before its
    /// bytes are buffered.
    ///
    /// Unknown fields fail with `UnexpectedField` ahead of any type check.
    pub fn admit_field(
        &self,
        field_name: &str,
        mime_type: &str,
        folder: &str,
    ) -> Result<AssetClass, UploadError> {
        let class = AssetClass::from_field_name(field_name)
            .ok_or_else(|| UploadError::unexpected_field(field_name))?;

        self.check_format(class, mime_type, folder)?;
        Ok(class)
    }

    /// Validate a decoded file against the class governing its folder.
    ///
    /// The folder is compared in its canonical form, so `albums/images/` is
    /// held to the image rules. Returns the governing class, or `None` for a
    /// folder outside every class (no constraint applies unless strict folder
    /// handling is on).
    pub fn validate(&self, request: &UploadRequest) -> Result<Option<AssetClass>, UploadError> {
        let folder = normalize_folder(&request.folder)?;
        let Some(class) = self.policy.class_for_folder(&folder) else {
            if self.policy.strict_folders {
                return Err(UploadError::UnknownFolder { folder });
            }
            return Ok(None);
        };

        self.check_format(class, &request.mime_type, &folder)?;

        let limit = self.policy.limits(class).max_size_bytes;
        if request.size_bytes > limit {
            return Err(UploadError::TooLarge {
                folder,
                class,
                size: request.size_bytes,
                limit,
            });
        }

        Ok(Some(class))
    }

    fn check_format(
        &self,
        class: AssetClass,
        mime_type: &str,
        folder: &str,
    ) -> Result<(), UploadError> {
        let limits = self.policy.limits(class);
        if limits.is_mime_type_allowed(mime_type) {
            return Ok(());
        }
        Err(UploadError::InvalidFormat {
            folder: folder.to_string(),
            class,
            mime_type: mime_type.to_string(),
            allowed: limits.allowed_mime_types.clone(),
        })
    }
}
