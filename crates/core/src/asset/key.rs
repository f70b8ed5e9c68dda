//! Storage key derivation.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use super::error::UploadError;
use super::policy::DedupPolicy;
use super::types::StorageKey;

/// Computes the storage key for a file in a folder.
#[derive(Debug)]
pub struct KeyResolver {
    policy: DedupPolicy,
    salt: SaltSource,
}

impl KeyResolver {
    /// Create a resolver for a dedup policy.
    #[must_use]
    pub fn new(policy: DedupPolicy) -> Self {
        Self {
            policy,
            salt: SaltSource::default(),
        }
    }

    /// The policy this resolver applies.
    #[must_use]
    pub fn policy(&self) -> DedupPolicy {
        self.policy
    }

    /// Resolve the key for `original_name` in `folder`.
    ///
    /// - `NameStable`: `folder/name`
    /// - `AlwaysUnique`: `folder/<millis>_name`, never repeating within a process
    pub fn resolve(&self, folder: &str, original_name: &str) -> Result<StorageKey, UploadError> {
        let name = sanitize_filename(original_name);
        if name.is_empty() || name.chars().all(|c| c == '.') {
            return Err(UploadError::InvalidFileName {
                name: original_name.to_string(),
            });
        }

        let folder = normalize_folder(folder)?;
        let key = match self.policy {
            DedupPolicy::NameStable => format!("{folder}/{name}"),
            DedupPolicy::AlwaysUnique => format!("{folder}/{}_{name}", self.salt.next()),
        };

        Ok(StorageKey::new(key))
    }
}

/// Canonical form of an upload folder: no leading or trailing slash.
///
/// # Errors
///
/// Returns `InvalidFolder` when the folder is empty or any segment is empty,
/// `.` or `..`.
pub fn normalize_folder(folder: &str) -> Result<String, UploadError> {
    let trimmed = folder.trim().trim_matches('/');
    let valid = !trimmed.is_empty()
        && trimmed
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");

    if valid {
        Ok(trimmed.to_string())
    } else {
        Err(UploadError::InvalidFolder {
            folder: folder.to_string(),
        })
    }
}

/// Millisecond timestamps that strictly increase across calls.
#[derive(Debug, Default)]
struct SaltSource {
    last: AtomicI64,
}

impl SaltSource {
    fn next(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self.last.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

/// Reduce a client file name to a safe key segment.
///
/// Drops any directory part, then keeps only ASCII alphanumeric characters,
/// dots, hyphens, and underscores.
fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    base.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
