//! Binary asset ingestion pipeline.
//!
//! Turns a decoded upload into a public URL:
//!
//! ```text
//! UploadRequest ─► Validator ─► KeyResolver ─► KeyLocks ─► ExistenceChecker ─┬─► URL (dedup)
//!                  (pure)       (DedupPolicy)  (per key)   (store probe)      └─► Publisher ─► URL
//!                                                                                  write + make public
//! ```
//!
//! Validation runs before any store call. Store failures carry the key and
//! cause, and never produce a URL.

mod error;
mod existence;
mod key;
mod locks;
mod policy;
mod publisher;
mod service;
mod types;
mod validator;

pub use error::UploadError;
pub use existence::ExistenceChecker;
pub use key::{KeyResolver, normalize_folder};
pub use locks::{KeyGuard, KeyLocks};
pub use policy::{AUDIO_FOLDER, AssetPolicy, ClassLimits, DedupPolicy, IMAGE_FOLDERS};
pub use publisher::Publisher;
pub use service::AssetService;
pub use types::{AssetClass, PublicUrl, StorageKey, UploadOutcome, UploadRequest};
pub use validator::Validator;
