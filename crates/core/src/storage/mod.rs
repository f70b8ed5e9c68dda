//! Object storage for catalog media using Apache OpenDAL.
//!
//! This module provides vendor-agnostic object storage with support for:
//! - Google Cloud Storage (production bucket)
//! - S3-compatible: Cloudflare R2, Supabase Storage, AWS S3, DigitalOcean Spaces
//! - Local filesystem (development only)
//! - In-process memory (tests)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   ObjectStore (async trait)                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ exists("key")      │ write("key", bytes, content_type)          │
//! │ make_public("key") │ delete("key")                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │              StorageService -> Apache OpenDAL Operator           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod service;
mod store;

pub use config::StorageProvider;
pub use error::StorageError;
pub use service::StorageService;
pub use store::ObjectStore;
