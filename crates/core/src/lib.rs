//! Core ingestion logic for Melodia.
//!
//! This crate contains the media asset pipeline with ZERO web dependencies.
//!
//! # Modules
//!
//! - `asset` - Validation, key policy, dedup and publishing of uploaded media
//! - `storage` - Object store abstraction over Apache OpenDAL

pub mod asset;
pub mod storage;
