//! Shared errors and configuration for Melodia.
//!
//! This crate provides common types used across all other crates:
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;

pub use config::{AppConfig, ServerConfig, StorageConfig, UploadConfig};
pub use error::AppError;
