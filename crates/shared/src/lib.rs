//! Shared library for the anistream project.
//!
//! This crate provides common functionality used by the API client and CLI:
//! - Configuration management
//! - Data models for the upstream anime API
//! - SQLite connection and schema for the persistent cache
//! - Logging infrastructure

pub mod config;
pub mod db;
pub mod logging;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use logging::LogConfig;
pub use models::*;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
