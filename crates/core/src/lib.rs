//! RIS Core Library
//!
//! This crate provides the foundational utilities for the reverse image search CLI:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure (text or JSON lines on stderr)
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, DuplicatePolicy};
pub use error::{AppError, AppResult};
pub use logging::LogFormat;
