//! # Core Module
//!
//! Configuration and shared text utilities.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Add text module for notification truncation
//! - 1.0.0: Initial creation with config module

pub mod config;
pub mod text;

// Re-export commonly used items
pub use config::{Config, DictionaryEndpoints};
pub use text::{collapse_whitespace, truncate_for_body, truncate_for_title, truncate_with_ellipsis};
