//! Docpreview Core Library
//!
//! This crate provides the domain models, error types, configuration, and the
//! pure decision logic (filename sanitizing, format routing) shared across all
//! pipeline components.

pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod report;
pub mod sanitize;

// Re-export commonly used types
pub use config::{Config, StorageBackend};
pub use error::PreviewError;
pub use format::{needs_legacy_conversion, pdf_file_name, LEGACY_DOC_EXTENSION, LEGACY_DOC_MIME};
pub use report::StatusReporter;
pub use sanitize::sanitize_file_name;
