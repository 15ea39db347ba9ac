//! Storage Layer
//!
//! Handles the configuration file and the forecast and metadata documents
//! read from the local file trees.

pub mod config;
pub mod files;

pub use config::ConfigService;
pub use files::{CsvDocument, MetadataDocument};
