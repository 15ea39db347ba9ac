//! Data Models
//!
//! Configuration structures shared by the services.

pub mod config;

pub use config::*;
