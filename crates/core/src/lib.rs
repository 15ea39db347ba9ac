//! Hub Validations Core
//!
//! Foundational types for the hub-validations workspace. This crate has no
//! dependency on the pipeline, the remote host, or the application:
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `store` - Typed key-value store shared by the steps of one run
//!   (`Store`, `StoreKey`, `StoreUpdates`)

pub mod error;
pub mod store;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Run Store ──────────────────────────────────────────────────────────
pub use store::{Store, StoreKey, StoreUpdates};
