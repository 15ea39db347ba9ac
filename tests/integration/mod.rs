//! Integration Tests Module
//!
//! Full validation runs against an in-memory hub remote, and configuration
//! loading from a config directory.

// Recording remote and run helpers
mod support;

// End-to-end pull request runs
mod pipeline_test;

// Config directory loading
mod config_test;
