//! Services
//!
//! The GitHub-backed hub remote and the pull request validation steps.

pub mod github;
pub mod validation;

pub use github::GitHubRemote;
pub use validation::{build_pull_request_run, pull_request_steps, seed_store};
