//! Repository Path Utilities
//!
//! Mapping between repository-relative paths (always `/`-separated, as the
//! remote reports them) and files under the local working-copy and mirror
//! roots.

use std::path::{Path, PathBuf};

use crate::utils::error::AppResult;

/// File name of the hub configuration inside the config directory.
pub const CONFIG_FILE_NAME: &str = "validation-config.json";

/// Path of the configuration file for a config directory.
pub fn config_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Local path of a repository-relative path under `root`.
pub fn local_path(root: &Path, repository_path: &str) -> PathBuf {
    repository_path
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |path, part| path.join(part))
}

/// Repository-relative form of a local path under `root`, if it is under it.
pub fn repository_path(root: &Path, local: &Path) -> Option<String> {
    let relative = local.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Resolve a configured path against the config directory.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Ensure the parent directory of a file exists
pub fn ensure_parent_dir(path: &Path) -> AppResult<()> {
    match path.parent() {
        Some(parent) => ensure_dir(parent),
        None => Ok(()),
    }
}
