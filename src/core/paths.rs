// EN: src/core/paths.rs

use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILENAME};
use lazy_static::lazy_static;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

lazy_static! {
    static ref ONESHOT_CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

/// Errors locating oneshot's directories.
#[derive(Error, Debug)]
pub enum PathError {
    /// The platform reports no config directory (e.g. no `HOME`).
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
}

/// Returns the path to the oneshot configuration directory (`~/.config/oneshot`).
///
/// The directory is not created: oneshot only ever reads from it. The first
/// call computes the path and caches it.
pub fn get_oneshot_config_dir() -> Result<PathBuf, PathError> {
    let mut cached_path_guard = ONESHOT_CONFIG_DIR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(path) = &*cached_path_guard {
        return Ok(path.clone());
    }

    let config_path = dirs::config_dir()
        .ok_or(PathError::ConfigDirNotFound)?
        .join(CONFIG_DIR_NAME);
    let config_path = dunce::simplified(&config_path).to_path_buf();

    *cached_path_guard = Some(config_path.clone());
    Ok(config_path)
}

/// Returns the path to the user-level `config.toml`.
pub fn get_config_file_path() -> Result<PathBuf, PathError> {
    get_oneshot_config_dir().map(|dir| dir.join(CONFIG_FILENAME))
}
