//! # Config Loader
//!
//! Resolves the default shell from, in increasing priority: the built-in
//! default, `config.toml`, and the `ONESHOT_DEFAULT_SHELL` environment variable.
//! A `--shell` flag or a run definition's own `shell` sits above all of these
//! and is applied by the caller.

use crate::{
    constants::DEFAULT_SHELL_ENV_VAR,
    core::paths::{self, PathError},
    models::OneshotConfig,
};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Why the configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config directory could not be located.
    #[error(transparent)]
    Path(#[from] PathError),
    /// The file exists (or was named explicitly) but could not be read.
    #[error("Could not read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for `OneshotConfig`.
    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Loads the configuration from `explicit_path`, or from the user config file
/// when no path is given.
///
/// A missing user config file is not an error: the defaults apply. A missing
/// *explicit* file is, since the user asked for it by name.
pub fn load_config(explicit_path: Option<&Path>) -> Result<OneshotConfig, ConfigError> {
    let config = match explicit_path {
        Some(path) => read_config_file(path)?,
        None => read_config_or_default(&paths::get_config_file_path()?)?,
    };
    Ok(apply_shell_override(config, env::var(DEFAULT_SHELL_ENV_VAR).ok()))
}

/// Replaces `default_shell` with the `ONESHOT_DEFAULT_SHELL` value, unless it
/// is absent or blank.
pub fn apply_shell_override(mut config: OneshotConfig, shell: Option<String>) -> OneshotConfig {
    if let Some(shell) = shell
        && !shell.trim().is_empty()
    {
        log::debug!("Default shell overridden by {}: {}", DEFAULT_SHELL_ENV_VAR, shell);
        config.default_shell = shell;
    }
    config
}

fn read_config_or_default(path: &Path) -> Result<OneshotConfig, ConfigError> {
    if path.exists() {
        read_config_file(path)
    } else {
        log::debug!("No config file at '{}', using defaults.", path.display());
        Ok(OneshotConfig::default())
    }
}

fn read_config_file(path: &Path) -> Result<OneshotConfig, ConfigError> {
    log::debug!("Loading config from '{}'", path.display());
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}
