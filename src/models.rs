// EN: src/models.rs

use crate::constants::{DEFAULT_SHELL, DEFAULT_STDERR_LOG, DEFAULT_STDOUT_LOG};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// --- Run definitions ---

/// A command to run once, with an optional trial command that runs before it.
///
/// This is what a `oneshot.toml` file deserializes into:
///
/// ```toml
/// command = "make deploy"
/// plan_command = "make deploy-dry-run"
/// working_dir = "infra"
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RunDefinition {
    /// The command run by `apply`.
    pub command: String,
    /// The trial command run by `plan`, if any.
    #[serde(default)]
    pub plan_command: Option<String>,
    /// Overrides the configured default shell.
    #[serde(default)]
    pub shell: Option<String>,
    /// Stdout log of `command`. Empty disables it.
    #[serde(default = "default_stdout_log")]
    pub stdout_log: PathBuf,
    /// Stderr log of `command`. Empty disables it.
    #[serde(default = "default_stderr_log")]
    pub stderr_log: PathBuf,
    /// Stdout log of `plan_command`.
    #[serde(default = "default_stdout_log")]
    pub plan_stdout_log: PathBuf,
    /// Stderr log of `plan_command`.
    #[serde(default = "default_stderr_log")]
    pub plan_stderr_log: PathBuf,
    /// Directory both commands start in.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl RunDefinition {
    /// A definition for `command` with every other field at its default.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            plan_command: None,
            shell: None,
            stdout_log: default_stdout_log(),
            stderr_log: default_stderr_log(),
            plan_stdout_log: default_stdout_log(),
            plan_stderr_log: default_stderr_log(),
            working_dir: None,
        }
    }

    /// The shell to use, falling back to `default_shell`.
    pub fn shell_or<'a>(&'a self, default_shell: &'a str) -> &'a str {
        self.shell.as_deref().unwrap_or(default_shell)
    }
}

fn default_stdout_log() -> PathBuf {
    PathBuf::from(DEFAULT_STDOUT_LOG)
}

fn default_stderr_log() -> PathBuf {
    PathBuf::from(DEFAULT_STDERR_LOG)
}

// --- Configuration ---

/// User-level settings loaded from `config.toml`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OneshotConfig {
    /// Shell used when a run does not name one.
    #[serde(default = "default_shell")]
    pub default_shell: String,
}

impl Default for OneshotConfig {
    fn default() -> Self {
        Self {
            default_shell: default_shell(),
        }
    }
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

// --- Results ---

/// Whether a run is the real thing or a trial before it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// The real run.
    Apply,
    /// A trial run, marked with `ONESHOT_PLAN=1`.
    Plan,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apply => f.write_str("apply"),
            Self::Plan => f.write_str("plan"),
        }
    }
}

/// What a successful run produced, ready to be stored or printed.
///
/// The streams keep the exact bytes the command wrote. Only the serialized
/// form is text (invalid UTF-8 is replaced there).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Whether this was the real run or a trial.
    pub mode: RunMode,
    /// The command text handed to the shell.
    pub command: String,
    /// Everything the command wrote to stdout.
    #[serde(with = "lossy_text")]
    pub stdout: Vec<u8>,
    /// Everything the command wrote to stderr.
    #[serde(with = "lossy_text")]
    pub stderr: Vec<u8>,
    /// Start of the run, in seconds since the UNIX epoch.
    pub run_at: u64,
}

/// Serializes captured bytes as a string, for JSON and TOML reports.
mod lossy_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        String::deserialize(deserializer).map(String::into_bytes)
    }
}
