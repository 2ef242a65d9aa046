// EN: src/cli.rs

use crate::{constants::PLAN_MARKER_ENV, models::RunMode, system::executor::CommandSpec};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// oneshot: run a shell command exactly once and capture its output.
///
/// The command's stdout and stderr are buffered in full and, when log paths are
/// given, written to those files as well. On success they are replayed to this
/// process's stdout and stderr. On failure the error, including everything the
/// command printed, goes to stderr.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Read `default_shell` from this file instead of the user config.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print a JSON report instead of replaying the captured output.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub action: Action,
}

/// What the invocation asks oneshot to do.
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Run a command.
    Run(CommandArgs),
    /// Run a command as a trial, with `ONESHOT_PLAN=1` in its environment.
    Plan(CommandArgs),
    /// Run the `command` of a run definition file.
    Apply {
        /// Path to the run definition (TOML).
        file: PathBuf,
    },
    /// Run the `plan_command` of a run definition file, if it has one.
    PlanFile {
        /// Path to the run definition (TOML).
        file: PathBuf,
    },
}

/// Options shared by `run` and `plan`.
#[derive(Args, Debug, Default)]
pub struct CommandArgs {
    /// The command text, passed to the shell as its final argument.
    pub command: String,

    /// The shell and its flags (e.g. "/bin/bash -c"). Defaults to the configured shell.
    #[arg(long)]
    pub shell: Option<String>,

    /// Also write the command's stdout to this file (truncated first).
    #[arg(long)]
    pub stdout_log: Option<PathBuf>,

    /// Also write the command's stderr to this file (truncated first).
    #[arg(long)]
    pub stderr_log: Option<PathBuf>,

    /// Start the command in this directory.
    #[arg(long)]
    pub working_dir: Option<PathBuf>,

    /// Extra environment entries (e.g. "KEY=VALUE"). Later entries win.
    #[arg(long = "env", short = 'e', num_args = 1)]
    pub env: Vec<String>,
}

impl CommandArgs {
    /// Builds the spec for an ad-hoc run. In plan mode the marker goes in
    /// before the user's `--env` entries, so `--env ONESHOT_PLAN=0` overrides it.
    pub fn into_spec(self, mode: RunMode, default_shell: &str) -> CommandSpec {
        let mut spec = CommandSpec::new(
            self.shell.as_deref().unwrap_or(default_shell),
            self.command,
        );
        if mode == RunMode::Plan {
            spec = spec.env(PLAN_MARKER_ENV);
        }
        spec.extra_env.extend(self.env);
        spec.stdout_log = self.stdout_log;
        spec.stderr_log = self.stderr_log;
        spec.working_dir = self.working_dir;
        spec
    }
}
