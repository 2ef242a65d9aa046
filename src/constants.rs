// EN: src/constants.rs

/// The shell used when neither the run definition, the CLI nor the config names one.
pub const DEFAULT_SHELL: &str = "/bin/bash -c";

/// Default log file for a command's standard output.
pub const DEFAULT_STDOUT_LOG: &str = "stdout.log";

/// Default log file for a command's standard error.
pub const DEFAULT_STDERR_LOG: &str = "stderr.log";

/// Environment entry added to every plan run so the command can tell it is a trial.
pub const PLAN_MARKER_ENV: &str = "ONESHOT_PLAN=1";

/// Overrides `default_shell` from the config file.
pub const DEFAULT_SHELL_ENV_VAR: &str = "ONESHOT_DEFAULT_SHELL";

/// Name of the directory holding oneshot's configuration (inside the system config dir).
pub const CONFIG_DIR_NAME: &str = "oneshot";

/// The name of the main configuration file (inside the config dir).
pub const CONFIG_FILENAME: &str = "config.toml";
