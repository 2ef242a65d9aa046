// EN: src/core/runner.rs

use crate::{
    constants::PLAN_MARKER_ENV,
    models::{RunDefinition, RunMode, RunReport},
    system::executor::{self, CommandSpec, RunError},
};
use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

/// Runs the definition's main command with its apply logs.
pub fn apply(definition: &RunDefinition, default_shell: &str) -> Result<RunReport, RunError> {
    let spec = build_spec(definition, default_shell, RunMode::Apply, &definition.command);
    run_spec(spec, RunMode::Apply)
}

/// Runs the definition's trial command with its plan logs and the
/// `ONESHOT_PLAN=1` marker.
///
/// Returns `Ok(None)` without running anything when no plan command is set.
pub fn plan(definition: &RunDefinition, default_shell: &str) -> Result<Option<RunReport>, RunError> {
    let Some(plan_command) = &definition.plan_command else {
        log::debug!("No plan command configured, skipping plan.");
        return Ok(None);
    };
    let spec = build_spec(definition, default_shell, RunMode::Plan, plan_command);
    run_spec(spec, RunMode::Plan).map(Some)
}

/// Builds the `CommandSpec` for one mode of a definition.
pub fn build_spec(
    definition: &RunDefinition,
    default_shell: &str,
    mode: RunMode,
    command: &str,
) -> CommandSpec {
    let (stdout_log, stderr_log) = match mode {
        RunMode::Apply => (&definition.stdout_log, &definition.stderr_log),
        RunMode::Plan => (&definition.plan_stdout_log, &definition.plan_stderr_log),
    };
    let mut spec = CommandSpec::new(definition.shell_or(default_shell), command)
        .logs(stdout_log, stderr_log);
    spec.working_dir = definition.working_dir.clone();
    if mode == RunMode::Plan {
        spec = spec.env(PLAN_MARKER_ENV);
    }
    spec
}

/// Runs a prepared spec and records the result as a report for `mode`.
pub fn run_spec(spec: CommandSpec, mode: RunMode) -> Result<RunReport, RunError> {
    let run_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    log::debug!("Running {} command with shell '{}'", mode, spec.shell);

    let output = executor::run(&spec)?;
    Ok(RunReport {
        mode,
        stdout: output.stdout,
        stderr: output.stderr,
        command: spec.command,
        run_at,
    })
}

/// Writes the captured streams back out byte for byte.
pub fn replay(report: &RunReport, stdout: &mut impl Write, stderr: &mut impl Write) -> io::Result<()> {
    stdout.write_all(&report.stdout)?;
    stdout.flush()?;
    stderr.write_all(&report.stderr)?;
    stderr.flush()
}
