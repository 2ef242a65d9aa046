// EN: src/system/executor.rs

use super::capture::{self, Captured, LogFile, StreamKind};
use super::environment::Environment;
use super::shell;
use std::borrow::Cow;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use thiserror::Error;

/// Every way a single run can fail.
///
/// The `Execution` message shape is matched by external tooling:
/// `Failed to execute command: <reason>\n[STDOUT] <stdout>\n[STDERR] <stderr>\n`.
#[derive(Error, Debug)]
pub enum RunError {
    /// The shell invocation has unbalanced quotes or a dangling escape.
    #[error("Shell invocation could not be parsed: {0}")]
    Parse(String),
    /// The shell invocation holds no executable word.
    #[error("Shell invocation '{0}' does not name an executable.")]
    EmptyInvocation(String),
    /// An extra environment entry lacks `KEY=`.
    #[error("Environment entry '{0}' is not of the form KEY=VALUE.")]
    InvalidEnvEntry(String),
    /// The shell could not be spawned.
    #[error("Command '{program}' could not be executed: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    /// A log file could not be created; nothing was run.
    #[error("Could not open {stream} log '{}': {source}", path.display())]
    LogOpen {
        stream: StreamKind,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The command ran and failed. `stdout` and `stderr` are printed as
    /// captured: the blank line after each block comes from the output's own
    /// trailing newline, none is added.
    #[error("Failed to execute command: {reason}\n[STDOUT] {stdout}\n[STDERR] {stderr}\n")]
    Execution {
        reason: String,
        stdout: String,
        stderr: String,
    },
}

/// One command to run through a shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// The shell and its flags, e.g. `/bin/bash -c`. May start with `KEY=VALUE`
    /// assignments.
    pub shell: String,
    /// Passed to the shell as its final argument.
    pub command: String,
    /// `KEY=VALUE` entries applied after the shell's own assignments.
    pub extra_env: Vec<String>,
    /// File that receives a copy of stdout.
    pub stdout_log: Option<PathBuf>,
    /// File that receives a copy of stderr.
    pub stderr_log: Option<PathBuf>,
    /// Directory the child starts in. Relative log paths resolve against it.
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    /// A spec with no extra environment, logs or working directory.
    pub fn new(shell: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            command: command.into(),
            ..Default::default()
        }
    }

    /// Appends one `KEY=VALUE` entry.
    pub fn env(mut self, entry: impl Into<String>) -> Self {
        self.extra_env.push(entry.into());
        self
    }

    /// Sets both log paths. An empty path disables that file sink.
    pub fn logs(mut self, stdout: impl Into<PathBuf>, stderr: impl Into<PathBuf>) -> Self {
        self.stdout_log = Some(stdout.into());
        self.stderr_log = Some(stderr.into());
        self
    }

    /// Starts the child in `dir`.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn log_path(&self, stream: StreamKind) -> Option<PathBuf> {
        let path = match stream {
            StreamKind::Stdout => self.stdout_log.as_deref(),
            StreamKind::Stderr => self.stderr_log.as_deref(),
        }?;
        if path.as_os_str().is_empty() {
            return None;
        }
        Some(match &self.working_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        })
    }
}

/// The complete output of a command that exited with status 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Bytes written to stdout.
    pub stdout: Vec<u8>,
    /// Bytes written to stderr.
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Stdout as text, with invalid UTF-8 replaced.
    pub fn stdout_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// Stderr as text, with invalid UTF-8 replaced.
    pub fn stderr_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

/// Runs `spec.command` through `spec.shell` exactly once and waits for it.
///
/// The sequence is:
/// 1. Tokenize the shell and validate `extra_env`.
/// 2. Open the requested log files, truncating them. Nothing is spawned if one fails.
/// 3. Spawn `argv + [command]` with the inherited environment, the shell's own
///    assignments and `extra_env` layered in that order (last wins per key).
/// 4. Drain stdout and stderr concurrently into memory and their log files.
/// 5. Wait, then report.
///
/// # Errors
/// Setup failures (`Parse`, `EmptyInvocation`, `InvalidEnvEntry`, `LogOpen`,
/// `Launch`) are returned as-is. A nonzero exit, a failed wait or a failed log
/// write after start becomes [`RunError::Execution`], carrying everything the
/// child printed.
pub fn run(spec: &CommandSpec) -> Result<CommandOutput, RunError> {
    let invocation = shell::tokenize(&spec.shell)?;

    let mut env = Environment::inherited();
    env.extend_assignments(&invocation.env)?;
    env.extend_assignments(&spec.extra_env)?;

    let mut stdout_log = open_log(spec, StreamKind::Stdout)?;
    let mut stderr_log = open_log(spec, StreamKind::Stderr)?;

    let mut command = Command::new(invocation.program());
    command
        .args(invocation.args())
        .arg(&spec.command)
        .env_clear()
        .envs(env.iter())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &spec.working_dir {
        command.current_dir(dunce::simplified(dir));
    }

    let mut child = command.spawn().map_err(|e| RunError::Launch {
        program: invocation.program().to_string(),
        source: e,
    })?;
    log::debug!(
        "Spawned '{}' (PID: {}) for command: {}",
        invocation.program(),
        child.id(),
        spec.command
    );

    let (status, stdout, stderr) =
        wait_with_capture(&mut child, stdout_log.as_mut(), stderr_log.as_mut());
    // Close both logs before reporting.
    drop(stdout_log);
    drop(stderr_log);

    finish(status, stdout, stderr)
}

fn open_log(spec: &CommandSpec, stream: StreamKind) -> Result<Option<LogFile>, RunError> {
    spec.log_path(stream)
        .map(|path| {
            LogFile::create(stream, &path).map_err(|e| RunError::LogOpen {
                stream,
                path,
                source: e,
            })
        })
        .transpose()
}

/// Drains both pipes on their own threads while the main thread waits, so a
/// child filling one pipe never blocks on the other.
fn wait_with_capture(
    child: &mut Child,
    stdout_log: Option<&mut LogFile>,
    stderr_log: Option<&mut LogFile>,
) -> (io::Result<ExitStatus>, io::Result<Captured>, io::Result<Captured>) {
    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    thread::scope(|scope| {
        let stdout_reader = scope.spawn(move || match stdout_pipe {
            Some(pipe) => capture::drain(pipe, stdout_log),
            None => Ok(Captured::default()),
        });
        let stderr_reader = scope.spawn(move || match stderr_pipe {
            Some(pipe) => capture::drain(pipe, stderr_log),
            None => Ok(Captured::default()),
        });

        let status = child.wait();
        (
            status,
            join_reader(stdout_reader),
            join_reader(stderr_reader),
        )
    })
}

fn join_reader(handle: thread::ScopedJoinHandle<'_, io::Result<Captured>>) -> io::Result<Captured> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("pipe reader panicked")))
}

fn finish(
    status: io::Result<ExitStatus>,
    stdout: io::Result<Captured>,
    stderr: io::Result<Captured>,
) -> Result<CommandOutput, RunError> {
    let mut reasons = Vec::new();
    let (stdout, stderr) = {
        let mut take = |captured: io::Result<Captured>| match captured {
            Ok(c) => {
                if let Some(e) = c.log_error {
                    reasons.push(e.to_string());
                }
                c.bytes
            }
            Err(e) => {
                reasons.push(e.to_string());
                Vec::new()
            }
        };
        (take(stdout), take(stderr))
    };

    // The child's own failure takes precedence over capture failures.
    match status {
        Ok(status) if status.success() => {}
        Ok(status) => reasons.insert(0, describe_exit(status)),
        Err(e) => reasons.insert(0, e.to_string()),
    }
    if let Some(reason) = reasons.first() {
        log::debug!("Command failed: {}", reason);
    }

    match reasons.into_iter().next() {
        None => Ok(CommandOutput { stdout, stderr }),
        Some(reason) => Err(RunError::Execution {
            reason,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        }),
    }
}

/// Renders an unsuccessful exit as `exit status N`, or `signal: NAME` for a
/// child killed by a signal.
pub fn describe_exit(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit status {}", code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("signal: {}", signal_name(signal));
        }
    }
    status.to_string()
}

#[cfg(unix)]
fn signal_name(signal: i32) -> Cow<'static, str> {
    let name = match signal {
        1 => "hangup",
        2 => "interrupt",
        3 => "quit",
        4 => "illegal instruction",
        6 => "aborted",
        9 => "killed",
        11 => "segmentation fault",
        13 => "broken pipe",
        14 => "alarm clock",
        15 => "terminated",
        other => return Cow::Owned(format!("signal {}", other)),
    };
    Cow::Borrowed(name)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const BASH: &str = "/bin/bash -c";

    fn bash(command: &str) -> CommandSpec {
        CommandSpec::new(BASH, command)
    }

    #[test]
    fn test_run_captures_both_streams() {
        let output = run(&bash("echo hello ; echo world 1>&2")).unwrap();
        assert_eq!(output.stdout_str(), "hello\n");
        assert_eq!(output.stderr_str(), "world\n");
    }

    #[test]
    fn test_run_nonzero_exit_renders_envelope() {
        let err = run(&bash("echo stdout ; echo stderr 1>&2 ; exit 111")).unwrap_err();
        assert!(matches!(err, RunError::Execution { .. }));
        assert_eq!(
            err.to_string(),
            "Failed to execute command: exit status 111\n[STDOUT] stdout\n\n[STDERR] stderr\n\n"
        );
    }

    #[test]
    fn test_run_false_reports_exit_status_one() {
        let err = run(&bash("echo stdout ; echo stderr 1>&2 ; false")).unwrap_err();
        assert!(err.to_string().contains(
            "Failed to execute command: exit status 1\n[STDOUT] stdout\n\n[STDERR] stderr\n\n"
        ));
    }

    #[test]
    fn test_run_envelope_without_trailing_newlines() {
        let err = run(&bash("printf out ; printf err 1>&2 ; exit 2")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to execute command: exit status 2\n[STDOUT] out\n[STDERR] err\n"
        );
    }

    #[test]
    fn test_run_passes_extra_env() {
        let spec = bash("echo $FOO ; echo $ZOO 1>&2")
            .env("FOO=BAR")
            .env("ZOO=BAZ");
        let output = run(&spec).unwrap();
        assert_eq!(output.stdout_str(), "BAR\n");
        assert_eq!(output.stderr_str(), "BAZ\n");
    }

    #[test]
    fn test_extra_env_overrides_shell_assignment() {
        let shell_only = CommandSpec::new("FOO=shell /bin/sh -c", "echo $FOO");
        assert_eq!(run(&shell_only).unwrap().stdout_str(), "shell\n");

        let overridden = shell_only.clone().env("FOO=extra");
        assert_eq!(run(&overridden).unwrap().stdout_str(), "extra\n");
    }

    #[test]
    fn test_later_extra_env_wins() {
        let spec = bash("echo $FOO").env("FOO=first").env("FOO=second");
        assert_eq!(run(&spec).unwrap().stdout_str(), "second\n");
    }

    #[test]
    fn test_extra_env_overrides_inherited() {
        let spec = bash("echo $HOME").env("HOME=/elsewhere");
        assert_eq!(run(&spec).unwrap().stdout_str(), "/elsewhere\n");
    }

    #[test]
    fn test_plan_marker_is_passed_through() {
        let spec = bash("echo ${ONESHOT_PLAN:-0}").env("ONESHOT_PLAN=1");
        assert_eq!(run(&spec).unwrap().stdout_str(), "1\n");
    }

    #[test]
    fn test_run_writes_logs_matching_output() {
        let dir = tempdir().unwrap();
        let out_log = dir.path().join("stdout.log");
        let err_log = dir.path().join("stderr.log");

        let spec = bash("echo stdout ; echo stderr 1>&2").logs(&out_log, &err_log);
        let output = run(&spec).unwrap();

        assert_eq!(output.stdout, fs::read(&out_log).unwrap());
        assert_eq!(output.stderr, fs::read(&err_log).unwrap());
        assert_eq!(fs::read_to_string(&out_log).unwrap(), "stdout\n");
    }

    #[test]
    fn test_rerun_truncates_logs() {
        let dir = tempdir().unwrap();
        let out_log = dir.path().join("stdout.log");
        let err_log = dir.path().join("stderr.log");

        run(&bash("echo a long first line ; echo first 1>&2").logs(&out_log, &err_log)).unwrap();
        run(&bash("echo two").logs(&out_log, &err_log)).unwrap();

        assert_eq!(fs::read_to_string(&out_log).unwrap(), "two\n");
        assert_eq!(fs::read_to_string(&err_log).unwrap(), "");
    }

    #[test]
    fn test_logs_are_written_on_failure_too() {
        let dir = tempdir().unwrap();
        let out_log = dir.path().join("stdout.log");
        let err_log = dir.path().join("stderr.log");

        let err = run(&bash("echo partial ; exit 3").logs(&out_log, &err_log)).unwrap_err();
        assert!(err.to_string().contains("exit status 3"));
        assert_eq!(fs::read_to_string(&out_log).unwrap(), "partial\n");
    }

    #[test]
    fn test_empty_log_path_disables_file_sink() {
        let spec = bash("echo hi").logs("", "");
        assert_eq!(run(&spec).unwrap().stdout_str(), "hi\n");
    }

    #[test]
    fn test_parse_error_runs_nothing() {
        let dir = tempdir().unwrap();
        let out_log = dir.path().join("stdout.log");
        let spec = CommandSpec::new("'unterminated", "echo hi").logs(&out_log, "");

        let err = run(&spec).unwrap_err();
        assert!(matches!(err, RunError::Parse(_)));
        assert!(!out_log.exists());
    }

    #[test]
    fn test_empty_shell_is_rejected() {
        let err = run(&CommandSpec::new("", "echo hi")).unwrap_err();
        assert!(matches!(err, RunError::EmptyInvocation(_)));
    }

    #[test]
    fn test_invalid_env_entry_is_rejected() {
        let err = run(&bash("echo hi").env("NOT_AN_ASSIGNMENT")).unwrap_err();
        assert!(matches!(err, RunError::InvalidEnvEntry(_)));
    }

    #[test]
    fn test_missing_shell_is_launch_error() {
        let err = run(&CommandSpec::new("/nonexistent/shell -c", "echo hi")).unwrap_err();
        match err {
            RunError::Launch { program, source } => {
                assert_eq!(program, "/nonexistent/shell");
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_log_open_failure_prevents_launch() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("ran");
        let bad_log = dir.path().join("missing").join("stderr.log");
        let spec = bash(&format!("touch '{}'", marker.display()))
            .logs(dir.path().join("stdout.log"), &bad_log);

        let err = run(&spec).unwrap_err();
        match &err {
            RunError::LogOpen { stream, path, .. } => {
                assert_eq!(*stream, StreamKind::Stderr);
                assert_eq!(path, &bad_log);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().starts_with("Could not open stderr log"));
        assert!(!marker.exists());
    }

    #[test]
    fn test_working_dir_and_relative_logs() {
        let dir = tempdir().unwrap();
        let spec = bash("pwd -P")
            .logs("stdout.log", "stderr.log")
            .working_dir(dir.path());

        let output = run(&spec).unwrap();
        let expected = fs::canonicalize(dir.path()).unwrap();
        assert_eq!(output.stdout_str().trim_end(), expected.to_string_lossy());
        assert_eq!(
            fs::read(dir.path().join("stdout.log")).unwrap(),
            output.stdout
        );
        assert!(dir.path().join("stderr.log").exists());
    }

    #[test]
    fn test_large_output_on_both_streams_does_not_deadlock() {
        let spec = bash(
            "head -c 1000000 /dev/zero | tr '\\0' a ; head -c 1000000 /dev/zero | tr '\\0' b 1>&2",
        );
        let output = run(&spec).unwrap();
        assert_eq!(output.stdout.len(), 1_000_000);
        assert_eq!(output.stderr.len(), 1_000_000);
        assert!(output.stdout.iter().all(|b| *b == b'a'));
        assert!(output.stderr.iter().all(|b| *b == b'b'));
    }

    #[test]
    fn test_non_utf8_output_is_kept_verbatim() {
        let output = run(&bash("printf '\\377\\000x'")).unwrap();
        assert_eq!(output.stdout, vec![0xff, 0x00, b'x']);
    }

    #[test]
    fn test_signal_termination_is_described() {
        let err = run(&bash("echo before ; kill -9 $$")).unwrap_err();
        assert!(
            err.to_string()
                .starts_with("Failed to execute command: signal: killed\n[STDOUT] before\n")
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_log_write_failure_becomes_execution_error() {
        let spec = bash("echo hi").logs("/dev/full", "");
        let err = run(&spec).unwrap_err();
        match err {
            RunError::Execution { stdout, .. } => assert_eq!(stdout, "hi\n"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
