//! Child process execution with bounded, deadlock-free output capture.

use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};

use crate::core::types::ExecutionResult;

/// Exit code reported when the executable cannot be found.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit code reported when the executable exists but could not be started.
pub const EXIT_CANNOT_EXECUTE: i32 = 126;

pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 100_000;

/// Runs an already tokenized command line.
///
/// Implementations never fail at the type level: every spawn problem is
/// folded into an [`ExecutionResult`].
pub trait ProcessRunner {
    fn run(&self, argv: &[String]) -> ExecutionResult;
}

/// Spawns real processes without a shell and waits for them to exit.
#[derive(Debug, Clone)]
pub struct SystemProcessRunner {
    output_limit_bytes: usize,
}

impl SystemProcessRunner {
    pub fn new(output_limit_bytes: usize) -> Self {
        Self { output_limit_bytes }
    }
}

impl Default for SystemProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_LIMIT_BYTES)
    }
}

impl ProcessRunner for SystemProcessRunner {
    #[instrument(skip_all, fields(program = argv.first().map(String::as_str).unwrap_or("")))]
    fn run(&self, argv: &[String]) -> ExecutionResult {
        let Some((program, args)) = argv.split_first() else {
            return spawn_failure(EXIT_CANNOT_EXECUTE, "empty command".to_string());
        };

        let mut cmd = Command::new(program);
        cmd.args(args);

        match run_captured(cmd, self.output_limit_bytes) {
            Ok(output) => ExecutionResult {
                exit_code: exit_code(output.status),
                stdout: trimmed_text(&output.stdout, output.stdout_truncated),
                stderr: trimmed_text(&output.stderr, output.stderr_truncated),
            },
            Err(err) => match err.downcast_ref::<io::Error>() {
                Some(io_err) if io_err.kind() == io::ErrorKind::NotFound => {
                    spawn_failure(EXIT_NOT_FOUND, format!("command not found: {program}"))
                }
                _ => spawn_failure(
                    EXIT_CANNOT_EXECUTE,
                    format!("failed to run {program}: {err:#}"),
                ),
            },
        }
    }
}

fn spawn_failure(exit_code: i32, message: String) -> ExecutionResult {
    ExecutionResult {
        exit_code,
        stdout: String::new(),
        stderr: message,
    }
}

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
}

/// Run `cmd` to completion, capturing stdout/stderr without risking pipe
/// deadlocks.
///
/// Output is read concurrently while the child runs. `output_limit_bytes`
/// bounds what is kept in memory per stream; the rest is drained and counted.
/// There is no timeout: the call blocks until the child exits.
pub fn run_captured(mut cmd: Command, output_limit_bytes: usize) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e.into());
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    let status = child.wait().context("wait for command")?;

    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
    })
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}

fn trimmed_text(bytes: &[u8], truncated: usize) -> String {
    let text = String::from_utf8_lossy(bytes).trim().to_string();
    if truncated > 0 {
        format!("{text}\n[truncated {truncated} bytes]")
    } else {
        text
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|part| part.to_string()).collect()
    }

    #[test]
    fn captures_trimmed_stdout() {
        let result = SystemProcessRunner::default().run(&argv(&["echo", "hello"]));
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "hello");
        assert_eq!(result.stderr, "");
    }

    #[test]
    fn missing_executable_reports_127() {
        let result = SystemProcessRunner::default().run(&argv(&["nonexistent_command_xyz"]));
        assert_eq!(result.exit_code, EXIT_NOT_FOUND);
        assert_eq!(result.stdout, "");
        assert!(result.stderr.contains("command not found"));
    }

    #[test]
    fn non_zero_exit_keeps_output() {
        let result = SystemProcessRunner::default().run(&argv(&[
            "sh",
            "-c",
            "echo out; echo err >&2; exit 3",
        ]));
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stdout, "out");
        assert_eq!(result.stderr, "err");
        assert!(!result.success());
    }

    #[test]
    fn output_beyond_limit_is_truncated() {
        let runner = SystemProcessRunner::new(4);
        let result = runner.run(&argv(&["echo", "abcdefgh"]));
        assert!(result.stdout.starts_with("abcd"));
        assert!(result.stdout.contains("[truncated 5 bytes]"));
    }

    #[test]
    fn empty_argv_is_a_spawn_failure() {
        let result = SystemProcessRunner::default().run(&[]);
        assert_eq!(result.exit_code, EXIT_CANNOT_EXECUTE);
    }
}
