//! Shared deterministic types for the action pipeline.
//!
//! These types define stable contracts between the decoder, parser,
//! classifier and executor. They carry no I/O handles and are discarded at
//! the end of each turn.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Structured directive extracted from a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run a single shell command line.
    Command { text: String },
    /// Write `content` verbatim to `path` (which may start with `~`).
    File { path: String, content: String },
    /// The payload could not be turned into a runnable action.
    Invalid { reason: InvalidReason },
}

/// Why a payload was rejected by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// Not a JSON object.
    MalformedPayload,
    /// `command` action without a string `command` field.
    MissingCommand,
    /// `file` action without string `path` and `content` fields.
    MissingField,
    /// Discriminator absent or not one of the known action types.
    UnknownActionType,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::MalformedPayload => "malformed payload",
            InvalidReason::MissingCommand => "missing command",
            InvalidReason::MissingField => "missing field",
            InvalidReason::UnknownActionType => "unknown action type",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse risk classification applied to a command before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Confirm,
    Deny,
}

/// Captured outcome of a child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    /// Trimmed standard output.
    pub stdout: String,
    /// Trimmed standard error, or a diagnostic when the process never ran.
    pub stderr: String,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Outcome of `ActionExecutor::run_command`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Classified `Deny`; nothing was spawned.
    Denied,
    /// The user declined a confirmation; nothing was spawned.
    Aborted,
    /// The process was started (or failed to start) and produced a result.
    Ran(ExecutionResult),
}

impl CommandOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, CommandOutcome::Ran(result) if result.success())
    }
}

/// Outcome of `ActionExecutor::run_file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Content was written; the path may differ from the requested one
    /// after conflict resolution.
    Written(PathBuf),
    /// The user declined and the single retry did not produce a new file.
    Aborted,
    /// An I/O error prevented the write.
    Failed(String),
}

impl FileOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, FileOutcome::Written(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_reason_messages_are_stable() {
        assert_eq!(
            InvalidReason::MalformedPayload.to_string(),
            "malformed payload"
        );
        assert_eq!(InvalidReason::MissingCommand.to_string(), "missing command");
        assert_eq!(InvalidReason::MissingField.to_string(), "missing field");
        assert_eq!(
            InvalidReason::UnknownActionType.to_string(),
            "unknown action type"
        );
    }

    #[test]
    fn command_outcome_success_requires_zero_exit() {
        let ok = CommandOutcome::Ran(ExecutionResult {
            exit_code: 0,
            stdout: "out".to_string(),
            stderr: String::new(),
        });
        let failed = CommandOutcome::Ran(ExecutionResult {
            exit_code: 1,
            stdout: String::new(),
            stderr: "boom".to_string(),
        });
        assert!(ok.succeeded());
        assert!(!failed.succeeded());
        assert!(!CommandOutcome::Denied.succeeded());
        assert!(!CommandOutcome::Aborted.succeeded());
    }
}
