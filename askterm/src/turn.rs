//! One turn: question, streamed reply, optional action, report.
//!
//! Ordering within a turn is fixed: extraction, parse, classification,
//! confirmation, execution. A follow-up prompt (output analysis) is handed
//! back to the caller instead of starting a nested turn.

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::decoder::{DecodedTurn, decode_stream};
use crate::core::parser::parse_action;
use crate::core::types::{Action, CommandOutcome, ExecutionResult, FileOutcome, InvalidReason};
use crate::io::completion::StreamError;
use crate::io::console::{Console, Style};
use crate::io::prompt::HostContext;
use crate::session::Session;

pub const PARSE_FAILURE_MESSAGE: &str = "Sorry, I could not understand the request";
pub const DENIED_MESSAGE: &str =
    "I won't run that command: it matches a rule for dangerous commands.";

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Plain reply without an action.
    Reply,
    /// No API settings could be obtained; nothing was sent.
    NoCredentials,
    /// The completion stream failed; the user message stays in history.
    Failed(String),
    ParseFailed(InvalidReason),
    Command(CommandOutcome),
    File(FileOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub outcome: TurnOutcome,
    /// Prompt the caller should send next, if the user asked for analysis.
    pub follow_up: Option<String>,
}

impl TurnReport {
    fn new(outcome: TurnOutcome) -> Self {
        Self {
            outcome,
            follow_up: None,
        }
    }
}

#[instrument(skip_all, fields(question_len = question.len()))]
pub fn run_turn(session: &mut Session, question: &str) -> Result<TurnReport> {
    if !session.ensure_api()? {
        let message = format!(
            "I cannot process your request without valid API settings. Check {} and your \
             environment variables.",
            session.paths.env_path.display()
        );
        session.console().output(&message, Style::Error);
        return Ok(TurnReport::new(TurnOutcome::NoCredentials));
    }

    let host = HostContext::detect(session.user_home());
    let prompt = session.templates.render_turn(&host, question)?;
    session.history.push_user(prompt);

    let decoded = match stream_reply(session) {
        Ok(decoded) => decoded,
        Err(err) => return Ok(report_stream_error(session, err)),
    };
    let DecodedTurn { raw, payload } = decoded;
    session.history.push_assistant(raw);

    let Some(payload) = payload else {
        info!("plain reply");
        return Ok(TurnReport::new(TurnOutcome::Reply));
    };

    match parse_action(&payload) {
        Action::Invalid { reason } => {
            warn!(%reason, "could not parse action payload");
            session
                .console()
                .output(PARSE_FAILURE_MESSAGE, Style::Error);
            Ok(TurnReport::new(TurnOutcome::ParseFailed(reason)))
        }
        Action::Command { text } => {
            let (outcome, follow_up) = execute_command(session, &text)?;
            Ok(TurnReport {
                outcome: TurnOutcome::Command(outcome),
                follow_up,
            })
        }
        Action::File { path, content } => {
            let outcome = write_file(session, &path, &content)?;
            Ok(TurnReport::new(TurnOutcome::File(outcome)))
        }
    }
}

fn stream_reply(session: &mut Session) -> Result<DecodedTurn, StreamError> {
    let Some(api) = session.api.as_ref() else {
        return Err(StreamError::Unauthorized);
    };
    let thresholds = session.config.display.thresholds();
    let fragments = session.completion.stream(api, session.history.messages())?;
    let console = &mut session.console;
    let decoded = decode_stream(fragments, thresholds, |chunk| console.stream(chunk));
    console.end_stream();
    if let Ok(turn) = &decoded {
        info!(
            raw_len = turn.raw.len(),
            has_payload = turn.payload.is_some(),
            "reply finished"
        );
    }
    decoded
}

fn report_stream_error(session: &mut Session, err: StreamError) -> TurnReport {
    warn!(err = %err, "completion stream failed");
    let message = match &err {
        StreamError::Unauthorized => "API settings rejected: invalid API key".to_string(),
        StreamError::BadRequest(_) => "API settings rejected: invalid model name".to_string(),
        StreamError::NotFound => "API settings rejected: invalid base URL".to_string(),
        other => format!("Something went wrong while I was answering: {other}"),
    };
    session.console().output(&message, Style::Error);
    if err.is_credential_error() {
        session.invalidate_api();
    }
    TurnReport::new(TurnOutcome::Failed(err.to_string()))
}

/// Announce, execute and report `command`, then offer analysis of its
/// output. Shared by model actions and `/run`.
pub fn execute_command(
    session: &mut Session,
    command: &str,
) -> Result<(CommandOutcome, Option<String>)> {
    session
        .console()
        .output(&format!("Running: {command}"), Style::Action);
    let outcome = session.executor().run_command(command)?;

    let follow_up = match &outcome {
        CommandOutcome::Denied => {
            session.console().output(DENIED_MESSAGE, Style::Error);
            None
        }
        CommandOutcome::Aborted => {
            session.console().output("Command aborted.", Style::Info);
            None
        }
        CommandOutcome::Ran(result) => {
            report_result(session.console(), result);
            offer_analysis(session, command, result)?
        }
    };
    Ok((outcome, follow_up))
}

fn report_result(console: &mut dyn Console, result: &ExecutionResult) {
    if !result.stdout.is_empty() {
        console.output(&result.stdout, Style::Program);
    }
    if !result.stderr.is_empty() {
        console.output(&result.stderr, Style::Error);
    }
    let (text, style) = if result.success() {
        ("Command finished successfully.".to_string(), Style::Info)
    } else {
        (
            format!("Command failed with exit code {}.", result.exit_code),
            Style::Error,
        )
    };
    console.output(&text, style);
}

fn offer_analysis(
    session: &mut Session,
    command: &str,
    result: &ExecutionResult,
) -> Result<Option<String>> {
    if !session.config.offer_analysis || (result.stdout.is_empty() && result.stderr.is_empty()) {
        return Ok(None);
    }
    if !session
        .console()
        .confirm("Would you like me to analyze the output?")?
    {
        return Ok(None);
    }
    Ok(Some(analysis_prompt(command, result)))
}

fn analysis_prompt(command: &str, result: &ExecutionResult) -> String {
    format!(
        "I ran `{command}` and it exited with code {}. Explain the output.\n\n\
         stdout:\n{}\n\nstderr:\n{}",
        result.exit_code, result.stdout, result.stderr
    )
}

fn write_file(session: &mut Session, path: &str, content: &str) -> Result<FileOutcome> {
    session
        .console()
        .output(&format!("Writing file: {path}"), Style::Action);
    let overwrite = session.config.overwrite_files;
    let outcome = session.executor().run_file(path, content, overwrite)?;
    match &outcome {
        FileOutcome::Written(target) => session
            .console()
            .output(&format!("Saved {}.", target.display()), Style::Info),
        FileOutcome::Aborted => session
            .console()
            .output("The file was not saved.", Style::Info),
        FileOutcome::Failed(reason) => session
            .console()
            .output(&format!("Could not save the file: {reason}"), Style::Error),
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_prompt_carries_both_streams() {
        let prompt = analysis_prompt(
            "ls missing",
            &ExecutionResult {
                exit_code: 2,
                stdout: String::new(),
                stderr: "No such file".to_string(),
            },
        );
        assert!(prompt.contains("`ls missing`"));
        assert!(prompt.contains("code 2"));
        assert!(prompt.ends_with("stderr:\nNo such file"));
    }
}
