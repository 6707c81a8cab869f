//! Scripted collaborators for unit and integration tests.
//!
//! Each fake is a cheap handle over shared state: clone it before handing it
//! to a session, then inspect the clone afterwards.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::Result;

use crate::core::history::ChatMessage;
use crate::core::safety::SafetyRules;
use crate::core::types::ExecutionResult;
use crate::io::completion::{CompletionSource, FragmentStream, StreamError};
use crate::io::console::{Console, Style};
use crate::io::credentials::ApiConfig;
use crate::io::process::ProcessRunner;

/// Rules used across tests: `rm -rf` and `mkfs` denied, `rm ` and `sudo`
/// confirmed.
pub fn sample_rules() -> SafetyRules {
    SafetyRules::new(["rm -rf", "mkfs"], ["rm ", "sudo"])
}

pub fn sample_api() -> ApiConfig {
    ApiConfig {
        model: "test-model".to_string(),
        base_url: "http://127.0.0.1:9/v1".to_string(),
        api_key: "sk-test".to_string(),
    }
}

#[derive(Debug, Default)]
struct ConsoleState {
    choices: VecDeque<String>,
    lines: VecDeque<String>,
    questions: Vec<String>,
    outputs: Vec<(Style, String)>,
    streamed: String,
    clears: usize,
}

/// Console that answers from queues and captures everything shown.
///
/// An unanswered `choose` panics so a missing script entry fails loudly; an
/// exhausted line queue reads as end of input.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConsole {
    state: Rc<RefCell<ConsoleState>>,
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_choices<I, S>(self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .borrow_mut()
            .choices
            .extend(choices.into_iter().map(Into::into));
        self
    }

    pub fn with_lines<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .borrow_mut()
            .lines
            .extend(lines.into_iter().map(Into::into));
        self
    }

    /// Every streamed chunk, concatenated.
    pub fn streamed(&self) -> String {
        self.state.borrow().streamed.clone()
    }

    pub fn outputs(&self) -> Vec<(Style, String)> {
        self.state.borrow().outputs.clone()
    }

    /// Output text only, in order.
    pub fn output_text(&self) -> Vec<String> {
        self.state
            .borrow()
            .outputs
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn questions(&self) -> Vec<String> {
        self.state.borrow().questions.clone()
    }

    pub fn clears(&self) -> usize {
        self.state.borrow().clears
    }
}

impl Console for ScriptedConsole {
    fn output(&mut self, text: &str, style: Style) {
        self.state.borrow_mut().outputs.push((style, text.to_string()));
    }

    fn stream(&mut self, chunk: &str) {
        self.state.borrow_mut().streamed.push_str(chunk);
    }

    fn end_stream(&mut self) {}

    fn choose(&mut self, question: &str, options: &[&str]) -> Result<String> {
        let mut state = self.state.borrow_mut();
        state.questions.push(question.to_string());
        let answer = state
            .choices
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted answer for: {question}"));
        assert!(
            options.contains(&answer.as_str()),
            "scripted answer {answer:?} is not one of {options:?}"
        );
        Ok(answer)
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        Ok(self.state.borrow_mut().lines.pop_front())
    }

    fn clear_screen(&mut self) -> Result<()> {
        self.state.borrow_mut().clears += 1;
        Ok(())
    }
}

enum ScriptedReply {
    Fragments(Vec<String>),
    Fail(StreamError),
    FailAfter(Vec<String>, StreamError),
}

#[derive(Default)]
struct CompletionState {
    replies: VecDeque<ScriptedReply>,
    pings: VecDeque<Result<(), StreamError>>,
    requests: Vec<Vec<ChatMessage>>,
    ping_count: usize,
}

/// Completion source that replays queued replies and records requests.
///
/// Pings succeed unless a failure was queued with [`ScriptedCompletion::fail_ping`].
#[derive(Clone, Default)]
pub struct ScriptedCompletion {
    state: Rc<RefCell<CompletionState>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments = fragments.into_iter().map(Into::into).collect();
        self.push(ScriptedReply::Fragments(fragments))
    }

    /// The next stream request fails before any fragment.
    pub fn fail(self, err: StreamError) -> Self {
        self.push(ScriptedReply::Fail(err))
    }

    /// The next stream yields `fragments`, then `err`.
    pub fn fail_after<I, S>(self, fragments: I, err: StreamError) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments = fragments.into_iter().map(Into::into).collect();
        self.push(ScriptedReply::FailAfter(fragments, err))
    }

    pub fn fail_ping(self, err: StreamError) -> Self {
        self.state.borrow_mut().pings.push_back(Err(err));
        self
    }

    /// Message lists sent with each stream request.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.state.borrow().requests.clone()
    }

    pub fn ping_count(&self) -> usize {
        self.state.borrow().ping_count
    }

    fn push(self, reply: ScriptedReply) -> Self {
        self.state.borrow_mut().replies.push_back(reply);
        self
    }
}

impl CompletionSource for ScriptedCompletion {
    fn stream<'a>(
        &'a self,
        _api: &ApiConfig,
        messages: &[ChatMessage],
    ) -> Result<FragmentStream<'a>, StreamError> {
        let mut state = self.state.borrow_mut();
        state.requests.push(messages.to_vec());
        let request = state.requests.len();
        let reply = state
            .replies
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted reply for request {request}"));
        match reply {
            ScriptedReply::Fragments(fragments) => Ok(Box::new(fragments.into_iter().map(Ok))),
            ScriptedReply::Fail(err) => Err(err),
            ScriptedReply::FailAfter(fragments, err) => Ok(Box::new(
                fragments
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(err))),
            )),
        }
    }

    fn ping(&self, _api: &ApiConfig) -> Result<(), StreamError> {
        let mut state = self.state.borrow_mut();
        state.ping_count += 1;
        state.pings.pop_front().unwrap_or(Ok(()))
    }
}

#[derive(Debug, Default)]
struct RunnerState {
    results: VecDeque<ExecutionResult>,
    invocations: Vec<Vec<String>>,
}

/// Process runner that never spawns anything.
///
/// Returns queued results in order, then a successful empty result.
#[derive(Debug, Clone, Default)]
pub struct RecordingProcessRunner {
    state: Rc<RefCell<RunnerState>>,
}

impl RecordingProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(self, exit_code: i32, stdout: &str, stderr: &str) -> Self {
        self.state.borrow_mut().results.push_back(ExecutionResult {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        });
        self
    }

    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.state.borrow().invocations.clone()
    }
}

impl ProcessRunner for RecordingProcessRunner {
    fn run(&self, argv: &[String]) -> ExecutionResult {
        let mut state = self.state.borrow_mut();
        state.invocations.push(argv.to_vec());
        state.results.pop_front().unwrap_or(ExecutionResult {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}
