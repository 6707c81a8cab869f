//! Terminal interaction: styled output, choices and line input.
//!
//! The [`Console`] trait is the only way the rest of the crate talks to the
//! user, so tests can substitute a scripted console.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::style::{Color, Stylize};
use crossterm::terminal::{Clear, ClearType};
use tracing::warn;

use crate::io::transcript::Transcript;

pub const YES: &str = "yes";
pub const NO: &str = "no";
pub const YES_NO: [&str; 2] = [YES, NO];

const PROGRAM_NAME: &str = "(askterm)";

/// Visual register of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Ordinary assistant speech.
    Program,
    /// Questions and announcements of pending actions.
    Action,
    Error,
    /// Secondary details such as command output.
    Info,
}

pub trait Console {
    /// Print a complete message.
    fn output(&mut self, text: &str, style: Style);

    /// Print one streamed chunk of a model reply, without a line break.
    fn stream(&mut self, chunk: &str);

    /// Terminate the current streamed reply.
    fn end_stream(&mut self);

    /// Ask `question` and block until one of `options` is selected.
    fn choose(&mut self, question: &str, options: &[&str]) -> Result<String>;

    /// Read one line of input; `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>>;

    /// Read a line that must not be recorded anywhere.
    fn read_secret(&mut self) -> Result<Option<String>> {
        self.read_line()
    }

    fn clear_screen(&mut self) -> Result<()>;

    /// Yes/no question; anything but an explicit "yes" is a no.
    fn confirm(&mut self, question: &str) -> Result<bool> {
        Ok(self.choose(question, &YES_NO)? == YES)
    }
}

impl<C: Console + ?Sized> Console for Box<C> {
    fn output(&mut self, text: &str, style: Style) {
        (**self).output(text, style);
    }

    fn stream(&mut self, chunk: &str) {
        (**self).stream(chunk);
    }

    fn end_stream(&mut self) {
        (**self).end_stream();
    }

    fn choose(&mut self, question: &str, options: &[&str]) -> Result<String> {
        (**self).choose(question, options)
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        (**self).read_line()
    }

    fn read_secret(&mut self) -> Result<Option<String>> {
        (**self).read_secret()
    }

    fn clear_screen(&mut self) -> Result<()> {
        (**self).clear_screen()
    }
}

/// Console backed by the process's stdin/stdout.
#[derive(Debug, Default)]
pub struct TerminalConsole {
    streaming: bool,
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self::default()
    }

    fn color(style: Style) -> Color {
        match style {
            Style::Program => Color::Rgb {
                r: 0xf8,
                g: 0xf8,
                b: 0xf2,
            },
            Style::Action => Color::Rgb {
                r: 0xff,
                g: 0x79,
                b: 0xc6,
            },
            Style::Error => Color::Rgb {
                r: 0xff,
                g: 0x55,
                b: 0x55,
            },
            Style::Info => Color::Rgb {
                r: 0x50,
                g: 0xfa,
                b: 0x7b,
            },
        }
    }

    fn write(&mut self, text: &str) {
        let mut out = io::stdout().lock();
        if let Err(err) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
            warn!(err = %err, "failed to write to stdout");
        }
    }

    fn prompt_marker(&mut self) {
        let marker = ">> ".with(Color::Rgb {
            r: 0x8b,
            g: 0xe9,
            b: 0xfd,
        });
        self.write(&marker.bold().to_string());
    }

    fn read_stdin_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let n = io::stdin()
            .lock()
            .read_line(&mut line)
            .context("read stdin")?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

impl Console for TerminalConsole {
    fn output(&mut self, text: &str, style: Style) {
        self.end_stream();
        let name = PROGRAM_NAME
            .with(Color::Rgb {
                r: 0xbd,
                g: 0x93,
                b: 0xf9,
            })
            .bold();
        let body = text.with(Self::color(style));
        let body = if style == Style::Error {
            body.bold()
        } else {
            body
        };
        self.write(&format!("{name} {body}\n"));
    }

    fn stream(&mut self, chunk: &str) {
        if !self.streaming {
            self.streaming = true;
            let name = PROGRAM_NAME
                .with(Color::Rgb {
                    r: 0xbd,
                    g: 0x93,
                    b: 0xf9,
                })
                .bold();
            self.write(&format!("{name} "));
        }
        self.write(chunk);
    }

    fn end_stream(&mut self) {
        if self.streaming {
            self.streaming = false;
            self.write("\n");
        }
    }

    fn choose(&mut self, question: &str, options: &[&str]) -> Result<String> {
        self.output(
            &format!("{question} [{}]", options.join("/")),
            Style::Action,
        );
        loop {
            self.prompt_marker();
            let Some(answer) = self.read_stdin_line()? else {
                // End of input picks the last (most conservative) option.
                return Ok(options.last().copied().unwrap_or_default().to_string());
            };
            if let Some(selected) = match_option(&answer, options) {
                return Ok(selected.to_string());
            }
            self.output(
                &format!("Please answer one of: {}", options.join(", ")),
                Style::Error,
            );
        }
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        self.end_stream();
        self.prompt_marker();
        self.read_stdin_line()
    }

    fn clear_screen(&mut self) -> Result<()> {
        execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0)).context("clear terminal")
    }
}

/// Match a typed answer against `options`: exact (case-insensitive) or a
/// prefix that identifies exactly one option.
pub fn match_option<'a>(answer: &str, options: &[&'a str]) -> Option<&'a str> {
    let answer = answer.trim().to_lowercase();
    if answer.is_empty() {
        return None;
    }
    if let Some(exact) = options
        .iter()
        .copied()
        .find(|option| option.to_lowercase() == answer)
    {
        return Some(exact);
    }
    let mut prefixed = options
        .iter()
        .copied()
        .filter(|option| option.to_lowercase().starts_with(&answer));
    match (prefixed.next(), prefixed.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

/// Decorator that mirrors the conversation into a [`Transcript`].
#[derive(Debug)]
pub struct RecordingConsole<C> {
    inner: C,
    transcript: Transcript,
    streamed: String,
}

impl<C: Console> RecordingConsole<C> {
    pub fn new(inner: C, transcript: Transcript) -> Self {
        Self {
            inner,
            transcript,
            streamed: String::new(),
        }
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// The wrapped console; anything shown through it is not recorded.
    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    fn record(&mut self, line: &str) {
        if let Err(err) = self.transcript.record(line) {
            warn!(err = %err, "failed to record transcript entry");
        }
    }
}

impl<C: Console> Console for RecordingConsole<C> {
    fn output(&mut self, text: &str, style: Style) {
        self.record(text);
        self.inner.output(text, style);
    }

    fn stream(&mut self, chunk: &str) {
        self.streamed.push_str(chunk);
        self.inner.stream(chunk);
    }

    fn end_stream(&mut self) {
        if !self.streamed.is_empty() {
            let reply = std::mem::take(&mut self.streamed);
            self.record(&reply);
        }
        self.inner.end_stream();
    }

    fn choose(&mut self, question: &str, options: &[&str]) -> Result<String> {
        self.record(question);
        let answer = self.inner.choose(question, options)?;
        self.record(&format!(">> {answer}"));
        Ok(answer)
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let line = self.inner.read_line()?;
        if let Some(line) = &line {
            self.record(&format!(">> {line}"));
        }
        Ok(line)
    }

    fn read_secret(&mut self) -> Result<Option<String>> {
        self.inner.read_secret()
    }

    fn clear_screen(&mut self) -> Result<()> {
        self.inner.clear_screen()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedConsole;

    #[test]
    fn match_option_accepts_exact_and_unique_prefix() {
        assert_eq!(match_option("YES", &YES_NO), Some("yes"));
        assert_eq!(match_option("n", &YES_NO), Some("no"));
        assert_eq!(match_option("maybe", &YES_NO), None);
        assert_eq!(match_option("", &YES_NO), None);
    }

    #[test]
    fn match_option_rejects_ambiguous_prefix() {
        assert_eq!(match_option("s", &["skip", "save"]), None);
        assert_eq!(match_option("sa", &["skip", "save"]), Some("save"));
    }

    #[test]
    fn recording_console_logs_streamed_reply_once() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut console = RecordingConsole::new(
            ScriptedConsole::new(),
            Transcript::new(temp.path().join("askterm.log"), 100),
        );

        console.stream("Hello ");
        console.stream("world");
        console.end_stream();
        console.output("done", Style::Program);

        let log = console.transcript_mut().read_all().expect("read");
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("| Hello world"));
        assert!(lines[1].ends_with("| done"));
        assert_eq!(console.inner().streamed(), "Hello world");
    }

    #[test]
    fn recording_console_skips_secrets() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut console = RecordingConsole::new(
            ScriptedConsole::new().with_lines(["model-x", "sk-secret"]),
            Transcript::new(temp.path().join("askterm.log"), 100),
        );

        assert_eq!(console.read_line().expect("line").as_deref(), Some("model-x"));
        assert_eq!(
            console.read_secret().expect("secret").as_deref(),
            Some("sk-secret")
        );

        let log = console.transcript_mut().read_all().expect("read");
        assert!(log.contains(">> model-x"));
        assert!(!log.contains("sk-secret"));
    }
}
