//! Interactive loop and slash commands.

use anyhow::{Result, bail};
use tracing::{error, info, instrument};

use crate::core::input::{ReplInput, parse_input};
use crate::exit_codes;
use crate::io::console::Style;
use crate::session::Session;
use crate::turn::{execute_command, run_turn};

pub const MISUSE_MESSAGE: &str =
    "You have entered a command incorrectly. Type '/help' to learn more.";
const GREETING: &str = "Hello! I am askterm, your command-line assistant. How can I help you today?";
const FAREWELL: &str = "Goodbye!";

/// What the loop does after a line has been handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
    /// Send this text to the model.
    Prompt(String),
    /// Send this text to the model, then leave.
    PromptThenExit(String),
}

/// A `/name [args]` command.
pub trait SlashCommand {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Argument placeholder shown by `/help`; empty when the command takes
    /// no arguments.
    fn usage(&self) -> &'static str {
        ""
    }

    fn run(&self, session: &mut Session, args: &str) -> Result<Flow>;
}

struct HelpCommand {
    text: String,
}

impl SlashCommand for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    fn description(&self) -> &'static str {
        "List askterm commands and what they do"
    }

    fn run(&self, session: &mut Session, _args: &str) -> Result<Flow> {
        session.console().output(&self.text, Style::Info);
        Ok(Flow::Continue)
    }
}

struct ExitCommand;

impl SlashCommand for ExitCommand {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn description(&self) -> &'static str {
        "Say goodbye and leave askterm"
    }

    fn run(&self, _session: &mut Session, _args: &str) -> Result<Flow> {
        Ok(Flow::Exit)
    }
}

struct LogCommand;

impl SlashCommand for LogCommand {
    fn name(&self) -> &'static str {
        "log"
    }

    fn description(&self) -> &'static str {
        "Show the conversation log"
    }

    fn run(&self, session: &mut Session, _args: &str) -> Result<Flow> {
        let log = session.transcript_mut().read_all()?;
        if log.trim().is_empty() {
            session.output_unrecorded("The log is empty.", Style::Info);
        } else {
            session.output_unrecorded(log.trim_end(), Style::Info);
        }
        Ok(Flow::Continue)
    }
}

struct WipeCommand;

impl SlashCommand for WipeCommand {
    fn name(&self) -> &'static str {
        "wipe"
    }

    fn description(&self) -> &'static str {
        "Empty the conversation log"
    }

    fn run(&self, session: &mut Session, _args: &str) -> Result<Flow> {
        session.transcript_mut().wipe()?;
        session.output_unrecorded("The log has been emptied.", Style::Info);
        Ok(Flow::Continue)
    }
}

struct ClearCommand;

impl SlashCommand for ClearCommand {
    fn name(&self) -> &'static str {
        "clear"
    }

    fn description(&self) -> &'static str {
        "Clear the terminal window"
    }

    fn run(&self, session: &mut Session, _args: &str) -> Result<Flow> {
        session.console().clear_screen()?;
        Ok(Flow::Continue)
    }
}

struct ForgetCommand;

impl SlashCommand for ForgetCommand {
    fn name(&self) -> &'static str {
        "forget"
    }

    fn description(&self) -> &'static str {
        "Forget the conversation so far"
    }

    fn run(&self, session: &mut Session, _args: &str) -> Result<Flow> {
        session.history.forget();
        session
            .console()
            .output("I have forgotten our conversation.", Style::Info);
        Ok(Flow::Continue)
    }
}

struct RunCommand;

impl SlashCommand for RunCommand {
    fn name(&self) -> &'static str {
        "run"
    }

    fn description(&self) -> &'static str {
        "Run a command and have askterm analyze the output"
    }

    fn usage(&self) -> &'static str {
        "<command>"
    }

    fn run(&self, session: &mut Session, args: &str) -> Result<Flow> {
        let (_, follow_up) = execute_command(session, args)?;
        Ok(follow_up.map_or(Flow::Continue, Flow::Prompt))
    }
}

struct QuickCommand;

impl SlashCommand for QuickCommand {
    fn name(&self) -> &'static str {
        "q"
    }

    fn description(&self) -> &'static str {
        "Send a single prompt, get the answer, then exit"
    }

    fn usage(&self) -> &'static str {
        "<prompt>"
    }

    fn run(&self, _session: &mut Session, args: &str) -> Result<Flow> {
        Ok(Flow::PromptThenExit(args.to_string()))
    }
}

/// Slash commands by name.
pub struct CommandRegistry {
    commands: Vec<Box<dyn SlashCommand>>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl CommandRegistry {
    /// Registry with every built-in command, `/help` listing them all.
    pub fn standard() -> Self {
        let mut registry = Self {
            commands: vec![
                Box::new(ExitCommand) as Box<dyn SlashCommand>,
                Box::new(LogCommand),
                Box::new(WipeCommand),
                Box::new(ClearCommand),
                Box::new(ForgetCommand),
                Box::new(RunCommand),
                Box::new(QuickCommand),
            ],
        };
        let mut help = HelpCommand {
            text: String::new(),
        };
        let mut lines = vec![help_line(&help)];
        lines.extend(registry.commands.iter().map(|command| help_line(&**command)));
        help.text = format!("Available commands:\n{}", lines.join("\n"));
        registry.commands.insert(0, Box::new(help));
        registry
    }

    pub fn get(&self, name: &str) -> Option<&dyn SlashCommand> {
        self.commands
            .iter()
            .find(|command| command.name() == name)
            .map(|command| &**command)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.commands.iter().map(|command| command.name()).collect()
    }

    /// Run `/name args`. Unknown commands and wrong argument counts report
    /// misuse and continue.
    pub fn dispatch(&self, session: &mut Session, name: &str, args: &str) -> Result<Flow> {
        let args = args.trim();
        let Some(command) = self.get(name) else {
            info!(name, "unknown slash command");
            session.console().output(MISUSE_MESSAGE, Style::Error);
            return Ok(Flow::Continue);
        };
        let takes_args = !command.usage().is_empty();
        if takes_args == args.is_empty() {
            info!(name, "slash command misused");
            session.console().output(MISUSE_MESSAGE, Style::Error);
            return Ok(Flow::Continue);
        }
        command.run(session, args)
    }
}

fn help_line(command: &dyn SlashCommand) -> String {
    let invocation = match command.usage() {
        "" => format!("/{}", command.name()),
        usage => format!("/{} {usage}", command.name()),
    };
    format!("  {invocation:<16} {}", command.description())
}

/// Send `question`, then any follow-up prompts the turns produce.
pub fn converse(session: &mut Session, question: String) -> Result<()> {
    let mut next = Some(question);
    while let Some(question) = next.take() {
        next = run_turn(session, &question)?.follow_up;
    }
    Ok(())
}

/// The interactive loop. `initial` is sent as the first prompt.
#[instrument(skip_all)]
pub fn run_repl(
    session: &mut Session,
    registry: &CommandRegistry,
    initial: Option<String>,
) -> Result<()> {
    session.console().output(GREETING, Style::Program);
    let mut pending = initial.map(Flow::Prompt);

    loop {
        let flow = match pending.take() {
            Some(flow) => flow,
            None => {
                let Some(line) = session.console().read_line()? else {
                    info!("end of input");
                    break;
                };
                match parse_input(&line) {
                    ReplInput::Empty => continue,
                    ReplInput::Exit => Flow::Exit,
                    ReplInput::Prompt(text) => Flow::Prompt(text),
                    ReplInput::Slash { name, args } => {
                        match registry.dispatch(session, &name, &args) {
                            Ok(flow) => flow,
                            Err(err) => {
                                report_error(session, &err);
                                Flow::Continue
                            }
                        }
                    }
                }
            }
        };

        match flow {
            Flow::Continue => {}
            Flow::Exit => break,
            Flow::Prompt(text) => {
                if let Err(err) = converse(session, text) {
                    report_error(session, &err);
                }
            }
            Flow::PromptThenExit(text) => {
                if let Err(err) = converse(session, text) {
                    report_error(session, &err);
                }
                break;
            }
        }
    }

    session.console().output(FAREWELL, Style::Program);
    session.close();
    Ok(())
}

/// Non-interactive mode: one prompt, then exit. Returns the process exit code.
pub fn run_once(session: &mut Session, prompt: &str) -> Result<i32> {
    if prompt.trim().is_empty() {
        bail!("a prompt is required in quick mode");
    }
    if !session.ensure_api()? {
        session.close();
        return Ok(exit_codes::NO_CREDENTIALS);
    }
    let result = converse(session, prompt.to_string());
    session.close();
    result?;
    Ok(exit_codes::OK)
}

fn report_error(session: &mut Session, err: &anyhow::Error) {
    error!(err = %format!("{err:#}"), "command failed");
    session
        .console()
        .output(&format!("Something went wrong: {err:#}"), Style::Error);
}
