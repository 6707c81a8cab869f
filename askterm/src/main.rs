//! askterm: a command-line chat assistant.
//!
//! Without arguments it opens an interactive session. A trailing prompt is
//! sent as the first turn; with `--quick` it is the only turn.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

use askterm::exit_codes;
use askterm::io::completion::ChatCompletionsClient;
use askterm::io::config::load_or_init_config;
use askterm::io::console::TerminalConsole;
use askterm::io::paths::{HOME_ENV, PathManager};
use askterm::io::process::SystemProcessRunner;
use askterm::io::safety_rules::load_rules;
use askterm::logging;
use askterm::repl::{CommandRegistry, run_once, run_repl};
use askterm::session::Session;

#[derive(Parser)]
#[command(
    name = "askterm",
    version,
    about = "A simple, lightweight command-line chat assistant"
)]
struct Cli {
    /// Directory holding config.toml, .env and logs.
    #[arg(long, value_name = "DIR", env = HOME_ENV)]
    home: Option<PathBuf>,

    /// Send the prompt once, print the answer and exit.
    #[arg(short, long)]
    quick: bool,

    /// Start the conversation with this prompt.
    #[arg(trailing_var_arg = true)]
    prompt: Vec<String>,
}

fn main() {
    let code = run();
    std::process::exit(code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    let paths = match PathManager::resolve(cli.home.clone()) {
        Ok(paths) => paths,
        Err(err) => {
            eprintln!("{err:#}");
            return exit_codes::INVALID;
        }
    };
    let home_ready = paths.ensure();
    let _guard = logging::init(home_ready.is_ok().then_some(paths.debug_log_path.as_path()));
    if let Err(err) = home_ready {
        eprintln!("{err:#}");
        return exit_codes::INVALID;
    }

    match start(cli, paths) {
        Ok(code) => code,
        Err(err) => {
            error!(err = %format!("{err:#}"), "startup failed");
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    }
}

fn start(cli: Cli, paths: PathManager) -> Result<i32> {
    let config = load_or_init_config(&paths.config_path)?;
    let rules = load_rules(config.safety_rules.as_deref())?;
    let completion = ChatCompletionsClient::new()?;
    let runner = SystemProcessRunner::new(config.output_limit_bytes);
    let mut session = Session::new(
        paths,
        config,
        rules,
        Box::new(TerminalConsole::new()),
        Box::new(completion),
        Box::new(runner),
    )
    .context("start session")?;

    let prompt = cli.prompt.join(" ");
    if cli.quick {
        return run_once(&mut session, &prompt);
    }
    let initial = (!prompt.trim().is_empty()).then_some(prompt);
    run_repl(&mut session, &CommandRegistry::standard(), initial)?;
    Ok(exit_codes::OK)
}
