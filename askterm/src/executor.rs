//! Runs parsed actions: classified commands and file writes.

use std::path::Path;

use anyhow::Result;
use tracing::{error, info, instrument, warn};

use crate::conflict::ConflictResolver;
use crate::core::path::expand_home;
use crate::core::safety::{SafetyRules, classify};
use crate::core::types::{CommandOutcome, ExecutionResult, FileOutcome, RiskLevel};
use crate::io::console::Console;
use crate::io::files::{self, CreateOutcome};
use crate::io::process::ProcessRunner;

/// Exit code for a command line that could not be split into words.
pub const EXIT_BAD_COMMAND_LINE: i32 = 2;

/// Executes one action on behalf of the model.
///
/// Every prompt goes through `console`; every process goes through `runner`.
pub struct ActionExecutor<'a> {
    rules: &'a SafetyRules,
    runner: &'a dyn ProcessRunner,
    console: &'a mut dyn Console,
    home: Option<&'a Path>,
    confirm_actions: bool,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(
        rules: &'a SafetyRules,
        runner: &'a dyn ProcessRunner,
        console: &'a mut dyn Console,
        home: Option<&'a Path>,
    ) -> Self {
        Self {
            rules,
            runner,
            console,
            home,
            confirm_actions: false,
        }
    }

    /// Ask before actions that the rules consider safe as well.
    pub fn confirm_actions(mut self, enabled: bool) -> Self {
        self.confirm_actions = enabled;
        self
    }

    /// Classify, confirm if needed, then spawn `command` without a shell.
    #[instrument(skip_all, fields(command = %command))]
    pub fn run_command(&mut self, command: &str) -> Result<CommandOutcome> {
        let risk = classify(command, self.rules);
        info!(?risk, "classified command");
        match risk {
            RiskLevel::Deny => {
                warn!("refusing denied command");
                return Ok(CommandOutcome::Denied);
            }
            RiskLevel::Confirm => {
                let question = format!(
                    "This command may be unsafe or cause permanent changes to your system. \
                     Do you want to continue?\n  {command}"
                );
                if !self.console.confirm(&question)? {
                    info!("user declined risky command");
                    return Ok(CommandOutcome::Aborted);
                }
            }
            RiskLevel::Safe => {
                if self.confirm_actions
                    && !self.console.confirm(&format!("Run this command?\n  {command}"))?
                {
                    info!("user declined command");
                    return Ok(CommandOutcome::Aborted);
                }
            }
        }

        let argv = match shlex::split(command) {
            Some(argv) if !argv.is_empty() => argv,
            _ => {
                warn!("could not split command line");
                return Ok(CommandOutcome::Ran(ExecutionResult {
                    exit_code: EXIT_BAD_COMMAND_LINE,
                    stdout: String::new(),
                    stderr: format!("could not parse command line: {command}"),
                }));
            }
        };
        let result = self.runner.run(&argv);
        info!(exit_code = result.exit_code, "command finished");
        Ok(CommandOutcome::Ran(result))
    }

    /// Write `content` to `path`, resolving collisions interactively unless
    /// `overwrite_default` is set.
    #[instrument(skip_all, fields(path = %path, bytes = content.len()))]
    pub fn run_file(
        &mut self,
        path: &str,
        content: &str,
        overwrite_default: bool,
    ) -> Result<FileOutcome> {
        let target = expand_home(path, self.home);
        if self.confirm_actions
            && !self
                .console
                .confirm(&format!("Write file {}?", target.display()))?
        {
            info!("user declined file write");
            return Ok(FileOutcome::Aborted);
        }

        if let Err(err) = files::ensure_parent(&target) {
            error!(err = %err, "could not create parent directories");
            return Ok(FileOutcome::Failed(format!("{err:#}")));
        }

        match files::write_new(&target, content) {
            Ok(CreateOutcome::Created) => Ok(FileOutcome::Written(target)),
            Ok(CreateOutcome::AlreadyExists) if overwrite_default => {
                match files::overwrite(&target, content) {
                    Ok(()) => Ok(FileOutcome::Written(target)),
                    Err(err) => {
                        error!(err = %err, "overwrite failed");
                        Ok(FileOutcome::Failed(format!("{err:#}")))
                    }
                }
            }
            Ok(CreateOutcome::AlreadyExists) => {
                ConflictResolver::new(&mut *self.console, self.home).resolve(&target, content)
            }
            Err(err) => {
                error!(err = %err, "file write failed");
                Ok(FileOutcome::Failed(format!("{err:#}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::io::console::{NO, YES};
    use crate::test_support::{RecordingProcessRunner, ScriptedConsole, sample_rules};

    #[test]
    fn denied_command_never_spawns() {
        let rules = sample_rules();
        let runner = RecordingProcessRunner::new();
        let mut console = ScriptedConsole::new();

        let outcome = ActionExecutor::new(&rules, &runner, &mut console, None)
            .run_command("rm -rf /")
            .expect("run");

        assert_eq!(outcome, CommandOutcome::Denied);
        assert!(runner.invocations().is_empty());
        assert!(console.questions().is_empty());
    }

    #[test]
    fn deny_wins_over_confirm() {
        let rules = SafetyRules::new(["mkfs"], ["mkfs"]);
        let runner = RecordingProcessRunner::new();
        let mut console = ScriptedConsole::new();

        let outcome = ActionExecutor::new(&rules, &runner, &mut console, None)
            .run_command("MKFS.ext4 /dev/sdb")
            .expect("run");

        assert_eq!(outcome, CommandOutcome::Denied);
        assert!(console.questions().is_empty());
    }

    #[test]
    fn declined_confirmation_aborts() {
        let rules = sample_rules();
        let runner = RecordingProcessRunner::new();
        let mut console = ScriptedConsole::new().with_choices([NO]);

        let outcome = ActionExecutor::new(&rules, &runner, &mut console, None)
            .run_command("sudo reboot-later")
            .expect("run");

        assert_eq!(outcome, CommandOutcome::Aborted);
        assert!(runner.invocations().is_empty());
        assert!(console.questions()[0].contains("sudo reboot-later"));
    }

    #[test]
    fn accepted_confirmation_runs_tokenized_command() {
        let rules = sample_rules();
        let runner = RecordingProcessRunner::new();
        let mut console = ScriptedConsole::new().with_choices([YES]);

        let outcome = ActionExecutor::new(&rules, &runner, &mut console, None)
            .run_command("sudo echo 'hello world'")
            .expect("run");

        assert!(outcome.succeeded());
        assert_eq!(
            runner.invocations(),
            vec![vec![
                "sudo".to_string(),
                "echo".to_string(),
                "hello world".to_string()
            ]]
        );
    }

    #[test]
    fn safe_command_runs_without_prompt() {
        let rules = sample_rules();
        let runner = RecordingProcessRunner::new();
        let mut console = ScriptedConsole::new();

        let outcome = ActionExecutor::new(&rules, &runner, &mut console, None)
            .run_command("ls -la")
            .expect("run");

        assert!(outcome.succeeded());
        assert_eq!(runner.invocations(), vec![vec!["ls", "-la"]]);
        assert!(console.questions().is_empty());
    }

    #[test]
    fn confirm_actions_asks_for_safe_commands() {
        let rules = sample_rules();
        let runner = RecordingProcessRunner::new();
        let mut console = ScriptedConsole::new().with_choices([NO]);

        let outcome = ActionExecutor::new(&rules, &runner, &mut console, None)
            .confirm_actions(true)
            .run_command("ls")
            .expect("run");

        assert_eq!(outcome, CommandOutcome::Aborted);
        assert!(runner.invocations().is_empty());
    }

    #[test]
    fn unbalanced_quotes_report_parse_failure() {
        let rules = sample_rules();
        let runner = RecordingProcessRunner::new();
        let mut console = ScriptedConsole::new();

        let outcome = ActionExecutor::new(&rules, &runner, &mut console, None)
            .run_command("echo 'oops")
            .expect("run");

        match outcome {
            CommandOutcome::Ran(result) => {
                assert_eq!(result.exit_code, EXIT_BAD_COMMAND_LINE);
                assert!(!result.stderr.is_empty());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(runner.invocations().is_empty());
    }

    #[test]
    fn fresh_file_is_written_under_home() {
        let temp = tempfile::tempdir().expect("tempdir");
        let rules = sample_rules();
        let runner = RecordingProcessRunner::new();
        let mut console = ScriptedConsole::new();

        let outcome = ActionExecutor::new(&rules, &runner, &mut console, Some(temp.path()))
            .run_file("~/deep/dir/notes.txt", "hi", false)
            .expect("run");

        let expected = temp.path().join("deep/dir/notes.txt");
        assert_eq!(outcome, FileOutcome::Written(expected.clone()));
        assert_eq!(fs::read_to_string(expected).expect("read"), "hi");
    }

    #[test]
    fn overwrite_default_replaces_existing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("notes.txt");
        fs::write(&path, "old").expect("seed");
        let rules = sample_rules();
        let runner = RecordingProcessRunner::new();
        let mut console = ScriptedConsole::new();

        let outcome = ActionExecutor::new(&rules, &runner, &mut console, Some(temp.path()))
            .run_file("~/notes.txt", "new", true)
            .expect("run");

        assert!(outcome.succeeded());
        assert_eq!(fs::read_to_string(&path).expect("read"), "new");
        assert!(console.questions().is_empty());
    }

    #[test]
    fn unwritable_parent_reports_failure() {
        let temp = tempfile::tempdir().expect("tempdir");
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "file, not dir").expect("seed");
        let rules = sample_rules();
        let runner = RecordingProcessRunner::new();
        let mut console = ScriptedConsole::new();

        let outcome = ActionExecutor::new(&rules, &runner, &mut console, None)
            .run_file(&blocker.join("x.txt").display().to_string(), "hi", false)
            .expect("run");

        assert!(matches!(outcome, FileOutcome::Failed(_)));
    }
}
