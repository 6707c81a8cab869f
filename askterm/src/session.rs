//! Everything one interactive run owns.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use crate::core::history::ChatHistory;
use crate::core::safety::SafetyRules;
use crate::executor::ActionExecutor;
use crate::io::completion::CompletionSource;
use crate::io::config::AppConfig;
use crate::io::console::{Console, RecordingConsole, Style};
use crate::io::credentials::{self, ApiConfig};
use crate::io::paths::{self, PathManager};
use crate::io::process::ProcessRunner;
use crate::io::prompt::PromptTemplates;
use crate::io::transcript::Transcript;

pub struct Session {
    pub paths: PathManager,
    pub config: AppConfig,
    pub rules: SafetyRules,
    pub templates: PromptTemplates,
    pub history: ChatHistory,
    /// Validated API settings; `None` until discovered or after rejection.
    pub api: Option<ApiConfig>,
    /// Target of `~` expansion and masking.
    pub user_home: Option<PathBuf>,
    pub(crate) console: RecordingConsole<Box<dyn Console>>,
    pub(crate) completion: Box<dyn CompletionSource>,
    pub(crate) runner: Box<dyn ProcessRunner>,
}

impl Session {
    pub fn new(
        paths: PathManager,
        config: AppConfig,
        rules: SafetyRules,
        console: Box<dyn Console>,
        completion: Box<dyn CompletionSource>,
        runner: Box<dyn ProcessRunner>,
    ) -> Result<Self> {
        let templates = PromptTemplates::new();
        let history = ChatHistory::with_system(templates.system_prompt()?);
        let transcript = Transcript::new(
            paths.transcript_path.clone(),
            config.transcript_flush_every,
        );
        Ok(Self {
            paths,
            config,
            rules,
            templates,
            history,
            api: None,
            user_home: paths::user_home(),
            console: RecordingConsole::new(console, transcript),
            completion,
            runner,
        })
    }

    pub fn with_api(mut self, api: ApiConfig) -> Self {
        self.api = Some(api);
        self
    }

    pub fn with_user_home(mut self, home: Option<PathBuf>) -> Self {
        self.user_home = home;
        self
    }

    pub fn console(&mut self) -> &mut dyn Console {
        &mut self.console
    }

    /// Show `text` without adding it to the transcript.
    pub fn output_unrecorded(&mut self, text: &str, style: Style) {
        self.console.inner_mut().output(text, style);
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        self.console.transcript_mut()
    }

    pub fn user_home(&self) -> Option<&Path> {
        self.user_home.as_deref()
    }

    /// Make sure validated API settings are available, discovering them if
    /// needed. Returns `false` when none could be obtained.
    pub fn ensure_api(&mut self) -> Result<bool> {
        if self.api.is_some() {
            return Ok(true);
        }
        self.api = credentials::discover(&self.paths, &mut self.console, self.completion.as_ref())?;
        Ok(self.api.is_some())
    }

    /// Forget the current settings so the next turn rediscovers them.
    pub fn invalidate_api(&mut self) {
        if self.api.take().is_some() {
            warn!("api settings invalidated");
        }
    }

    pub fn executor(&mut self) -> ActionExecutor<'_> {
        ActionExecutor::new(
            &self.rules,
            self.runner.as_ref(),
            &mut self.console,
            self.user_home.as_deref(),
        )
        .confirm_actions(self.config.confirm_actions)
    }

    /// Flush the transcript; called on every exit path.
    pub fn close(&mut self) {
        if let Err(err) = self.console.transcript_mut().flush() {
            warn!(err = %err, "failed to flush transcript");
        }
        info!("session closed");
    }
}
