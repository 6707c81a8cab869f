//! Prompt rendering for the system message and each user turn.

use std::env;
use std::path::Path;

use anyhow::Result;
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::decoder::{ACTION_END, ACTION_START};
use crate::core::path::mask_home;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");
const TURN_TEMPLATE: &str = include_str!("prompts/turn.md");

/// Facts about the user's machine sent with every question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostContext {
    pub os: String,
    pub shell: String,
    /// Working directory with the home directory masked as `~`.
    pub cwd: String,
}

impl HostContext {
    pub fn detect(home: Option<&Path>) -> Self {
        let cwd = env::current_dir()
            .map(|dir| mask_home(&dir, home))
            .unwrap_or_else(|_| ".".to_string());
        Self {
            os: env::consts::OS.to_string(),
            shell: detect_shell(),
            cwd,
        }
    }
}

fn detect_shell() -> String {
    env::var_os("SHELL")
        .or_else(|| env::var_os("COMSPEC"))
        .and_then(|shell| {
            Path::new(&shell)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Template engine wrapper around minijinja.
pub struct PromptTemplates {
    env: Environment<'static>,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptTemplates {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("system", SYSTEM_TEMPLATE)
            .expect("system template should be valid");
        env.add_template("turn", TURN_TEMPLATE)
            .expect("turn template should be valid");
        Self { env }
    }

    pub fn system_prompt(&self) -> Result<String> {
        let template = self.env.get_template("system")?;
        let rendered = template.render(context! {
            start => ACTION_START.to_string(),
            end => ACTION_END.to_string(),
        })?;
        Ok(rendered)
    }

    pub fn render_turn(&self, host: &HostContext, question: &str) -> Result<String> {
        let template = self.env.get_template("turn")?;
        let rendered = template.render(context! {
            os => &host.os,
            shell => &host.shell,
            cwd => &host.cwd,
            question => question.trim(),
        })?;
        Ok(rendered)
    }
}
