//! Discovery, validation and persistence of the model API settings.

use std::collections::HashMap;
use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::io::completion::CompletionSource;
use crate::io::console::{Console, Style};
use crate::io::files;
use crate::io::paths::PathManager;

pub const MODEL_VAR: &str = "MODEL_NAME";
pub const BASE_URL_VAR: &str = "BASE_URL";
pub const API_KEY_VAR: &str = "API_KEY";

/// Settings needed to reach a chat-completions endpoint.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: String,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ApiConfig {
    pub fn is_complete(&self) -> bool {
        [&self.model, &self.base_url, &self.api_key]
            .iter()
            .all(|value| !value.trim().is_empty())
    }

    /// Build from a variable map; `None` unless every variable is present.
    pub fn from_vars(vars: &HashMap<String, String>) -> Option<Self> {
        let get = |name: &str| vars.get(name).map(|value| value.trim().to_string());
        let api = Self {
            model: get(MODEL_VAR)?,
            base_url: get(BASE_URL_VAR)?,
            api_key: get(API_KEY_VAR)?,
        };
        api.is_complete().then_some(api)
    }
}

/// Read settings from a dotenv file. A missing file yields `None`.
pub fn from_env_file(path: &Path) -> Result<Option<ApiConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut vars = HashMap::new();
    for item in dotenvy::from_path_iter(path).with_context(|| format!("open {}", path.display()))?
    {
        let (key, value) = item.with_context(|| format!("parse {}", path.display()))?;
        vars.insert(key, value);
    }
    Ok(ApiConfig::from_vars(&vars))
}

pub fn from_process_env() -> Option<ApiConfig> {
    let vars: HashMap<String, String> = [MODEL_VAR, BASE_URL_VAR, API_KEY_VAR]
        .into_iter()
        .filter_map(|name| env::var(name).ok().map(|value| (name.to_string(), value)))
        .collect();
    ApiConfig::from_vars(&vars)
}

/// Ask the user for each setting. `None` when input ends early.
pub fn prompt_for(console: &mut dyn Console) -> Result<Option<ApiConfig>> {
    console.output("Model name:", Style::Action);
    let Some(model) = console.read_line()? else {
        return Ok(None);
    };
    console.output("Base URL:", Style::Action);
    let Some(base_url) = console.read_line()? else {
        return Ok(None);
    };
    console.output("API key:", Style::Action);
    let Some(api_key) = console.read_secret()? else {
        return Ok(None);
    };
    Ok(Some(ApiConfig {
        model: model.trim().to_string(),
        base_url: base_url.trim().to_string(),
        api_key: api_key.trim().to_string(),
    }))
}

/// Persist settings as a dotenv file, replacing any previous one atomically.
pub fn save_env_file(path: &Path, api: &ApiConfig) -> Result<()> {
    files::ensure_parent(path)?;
    let contents = format!(
        "{MODEL_VAR}={}\n{BASE_URL_VAR}={}\n{API_KEY_VAR}={}\n",
        quote(&api.model),
        quote(&api.base_url),
        quote(&api.api_key),
    );
    files::overwrite(path, &contents)
}

fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if matches!(ch, '"' | '\\' | '$') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// Find working settings: the home `.env`, then the environment, then the
/// user. Every candidate is checked with a ping before it is accepted.
pub fn discover(
    paths: &PathManager,
    console: &mut dyn Console,
    source: &dyn CompletionSource,
) -> Result<Option<ApiConfig>> {
    let stored = match from_env_file(&paths.env_path) {
        Ok(api) => api,
        Err(err) => {
            warn!(err = %err, "ignoring unreadable env file");
            None
        }
    };
    let candidates = [("env file", stored), ("environment", from_process_env())];
    for (origin, candidate) in candidates {
        let Some(api) = candidate else {
            continue;
        };
        match source.ping(&api) {
            Ok(()) => {
                info!(origin, model = %api.model, "using stored credentials");
                return Ok(Some(api));
            }
            Err(err) => {
                warn!(origin, err = %err, "stored credentials rejected");
                console.output(
                    &format!("Credentials from the {origin} were rejected: {err}"),
                    Style::Error,
                );
            }
        }
    }

    loop {
        let Some(api) = prompt_for(console)? else {
            return Ok(None);
        };
        if !api.is_complete() {
            console.output("Every setting is required.", Style::Error);
        } else {
            match source.ping(&api) {
                Ok(()) => {
                    let question = format!("Save these settings to {}?", paths.env_path.display());
                    if console.confirm(&question)? {
                        save_env_file(&paths.env_path, &api)?;
                        info!(path = %paths.env_path.display(), "saved credentials");
                    }
                    return Ok(Some(api));
                }
                Err(err) => console.output(&format!("Could not connect: {err}"), Style::Error),
            }
        }
        if !console.confirm("Try again?")? {
            return Ok(None);
        }
    }
}
