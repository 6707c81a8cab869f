//! Canonical locations inside the application home.

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Environment variable overriding the application home.
pub const HOME_ENV: &str = "ASKTERM_HOME";

const DEFAULT_HOME_DIR: &str = ".askterm";

/// All files askterm reads or writes, derived from one home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathManager {
    pub home: PathBuf,
    pub config_path: PathBuf,
    pub env_path: PathBuf,
    pub transcript_path: PathBuf,
    pub debug_log_path: PathBuf,
}

impl PathManager {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            config_path: home.join("config.toml"),
            env_path: home.join(".env"),
            transcript_path: home.join("askterm.log"),
            debug_log_path: home.join("debug.log"),
            home,
        }
    }

    /// Resolve the home from an explicit flag, then `ASKTERM_HOME`, then
    /// `~/.askterm`.
    pub fn resolve(flag: Option<PathBuf>) -> Result<Self> {
        let home = flag
            .or_else(|| env::var_os(HOME_ENV).map(PathBuf::from))
            .or_else(|| user_home().map(|dir| dir.join(DEFAULT_HOME_DIR)))
            .context("cannot determine the askterm home directory; pass --home")?;
        Ok(Self::new(home))
    }

    /// Create the home directory if missing.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.home)
            .with_context(|| format!("create home directory {}", self.home.display()))
    }
}

/// The invoking user's home directory, used for `~` expansion and masking.
pub fn user_home() -> Option<PathBuf> {
    dirs::home_dir()
}
