//! User configuration stored under `<home>/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::decoder::{BufferThresholds, DEFAULT_CHAR_THRESHOLD, DEFAULT_FRAGMENT_THRESHOLD};
use crate::io::files;
use crate::io::process::DEFAULT_OUTPUT_LIMIT_BYTES;
use crate::io::transcript::DEFAULT_FLUSH_EVERY;

/// askterm configuration (TOML).
///
/// Meant to be edited by hand. Missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Overwrite existing files without asking.
    pub overwrite_files: bool,

    /// Ask before every command and file write, not only risky ones.
    pub confirm_actions: bool,

    /// Offer to send command output back to the model.
    pub offer_analysis: bool,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Transcript entries buffered before an append to disk.
    pub transcript_flush_every: usize,

    /// Replaces the bundled safety rules when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_rules: Option<PathBuf>,

    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Release buffered reply text after this many fragments.
    pub fragment_threshold: usize,

    /// Release buffered reply text after this many characters.
    pub char_threshold: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            fragment_threshold: DEFAULT_FRAGMENT_THRESHOLD,
            char_threshold: DEFAULT_CHAR_THRESHOLD,
        }
    }
}

impl DisplayConfig {
    pub fn thresholds(&self) -> BufferThresholds {
        BufferThresholds {
            fragments: self.fragment_threshold,
            chars: self.char_threshold,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            overwrite_files: false,
            confirm_actions: false,
            offer_analysis: true,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
            transcript_flush_every: DEFAULT_FLUSH_EVERY,
            safety_rules: None,
            display: DisplayConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.transcript_flush_every == 0 {
            return Err(anyhow!("transcript_flush_every must be > 0"));
        }
        if self.display.fragment_threshold == 0 {
            return Err(anyhow!("display.fragment_threshold must be > 0"));
        }
        if self.display.char_threshold == 0 {
            return Err(anyhow!("display.char_threshold must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AppConfig::default()`.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AppConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Load config, writing the defaults first when the file is missing.
pub fn load_or_init_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        return load_config(path);
    }
    let cfg = AppConfig::default();
    write_config(path, &cfg)?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AppConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    files::ensure_parent(path)?;
    files::overwrite(path, &buf).with_context(|| format!("write config {}", path.display()))
}
