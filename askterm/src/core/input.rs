//! Classification of interactive input lines.

use std::sync::LazyLock;

use regex::Regex;

/// What the user typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    /// Blank line.
    Empty,
    /// `exit` or `/exit`.
    Exit,
    /// `/name args...`; `args` is the trimmed remainder (possibly empty).
    Slash { name: String, args: String },
    /// Free text for the model.
    Prompt(String),
}

static SLASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(\S+)(?:\s+(.*))?$").expect("slash command regex"));

pub fn parse_input(line: &str) -> ReplInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReplInput::Empty;
    }
    if trimmed == "exit" || trimmed == "/exit" {
        return ReplInput::Exit;
    }
    if let Some(caps) = SLASH_RE.captures(trimmed) {
        let name = caps.get(1).map_or("", |m| m.as_str()).to_string();
        let args = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
        return ReplInput::Slash { name, args };
    }
    if let Some(rest) = trimmed.strip_prefix('/') {
        // Bare `/` or `/ name`: reported as misuse by the registry.
        return ReplInput::Slash {
            name: String::new(),
            args: rest.trim().to_string(),
        };
    }
    ReplInput::Prompt(trimmed.to_string())
}
