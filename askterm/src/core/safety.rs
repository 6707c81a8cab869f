//! Denylist-based risk classification for shell commands.
//!
//! This is a coarse substring filter, not a sandbox. It errs toward false
//! positives: any listed token appearing anywhere in the lowercased command
//! line triggers the rule.

use crate::core::types::RiskLevel;

/// Immutable deny/confirm token sets, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyRules {
    deny_always: Vec<String>,
    confirm_first: Vec<String>,
}

impl SafetyRules {
    /// Build rules from raw token lists. Tokens are lowercased and empty
    /// tokens are dropped so they cannot match every command.
    pub fn new<D, C>(deny_always: D, confirm_first: C) -> Self
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        Self {
            deny_always: normalize(deny_always),
            confirm_first: normalize(confirm_first),
        }
    }

    pub fn deny_always(&self) -> &[String] {
        &self.deny_always
    }

    pub fn confirm_first(&self) -> &[String] {
        &self.confirm_first
    }
}

fn normalize<I>(tokens: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|token| token.as_ref().to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Classify `command` against `rules`. Deny is checked before confirm.
pub fn classify(command: &str, rules: &SafetyRules) -> RiskLevel {
    let lowered = command.to_lowercase();
    if rules
        .deny_always
        .iter()
        .any(|token| lowered.contains(token.as_str()))
    {
        RiskLevel::Deny
    } else if rules
        .confirm_first
        .iter()
        .any(|token| lowered.contains(token.as_str()))
    {
        RiskLevel::Confirm
    } else {
        RiskLevel::Safe
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> SafetyRules {
        SafetyRules::new(["rm -rf /", "MKFS"], ["rm ", "sudo"])
    }

    #[test]
    fn tokens_are_lowercased_on_construction() {
        assert_eq!(rules().deny_always(), ["rm -rf /", "mkfs"]);
    }

    #[test]
    fn empty_tokens_are_dropped() {
        let rules = SafetyRules::new(["", "shutdown"], [""]);
        assert_eq!(rules.deny_always(), ["shutdown"]);
        assert!(rules.confirm_first().is_empty());
        assert_eq!(classify("ls", &rules), RiskLevel::Safe);
    }

    #[test]
    fn unmatched_command_is_safe() {
        assert_eq!(classify("ls -la", &rules()), RiskLevel::Safe);
    }

    #[test]
    fn confirm_token_requires_confirmation() {
        assert_eq!(classify("sudo apt update", &rules()), RiskLevel::Confirm);
    }

    #[test]
    fn deny_wins_over_confirm() {
        // "rm -rf /" also contains the confirm token "rm ".
        assert_eq!(classify("rm -rf /", &rules()), RiskLevel::Deny);
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        assert_eq!(classify("sudo MkFs.ext4 /dev/sda1", &rules()), RiskLevel::Deny);
        assert_eq!(classify("echo SUDO", &rules()), RiskLevel::Confirm);
    }

    #[test]
    fn classification_is_deterministic() {
        let rules = rules();
        let first = classify("sudo rm -rf /tmp/x", &rules);
        for _ in 0..10 {
            assert_eq!(classify("sudo rm -rf /tmp/x", &rules), first);
        }
    }
}
