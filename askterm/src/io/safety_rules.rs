//! Safety rules load with schema validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::core::safety::SafetyRules;

const BUNDLED_RULES: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/rules/safety_rules.json"
));
const RULES_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/rules/safety_rules.schema.json"
));

#[derive(Debug, Deserialize)]
struct RulesDocument {
    #[serde(rename = "DENY_ALWAYS")]
    deny_always: Vec<String>,
    #[serde(rename = "CONFIRM_FIRST")]
    confirm_first: Vec<String>,
}

/// Load the rules file at `path`, or the bundled rules when `None`.
pub fn load_rules(path: Option<&Path>) -> Result<SafetyRules> {
    match path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("read safety rules {}", path.display()))?;
            parse_rules(&contents).with_context(|| format!("load safety rules {}", path.display()))
        }
        None => parse_rules(BUNDLED_RULES).context("load bundled safety rules"),
    }
}

/// Parse and validate a rules document.
pub fn parse_rules(contents: &str) -> Result<SafetyRules> {
    let value: Value = serde_json::from_str(contents).context("parse safety rules json")?;
    validate_schema(&value)?;
    let doc: RulesDocument =
        serde_json::from_value(value).context("deserialize safety rules")?;
    debug!(
        deny = doc.deny_always.len(),
        confirm = doc.confirm_first.len(),
        "loaded safety rules"
    );
    Ok(SafetyRules::new(doc.deny_always, doc.confirm_first))
}

fn validate_schema(rules: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(RULES_SCHEMA).context("parse rules schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(rules) {
        let messages = compiled
            .iter_errors(rules)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "safety rules schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::safety::classify;
    use crate::core::types::RiskLevel;

    #[test]
    fn bundled_rules_load() {
        let rules = load_rules(None).expect("bundled rules");
        assert!(!rules.deny_always().is_empty());
        assert_eq!(classify("rm -rf /", &rules), RiskLevel::Deny);
        assert_eq!(classify("sudo apt update", &rules), RiskLevel::Confirm);
        assert_eq!(classify("ls -la", &rules), RiskLevel::Safe);
    }

    #[test]
    fn tokens_are_lowercased() {
        let rules =
            parse_rules(r#"{"DENY_ALWAYS": ["MKFS"], "CONFIRM_FIRST": []}"#).expect("rules");
        assert_eq!(rules.deny_always(), ["mkfs".to_string()]);
    }

    #[test]
    fn empty_token_is_rejected() {
        let err = parse_rules(r#"{"DENY_ALWAYS": [""], "CONFIRM_FIRST": ["sudo"]}"#)
            .expect_err("empty token");
        assert!(err.to_string().contains("schema validation failed"));
    }

    #[test]
    fn missing_list_is_rejected() {
        assert!(parse_rules(r#"{"DENY_ALWAYS": ["mkfs"]}"#).is_err());
    }

    #[test]
    fn user_file_overrides_bundle() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("rules.json");
        fs::write(&path, r#"{"DENY_ALWAYS": ["ls"], "CONFIRM_FIRST": []}"#).expect("seed");

        let rules = load_rules(Some(&path)).expect("rules");
        assert_eq!(classify("ls -la", &rules), RiskLevel::Deny);
    }
}
