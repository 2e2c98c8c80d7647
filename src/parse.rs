use serde_json::Value;

use crate::error::ConfigError;
use crate::types::RuleSet;

/// Parses a rule set from YAML (or JSON, which is valid YAML).
///
/// The root is either a mapping of property names to a rule or a list of
/// rules, a single rule mapping (with a `type` key), or a list of rules for
/// the whole value. Every rule's configuration is checked the same way the
/// builders check it.
pub fn parse_rules(input: &str) -> Result<RuleSet, ConfigError> {
    if input.trim().is_empty() {
        return Err(parse_error("empty input"));
    }

    check_multi_document(input)?;

    let value: Value = serde_saphyr::from_str(input).map_err(|e| parse_error(e.to_string()))?;

    if !value.is_object() && !value.is_array() {
        return Err(parse_error("rule document root must be a mapping or a sequence"));
    }

    let rules = RuleSet::from_value(value).map_err(|e| match e {
        ConfigError::InvalidRuleSet { message } => parse_error(message),
        other => other,
    })?;
    rules.check()?;
    Ok(rules)
}

fn parse_error(message: impl Into<String>) -> ConfigError {
    ConfigError::Parse {
        message: message.into(),
    }
}

/// Only `---` at column 0 counts, so block scalars may contain it.
fn check_multi_document(input: &str) -> Result<(), ConfigError> {
    let markers = input
        .lines()
        .filter(|line| line.starts_with("---") && line[3..].trim().is_empty())
        .count();
    if markers > 1 {
        return Err(parse_error("multi-document YAML is not supported"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_scalar_roots() {
        assert!(matches!(parse_rules("  \n"), Err(ConfigError::Parse { .. })));
        assert!(matches!(parse_rules("42"), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn rejects_multiple_documents() {
        let input = "---\n- type: required\n---\n- type: email\n";
        assert!(matches!(parse_rules(input), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn construction_checks_run_after_parsing() {
        let input = "name:\n  type: length\n  min: 5\n  max: 1\n";
        assert!(matches!(
            parse_rules(input),
            Err(ConfigError::InvalidRule { .. })
        ));
        let input = "tags:\n  type: any_rule\n  rules: []\n";
        assert!(matches!(parse_rules(input), Err(ConfigError::EmptyRules { .. })));
    }
}
