//! [`RuleSet`] → YAML serialization.

use crate::error::ConfigError;
use crate::types::RuleSet;

/// Serializes a rule set to YAML, preserving property and rule order.
///
/// Rules holding closures (callback rules and callback `when` conditions)
/// cannot be represented and fail with [`ConfigError::Serialize`].
pub fn serialize_rules(rules: &RuleSet) -> Result<String, ConfigError> {
    let value = serde_json::to_value(rules).map_err(|e| ConfigError::Serialize {
        message: format!("failed to convert rules to a JSON value: {}", e),
    })?;

    serde_saphyr::to_string(&value).map_err(|e| ConfigError::Serialize {
        message: format!("failed to serialize to YAML: {}", e),
    })
}
