//! Closed enumerations used by rules and their modifiers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Policy deciding whether a value counts as "empty" for skip-on-empty.
///
/// Exactly one condition is active per rule at evaluation time: the rule's
/// own, else the validator-wide default, else [`EmptyCondition::Never`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum EmptyCondition {
    /// Nothing is ever empty.
    #[default]
    Never,
    /// Missing, `null`, `""`, `[]` or `{}`. With `trim`, whitespace-only
    /// strings are empty too.
    WhenEmpty {
        #[serde(default)]
        trim: bool,
    },
    /// Only an absent property is empty.
    WhenMissing,
    /// An absent property or `null`.
    WhenNull,
}

impl EmptyCondition {
    /// `WhenEmpty` without trimming.
    pub const fn when_empty() -> Self {
        EmptyCondition::WhenEmpty { trim: false }
    }

    /// `WhenEmpty` with trimming.
    pub const fn when_empty_trimmed() -> Self {
        EmptyCondition::WhenEmpty { trim: true }
    }

    /// Classifies `value`. `is_missing` is true when the property was absent
    /// from its container.
    pub fn is_empty(&self, value: &Value, is_missing: bool) -> bool {
        match self {
            EmptyCondition::Never => false,
            EmptyCondition::WhenEmpty { trim } => {
                is_missing || crate::primitives::is_blank(value, *trim)
            }
            EmptyCondition::WhenMissing => is_missing,
            EmptyCondition::WhenNull => is_missing || value.is_null(),
        }
    }
}

/// Comparison operator for the compare rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOperator {
    #[default]
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
}

impl CompareOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOperator::Equal => "==",
            CompareOperator::NotEqual => "!=",
            CompareOperator::GreaterThan => ">",
            CompareOperator::GreaterThanOrEqual => ">=",
            CompareOperator::LessThan => "<",
            CompareOperator::LessThanOrEqual => "<=",
        }
    }
}

impl fmt::Display for CompareOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Accepted numeric flavour for the number rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberType {
    Integer,
    #[default]
    Float,
}

/// JSON value types recognised by the type-check rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Object,
    Null,
}

impl ValueType {
    /// Whether `value` is of this type. `Float` accepts any JSON number that
    /// is not representable as an integer.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueType::String => value.is_string(),
            ValueType::Integer => value.is_i64() || value.is_u64(),
            ValueType::Float => value.is_f64(),
            ValueType::Boolean => value.is_boolean(),
            ValueType::Array => value.is_array(),
            ValueType::Object => value.is_object(),
            ValueType::Null => value.is_null(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Boolean => "boolean",
            ValueType::Array => "array",
            ValueType::Object => "object",
            ValueType::Null => "null",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn when_empty_does_not_treat_zero_or_false_as_empty() {
        let cond = EmptyCondition::when_empty();
        assert!(cond.is_empty(&Value::Null, false));
        assert!(cond.is_empty(&json!(""), false));
        assert!(cond.is_empty(&json!([]), false));
        assert!(!cond.is_empty(&json!(0), false));
        assert!(!cond.is_empty(&json!(false), false));
        assert!(!cond.is_empty(&json!("  "), false));
        assert!(EmptyCondition::when_empty_trimmed().is_empty(&json!("  "), false));
    }

    #[test]
    fn when_missing_and_when_null() {
        assert!(EmptyCondition::WhenMissing.is_empty(&Value::Null, true));
        assert!(!EmptyCondition::WhenMissing.is_empty(&Value::Null, false));
        assert!(EmptyCondition::WhenNull.is_empty(&Value::Null, false));
        assert!(!EmptyCondition::WhenNull.is_empty(&json!(""), false));
        assert!(!EmptyCondition::Never.is_empty(&Value::Null, true));
    }

    #[test]
    fn empty_condition_serde_shape() {
        let json = serde_json::to_value(EmptyCondition::when_empty_trimmed()).unwrap();
        assert_eq!(json, json!({"condition": "when_empty", "trim": true}));
        let parsed: EmptyCondition =
            serde_json::from_value(json!({"condition": "when_empty"})).unwrap();
        assert_eq!(parsed, EmptyCondition::when_empty());
    }

    #[test]
    fn float_type_excludes_integers() {
        assert!(ValueType::Float.matches(&json!(1.5)));
        assert!(!ValueType::Float.matches(&json!(1)));
        assert!(ValueType::Integer.matches(&json!(-3)));
        assert!(!ValueType::Integer.matches(&json!("1")));
    }
}
