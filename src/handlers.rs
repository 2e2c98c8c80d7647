//! Built-in leaf rule handlers.
//!
//! Leaf handlers are pure: they inspect the value, never recurse into the
//! engine, and report failures with the message templates configured on
//! the rule. Every error carries a `property` parameter.

use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::LazyLock;

use crate::context::ValidationContext;
use crate::enums::{CompareOperator, NumberType};
use crate::error::{ConfigError, ValidationError, ValidationResult};
use crate::primitives::{as_number, is_blank, value_to_text, values_deep_equal, values_loosely_equal};
use crate::registry::RuleHandler;
use crate::types::{Rule, RuleKind};

// ─── Cached regexes ─────────────────────────────────────────────────────────

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-zA-Z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?\.)+[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?$",
    )
    .unwrap()
});

static URL_REST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-zA-Z0-9][a-zA-Z0-9_-]*)(?:\.[a-zA-Z0-9][a-zA-Z0-9_-]*)+(?::\d{1,5})?(?:[?/#].*)?$")
        .unwrap()
});

static INTEGER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[+-]?\d+\s*$").unwrap());

// ─── Helpers ────────────────────────────────────────────────────────────────

/// A root-level error with the `property` parameter filled in.
pub(crate) fn error_for(message: &str, ctx: &ValidationContext<'_>) -> ValidationError {
    ValidationError::new(message).param("property", ctx.property_label())
}

pub(crate) fn unexpected_rule(handler: &str, expected: &str, rule: &Rule) -> ConfigError {
    ConfigError::UnexpectedRule {
        handler: handler.to_string(),
        expected: expected.to_string(),
        actual: rule.handler_name().to_string(),
    }
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

// ─── Required ───────────────────────────────────────────────────────────────

pub struct RequiredHandler;

impl RuleHandler for RequiredHandler {
    fn validate(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let RuleKind::Required(cfg) = rule.kind() else {
            return Err(unexpected_rule("required", "required", rule));
        };
        if ctx.is_property_missing() {
            return Ok(error_for(&cfg.not_passed_message, ctx).into());
        }
        if is_blank(value, true) {
            return Ok(error_for(&cfg.message, ctx).into());
        }
        Ok(ValidationResult::new())
    }
}

// ─── Length ─────────────────────────────────────────────────────────────────

pub struct LengthHandler;

impl RuleHandler for LengthHandler {
    fn validate(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let RuleKind::Length(cfg) = rule.kind() else {
            return Err(unexpected_rule("length", "length", rule));
        };
        let (length, unit) = match value {
            Value::String(s) => (s.chars().count(), "characters"),
            Value::Array(items) => (items.len(), "items"),
            Value::Object(map) => (map.len(), "items"),
            _ => return Ok(error_for(&cfg.incorrect_input_message, ctx).into()),
        };

        let mut result = ValidationResult::new();
        if let Some(exactly) = cfg.exactly
            && length != exactly
        {
            result.push(
                error_for(&cfg.not_exactly_message, ctx)
                    .param("exactly", exactly)
                    .param("length", length)
                    .param("unit", unit),
            );
            return Ok(result);
        }
        if let Some(min) = cfg.min
            && length < min
        {
            result.push(
                error_for(&cfg.less_than_min_message, ctx)
                    .param("min", min)
                    .param("length", length)
                    .param("unit", unit),
            );
        }
        if let Some(max) = cfg.max
            && length > max
        {
            result.push(
                error_for(&cfg.greater_than_max_message, ctx)
                    .param("max", max)
                    .param("length", length)
                    .param("unit", unit),
            );
        }
        Ok(result)
    }
}

// ─── Number ─────────────────────────────────────────────────────────────────

pub struct NumberHandler;

impl RuleHandler for NumberHandler {
    fn validate(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let RuleKind::Number(cfg) = rule.kind() else {
            return Err(unexpected_rule("number", "number", rule));
        };
        if !matches!(value, Value::Number(_) | Value::String(_)) {
            return Ok(error_for(&cfg.incorrect_input_message, ctx).into());
        }

        let number = match as_number(value) {
            Some(n) if cfg.number_type == NumberType::Float || is_integral(value, n) => n,
            _ => {
                return Ok(error_for(&cfg.not_number_message, ctx)
                    .param("value", value.clone())
                    .into());
            }
        };

        let mut result = ValidationResult::new();
        if let Some(min) = cfg.min
            && number < min
        {
            result.push(
                error_for(&cfg.less_than_min_message, ctx)
                    .param("min", number_value(min))
                    .param("value", value.clone()),
            );
        }
        if let Some(max) = cfg.max
            && number > max
        {
            result.push(
                error_for(&cfg.greater_than_max_message, ctx)
                    .param("max", number_value(max))
                    .param("value", value.clone()),
            );
        }
        Ok(result)
    }
}

fn is_integral(value: &Value, n: f64) -> bool {
    match value {
        Value::Number(num) => num.is_i64() || num.is_u64() || n.fract() == 0.0,
        Value::String(s) => INTEGER_RE.is_match(s),
        _ => false,
    }
}

// ─── Regex, email, URL ──────────────────────────────────────────────────────

pub struct MatchRegexHandler;

impl RuleHandler for MatchRegexHandler {
    fn validate(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let RuleKind::MatchRegex(cfg) = rule.kind() else {
            return Err(unexpected_rule("match_regex", "match_regex", rule));
        };
        let Some(text) = value.as_str() else {
            return Ok(error_for(&cfg.incorrect_input_message, ctx).into());
        };
        if cfg.regex()?.is_match(text) == cfg.not {
            return Ok(error_for(&cfg.message, ctx)
                .param("value", text)
                .into());
        }
        Ok(ValidationResult::new())
    }
}

pub struct EmailHandler;

impl RuleHandler for EmailHandler {
    fn validate(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let RuleKind::Email(cfg) = rule.kind() else {
            return Err(unexpected_rule("email", "email", rule));
        };
        let Some(text) = value.as_str() else {
            return Ok(error_for(&cfg.incorrect_input_message, ctx).into());
        };
        if text.len() > 254 || !EMAIL_RE.is_match(text) {
            return Ok(error_for(&cfg.message, ctx).param("value", text).into());
        }
        Ok(ValidationResult::new())
    }
}

pub struct UrlHandler;

impl RuleHandler for UrlHandler {
    fn validate(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let RuleKind::Url(cfg) = rule.kind() else {
            return Err(unexpected_rule("url", "url", rule));
        };
        let Some(text) = value.as_str() else {
            return Ok(error_for(&cfg.incorrect_input_message, ctx).into());
        };
        let valid = match text.split_once("://") {
            Some((scheme, rest)) => {
                cfg.valid_schemes
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(scheme))
                    && text.len() <= 2000
                    && URL_REST_RE.is_match(rest)
            }
            None => false,
        };
        if !valid {
            return Ok(error_for(&cfg.message, ctx).param("value", text).into());
        }
        Ok(ValidationResult::new())
    }
}

// ─── In ─────────────────────────────────────────────────────────────────────

pub struct InHandler;

impl RuleHandler for InHandler {
    fn validate(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let RuleKind::In(cfg) = rule.kind() else {
            return Err(unexpected_rule("in", "in", rule));
        };
        let found = cfg.values.iter().any(|candidate| {
            if cfg.strict {
                values_deep_equal(value, candidate)
            } else {
                values_loosely_equal(value, candidate)
            }
        });
        if found == cfg.not {
            return Ok(error_for(&cfg.message, ctx)
                .param("value", value.clone())
                .into());
        }
        Ok(ValidationResult::new())
    }
}

// ─── Compare ────────────────────────────────────────────────────────────────

pub struct CompareHandler;

impl RuleHandler for CompareHandler {
    fn validate(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let RuleKind::Compare(cfg) = rule.kind() else {
            return Err(unexpected_rule("compare", "compare", rule));
        };
        let (target, label) = match (&cfg.target_value, &cfg.target_property) {
            (Some(target), _) => (target, value_to_text(target)),
            (None, Some(property)) => (ctx.data_set().property_value(property), property.clone()),
            (None, None) => {
                return Err(ConfigError::invalid_rule(
                    "compare",
                    "either target_value or target_property is required",
                ));
            }
        };

        if compare_values(value, target, cfg.operator) {
            return Ok(ValidationResult::new());
        }

        let mut error = error_for(cfg.effective_message(), ctx)
            .param("target", label)
            .param("value", value.clone());
        if let Some(target_value) = &cfg.target_value {
            error = error.param("target_value", target_value.clone());
        }
        if let Some(target_property) = &cfg.target_property {
            error = error.param("target_property", target_property.as_str());
        }
        Ok(error.into())
    }
}

/// Numbers (and numeric strings) compare numerically, everything else by
/// text.
fn compare_values(value: &Value, target: &Value, operator: CompareOperator) -> bool {
    let ordering = match (as_number(value), as_number(target)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => Some(value_to_text(value).cmp(&value_to_text(target))),
    };
    match operator {
        CompareOperator::Equal => values_loosely_equal(value, target),
        CompareOperator::NotEqual => !values_loosely_equal(value, target),
        CompareOperator::GreaterThan => ordering == Some(Ordering::Greater),
        CompareOperator::GreaterThanOrEqual => {
            matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
        }
        CompareOperator::LessThan => ordering == Some(Ordering::Less),
        CompareOperator::LessThanOrEqual => {
            matches!(ordering, Some(Ordering::Less | Ordering::Equal))
        }
    }
}

// ─── Type checks ────────────────────────────────────────────────────────────

pub struct TypeOfHandler;

impl RuleHandler for TypeOfHandler {
    fn validate(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let RuleKind::TypeOf(cfg) = rule.kind() else {
            return Err(unexpected_rule("type_of", "type_of", rule));
        };
        if cfg.value_type.matches(value) {
            return Ok(ValidationResult::new());
        }
        Ok(error_for(&cfg.message, ctx)
            .param("type", cfg.value_type.name())
            .into())
    }
}

pub struct BooleanValueHandler;

impl RuleHandler for BooleanValueHandler {
    fn validate(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let RuleKind::BooleanValue(cfg) = rule.kind() else {
            return Err(unexpected_rule("boolean_value", "boolean_value", rule));
        };
        let matches = |expected: &Value| {
            if cfg.strict {
                values_deep_equal(value, expected)
            } else {
                values_loosely_equal(value, expected)
                    || (!value.is_array()
                        && !value.is_object()
                        && value_to_text(value) == value_to_text(expected))
            }
        };
        if matches(&cfg.true_value) || matches(&cfg.false_value) {
            return Ok(ValidationResult::new());
        }
        Ok(error_for(&cfg.message, ctx)
            .param("true", value_to_text(&cfg.true_value))
            .param("false", value_to_text(&cfg.false_value))
            .into())
    }
}

// ─── Callback ───────────────────────────────────────────────────────────────

pub struct CallbackHandler;

impl RuleHandler for CallbackHandler {
    fn validate(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let RuleKind::Callback(callback) = rule.kind() else {
            return Err(unexpected_rule("callback", "callback", rule));
        };
        Ok(callback.call(value, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BooleanValue, Compare, In, Length, MatchRegex, Number, Url};
    use crate::validator::Validator;
    use serde_json::json;

    fn run(rule: Rule, value: Value) -> ValidationResult {
        Validator::new().validate(&value, rule).unwrap()
    }

    #[test]
    fn required_distinguishes_blank_and_missing() {
        let result = run(Rule::required(), json!("   "));
        assert_eq!(result.error_messages(), vec!["{property} cannot be blank."]);
        assert!(run(Rule::required(), json!(0)).is_valid());

        let validator = Validator::new();
        let rules = crate::types::RuleSet::new().property("name", [Rule::required()]);
        let result = validator.validate(&json!({}), rules).unwrap();
        assert_eq!(result.error_messages(), vec!["{property} not passed."]);
        assert_eq!(result.errors()[0].parameters["property"], json!("name"));
    }

    #[test]
    fn length_counts_characters() {
        assert!(run(Rule::new(Length::max(3)), json!("äöü")).is_valid());
        let result = run(Rule::new(Length::between(2, 4).unwrap()), json!("a"));
        assert_eq!(result.errors()[0].parameters["min"], json!(2));
        assert_eq!(result.errors()[0].parameters["unit"], json!("characters"));
        let result = run(Rule::new(Length::max(1)), json!([1, 2]));
        assert_eq!(result.errors()[0].parameters["unit"], json!("items"));
        let result = run(Rule::new(Length::min(1)), json!(5));
        assert_eq!(result.error_messages(), vec!["{property} must be a string or a collection."]);
    }

    #[test]
    fn number_accepts_numeric_strings_and_enforces_integers() {
        assert!(run(Rule::new(Number::new().max(13)), json!("12.5")).is_valid());
        assert!(!run(Rule::new(Number::integer()), json!(1.5)).is_valid());
        assert!(run(Rule::new(Number::integer()), json!("42")).is_valid());
        let result = run(Rule::new(Number::new().min(20)), json!(18));
        assert_eq!(result.errors()[0].parameters["min"], json!(20));
        assert!(!run(Rule::new(Number::new()), json!(true)).is_valid());
    }

    #[test]
    fn regex_with_not_flag() {
        let rule = Rule::new(MatchRegex::new("^a").unwrap());
        assert!(run(rule.clone(), json!("abc")).is_valid());
        assert!(!run(rule, json!("bcd")).is_valid());
        let negated = Rule::new(MatchRegex::new("^a").unwrap().not());
        assert!(!run(negated, json!("abc")).is_valid());
    }

    #[test]
    fn email_and_url_syntax() {
        assert!(run(Rule::email(), json!("user@example.com")).is_valid());
        assert!(!run(Rule::email(), json!("user@")).is_valid());
        assert!(run(Rule::url(), json!("https://example.com/path?q=1")).is_valid());
        assert!(!run(Rule::url(), json!("ftp://example.com")).is_valid());
        assert!(run(Rule::new(Url::schemes(["ftp"])), json!("ftp://example.com")).is_valid());
    }

    #[test]
    fn in_loose_and_strict() {
        let values = vec![json!(1), json!(2)];
        assert!(run(Rule::new(In::new(values.clone()).unwrap()), json!("1")).is_valid());
        assert!(!run(Rule::new(In::new(values.clone()).unwrap().strict()), json!("1")).is_valid());
        assert!(!run(Rule::new(In::new(values).unwrap().not()), json!(2)).is_valid());
    }

    #[test]
    fn compare_against_sibling_property() {
        let rules = crate::types::RuleSet::new().property(
            "password_repeat",
            [Rule::new(Compare::to_property(CompareOperator::Equal, "password"))],
        );
        let validator = Validator::new();
        let ok = validator
            .validate(&json!({"password": "s3cret", "password_repeat": "s3cret"}), rules.clone())
            .unwrap();
        assert!(ok.is_valid());
        let bad = validator
            .validate(&json!({"password": "s3cret", "password_repeat": "other"}), rules)
            .unwrap();
        assert_eq!(bad.errors()[0].parameters["target"], json!("password"));
    }

    #[test]
    fn compare_numeric_ordering() {
        let rule = Rule::new(Compare::to_value(CompareOperator::GreaterThan, 10));
        assert!(run(rule.clone(), json!(11)).is_valid());
        assert!(!run(rule, json!("9")).is_valid());
    }

    #[test]
    fn boolean_value_loose_and_strict() {
        assert!(run(Rule::new(BooleanValue::default()), json!("true")).is_valid());
        assert!(!run(Rule::new(BooleanValue::default().strict()), json!("true")).is_valid());
        assert!(!run(Rule::new(BooleanValue::default()), json!("yes")).is_valid());
    }

    #[test]
    fn handler_rejects_foreign_rule() {
        let validator = Validator::new();
        let ctx_value = json!(null);
        let err = validator
            .with_context(&ctx_value, |ctx| RequiredHandler.validate(&ctx_value, &Rule::email(), ctx))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnexpectedRule { .. }));
    }
}
