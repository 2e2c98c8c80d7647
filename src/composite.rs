//! Handlers for rules that bundle other rules and recurse into the engine.

use serde_json::Value;
use std::slice;

use crate::context::ValidationContext;
use crate::data_set::data_set_for;
use crate::error::{ConfigError, PathSegment, ValidationResult, path_to_string};
use crate::handlers::{error_for, unexpected_rule};
use crate::primitives::{resolve_property_path, split_property_path};
use crate::registry::RuleHandler;
use crate::types::{Rule, RuleKind};
use crate::validator::RuleOutcome;

static NULL: Value = Value::Null;

// ─── Each ───────────────────────────────────────────────────────────────────

/// Validates every element of an array (indexed) or every entry of an
/// object (keyed). All elements are evaluated regardless of failures.
pub struct EachHandler;

impl RuleHandler for EachHandler {
    fn validate(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let RuleKind::Each(cfg) = rule.kind() else {
            return Err(unexpected_rule("each", "each", rule));
        };

        let items: Vec<(PathSegment, &Value)> = match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| (PathSegment::Index(i), item))
                .collect(),
            Value::Object(map) => map
                .iter()
                .map(|(key, item)| (PathSegment::Key(key.clone()), item))
                .collect(),
            _ => return Ok(error_for(&cfg.incorrect_input_message, ctx).into()),
        };

        let validator = ctx.validator();
        let mut result = ValidationResult::new();
        for (segment, item) in items {
            let item_ctx = ctx.for_item(slice::from_ref(&segment), false);
            let item_result = validator.validate_value(Some(item), &cfg.rules, &item_ctx)?;
            result.merge_with_prefix(&segment, item_result);
        }
        Ok(result)
    }
}

// ─── Nested ─────────────────────────────────────────────────────────────────

/// Validates values addressed by property paths inside a record.
pub struct NestedHandler;

impl RuleHandler for NestedHandler {
    fn validate(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let RuleKind::Nested(cfg) = rule.kind() else {
            return Err(unexpected_rule("nested", "nested", rule));
        };
        if !value.is_object() && !value.is_array() {
            return Ok(error_for(&cfg.incorrect_input_message, ctx)
                .param("type", value_type_name(value))
                .into());
        }

        let validator = ctx.validator();
        let mut result = ValidationResult::new();
        for (property_path, rules) in cfg.rules.iter() {
            let parts = split_property_path(property_path);
            for resolved in resolve_property_path(&parts, value) {
                let is_missing = resolved.value.is_none();
                if is_missing && cfg.require_property_path {
                    let path = path_to_string(&resolved.path);
                    result.push(
                        error_for(&cfg.no_property_path_message, ctx)
                            .param("path", path)
                            .at(resolved.path),
                    );
                    continue;
                }

                // Sibling lookups read the record holding the last segment.
                let holder = match resolved.path.split_last() {
                    Some((_, parent)) => value_at(value, parent).unwrap_or(&NULL),
                    None => value,
                };
                let holder_set = data_set_for(holder);
                let holder_ctx = ctx.for_data_set(holder_set.as_ref(), ctx.is_property_missing());
                let path_ctx = holder_ctx.for_path(&resolved.path, property_path, is_missing);
                let inner = validator.validate_rules(resolved.value.unwrap_or(&NULL), rules, &path_ctx)?;
                result.merge_with_path(&resolved.path, inner);
            }
        }
        Ok(result)
    }
}

fn value_at<'v>(value: &'v Value, path: &[PathSegment]) -> Option<&'v Value> {
    path.iter().try_fold(value, |current, segment| match segment {
        PathSegment::Key(key) => current.as_object()?.get(key),
        PathSegment::Index(i) => current.as_array()?.get(*i),
    })
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ─── Composite ──────────────────────────────────────────────────────────────

/// Applies a reusable rule list to the same value.
pub struct CompositeHandler;

impl RuleHandler for CompositeHandler {
    fn validate(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let RuleKind::Composite(cfg) = rule.kind() else {
            return Err(unexpected_rule("composite", "composite", rule));
        };
        ctx.validator().validate_rules(value, &cfg.rules, ctx)
    }
}

// ─── AnyRule ────────────────────────────────────────────────────────────────

/// Passes as soon as one inner rule passes. A rule skipped by its own
/// modifiers counts as passing.
pub struct AnyRuleHandler;

impl RuleHandler for AnyRuleHandler {
    fn validate(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let RuleKind::AnyRule(cfg) = rule.kind() else {
            return Err(unexpected_rule("any_rule", "any_rule", rule));
        };
        let validator = ctx.validator();
        for inner in &cfg.rules {
            match validator.apply_rule(value, inner, ctx, false)? {
                RuleOutcome::Skipped(_) => return Ok(ValidationResult::new()),
                RuleOutcome::Applied(result) if result.is_valid() => {
                    return Ok(ValidationResult::new());
                }
                RuleOutcome::Applied(_) => {}
            }
        }
        Ok(error_for(&cfg.message, ctx).into())
    }
}

// ─── StopOnError ────────────────────────────────────────────────────────────

/// Applies inner rules in order and stops at the first one that fails.
pub struct StopOnErrorHandler;

impl RuleHandler for StopOnErrorHandler {
    fn validate(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let RuleKind::StopOnError(cfg) = rule.kind() else {
            return Err(unexpected_rule("stop_on_error", "stop_on_error", rule));
        };
        let validator = ctx.validator();
        for inner in &cfg.rules {
            if let RuleOutcome::Applied(result) = validator.apply_rule(value, inner, ctx, false)?
                && !result.is_valid()
            {
                return Ok(result);
            }
        }
        Ok(ValidationResult::new())
    }
}
