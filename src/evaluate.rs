//! Evaluation of `when` activation conditions.

use serde_json::{Value, json};
use serde_json_path::JsonPath;

use crate::context::ValidationContext;
use crate::error::ConfigError;
use crate::primitives::{evaluate_condition, resolve_simple_path};
use crate::types::{Condition, When};

// ─── CelEvaluator ───────────────────────────────────────────────────────────

/// Extension point for CEL expressions in `when` conditions.
///
/// See [`DefaultCelEvaluator`] (requires the `cel-eval` feature).
pub trait CelEvaluator: Send + Sync {
    /// Evaluates `expression` with every key of the `context` object bound
    /// as a variable.
    fn evaluate(&self, expression: &str, context: &Value) -> Result<Value, ConfigError>;
}

/// CEL evaluator backed by the `cel` crate.
///
/// References to absent fields or undeclared variables evaluate to `false`,
/// so `data.kind == "company"` simply does not activate the rule when
/// `kind` is missing.
#[cfg(feature = "cel-eval")]
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultCelEvaluator;

#[cfg(feature = "cel-eval")]
impl CelEvaluator for DefaultCelEvaluator {
    fn evaluate(&self, expression: &str, context: &Value) -> Result<Value, ConfigError> {
        let program = cel::Program::compile(expression)
            .map_err(|e| ConfigError::invalid_condition(format!("CEL compile error: {}", e)))?;

        let mut cel_ctx = cel::Context::default();
        if let Value::Object(map) = context {
            for (name, value) in map {
                cel_ctx.add_variable_from_value(name.as_str(), json_to_cel(value));
            }
        }

        match program.execute(&cel_ctx) {
            Ok(result) => Ok(cel_to_json(&result)),
            Err(cel::ExecutionError::NoSuchKey(_)) | Err(cel::ExecutionError::UndeclaredReference(_)) => {
                Ok(Value::Bool(false))
            }
            Err(e) => Err(ConfigError::invalid_condition(format!(
                "CEL execution error: {}",
                e
            ))),
        }
    }
}

#[cfg(feature = "cel-eval")]
fn json_to_cel(value: &Value) -> cel::Value {
    use std::collections::HashMap;
    use std::sync::Arc;

    match value {
        Value::Null => cel::Value::Null,
        Value::Bool(b) => cel::Value::Bool(*b),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => cel::Value::Int(i),
            (None, Some(u), _) => cel::Value::UInt(u),
            (None, None, Some(f)) => cel::Value::Float(f),
            _ => cel::Value::Null,
        },
        Value::String(s) => cel::Value::String(Arc::new(s.clone())),
        Value::Array(items) => cel::Value::List(Arc::new(items.iter().map(json_to_cel).collect())),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), json_to_cel(v)))
            .collect::<HashMap<String, cel::Value>>()
            .into(),
    }
}

#[cfg(feature = "cel-eval")]
fn cel_to_json(value: &cel::Value) -> Value {
    match value {
        cel::Value::Null => Value::Null,
        cel::Value::Bool(b) => Value::Bool(*b),
        cel::Value::Int(i) => Value::from(*i),
        cel::Value::UInt(u) => Value::from(*u),
        cel::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        cel::Value::String(s) => Value::String(s.to_string()),
        cel::Value::List(items) => Value::Array(items.iter().map(cel_to_json).collect()),
        cel::Value::Map(m) => Value::Object(
            m.map
                .iter()
                .map(|(key, val)| {
                    let key = match key {
                        cel::objects::Key::String(s) => s.to_string(),
                        cel::objects::Key::Int(i) => i.to_string(),
                        cel::objects::Key::Uint(u) => u.to_string(),
                        cel::objects::Key::Bool(b) => b.to_string(),
                    };
                    (key, cel_to_json(val))
                })
                .collect(),
        ),
        _ => Value::Null,
    }
}

// ─── when ───────────────────────────────────────────────────────────────────

/// Decides whether a rule is active for `value`.
///
/// Errors are configuration problems (unparseable JSONPath, CEL failures,
/// non-boolean CEL results, CEL without an evaluator) and abort the run.
pub fn evaluate_when(
    when: &When,
    value: &Value,
    ctx: &ValidationContext<'_>,
) -> Result<bool, ConfigError> {
    match when {
        When::Callback(predicate) => Ok(predicate.call(value, ctx)),
        When::Match { path, condition } => evaluate_match(path, condition, value, ctx),
        When::Cel(expression) => evaluate_cel(expression, value, ctx),
    }
}

fn evaluate_match(
    path: &str,
    condition: &Condition,
    value: &Value,
    ctx: &ValidationContext<'_>,
) -> Result<bool, ConfigError> {
    if path.is_empty() {
        let current = (!ctx.is_property_missing()).then_some(value);
        return evaluate_condition(condition, current);
    }

    if path.starts_with('$') {
        let query = JsonPath::parse(path)
            .map_err(|e| ConfigError::invalid_condition(format!("invalid JSONPath '{}': {}", path, e)))?;
        let nodes = query.query(ctx.root().source()).all();
        if nodes.is_empty() {
            return evaluate_condition(condition, None);
        }
        for node in nodes {
            if evaluate_condition(condition, Some(node))? {
                return Ok(true);
            }
        }
        return Ok(false);
    }

    let target = resolve_simple_path(path, ctx.data_set().source());
    evaluate_condition(condition, target)
}

fn evaluate_cel(
    expression: &str,
    value: &Value,
    ctx: &ValidationContext<'_>,
) -> Result<bool, ConfigError> {
    let Some(evaluator) = ctx.validator().cel_evaluator() else {
        return Err(ConfigError::invalid_condition(
            "CEL condition used but no CEL evaluator is configured",
        ));
    };
    let bindings = json!({
        "value": value,
        "data": ctx.data_set().source(),
        "root": ctx.root().source(),
    });
    match evaluator.evaluate(expression, &bindings)? {
        Value::Bool(b) => Ok(b),
        other => Err(ConfigError::invalid_condition(format!(
            "CEL expression '{}' must evaluate to a boolean, got {}",
            expression, other
        ))),
    }
}
