//! Shared value and path operations used by the engine, the composite rules
//! and `when` evaluation.

use crate::error::{ConfigError, PathSegment};
use crate::types::{Condition, MatchCondition};
use regex::Regex;
use serde_json::Value;

// ─── Emptiness ──────────────────────────────────────────────────────────────

/// `null`, `""`, `[]` or `{}`. With `trim`, whitespace-only strings count too.
/// Numbers and booleans are never blank.
pub fn is_blank(value: &Value, trim: bool) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => {
            if trim {
                s.trim().is_empty()
            } else {
                s.is_empty()
            }
        }
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

// ─── Property paths ─────────────────────────────────────────────────────────

/// One parsed step of a property path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathPart {
    Name(String),
    /// `*`: every element of the container at this level.
    Wildcard,
}

/// Splits a property path on unescaped dots.
///
/// `\.` is a literal dot and `\\` a literal backslash. A segment consisting
/// of a lone unescaped `*` is a wildcard. The empty path has no parts and
/// addresses the value itself.
pub fn split_property_path(path: &str) -> Vec<PathPart> {
    if path.is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped_in_segment = false;
    let mut chars = path.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) => {
                    current.push(next);
                    escaped_in_segment = true;
                }
                None => current.push('\\'),
            },
            '.' => {
                parts.push(finish_part(&mut current, escaped_in_segment));
                escaped_in_segment = false;
            }
            c => current.push(c),
        }
    }
    parts.push(finish_part(&mut current, escaped_in_segment));
    parts
}

fn finish_part(current: &mut String, escaped: bool) -> PathPart {
    let name = std::mem::take(current);
    if name == "*" && !escaped {
        PathPart::Wildcard
    } else {
        PathPart::Name(name)
    }
}

/// A concrete location produced by resolving a (possibly wildcard) path.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedPath<'v> {
    pub path: Vec<PathSegment>,
    /// `None` when the location does not exist.
    pub value: Option<&'v Value>,
}

/// Resolves `parts` against `value`.
///
/// Objects are indexed by key and arrays by decimal index. A wildcard fans
/// out over every element of an array or object in source order. A missing
/// step yields a single unresolved location carrying the path walked so far
/// plus the remaining names, so callers can report where the lookup failed.
pub fn resolve_property_path<'v>(parts: &[PathPart], value: &'v Value) -> Vec<ResolvedPath<'v>> {
    let mut current = vec![ResolvedPath {
        path: Vec::new(),
        value: Some(value),
    }];

    for part in parts {
        let mut next = Vec::with_capacity(current.len());
        for location in current {
            match part {
                PathPart::Name(name) => {
                    let (segment, child) = match location.value {
                        Some(container) => child_by_name(container, name),
                        None => (PathSegment::Key(name.clone()), None),
                    };
                    let mut path = location.path;
                    path.push(segment);
                    next.push(ResolvedPath { path, value: child });
                }
                PathPart::Wildcard => match location.value {
                    Some(Value::Array(items)) => {
                        for (i, item) in items.iter().enumerate() {
                            let mut path = location.path.clone();
                            path.push(PathSegment::Index(i));
                            next.push(ResolvedPath {
                                path,
                                value: Some(item),
                            });
                        }
                    }
                    Some(Value::Object(map)) => {
                        for (key, item) in map {
                            let mut path = location.path.clone();
                            path.push(PathSegment::Key(key.clone()));
                            next.push(ResolvedPath {
                                path,
                                value: Some(item),
                            });
                        }
                    }
                    _ => {
                        let mut path = location.path;
                        path.push(PathSegment::Key("*".to_string()));
                        next.push(ResolvedPath { path, value: None });
                    }
                },
            }
        }
        current = next;
    }

    current
}

fn child_by_name<'v>(container: &'v Value, name: &str) -> (PathSegment, Option<&'v Value>) {
    match container {
        Value::Object(map) => (PathSegment::Key(name.to_string()), map.get(name)),
        Value::Array(items) => match name.parse::<usize>() {
            Ok(i) => (PathSegment::Index(i), items.get(i)),
            Err(_) => (PathSegment::Key(name.to_string()), None),
        },
        _ => (PathSegment::Key(name.to_string()), None),
    }
}

/// Resolves a dot path without wildcards. Empty path returns the root value.
pub fn resolve_simple_path<'v>(path: &str, value: &'v Value) -> Option<&'v Value> {
    let mut current = value;
    for part in split_property_path(path) {
        match part {
            PathPart::Name(name) => current = child_by_name(current, &name).1?,
            PathPart::Wildcard => return None,
        }
    }
    Some(current)
}

// ─── Equality ───────────────────────────────────────────────────────────────

/// Deep equality. Integer 42 equals float 42.0; object key order is
/// irrelevant; arrays compare element-wise by position and length.
pub fn values_deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(fa), Some(fb)) => fa == fb,
            _ => a == b,
        },
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(a, b)| values_deep_equal(a, b))
        }
        (Value::Object(a), Value::Object(b)) => {
            if a.len() != b.len() {
                return false;
            }
            a.iter()
                .all(|(k, v)| b.get(k).is_some_and(|bv| values_deep_equal(v, bv)))
        }
        _ => false,
    }
}

/// Deep equality that additionally treats a number and a numeric string as
/// equal when they denote the same number.
pub fn values_loosely_equal(a: &Value, b: &Value) -> bool {
    if values_deep_equal(a, b) {
        return true;
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Numeric view of a JSON number or a numeric string.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
            }
        }
        _ => None,
    }
}

/// Compact textual form used in messages and CEL/text contexts.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

// ─── Match conditions ───────────────────────────────────────────────────────

/// Evaluates a condition against a value.
///
/// Fails only on a malformed condition (an invalid `regex` operator).
pub fn evaluate_condition(
    condition: &Condition,
    value: Option<&Value>,
) -> Result<bool, ConfigError> {
    match condition {
        Condition::Equality(expected) => Ok(value.is_some_and(|v| values_deep_equal(v, expected))),
        Condition::Operators(cond) => evaluate_match_condition(cond, value),
    }
}

/// Every present operator must pass. `exists` tests presence; the other
/// operators fail on a missing value.
pub fn evaluate_match_condition(
    cond: &MatchCondition,
    value: Option<&Value>,
) -> Result<bool, ConfigError> {
    let regex = cond
        .regex
        .as_deref()
        .map(Regex::new)
        .transpose()
        .map_err(|e| ConfigError::invalid_condition(format!("invalid regex: {}", e)))?;

    if let Some(expected) = cond.exists
        && expected != value.is_some()
    {
        return Ok(false);
    }

    let value = match value {
        Some(v) => v,
        None => return Ok(!cond.has_value_operators()),
    };

    if let Some(ref expected) = cond.equals
        && !values_deep_equal(value, expected)
    {
        return Ok(false);
    }

    if let Some(ref s) = cond.contains {
        match value.as_str() {
            Some(v) if v.contains(s.as_str()) => {}
            _ => return Ok(false),
        }
    }

    if let Some(ref s) = cond.starts_with {
        match value.as_str() {
            Some(v) if v.starts_with(s.as_str()) => {}
            _ => return Ok(false),
        }
    }

    if let Some(ref s) = cond.ends_with {
        match value.as_str() {
            Some(v) if v.ends_with(s.as_str()) => {}
            _ => return Ok(false),
        }
    }

    if let Some(ref re) = regex {
        match value.as_str() {
            Some(v) if re.is_match(v) => {}
            _ => return Ok(false),
        }
    }

    if let Some(ref items) = cond.any_of
        && !items.iter().any(|item| values_deep_equal(value, item))
    {
        return Ok(false);
    }

    if let Some(threshold) = cond.gt {
        match value.as_f64() {
            Some(v) if v > threshold => {}
            _ => return Ok(false),
        }
    }

    if let Some(threshold) = cond.lt {
        match value.as_f64() {
            Some(v) if v < threshold => {}
            _ => return Ok(false),
        }
    }

    if let Some(threshold) = cond.gte {
        match value.as_f64() {
            Some(v) if v >= threshold => {}
            _ => return Ok(false),
        }
    }

    if let Some(threshold) = cond.lte {
        match value.as_f64() {
            Some(v) if v <= threshold => {}
            _ => return Ok(false),
        }
    }

    Ok(true)
}
