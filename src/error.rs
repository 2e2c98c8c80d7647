use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::message::MessageFormatter;

/// One step of an error path: a named property or a collection index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl PathSegment {
    pub fn as_key(&self) -> Option<&str> {
        match self {
            PathSegment::Key(k) => Some(k),
            PathSegment::Index(_) => None,
        }
    }

    /// Whether this segment addresses `name`. Indices match their decimal
    /// form, so `"0"` addresses `Index(0)`.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            PathSegment::Key(k) => k == name,
            PathSegment::Index(i) => name.parse::<usize>().is_ok_and(|n| n == *i),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => f.write_str(k),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Renders a path as dot-separated segments. Dots and backslashes inside
/// keys are escaped with a backslash so the result splits back unambiguously.
pub fn path_to_string(path: &[PathSegment]) -> String {
    let mut out = String::new();
    for (i, seg) in path.iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        match seg {
            PathSegment::Key(k) => {
                for c in k.chars() {
                    if c == '.' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
            }
            PathSegment::Index(idx) => out.push_str(&idx.to_string()),
        }
    }
    out
}

/// A single validation failure.
///
/// `message` is an un-rendered template (`"{property} is too short."`);
/// `parameters` carries the values for its placeholders. Rendering is the
/// caller's concern, see [`MessageFormatter`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub path: Vec<PathSegment>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            parameters: Map::new(),
            path: Vec::new(),
        }
    }

    pub fn with_parameters(message: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            message: message.into(),
            parameters,
            path: Vec::new(),
        }
    }

    /// Adds a template parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn at(mut self, path: Vec<PathSegment>) -> Self {
        self.path = path;
        self
    }

    /// Returns the error with `segment` prepended to its path.
    pub fn with_prefix(mut self, segment: PathSegment) -> Self {
        self.path.insert(0, segment);
        self
    }

    pub fn path_string(&self) -> String {
        path_to_string(&self.path)
    }

    pub fn render(&self, formatter: &dyn MessageFormatter) -> String {
        formatter.format(&self.message, &self.parameters)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path_string(), self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// Outcome of a validation run: zero or more errors in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Appends an error built from its parts.
    pub fn add_error(
        &mut self,
        message: impl Into<String>,
        parameters: Map<String, Value>,
        path: Vec<PathSegment>,
    ) -> &mut Self {
        self.errors.push(ValidationError {
            message: message.into(),
            parameters,
            path,
        });
        self
    }

    /// Concatenates `other`'s errors after this result's errors.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }

    /// Concatenates `other`'s errors, prefixing each path with `segment`.
    pub fn merge_with_prefix(&mut self, segment: &PathSegment, other: ValidationResult) {
        self.errors.extend(
            other
                .errors
                .into_iter()
                .map(|e| e.with_prefix(segment.clone())),
        );
    }

    /// Concatenates `other`'s errors, prefixing each path with `prefix`.
    pub fn merge_with_path(&mut self, prefix: &[PathSegment], other: ValidationResult) {
        for mut error in other.errors {
            let mut path = prefix.to_vec();
            path.append(&mut error.path);
            error.path = path;
            self.errors.push(error);
        }
    }

    /// Errors whose path equals `path` exactly.
    pub fn errors_at<'a>(
        &'a self,
        path: &'a [PathSegment],
    ) -> impl Iterator<Item = &'a ValidationError> + 'a {
        self.errors.iter().filter(move |e| e.path == path)
    }

    /// Errors whose path starts with `prefix`.
    pub fn errors_under<'a>(
        &'a self,
        prefix: &'a [PathSegment],
    ) -> impl Iterator<Item = &'a ValidationError> + 'a {
        self.errors.iter().filter(move |e| e.path.starts_with(prefix))
    }

    /// Errors attached to a top-level property, including errors nested
    /// beneath it.
    pub fn property_errors<'a>(
        &'a self,
        property: &'a str,
    ) -> impl Iterator<Item = &'a ValidationError> + 'a {
        self.errors
            .iter()
            .filter(move |e| e.path.first().is_some_and(|s| s.matches(property)))
    }

    pub fn is_property_valid(&self, property: &str) -> bool {
        self.property_errors(property).next().is_none()
    }

    /// Raw message templates in discovery order.
    pub fn error_messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }

    /// Messages grouped by rendered path, in first-seen path order.
    pub fn error_messages_indexed_by_path(&self) -> Vec<(String, Vec<&str>)> {
        let mut grouped: Vec<(String, Vec<&str>)> = Vec::new();
        for error in &self.errors {
            let key = error.path_string();
            match grouped.iter_mut().find(|(p, _)| *p == key) {
                Some((_, messages)) => messages.push(&error.message),
                None => grouped.push((key, vec![&error.message])),
            }
        }
        grouped
    }

    /// The first message for every path.
    pub fn first_error_messages_indexed_by_path(&self) -> Vec<(String, &str)> {
        self.error_messages_indexed_by_path()
            .into_iter()
            .filter_map(|(path, messages)| messages.first().map(|m| (path, *m)))
            .collect()
    }

    /// Messages of whole-value errors (empty path).
    pub fn common_error_messages(&self) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.path.is_empty())
            .map(|e| e.message.as_str())
            .collect()
    }

    /// Renders every error with `formatter`, paired with its rendered path.
    pub fn rendered_messages(&self, formatter: &dyn MessageFormatter) -> Vec<(String, String)> {
        self.errors
            .iter()
            .map(|e| (e.path_string(), e.render(formatter)))
            .collect()
    }

    /// `Ok(())` when valid, the result itself otherwise.
    pub fn into_result(self) -> Result<(), ValidationResult> {
        if self.is_valid() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return write!(f, "valid");
        }
        write!(f, "{} validation error(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationResult {}

impl From<ValidationError> for ValidationResult {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl FromIterator<ValidationError> for ValidationResult {
    fn from_iter<I: IntoIterator<Item = ValidationError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

/// A programming error in rule wiring, distinct from a validation failure.
///
/// Returned from construction or from `validate`; never recorded inside a
/// [`ValidationResult`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// No handler is registered under the rule's kind.
    #[error("no handler registered for rule kind '{kind}'")]
    HandlerNotFound { kind: String },

    /// A handler received a rule of a kind it does not implement.
    #[error("handler '{handler}' expects a '{expected}' rule, got '{actual}'")]
    UnexpectedRule {
        handler: String,
        expected: String,
        actual: String,
    },

    /// A rule's parameters are inconsistent.
    #[error("invalid '{rule}' rule: {message}")]
    InvalidRule { rule: String, message: String },

    /// A rule that bundles other rules was given none.
    #[error("'{rule}' rule requires at least one inner rule")]
    EmptyRules { rule: String },

    #[error("invalid rule set: {message}")]
    InvalidRuleSet { message: String },

    /// A `when` condition could not be evaluated.
    #[error("invalid condition: {message}")]
    InvalidCondition { message: String },

    #[error("failed to parse rules: {message}")]
    Parse { message: String },

    #[error("failed to serialize rules: {message}")]
    Serialize { message: String },
}

impl ConfigError {
    pub fn invalid_rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidRule {
            rule: rule.into(),
            message: message.into(),
        }
    }

    pub fn invalid_condition(message: impl Into<String>) -> Self {
        ConfigError::InvalidCondition {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_segments_serialize_untagged() {
        let error = ValidationError::new("bad").at(vec!["orders".into(), 0.into(), "total".into()]);
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["path"], json!(["orders", 0, "total"]));
    }

    #[test]
    fn path_string_escapes_dots() {
        let path = vec![PathSegment::from("a.b"), PathSegment::Index(2)];
        assert_eq!(path_to_string(&path), "a\\.b.2");
    }

    #[test]
    fn merge_with_prefix_prepends() {
        let mut inner = ValidationResult::new();
        inner.push(ValidationError::new("x").at(vec!["name".into()]));
        let mut outer = ValidationResult::new();
        outer.merge_with_prefix(&PathSegment::Index(3), inner);
        assert_eq!(
            outer.errors()[0].path,
            vec![PathSegment::Index(3), PathSegment::from("name")]
        );
    }

    #[test]
    fn messages_indexed_by_path_keep_first_seen_order() {
        let mut result = ValidationResult::new();
        result.push(ValidationError::new("b1").at(vec!["b".into()]));
        result.push(ValidationError::new("a1").at(vec!["a".into()]));
        result.push(ValidationError::new("b2").at(vec!["b".into()]));
        result.push(ValidationError::new("root"));

        let grouped = result.error_messages_indexed_by_path();
        assert_eq!(grouped[0], ("b".to_string(), vec!["b1", "b2"]));
        assert_eq!(grouped[1], ("a".to_string(), vec!["a1"]));
        assert_eq!(grouped[2], (String::new(), vec!["root"]));
        assert_eq!(result.common_error_messages(), vec!["root"]);
        assert_eq!(
            result.first_error_messages_indexed_by_path()[0],
            ("b".to_string(), "b1")
        );
    }

    #[test]
    fn property_lookup_matches_index_segments() {
        let mut result = ValidationResult::new();
        result.push(ValidationError::new("x").at(vec![1.into(), "name".into()]));
        assert!(!result.is_property_valid("1"));
        assert!(result.is_property_valid("0"));
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::HandlerNotFound {
            kind: "unknown".to_string(),
        };
        assert_eq!(err.to_string(), "no handler registered for rule kind 'unknown'");
    }
}
