use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::composite::{AnyRuleHandler, CompositeHandler, EachHandler, NestedHandler, StopOnErrorHandler};
use crate::context::ValidationContext;
use crate::error::{ConfigError, ValidationResult};
use crate::handlers::*;
use crate::types::Rule;

/// Validation logic for one rule kind.
///
/// A handler receives the value, the rule that selected it and the current
/// context. Validation failures go into the returned result; a rule it
/// cannot interpret is a [`ConfigError`].
pub trait RuleHandler: Send + Sync {
    fn validate(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError>;
}

impl<F> RuleHandler for F
where
    F: Fn(&Value, &Rule, &ValidationContext<'_>) -> Result<ValidationResult, ConfigError>
        + Send
        + Sync,
{
    fn validate(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        self(value, rule, ctx)
    }
}

/// Maps rule kind names to handlers.
///
/// Populated before validation starts and read-only afterwards; share it
/// through the owning [`Validator`](crate::validator::Validator).
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn RuleHandler>>,
}

impl HandlerRegistry {
    /// A registry with no handlers at all.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Adds a handler, replacing any handler already registered under `name`.
    pub fn register(&mut self, name: impl Into<String>, handler: impl RuleHandler + 'static) -> &mut Self {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn resolve(&self, name: &str) -> Result<&dyn RuleHandler, ConfigError> {
        self.handlers
            .get(name)
            .map(|h| h.as_ref())
            .ok_or_else(|| ConfigError::HandlerNotFound {
                kind: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for HandlerRegistry {
    /// Every built-in rule kind.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register("required", RequiredHandler)
            .register("length", LengthHandler)
            .register("number", NumberHandler)
            .register("match_regex", MatchRegexHandler)
            .register("email", EmailHandler)
            .register("url", UrlHandler)
            .register("in", InHandler)
            .register("compare", CompareHandler)
            .register("type_of", TypeOfHandler)
            .register("boolean_value", BooleanValueHandler)
            .register("callback", CallbackHandler)
            .register("each", EachHandler)
            .register("nested", NestedHandler)
            .register("composite", CompositeHandler)
            .register("any_rule", AnyRuleHandler)
            .register("stop_on_error", StopOnErrorHandler);
        registry
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_covers_builtin_kinds() {
        let registry = HandlerRegistry::default();
        for name in ["required", "each", "nested", "any_rule", "callback", "type_of"] {
            assert!(registry.contains(name), "missing {}", name);
        }
        assert_eq!(registry.names().len(), 16);
    }

    #[test]
    fn resolving_unknown_kind_is_a_config_error() {
        let registry = HandlerRegistry::empty();
        match registry.resolve("required") {
            Err(ConfigError::HandlerNotFound { kind }) => assert_eq!(kind, "required"),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    fn always_ok(
        _: &Value,
        _: &Rule,
        _: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        Ok(ValidationResult::new())
    }

    #[test]
    fn functions_register_as_handlers() {
        let mut registry = HandlerRegistry::empty();
        registry.register("always_ok", always_ok);
        assert!(registry.contains("always_ok"));
        assert!(registry.resolve("always_ok").is_ok());
    }
}
