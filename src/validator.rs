//! The validation engine.
//!
//! [`Validator`] walks a [`RuleSet`] against a value: for every property it
//! evaluates each rule's modifiers, dispatches to the registered handler and
//! merges the handler's errors under the property's path segment. Composite
//! handlers re-enter the engine through [`Validator::validate_value`] and
//! [`Validator::validate_rules`].

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::context::ValidationContext;
use crate::data_set::{DataSet, ObjectDataSet, RulesCache, RulesProvider, data_set_for};
use crate::enums::EmptyCondition;
use crate::error::{ConfigError, PathSegment, ValidationResult};
use crate::evaluate::{CelEvaluator, evaluate_when};
use crate::message::{MessageFormatter, SimpleMessageFormatter};
use crate::registry::HandlerRegistry;
use crate::types::{Rule, RuleSet, RuleSpec};

static NULL: Value = Value::Null;

/// Why a rule was not applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The rule's `when` condition was false.
    When,
    /// The value is empty under the active empty condition.
    Empty,
    /// An earlier rule for the same property already failed.
    PriorError,
}

/// Outcome of applying a single rule.
#[derive(Clone, Debug, PartialEq)]
pub enum RuleOutcome {
    Skipped(SkipReason),
    Applied(ValidationResult),
}

/// Validates values against rule sets.
///
/// A validator is immutable once built and can be shared across threads.
#[derive(Clone)]
pub struct Validator {
    registry: HandlerRegistry,
    default_skip_on_empty: Option<EmptyCondition>,
    cel_evaluator: Option<Arc<dyn CelEvaluator>>,
    formatter: Arc<dyn MessageFormatter>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Validator {
    /// A validator with every built-in handler registered.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ValidatorBuilder {
        ValidatorBuilder::default()
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn default_skip_on_empty(&self) -> Option<EmptyCondition> {
        self.default_skip_on_empty
    }

    pub fn cel_evaluator(&self) -> Option<&dyn CelEvaluator> {
        self.cel_evaluator.as_deref()
    }

    pub fn formatter(&self) -> &dyn MessageFormatter {
        self.formatter.as_ref()
    }

    // ─── Entry points ───────────────────────────────────────────────────────

    /// Validates `value` against `rules`.
    ///
    /// A single rule or a list of rules applies to the whole value. Returns
    /// `Err` only for configuration problems; validation failures are in
    /// the returned result.
    pub fn validate(
        &self,
        value: &Value,
        rules: impl Into<RuleSpec>,
    ) -> Result<ValidationResult, ConfigError> {
        self.validate_with_parameters(value, rules, &Map::new())
    }

    /// Like [`Validator::validate`], exposing `parameters` to handlers and
    /// callbacks through [`ValidationContext::parameter`].
    pub fn validate_with_parameters(
        &self,
        value: &Value,
        rules: impl Into<RuleSpec>,
        parameters: &Map<String, Value>,
    ) -> Result<ValidationResult, ConfigError> {
        let rules = rules.into().into_rule_set();
        let data_set = data_set_for(value);
        self.run(data_set.as_ref(), &rules, parameters)
    }

    /// Validates a data set. Without explicit rules the data set's own
    /// rules are used; a data set without rules is trivially valid.
    pub fn validate_data_set(
        &self,
        data_set: &dyn DataSet,
        rules: Option<RuleSpec>,
    ) -> Result<ValidationResult, ConfigError> {
        let rules = match rules.map(RuleSpec::into_rule_set).or_else(|| data_set.rules()) {
            Some(rules) => rules,
            None => {
                debug!("no rules supplied or provided; result is valid");
                return Ok(ValidationResult::new());
            }
        };
        self.run(data_set, &rules, &Map::new())
    }

    /// Validates a host object against the rules it provides.
    pub fn validate_object<T: Serialize + RulesProvider>(
        &self,
        object: &T,
    ) -> Result<ValidationResult, ConfigError> {
        let data_set = ObjectDataSet::new(object)?;
        self.validate_data_set(&data_set, None)
    }

    /// Like [`Validator::validate_object`], reading provider rules through
    /// `cache`.
    pub fn validate_object_cached<T: Serialize + RulesProvider + 'static>(
        &self,
        object: &T,
        cache: &RulesCache,
    ) -> Result<ValidationResult, ConfigError> {
        let data_set = ObjectDataSet::with_cache(object, cache)?;
        self.validate_data_set(&data_set, None)
    }

    /// Renders every error of `result` with this validator's formatter.
    pub fn format_messages(&self, result: &ValidationResult) -> Vec<(String, String)> {
        result.rendered_messages(self.formatter.as_ref())
    }

    /// Runs `f` with a root context over `value`. Useful for exercising a
    /// handler or a condition outside a full run.
    pub fn with_context<R>(&self, value: &Value, f: impl FnOnce(&ValidationContext<'_>) -> R) -> R {
        let parameters = Map::new();
        let data_set = data_set_for(value);
        let ctx = ValidationContext::new(self, data_set.as_ref(), &parameters);
        f(&ctx)
    }

    fn run(
        &self,
        data_set: &dyn DataSet,
        rules: &RuleSet,
        parameters: &Map<String, Value>,
    ) -> Result<ValidationResult, ConfigError> {
        rules.check()?;
        debug!(properties = rules.len(), "validation started");
        let ctx = ValidationContext::new(self, data_set, parameters);
        let result = self.validate_properties(data_set, rules, &ctx)?;
        debug!(
            errors = result.len(),
            valid = result.is_valid(),
            "validation finished"
        );
        Ok(result)
    }

    // ─── Recursion ──────────────────────────────────────────────────────────

    /// Validates a sub-value as a new level: named properties are read from
    /// `value` and error paths are relative to it. `None` validates an
    /// absent value (`null`, flagged as missing).
    pub fn validate_value(
        &self,
        value: Option<&Value>,
        rules: &RuleSet,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let data_set = data_set_for(value.unwrap_or(&NULL));
        let level_ctx = ctx.for_data_set(data_set.as_ref(), value.is_none());
        self.validate_properties(data_set.as_ref(), rules, &level_ctx)
    }

    /// Applies `rules` in order to the same value at the same path.
    ///
    /// A rule with `skip_on_error` is skipped once an earlier rule of this
    /// list has failed.
    pub fn validate_rules(
        &self,
        value: &Value,
        rules: &[Rule],
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::new();
        for rule in rules {
            if let RuleOutcome::Applied(outcome) = self.apply_rule(value, rule, ctx, !result.is_valid())? {
                result.merge(outcome);
            }
        }
        Ok(result)
    }

    /// Evaluates one rule's modifiers and, unless it is skipped, dispatches
    /// it to its handler.
    pub fn apply_rule(
        &self,
        value: &Value,
        rule: &Rule,
        ctx: &ValidationContext<'_>,
        prior_failed: bool,
    ) -> Result<RuleOutcome, ConfigError> {
        let kind = rule.handler_name();

        if let Some(when) = rule.condition()
            && !evaluate_when(when, value, ctx)?
        {
            trace!(rule = kind, path = ?ctx.path(), "skipped: when condition is false");
            return Ok(RuleOutcome::Skipped(SkipReason::When));
        }

        let default_empty = self
            .default_skip_on_empty
            .filter(|_| rule.kind().uses_default_skip_on_empty());
        let empty = rule
            .empty_condition()
            .or(default_empty)
            .unwrap_or_default();
        if empty.is_empty(value, ctx.is_property_missing()) {
            trace!(rule = kind, path = ?ctx.path(), "skipped: value is empty");
            return Ok(RuleOutcome::Skipped(SkipReason::Empty));
        }

        if rule.is_skip_on_error() && prior_failed {
            trace!(rule = kind, path = ?ctx.path(), "skipped: earlier rule failed");
            return Ok(RuleOutcome::Skipped(SkipReason::PriorError));
        }

        let handler = self.registry.resolve(kind)?;
        trace!(rule = kind, path = ?ctx.path(), "dispatching");
        handler.validate(value, rule, ctx).map(RuleOutcome::Applied)
    }

    fn validate_properties(
        &self,
        data_set: &dyn DataSet,
        rules: &RuleSet,
        ctx: &ValidationContext<'_>,
    ) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::new();
        for (property, property_rules) in rules.iter() {
            let (value, is_missing) = if property.is_empty() {
                (data_set.source(), ctx.is_property_missing())
            } else {
                match data_set.property(property) {
                    Some(value) => (value, false),
                    None => (&NULL, true),
                }
            };

            let property_ctx = ctx.for_property(property, is_missing);
            let property_result = self.validate_rules(value, property_rules, &property_ctx)?;
            if property.is_empty() {
                result.merge(property_result);
            } else {
                result.merge_with_prefix(&PathSegment::Key(property.to_string()), property_result);
            }
        }
        Ok(result)
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("registry", &self.registry)
            .field("default_skip_on_empty", &self.default_skip_on_empty)
            .field("cel", &self.cel_evaluator.is_some())
            .finish_non_exhaustive()
    }
}

// ─── Builder ────────────────────────────────────────────────────────────────

/// Configures a [`Validator`].
pub struct ValidatorBuilder {
    registry: HandlerRegistry,
    default_skip_on_empty: Option<EmptyCondition>,
    cel_evaluator: Option<Arc<dyn CelEvaluator>>,
    formatter: Arc<dyn MessageFormatter>,
}

impl Default for ValidatorBuilder {
    fn default() -> Self {
        Self {
            registry: HandlerRegistry::default(),
            default_skip_on_empty: None,
            cel_evaluator: default_cel_evaluator(),
            formatter: Arc::new(SimpleMessageFormatter),
        }
    }
}

#[cfg(feature = "cel-eval")]
fn default_cel_evaluator() -> Option<Arc<dyn CelEvaluator>> {
    Some(Arc::new(crate::evaluate::DefaultCelEvaluator))
}

#[cfg(not(feature = "cel-eval"))]
fn default_cel_evaluator() -> Option<Arc<dyn CelEvaluator>> {
    None
}

impl ValidatorBuilder {
    /// Replaces the whole handler registry.
    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Registers an additional handler (or overrides a built-in one).
    pub fn handler(
        mut self,
        name: impl Into<String>,
        handler: impl crate::registry::RuleHandler + 'static,
    ) -> Self {
        self.registry.register(name, handler);
        self
    }

    /// Empty condition for rules that do not set their own.
    pub fn skip_on_empty(mut self, condition: EmptyCondition) -> Self {
        self.default_skip_on_empty = Some(condition);
        self
    }

    pub fn cel_evaluator(mut self, evaluator: impl CelEvaluator + 'static) -> Self {
        self.cel_evaluator = Some(Arc::new(evaluator));
        self
    }

    /// Disables CEL conditions; rules using them fail with a
    /// [`ConfigError`].
    pub fn without_cel(mut self) -> Self {
        self.cel_evaluator = None;
        self
    }

    pub fn formatter(mut self, formatter: impl MessageFormatter + 'static) -> Self {
        self.formatter = Arc::new(formatter);
        self
    }

    pub fn build(self) -> Validator {
        Validator {
            registry: self.registry,
            default_skip_on_empty: self.default_skip_on_empty,
            cel_evaluator: self.cel_evaluator,
            formatter: self.formatter,
        }
    }
}
