use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use regex::Regex;
use std::sync::{Arc, OnceLock};

use crate::context::ValidationContext;
use crate::enums::*;
use crate::error::{ConfigError, ValidationResult};

// ─── Rule ───────────────────────────────────────────────────────────────────

/// One validation check plus its modifiers.
///
/// Rules are immutable values: every builder method consumes the rule and
/// returns a new one. Equality is structural, except for callbacks which
/// compare by identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(flatten)]
    kind: RuleKind,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_skip_on_empty"
    )]
    skip_on_empty: Option<EmptyCondition>,
    #[serde(default, skip_serializing_if = "is_false")]
    skip_on_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    when: Option<When>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Accepts `true`/`false` as shorthand for `when_empty`/`never`.
fn deserialize_skip_on_empty<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<EmptyCondition>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        Value::Bool(true) => Ok(Some(EmptyCondition::when_empty())),
        Value::Bool(false) => Ok(Some(EmptyCondition::Never)),
        Value::String(s) => serde_json::from_value(serde_json::json!({ "condition": s }))
            .map(Some)
            .map_err(serde::de::Error::custom),
        other => serde_json::from_value(other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl Rule {
    pub fn new(kind: impl Into<RuleKind>) -> Self {
        Self {
            kind: kind.into(),
            skip_on_empty: None,
            skip_on_error: false,
            when: None,
        }
    }

    pub fn required() -> Self {
        Rule::new(Required::default())
    }

    pub fn email() -> Self {
        Rule::new(Email::default())
    }

    pub fn url() -> Self {
        Rule::new(Url::default())
    }

    pub fn type_of(value_type: ValueType) -> Self {
        Rule::new(TypeOf::new(value_type))
    }

    /// Applies `rules` to every element of a collection.
    pub fn each(rules: impl Into<RuleSpec>) -> Self {
        Rule::new(Each::new(rules))
    }

    /// Applies property-path keyed rules to a record.
    pub fn nested(rules: impl Into<RuleSpec>) -> Result<Self, ConfigError> {
        Nested::new(rules).map(Rule::new)
    }

    pub fn composite(rules: impl IntoIterator<Item = Rule>) -> Result<Self, ConfigError> {
        Composite::new(rules).map(Rule::new)
    }

    pub fn any(rules: impl IntoIterator<Item = Rule>) -> Result<Self, ConfigError> {
        AnyRule::new(rules).map(Rule::new)
    }

    pub fn stop_on_error(rules: impl IntoIterator<Item = Rule>) -> Result<Self, ConfigError> {
        StopOnError::new(rules).map(Rule::new)
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&Value, &ValidationContext<'_>) -> ValidationResult + Send + Sync + 'static,
    {
        Rule::new(RuleKind::Callback(Callback::new(f)))
    }

    /// A rule handled by whatever handler is registered under `name`.
    pub fn custom(name: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Rule::new(RuleKind::Custom {
            name: name.into(),
            parameters,
        })
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    /// Registry key of the handler implementing this rule.
    pub fn handler_name(&self) -> &str {
        self.kind.name()
    }

    /// The rule's own skip-on-empty condition; `None` defers to the
    /// validator default.
    pub fn empty_condition(&self) -> Option<EmptyCondition> {
        self.skip_on_empty
    }

    pub fn is_skip_on_error(&self) -> bool {
        self.skip_on_error
    }

    pub fn condition(&self) -> Option<&When> {
        self.when.as_ref()
    }

    pub fn skip_on_empty(mut self, condition: EmptyCondition) -> Self {
        self.skip_on_empty = Some(condition);
        self
    }

    pub fn skip_on_error(mut self, skip: bool) -> Self {
        self.skip_on_error = skip;
        self
    }

    pub fn when(mut self, when: When) -> Self {
        self.when = Some(when);
        self
    }

    pub fn when_fn<F>(self, f: F) -> Self
    where
        F: Fn(&Value, &ValidationContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.when(When::callback(f))
    }

    /// Returns a rule whose inner rules carry this rule's `skip_on_empty`,
    /// `skip_on_error` and `when`. Rules without inner rules are returned
    /// unchanged.
    pub fn propagate_options(self) -> Self {
        let skip_on_empty = self.skip_on_empty;
        let skip_on_error = self.skip_on_error;
        let when = self.when.clone();
        let apply = |rule: Rule| -> Rule {
            Rule {
                skip_on_empty,
                skip_on_error,
                when: when.clone(),
                ..rule
            }
            .propagate_options()
        };

        let kind = match self.kind {
            RuleKind::Each(mut each) => {
                each.rules = each.rules.map_rules(&apply);
                RuleKind::Each(each)
            }
            RuleKind::Nested(mut nested) => {
                nested.rules = nested.rules.map_rules(&apply);
                RuleKind::Nested(nested)
            }
            RuleKind::Composite(mut c) => {
                c.rules = c.rules.into_iter().map(&apply).collect();
                RuleKind::Composite(c)
            }
            RuleKind::AnyRule(mut any) => {
                any.rules = any.rules.into_iter().map(&apply).collect();
                RuleKind::AnyRule(any)
            }
            RuleKind::StopOnError(mut s) => {
                s.rules = s.rules.into_iter().map(&apply).collect();
                RuleKind::StopOnError(s)
            }
            other => other,
        };

        Rule { kind, ..self }
    }

    /// Verifies the rule's configuration, recursing into inner rules.
    pub fn check(&self) -> Result<(), ConfigError> {
        if let Some(when) = &self.when {
            when.check()?;
        }
        self.kind.check()
    }
}

impl From<RuleKind> for Rule {
    fn from(kind: RuleKind) -> Self {
        Rule::new(kind)
    }
}

// ─── RuleKind ───────────────────────────────────────────────────────────────

/// The closed set of built-in rule kinds plus an open `Custom` kind.
///
/// The `type` tag selects the handler; `Custom` rules are dispatched by
/// their `name`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    Required(Required),
    Length(Length),
    Number(Number),
    MatchRegex(MatchRegex),
    Email(Email),
    Url(Url),
    In(In),
    Compare(Compare),
    TypeOf(TypeOf),
    BooleanValue(BooleanValue),
    Each(Each),
    Nested(Nested),
    Composite(Composite),
    AnyRule(AnyRule),
    StopOnError(StopOnError),
    #[serde(skip)]
    Callback(Callback),
    Custom {
        name: String,
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        parameters: Map<String, Value>,
    },
}

impl RuleKind {
    pub fn name(&self) -> &str {
        match self {
            RuleKind::Required(_) => "required",
            RuleKind::Length(_) => "length",
            RuleKind::Number(_) => "number",
            RuleKind::MatchRegex(_) => "match_regex",
            RuleKind::Email(_) => "email",
            RuleKind::Url(_) => "url",
            RuleKind::In(_) => "in",
            RuleKind::Compare(_) => "compare",
            RuleKind::TypeOf(_) => "type_of",
            RuleKind::BooleanValue(_) => "boolean_value",
            RuleKind::Each(_) => "each",
            RuleKind::Nested(_) => "nested",
            RuleKind::Composite(_) => "composite",
            RuleKind::AnyRule(_) => "any_rule",
            RuleKind::StopOnError(_) => "stop_on_error",
            RuleKind::Callback(_) => "callback",
            RuleKind::Custom { name, .. } => name,
        }
    }

    /// Whether a validator-wide skip-on-empty default applies. `required`
    /// exists to reject empty values, so only its own condition counts.
    pub fn uses_default_skip_on_empty(&self) -> bool {
        !matches!(self, RuleKind::Required(_))
    }

    fn check(&self) -> Result<(), ConfigError> {
        match self {
            RuleKind::Length(l) => l.check(),
            RuleKind::Number(n) => n.check(),
            RuleKind::MatchRegex(r) => r.check(),
            RuleKind::In(i) => i.check(),
            RuleKind::Compare(c) => c.check(),
            RuleKind::Each(e) => e.rules.check(),
            RuleKind::Nested(n) => {
                if n.rules.is_empty() {
                    return Err(ConfigError::EmptyRules {
                        rule: "nested".to_string(),
                    });
                }
                n.rules.check()
            }
            RuleKind::Composite(c) => check_rule_list("composite", &c.rules),
            RuleKind::AnyRule(a) => check_rule_list("any_rule", &a.rules),
            RuleKind::StopOnError(s) => check_rule_list("stop_on_error", &s.rules),
            RuleKind::Custom { name, .. } if name.is_empty() => Err(ConfigError::invalid_rule(
                "custom",
                "custom rule name must not be empty",
            )),
            _ => Ok(()),
        }
    }
}

fn check_rule_list(rule: &str, rules: &[Rule]) -> Result<(), ConfigError> {
    if rules.is_empty() {
        return Err(ConfigError::EmptyRules {
            rule: rule.to_string(),
        });
    }
    rules.iter().try_for_each(Rule::check)
}

macro_rules! rule_kind_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for RuleKind {
                fn from(rule: $variant) -> Self {
                    RuleKind::$variant(rule)
                }
            }

            impl From<$variant> for Rule {
                fn from(rule: $variant) -> Self {
                    Rule::new(rule)
                }
            }
        )*
    };
}

rule_kind_from!(
    Required,
    Length,
    Number,
    MatchRegex,
    Email,
    Url,
    In,
    Compare,
    TypeOf,
    BooleanValue,
    Each,
    Nested,
    Composite,
    AnyRule,
    StopOnError,
    Callback,
);

// ─── Leaf rule parameters ───────────────────────────────────────────────────

/// Value must be present and not blank (whitespace-only strings are blank).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Required {
    pub message: String,
    pub not_passed_message: String,
}

impl Default for Required {
    fn default() -> Self {
        Self {
            message: "{property} cannot be blank.".to_string(),
            not_passed_message: "{property} not passed.".to_string(),
        }
    }
}

impl Required {
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// Length of a string (in characters), array or object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Length {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exactly: Option<usize>,
    pub incorrect_input_message: String,
    pub less_than_min_message: String,
    pub greater_than_max_message: String,
    pub not_exactly_message: String,
}

impl Default for Length {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            exactly: None,
            incorrect_input_message: "{property} must be a string or a collection.".to_string(),
            less_than_min_message: "{property} must contain at least {min} {unit}.".to_string(),
            greater_than_max_message: "{property} must contain at most {max} {unit}.".to_string(),
            not_exactly_message: "{property} must contain exactly {exactly} {unit}.".to_string(),
        }
    }
}

impl Length {
    pub fn min(min: usize) -> Self {
        Self {
            min: Some(min),
            ..Self::default()
        }
    }

    pub fn max(max: usize) -> Self {
        Self {
            max: Some(max),
            ..Self::default()
        }
    }

    pub fn exactly(exactly: usize) -> Self {
        Self {
            exactly: Some(exactly),
            ..Self::default()
        }
    }

    pub fn between(min: usize, max: usize) -> Result<Self, ConfigError> {
        let length = Self {
            min: Some(min),
            max: Some(max),
            ..Self::default()
        };
        length.check()?;
        Ok(length)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if let (Some(min), Some(max)) = (self.min, self.max)
            && min > max
        {
            return Err(ConfigError::invalid_rule(
                "length",
                format!("min ({}) must not exceed max ({})", min, max),
            ));
        }
        if self.exactly.is_some() && (self.min.is_some() || self.max.is_some()) {
            return Err(ConfigError::invalid_rule(
                "length",
                "exactly cannot be combined with min or max",
            ));
        }
        Ok(())
    }
}

/// Numeric value (numbers or numeric strings) within optional bounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Number {
    pub number_type: NumberType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    pub incorrect_input_message: String,
    pub not_number_message: String,
    pub less_than_min_message: String,
    pub greater_than_max_message: String,
}

impl Default for Number {
    fn default() -> Self {
        Self {
            number_type: NumberType::Float,
            min: None,
            max: None,
            incorrect_input_message: "The allowed types for {property} are integer, float and string."
                .to_string(),
            not_number_message: "{property} must be a number.".to_string(),
            less_than_min_message: "{property} must be no less than {min}.".to_string(),
            greater_than_max_message: "{property} must be no greater than {max}.".to_string(),
        }
    }
}

impl Number {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts integers only.
    pub fn integer() -> Self {
        Self {
            number_type: NumberType::Integer,
            not_number_message: "{property} must be an integer.".to_string(),
            ..Self::default()
        }
    }

    pub fn min(mut self, min: impl Into<f64>) -> Self {
        self.min = Some(min.into());
        self
    }

    pub fn max(mut self, max: impl Into<f64>) -> Self {
        self.max = Some(max.into());
        self
    }

    fn check(&self) -> Result<(), ConfigError> {
        if let (Some(min), Some(max)) = (self.min, self.max)
            && min > max
        {
            return Err(ConfigError::invalid_rule(
                "number",
                format!("min ({}) must not exceed max ({})", min, max),
            ));
        }
        Ok(())
    }
}

/// String must (or, with `not`, must not) match a regular expression.
///
/// The pattern is compiled once and reused for every validated value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchRegex {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub not: bool,
    #[serde(default = "default_invalid_message")]
    pub message: String,
    #[serde(default = "default_string_message")]
    pub incorrect_input_message: String,
    #[serde(skip)]
    compiled: OnceLock<Regex>,
}

impl PartialEq for MatchRegex {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
            && self.not == other.not
            && self.message == other.message
            && self.incorrect_input_message == other.incorrect_input_message
    }
}

fn default_invalid_message() -> String {
    "{property} is invalid.".to_string()
}

fn default_string_message() -> String {
    "{property} must be a string.".to_string()
}

impl MatchRegex {
    pub fn new(pattern: impl Into<String>) -> Result<Self, ConfigError> {
        let rule = Self {
            pattern: pattern.into(),
            not: false,
            message: default_invalid_message(),
            incorrect_input_message: default_string_message(),
            compiled: OnceLock::new(),
        };
        rule.regex()?;
        Ok(rule)
    }

    /// The compiled pattern.
    pub fn regex(&self) -> Result<&Regex, ConfigError> {
        if let Some(re) = self.compiled.get() {
            return Ok(re);
        }
        let re = Regex::new(&self.pattern)
            .map_err(|e| ConfigError::invalid_rule("match_regex", e.to_string()))?;
        Ok(self.compiled.get_or_init(|| re))
    }

    pub fn not(mut self) -> Self {
        self.not = true;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    fn check(&self) -> Result<(), ConfigError> {
        self.regex().map(|_| ())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Email {
    pub message: String,
    pub incorrect_input_message: String,
}

impl Default for Email {
    fn default() -> Self {
        Self {
            message: "{property} is not a valid email address.".to_string(),
            incorrect_input_message: default_string_message(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Url {
    pub valid_schemes: Vec<String>,
    pub message: String,
    pub incorrect_input_message: String,
}

impl Default for Url {
    fn default() -> Self {
        Self {
            valid_schemes: vec!["http".to_string(), "https".to_string()],
            message: "{property} is not a valid URL.".to_string(),
            incorrect_input_message: default_string_message(),
        }
    }
}

impl Url {
    pub fn schemes<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            valid_schemes: schemes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Value must (or, with `not`, must not) be one of `values`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct In {
    pub values: Vec<Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strict: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub not: bool,
    #[serde(default = "default_in_message")]
    pub message: String,
}

fn default_in_message() -> String {
    "{property} is not in the list of acceptable values.".to_string()
}

impl In {
    pub fn new(values: impl IntoIterator<Item = Value>) -> Result<Self, ConfigError> {
        let rule = Self {
            values: values.into_iter().collect(),
            strict: false,
            not: false,
            message: default_in_message(),
        };
        rule.check()?;
        Ok(rule)
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn not(mut self) -> Self {
        self.not = true;
        self
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.values.is_empty() {
            return Err(ConfigError::invalid_rule("in", "values must not be empty"));
        }
        Ok(())
    }
}

/// Compares the value with a literal or with a sibling property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Compare {
    #[serde(default)]
    pub operator: CompareOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Compare {
    pub fn to_value(operator: CompareOperator, target: impl Into<Value>) -> Self {
        Self {
            operator,
            target_value: Some(target.into()),
            target_property: None,
            message: None,
        }
    }

    pub fn to_property(operator: CompareOperator, property: impl Into<String>) -> Self {
        Self {
            operator,
            target_value: None,
            target_property: Some(property.into()),
            message: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// The configured message, or the operator's default.
    pub fn effective_message(&self) -> &str {
        if let Some(m) = &self.message {
            return m;
        }
        match self.operator {
            CompareOperator::Equal => "{property} must be equal to \"{target}\".",
            CompareOperator::NotEqual => "{property} must not be equal to \"{target}\".",
            CompareOperator::GreaterThan => "{property} must be greater than \"{target}\".",
            CompareOperator::GreaterThanOrEqual => {
                "{property} must be greater than or equal to \"{target}\"."
            }
            CompareOperator::LessThan => "{property} must be less than \"{target}\".",
            CompareOperator::LessThanOrEqual => {
                "{property} must be less than or equal to \"{target}\"."
            }
        }
    }

    fn check(&self) -> Result<(), ConfigError> {
        match (&self.target_value, &self.target_property) {
            (Some(_), Some(_)) => Err(ConfigError::invalid_rule(
                "compare",
                "target_value and target_property are mutually exclusive",
            )),
            (None, None) => Err(ConfigError::invalid_rule(
                "compare",
                "either target_value or target_property is required",
            )),
            _ => Ok(()),
        }
    }
}

/// Value must be of a given JSON type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeOf {
    pub value_type: ValueType,
    #[serde(default = "default_type_message")]
    pub message: String,
}

fn default_type_message() -> String {
    "{property} must be of type {type}.".to_string()
}

impl TypeOf {
    pub fn new(value_type: ValueType) -> Self {
        Self {
            value_type,
            message: default_type_message(),
        }
    }

    pub fn integer() -> Self {
        Self::new(ValueType::Integer)
    }

    pub fn float() -> Self {
        Self::new(ValueType::Float)
    }

    pub fn string() -> Self {
        Self::new(ValueType::String)
    }

    pub fn boolean() -> Self {
        Self::new(ValueType::Boolean)
    }
}

/// Value must equal `true_value` or `false_value`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BooleanValue {
    pub true_value: Value,
    pub false_value: Value,
    pub strict: bool,
    pub message: String,
}

impl Default for BooleanValue {
    fn default() -> Self {
        Self {
            true_value: Value::Bool(true),
            false_value: Value::Bool(false),
            strict: false,
            message: "{property} must be either \"{true}\" or \"{false}\".".to_string(),
        }
    }
}

impl BooleanValue {
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

// ─── Composite rule parameters ──────────────────────────────────────────────

/// Applies `rules` to every element of an array or every entry of an object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Each {
    pub rules: RuleSet,
    #[serde(default = "default_each_incorrect_input")]
    pub incorrect_input_message: String,
}

fn default_each_incorrect_input() -> String {
    "{property} must be array or iterable.".to_string()
}

impl Each {
    pub fn new(rules: impl Into<RuleSpec>) -> Self {
        Self {
            rules: rules.into().into_rule_set(),
            incorrect_input_message: default_each_incorrect_input(),
        }
    }
}

/// Applies rules keyed by property path to a record.
///
/// Paths are dot-separated (`author.age`); `\.` escapes a dot and a `*`
/// segment expands over every element at that level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Nested {
    pub rules: RuleSet,
    #[serde(
        default,
        skip_serializing_if = "is_false",
        alias = "errorWhenPropertyPathIsNotFound"
    )]
    pub require_property_path: bool,
    #[serde(default = "default_no_property_path")]
    pub no_property_path_message: String,
    #[serde(default = "default_nested_incorrect_input")]
    pub incorrect_input_message: String,
}

fn default_no_property_path() -> String {
    "Property \"{path}\" is not found.".to_string()
}

fn default_nested_incorrect_input() -> String {
    "{property} must be either an array or an object.".to_string()
}

impl Nested {
    pub fn new(rules: impl Into<RuleSpec>) -> Result<Self, ConfigError> {
        let rules = rules.into().into_rule_set();
        if rules.is_empty() {
            return Err(ConfigError::EmptyRules {
                rule: "nested".to_string(),
            });
        }
        Ok(Self {
            rules,
            require_property_path: false,
            no_property_path_message: default_no_property_path(),
            incorrect_input_message: default_nested_incorrect_input(),
        })
    }

    /// Report a missing path as an error instead of validating `null`.
    pub fn require_property_path(mut self) -> Self {
        self.require_property_path = true;
        self
    }
}

/// A reusable bundle of rules applied to the same value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Composite {
    pub rules: Vec<Rule>,
}

impl Composite {
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Result<Self, ConfigError> {
        let rules: Vec<Rule> = rules.into_iter().collect();
        if rules.is_empty() {
            return Err(ConfigError::EmptyRules {
                rule: "composite".to_string(),
            });
        }
        Ok(Self { rules })
    }
}

/// Passes when at least one inner rule passes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnyRule {
    pub rules: Vec<Rule>,
    #[serde(default = "default_any_message")]
    pub message: String,
}

fn default_any_message() -> String {
    "At least one of the inner rules must pass the validation.".to_string()
}

impl AnyRule {
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Result<Self, ConfigError> {
        let rules: Vec<Rule> = rules.into_iter().collect();
        if rules.is_empty() {
            return Err(ConfigError::EmptyRules {
                rule: "any_rule".to_string(),
            });
        }
        Ok(Self {
            rules,
            message: default_any_message(),
        })
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// Applies inner rules in order, stopping after the first failing one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StopOnError {
    pub rules: Vec<Rule>,
}

impl StopOnError {
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Result<Self, ConfigError> {
        let rules: Vec<Rule> = rules.into_iter().collect();
        if rules.is_empty() {
            return Err(ConfigError::EmptyRules {
                rule: "stop_on_error".to_string(),
            });
        }
        Ok(Self { rules })
    }
}

// ─── Callbacks ──────────────────────────────────────────────────────────────

type CallbackFn = dyn Fn(&Value, &ValidationContext<'_>) -> ValidationResult + Send + Sync;
type PredicateFn = dyn Fn(&Value, &ValidationContext<'_>) -> bool + Send + Sync;

/// Validation logic supplied as a closure. Compares by identity.
#[derive(Clone)]
pub struct Callback(Arc<CallbackFn>);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &ValidationContext<'_>) -> ValidationResult + Send + Sync + 'static,
    {
        Callback(Arc::new(f))
    }

    pub fn call(&self, value: &Value, ctx: &ValidationContext<'_>) -> ValidationResult {
        (self.0)(value, ctx)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Predicate supplied as a closure. Compares by identity.
#[derive(Clone)]
pub struct Predicate(Arc<PredicateFn>);

impl Predicate {
    pub fn call(&self, value: &Value, ctx: &ValidationContext<'_>) -> bool {
        (self.0)(value, ctx)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

// ─── When ───────────────────────────────────────────────────────────────────

/// Activation condition of a rule. A rule whose condition is false is not
/// applied at all.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum When {
    #[serde(skip)]
    Callback(Predicate),
    /// Resolves `path` and tests the result against `condition`.
    ///
    /// An empty path addresses the value under validation, a `$`-prefixed
    /// path is a JSONPath query against the root data, anything else is a
    /// dot path relative to the record holding the property.
    Match {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        path: String,
        condition: Condition,
    },
    /// CEL expression with `value`, `data` and `root` bound; must yield a
    /// boolean.
    Cel(String),
}

impl When {
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&Value, &ValidationContext<'_>) -> bool + Send + Sync + 'static,
    {
        When::Callback(Predicate(Arc::new(f)))
    }

    pub fn matching(path: impl Into<String>, condition: impl Into<Condition>) -> Self {
        When::Match {
            path: path.into(),
            condition: condition.into(),
        }
    }

    pub fn cel(expression: impl Into<String>) -> Self {
        When::Cel(expression.into())
    }

    fn check(&self) -> Result<(), ConfigError> {
        match self {
            When::Callback(_) => Ok(()),
            When::Match { path, condition } => {
                if path.starts_with('$') {
                    serde_json_path::JsonPath::parse(path)
                        .map_err(|e| ConfigError::invalid_condition(e.to_string()))?;
                }
                if let Condition::Operators(MatchCondition {
                    regex: Some(pattern),
                    ..
                }) = condition
                {
                    Regex::new(pattern)
                        .map_err(|e| ConfigError::invalid_condition(e.to_string()))?;
                }
                Ok(())
            }
            When::Cel(expression) => {
                if expression.trim().is_empty() {
                    return Err(ConfigError::invalid_condition("empty CEL expression"));
                }
                Ok(())
            }
        }
    }
}

// ─── Condition ──────────────────────────────────────────────────────────────

/// Match operators; every present operator must pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchCondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equals: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_with: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_with: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
}

const OPERATOR_KEYS: [&str; 11] = [
    "equals",
    "contains",
    "starts_with",
    "ends_with",
    "regex",
    "any_of",
    "gt",
    "lt",
    "gte",
    "lte",
    "exists",
];

impl MatchCondition {
    /// Whether any operator other than `exists` is set.
    pub fn has_value_operators(&self) -> bool {
        self.equals.is_some()
            || self.contains.is_some()
            || self.starts_with.is_some()
            || self.ends_with.is_some()
            || self.regex.is_some()
            || self.any_of.is_some()
            || self.gt.is_some()
            || self.lt.is_some()
            || self.gte.is_some()
            || self.lte.is_some()
    }
}

/// Either a bare value (equality) or an operator object.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Equality(Value),
    Operators(MatchCondition),
}

impl Condition {
    pub fn from_value(v: Value) -> Self {
        if let Value::Object(map) = &v
            && map.keys().any(|k| OPERATOR_KEYS.contains(&k.as_str()))
            && let Ok(cond) = serde_json::from_value::<MatchCondition>(v.clone())
        {
            return Condition::Operators(cond);
        }
        Condition::Equality(v)
    }
}

impl From<Value> for Condition {
    fn from(v: Value) -> Self {
        Condition::from_value(v)
    }
}

impl From<MatchCondition> for Condition {
    fn from(cond: MatchCondition) -> Self {
        Condition::Operators(cond)
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Condition::Equality(v) => v.serialize(serializer),
            Condition::Operators(c) => c.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Condition::from_value)
    }
}

// ─── RuleSet ────────────────────────────────────────────────────────────────

/// Ordered mapping from property name to the rules applied to it.
///
/// The empty name ([`RuleSet::ROOT`]) addresses the whole value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleSet {
    entries: Vec<(String, Vec<Rule>)>,
}

impl RuleSet {
    pub const ROOT: &'static str = "";

    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for the whole value.
    pub fn root(rules: impl IntoIterator<Item = Rule>) -> Self {
        Self::new().property(Self::ROOT, rules)
    }

    /// Adds rules for `name`. Repeated names append to the existing list.
    pub fn property(mut self, name: impl Into<String>, rules: impl IntoIterator<Item = Rule>) -> Self {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => existing.extend(rules),
            None => self.entries.push((name, rules.into_iter().collect())),
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Rule])> {
        self.entries
            .iter()
            .map(|(name, rules)| (name.as_str(), rules.as_slice()))
    }

    pub fn get(&self, name: &str) -> Option<&[Rule]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, rules)| rules.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Verifies every rule's configuration.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.entries
            .iter()
            .flat_map(|(_, rules)| rules.iter())
            .try_for_each(Rule::check)
    }

    pub(crate) fn map_rules(self, f: &impl Fn(Rule) -> Rule) -> Self {
        Self {
            entries: self
                .entries
                .into_iter()
                .map(|(name, rules)| (name, rules.into_iter().map(f).collect()))
                .collect(),
        }
    }
}

impl Serialize for RuleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, rules) in &self.entries {
            map.serialize_entry(name, rules)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        RuleSet::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl RuleSet {
    /// Builds a rule set from its JSON form: a map of property to rule(s),
    /// a list of root rules, or a single root rule.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        if let Value::Object(map) = &value
            && is_rule_object(map)
        {
            return Ok(RuleSet::root(rules_from_value(value)?));
        }
        match value {
            Value::Array(_) => Ok(RuleSet::root(rules_from_value(value)?)),
            Value::Object(map) => {
                let mut set = RuleSet::new();
                for (name, rules) in map {
                    set = set.property(name, rules_from_value(rules)?);
                }
                Ok(set)
            }
            other => Err(ConfigError::InvalidRuleSet {
                message: format!(
                    "expected a map of properties or a list of rules, got {}",
                    other
                ),
            }),
        }
    }
}

fn is_rule_object(map: &Map<String, Value>) -> bool {
    map.get("type").is_some_and(Value::is_string)
}

fn rules_from_value(value: Value) -> Result<Vec<Rule>, ConfigError> {
    let invalid = |e: serde_json::Error| ConfigError::InvalidRuleSet {
        message: e.to_string(),
    };
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value::<Rule>(item).map_err(invalid))
            .collect(),
        Value::Object(_) => Ok(vec![serde_json::from_value(value).map_err(invalid)?]),
        other => Err(ConfigError::InvalidRuleSet {
            message: format!("expected a rule or a list of rules, got {}", other),
        }),
    }
}

// ─── RuleSpec ───────────────────────────────────────────────────────────────

/// Anything accepted where rules are expected.
#[derive(Clone, Debug, PartialEq)]
pub enum RuleSpec {
    Rule(Rule),
    List(Vec<Rule>),
    Set(RuleSet),
}

impl RuleSpec {
    /// Single rules and lists apply to the whole value (root key).
    pub fn into_rule_set(self) -> RuleSet {
        match self {
            RuleSpec::Rule(rule) => RuleSet::root([rule]),
            RuleSpec::List(rules) => RuleSet::root(rules),
            RuleSpec::Set(set) => set,
        }
    }
}

impl From<Rule> for RuleSpec {
    fn from(rule: Rule) -> Self {
        RuleSpec::Rule(rule)
    }
}

impl From<Vec<Rule>> for RuleSpec {
    fn from(rules: Vec<Rule>) -> Self {
        RuleSpec::List(rules)
    }
}

impl<const N: usize> From<[Rule; N]> for RuleSpec {
    fn from(rules: [Rule; N]) -> Self {
        RuleSpec::List(rules.into())
    }
}

impl From<RuleSet> for RuleSpec {
    fn from(set: RuleSet) -> Self {
        RuleSpec::Set(set)
    }
}
