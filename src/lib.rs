//! Composable rule engine for validating structured data.
//!
//! Data is a [`serde_json::Value`]; rules are immutable, serializable
//! values grouped into a [`RuleSet`] keyed by property name. Validation
//! returns a [`ValidationResult`] whose errors carry an un-rendered message
//! template, its parameters and the path of the failing value:
//!
//! ```text
//! parse_rules(yaml) → RuleSet ─┐
//!                              ├→ Validator::validate → ValidationResult → format_messages
//!                  Value ──────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use ruleval::{Number, Rule, RuleSet, Validator};
//! use serde_json::json;
//!
//! let rules = RuleSet::new()
//!     .property("name", [Rule::required()])
//!     .property("tags", [Rule::each([Rule::new(Number::new().max(13))])]);
//!
//! let result = Validator::new()
//!     .validate(&json!({"name": "", "tags": [10, 20, 30]}), rules)
//!     .expect("rules are well-formed");
//!
//! assert_eq!(result.len(), 3);
//! assert_eq!(result.errors()[1].path_string(), "tags.1");
//! ```
//!
//! Rules can also be loaded from YAML:
//!
//! ```rust
//! let yaml = r#"
//! author:
//!   type: nested
//!   rules:
//!     age:
//!       - type: number
//!         min: 20
//! "#;
//!
//! let result = ruleval::validate_yaml(yaml, &serde_json::json!({"author": {"age": 18}}))
//!     .expect("valid rules");
//! assert_eq!(result.errors()[0].path_string(), "author.age");
//! ```
//!
//! # Feature Flags
//!
//! | Feature    | Default | Description |
//! |------------|---------|-------------|
//! | `cel-eval` | yes     | CEL `when` conditions via the [`cel`] crate. Enables [`evaluate::DefaultCelEvaluator`]. |
//!
//! # Logging
//!
//! The engine emits [`tracing`] events: `debug` when a run starts and ends,
//! `trace` for every dispatched or skipped rule. No subscriber is installed.

pub mod composite;
pub mod context;
pub mod data_set;
pub mod enums;
pub mod error;
pub mod evaluate;
pub mod handlers;
pub mod message;
pub mod parse;
pub mod primitives;
pub mod registry;
pub mod serialize;
pub mod types;
pub mod validator;

pub use context::ValidationContext;
pub use data_set::{ArrayDataSet, DataSet, ObjectDataSet, RulesCache, RulesProvider, SingleValueDataSet};
pub use enums::*;
pub use error::*;
pub use message::{MessageFormatter, SimpleMessageFormatter};
pub use registry::{HandlerRegistry, RuleHandler};
pub use types::*;
pub use validator::{RuleOutcome, SkipReason, Validator, ValidatorBuilder};

// Re-export entry-point functions at the crate root for convenience.
pub use parse::parse_rules;
pub use serialize::serialize_rules;

/// Validates `value` with a default [`Validator`].
pub fn validate(
    value: &serde_json::Value,
    rules: impl Into<RuleSpec>,
) -> Result<ValidationResult, ConfigError> {
    Validator::new().validate(value, rules)
}

/// Parses `rules` from YAML and validates `value` against them.
///
/// # Errors
///
/// Returns a [`ConfigError`] when the rules do not parse or are
/// misconfigured. Validation failures are reported in the result.
pub fn validate_yaml(
    rules: &str,
    value: &serde_json::Value,
) -> Result<ValidationResult, ConfigError> {
    let rules = parse::parse_rules(rules)?;
    Validator::new().validate(value, rules)
}
