//! Read-only accessors over the subject of a validation run.
//!
//! The engine never inspects a value directly when reading named
//! properties; it goes through a [`DataSet`]. A fresh accessor is built for
//! every value entering the engine, including sub-values reached by
//! composite rules.

use serde::Serialize;
use serde_json::Value;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::ConfigError;
use crate::types::RuleSet;

static NULL: Value = Value::Null;

/// Uniform read interface over a validated value.
pub trait DataSet {
    /// The named property, or `None` when absent.
    fn property(&self, name: &str) -> Option<&Value>;

    /// The whole validated value.
    fn source(&self) -> &Value;

    /// The record-like value behind this data set, `None` for scalars.
    fn data(&self) -> Option<&Value>;

    /// Rules supplied by the value itself, used when the caller passes none.
    fn rules(&self) -> Option<RuleSet> {
        None
    }

    /// The named property, `null` when absent.
    fn property_value(&self, name: &str) -> &Value {
        self.property(name).unwrap_or(&NULL)
    }

    fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }
}

/// Accessor over an object or an array. Array elements are addressed by
/// their decimal index (`"0"`, `"1"`, ...).
#[derive(Clone, Copy, Debug)]
pub struct ArrayDataSet<'v> {
    value: &'v Value,
}

impl<'v> ArrayDataSet<'v> {
    pub fn new(value: &'v Value) -> Self {
        Self { value }
    }
}

impl DataSet for ArrayDataSet<'_> {
    fn property(&self, name: &str) -> Option<&Value> {
        match self.value {
            Value::Object(map) => map.get(name),
            Value::Array(items) => name.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    fn source(&self) -> &Value {
        self.value
    }

    fn data(&self) -> Option<&Value> {
        match self.value {
            Value::Object(_) | Value::Array(_) => Some(self.value),
            _ => None,
        }
    }
}

/// Accessor over a scalar. It has no properties.
#[derive(Clone, Copy, Debug)]
pub struct SingleValueDataSet<'v> {
    value: &'v Value,
}

impl<'v> SingleValueDataSet<'v> {
    pub fn new(value: &'v Value) -> Self {
        Self { value }
    }
}

impl DataSet for SingleValueDataSet<'_> {
    fn property(&self, _name: &str) -> Option<&Value> {
        None
    }

    fn source(&self) -> &Value {
        self.value
    }

    fn data(&self) -> Option<&Value> {
        None
    }
}

/// Picks the accessor matching the shape of `value`.
pub fn data_set_for(value: &Value) -> Box<dyn DataSet + '_> {
    match value {
        Value::Object(_) | Value::Array(_) => Box::new(ArrayDataSet::new(value)),
        _ => Box::new(SingleValueDataSet::new(value)),
    }
}

// ─── Host objects ───────────────────────────────────────────────────────────

/// A host type that knows its own validation rules.
pub trait RulesProvider {
    fn rules(&self) -> RuleSet;
}

impl RulesProvider for RuleSet {
    fn rules(&self) -> RuleSet {
        self.clone()
    }
}

/// Accessor over a host object.
///
/// The object is serialized once on construction; property reads go
/// against that snapshot. Rules come from [`RulesProvider::rules`],
/// optionally memoized per type in a [`RulesCache`].
#[derive(Clone, Debug)]
pub struct ObjectDataSet {
    value: Value,
    rules: RuleSet,
}

impl ObjectDataSet {
    pub fn new<T: Serialize + RulesProvider>(object: &T) -> Result<Self, ConfigError> {
        Ok(Self {
            value: snapshot(object)?,
            rules: object.rules(),
        })
    }

    /// Like [`ObjectDataSet::new`], reading rules through `cache`.
    ///
    /// The cache is keyed by type, so it must only be used for providers
    /// whose rules do not depend on the instance.
    pub fn with_cache<T: Serialize + RulesProvider + 'static>(
        object: &T,
        cache: &RulesCache,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            value: snapshot(object)?,
            rules: cache.get_or_insert::<T>(|| object.rules()),
        })
    }
}

fn snapshot<T: Serialize>(object: &T) -> Result<Value, ConfigError> {
    serde_json::to_value(object).map_err(|e| ConfigError::Serialize {
        message: e.to_string(),
    })
}

impl DataSet for ObjectDataSet {
    fn property(&self, name: &str) -> Option<&Value> {
        match &self.value {
            Value::Object(map) => map.get(name),
            Value::Array(items) => name.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    fn source(&self) -> &Value {
        &self.value
    }

    fn data(&self) -> Option<&Value> {
        match &self.value {
            Value::Object(_) | Value::Array(_) => Some(&self.value),
            _ => None,
        }
    }

    fn rules(&self) -> Option<RuleSet> {
        Some(self.rules.clone())
    }
}

/// Explicit, caller-owned memo of provider rules keyed by type.
///
/// An optimization only: a disabled cache always asks the provider.
#[derive(Debug)]
pub struct RulesCache {
    enabled: AtomicBool,
    entries: RwLock<HashMap<TypeId, Arc<RuleSet>>>,
}

impl Default for RulesCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RulesCache {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn disabled() -> Self {
        let cache = Self::new();
        cache.set_enabled(false);
        cache
    }

    /// Disabling also drops every memoized entry.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        if !enabled {
            self.clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_or_insert<T: 'static>(&self, build: impl FnOnce() -> RuleSet) -> RuleSet {
        if !self.is_enabled() {
            return build();
        }
        let key = TypeId::of::<T>();
        if let Some(rules) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return RuleSet::clone(rules);
        }
        let rules = Arc::new(build());
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        RuleSet::clone(entries.entry(key).or_insert(rules))
    }
}
