use serde_json::{Map, Value};

use crate::data_set::DataSet;
use crate::error::PathSegment;
use crate::validator::Validator;

/// Per-level state threaded through a validation run.
///
/// A context is never mutated: descending into a property, an element or a
/// sub-value derives a child that points back at its parent.
#[derive(Clone)]
pub struct ValidationContext<'a> {
    validator: &'a Validator,
    root: &'a dyn DataSet,
    data_set: &'a dyn DataSet,
    property: Option<&'a str>,
    path: Vec<PathSegment>,
    is_missing: bool,
    parent: Option<&'a ValidationContext<'a>>,
    parameters: &'a Map<String, Value>,
}

impl<'a> ValidationContext<'a> {
    pub(crate) fn new(
        validator: &'a Validator,
        root: &'a dyn DataSet,
        parameters: &'a Map<String, Value>,
    ) -> Self {
        Self {
            validator,
            root,
            data_set: root,
            property: None,
            path: Vec::new(),
            is_missing: false,
            parent: None,
            parameters,
        }
    }

    /// Context for the rules of `name` within the current data set. The root
    /// name adds no path segment.
    pub fn for_property<'b>(&'b self, name: &'b str, is_missing: bool) -> ValidationContext<'b> {
        let mut path = self.path.clone();
        if !name.is_empty() {
            path.push(PathSegment::Key(name.to_string()));
        }
        ValidationContext {
            validator: self.validator,
            root: self.root,
            data_set: self.data_set,
            property: Some(name).filter(|n| !n.is_empty()).or(self.property),
            path,
            is_missing,
            parent: Some(self),
            parameters: self.parameters,
        }
    }

    /// Context for a location below the current value: an element, an
    /// object entry or a resolved property path.
    pub fn for_item<'b>(&'b self, segments: &[PathSegment], is_missing: bool) -> ValidationContext<'b> {
        let mut path = self.path.clone();
        path.extend_from_slice(segments);
        ValidationContext {
            validator: self.validator,
            root: self.root,
            data_set: self.data_set,
            property: self.property,
            path,
            is_missing,
            parent: Some(self),
            parameters: self.parameters,
        }
    }

    /// Like [`ValidationContext::for_item`], naming the location by the
    /// property path that reached it.
    pub fn for_path<'b>(
        &'b self,
        segments: &[PathSegment],
        property_path: &'b str,
        is_missing: bool,
    ) -> ValidationContext<'b> {
        let mut ctx = self.for_item(segments, is_missing);
        if !property_path.is_empty() {
            ctx.property = Some(property_path);
        }
        ctx
    }

    /// Context for a new level whose properties are read from `data_set`.
    pub fn for_data_set<'b>(&'b self, data_set: &'b dyn DataSet, is_missing: bool) -> ValidationContext<'b> {
        ValidationContext {
            validator: self.validator,
            root: self.root,
            data_set,
            property: self.property,
            path: self.path.clone(),
            is_missing,
            parent: Some(self),
            parameters: self.parameters,
        }
    }

    pub fn validator(&self) -> &'a Validator {
        self.validator
    }

    /// The data set the run started from.
    pub fn root(&self) -> &'a dyn DataSet {
        self.root
    }

    /// The data set holding the property under validation.
    pub fn data_set(&self) -> &'a dyn DataSet {
        self.data_set
    }

    pub fn property(&self) -> Option<&'a str> {
        self.property
    }

    /// Name used for `{property}` in messages.
    pub fn property_label(&self) -> &str {
        self.property.unwrap_or("value")
    }

    /// Absolute path of the value under validation.
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Whether the value under validation was absent from its container.
    pub fn is_property_missing(&self) -> bool {
        self.is_missing
    }

    pub fn parent(&self) -> Option<&'a ValidationContext<'a>> {
        self.parent
    }

    pub fn parameters(&self) -> &'a Map<String, Value> {
        self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&'a Value> {
        self.parameters.get(name)
    }
}

impl std::fmt::Debug for ValidationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationContext")
            .field("property", &self.property)
            .field("path", &self.path)
            .field("is_missing", &self.is_missing)
            .finish_non_exhaustive()
    }
}
