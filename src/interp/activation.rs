use hashbrown::HashMap;

use crate::values::Val;

/// A pattern naming attributes whose values are deliberately absent.
///
/// A pattern for `x` marks `x` and everything under it (`x.y`, `x.y.z`)
/// unknown; resolving such a name yields an unknown value instead of a
/// missing-attribute error, enabling partial evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePattern {
    name: String,
}

impl AttributePattern {
    pub fn new(name: impl Into<String>) -> AttributePattern {
        AttributePattern { name: name.into() }
    }

    pub fn matches(&self, attribute: &str) -> bool {
        attribute == self.name
            || (attribute.len() > self.name.len()
                && attribute.starts_with(self.name.as_str())
                && attribute.as_bytes()[self.name.len()] == b'.')
    }
}

/// Per-evaluation lookup from free variable names to values.
///
/// Implementations must answer consistently within one evaluation; the
/// evaluator may resolve the same name more than once.
pub trait Activation {
    fn resolve(&self, name: &str) -> Option<Val>;

    /// Attribute patterns to treat as unknown for this evaluation.
    fn unknown_patterns(&self) -> &[AttributePattern] {
        &[]
    }
}

/// The common map-backed activation.
#[derive(Debug, Default)]
pub struct MapActivation {
    values: HashMap<String, Val>,
    unknowns: Vec<AttributePattern>,
}

impl MapActivation {
    pub fn new() -> MapActivation {
        MapActivation::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Val) -> &mut Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Mark an attribute (and everything under it) unknown.
    pub fn mark_unknown(&mut self, name: impl Into<String>) -> &mut Self {
        self.unknowns.push(AttributePattern::new(name));
        self
    }
}

impl Activation for MapActivation {
    fn resolve(&self, name: &str) -> Option<Val> {
        self.values.get(name).cloned()
    }

    fn unknown_patterns(&self) -> &[AttributePattern] {
        &self.unknowns
    }
}
