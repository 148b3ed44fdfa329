//! Type Attributes
//!
//! Metadata that travels alongside structural nodes: descriptions and
//! confidence-ranked name hints. Final names are picked by a later naming pass;
//! this module only collects the candidates.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

use crate::names::singularize;
use crate::reference::Reference;

// =============================================================================
// Name Hints
// =============================================================================

/// A set of candidate names, either inferred from structure or given by the
/// schema author (`title`, definition names).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeNames {
    names: BTreeSet<String>,
    inferred: bool,
}

impl Default for TypeNames {
    fn default() -> Self {
        Self {
            names: BTreeSet::new(),
            inferred: true,
        }
    }
}

impl TypeNames {
    /// A low-confidence hint derived from the schema's shape
    pub fn inferred(name: impl Into<String>) -> Self {
        Self {
            names: BTreeSet::from([name.into()]),
            inferred: true,
        }
    }

    /// A hint stated by the schema author
    pub fn given(name: impl Into<String>) -> Self {
        Self {
            names: BTreeSet::from([name.into()]),
            inferred: false,
        }
    }

    pub fn is_inferred(&self) -> bool {
        self.inferred
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Singular forms of every name, at inferred confidence
    pub fn singularized(&self) -> Self {
        Self {
            names: self.names.iter().map(|n| singularize(n)).collect(),
            inferred: true,
        }
    }

    /// Merge another hint set. Given names beat inferred ones; names of the
    /// same confidence accumulate.
    pub fn merge(&mut self, other: &TypeNames) {
        if other.is_empty() {
            return;
        }
        match (self.inferred, other.inferred) {
            (true, false) => *self = other.clone(),
            (false, true) => {}
            _ => self.names.extend(other.names.iter().cloned()),
        }
    }
}

// =============================================================================
// Type Attributes
// =============================================================================

/// Everything attached to a node besides its structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeAttributes {
    #[serde(skip_serializing_if = "TypeNames::is_empty")]
    pub names: TypeNames,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub descriptions: BTreeSet<String>,
}

impl TypeAttributes {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.descriptions.is_empty()
    }

    pub fn merge(&mut self, other: &TypeAttributes) {
        self.names.merge(&other.names);
        self.descriptions.extend(other.descriptions.iter().cloned());
    }
}

/// Collect the attributes of a schema fragment.
///
/// A `description` becomes an annotation. While the incoming hints are still
/// inferred, a `title` (or failing that the trailing definition name of
/// `path`) replaces them as a given name.
pub fn make_attributes(schema: &Value, path: &Reference, hints: TypeNames) -> TypeAttributes {
    let mut attributes = TypeAttributes::default();

    if let Some(description) = schema.get("description").and_then(Value::as_str) {
        attributes.descriptions.insert(description.to_string());
    }

    attributes.names = if hints.is_inferred() {
        if let Some(title) = schema.get("title").and_then(Value::as_str) {
            TypeNames::given(title)
        } else if let Some(definition) = path.definition_name() {
            TypeNames::given(definition)
        } else {
            hints
        }
    } else {
        hints
    };

    attributes
}
