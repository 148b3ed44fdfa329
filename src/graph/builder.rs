//! Type Builder Contract
//!
//! The capability the converter is written against. [`TypeGraph`] is the
//! in-crate implementation; renderers or tests can supply their own.

use std::collections::BTreeSet;
use tracing::warn;

use super::{ClassProperty, PrimitiveKind, TypeGraph, TypeKind, TypeRef};
use crate::attributes::TypeAttributes;

/// Allocates and deduplicates type nodes
pub trait TypeBuilder {
    /// Get or create a scalar node
    fn primitive(&mut self, kind: PrimitiveKind) -> TypeRef;

    /// Get or create an enum over the given ordered cases
    fn enum_type(&mut self, cases: Vec<String>) -> TypeRef;

    /// Get or create an array of `items`
    fn array(&mut self, items: TypeRef) -> TypeRef;

    /// Get or create a string-keyed map of `values`
    fn map(&mut self, values: TypeRef) -> TypeRef;

    /// Get or create a class with the given ordered properties
    fn class(&mut self, properties: Vec<ClassProperty>) -> TypeRef;

    /// Allocate a union whose members are set later
    fn forward_union(&mut self) -> TypeRef;

    /// Allocate an intersection whose members are set later
    fn forward_intersection(&mut self) -> TypeRef;

    /// Set the members of a forward-declared union or intersection
    fn set_members(&mut self, set: TypeRef, members: BTreeSet<TypeRef>);

    /// Attach names and descriptions to a node
    fn add_attributes(&mut self, t: TypeRef, attributes: &TypeAttributes);

    /// Expose a node to renderers under `name`
    fn add_top_level(&mut self, name: &str, t: TypeRef);
}

impl TypeBuilder for TypeGraph {
    fn primitive(&mut self, kind: PrimitiveKind) -> TypeRef {
        self.intern(TypeKind::Primitive { primitive: kind })
    }

    fn enum_type(&mut self, cases: Vec<String>) -> TypeRef {
        self.intern(TypeKind::Enum { cases })
    }

    fn array(&mut self, items: TypeRef) -> TypeRef {
        self.intern(TypeKind::Array { items })
    }

    fn map(&mut self, values: TypeRef) -> TypeRef {
        self.intern(TypeKind::Map { values })
    }

    fn class(&mut self, properties: Vec<ClassProperty>) -> TypeRef {
        self.intern(TypeKind::Class { properties })
    }

    fn forward_union(&mut self) -> TypeRef {
        self.forward(TypeKind::Union { members: None })
    }

    fn forward_intersection(&mut self) -> TypeRef {
        self.forward(TypeKind::Intersection { members: None })
    }

    fn set_members(&mut self, set: TypeRef, members: BTreeSet<TypeRef>) {
        self.replace_members(set, members);
    }

    fn add_attributes(&mut self, t: TypeRef, attributes: &TypeAttributes) {
        if !attributes.is_empty() {
            self.merge_attributes(t, attributes);
        }
    }

    fn add_top_level(&mut self, name: &str, t: TypeRef) {
        if let Some(previous) = self.top_levels.insert(name.to_string(), t) {
            if previous != t {
                warn!(name, %previous, replacement = %t, "top-level type replaced");
            }
        }
    }
}
