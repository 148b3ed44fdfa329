//! Schema Conversion
//!
//! Recursive descent from JSON Schema fragments to type graph nodes.
//!
//! Every converted fragment is memoized by its [`Reference`]. Unions and
//! intersections are allocated empty and bound to their path before their
//! children are converted, so a `$ref` that leads back to an ancestor finds
//! the ancestor's handle instead of recursing forever.

pub mod toplevel;

pub use toplevel::{definition_refs, top_level_refs};

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, trace, warn};

use crate::attributes::{make_attributes, TypeAttributes, TypeNames};
use crate::error::{json_kind, ConvertError, Result};
use crate::graph::{ClassProperty, PrimitiveKind, TypeBuilder, TypeGraph, TypeRef};
use crate::reference::{PathElement, Reference};
use crate::resolver::lookup_ref;
use crate::store::{DocumentStore, MemoryStore};

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Abort once `to_type` recursion gets this deep. `None` disables the check.
    pub max_depth: Option<usize>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self { max_depth: Some(128) }
    }
}

// =============================================================================
// Type Names
// =============================================================================

/// The primitive type names a `type` field may list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeName {
    Object,
    Array,
    Boolean,
    Null,
    Integer,
    Number,
    String,
}

impl TypeName {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            "boolean" => Some(Self::Boolean),
            "null" => Some(Self::Null),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "string" => Some(Self::String),
            _ => None,
        }
    }
}

/// Combinator keywords converted through [`Converter::make_types_from_cases`]
#[derive(Debug, Clone, Copy)]
enum Combinator {
    AllOf,
    OneOf,
    AnyOf,
}

impl Combinator {
    fn keyword(self) -> &'static str {
        match self {
            Combinator::AllOf => "allOf",
            Combinator::OneOf => "oneOf",
            Combinator::AnyOf => "anyOf",
        }
    }

    fn element(self, index: usize) -> PathElement {
        match self {
            Combinator::AllOf => PathElement::AllOf(index),
            Combinator::OneOf => PathElement::OneOf(index),
            Combinator::AnyOf => PathElement::AnyOf(index),
        }
    }
}

// =============================================================================
// Converter
// =============================================================================

/// One conversion run.
///
/// The memo table lives exactly as long as the converter; nodes outlive it
/// inside the builder.
pub struct Converter<'a, B: TypeBuilder> {
    builder: &'a mut B,
    store: &'a mut dyn DocumentStore,
    memo: HashMap<Reference, TypeRef>,
    /// Paths of the pure `$ref` fragments currently being followed
    ref_chain: Vec<Reference>,
    options: ConvertOptions,
}

impl<'a, B: TypeBuilder> Converter<'a, B> {
    pub fn new(builder: &'a mut B, store: &'a mut dyn DocumentStore, options: ConvertOptions) -> Self {
        Self {
            builder,
            store,
            memo: HashMap::new(),
            ref_chain: Vec::new(),
            options,
        }
    }

    /// Number of paths bound so far
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    /// Convert every named reference and register it as a top-level type.
    ///
    /// References into other documents are fetched from the store; a
    /// relative reference walks from the root of `root`.
    pub fn convert(
        &mut self,
        root: &Value,
        root_address: &str,
        top_levels: &BTreeMap<String, Reference>,
    ) -> Result<()> {
        for (name, reference) in top_levels {
            let fetched;
            let document = if reference.address() == root_address {
                root
            } else {
                fetched = self.store.fetch(reference.address())?;
                &*fetched
            };

            let start = Reference::root(reference.address());
            let (fragment, resolved) = lookup_ref(document, document, &start, reference)?;
            let t = self.to_type(document, fragment, &resolved, TypeNames::inferred(name.as_str()), 0)?;

            debug!(name = %name, path = %resolved, node = %t, "registered top-level type");
            self.builder.add_top_level(name, t);
        }
        Ok(())
    }

    /// Convert `fragment`, found at `path` inside `document`.
    ///
    /// A path that is already bound returns its node without descending.
    pub fn to_type(
        &mut self,
        document: &Value,
        fragment: &Value,
        path: &Reference,
        hints: TypeNames,
        depth: usize,
    ) -> Result<TypeRef> {
        if let Some(&t) = self.memo.get(path) {
            trace!(path = %path, node = %t, "memo hit");
            return Ok(t);
        }

        if let Some(limit) = self.options.max_depth {
            if depth > limit {
                return Err(ConvertError::DepthExceeded {
                    path: path.to_string(),
                    limit,
                });
            }
        }

        debug!(path = %path, depth, "converting schema fragment");

        // Anything other than a `$ref` binds a node before descending, so a
        // chain of refs only matters until it reaches one
        let outer_chain = match fragment.get("$ref") {
            Some(_) => None,
            None => Some(std::mem::take(&mut self.ref_chain)),
        };
        let converted = self.convert_fragment(document, fragment, path, hints, depth);
        if let Some(chain) = outer_chain {
            self.ref_chain = chain;
        }

        let t = converted?;
        self.bind(path, t)?;
        Ok(t)
    }

    /// Write-once memo binding
    fn bind(&mut self, path: &Reference, t: TypeRef) -> Result<()> {
        match self.memo.get(path) {
            Some(&existing) if existing != t => Err(ConvertError::ConflictingBinding {
                path: path.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.memo.insert(path.clone(), t);
                Ok(())
            }
        }
    }

    fn convert_fragment(
        &mut self,
        document: &Value,
        fragment: &Value,
        path: &Reference,
        hints: TypeNames,
        depth: usize,
    ) -> Result<TypeRef> {
        let schema = match fragment {
            // `true` accepts anything; `false` accepts nothing, which no
            // node kind can express, so it degrades to `any` as well
            Value::Bool(_) => return Ok(self.builder.primitive(PrimitiveKind::Any)),
            Value::Object(schema) => schema,
            other => return Err(ConvertError::expected(path, "schema object or boolean", other)),
        };

        if let Some(reference) = schema.get("$ref") {
            return self.follow_ref(document, fragment, reference, path, hints, depth);
        }

        let attributes = make_attributes(fragment, path, hints);

        if let Some(cases) = schema.get("enum") {
            return self.convert_enum(cases, path, &attributes);
        }

        let intersection = self.builder.forward_intersection();
        self.bind(path, intersection)?;

        let mut members = BTreeSet::new();

        if let Some(cases) = schema.get("allOf") {
            members.extend(self.make_types_from_cases(document, cases, path, Combinator::AllOf, &attributes.names, depth)?);
        }
        for combinator in [Combinator::OneOf, Combinator::AnyOf] {
            if let Some(cases) = schema.get(combinator.keyword()) {
                let union = self.builder.forward_union();
                let branches = self.make_types_from_cases(document, cases, path, combinator, &attributes.names, depth)?;
                self.builder.set_members(union, branches);
                members.insert(union);
            }
        }
        if let Some(t) = self.convert_types(document, schema, path, &attributes, depth)? {
            members.insert(t);
        }

        if members.is_empty() {
            members.insert(self.builder.primitive(PrimitiveKind::Any));
        }

        self.builder.set_members(intersection, members);
        self.builder.add_attributes(intersection, &attributes);
        Ok(intersection)
    }

    fn follow_ref(
        &mut self,
        document: &Value,
        fragment: &Value,
        reference: &Value,
        path: &Reference,
        hints: TypeNames,
        depth: usize,
    ) -> Result<TypeRef> {
        let target = Reference::parse_value(path.address(), reference, path)?;
        debug!(from = %path, to = %target, address = target.address(), "following $ref");

        let hints = if hints.is_inferred() {
            target.name().map(TypeNames::inferred).unwrap_or(hints)
        } else {
            hints
        };

        if target.address() == path.address() {
            let (resolved_fragment, resolved) = lookup_ref(document, fragment, path, &target)?;
            return self.follow_resolved(document, resolved_fragment, path, &resolved, hints, depth);
        }

        let other = self.store.fetch(target.address())?;
        let start = Reference::root(target.address());
        let (resolved_fragment, resolved) = lookup_ref(&other, &other, &start, &target)?;
        self.follow_resolved(&other, resolved_fragment, path, &resolved, hints, depth)
    }

    /// Convert the target of the `$ref` at `path`, failing when a run of
    /// `$ref`-only fragments leads back into itself
    fn follow_resolved(
        &mut self,
        document: &Value,
        fragment: &Value,
        path: &Reference,
        resolved: &Reference,
        hints: TypeNames,
        depth: usize,
    ) -> Result<TypeRef> {
        let start = if resolved == path {
            Some(self.ref_chain.len())
        } else {
            self.ref_chain.iter().position(|r| r == resolved)
        };
        if let Some(start) = start {
            let cycle: Vec<String> = self.ref_chain[start..]
                .iter()
                .chain([path, resolved])
                .map(ToString::to_string)
                .collect();
            return Err(ConvertError::UnresolvedRef {
                reference: resolved.to_string(),
                reason: format!("$ref cycle {}", cycle.join(" -> ")),
            });
        }

        self.ref_chain.push(path.clone());
        let result = self.to_type(document, fragment, resolved, hints, depth + 1);
        self.ref_chain.pop();
        result
    }

    fn convert_enum(&mut self, cases: &Value, path: &Reference, attributes: &TypeAttributes) -> Result<TypeRef> {
        let cases = cases
            .as_array()
            .ok_or_else(|| ConvertError::expected(path, "enum array", cases))?;

        let mut nullable = false;
        let mut strings: Vec<String> = Vec::with_capacity(cases.len());
        for case in cases {
            match case {
                Value::Null => nullable = true,
                Value::String(s) => {
                    if !strings.contains(s) {
                        strings.push(s.clone());
                    }
                }
                other => {
                    return Err(ConvertError::InvalidEnum {
                        path: path.to_string(),
                        case: other.to_string(),
                    })
                }
            }
        }

        let null = self.builder.primitive(PrimitiveKind::Null);
        if strings.is_empty() && nullable {
            return Ok(null);
        }

        let enumeration = self.builder.enum_type(strings);
        self.builder.add_attributes(enumeration, attributes);
        if !nullable {
            return Ok(enumeration);
        }

        let union = self.builder.forward_union();
        self.builder.set_members(union, BTreeSet::from([enumeration, null]));
        self.builder.add_attributes(union, attributes);
        Ok(union)
    }

    /// Convert every sub-schema of a combinator array, each under its own
    /// tagged path
    fn make_types_from_cases(
        &mut self,
        document: &Value,
        cases: &Value,
        path: &Reference,
        combinator: Combinator,
        hints: &TypeNames,
        depth: usize,
    ) -> Result<BTreeSet<TypeRef>> {
        let cases = cases
            .as_array()
            .ok_or_else(|| ConvertError::expected(path, "array of schemas", cases))?;

        let mut types = BTreeSet::new();
        for (i, case) in cases.iter().enumerate() {
            let case_path = path.push_element(combinator.element(i));
            types.insert(self.to_type(document, case, &case_path, hints.clone(), depth + 1)?);
        }
        Ok(types)
    }

    /// The node for a schema's own `type` field, if it has one
    fn convert_types(
        &mut self,
        document: &Value,
        schema: &Map<String, Value>,
        path: &Reference,
        attributes: &TypeAttributes,
        depth: usize,
    ) -> Result<Option<TypeRef>> {
        let names = match schema.get("type") {
            Some(field) => type_names(field, path)?,
            None if schema.contains_key("properties") || schema.contains_key("additionalProperties") => {
                vec!["object".to_string()]
            }
            None => return Ok(None),
        };

        if let [name] = names.as_slice() {
            let type_path = if name == "object" { path.push_object() } else { path.clone() };
            return self.from_type_name(document, schema, name, &type_path, attributes, depth).map(Some);
        }

        let union = self.builder.forward_union();
        let mut members = BTreeSet::new();
        for (i, name) in names.iter().enumerate() {
            members.insert(self.from_type_name(document, schema, name, &path.push_type(i), attributes, depth)?);
        }
        self.builder.set_members(union, members);
        Ok(Some(union))
    }

    fn from_type_name(
        &mut self,
        document: &Value,
        schema: &Map<String, Value>,
        name: &str,
        path: &Reference,
        attributes: &TypeAttributes,
        depth: usize,
    ) -> Result<TypeRef> {
        let type_name = TypeName::parse(name).ok_or_else(|| ConvertError::UnknownTypeName {
            path: path.to_string(),
            name: name.to_string(),
        })?;

        let t = match type_name {
            TypeName::Object => return self.make_object(document, schema, path, attributes, depth),
            TypeName::Array => return self.make_array(document, schema, path, &attributes.names, depth),
            TypeName::Boolean => self.builder.primitive(PrimitiveKind::Bool),
            TypeName::Null => self.builder.primitive(PrimitiveKind::Null),
            TypeName::Integer => self.builder.primitive(PrimitiveKind::Integer),
            TypeName::Number => self.builder.primitive(PrimitiveKind::Double),
            TypeName::String => {
                let kind = match schema.get("format").and_then(Value::as_str) {
                    Some("date") => PrimitiveKind::Date,
                    Some("time") => PrimitiveKind::Time,
                    Some("date-time") => PrimitiveKind::DateTime,
                    Some(format) => {
                        warn!(path = %path, format, "dropping unrecognized string format");
                        PrimitiveKind::String
                    }
                    None => PrimitiveKind::String,
                };
                self.builder.primitive(kind)
            }
        };
        Ok(t)
    }

    /// Class, map, or the union of both
    fn make_object(
        &mut self,
        document: &Value,
        schema: &Map<String, Value>,
        path: &Reference,
        attributes: &TypeAttributes,
        depth: usize,
    ) -> Result<TypeRef> {
        let union = self.builder.forward_union();
        self.bind(path, union)?;

        let mut members = BTreeSet::new();

        let properties = match schema.get("properties") {
            Some(Value::Object(properties)) => Some(properties),
            Some(other) => return Err(ConvertError::expected(path.push_key("properties"), "object", other)),
            None => None,
        };

        if let Some(properties) = properties {
            let required = required_names(schema, path)?;
            let mut class_properties = Vec::with_capacity(properties.len());
            for (name, property) in properties {
                let property_path = path.push(&["properties", name.as_str()]);
                let hints = TypeNames::inferred(name.as_str()).singularized();
                let t = self.to_type(document, property, &property_path, hints, depth + 1)?;
                class_properties.push(ClassProperty::new(name.as_str(), t, !required.contains(name.as_str())));
            }
            let class = self.builder.class(class_properties);
            self.builder.add_attributes(class, attributes);
            members.insert(class);
        }

        match schema.get("additionalProperties") {
            None => {}
            Some(Value::Bool(false)) => {
                if properties.is_none() {
                    members.insert(self.builder.class(Vec::new()));
                }
            }
            Some(Value::Bool(true)) => {
                if properties.is_some() {
                    warn!(path = %path, "object has both properties and additionalProperties, producing class-or-map union");
                }
                let any = self.builder.primitive(PrimitiveKind::Any);
                members.insert(self.builder.map(any));
            }
            Some(additional @ Value::Object(_)) => {
                let values_path = path.push_key("additionalProperties");
                let hints = attributes.names.singularized();
                let values = self.to_type(document, additional, &values_path, hints, depth + 1)?;
                if properties.is_some() {
                    warn!(path = %path, "object has both properties and additionalProperties, producing class-or-map union");
                }
                members.insert(self.builder.map(values));
            }
            Some(other) => {
                return Err(ConvertError::expected(path.push_key("additionalProperties"), "schema object or boolean", other))
            }
        }

        if members.is_empty() {
            let any = self.builder.primitive(PrimitiveKind::Any);
            members.insert(self.builder.map(any));
        }

        self.builder.set_members(union, members);
        self.builder.add_attributes(union, attributes);
        Ok(union)
    }

    fn make_array(
        &mut self,
        document: &Value,
        schema: &Map<String, Value>,
        path: &Reference,
        hints: &TypeNames,
        depth: usize,
    ) -> Result<TypeRef> {
        let items_path = path.push_key("items");
        let items = match schema.get("items") {
            None => self.builder.primitive(PrimitiveKind::Any),
            Some(items @ (Value::Object(_) | Value::Bool(_))) => {
                self.to_type(document, items, &items_path, hints.singularized(), depth + 1)?
            }
            // Positional items: the element type is any of the positions
            Some(Value::Array(positions)) => {
                let union = self.builder.forward_union();
                let mut members = BTreeSet::new();
                for (i, position) in positions.iter().enumerate() {
                    let position_path = items_path.push_key(&i.to_string());
                    members.insert(self.to_type(document, position, &position_path, hints.singularized(), depth + 1)?);
                }
                if members.is_empty() {
                    members.insert(self.builder.primitive(PrimitiveKind::Any));
                }
                self.builder.set_members(union, members);
                union
            }
            Some(other) => return Err(ConvertError::expected(items_path, "schema object, boolean or array", other)),
        };
        Ok(self.builder.array(items))
    }
}

/// Normalize a `type` field to an ordered, duplicate-free list of names
fn type_names(field: &Value, path: &Reference) -> Result<Vec<String>> {
    match field {
        Value::String(name) => Ok(vec![name.clone()]),
        Value::Array(entries) => {
            if entries.is_empty() {
                return Err(ConvertError::InvalidType {
                    path: path.to_string(),
                    reason: "empty type list".to_string(),
                });
            }
            let mut names: Vec<String> = Vec::with_capacity(entries.len());
            for entry in entries {
                let name = entry.as_str().ok_or_else(|| ConvertError::InvalidType {
                    path: path.to_string(),
                    reason: format!("type list entry is {}, not a string", json_kind(entry)),
                })?;
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
            Ok(names)
        }
        other => Err(ConvertError::InvalidType {
            path: path.to_string(),
            reason: format!("expected string or array, found {}", json_kind(other)),
        }),
    }
}

/// Property names listed in `required`; none when the field is absent
fn required_names(schema: &Map<String, Value>, path: &Reference) -> Result<BTreeSet<String>> {
    let entries = match schema.get("required") {
        None => return Ok(BTreeSet::new()),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(ConvertError::InvalidRequired {
                path: path.to_string(),
                reason: format!("expected array, found {}", json_kind(other)),
            })
        }
    };

    entries
        .iter()
        .map(|entry| {
            entry.as_str().map(str::to_string).ok_or_else(|| ConvertError::InvalidRequired {
                path: path.to_string(),
                reason: format!("entry is {}, not a string", json_kind(entry)),
            })
        })
        .collect()
}

// =============================================================================
// Convenience
// =============================================================================

/// Convert a standalone document into a fresh [`TypeGraph`].
///
/// The document root becomes the top-level type `root_name`; its definitions
/// are added as well when `include_definitions` is set. References to other
/// documents fail with [`ConvertError::DocumentNotFound`]; use [`Converter`]
/// with a store to follow them.
pub fn schema_to_graph(
    document: &Value,
    address: &str,
    options: &ConvertOptions,
    include_definitions: bool,
    root_name: &str,
) -> Result<TypeGraph> {
    let mut store = MemoryStore::new();
    store.insert(address, document.clone())?;

    let entry_points = BTreeMap::from([(root_name.to_string(), Reference::root(address))]);
    let top_levels = top_level_refs(document, address, &entry_points, include_definitions);

    let mut graph = TypeGraph::new();
    Converter::new(&mut graph, &mut store, options.clone()).convert(document, address, &top_levels)?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TypeKind;
    use serde_json::json;

    fn convert_root(schema: Value) -> Result<(TypeGraph, TypeRef)> {
        let graph = schema_to_graph(&schema, "test.json", &ConvertOptions::default(), false, "Root")?;
        let root = graph.top_level("Root").expect("root registered");
        Ok((graph, root))
    }

    #[test]
    fn test_bare_string_is_not_wrapped_in_union() {
        let (graph, root) = convert_root(json!({ "type": "string" })).unwrap();
        let resolved = graph.resolved(root);
        assert_eq!(graph.kind(resolved), &TypeKind::Primitive { primitive: PrimitiveKind::String });
        // The intersection is the only wrapper
        assert_eq!(graph.kind(root).members().map(|m| m.len()), Some(1));
    }

    #[test]
    fn test_string_formats() {
        let (graph, root) = convert_root(json!({
            "type": "object",
            "properties": {
                "day": { "type": "string", "format": "date" },
                "at": { "type": "string", "format": "time" },
                "stamp": { "type": "string", "format": "date-time" },
                "mail": { "type": "string", "format": "email" }
            }
        }))
        .unwrap();

        let kind_of = |name: &str| graph.kind(graph.resolved(graph.property(root, name).unwrap().type_ref)).clone();
        assert_eq!(kind_of("day"), TypeKind::Primitive { primitive: PrimitiveKind::Date });
        assert_eq!(kind_of("at"), TypeKind::Primitive { primitive: PrimitiveKind::Time });
        assert_eq!(kind_of("stamp"), TypeKind::Primitive { primitive: PrimitiveKind::DateTime });
        assert_eq!(kind_of("mail"), TypeKind::Primitive { primitive: PrimitiveKind::String });
    }

    #[test]
    fn test_numbers_and_bools() {
        let (graph, root) = convert_root(json!({ "type": ["integer", "number", "boolean", "null"] })).unwrap();
        let members = graph.kind(graph.resolved(root)).members().unwrap().clone();
        let labels: BTreeSet<&str> = members.iter().map(|&m| graph.kind(m).label()).collect();
        assert_eq!(labels, BTreeSet::from(["integer", "double", "bool", "null"]));
    }

    #[test]
    fn test_duplicate_type_names_collapse() {
        let (graph, root) = convert_root(json!({ "type": ["string", "string"] })).unwrap();
        assert_eq!(
            graph.kind(graph.resolved(root)),
            &TypeKind::Primitive { primitive: PrimitiveKind::String }
        );
    }

    #[test]
    fn test_enum_dedups_cases_in_order() {
        let (graph, root) = convert_root(json!({ "enum": ["b", "a", "b"] })).unwrap();
        assert_eq!(graph.kind(root), &TypeKind::Enum { cases: vec!["b".into(), "a".into()] });
    }

    #[test]
    fn test_enum_of_only_null() {
        let (graph, root) = convert_root(json!({ "enum": [null] })).unwrap();
        assert_eq!(graph.kind(root), &TypeKind::Primitive { primitive: PrimitiveKind::Null });
    }

    #[test]
    fn test_array_items() {
        let (graph, root) = convert_root(json!({ "type": "array", "items": { "type": "integer" } })).unwrap();
        let TypeKind::Array { items } = graph.kind(graph.resolved(root)).clone() else {
            panic!("expected array");
        };
        assert_eq!(graph.kind(graph.resolved(items)), &TypeKind::Primitive { primitive: PrimitiveKind::Integer });

        let (graph, root) = convert_root(json!({ "type": "array" })).unwrap();
        let TypeKind::Array { items } = graph.kind(graph.resolved(root)).clone() else {
            panic!("expected array");
        };
        assert_eq!(graph.kind(items), &TypeKind::Primitive { primitive: PrimitiveKind::Any });
    }

    #[test]
    fn test_positional_items_become_union() {
        let (graph, root) = convert_root(json!({
            "type": "array",
            "items": [{ "type": "string" }, { "type": "integer" }]
        }))
        .unwrap();
        let TypeKind::Array { items } = graph.kind(graph.resolved(root)).clone() else {
            panic!("expected array");
        };
        assert_eq!(graph.kind(items).members().map(|m| m.len()), Some(2));
    }

    #[test]
    fn test_boolean_sub_schemas() {
        let (graph, root) = convert_root(json!({
            "type": "object",
            "properties": { "anything": true, "nothing": false }
        }))
        .unwrap();
        let any = TypeKind::Primitive { primitive: PrimitiveKind::Any };
        assert_eq!(graph.kind(graph.property(root, "anything").unwrap().type_ref), &any);
        assert_eq!(graph.kind(graph.property(root, "nothing").unwrap().type_ref), &any);
    }

    #[test]
    fn test_additional_properties_true_is_map_of_any() {
        let (graph, root) = convert_root(json!({ "additionalProperties": true })).unwrap();
        let TypeKind::Map { values } = graph.kind(graph.resolved(root)).clone() else {
            panic!("expected map");
        };
        assert_eq!(graph.kind(values), &TypeKind::Primitive { primitive: PrimitiveKind::Any });
    }

    #[test]
    fn test_additional_properties_false_without_properties_is_empty_class() {
        let (graph, root) = convert_root(json!({ "type": "object", "additionalProperties": false })).unwrap();
        assert_eq!(graph.kind(graph.resolved(root)), &TypeKind::Class { properties: Vec::new() });
    }

    #[test]
    fn test_additional_properties_false_with_properties_is_just_class() {
        let (graph, root) = convert_root(json!({
            "type": "object",
            "properties": { "a": { "type": "string" } },
            "additionalProperties": false
        }))
        .unwrap();
        assert!(matches!(graph.kind(graph.resolved(root)), TypeKind::Class { properties } if properties.len() == 1));
    }

    #[test]
    fn test_all_of_members_join_intersection() {
        let (graph, root) = convert_root(json!({
            "allOf": [
                { "type": "object", "properties": { "a": { "type": "string" } } },
                { "type": "object", "properties": { "b": { "type": "integer" } } }
            ]
        }))
        .unwrap();
        assert!(matches!(graph.kind(root), TypeKind::Intersection { .. }));
        assert_eq!(graph.kind(root).members().map(|m| m.len()), Some(2));
    }

    #[test]
    fn test_one_of_wrapped_in_single_union() {
        let (graph, root) = convert_root(json!({
            "oneOf": [{ "type": "string" }, { "type": "integer" }],
            "anyOf": [{ "type": "null" }]
        }))
        .unwrap();
        let members = graph.kind(root).members().unwrap();
        assert_eq!(members.len(), 2);
        for &member in members {
            assert!(matches!(graph.kind(member), TypeKind::Union { .. }));
        }
    }

    #[test]
    fn test_empty_schema_is_any() {
        let (graph, root) = convert_root(json!({ "description": "Anything at all" })).unwrap();
        assert_eq!(graph.kind(graph.resolved(root)), &TypeKind::Primitive { primitive: PrimitiveKind::Any });
        assert!(graph.attributes(root).descriptions.contains("Anything at all"));
    }

    #[test]
    fn test_property_hints_are_singular() {
        let (graph, root) = convert_root(json!({
            "type": "object",
            "properties": { "tags": { "type": "object", "properties": {} } }
        }))
        .unwrap();
        let tags = graph.property(root, "tags").unwrap().type_ref;
        assert_eq!(graph.attributes(tags).names, TypeNames::inferred("tag"));
    }

    #[test]
    fn test_title_becomes_given_name() {
        let (graph, root) = convert_root(json!({ "title": "Pet", "type": "object", "properties": {} })).unwrap();
        assert_eq!(graph.attributes(root).names, TypeNames::given("Pet"));
    }

    #[test]
    fn test_ref_name_hint_from_target() {
        let schema = json!({
            "type": "object",
            "properties": { "owner": { "$ref": "#/definitions/Person" } },
            "definitions": { "Person": { "type": "object", "properties": {} } }
        });
        let (graph, root) = convert_root(schema).unwrap();
        let owner = graph.property(root, "owner").unwrap().type_ref;
        // The definition name is given and beats the inferred property hint
        assert_eq!(graph.attributes(owner).names, TypeNames::given("Person"));
    }

    #[test]
    fn test_relative_ref_walks_from_fragment() {
        let schema = json!({
            "type": "object",
            "properties": {
                "pair": {
                    "$ref": "definitions/Inner",
                    "definitions": { "Inner": { "type": "integer" } }
                }
            }
        });
        let (graph, root) = convert_root(schema).unwrap();
        let pair = graph.property(root, "pair").unwrap().type_ref;
        assert_eq!(graph.kind(graph.resolved(pair)), &TypeKind::Primitive { primitive: PrimitiveKind::Integer });
    }

    #[test]
    fn test_memo_returns_same_handle() {
        let schema = json!({
            "definitions": { "Id": { "type": "string" } },
            "type": "object",
            "properties": {
                "a": { "$ref": "#/definitions/Id" },
                "b": { "$ref": "#/definitions/Id" }
            }
        });
        let mut graph = TypeGraph::new();
        let mut store = MemoryStore::new();
        let mut converter = Converter::new(&mut graph, &mut store, ConvertOptions::default());
        let path = Reference::root("m.json");
        let first = converter.to_type(&schema, &schema, &path, TypeNames::default(), 0).unwrap();
        let bound = converter.memo_len();
        let second = converter.to_type(&schema, &schema, &path, TypeNames::default(), 0).unwrap();
        assert_eq!(first, second);
        assert_eq!(converter.memo_len(), bound);
        drop(converter);

        assert_eq!(graph.property(first, "a").unwrap().type_ref, graph.property(first, "b").unwrap().type_ref);
    }

    #[test]
    fn test_conflicting_binding_rejected() {
        let mut graph = TypeGraph::new();
        let mut store = MemoryStore::new();
        let mut converter = Converter::new(&mut graph, &mut store, ConvertOptions::default());
        let path = Reference::root("").push_definition("A");
        let a = converter.builder.primitive(PrimitiveKind::String);
        let b = converter.builder.primitive(PrimitiveKind::Integer);
        converter.bind(&path, a).unwrap();
        converter.bind(&path, a).unwrap();
        let err = converter.bind(&path, b).unwrap_err();
        assert!(matches!(err, ConvertError::ConflictingBinding { ref path } if path == "#/definitions/A"));
    }

    fn nested_objects(levels: usize) -> Value {
        let mut schema = json!({ "type": "string" });
        for _ in 0..levels {
            schema = json!({ "type": "object", "properties": { "a": schema } });
        }
        schema
    }

    #[test]
    fn test_depth_limit() {
        let options = ConvertOptions { max_depth: Some(16) };
        assert!(schema_to_graph(&nested_objects(16), "", &options, false, "Root").is_ok());

        let err = schema_to_graph(&nested_objects(17), "", &options, false, "Root").unwrap_err();
        assert!(matches!(err, ConvertError::DepthExceeded { limit: 16, .. }));
    }

    #[test]
    fn test_self_ref_loop_is_cycle_error() {
        let err = convert_root(json!({
            "definitions": { "Loop": { "$ref": "#/definitions/Loop" } },
            "$ref": "#/definitions/Loop"
        }))
        .unwrap_err();
        match err {
            ConvertError::UnresolvedRef { reference, reason } => {
                assert_eq!(reference, "#/definitions/Loop");
                assert_eq!(reason, "$ref cycle #/definitions/Loop -> #/definitions/Loop");
            }
            other => panic!("expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_ref_chain_cycle_names_every_hop() {
        let err = convert_root(json!({
            "definitions": {
                "A": { "$ref": "#/definitions/B" },
                "B": { "$ref": "#/definitions/A" }
            },
            "$ref": "#/definitions/A"
        }))
        .unwrap_err();
        match err {
            ConvertError::UnresolvedRef { reason, .. } => {
                assert_eq!(reason, "$ref cycle #/definitions/A -> #/definitions/B -> #/definitions/A");
            }
            other => panic!("expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_ref_chain_resets_below_structural_node() {
        // The inner ref points back at a ref-only ancestor, but an object
        // was bound in between, so this is ordinary recursion
        let (graph, root) = convert_root(json!({
            "definitions": {
                "Alias": { "$ref": "#/definitions/Node" },
                "Node": {
                    "type": "object",
                    "properties": { "next": { "$ref": "#/definitions/Alias" } }
                }
            },
            "$ref": "#/definitions/Alias"
        }))
        .unwrap();
        let next = graph.property(root, "next").unwrap().type_ref;
        assert_eq!(graph.resolved(next), graph.resolved(root));
    }

    #[test]
    fn test_non_array_enum_is_shape_error() {
        let err = convert_root(json!({ "enum": "a" })).unwrap_err();
        assert!(matches!(err, ConvertError::ExpectedShape { .. }));
        assert!(err.to_string().contains("enum array"));
    }

    #[test]
    fn test_shape_errors_name_location() {
        let err = convert_root(json!({ "type": "object", "properties": { "a": { "type": 7 } } })).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidType { .. }));
        assert!(err.to_string().contains("#/object/properties/a"));

        let err = convert_root(json!({ "type": "float" })).unwrap_err();
        assert!(matches!(err, ConvertError::UnknownTypeName { ref name, .. } if name == "float"));

        let err = convert_root(json!({ "type": "object", "properties": {}, "required": "a" })).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidRequired { .. }));

        let err = convert_root(json!({ "type": "object", "properties": {}, "required": [1] })).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidRequired { .. }));

        let err = convert_root(json!({ "$ref": 12 })).unwrap_err();
        assert!(matches!(err, ConvertError::RefNotString { .. }));

        let err = convert_root(json!({ "allOf": {} })).unwrap_err();
        assert!(matches!(err, ConvertError::ExpectedShape { .. }));

        let err = convert_root(json!({ "type": "object", "properties": { "a": 3 } })).unwrap_err();
        assert!(matches!(err, ConvertError::ExpectedShape { .. }));
    }

    #[test]
    fn test_cross_document_ref() {
        let root = json!({
            "type": "object",
            "properties": { "id": { "$ref": "common.json#/definitions/Id" } }
        });
        let mut store = MemoryStore::new();
        store
            .insert("common.json", json!({ "definitions": { "Id": { "type": "integer" } } }))
            .unwrap();

        let mut graph = TypeGraph::new();
        let top_levels = BTreeMap::from([("Root".to_string(), Reference::root("root.json"))]);
        Converter::new(&mut graph, &mut store, ConvertOptions::default())
            .convert(&root, "root.json", &top_levels)
            .unwrap();

        let root_type = graph.top_level("Root").unwrap();
        let id = graph.property(root_type, "id").unwrap().type_ref;
        assert_eq!(graph.kind(graph.resolved(id)), &TypeKind::Primitive { primitive: PrimitiveKind::Integer });
        assert_eq!(graph.attributes(id).names, TypeNames::given("Id"));
    }

    #[test]
    fn test_missing_document() {
        let err = convert_root(json!({ "$ref": "elsewhere.json#/definitions/X" })).unwrap_err();
        assert!(matches!(err, ConvertError::DocumentNotFound { ref address } if address == "elsewhere.json"));
    }
}
