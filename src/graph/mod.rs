//! Type Graph
//!
//! Arena of type nodes built on petgraph. Every node is addressed by an opaque
//! [`TypeRef`]; child links live inside the node kind and are mirrored as
//! graph edges so cycles can be found with SCCs.
//!
//! Primitives, enums, arrays, maps and classes are structurally deduplicated.
//! Unions and intersections are created empty and populated later, which is
//! what lets the converter wire up self-referential schemas.

pub mod builder;

pub use builder::TypeBuilder;

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::attributes::TypeAttributes;

// =============================================================================
// Handles and Kinds
// =============================================================================

/// Opaque handle to a node in a [`TypeGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef(NodeIndex);

impl TypeRef {
    pub fn index(&self) -> usize {
        self.0.index()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0.index())
    }
}

impl Serialize for TypeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0.index() as u64)
    }
}

/// Scalar node kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrimitiveKind {
    Any,
    Null,
    Bool,
    Integer,
    Double,
    String,
    Date,
    Time,
    DateTime,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::String => "string",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "date-time",
        }
    }
}

/// A named property of a class
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClassProperty {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    pub optional: bool,
}

impl ClassProperty {
    pub fn new(name: impl Into<String>, type_ref: TypeRef, optional: bool) -> Self {
        Self {
            name: name.into(),
            type_ref,
            optional,
        }
    }
}

/// Structure of a node. `None` members mark a forward-declared set node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeKind {
    Primitive { primitive: PrimitiveKind },
    Enum { cases: Vec<String> },
    Array { items: TypeRef },
    Map { values: TypeRef },
    Class { properties: Vec<ClassProperty> },
    Union { members: Option<BTreeSet<TypeRef>> },
    Intersection { members: Option<BTreeSet<TypeRef>> },
}

impl TypeKind {
    /// Short label used in summaries
    pub fn label(&self) -> &'static str {
        match self {
            TypeKind::Primitive { primitive } => primitive.as_str(),
            TypeKind::Enum { .. } => "enum",
            TypeKind::Array { .. } => "array",
            TypeKind::Map { .. } => "map",
            TypeKind::Class { .. } => "class",
            TypeKind::Union { .. } => "union",
            TypeKind::Intersection { .. } => "intersection",
        }
    }

    /// Members of a union or intersection, empty while unpopulated
    pub fn members(&self) -> Option<&BTreeSet<TypeRef>> {
        match self {
            TypeKind::Union { members } | TypeKind::Intersection { members } => members.as_ref(),
            _ => None,
        }
    }

    fn is_set_operation(&self) -> bool {
        matches!(self, TypeKind::Union { .. } | TypeKind::Intersection { .. })
    }
}

/// Types of edges in the type graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum EdgeKind {
    /// Array element type
    Items,
    /// Map value type
    Values,
    /// Class property type
    Property(String),
    /// Union or intersection member
    Member,
}

/// Node weight: structure plus attributes
#[derive(Debug, Clone)]
pub struct TypeNode {
    pub kind: TypeKind,
    pub attributes: TypeAttributes,
}

// =============================================================================
// Type Graph
// =============================================================================

/// The type graph produced by conversion
#[derive(Debug, Default)]
pub struct TypeGraph {
    /// Primary graph structure, cycles allowed
    pub(crate) graph: DiGraph<TypeNode, EdgeKind>,

    /// Structural dedup index for immutable kinds
    pub(crate) interned: HashMap<TypeKind, TypeRef>,

    /// Externally addressable entry points
    pub(crate) top_levels: BTreeMap<String, TypeRef>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Public API ==========

    /// Get node count
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get edge count
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Structure of a node
    pub fn kind(&self, t: TypeRef) -> &TypeKind {
        &self.graph[t.0].kind
    }

    /// Attributes of a node
    pub fn attributes(&self, t: TypeRef) -> &TypeAttributes {
        &self.graph[t.0].attributes
    }

    /// All top-level types by name
    pub fn top_levels(&self) -> &BTreeMap<String, TypeRef> {
        &self.top_levels
    }

    /// Get a top-level type by name
    pub fn top_level(&self, name: &str) -> Option<TypeRef> {
        self.top_levels.get(name).copied()
    }

    /// All node handles, in allocation order
    pub fn all_types(&self) -> impl Iterator<Item = TypeRef> + '_ {
        self.graph.node_indices().map(TypeRef)
    }

    /// Follow unions and intersections that have exactly one member.
    ///
    /// This is a read-only view; the graph itself keeps the wrappers.
    pub fn resolved(&self, t: TypeRef) -> TypeRef {
        let mut current = t;
        let mut visited = HashSet::new();
        while visited.insert(current) {
            match self.kind(current).members() {
                Some(members) if members.len() == 1 => {
                    if let Some(&only) = members.iter().next() {
                        current = only;
                    }
                }
                _ => break,
            }
        }
        current
    }

    /// Class property lookup on the resolved form of `t`
    pub fn property(&self, t: TypeRef, name: &str) -> Option<&ClassProperty> {
        match self.kind(self.resolved(t)) {
            TypeKind::Class { properties } => properties.iter().find(|p| p.name == name),
            _ => None,
        }
    }

    /// Node count per kind label
    pub fn kind_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for node in self.graph.node_weights() {
            *counts.entry(node.kind.label()).or_insert(0) += 1;
        }
        counts
    }

    /// Groups of mutually referencing nodes, including self loops
    pub fn cycles(&self) -> Vec<Vec<TypeRef>> {
        let mut groups: Vec<Vec<TypeRef>> = kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut group: Vec<TypeRef> = scc.into_iter().map(TypeRef).collect();
                group.sort();
                group
            })
            .collect();
        groups.sort();
        groups
    }

    // ========== Allocation ==========

    fn add_node(&mut self, kind: TypeKind) -> TypeRef {
        let idx = self.graph.add_node(TypeNode {
            kind: kind.clone(),
            attributes: TypeAttributes::default(),
        });
        let t = TypeRef(idx);

        match &kind {
            TypeKind::Array { items } => {
                self.graph.add_edge(idx, items.0, EdgeKind::Items);
            }
            TypeKind::Map { values } => {
                self.graph.add_edge(idx, values.0, EdgeKind::Values);
            }
            TypeKind::Class { properties } => {
                for property in properties {
                    self.graph.add_edge(idx, property.type_ref.0, EdgeKind::Property(property.name.clone()));
                }
            }
            _ => {}
        }

        t
    }

    /// Reuse a structurally identical node or allocate a new one
    pub(crate) fn intern(&mut self, kind: TypeKind) -> TypeRef {
        if let Some(&t) = self.interned.get(&kind) {
            return t;
        }
        let t = self.add_node(kind.clone());
        self.interned.insert(kind, t);
        t
    }

    /// Allocate an unpopulated union or intersection
    pub(crate) fn forward(&mut self, kind: TypeKind) -> TypeRef {
        debug_assert!(kind.is_set_operation());
        self.add_node(kind)
    }

    /// Replace the member set of a union or intersection.
    ///
    /// # Panics
    ///
    /// Panics if `t` is not a union or intersection.
    pub(crate) fn replace_members(&mut self, t: TypeRef, new_members: BTreeSet<TypeRef>) {
        // remove_edge swaps indices, so drain one at a time
        while let Some(edge) = self.graph.first_edge(t.0, Direction::Outgoing) {
            self.graph.remove_edge(edge);
        }
        for member in &new_members {
            self.graph.add_edge(t.0, member.0, EdgeKind::Member);
        }

        match &mut self.graph[t.0].kind {
            TypeKind::Union { members } | TypeKind::Intersection { members } => {
                *members = Some(new_members);
            }
            other => panic!("{} is a {}, not a union or intersection", t, other.label()),
        }
    }

    pub(crate) fn merge_attributes(&mut self, t: TypeRef, attributes: &TypeAttributes) {
        self.graph[t.0].attributes.merge(attributes);
    }

    // ========== Export ==========

    /// Serializable view of the whole graph
    pub fn snapshot(&self) -> GraphSnapshot<'_> {
        GraphSnapshot {
            top_levels: &self.top_levels,
            nodes: self
                .graph
                .node_indices()
                .map(|idx| NodeSnapshot {
                    id: TypeRef(idx),
                    kind: &self.graph[idx].kind,
                    attributes: &self.graph[idx].attributes,
                })
                .collect(),
        }
    }

    /// Export the type graph to GraphViz DOT format
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph TypeGraph {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10];\n");
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=8, fontcolor=\"#808080\"];\n");
        output.push('\n');

        let color_map = [
            ("class", "#00BCD4"),
            ("map", "#4CAF50"),
            ("array", "#2196F3"),
            ("enum", "#FF5722"),
            ("union", "#FF9800"),
            ("intersection", "#9C27B0"),
        ];

        for t in self.all_types() {
            let node = &self.graph[t.0];
            let label = node.kind.label();
            let color = color_map
                .iter()
                .find(|(kind, _)| *kind == label)
                .map(|(_, color)| *color)
                .unwrap_or("#9E9E9E");
            let names: Vec<&str> = node.attributes.names.names().collect();
            let text = if names.is_empty() {
                label.to_string()
            } else {
                format!("{}\\n{}", names.join("|"), label)
            };
            output.push_str(&format!("  \"{}\" [label=\"{}\", fillcolor=\"{}\"];\n", t, text.replace('"', "'"), color));
        }

        output.push('\n');

        for (name, t) in &self.top_levels {
            output.push_str(&format!("  \"top:{}\" [label=\"{}\", shape=plaintext];\n", name, name));
            output.push_str(&format!("  \"top:{}\" -> \"{}\";\n", name, t));
        }

        for edge in self.graph.edge_references() {
            let label = match edge.weight() {
                EdgeKind::Items => "items".to_string(),
                EdgeKind::Values => "values".to_string(),
                EdgeKind::Property(name) => name.clone(),
                EdgeKind::Member => String::new(),
            };
            output.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\"];\n",
                TypeRef(edge.source()),
                TypeRef(edge.target()),
                label
            ));
        }

        output.push_str("}\n");
        output
    }
}

/// Serializable graph view for JSON output
#[derive(Debug, Serialize)]
pub struct GraphSnapshot<'a> {
    pub top_levels: &'a BTreeMap<String, TypeRef>,
    pub nodes: Vec<NodeSnapshot<'a>>,
}

/// One node in a [`GraphSnapshot`]
#[derive(Debug, Serialize)]
pub struct NodeSnapshot<'a> {
    pub id: TypeRef,
    #[serde(flatten)]
    pub kind: &'a TypeKind,
    #[serde(skip_serializing_if = "TypeAttributes::is_empty")]
    pub attributes: &'a TypeAttributes,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::TypeNames;

    #[test]
    fn test_primitives_are_interned() {
        let mut graph = TypeGraph::new();
        let a = graph.primitive(PrimitiveKind::String);
        let b = graph.primitive(PrimitiveKind::String);
        let c = graph.primitive(PrimitiveKind::Integer);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_classes_are_interned() {
        let mut graph = TypeGraph::new();
        let s = graph.primitive(PrimitiveKind::String);
        let a = graph.class(vec![ClassProperty::new("name", s, false)]);
        let b = graph.class(vec![ClassProperty::new("name", s, false)]);
        let c = graph.class(vec![ClassProperty::new("name", s, true)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_unions_are_never_interned() {
        let mut graph = TypeGraph::new();
        let a = graph.forward_union();
        let b = graph.forward_union();
        assert_ne!(a, b);
        assert_eq!(graph.kind(a).members(), None);
    }

    #[test]
    fn test_set_members_adds_edges() {
        let mut graph = TypeGraph::new();
        let s = graph.primitive(PrimitiveKind::String);
        let n = graph.primitive(PrimitiveKind::Null);
        let u = graph.forward_union();
        graph.set_members(u, BTreeSet::from([s, n]));
        assert_eq!(graph.kind(u).members().map(|m| m.len()), Some(2));
        assert_eq!(graph.edge_count(), 2);

        graph.set_members(u, BTreeSet::from([s]));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    #[should_panic]
    fn test_set_members_on_class_panics() {
        let mut graph = TypeGraph::new();
        let c = graph.class(Vec::new());
        graph.set_members(c, BTreeSet::new());
    }

    #[test]
    fn test_resolved_follows_single_members() {
        let mut graph = TypeGraph::new();
        let s = graph.primitive(PrimitiveKind::String);
        let u = graph.forward_union();
        let i = graph.forward_intersection();
        graph.set_members(u, BTreeSet::from([s]));
        graph.set_members(i, BTreeSet::from([u]));
        assert_eq!(graph.resolved(i), s);
    }

    #[test]
    fn test_resolved_stops_on_self_member() {
        let mut graph = TypeGraph::new();
        let i = graph.forward_intersection();
        graph.set_members(i, BTreeSet::from([i]));
        assert_eq!(graph.resolved(i), i);
        assert_eq!(graph.cycles(), vec![vec![i]]);
    }

    #[test]
    fn test_cycles_through_class() {
        let mut graph = TypeGraph::new();
        let u = graph.forward_union();
        let c = graph.class(vec![ClassProperty::new("next", u, true)]);
        graph.set_members(u, BTreeSet::from([c]));
        let cycles = graph.cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 2);
    }

    #[test]
    fn test_top_levels_and_attributes() {
        let mut graph = TypeGraph::new();
        let s = graph.primitive(PrimitiveKind::String);
        graph.add_attributes(s, &TypeAttributes { names: TypeNames::given("Name"), ..Default::default() });
        graph.add_top_level("Name", s);
        assert_eq!(graph.top_level("Name"), Some(s));
        assert_eq!(graph.attributes(s).names, TypeNames::given("Name"));
    }

    #[test]
    fn test_dot_and_snapshot() {
        let mut graph = TypeGraph::new();
        let s = graph.primitive(PrimitiveKind::String);
        let a = graph.array(s);
        graph.add_top_level("Tags", a);

        let dot = graph.to_dot();
        assert!(dot.starts_with("digraph TypeGraph {"));
        assert!(dot.contains("[label=\"items\"]"));

        let json = serde_json::to_value(graph.snapshot()).unwrap();
        assert_eq!(json["top_levels"]["Tags"], 1);
        assert_eq!(json["nodes"][1]["kind"], "array");
        assert_eq!(json["nodes"][0]["primitive"], "string");
    }
}
