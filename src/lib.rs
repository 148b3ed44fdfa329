//! Schema Typegraph
//!
//! Front end for schema-driven code generators: converts a JSON Schema
//! document into a canonical, deduplicated type graph that renderers walk to
//! emit code in their target language.
//!
//! ## Features
//!
//! - **References**: `#/definitions/...`, relative pointers and other documents
//! - **Cycles**: self and mutually recursive schemas terminate
//! - **Dedup**: every schema path maps to exactly one node
//! - **Name Hints**: titles, definition names and property names travel with nodes
//!
//! ## Architecture
//!
//! ```text
//! JSON Schema ──► Reference ──► lookup_ref ──► Converter ──► TypeBuilder
//!                                   ▲              │            (TypeGraph)
//!                                   └── DocumentStore
//! ```
//!
//! ## Example
//!
//! ```
//! use schema_typegraph::{schema_to_graph, ConvertOptions, TypeKind};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": { "name": { "type": "string" } },
//!     "required": ["name"]
//! });
//! let graph = schema_to_graph(&schema, "pet.json", &ConvertOptions::default(), true, "Pet").unwrap();
//! let pet = graph.top_level("Pet").unwrap();
//! assert!(matches!(graph.kind(graph.resolved(pet)), TypeKind::Class { .. }));
//! ```

pub mod attributes;
pub mod config;
pub mod convert;
pub mod error;
pub mod graph;
pub mod names;
pub mod reference;
pub mod resolver;
pub mod store;

pub use attributes::{make_attributes, TypeAttributes, TypeNames};
pub use config::{OutputFormat, TypegraphConfig};
pub use convert::{definition_refs, schema_to_graph, top_level_refs, ConvertOptions, Converter};
pub use error::{ConvertError, Result};
pub use graph::{ClassProperty, PrimitiveKind, TypeBuilder, TypeGraph, TypeKind, TypeRef};
pub use reference::{PathElement, Reference};
pub use resolver::lookup_ref;
pub use store::{DocumentStore, FileStore, MemoryStore};
