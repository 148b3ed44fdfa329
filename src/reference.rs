//! Schema References
//!
//! Immutable, append-only addresses into a schema document. A `Reference` is
//! both the way `$ref` strings are parsed and the key under which converted
//! types are memoized, so equality is structural: same address, same elements.

use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Path Element
// =============================================================================

/// One step in a [`Reference`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathElement {
    /// The document root (`#`)
    Root,
    /// A named entry under `definitions`
    Definition(String),
    /// An object key, or an array index rendered in decimal
    KeyOrIndex(String),
    /// Branch `index` of a multi-valued `type` field. Keys nodes only.
    Type(usize),
    /// The object interpretation of a schema. Keys nodes only.
    Object,
    /// Branch of an `allOf`
    AllOf(usize),
    /// Branch of a `oneOf`
    OneOf(usize),
    /// Branch of an `anyOf`
    AnyOf(usize),
}

impl PathElement {
    /// Whether this element can be walked against schema text
    pub fn is_addressable(&self) -> bool {
        !matches!(self, PathElement::Type(_) | PathElement::Object)
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Root => write!(f, "#"),
            PathElement::Definition(name) => write!(f, "definitions/{}", escape(name)),
            PathElement::KeyOrIndex(key) => write!(f, "{}", escape(key)),
            PathElement::Type(index) => write!(f, "type/{}", index),
            PathElement::Object => write!(f, "object"),
            PathElement::AllOf(index) => write!(f, "allOf/{}", index),
            PathElement::OneOf(index) => write!(f, "oneOf/{}", index),
            PathElement::AnyOf(index) => write!(f, "anyOf/{}", index),
        }
    }
}

/// JSON Pointer escaping (RFC 6901)
fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

fn is_index(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

// =============================================================================
// Reference
// =============================================================================

/// An address into a schema document, possibly in another document.
///
/// References built with [`Reference::root`] and the `push_*` methods always
/// start with [`PathElement::Root`]. [`Reference::parse`] can also produce a
/// relative reference (no leading root) for a `$ref` that points from the
/// fragment containing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference {
    address: Arc<str>,
    path: Arc<[PathElement]>,
}

impl Reference {
    /// The root of the document at `address`
    pub fn root(address: impl Into<String>) -> Self {
        let address: String = address.into();
        Self {
            address: Arc::from(address),
            path: Arc::from(vec![PathElement::Root]),
        }
    }

    /// Parse a `$ref` string found in the document at `base_address`.
    ///
    /// `other.json#/definitions/A` targets another document, `#/...` the
    /// current one, and a string without `#` is a relative pointer. The pair
    /// `definitions/<name>` collapses into one [`PathElement::Definition`].
    pub fn parse(base_address: &str, reference: &str) -> Self {
        let (address, elements) = match reference.split_once('#') {
            Some((address, fragment)) => {
                let address = if address.is_empty() {
                    base_address.to_string()
                } else {
                    join_address(base_address, address)
                };
                let mut elements = vec![PathElement::Root];
                let pointer = fragment.strip_prefix('/').unwrap_or(fragment);
                if !pointer.is_empty() {
                    parse_segments(pointer, &mut elements);
                }
                (address, elements)
            }
            None => {
                let mut elements = Vec::new();
                parse_segments(reference, &mut elements);
                (base_address.to_string(), elements)
            }
        };

        Self {
            address: Arc::from(address),
            path: Arc::from(elements),
        }
    }

    /// Parse a `$ref` value, which must be a string.
    pub fn parse_value(
        base_address: &str,
        value: &serde_json::Value,
        at: &Reference,
    ) -> crate::Result<Self> {
        let reference = value
            .as_str()
            .ok_or_else(|| crate::ConvertError::RefNotString { path: at.to_string() })?;
        Ok(Self::parse(base_address, reference))
    }

    fn with(&self, element: PathElement) -> Self {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend_from_slice(&self.path);
        path.push(element);
        Self {
            address: Arc::clone(&self.address),
            path: Arc::from(path),
        }
    }

    /// Append one `KeyOrIndex` element per key
    pub fn push(&self, keys: &[&str]) -> Self {
        let mut path = Vec::with_capacity(self.path.len() + keys.len());
        path.extend_from_slice(&self.path);
        path.extend(keys.iter().map(|k| PathElement::KeyOrIndex((*k).to_string())));
        Self {
            address: Arc::clone(&self.address),
            path: Arc::from(path),
        }
    }

    pub fn push_key(&self, key: &str) -> Self {
        self.with(PathElement::KeyOrIndex(key.to_string()))
    }

    pub fn push_definition(&self, name: &str) -> Self {
        self.with(PathElement::Definition(name.to_string()))
    }

    pub fn push_object(&self) -> Self {
        self.with(PathElement::Object)
    }

    pub fn push_type(&self, index: usize) -> Self {
        self.with(PathElement::Type(index))
    }

    /// Append an arbitrary element
    pub fn push_element(&self, element: PathElement) -> Self {
        self.with(element)
    }

    /// Address of the document this reference points into
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.path
    }

    /// A relative reference walks from the fragment it was found in
    pub fn is_relative(&self) -> bool {
        self.path.first() != Some(&PathElement::Root)
    }

    /// Human-readable name hint, scanning from the last element backward.
    ///
    /// Non-numeric keys and combinator branches are skipped in favour of their
    /// parent. A relative reference that runs out of elements has no name.
    ///
    /// # Panics
    ///
    /// Panics on a `Type` or `Object` element. Those only key converted nodes
    /// and never appear in a reference a name is asked of.
    pub fn name(&self) -> Option<&str> {
        for element in self.path.iter().rev() {
            match element {
                PathElement::Root => return Some("Root"),
                PathElement::Definition(name) => return Some(name.as_str()),
                PathElement::KeyOrIndex(key) if is_index(key) => return Some(key.as_str()),
                PathElement::KeyOrIndex(_)
                | PathElement::AllOf(_)
                | PathElement::OneOf(_)
                | PathElement::AnyOf(_) => continue,
                PathElement::Type(_) | PathElement::Object => {
                    panic!("name requested through non-addressable element in {}", self)
                }
            }
        }
        None
    }

    /// The definition name, if the reference ends in one
    pub fn definition_name(&self) -> Option<&str> {
        match self.path.last() {
            Some(PathElement::Definition(name)) => Some(name.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.path.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn parse_segments(pointer: &str, elements: &mut Vec<PathElement>) {
    let segments: Vec<&str> = pointer.split('/').collect();
    let mut i = 0;
    while i < segments.len() {
        let segment = segments[i];
        if segment == "#" {
            elements.push(PathElement::Root);
        } else if segment == "definitions" && i + 1 < segments.len() {
            elements.push(PathElement::Definition(unescape(segments[i + 1])));
            i += 1;
        } else {
            elements.push(PathElement::KeyOrIndex(unescape(segment)));
        }
        i += 1;
    }
}

/// Resolve a document address relative to the address of the referring
/// document. Absolute paths and URLs are returned unchanged.
pub fn join_address(base: &str, relative: &str) -> String {
    if relative.starts_with('/') || relative.contains("://") {
        return relative.to_string();
    }

    let mut components: Vec<&str> = base.split('/').collect();
    // Drop the referring file name
    components.pop();

    for component in relative.split('/') {
        match component {
            ".." => {
                components.pop();
            }
            "." | "" => {}
            other => components.push(other),
        }
    }

    components.retain(|c| !c.is_empty());
    components.join("/")
}
