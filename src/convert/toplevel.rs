//! Top-level discovery
//!
//! Named definitions become candidate top-level types even when nothing
//! references them.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::reference::Reference;

/// One `Definition(name)` reference per entry of the document's
/// `definitions` object. Anything else yields an empty map.
pub fn definition_refs(document: &Value, address: &str) -> BTreeMap<String, Reference> {
    let root = Reference::root(address);
    document
        .get("definitions")
        .and_then(Value::as_object)
        .map(|definitions| {
            definitions
                .keys()
                .map(|name| (name.clone(), root.push_definition(name)))
                .collect()
        })
        .unwrap_or_default()
}

/// Combine caller entry points with the document's definitions.
///
/// An entry point wins over a definition of the same name.
pub fn top_level_refs(
    document: &Value,
    address: &str,
    entry_points: &BTreeMap<String, Reference>,
    include_definitions: bool,
) -> BTreeMap<String, Reference> {
    let mut top_levels = if include_definitions {
        definition_refs(document, address)
    } else {
        BTreeMap::new()
    };
    top_levels.extend(entry_points.iter().map(|(name, r)| (name.clone(), r.clone())));
    top_levels
}
