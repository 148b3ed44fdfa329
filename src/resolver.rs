//! Reference Resolution
//!
//! Walks a [`Reference`] against schema text to find the fragment it points
//! at, accumulating the concrete path taken so callers can memoize on it.

use serde_json::Value;

use crate::error::{json_kind, ConvertError, Result};
use crate::reference::{PathElement, Reference};

/// Resolve `target` to a schema fragment.
///
/// The walk starts at `local` (whose path is `local_path`) and restarts at
/// `root` whenever a [`PathElement::Root`] is met, so `#/...` jumps to the
/// document root while a relative pointer continues from the current
/// fragment. Returns the fragment together with the resolved reference.
pub fn lookup_ref<'a>(
    root: &'a Value,
    local: &'a Value,
    local_path: &Reference,
    target: &Reference,
) -> Result<(&'a Value, Reference)> {
    let mut fragment = local;
    let mut resolved = local_path.clone();

    for element in target.elements() {
        match element {
            PathElement::Root => {
                fragment = root;
                resolved = Reference::root(target.address());
            }
            PathElement::Definition(name) => {
                let definition = fragment
                    .get("definitions")
                    .and_then(Value::as_object)
                    .and_then(|definitions| definitions.get(name))
                    .filter(|schema| schema.is_object());
                fragment = definition.ok_or_else(|| ConvertError::MissingDefinition {
                    path: resolved.to_string(),
                    name: name.clone(),
                })?;
                resolved = resolved.push_definition(name);
            }
            PathElement::KeyOrIndex(key) => {
                fragment = step(fragment, key, &resolved, target)?;
                resolved = resolved.push_key(key);
            }
            PathElement::AllOf(index) | PathElement::OneOf(index) | PathElement::AnyOf(index) => {
                let keyword = match element {
                    PathElement::AllOf(_) => "allOf",
                    PathElement::OneOf(_) => "oneOf",
                    _ => "anyOf",
                };
                let cases = step(fragment, keyword, &resolved, target)?;
                fragment = step(cases, &index.to_string(), &resolved, target)?;
                resolved = resolved.push_element(element.clone());
            }
            PathElement::Type(_) | PathElement::Object => {
                debug_assert!(!element.is_addressable());
                return Err(ConvertError::Unaddressable {
                    reference: target.to_string(),
                    element: element.to_string(),
                });
            }
        }
    }

    Ok((fragment, resolved))
}

/// One key or index step into a fragment
fn step<'a>(
    fragment: &'a Value,
    key: &str,
    at: &Reference,
    target: &Reference,
) -> Result<&'a Value> {
    match fragment {
        Value::Array(items) => {
            let index: usize = key.parse().map_err(|_| ConvertError::InvalidIndex {
                path: at.to_string(),
                key: key.to_string(),
            })?;
            items.get(index).ok_or_else(|| ConvertError::UnresolvedRef {
                reference: target.to_string(),
                reason: format!("index {} out of bounds at {}", index, at),
            })
        }
        Value::Object(map) => map.get(key).ok_or_else(|| ConvertError::UnresolvedRef {
            reference: target.to_string(),
            reason: format!("key '{}' not found at {}", key, at),
        }),
        other => Err(ConvertError::UnresolvedRef {
            reference: target.to_string(),
            reason: format!("cannot index into {} at {}", json_kind(other), at),
        }),
    }
}
