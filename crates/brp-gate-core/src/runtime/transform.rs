// crates/brp-gate-core/src/runtime/transform.rs
// ============================================================================
// Module: BRP Gate Response Transforms
// Description: Pure stages that rebuild upstream documents for the caller.
// Purpose: Rewrite links, complete schemas, hide records, and mask identifiers.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Each stage takes a JSON document by value and returns the rebuilt
//! document. Stages never fail on missing containers: an absent record list
//! or a non-object record is passed through unchanged. Order matters and is
//! owned by [`crate::runtime::ProxyPipeline`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

use crate::core::audit::ABSENT_IDENTIFIER;
use crate::core::audit::RetrievedIdentifiers;
use crate::core::fields::DottedTree;
use crate::core::fields::group_dotted_names;
use crate::core::shape::ShapeNode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Key of HAL link sections.
const LINKS_KEY: &str = "_links";

/// Key of link targets inside a link section.
const HREF_KEY: &str = "href";

/// Requested-field segment selecting every child.
const WILDCARD_SEGMENT: &str = "*";

// ============================================================================
// SECTION: Link Rewriting
// ============================================================================

/// Replaces the `from` prefix of every `href` inside `_links` sections.
///
/// An empty `from` disables rewriting.
#[must_use]
pub fn rewrite_links(document: Value, from: &str, to: &str) -> Value {
    if from.is_empty() {
        return document;
    }
    rewrite_links_inner(document, from, to, false)
}

/// Recursive worker for [`rewrite_links`].
fn rewrite_links_inner(value: Value, from: &str, to: &str, in_links: bool) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items.into_iter().map(|item| rewrite_links_inner(item, from, to, in_links)).collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, child)| {
                    let child = match child {
                        Value::String(href) if in_links && key == HREF_KEY => {
                            Value::String(href.strip_prefix(from).map_or_else(
                                || href.clone(),
                                |rest| format!("{to}{rest}"),
                            ))
                        }
                        other => rewrite_links_inner(other, from, to, in_links || key == LINKS_KEY),
                    };
                    (key, child)
                })
                .collect(),
        ),
        other => other,
    }
}

// ============================================================================
// SECTION: Schema Completion
// ============================================================================

/// Adds absent requested fields to every record with their empty default.
///
/// Only fields present in `requested` and known to `shape` are added; present
/// values are never changed. A requested object or list of objects is
/// completed with every known child below it.
#[must_use]
pub fn complete_schema(
    document: Value,
    records_key: &str,
    requested: &DottedTree,
    shape: &ShapeNode,
) -> Value {
    map_records(document, records_key, |record| complete_record(record, requested, shape))
}

/// Completes one record or nested object.
#[must_use]
pub fn complete_record(record: Value, requested: &DottedTree, node: &ShapeNode) -> Value {
    let Value::Object(mut map) = record else {
        return record;
    };
    let Some(children) = node.children() else {
        return Value::Object(map);
    };
    for (name, subtree) in expand_requested(requested, node) {
        let Some(child) = children.get(&name) else {
            continue;
        };
        let completed = match map.remove(&name) {
            None if !subtree.is_leaf() && matches!(child, ShapeNode::Object(_)) => {
                complete_record(Value::Object(Map::new()), &subtree, child)
            }
            None => child.empty_value(),
            Some(existing) if subtree.is_leaf() => {
                complete_value(existing, &group_dotted_names([WILDCARD_SEGMENT]), child)
            }
            Some(existing) => complete_value(existing, &subtree, child),
        };
        map.insert(name, completed);
    }
    Value::Object(map)
}

/// Descends into objects and lists of objects below a present field.
fn complete_value(value: Value, requested: &DottedTree, node: &ShapeNode) -> Value {
    match value {
        Value::Object(_) => complete_record(value, requested, node),
        Value::Array(items) => Value::Array(
            items.into_iter().map(|item| complete_value(item, requested, node)).collect(),
        ),
        other => other,
    }
}

/// Lists requested children, expanding a `*` segment to every known child.
fn expand_requested(requested: &DottedTree, node: &ShapeNode) -> Vec<(String, DottedTree)> {
    let mut out: Vec<(String, DottedTree)> = Vec::new();
    for (segment, subtree) in requested.iter() {
        if segment == WILDCARD_SEGMENT {
            if let Some(children) = node.children() {
                for name in children.keys() {
                    if requested.get(name).is_none() {
                        out.push((name.clone(), DottedTree::default()));
                    }
                }
            }
        } else {
            out.push((segment.to_string(), subtree.clone()));
        }
    }
    out
}

// ============================================================================
// SECTION: Confidentiality
// ============================================================================

/// Drops records whose marker field is truthy; returns the removed count.
#[must_use]
pub fn filter_confidential(document: Value, records_key: &str, marker_field: &str) -> (Value, usize) {
    let Value::Object(mut root) = document else {
        return (document, 0);
    };
    let records = match root.remove(records_key) {
        Some(Value::Array(records)) => records,
        Some(other) => {
            root.insert(records_key.to_string(), other);
            return (Value::Object(root), 0);
        }
        None => return (Value::Object(root), 0),
    };
    let before = records.len();
    let kept: Vec<Value> = records
        .into_iter()
        .filter(|record| !record.get(marker_field).is_some_and(is_truthy_marker))
        .collect();
    let removed = before - kept.len();
    root.insert(records_key.to_string(), Value::Array(kept));
    (Value::Object(root), removed)
}

/// Returns true for a set confidentiality marker.
///
/// `true`, non-zero numbers, and strings other than `""`/`"0"` are set.
#[must_use]
pub fn is_truthy_marker(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n.abs() > 0.0),
        Value::String(text) => !text.is_empty() && text != "0",
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}

// ============================================================================
// SECTION: Identifier Handling
// ============================================================================

/// Removes dotted field paths from every record.
#[must_use]
pub fn strip_fields(document: Value, records_key: &str, fields: &[String]) -> Value {
    if fields.is_empty() {
        return document;
    }
    map_records(document, records_key, |record| {
        let Value::Object(mut map) = record else {
            return record;
        };
        for field in fields {
            remove_path(&mut map, field);
        }
        Value::Object(map)
    })
}

/// Replaces string values of the named keys, at any depth, using `replace`.
///
/// # Errors
/// Returns the first error produced by `replace`.
pub fn tokenize_fields<E, F>(document: Value, fields: &[String], replace: &mut F) -> Result<Value, E>
where
    F: FnMut(&str) -> Result<String, E>,
{
    match document {
        Value::Array(items) => items
            .into_iter()
            .map(|item| tokenize_fields(item, fields, replace))
            .collect::<Result<Vec<_>, E>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, child) in map {
                let child = match child {
                    Value::String(raw) if fields.iter().any(|field| *field == key) => {
                        Value::String(replace(&raw)?)
                    }
                    other => tokenize_fields(other, fields, replace)?,
                };
                out.insert(key, child);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other),
    }
}

/// Captures identifier values of every record for the audit record.
///
/// Absent or non-scalar values are recorded as `?`.
#[must_use]
pub fn capture_identifiers(
    document: &Value,
    records_key: &str,
    fields: &[String],
) -> Vec<RetrievedIdentifiers> {
    if fields.is_empty() {
        return Vec::new();
    }
    let Some(Value::Array(records)) = document.get(records_key) else {
        return Vec::new();
    };
    records
        .iter()
        .map(|record| {
            fields
                .iter()
                .map(|field| {
                    let value = resolve_path(record, field)
                        .and_then(scalar_text)
                        .unwrap_or_else(|| ABSENT_IDENTIFIER.to_string());
                    (field.clone(), value)
                })
                .collect()
        })
        .collect()
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Applies `f` to every record in `document[records_key]`.
fn map_records<F>(document: Value, records_key: &str, mut f: F) -> Value
where
    F: FnMut(Value) -> Value,
{
    let Value::Object(mut root) = document else {
        return document;
    };
    match root.remove(records_key) {
        Some(Value::Array(records)) => {
            root.insert(
                records_key.to_string(),
                Value::Array(records.into_iter().map(&mut f).collect()),
            );
        }
        Some(other) => {
            root.insert(records_key.to_string(), other);
        }
        None => {}
    }
    Value::Object(root)
}

/// Removes a dotted path from an object, leaving parents in place.
fn remove_path(map: &mut Map<String, Value>, path: &str) {
    match path.split_once('.') {
        None => {
            map.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Value::Object(child)) = map.get_mut(head) {
                remove_path(child, rest);
            }
        }
    }
}

/// Resolves a dotted path inside a JSON value.
fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| current.get(segment))
}

/// Renders a string or number as text.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
