// crates/brp-gate-core/src/core/shape.rs
// ============================================================================
// Module: BRP Gate Response Shape
// Description: Structural outline of upstream record types.
// Purpose: Drive schema completion and enumerate known field paths.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`ResponseShape`] is a structural outline of the upstream record
//! types, derived from an example document where every known field is
//! present. Objects become [`ShapeNode::Object`], arrays take the shape of
//! their first element, and every other JSON value is a scalar. The shape is
//! not a validator; it only answers "which fields exist and what is their
//! empty default".

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::core::fields::WILDCARD_SUFFIX;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Structural node of a response shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeNode {
    /// Any non-container value.
    Scalar,
    /// Object with named children.
    Object(BTreeMap<String, ShapeNode>),
    /// List whose items share one shape.
    List(Box<ShapeNode>),
}

impl ShapeNode {
    /// Derives a node from an example JSON value.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self::Object(
                map.iter().map(|(key, child)| (key.clone(), Self::from_json(child))).collect(),
            ),
            Value::Array(items) => {
                Self::List(Box::new(items.first().map_or(Self::Scalar, Self::from_json)))
            }
            _ => Self::Scalar,
        }
    }

    /// Returns the child node for a field name, looking through lists.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        match self {
            Self::Object(children) => children.get(name),
            Self::List(item) => item.child(name),
            Self::Scalar => None,
        }
    }

    /// Returns the object children of this node, looking through lists.
    #[must_use]
    pub fn children(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Object(children) => Some(children),
            Self::List(item) => item.children(),
            Self::Scalar => None,
        }
    }

    /// Resolves a dotted path below this node.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&Self> {
        path.split('.').try_fold(self, |node, segment| node.child(segment))
    }

    /// Returns the value inserted for an absent field of this shape.
    #[must_use]
    pub fn empty_value(&self) -> Value {
        match self {
            Self::List(_) => Value::Array(Vec::new()),
            Self::Scalar | Self::Object(_) => Value::Null,
        }
    }

    /// Appends every dotted path below this node to `out`.
    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        let Some(children) = self.children() else {
            return;
        };
        for (name, child) in children {
            let path = if prefix.is_empty() { name.clone() } else { format!("{prefix}.{name}") };
            if child.children().is_some() {
                out.push(format!("{path}{WILDCARD_SUFFIX}"));
            }
            out.push(path.clone());
            child.collect_paths(&path, out);
        }
    }
}

/// Response shape of one record type.
///
/// # Invariants
/// - The root is always an object node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseShape {
    /// Root object node.
    root: ShapeNode,
}

impl ResponseShape {
    /// Builds a shape from an example record.
    ///
    /// # Errors
    /// Returns [`ShapeError::NotAnObject`] when the example is not an object.
    pub fn from_json(example: &Value) -> Result<Self, ShapeError> {
        if !example.is_object() {
            return Err(ShapeError::NotAnObject);
        }
        Ok(Self {
            root: ShapeNode::from_json(example),
        })
    }

    /// Returns the root node.
    #[must_use]
    pub const fn root(&self) -> &ShapeNode {
        &self.root
    }

    /// Resolves a dotted path from the root.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&ShapeNode> {
        self.root.resolve(path)
    }

    /// Returns true when the path, ignoring a trailing wildcard, is known.
    #[must_use]
    pub fn knows(&self, path: &str) -> bool {
        let base = path.strip_suffix(WILDCARD_SUFFIX).unwrap_or(path);
        self.resolve(base).is_some()
    }

    /// Lists every known dotted path, plus `x.*` for container paths.
    #[must_use]
    pub fn known_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.root.collect_paths("", &mut out);
        out
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Response shape construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    /// The example record is not a JSON object.
    #[error("response shape must be a JSON object")]
    NotAnObject,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
