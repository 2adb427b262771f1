// crates/brp-gate-core/src/core/fields.rs
// ============================================================================
// Module: BRP Gate Field Catalog
// Description: Dataset field groups, field path coverage, and dotted grouping.
// Purpose: Resolve which response fields each dataset scope grants.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A dataset scope (for example `benk-brp-gegevensset-1`) grants a named
//! bundle of dotted field paths. The [`FieldCatalog`] holds those bundles and
//! derives two things from them:
//! - the default field list for a caller that does not pass `fields`,
//! - a `fields` [`ParameterPolicy`] keyed by field path for explicit requests.
//!
//! A path ending in `.*` covers every descendant of its parent. Catalog data
//! is loaded once and never mutated afterwards.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::core::policy::ParameterPolicy;
use crate::core::policy::Requirements;
use crate::core::policy::ScopeRequirement;
use crate::core::policy::ScopeSet;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Suffix marking a wildcard field path.
pub const WILDCARD_SUFFIX: &str = ".*";

/// Maximum accepted length of a single field path.
pub const MAX_FIELD_PATH_LENGTH: usize = 256;

/// Comment marker inside field-group files.
const COMMENT_PREFIX: char = '#';

// ============================================================================
// SECTION: Field Lists
// ============================================================================

/// Validated set of field paths, optionally ending in a wildcard segment.
///
/// # Invariants
/// - Every entry passes [`validate_field_path`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldList(BTreeSet<String>);

impl FieldList {
    /// Builds a list from paths, validating each one.
    ///
    /// # Errors
    /// Returns [`FieldCatalogError::InvalidPath`] for the first malformed path.
    pub fn from_paths<I, S>(paths: I) -> Result<Self, FieldCatalogError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries = BTreeSet::new();
        for path in paths {
            let path = path.into();
            validate_field_path(&path)?;
            entries.insert(path);
        }
        Ok(Self(entries))
    }

    /// Parses a field-group file: one path per line, `#` comments and blank
    /// lines ignored.
    ///
    /// # Errors
    /// Returns [`FieldCatalogError::InvalidPath`] for the first malformed line.
    pub fn parse(text: &str) -> Result<Self, FieldCatalogError> {
        Self::from_paths(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_PREFIX)),
        )
    }

    /// Returns true when any entry covers the path.
    #[must_use]
    pub fn covers(&self, path: &str) -> bool {
        self.0.iter().any(|entry| entry_covers(entry, path))
    }

    /// Returns true when the exact entry is present.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    /// Iterates entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when the list has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// SECTION: Field Catalog
// ============================================================================

/// Dataset scope to granted field paths.
///
/// # Invariants
/// - Every group is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCatalog {
    /// Field groups keyed by dataset scope.
    groups: BTreeMap<String, FieldList>,
}

impl FieldCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field group for a dataset scope.
    ///
    /// # Errors
    /// Returns [`FieldCatalogError::EmptyGroup`] for an empty list and
    /// [`FieldCatalogError::DuplicateGroup`] when the dataset already exists.
    pub fn insert_group(
        &mut self,
        dataset: impl Into<String>,
        fields: FieldList,
    ) -> Result<(), FieldCatalogError> {
        let dataset = dataset.into();
        if fields.is_empty() {
            return Err(FieldCatalogError::EmptyGroup(dataset));
        }
        if self.groups.contains_key(&dataset) {
            return Err(FieldCatalogError::DuplicateGroup(dataset));
        }
        self.groups.insert(dataset, fields);
        Ok(())
    }

    /// Returns the field group of a dataset.
    #[must_use]
    pub fn group(&self, dataset: &str) -> Option<&FieldList> {
        self.groups.get(dataset)
    }

    /// Iterates dataset names in sorted order.
    pub fn datasets(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Returns every dataset whose group covers the path.
    #[must_use]
    pub fn granting_datasets(&self, path: &str) -> BTreeSet<String> {
        self.groups
            .iter()
            .filter(|(_, fields)| fields.covers(path))
            .map(|(dataset, _)| dataset.clone())
            .collect()
    }

    /// Computes the default field list for a caller.
    ///
    /// Only datasets present in `granted` contribute. Wildcards collapse to
    /// their parent. When `allowed` is set, paths outside it are narrowed to
    /// the allowed entries they cover. The result drops paths already covered
    /// by an included parent and is sorted.
    #[must_use]
    pub fn default_fields(&self, granted: &ScopeSet, allowed: Option<&FieldList>) -> Vec<String> {
        let mut collected = BTreeSet::new();
        for (dataset, fields) in &self.groups {
            if !granted.contains(dataset) {
                continue;
            }
            for entry in fields.iter() {
                let base = wildcard_base(entry);
                match allowed {
                    None => {
                        collected.insert(base.to_string());
                    }
                    Some(allowed) if allowed.covers(base) => {
                        collected.insert(base.to_string());
                    }
                    Some(allowed) => {
                        for narrowed in allowed.iter().map(wildcard_base) {
                            if entry_covers(base, narrowed) {
                                collected.insert(narrowed.to_string());
                            }
                        }
                    }
                }
            }
        }
        minimize_paths(&collected)
    }

    /// Builds the `fields` parameter policy for a variant.
    ///
    /// Every known path maps to the datasets that grant it. Paths outside
    /// `allowed` and paths no dataset grants are unattainable, so requesting
    /// them is a permission denial rather than a validation error.
    #[must_use]
    pub fn field_policy<'a, I>(&self, known_paths: I, allowed: Option<&FieldList>) -> ParameterPolicy
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut paths: BTreeSet<String> = known_paths.into_iter().map(str::to_string).collect();
        for fields in self.groups.values() {
            paths.extend(fields.iter().map(str::to_string));
        }

        let mut policy = ParameterPolicy::new().with_field_wildcards();
        for path in paths {
            let permitted = allowed.is_none_or(|list| list.covers(wildcard_base(&path)));
            let requirement = if permitted {
                ScopeRequirement::any_of(self.granting_datasets(&path))
            } else {
                ScopeRequirement::Unattainable
            };
            policy = policy.with_value_requirements(path, Requirements::from([requirement]));
        }
        policy
    }
}

// ============================================================================
// SECTION: Dotted Grouping
// ============================================================================

/// Nested grouping of dotted names; leaves are empty mappings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DottedTree(BTreeMap<String, DottedTree>);

impl DottedTree {
    /// Returns the child subtree for a segment.
    #[must_use]
    pub fn get(&self, segment: &str) -> Option<&Self> {
        self.0.get(segment)
    }

    /// Returns true when the node has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates children in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Self)> {
        self.0.iter().map(|(segment, child)| (segment.as_str(), child))
    }

    /// Returns every node as a dotted path, parents before children.
    #[must_use]
    pub fn flatten(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out
    }

    /// Appends the dotted paths below this node to `out`.
    fn flatten_into(&self, prefix: &str, out: &mut Vec<String>) {
        for (segment, child) in &self.0 {
            let path =
                if prefix.is_empty() { segment.clone() } else { format!("{prefix}.{segment}") };
            out.push(path.clone());
            child.flatten_into(&path, out);
        }
    }

    /// Inserts one dotted path.
    fn insert_path(&mut self, path: &str) {
        let mut node = self;
        for segment in path.split('.').filter(|segment| !segment.is_empty()) {
            node = node.0.entry(segment.to_string()).or_default();
        }
    }
}

/// Groups flat dotted names into a nested mapping.
///
/// Input order does not matter and duplicate names collapse.
#[must_use]
pub fn group_dotted_names<I, S>(names: I) -> DottedTree
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tree = DottedTree::default();
    for name in names {
        tree.insert_path(name.as_ref());
    }
    tree
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Field catalog construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldCatalogError {
    /// A field path is malformed.
    #[error("invalid field path: {0}")]
    InvalidPath(String),
    /// A dataset group has no entries.
    #[error("empty field group: {0}")]
    EmptyGroup(String),
    /// A dataset group was registered twice.
    #[error("duplicate field group: {0}")]
    DuplicateGroup(String),
    /// A group references a path the response shape does not know.
    #[error("unknown field path: {0}")]
    UnknownField(String),
    /// An endpoint needs a record type field list that was not loaded.
    #[error("missing record type field list: {0}")]
    MissingRecordType(String),
    /// An endpoint needs a response shape that was not loaded.
    #[error("missing response shape: {0}")]
    MissingShape(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates a dotted field path with an optional final wildcard segment.
///
/// # Errors
/// Returns [`FieldCatalogError::InvalidPath`] when the path is empty, too
/// long, has empty segments, uses characters outside `[A-Za-z0-9]`, or places
/// a wildcard anywhere but the final segment.
pub fn validate_field_path(path: &str) -> Result<(), FieldCatalogError> {
    if path.is_empty() || path.len() > MAX_FIELD_PATH_LENGTH {
        return Err(FieldCatalogError::InvalidPath(path.to_string()));
    }
    let segments: Vec<&str> = path.split('.').collect();
    let last = segments.len() - 1;
    for (index, segment) in segments.iter().enumerate() {
        let valid = if *segment == "*" {
            index == last && index > 0
        } else {
            !segment.is_empty() && segment.chars().all(|ch| ch.is_ascii_alphanumeric())
        };
        if !valid {
            return Err(FieldCatalogError::InvalidPath(path.to_string()));
        }
    }
    Ok(())
}

/// Strips a trailing wildcard segment.
#[must_use]
pub fn wildcard_base(path: &str) -> &str {
    path.strip_suffix(WILDCARD_SUFFIX).unwrap_or(path)
}

/// Returns true when `entry` grants `path`.
///
/// An entry covers itself and every descendant; `x.*` is treated as `x`.
#[must_use]
pub fn entry_covers(entry: &str, path: &str) -> bool {
    let base = wildcard_base(entry);
    let target = wildcard_base(path);
    target == base || target.strip_prefix(base).is_some_and(|rest| rest.starts_with('.'))
}

/// Drops paths already covered by another path in the set.
fn minimize_paths(paths: &BTreeSet<String>) -> Vec<String> {
    paths
        .iter()
        .filter(|path| !paths.iter().any(|other| other != *path && entry_covers(other, path)))
        .cloned()
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
