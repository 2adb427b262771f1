// crates/brp-gate-core/src/core/policy.rs
// ============================================================================
// Module: BRP Gate Parameter Policy
// Description: Per-parameter, per-value scope rules and their evaluation.
// Purpose: Decide which scopes an outbound request requires and deny early.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`ParameterRuleset`] maps every recognized request parameter to a
//! [`ParameterPolicy`]. Each policy maps exact values to the scope
//! requirements needed to submit them, optionally with a default requirement
//! for any other value. Evaluation is pure: it accumulates every requirement
//! into a [`RequiredScopes`] union and compares it with the granted scopes.
//!
//! Security posture: parameters without a policy are rejected and values
//! without a rule are rejected; there is no implicit allow. See
//! `Docs/security/threat_model.md`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Label used for requirements that no scope can satisfy.
pub const UNATTAINABLE_LABEL: &str = "<unattainable>";

/// Separator used when rendering an any-of requirement.
const ANY_OF_SEPARATOR: &str = "|";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Set of scopes granted to a caller.
pub type ScopeSet = BTreeSet<String>;

/// One scope requirement inside a requirement set.
///
/// # Invariants
/// - `AnyOf` always holds at least two scopes; builders collapse smaller sets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopeRequirement {
    /// A single named scope.
    Scope(String),
    /// Any one of the listed scopes.
    AnyOf(BTreeSet<String>),
    /// No scope grants this; always denied.
    Unattainable,
}

impl ScopeRequirement {
    /// Builds a single-scope requirement.
    #[must_use]
    pub fn scope(name: impl Into<String>) -> Self {
        Self::Scope(name.into())
    }

    /// Builds a requirement satisfied by any of the given scopes.
    ///
    /// An empty set yields [`ScopeRequirement::Unattainable`]; a single scope
    /// yields [`ScopeRequirement::Scope`].
    #[must_use]
    pub fn any_of<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set: BTreeSet<String> = scopes.into_iter().map(Into::into).collect();
        match set.len() {
            0 => Self::Unattainable,
            1 => set.pop_first().map_or(Self::Unattainable, Self::Scope),
            _ => Self::AnyOf(set),
        }
    }

    /// Returns true when the granted scopes satisfy this requirement.
    #[must_use]
    pub fn is_satisfied_by(&self, granted: &ScopeSet) -> bool {
        match self {
            Self::Scope(scope) => granted.contains(scope),
            Self::AnyOf(scopes) => scopes.iter().any(|scope| granted.contains(scope)),
            Self::Unattainable => false,
        }
    }

    /// Returns a stable display label used in logs and audit records.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Scope(scope) => scope.clone(),
            Self::AnyOf(scopes) => {
                scopes.iter().map(String::as_str).collect::<Vec<_>>().join(ANY_OF_SEPARATOR)
            }
            Self::Unattainable => UNATTAINABLE_LABEL.to_string(),
        }
    }
}

impl fmt::Display for ScopeRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Requirement set attached to one value; empty means always allowed.
pub type Requirements = BTreeSet<ScopeRequirement>;

/// Builds a requirement set holding one scope.
#[must_use]
pub fn single_scope(scope: impl Into<String>) -> Requirements {
    BTreeSet::from([ScopeRequirement::scope(scope)])
}

/// Scope rules for one request parameter.
///
/// # Invariants
/// - A value absent from `scopes_for_values` is rejected unless `default_scope` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterPolicy {
    /// Exact value to requirement set.
    scopes_for_values: BTreeMap<String, Requirements>,
    /// Requirement set for any value not listed.
    default_scope: Option<Requirements>,
    /// Resolve `parent.*` entries for dotted values without an exact entry.
    field_wildcards: bool,
}

impl ParameterPolicy {
    /// Creates a policy that accepts nothing until values are added.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy that accepts any value without a scope requirement.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            scopes_for_values: BTreeMap::new(),
            default_scope: Some(Requirements::new()),
            field_wildcards: false,
        }
    }

    /// Creates a policy that accepts any value for one scope.
    #[must_use]
    pub fn for_all_values(scope: impl Into<String>) -> Self {
        Self {
            scopes_for_values: BTreeMap::new(),
            default_scope: Some(single_scope(scope)),
            field_wildcards: false,
        }
    }

    /// Adds a value gated by one scope.
    #[must_use]
    pub fn with_value(self, value: impl Into<String>, scope: impl Into<String>) -> Self {
        self.with_value_requirements(value, single_scope(scope))
    }

    /// Adds a value that is always allowed.
    #[must_use]
    pub fn allow_value(self, value: impl Into<String>) -> Self {
        self.with_value_requirements(value, Requirements::new())
    }

    /// Adds a value gated by an explicit requirement set.
    #[must_use]
    pub fn with_value_requirements(
        mut self,
        value: impl Into<String>,
        requirements: Requirements,
    ) -> Self {
        self.scopes_for_values.insert(value.into(), requirements);
        self
    }

    /// Sets the requirement applied to unlisted values.
    #[must_use]
    pub fn with_default_scope(mut self, requirements: Requirements) -> Self {
        self.default_scope = Some(requirements);
        self
    }

    /// Enables `parent.*` lookup for dotted field paths.
    #[must_use]
    pub const fn with_field_wildcards(mut self) -> Self {
        self.field_wildcards = true;
        self
    }

    /// Returns the explicit value table.
    #[must_use]
    pub const fn scopes_for_values(&self) -> &BTreeMap<String, Requirements> {
        &self.scopes_for_values
    }

    /// Returns the default requirement, if any.
    #[must_use]
    pub const fn default_scope(&self) -> Option<&Requirements> {
        self.default_scope.as_ref()
    }

    /// Resolves the requirement set for a value, or `None` when unsupported.
    #[must_use]
    pub fn requirements_for(&self, value: &str) -> Option<&Requirements> {
        if let Some(requirements) = self.scopes_for_values.get(value) {
            return Some(requirements);
        }
        if self.field_wildcards
            && let Some((parent, _)) = value.rsplit_once('.')
            && let Some(requirements) = self.scopes_for_values.get(&format!("{parent}.*"))
        {
            return Some(requirements);
        }
        self.default_scope.as_ref()
    }
}

/// Ordered parameter policies for one endpoint variant.
///
/// # Invariants
/// - Declaration order is the evaluation order for value errors.
/// - Parameter names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterRuleset {
    /// Parameter policies in declaration order.
    entries: Vec<(String, ParameterPolicy)>,
}

impl ParameterRuleset {
    /// Creates an empty ruleset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a parameter policy, returning the ruleset.
    #[must_use]
    pub fn with(mut self, parameter: impl Into<String>, policy: ParameterPolicy) -> Self {
        self.insert(parameter, policy);
        self
    }

    /// Adds or replaces a parameter policy in place.
    ///
    /// A replaced policy keeps its original declaration position.
    pub fn insert(&mut self, parameter: impl Into<String>, policy: ParameterPolicy) {
        let parameter = parameter.into();
        if let Some(entry) = self.entries.iter_mut().find(|(name, _)| *name == parameter) {
            entry.1 = policy;
        } else {
            self.entries.push((parameter, policy));
        }
    }

    /// Returns the policy for a parameter.
    #[must_use]
    pub fn get(&self, parameter: &str) -> Option<&ParameterPolicy> {
        self.entries.iter().find(|(name, _)| name == parameter).map(|(_, policy)| policy)
    }

    /// Returns the declared parameter names in order.
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Computes the requirement union for a request without looking at
    /// granted scopes.
    ///
    /// # Errors
    /// Returns [`PolicyError::UnknownParameter`] for the first unknown
    /// parameter in sorted order, then [`PolicyError::UnsupportedValue`] for
    /// the first parameter in declaration order carrying rejected values.
    pub fn required_scopes(&self, request: &Map<String, Value>) -> Result<RequiredScopes, PolicyError> {
        let mut names: Vec<&String> = request.keys().collect();
        names.sort();
        if let Some(unknown) = names.into_iter().find(|name| self.get(name).is_none()) {
            return Err(PolicyError::UnknownParameter {
                parameter: unknown.clone(),
            });
        }

        let mut required = RequiredScopes::default();
        for (parameter, policy) in &self.entries {
            let Some(value) = request.get(parameter) else {
                continue;
            };
            let elements: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            let mut rejected = Vec::new();
            for element in elements {
                let resolved = value_text(element)
                    .and_then(|text| policy.requirements_for(&text).map(Clone::clone));
                match resolved {
                    Some(requirements) => required.extend(requirements),
                    None => rejected.push(display_value(element)),
                }
            }
            if !rejected.is_empty() {
                return Err(PolicyError::UnsupportedValue {
                    parameter: parameter.clone(),
                    values: rejected,
                });
            }
        }
        Ok(required)
    }

    /// Validates a request against the ruleset and the granted scopes.
    ///
    /// # Errors
    /// Returns the validation errors of [`ParameterRuleset::required_scopes`]
    /// or [`PolicyError::PermissionDenied`] when requirements are unmet.
    pub fn validate(
        &self,
        request: &Map<String, Value>,
        granted: &ScopeSet,
    ) -> Result<RequiredScopes, PolicyError> {
        let required = self.required_scopes(request)?;
        required.ensure_granted(granted)?;
        Ok(required)
    }
}

/// Union of requirements accumulated while evaluating one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredScopes(Requirements);

impl RequiredScopes {
    /// Creates a union from an existing requirement set.
    #[must_use]
    pub const fn from_requirements(requirements: Requirements) -> Self {
        Self(requirements)
    }

    /// Adds requirements to the union.
    pub fn extend(&mut self, requirements: impl IntoIterator<Item = ScopeRequirement>) {
        self.0.extend(requirements);
    }

    /// Returns the requirements in the union.
    #[must_use]
    pub const fn requirements(&self) -> &Requirements {
        &self.0
    }

    /// Returns true when nothing is required.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns requirements not satisfied by the granted scopes.
    #[must_use]
    pub fn missing(&self, granted: &ScopeSet) -> Vec<ScopeRequirement> {
        self.0.iter().filter(|requirement| !requirement.is_satisfied_by(granted)).cloned().collect()
    }

    /// Returns the sorted labels of every requirement.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.0.iter().map(ScopeRequirement::label).collect()
    }

    /// Fails when any requirement is unmet.
    ///
    /// # Errors
    /// Returns [`PolicyError::PermissionDenied`] listing needed and missing labels.
    pub fn ensure_granted(&self, granted: &ScopeSet) -> Result<(), PolicyError> {
        let missing = self.missing(granted);
        if missing.is_empty() {
            return Ok(());
        }
        Err(PolicyError::PermissionDenied {
            needed: self.labels(),
            missing: missing.iter().map(ScopeRequirement::label).collect(),
        })
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Policy evaluation errors.
///
/// # Invariants
/// - `UnknownParameter`, `UnsupportedValue`, and `MissingParameter` are safe to show callers.
/// - `PermissionDenied` details are for logs and audit only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The request contains a parameter without a policy.
    #[error("unknown parameter: {parameter}")]
    UnknownParameter {
        /// Parameter name.
        parameter: String,
    },
    /// The request contains values the policy does not accept.
    #[error("unsupported value for {parameter}: {}", .values.join(", "))]
    UnsupportedValue {
        /// Parameter name.
        parameter: String,
        /// Rejected values in request order.
        values: Vec<String>,
    },
    /// A required parameter is absent.
    #[error("missing parameter: {parameter}")]
    MissingParameter {
        /// Parameter name.
        parameter: String,
    },
    /// Granted scopes do not satisfy the accumulated requirements.
    #[error("permission denied, missing: {}", .missing.join(", "))]
    PermissionDenied {
        /// Every requirement of the request.
        needed: Vec<String>,
        /// Requirements the caller does not satisfy.
        missing: Vec<String>,
    },
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the policy lookup text for a scalar value.
pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Renders a rejected value for error messages.
fn display_value(value: &Value) -> String {
    value_text(value).unwrap_or_else(|| value.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
