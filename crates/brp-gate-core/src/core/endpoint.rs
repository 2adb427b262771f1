// crates/brp-gate-core/src/core/endpoint.rs
// ============================================================================
// Module: BRP Gate Endpoint Model
// Description: Immutable per-endpoint configuration values.
// Purpose: Parameterize the generic proxy pipeline per upstream endpoint.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Every proxied endpoint is an [`EndpointConfig`] value: upstream URL,
//! public path, base scopes, and one [`EndpointVariant`] per discriminator
//! value. A variant owns its [`ParameterRuleset`], the augmentations applied
//! before validation, its field catalog view, and the identifier fields that
//! are inserted for audit purposes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;

use crate::core::fields::FieldCatalog;
use crate::core::fields::FieldList;
use crate::core::policy::ParameterRuleset;
use crate::core::policy::PolicyError;
use crate::core::policy::Requirements;
use crate::core::policy::ScopeSet;
use crate::core::policy::value_text;
use crate::core::shape::ResponseShape;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default discriminator parameter name.
pub const DEFAULT_DISCRIMINATOR: &str = "type";

/// Parameter carrying the requested field list.
pub const FIELDS_PARAMETER: &str = "fields";

// ============================================================================
// SECTION: Augmentation
// ============================================================================

/// Request rewrite applied before policy validation.
///
/// # Invariants
/// - Never overwrites a value the caller supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum Augmentation {
    /// Sets a default value, unless the caller holds `unless_scope`.
    DefaultValue {
        /// Parameter to default.
        parameter: String,
        /// Value to insert.
        value: Value,
        /// Scope that lifts the default.
        unless_scope: Option<String>,
    },
    /// Sets a parameter to `true` when the caller holds `scope`.
    EnableFlag {
        /// Parameter to enable.
        parameter: String,
        /// Scope that enables the flag.
        scope: String,
    },
}

impl Augmentation {
    /// Applies the augmentation to a request.
    pub fn apply(&self, request: &mut Map<String, Value>, granted: &ScopeSet) {
        match self {
            Self::DefaultValue {
                parameter,
                value,
                unless_scope,
            } => {
                let lifted = unless_scope.as_ref().is_some_and(|scope| granted.contains(scope));
                if !lifted && !request.contains_key(parameter) {
                    request.insert(parameter.clone(), value.clone());
                }
            }
            Self::EnableFlag {
                parameter,
                scope,
            } => {
                if granted.contains(scope) && !request.contains_key(parameter) {
                    request.insert(parameter.clone(), Value::Bool(true));
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Variants
// ============================================================================

/// Field catalog view of a variant.
#[derive(Debug, Clone)]
pub struct VariantFields {
    /// Dataset field groups of the endpoint.
    pub catalog: Arc<FieldCatalog>,
    /// Fields the variant's record type exposes; `None` means unrestricted.
    pub allowed: Option<FieldList>,
}

impl VariantFields {
    /// Resolves the default field list for a caller.
    #[must_use]
    pub fn default_fields(&self, granted: &ScopeSet) -> Vec<String> {
        self.catalog.default_fields(granted, self.allowed.as_ref())
    }
}

/// One discriminator variant of an endpoint.
#[derive(Debug, Clone)]
pub struct EndpointVariant {
    /// Discriminator value selecting this variant.
    pub name: String,
    /// Parameter policies, including the discriminator itself.
    pub ruleset: ParameterRuleset,
    /// Rewrites applied before validation, in order.
    pub augmentations: Vec<Augmentation>,
    /// Field catalog view; `None` when the variant has no `fields` parameter.
    pub fields: Option<VariantFields>,
    /// Identifier fields added to `fields` for audit when not requested.
    pub inserted_identifiers: Vec<String>,
}

impl EndpointVariant {
    /// Creates a variant with a ruleset and no extras.
    #[must_use]
    pub fn new(name: impl Into<String>, ruleset: ParameterRuleset) -> Self {
        Self {
            name: name.into(),
            ruleset,
            augmentations: Vec::new(),
            fields: None,
            inserted_identifiers: Vec::new(),
        }
    }

    /// Adds an augmentation.
    #[must_use]
    pub fn with_augmentation(mut self, augmentation: Augmentation) -> Self {
        self.augmentations.push(augmentation);
        self
    }

    /// Attaches a field catalog and derives the `fields` policy from the
    /// response shape.
    #[must_use]
    pub fn with_fields(
        mut self,
        catalog: Arc<FieldCatalog>,
        allowed: Option<FieldList>,
        shape: &ResponseShape,
    ) -> Self {
        let known = shape.known_paths();
        let policy = catalog.field_policy(known.iter().map(String::as_str), allowed.as_ref());
        self.ruleset.insert(FIELDS_PARAMETER, policy);
        self.fields = Some(VariantFields {
            catalog,
            allowed,
        });
        self
    }

    /// Sets the identifier fields inserted for audit.
    #[must_use]
    pub fn with_inserted_identifiers<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inserted_identifiers = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Applies every augmentation in order.
    pub fn augment(&self, request: &mut Map<String, Value>, granted: &ScopeSet) {
        for augmentation in &self.augmentations {
            augmentation.apply(request, granted);
        }
    }
}

// ============================================================================
// SECTION: Endpoint
// ============================================================================

/// Rule hiding records flagged confidential upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfidentialityRule {
    /// Record field holding the confidentiality marker.
    pub marker_field: String,
    /// Scope that allows confidential records through.
    pub override_scope: String,
}

/// Rule for tokenizing an identifier in responses and requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizationRule {
    /// Scope that turns tokenization on for a caller.
    pub scope: String,
    /// Scope allowing a tokenizing caller to submit raw identifiers.
    pub raw_input_scope: String,
    /// Response fields whose values are tokenized at any depth.
    pub fields: Vec<String>,
    /// Request parameters whose values are detokenized.
    pub parameters: Vec<String>,
}

/// Immutable configuration of one proxied endpoint.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Short service name used in logs and audit records.
    pub service: String,
    /// Upstream endpoint URL.
    pub upstream_url: String,
    /// Gateway path the endpoint is served on.
    pub public_path: String,
    /// Externally visible URL replacing `upstream_url` in links.
    pub public_url: String,
    /// Requirements applied to every request.
    pub base_scopes: Requirements,
    /// Parameter selecting the variant.
    pub discriminator: String,
    /// Variants keyed by discriminator value.
    pub variants: BTreeMap<String, EndpointVariant>,
    /// Response key holding the record list.
    pub records_key: Option<String>,
    /// Record shape used for schema completion.
    pub shape: Option<Arc<ResponseShape>>,
    /// Confidential record suppression.
    pub confidentiality: Option<ConfidentialityRule>,
    /// Identifier tokenization.
    pub tokenization: Option<TokenizationRule>,
    /// Record fields captured for the audit record.
    pub audit_identifiers: Vec<String>,
}

impl EndpointConfig {
    /// Creates an endpoint without variants.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        upstream_url: impl Into<String>,
        public_path: impl Into<String>,
        base_scopes: Requirements,
    ) -> Self {
        let public_path = public_path.into();
        Self {
            service: service.into(),
            upstream_url: upstream_url.into(),
            public_url: public_path.clone(),
            public_path,
            base_scopes,
            discriminator: DEFAULT_DISCRIMINATOR.to_string(),
            variants: BTreeMap::new(),
            records_key: None,
            shape: None,
            confidentiality: None,
            tokenization: None,
            audit_identifiers: Vec::new(),
        }
    }

    /// Registers a variant under its name.
    #[must_use]
    pub fn with_variant(mut self, variant: EndpointVariant) -> Self {
        self.variants.insert(variant.name.clone(), variant);
        self
    }

    /// Selects the variant named by the request discriminator.
    ///
    /// # Errors
    /// Returns [`PolicyError::MissingParameter`] when the discriminator is
    /// absent and [`PolicyError::UnsupportedValue`] for an unknown value.
    pub fn variant(&self, request: &Map<String, Value>) -> Result<&EndpointVariant, PolicyError> {
        let Some(value) = request.get(&self.discriminator) else {
            return Err(PolicyError::MissingParameter {
                parameter: self.discriminator.clone(),
            });
        };
        value_text(value).and_then(|name| self.variants.get(&name)).ok_or_else(|| {
            PolicyError::UnsupportedValue {
                parameter: self.discriminator.clone(),
                values: vec![value_text(value).unwrap_or_else(|| value.to_string())],
            }
        })
    }
}

// ============================================================================
// SECTION: Catalog Inputs
// ============================================================================

/// Loaded catalog material for one endpoint.
#[derive(Debug, Clone, Default)]
pub struct EndpointCatalog {
    /// Dataset field groups.
    pub datasets: FieldCatalog,
    /// Record shape, when the endpoint supports field selection.
    pub shape: Option<ResponseShape>,
    /// Allowed field lists keyed by record type name.
    pub record_types: BTreeMap<String, FieldList>,
}
