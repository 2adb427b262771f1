// crates/brp-gate-core/src/core/mod.rs
// ============================================================================
// Module: BRP Gate Core Types
// Description: Policy, field catalog, response shape, and endpoint models.
// Purpose: Provide the immutable configuration values consumed by the pipeline.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Core types describe what a caller may ask for and what a caller may see.
//! They are loaded once at startup and shared read-only between requests.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod brp;
pub mod endpoint;
pub mod fields;
pub mod identifiers;
pub mod policy;
pub mod shape;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditOutcome;
pub use audit::AuditRecord;
pub use audit::AuditRecordParams;
pub use audit::RetrievedIdentifiers;
pub use endpoint::Augmentation;
pub use endpoint::ConfidentialityRule;
pub use endpoint::EndpointCatalog;
pub use endpoint::EndpointConfig;
pub use endpoint::EndpointVariant;
pub use endpoint::TokenizationRule;
pub use endpoint::VariantFields;
pub use fields::DottedTree;
pub use fields::FieldCatalog;
pub use fields::FieldCatalogError;
pub use fields::FieldList;
pub use fields::group_dotted_names;
pub use identifiers::CorrelationId;
pub use identifiers::UserId;
pub use policy::ParameterPolicy;
pub use policy::ParameterRuleset;
pub use policy::PolicyError;
pub use policy::RequiredScopes;
pub use policy::Requirements;
pub use policy::ScopeRequirement;
pub use policy::ScopeSet;
pub use policy::single_scope;
pub use shape::ResponseShape;
pub use shape::ShapeError;
pub use shape::ShapeNode;
