// crates/brp-gate-config/src/lib.rs
// ============================================================================
// Module: BRP Gate Config Library
// Description: Canonical config model, validation, and catalog loading.
// Purpose: Single source of truth for brp-gate.toml semantics.
// Dependencies: brp-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `brp-gate-config` defines the configuration model for BRP Gate. It
//! provides strict, fail-closed validation, resolves secrets and
//! tokenization keys, and loads the field catalogs and response shapes the
//! endpoint definitions are built from.
//!
//! Security posture: config inputs are untrusted; see
//! `Docs/security/threat_model.md`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod catalog;
pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::build_endpoints;
pub use catalog::load_endpoint_catalog;
pub use config::*;
