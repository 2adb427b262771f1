// crates/brp-gate-core/src/lib.rs
// ============================================================================
// Module: BRP Gate Core Library
// Description: Public API surface for the BRP Gate core.
// Purpose: Expose policy, field catalog, transform, and tokenization types.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! BRP Gate core implements the authorization and data-shaping pipeline that
//! sits between client applications and the Haal Centraal BRP APIs. It
//! evaluates per-parameter and per-field scope policies, shapes outbound
//! requests, rewrites upstream responses, and tokenizes citizen service
//! numbers per correlation context. Transport, upstream HTTP, and audit
//! delivery are reached through the traits in [`interfaces`].
//!
//! Security posture: every inbound payload and every upstream payload is
//! untrusted; policy evaluation fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::AuditSink;
pub use interfaces::UpstreamClient;
pub use interfaces::UpstreamError;
pub use interfaces::UpstreamResponse;
pub use runtime::IdentifierCipher;
pub use runtime::Principal;
pub use runtime::PipelineError;
pub use runtime::ProxyPipeline;
pub use runtime::ProxyRequest;
pub use runtime::ProxyResponse;
pub use runtime::TokenDenial;
pub use runtime::TokenError;
