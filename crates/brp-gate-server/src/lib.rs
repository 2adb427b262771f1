// crates/brp-gate-server/src/lib.rs
// ============================================================================
// Module: BRP Gate Server Library
// Description: HTTP surface for the BRP authorization gateway.
// Purpose: Wire token verification, proxy pipelines, and upstream access.
// Dependencies: axum, brp-gate-core, jsonwebtoken, reqwest, tracing
// ============================================================================

//! ## Overview
//! `brp-gate-server` exposes the BRP endpoints over HTTP. Every request is
//! authenticated with a bearer token, handed to the endpoint's
//! [`brp_gate_core::ProxyPipeline`], and answered with either the transformed
//! upstream body or a localized problem document.
//!
//! Security posture: all inbound headers and bodies are untrusted; see
//! `Docs/security/threat_model.md`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod client;
pub mod correlation;
pub mod i18n;
pub mod problem;
pub mod server;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::build_audit_sink;
pub use auth::AuthError;
pub use auth::JwtVerifier;
pub use client::HaalCentraalClient;
pub use i18n::Locale;
pub use problem::Problem;
pub use server::GatewayServer;
pub use server::GatewayState;
pub use server::ServerError;
pub use server::router;
pub use telemetry::init_logging;
