// crates/brp-gate-core/src/core/audit.rs
// ============================================================================
// Module: BRP Gate Audit Records
// Description: Structured audit payload emitted once per proxied request.
// Purpose: Capture who asked what, what was needed, and what was returned.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! One [`AuditRecord`] is produced for every request that reaches policy
//! evaluation, whether it is granted, denied, or fails upstream. Records
//! always carry raw identifier values, including those hidden or tokenized
//! in the client response, so they must only be delivered to an
//! [`crate::interfaces::AuditSink`].
//!
//! Security posture: audit records contain personal data; see
//! `Docs/security/threat_model.md`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Identifier values captured from one retrieved record, keyed by field.
pub type RetrievedIdentifiers = BTreeMap<String, String>;

/// Value recorded for an identifier absent from a record.
pub const ABSENT_IDENTIFIER: &str = "?";

/// Outcome of a proxied request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Request was forwarded and answered.
    Granted,
    /// Request was refused before reaching upstream.
    Denied,
    /// Request was forwarded but upstream failed.
    UpstreamFailed,
}

/// Audit record for one proxied request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Service name of the endpoint.
    pub service: String,
    /// Discriminator value when it was resolved.
    pub operation: Option<String>,
    /// Caller identity from the token.
    pub user: String,
    /// Caller correlation identifier.
    pub correlation_id: Option<String>,
    /// Caller-declared task description.
    pub task_description: Option<String>,
    /// Request outcome.
    pub outcome: AuditOutcome,
    /// Specific cause of a denial or failure.
    pub reason: Option<String>,
    /// Scopes granted to the caller, sorted.
    pub granted: Vec<String>,
    /// Requirements of the request, sorted.
    pub needed: Vec<String>,
    /// Requirements the caller did not satisfy, sorted.
    pub missing: Vec<String>,
    /// Request payload as received.
    pub request: Value,
    /// Request payload as forwarded upstream.
    pub upstream_request: Option<Value>,
    /// Upstream HTTP status.
    pub upstream_status: Option<u16>,
    /// Raw upstream response body.
    pub upstream_response: Option<Value>,
    /// Identifiers of every retrieved record, before filtering.
    pub retrieved: Vec<RetrievedIdentifiers>,
}

/// Inputs required to build an [`AuditRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecordParams {
    /// Service name of the endpoint.
    pub service: String,
    /// Discriminator value when it was resolved.
    pub operation: Option<String>,
    /// Caller identity from the token.
    pub user: String,
    /// Caller correlation identifier.
    pub correlation_id: Option<String>,
    /// Caller-declared task description.
    pub task_description: Option<String>,
    /// Request outcome.
    pub outcome: AuditOutcome,
    /// Specific cause of a denial or failure.
    pub reason: Option<String>,
    /// Scopes granted to the caller.
    pub granted: Vec<String>,
    /// Requirements of the request.
    pub needed: Vec<String>,
    /// Requirements the caller did not satisfy.
    pub missing: Vec<String>,
    /// Request payload as received.
    pub request: Value,
    /// Request payload as forwarded upstream.
    pub upstream_request: Option<Value>,
    /// Upstream HTTP status.
    pub upstream_status: Option<u16>,
    /// Raw upstream response body.
    pub upstream_response: Option<Value>,
    /// Identifiers of every retrieved record.
    pub retrieved: Vec<RetrievedIdentifiers>,
}

impl AuditRecord {
    /// Creates a new audit record stamped with the current time.
    #[must_use]
    pub fn new(params: AuditRecordParams) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "brp_access",
            timestamp_ms,
            service: params.service,
            operation: params.operation,
            user: params.user,
            correlation_id: params.correlation_id,
            task_description: params.task_description,
            outcome: params.outcome,
            reason: params.reason,
            granted: params.granted,
            needed: params.needed,
            missing: params.missing,
            request: params.request,
            upstream_request: params.upstream_request,
            upstream_status: params.upstream_status,
            upstream_response: params.upstream_response,
            retrieved: params.retrieved,
        }
    }
}
