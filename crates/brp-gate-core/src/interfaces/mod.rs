// crates/brp-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: BRP Gate Interfaces
// Description: Contracts for the upstream registry client and audit delivery.
// Purpose: Keep transport and log routing out of the policy pipeline.
// Dependencies: async-trait, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The pipeline reaches the outside world through two traits:
//! [`UpstreamClient`] performs the authenticated call to the registry, and
//! [`AuditSink`] receives one [`AuditRecord`] per request. Implementations
//! must be thread-safe; the pipeline shares them across request tasks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::audit::AuditRecord;

// ============================================================================
// SECTION: Upstream Client
// ============================================================================

/// Successful upstream response.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    /// HTTP status code (2xx).
    pub status: u16,
    /// Upstream `Content-Type` header value.
    pub content_type: Option<String>,
    /// Parsed JSON body.
    pub body: Value,
}

/// Upstream call errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpstreamError {
    /// Upstream answered with a non-2xx status.
    #[error("upstream returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Parsed body, or `null` when it was not JSON.
        body: Value,
    },
    /// Upstream did not answer in time.
    #[error("upstream timeout: {0}")]
    Timeout(String),
    /// Connection or TLS failure.
    #[error("upstream transport error: {0}")]
    Transport(String),
    /// Upstream answered with an unusable body.
    #[error("upstream invalid response: {0}")]
    InvalidResponse(String),
}

/// Authenticated client for the upstream registry.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Posts a shaped request payload to an upstream endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] for non-2xx statuses and transport failures.
    async fn call(&self, endpoint_url: &str, payload: &Value) -> Result<UpstreamResponse, UpstreamError>;
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    /// Records one audit record. Delivery failures are not reported back.
    fn record(&self, record: &AuditRecord);
}
