// crates/brp-gate-server/src/correlation.rs
// ============================================================================
// Module: Correlation Handling
// Description: Parsing of caller correlation ids and server request ids.
// Purpose: Scope identifier tokens to a caller context and tag every request.
// Dependencies: brp-gate-core, rand
// ============================================================================

//! ## Overview
//! The `X-Correlation-ID` header names the caller's working context. It is
//! the key under which identifier tokens are minted and accepted, so a
//! malformed value is rejected rather than repaired. Independently, every
//! request receives a server request id (boot-scoped random prefix plus a
//! monotonic counter) that is returned in `X-Request-ID` and logged.
//!
//! Security posture: correlation headers are untrusted input; see
//! `Docs/security/threat_model.md`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use brp_gate_core::CorrelationId;
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying the caller correlation id.
pub const CORRELATION_HEADER: &str = "x-correlation-id";
/// Header carrying the caller's task description.
pub const TASK_DESCRIPTION_HEADER: &str = "x-task-description";
/// Header carrying the server request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
/// Maximum correlation id length.
pub const MAX_CORRELATION_ID_LENGTH: usize = 128;
/// Maximum task description length; longer values are truncated.
pub const MAX_TASK_DESCRIPTION_LENGTH: usize = 512;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Reason a correlation header was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CorrelationIdRejection {
    /// Header was empty after trimming.
    #[error("empty_after_trim")]
    EmptyAfterTrim,
    /// Header exceeded [`MAX_CORRELATION_ID_LENGTH`].
    #[error("too_long")]
    TooLong,
    /// Header contained characters outside the HTTP token set.
    #[error("contains_disallowed_char")]
    ContainsDisallowedChar,
}

/// Issues unique server request ids.
///
/// # Invariants
/// - Issued ids are unique within the process lifetime.
#[derive(Debug)]
pub struct RequestIdGenerator {
    /// Boot-scoped random identifier.
    boot_id: u64,
    /// Monotonic counter.
    counter: AtomicU64,
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestIdGenerator {
    /// Creates a generator with a fresh boot id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            boot_id: OsRng.next_u64(),
            counter: AtomicU64::new(1),
        }
    }

    /// Issues the next request id.
    #[must_use]
    pub fn issue(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("brp-{:016x}-{seq:08x}", self.boot_id)
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses the caller correlation header.
///
/// Returns `Ok(None)` when the header is absent.
///
/// # Errors
/// Returns [`CorrelationIdRejection`] when the value is empty, too long, or
/// contains characters outside the HTTP token set.
pub fn parse_correlation_id(
    value: Option<&str>,
) -> Result<Option<CorrelationId>, CorrelationIdRejection> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CorrelationIdRejection::EmptyAfterTrim);
    }
    if trimmed.len() > MAX_CORRELATION_ID_LENGTH {
        return Err(CorrelationIdRejection::TooLong);
    }
    if !trimmed.chars().all(is_tchar) {
        return Err(CorrelationIdRejection::ContainsDisallowedChar);
    }
    Ok(Some(CorrelationId::new(trimmed)))
}

/// Normalizes the task description header for audit records.
#[must_use]
pub fn task_description(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_TASK_DESCRIPTION_LENGTH).collect())
}

/// Returns true when the character is a valid HTTP token character.
const fn is_tchar(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(
            ch,
            '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '.' | '^' | '_' | '`' | '|' | '~'
        )
}

// ============================================================================
// SECTION: Tests
// ============================================================================
