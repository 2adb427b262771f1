// crates/brp-gate-server/src/auth.rs
// ============================================================================
// Module: Bearer Token Verification
// Description: JWT verification against a configured JWKS document.
// Purpose: Turn an Authorization header into an authenticated principal.
// Dependencies: brp-gate-config, brp-gate-core, jsonwebtoken, serde_json
// ============================================================================

//! ## Overview
//! Inbound requests carry a bearer JWT issued by the organisation's identity
//! provider. The verifier checks the signature against a static JWKS
//! document, enforces the configured algorithms, issuer, audience, and
//! expiry, and extracts the user identity and granted scopes from
//! configurable claims.
//!
//! Security posture: tokens are untrusted input; any verification failure is
//! reported as unauthenticated. See `Docs/security/threat_model.md`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use brp_gate_config::AuthConfig;
use brp_gate_core::Principal;
use brp_gate_core::ScopeSet;
use brp_gate_core::UserId;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::Validation;
use jsonwebtoken::decode;
use jsonwebtoken::decode_header;
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::jwk::JwkSet;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Claim used when the configured user claim is absent.
const FALLBACK_USER_CLAIM: &str = "sub";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Token verification errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No bearer token was sent.
    #[error("missing bearer token")]
    MissingToken,
    /// The token failed verification.
    #[error("invalid bearer token: {0}")]
    InvalidToken(String),
    /// The verifier could not be built from configuration.
    #[error("auth config error: {0}")]
    Config(String),
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Verifies bearer tokens against a static key set.
///
/// # Invariants
/// - `algorithms` is non-empty and only holds asymmetric algorithms.
#[derive(Clone)]
pub struct JwtVerifier {
    /// Verification keys.
    keys: JwkSet,
    /// Accepted signature algorithms.
    algorithms: Vec<Algorithm>,
    /// Required `iss` claim.
    issuer: Option<String>,
    /// Required `aud` claim.
    audience: Option<String>,
    /// Claim holding the user identity.
    user_claim: String,
    /// Claim holding the granted scopes.
    scope_claim: String,
    /// Clock leeway in seconds.
    leeway_secs: u64,
}

impl JwtVerifier {
    /// Builds a verifier from auth configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] when the JWKS document cannot be read or
    /// parsed, or an algorithm is unknown.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let document = config.jwks_document().map_err(|err| AuthError::Config(err.to_string()))?;
        let keys: JwkSet = serde_json::from_str(&document)
            .map_err(|err| AuthError::Config(format!("invalid jwks document: {err}")))?;
        let algorithms = config
            .algorithms
            .iter()
            .map(|name| {
                Algorithm::from_str(name)
                    .map_err(|_| AuthError::Config(format!("unknown algorithm: {name}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if algorithms.is_empty() {
            return Err(AuthError::Config("no algorithms configured".to_string()));
        }
        Ok(Self {
            keys,
            algorithms,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            user_claim: config.user_claim.clone(),
            scope_claim: config.scope_claim.clone(),
            leeway_secs: config.leeway_secs,
        })
    }

    /// Verifies the bearer token in `headers` and returns the caller.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingToken`] without an Authorization header
    /// and [`AuthError::InvalidToken`] for any verification failure.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let token = bearer_token(headers)?;
        let header = decode_header(token)
            .map_err(|_| AuthError::InvalidToken("invalid JWT header".to_string()))?;
        if !self.algorithms.contains(&header.alg) {
            return Err(AuthError::InvalidToken("JWT algorithm not accepted".to_string()));
        }
        let jwk = self.select_key(header.kid.as_deref())?;
        let key = DecodingKey::from_jwk(jwk)
            .map_err(|_| AuthError::InvalidToken("unusable JWK".to_string()))?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = self.leeway_secs;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(std::slice::from_ref(issuer));
        }
        match &self.audience {
            Some(audience) => validation.set_audience(std::slice::from_ref(audience)),
            None => validation.validate_aud = false,
        }
        let claims = decode::<Value>(token, &key, &validation)
            .map_err(|err| AuthError::InvalidToken(err.to_string()))?
            .claims;

        let user = claim_string(&claims, &self.user_claim)
            .or_else(|| claim_string(&claims, FALLBACK_USER_CLAIM))
            .ok_or_else(|| AuthError::InvalidToken("token has no user claim".to_string()))?;
        let scopes = claim_scopes(&claims, &self.scope_claim)?;
        Ok(Principal {
            user: UserId::new(user),
            scopes,
        })
    }

    /// Selects the key named by `kid`, or the only key when `kid` is absent.
    fn select_key(&self, kid: Option<&str>) -> Result<&Jwk, AuthError> {
        match kid {
            Some(kid) => self
                .keys
                .find(kid)
                .ok_or_else(|| AuthError::InvalidToken("JWT kid not found in JWKS".to_string())),
            None => match self.keys.keys.as_slice() {
                [only] => Ok(only),
                _ => Err(AuthError::InvalidToken("JWT header missing kid".to_string())),
            },
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts the bearer token from the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::MissingToken)?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .ok_or_else(|| AuthError::InvalidToken("authorization must be a bearer token".to_string()))?;
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

/// Reads a non-empty string claim.
fn claim_string(claims: &Value, claim: &str) -> Option<String> {
    claims
        .get(claim)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Reads the scope claim as a space-separated string or a string array.
fn claim_scopes(claims: &Value, claim: &str) -> Result<ScopeSet, AuthError> {
    match claims.get(claim) {
        None | Some(Value::Null) => Ok(ScopeSet::new()),
        Some(Value::String(value)) => Ok(value.split_whitespace().map(str::to_string).collect()),
        Some(Value::Array(items)) => {
            let mut scopes = ScopeSet::new();
            for item in items {
                let scope = item.as_str().ok_or_else(|| {
                    AuthError::InvalidToken(format!("claim {claim} must hold strings"))
                })?;
                let scope = scope.trim();
                if !scope.is_empty() {
                    scopes.insert(scope.to_string());
                }
            }
            Ok(scopes)
        }
        Some(_) => Err(AuthError::InvalidToken(format!(
            "claim {claim} must be a string or a string array"
        ))),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for bearer token and scope claim extraction.

    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap/expect for clarity."
    )]

    use axum::http::HeaderValue;
    use serde_json::json;

    use super::*;

    /// Verifies a request without an authorization header is rejected.
    #[test]
    fn bearer_token_rejects_missing_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), Err(AuthError::MissingToken));
    }

    /// Verifies non-bearer authorization schemes are rejected.
    #[test]
    fn bearer_token_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(bearer_token(&headers), Err(AuthError::InvalidToken(_))));
    }

    /// Verifies scope claims parse from arrays and space-separated strings.
    #[test]
    fn claim_scopes_accepts_string_and_array() {
        let claims = json!({
            "roles": ["benk-brp-api", "benk-brp-api", ""],
            "scp": "a b  c",
            "bad": 7,
        });
        let roles = claim_scopes(&claims, "roles").unwrap();
        assert_eq!(roles.into_iter().collect::<Vec<_>>(), vec!["benk-brp-api".to_string()]);
        assert_eq!(claim_scopes(&claims, "scp").unwrap().len(), 3);
        assert!(claim_scopes(&claims, "missing").unwrap().is_empty());
        assert!(claim_scopes(&claims, "bad").is_err());
    }
}
