// crates/brp-gate-server/src/problem.rs
// ============================================================================
// Module: Problem Documents
// Description: RFC 7807 problem+json responses for gateway failures.
// Purpose: Map pipeline, auth, and parsing errors to client-safe responses.
// Dependencies: axum, brp-gate-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Every failure the gateway reports to a client is a [`Problem`]. Titles
//! and details come from the localized catalog, so denials never reveal
//! which scope or identifier caused them. Upstream validation details are
//! relayed because they describe the caller's own input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use brp_gate_core::PipelineError;
use brp_gate_core::PolicyError;
use brp_gate_core::UpstreamError;
use serde::Serialize;
use serde_json::Value;

use crate::auth::AuthError;
use crate::i18n::Locale;
use crate::t;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Media type of problem documents.
pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// Machine-readable problem codes.
pub mod code {
    /// Request parameter validation failed.
    pub const PARAMS_VALIDATION: &str = "paramsValidation";
    /// Request body could not be parsed.
    pub const PARSE_ERROR: &str = "parseError";
    /// Caller lacks permission.
    pub const PERMISSION_DENIED: &str = "permissionDenied";
    /// Caller is not authenticated.
    pub const NOT_AUTHENTICATED: &str = "notAuthenticated";
    /// Upstream found nothing.
    pub const NOT_FOUND: &str = "notFound";
    /// Upstream failed.
    pub const UPSTREAM_ERROR: &str = "upstreamError";
    /// Upstream timed out.
    pub const UPSTREAM_TIMEOUT: &str = "upstreamTimeout";
    /// Gateway failure.
    pub const INTERNAL_ERROR: &str = "internalError";
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Problem document returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    /// Problem type URI.
    #[serde(rename = "type")]
    pub problem_type: String,
    /// Short localized summary.
    pub title: String,
    /// HTTP status code.
    pub status: u16,
    /// Localized explanation.
    pub detail: String,
    /// Machine-readable code.
    pub code: String,
    /// Request path the problem occurred on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl Problem {
    /// Creates a problem without an instance.
    #[must_use]
    pub fn new(status: StatusCode, code: &str, title: String, detail: String) -> Self {
        Self {
            problem_type: type_uri(status).to_string(),
            title,
            status: status.as_u16(),
            detail,
            code: code.to_string(),
            instance: None,
        }
    }

    /// Sets the request path the problem occurred on.
    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Problem for a missing or rejected bearer token.
    #[must_use]
    pub fn not_authenticated(locale: Locale) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            code::NOT_AUTHENTICATED,
            t!(locale, "problem.not_authenticated.title"),
            t!(locale, "problem.not_authenticated.detail"),
        )
    }

    /// Problem for any permission denial.
    #[must_use]
    pub fn permission_denied(locale: Locale) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            code::PERMISSION_DENIED,
            t!(locale, "problem.permission_denied.title"),
            t!(locale, "problem.permission_denied.detail"),
        )
    }

    /// Problem for a body that is not a JSON object.
    #[must_use]
    pub fn parse_error(locale: Locale) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            code::PARSE_ERROR,
            t!(locale, "problem.parse_error.title"),
            t!(locale, "problem.parse_error.detail"),
        )
    }

    /// Problem for a malformed correlation header.
    #[must_use]
    pub fn invalid_correlation(locale: Locale) -> Self {
        Self::params_validation(locale, t!(locale, "problem.params_validation.correlation"))
    }

    /// Problem for an unexpected gateway failure.
    #[must_use]
    pub fn internal(locale: Locale) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            code::INTERNAL_ERROR,
            t!(locale, "problem.internal.title"),
            t!(locale, "problem.internal.detail"),
        )
    }

    /// Problem for an authentication failure.
    #[must_use]
    pub fn from_auth(_error: &AuthError, locale: Locale) -> Self {
        Self::not_authenticated(locale)
    }

    /// Maps a pipeline error to its client-facing problem.
    #[must_use]
    pub fn from_pipeline(error: &PipelineError, locale: Locale) -> Self {
        match error {
            PipelineError::Policy(PolicyError::UnknownParameter {
                parameter,
            }) => Self::params_validation(
                locale,
                t!(locale, "problem.params_validation.unknown", parameter = parameter),
            ),
            PipelineError::Policy(PolicyError::UnsupportedValue {
                parameter,
                values,
            }) => Self::params_validation(
                locale,
                t!(
                    locale,
                    "problem.params_validation.unsupported",
                    parameter = parameter,
                    values = values.join(", ")
                ),
            ),
            PipelineError::Policy(PolicyError::MissingParameter {
                parameter,
            }) => Self::params_validation(
                locale,
                t!(locale, "problem.params_validation.missing", parameter = parameter),
            ),
            PipelineError::Policy(PolicyError::PermissionDenied {
                ..
            })
            | PipelineError::DatasetNotGranted
            | PipelineError::Tokenization(_) => Self::permission_denied(locale),
            PipelineError::Upstream(upstream) => Self::from_upstream(upstream, locale),
            PipelineError::Internal(_) => Self::internal(locale),
        }
    }

    /// Maps an upstream failure to its client-facing problem.
    fn from_upstream(error: &UpstreamError, locale: Locale) -> Self {
        match error {
            UpstreamError::Status {
                status: 400,
                body,
            } => {
                let detail = body_text(body, "detail")
                    .unwrap_or_else(|| t!(locale, "problem.params_validation.remote"));
                Self::params_validation(locale, detail)
            }
            UpstreamError::Status {
                status: status @ (401 | 403),
                body,
            } => {
                let remote_title = body_text(body, "title").unwrap_or_default();
                let mut problem = Self::permission_denied(locale);
                problem.detail = t!(
                    locale,
                    "problem.remote_denied.detail",
                    status = status,
                    title = remote_title
                );
                problem
            }
            UpstreamError::Status {
                status: 404,
                ..
            } => Self::new(
                StatusCode::NOT_FOUND,
                code::NOT_FOUND,
                t!(locale, "problem.not_found.title"),
                t!(locale, "problem.not_found.detail"),
            ),
            UpstreamError::Timeout(_) => Self::new(
                StatusCode::GATEWAY_TIMEOUT,
                code::UPSTREAM_TIMEOUT,
                t!(locale, "problem.upstream_timeout.title"),
                t!(locale, "problem.upstream_timeout.detail"),
            ),
            UpstreamError::Status {
                ..
            }
            | UpstreamError::Transport(_)
            | UpstreamError::InvalidResponse(_) => Self::new(
                StatusCode::BAD_GATEWAY,
                code::UPSTREAM_ERROR,
                t!(locale, "problem.upstream_error.title"),
                t!(locale, "problem.upstream_error.detail"),
            ),
        }
    }

    /// Builds a parameter validation problem with the given detail.
    fn params_validation(locale: Locale, detail: String) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            code::PARAMS_VALIDATION,
            t!(locale, "problem.params_validation.title"),
            detail,
        )
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self)).into_response();
        response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(PROBLEM_CONTENT_TYPE));
        response
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the RFC section URI describing a status code.
fn type_uri(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "https://datatracker.ietf.org/doc/html/rfc7231#section-6.5.1",
        401 => "https://datatracker.ietf.org/doc/html/rfc7235#section-3.1",
        403 => "https://datatracker.ietf.org/doc/html/rfc7231#section-6.5.3",
        404 => "https://datatracker.ietf.org/doc/html/rfc7231#section-6.5.4",
        502 => "https://datatracker.ietf.org/doc/html/rfc7231#section-6.6.3",
        504 => "https://datatracker.ietf.org/doc/html/rfc7231#section-6.6.5",
        _ => "https://datatracker.ietf.org/doc/html/rfc7231#section-6.6.1",
    }
}

/// Reads a non-empty string member of an upstream problem body.
fn body_text(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for problem document mapping.

    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap for clarity."
    )]

    use brp_gate_core::TokenDenial;
    use serde_json::json;

    use super::*;

    /// Verifies policy validation errors become 400 problems.
    #[test]
    fn validation_errors_map_to_params_validation() {
        let error = PipelineError::Policy(PolicyError::UnsupportedValue {
            parameter: "type".to_string(),
            values: vec!["Onbekend".to_string()],
        });
        let problem = Problem::from_pipeline(&error, Locale::En);
        assert_eq!(problem.status, 400);
        assert_eq!(problem.code, code::PARAMS_VALIDATION);
        assert_eq!(problem.detail, "Unsupported value for type: Onbekend.");
    }

    /// Verifies every denial carries the same generic detail.
    #[test]
    fn denials_share_one_generic_detail() {
        let scoped = Problem::from_pipeline(
            &PipelineError::Policy(PolicyError::PermissionDenied {
                needed: vec!["benk-brp-zoekvraag-postcode-huisnummer".to_string()],
                missing: vec!["benk-brp-zoekvraag-postcode-huisnummer".to_string()],
            }),
            Locale::Nl,
        );
        let tokenized = Problem::from_pipeline(
            &PipelineError::Tokenization(TokenDenial::MissingCorrelation),
            Locale::Nl,
        );
        assert_eq!(scoped, tokenized);
        assert_eq!(scoped.status, 403);
        assert!(!scoped.detail.contains("postcode"));
    }

    /// Verifies upstream statuses map to client statuses.
    #[test]
    fn upstream_statuses_map_to_client_statuses() {
        let cases = [
            (400, 400, code::PARAMS_VALIDATION),
            (401, 403, code::PERMISSION_DENIED),
            (403, 403, code::PERMISSION_DENIED),
            (404, 404, code::NOT_FOUND),
            (500, 502, code::UPSTREAM_ERROR),
        ];
        for (upstream, expected, expected_code) in cases {
            let error = PipelineError::Upstream(UpstreamError::Status {
                status: upstream,
                body: Value::Null,
            });
            let problem = Problem::from_pipeline(&error, Locale::En);
            assert_eq!(problem.status, expected);
            assert_eq!(problem.code, expected_code);
        }
        let timeout = Problem::from_pipeline(
            &PipelineError::Upstream(UpstreamError::Timeout("slow".to_string())),
            Locale::En,
        );
        assert_eq!(timeout.status, 504);
    }

    /// Verifies upstream problem details reach the caller.
    #[test]
    fn upstream_details_are_relayed() {
        let invalid = PipelineError::Upstream(UpstreamError::Status {
            status: 400,
            body: json!({"detail": "Parameter 'postcode' is ongeldig."}),
        });
        assert_eq!(
            Problem::from_pipeline(&invalid, Locale::Nl).detail,
            "Parameter 'postcode' is ongeldig."
        );
        let denied = PipelineError::Upstream(UpstreamError::Status {
            status: 403,
            body: json!({"title": "Forbidden"}),
        });
        assert_eq!(Problem::from_pipeline(&denied, Locale::Nl).detail, "403 from remote: Forbidden");
    }

    /// Verifies the serialized problem names its type URI in `type`.
    #[test]
    fn serialized_problem_uses_type_member() {
        let problem = Problem::parse_error(Locale::En).with_instance("/api/brp/personen");
        let value = serde_json::to_value(&problem).unwrap();
        assert_eq!(value["code"], "parseError");
        assert_eq!(value["instance"], "/api/brp/personen");
        assert!(value["type"].as_str().is_some_and(|uri| uri.ends_with("6.5.1")));
    }
}
