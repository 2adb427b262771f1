// crates/brp-gate-server/src/server.rs
// ============================================================================
// Module: Gateway HTTP Server
// Description: axum router and server lifecycle for the BRP gateway.
// Purpose: Authenticate requests and dispatch them to endpoint pipelines.
// Dependencies: axum, brp-gate-config, brp-gate-core, tokio, tracing, url
// ============================================================================

//! ## Overview
//! The gateway serves one POST route per configured endpoint plus an
//! unauthenticated health route. Each request is assigned a request id,
//! authenticated, parsed, and handed to the endpoint's
//! [`ProxyPipeline`]. Failures become localized problem documents.
//!
//! Security posture: bodies are size-limited before parsing and every
//! header is validated; see `Docs/security/threat_model.md`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::MatchedPath;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderName;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use brp_gate_config::GatewayConfig;
use brp_gate_config::build_endpoints;
use brp_gate_core::AuditSink;
use brp_gate_core::ProxyPipeline;
use brp_gate_core::ProxyRequest;
use brp_gate_core::ProxyResponse;
use brp_gate_core::UpstreamClient;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::audit::build_audit_sink;
use crate::auth::JwtVerifier;
use crate::client::HaalCentraalClient;
use crate::correlation::CORRELATION_HEADER;
use crate::correlation::REQUEST_ID_HEADER;
use crate::correlation::RequestIdGenerator;
use crate::correlation::TASK_DESCRIPTION_HEADER;
use crate::correlation::parse_correlation_id;
use crate::correlation::task_description;
use crate::i18n::Locale;
use crate::problem::Problem;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Health check route.
pub const HEALTH_PATH: &str = "/health";
/// Query parameters that request the unfiltered result.
const FULL_RESULT_PARAMS: [&str; 2] = ["resultaat-formaat", "resultaatFormaat"];
/// Query value that requests the unfiltered result.
const FULL_RESULT_VALUE: &str = "volledig";
/// Content type used when upstream did not send one.
const DEFAULT_CONTENT_TYPE: &str = "application/json";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Shared state read by every request handler.
pub struct GatewayState {
    /// Pipelines keyed by public path.
    pipelines: HashMap<String, ProxyPipeline>,
    /// Bearer token verifier.
    verifier: JwtVerifier,
    /// Locale of problem documents.
    locale: Locale,
    /// Request id source.
    request_ids: RequestIdGenerator,
    /// Maximum accepted request body size.
    max_body_bytes: usize,
}

impl GatewayState {
    /// Creates gateway state from prepared pipelines.
    #[must_use]
    pub fn new(
        pipelines: Vec<ProxyPipeline>,
        verifier: JwtVerifier,
        locale: Locale,
        max_body_bytes: usize,
    ) -> Self {
        let pipelines = pipelines
            .into_iter()
            .map(|pipeline| (pipeline.endpoint().public_path.clone(), pipeline))
            .collect();
        Self {
            pipelines,
            verifier,
            locale,
            request_ids: RequestIdGenerator::new(),
            max_body_bytes,
        }
    }

    /// Returns the served public paths, sorted.
    #[must_use]
    pub fn public_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.pipelines.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the gateway router.
#[must_use]
pub fn router(state: Arc<GatewayState>) -> Router {
    let mut app = Router::new().route(HEALTH_PATH, get(handle_health));
    for path in state.public_paths() {
        app = app.route(path, post(handle_proxy));
    }
    app.layer(DefaultBodyLimit::max(state.max_body_bytes)).with_state(state)
}

/// Answers health checks.
async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "UP"})))
}

/// Authenticates and proxies one endpoint request.
async fn handle_proxy(
    State(state): State<Arc<GatewayState>>,
    matched: MatchedPath,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = state.request_ids.issue();
    let path = matched.as_str();
    let response = match proxy(&state, path, &uri, &headers, &body).await {
        Ok(response) => success_response(response),
        Err(problem) => {
            debug!(
                request_id = %request_id,
                path,
                status = problem.status,
                code = %problem.code,
                "request rejected"
            );
            problem.with_instance(path).into_response()
        }
    };
    with_request_id(response, &request_id)
}

/// Runs the request through authentication, parsing, and the pipeline.
async fn proxy(
    state: &GatewayState,
    path: &str,
    uri: &Uri,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<ProxyResponse, Problem> {
    let locale = state.locale;
    let pipeline = state.pipelines.get(path).ok_or_else(|| Problem::internal(locale))?;
    let principal = state.verifier.authenticate(headers).map_err(|err| {
        debug!(path, error = %err, "authentication failed");
        Problem::from_auth(&err, locale)
    })?;
    let correlation_id = parse_correlation_id(header_text(headers, CORRELATION_HEADER))
        .map_err(|_| Problem::invalid_correlation(locale))?;
    let payload = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(payload)) => payload,
        _ => return Err(Problem::parse_error(locale)),
    };
    let request = ProxyRequest {
        payload,
        principal,
        correlation_id,
        task_description: task_description(header_text(headers, TASK_DESCRIPTION_HEADER)),
        full_result: wants_full_result(uri),
    };
    pipeline.handle(request).await.map_err(|err| Problem::from_pipeline(&err, locale))
}

/// Renders a pipeline response with the upstream content type.
fn success_response(response: ProxyResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
    let content_type = response
        .content_type
        .as_deref()
        .and_then(|value| HeaderValue::from_str(value).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    let mut response = (status, Json(response.body)).into_response();
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    response
}

/// Attaches the request id header.
fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

/// Returns a header value when it is valid visible text.
fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Returns true when the query asks for the unfiltered result.
fn wants_full_result(uri: &Uri) -> bool {
    let Some(query) = uri.query() else {
        return false;
    };
    url::form_urlencoded::parse(query.as_bytes()).any(|(key, value)| {
        FULL_RESULT_PARAMS.contains(&key.as_ref()) && value.eq_ignore_ascii_case(FULL_RESULT_VALUE)
    })
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Gateway server built from configuration.
pub struct GatewayServer {
    /// Socket address to listen on.
    addr: SocketAddr,
    /// Shared handler state.
    state: Arc<GatewayState>,
}

impl GatewayServer {
    /// Builds a new gateway server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration, catalogs, keys, the
    /// upstream client, the audit sink, or the token verifier fail to load.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let addr = config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let endpoints = build_endpoints(config).map_err(|err| ServerError::Config(err.to_string()))?;
        let cipher = Arc::new(
            config.tokenization.build_cipher().map_err(|err| ServerError::Config(err.to_string()))?,
        );
        let client: Arc<dyn UpstreamClient> = Arc::new(
            HaalCentraalClient::from_config(&config.upstream)
                .map_err(|err| ServerError::Init(err.to_string()))?,
        );
        let audit: Arc<dyn AuditSink> =
            build_audit_sink(&config.audit).map_err(|err| ServerError::Init(err.to_string()))?;
        let verifier =
            JwtVerifier::from_config(&config.auth).map_err(|err| ServerError::Init(err.to_string()))?;
        let locale = Locale::parse(&config.server.locale).unwrap_or_default();
        let pipelines = endpoints
            .into_iter()
            .map(|endpoint| {
                ProxyPipeline::new(
                    Arc::new(endpoint),
                    Arc::clone(&cipher),
                    Arc::clone(&client),
                    Arc::clone(&audit),
                )
            })
            .collect();
        if !config.audit.enabled {
            warn!("audit logging is disabled");
        }
        let state = GatewayState::new(pipelines, verifier, locale, config.server.max_body_bytes);
        Ok(Self {
            addr,
            state: Arc::new(state),
        })
    }

    /// Returns the configured listen address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serves requests until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        info!(
            addr = %self.addr,
            endpoints = %self.state.public_paths().join(", "),
            locale = self.state.locale.as_str(),
            "brp gateway listening"
        );
        axum::serve(listener, router(self.state))
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
