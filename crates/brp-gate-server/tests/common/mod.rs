// crates/brp-gate-server/tests/common/mod.rs
// ============================================================================
// Module: Common Server Test Fixtures
// Description: Shared fixtures for gateway HTTP tests.
// Purpose: Mint tokens, build routers over the shipped catalog, drive requests.
// Dependencies: brp-gate-config, brp-gate-core, brp-gate-server, jsonwebtoken
// ============================================================================

//! ## Overview
//! Routers are built from a generated config file that points at the
//! repository's `config/` catalog, so HTTP tests run against the same field
//! lists and schemas a deployment ships with. Tokens are signed with the RSA
//! fixture key whose public half is in `fixtures/test_jwks.json`.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test fixtures use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::HeaderMap;
use axum::http::Request;
use axum::http::StatusCode;
use brp_gate_config::AuthConfig;
use brp_gate_config::GatewayConfig;
use brp_gate_config::build_endpoints;
use brp_gate_core::AuditRecord;
use brp_gate_core::AuditSink;
use brp_gate_core::ProxyPipeline;
use brp_gate_core::UpstreamClient;
use brp_gate_core::UpstreamError;
use brp_gate_core::UpstreamResponse;
use brp_gate_core::runtime::encode_key;
use brp_gate_server::GatewayState;
use brp_gate_server::JwtVerifier;
use brp_gate_server::Locale;
use brp_gate_server::router;
use http_body_util::BodyExt;
use jsonwebtoken::Algorithm;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use serde_json::Value;
use serde_json::json;
use tower::ServiceExt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Issuer expected by the test verifier.
pub const ISSUER: &str = "https://login.example/tenant/v2.0";

/// Audience expected by the test verifier.
pub const AUDIENCE: &str = "api://brp-gate";

/// Key id of the fixture signing key.
pub const KID: &str = "test-kid";

/// User identity placed in minted tokens.
pub const USER: &str = "medewerker@example.nl";

/// Base scope of every BRP endpoint.
pub const SCOPE_BASE: &str = "benk-brp-api";

/// Scope of the postcode search.
pub const SCOPE_POSTCODE: &str = "benk-brp-zoekvraag-postcode-huisnummer";

/// Dataset granting names and identifiers.
pub const DATASET_1: &str = "benk-brp-gegevensset-1";

/// Public path of the personen endpoint.
pub const PERSONEN_PATH: &str = "/api/brp/personen";

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Returns the path of a file under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

/// Returns the repository's shipped catalog directory.
pub fn catalog_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("..").join("config")
}

/// Returns the fixture JWKS document.
pub fn jwks_document() -> String {
    fs::read_to_string(fixture("test_jwks.json")).unwrap()
}

/// Returns auth settings trusting the fixture key.
pub fn auth_config() -> AuthConfig {
    AuthConfig {
        jwks_path: None,
        jwks: Some(jwks_document()),
        issuer: Some(ISSUER.to_string()),
        audience: Some(AUDIENCE.to_string()),
        algorithms: vec!["RS256".to_string()],
        user_claim: "email".to_string(),
        scope_claim: "roles".to_string(),
        leeway_secs: 30,
    }
}

/// Writes a gateway config file under `dir` and loads it.
pub fn gateway_config(dir: &std::path::Path, upstream_base: &str) -> GatewayConfig {
    let path = dir.join("brp-gate.toml");
    let content = format!(
        r#"
[server]
bind = "127.0.0.1:0"
public_base_url = "https://gateway.example"

[auth]
jwks_path = '{jwks}'
issuer = "{ISSUER}"
audience = "{AUDIENCE}"

[upstream]
base_url = "{upstream_base}"
allow_http = true
connect_timeout_ms = 1000
request_timeout_ms = 2000

[tokenization]
keys = ["{key}"]

[catalog]
dir = '{catalog}'

[audit]
enabled = false
"#,
        jwks = fixture("test_jwks.json").display(),
        key = encode_key(&[7_u8; 32]),
        catalog = catalog_dir().display(),
    );
    fs::write(&path, content).unwrap();
    GatewayConfig::load(Some(&path)).unwrap()
}

// ============================================================================
// SECTION: Tokens
// ============================================================================

/// Returns the current UNIX time in seconds.
pub fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

/// Signs `claims` with the fixture key.
pub fn mint_token(claims: &Value) -> String {
    let pem = fs::read(fixture("test_rsa_private.pem")).unwrap();
    let key = EncodingKey::from_rsa_pem(&pem).unwrap();
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KID.to_string());
    jsonwebtoken::encode(&header, claims, &key).unwrap()
}

/// Returns valid claims granting `scopes`.
pub fn claims_for(scopes: &[&str]) -> Value {
    json!({
        "iss": ISSUER,
        "aud": AUDIENCE,
        "exp": now_secs() + 600,
        "iat": now_secs(),
        "sub": "subject-1",
        "email": USER,
        "roles": scopes,
    })
}

/// Returns a valid token granting `scopes`.
pub fn token_for(scopes: &[&str]) -> String {
    mint_token(&claims_for(scopes))
}

// ============================================================================
// SECTION: Stub Upstream
// ============================================================================

/// Upstream client returning a canned result and recording every call.
pub struct StubUpstream {
    /// Canned result for every call.
    result: Result<UpstreamResponse, UpstreamError>,
    /// Recorded `(url, payload)` pairs.
    calls: Mutex<Vec<(String, Value)>>,
}

impl StubUpstream {
    /// Creates a stub answering 200 with `body`.
    pub fn ok(body: Value) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(UpstreamResponse {
                status: 200,
                content_type: Some("application/json; charset=utf-8".to_string()),
                body,
            }),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Creates a stub failing with `error`.
    pub fn failing(error: UpstreamError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(error),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Returns the recorded calls.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamClient for StubUpstream {
    async fn call(&self, endpoint_url: &str, payload: &Value) -> Result<UpstreamResponse, UpstreamError> {
        self.calls.lock().unwrap().push((endpoint_url.to_string(), payload.clone()));
        self.result.clone()
    }
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Audit sink keeping records in memory.
#[derive(Default)]
pub struct MemoryAudit {
    /// Recorded audit records.
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAudit {
    /// Creates an empty sink.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns the recorded audit records.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, record: &AuditRecord) {
        self.records.lock().unwrap().push(record.clone());
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds a gateway router over the shipped catalog with a stub upstream.
pub fn gateway(upstream: Arc<StubUpstream>, audit: Arc<MemoryAudit>, locale: Locale) -> Router {
    let dir = tempfile::tempdir().unwrap();
    let config = gateway_config(dir.path(), "https://hc.example/haalcentraal/api/brp");
    let cipher = Arc::new(config.tokenization.build_cipher().unwrap());
    let pipelines = build_endpoints(&config)
        .unwrap()
        .into_iter()
        .map(|endpoint| {
            ProxyPipeline::new(
                Arc::new(endpoint),
                Arc::clone(&cipher),
                Arc::clone(&upstream) as Arc<dyn UpstreamClient>,
                Arc::clone(&audit) as Arc<dyn AuditSink>,
            )
        })
        .collect();
    let verifier = JwtVerifier::from_config(&auth_config()).unwrap();
    router(Arc::new(GatewayState::new(pipelines, verifier, locale, 64 * 1024)))
}

/// Response captured from a router call.
pub struct TestResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Parsed JSON body, `null` when empty or not JSON.
    pub body: Value,
}

impl TestResponse {
    /// Returns a header as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Sends `request` through `app` and captures the response.
pub async fn send(app: Router, request: Request<Body>) -> TestResponse {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    TestResponse {
        status,
        headers,
        body,
    }
}

/// Builds a POST request with an optional bearer token and extra headers.
pub fn post(uri: &str, token: Option<&str>, body: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri).header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}
