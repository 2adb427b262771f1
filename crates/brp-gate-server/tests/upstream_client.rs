// crates/brp-gate-server/tests/upstream_client.rs
// ============================================================================
// Module: Upstream Client Tests
// Description: Haal Centraal client behavior against a local HTTP server.
// Purpose: Validate status mapping, size limits, redirects, and OAuth caching.
// Dependencies: brp-gate-server, tiny_http
// ============================================================================

//! ## Overview
//! Runs the real reqwest-backed client against `tiny_http` servers on
//! loopback. Each server answers a fixed list of replies and reports what it
//! received over a channel.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions use unwrap/expect and Debug output for clarity."
)]

use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use brp_gate_config::OAuthConfig;
use brp_gate_config::UpstreamConfig;
use brp_gate_core::UpstreamClient;
use brp_gate_core::UpstreamError;
use brp_gate_server::HaalCentraalClient;
use serde_json::Value;
use serde_json::json;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Test Server
// ============================================================================

/// Canned reply served by the test server.
struct Reply {
    /// HTTP status code.
    status: u16,
    /// Extra response headers.
    headers: Vec<(&'static str, String)>,
    /// Response body.
    body: String,
}

impl Reply {
    /// JSON reply with `status`.
    fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            headers: vec![("Content-Type", "application/json".to_string())],
            body: body.to_string(),
        }
    }
}

/// Request observed by the test server.
struct Captured {
    /// Request path.
    url: String,
    /// Authorization header value.
    authorization: Option<String>,
    /// Accept header value.
    accept: Option<String>,
    /// Request body.
    body: String,
}

/// Starts a server answering `replies` in order; returns its base URL.
fn serve(replies: Vec<Reply>) -> (String, mpsc::Receiver<Captured>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for reply in replies {
            let Ok(mut request) = server.recv() else {
                return;
            };
            let header = |name: &'static str| {
                request
                    .headers()
                    .iter()
                    .find(|header| header.field.equiv(name))
                    .map(|header| header.value.as_str().to_string())
            };
            let authorization = header("Authorization");
            let accept = header("Accept");
            let mut body = String::new();
            let _ = request.as_reader().read_to_string(&mut body);
            let _ = tx.send(Captured {
                url: request.url().to_string(),
                authorization,
                accept,
                body,
            });
            let mut response = Response::from_string(reply.body).with_status_code(reply.status);
            for (name, value) in reply.headers {
                response =
                    response.with_header(Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap());
            }
            let _ = request.respond(response);
        }
    });
    (format!("http://{addr}"), rx)
}

/// Returns upstream settings for a local server.
fn upstream_config(base_url: &str) -> UpstreamConfig {
    UpstreamConfig {
        base_url: base_url.to_string(),
        personen_url: None,
        bewoningen_url: None,
        verblijfplaatshistorie_url: None,
        reisdocumenten_url: None,
        connect_timeout_ms: 1_000,
        request_timeout_ms: 5_000,
        max_response_bytes: 64 * 1024,
        allow_http: true,
        mtls: None,
        oauth: None,
    }
}

/// Writes an OAuth client secret file.
fn secret_file(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("client-secret");
    std::fs::write(&path, "s3cret\n").unwrap();
    path
}

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Verifies a JSON answer is parsed and the request is posted as JSON.
#[tokio::test]
async fn posts_json_and_parses_response() {
    let answer = json!({"type": "ZoekMetPostcodeEnHuisnummer", "personen": []});
    let (base, rx) = serve(vec![Reply::json(200, &answer)]);
    let client = HaalCentraalClient::from_config(&upstream_config(&base)).unwrap();
    let payload = json!({"type": "ZoekMetPostcodeEnHuisnummer", "postcode": "1074VE"});

    let response = client.call(&format!("{base}/personen"), &payload).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, answer);
    assert_eq!(response.content_type.as_deref(), Some("application/json"));

    let captured = rx.recv().unwrap();
    assert_eq!(captured.url, "/personen");
    assert_eq!(captured.accept.as_deref(), Some("application/json"));
    assert!(captured.authorization.is_none());
    assert_eq!(serde_json::from_str::<Value>(&captured.body).unwrap(), payload);
}

/// Verifies non-2xx answers carry their status and parsed body.
#[tokio::test]
async fn error_status_returns_status_and_body() {
    let problem = json!({"title": "Opgevraagde resource bestaat niet.", "status": 404});
    let (base, _rx) = serve(vec![Reply::json(404, &problem)]);
    let client = HaalCentraalClient::from_config(&upstream_config(&base)).unwrap();

    let err = client.call(&format!("{base}/personen"), &json!({})).await.unwrap_err();
    assert_eq!(
        err,
        UpstreamError::Status {
            status: 404,
            body: problem,
        }
    );
}

/// Verifies a successful answer that is not JSON is rejected.
#[tokio::test]
async fn non_json_success_is_invalid_response() {
    let (base, _rx) = serve(vec![Reply {
        status: 200,
        headers: vec![("Content-Type", "text/html".to_string())],
        body: "<html></html>".to_string(),
    }]);
    let client = HaalCentraalClient::from_config(&upstream_config(&base)).unwrap();
    let err = client.call(&format!("{base}/personen"), &json!({})).await.unwrap_err();
    assert!(matches!(err, UpstreamError::InvalidResponse(_)), "{err:?}");
}

/// Verifies responses over the size limit are rejected.
#[tokio::test]
async fn oversized_response_is_rejected() {
    let large = json!({"personen": ["x".repeat(4096)]});
    let (base, _rx) = serve(vec![Reply::json(200, &large)]);
    let mut config = upstream_config(&base);
    config.max_response_bytes = 1024;
    let client = HaalCentraalClient::from_config(&config).unwrap();
    let err = client.call(&format!("{base}/personen"), &json!({})).await.unwrap_err();
    assert!(matches!(err, UpstreamError::InvalidResponse(_)), "{err:?}");
}

/// Verifies redirects are reported instead of followed.
#[tokio::test]
async fn redirects_are_not_followed() {
    let (base, rx) = serve(vec![
        Reply {
            status: 302,
            headers: vec![("Location", "/elders".to_string())],
            body: String::new(),
        },
        Reply::json(200, &json!({})),
    ]);
    let client = HaalCentraalClient::from_config(&upstream_config(&base)).unwrap();
    let err = client.call(&format!("{base}/personen"), &json!({})).await.unwrap_err();
    assert_eq!(
        err,
        UpstreamError::Status {
            status: 302,
            body: Value::Null,
        }
    );
    assert_eq!(rx.recv().unwrap().url, "/personen");
    assert!(rx.try_recv().is_err());
}

/// Verifies connection failures are transport errors.
#[tokio::test]
async fn refused_connection_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let base = format!("http://{addr}");
    let client = HaalCentraalClient::from_config(&upstream_config(&base)).unwrap();
    let err = client.call(&format!("{base}/personen"), &json!({})).await.unwrap_err();
    assert!(matches!(err, UpstreamError::Transport(_)), "{err:?}");
}

/// Verifies the OAuth token is fetched once and reused.
#[tokio::test]
async fn oauth_token_is_fetched_once_and_cached() {
    let (base, rx) = serve(vec![
        Reply::json(200, &json!({"access_token": "token-1", "expires_in": 3600, "token_type": "Bearer"})),
        Reply::json(200, &json!({"personen": []})),
        Reply::json(200, &json!({"personen": []})),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let mut config = upstream_config(&base);
    config.oauth = Some(OAuthConfig {
        token_url: format!("{base}/token"),
        client_id: "brp-gate".to_string(),
        scope: Some("api://haalcentraal/.default".to_string()),
        client_secret_env: "BRP_GATE_TEST_UNUSED_SECRET".to_string(),
        client_secret_path: Some(secret_file(&dir)),
    });
    let client = HaalCentraalClient::from_config(&config).unwrap();

    client.call(&format!("{base}/personen"), &json!({})).await.unwrap();
    client.call(&format!("{base}/personen"), &json!({})).await.unwrap();

    let token_request = rx.recv().unwrap();
    assert_eq!(token_request.url, "/token");
    assert!(token_request.body.contains("grant_type=client_credentials"));
    assert!(token_request.body.contains("client_id=brp-gate"));
    assert!(token_request.body.contains("client_secret=s3cret"));
    assert!(token_request.body.contains("scope=api%3A%2F%2Fhaalcentraal%2F.default"));
    for _ in 0..2 {
        let call = rx.recv().unwrap();
        assert_eq!(call.url, "/personen");
        assert_eq!(call.authorization.as_deref(), Some("Bearer token-1"));
    }
}
