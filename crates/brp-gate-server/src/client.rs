// crates/brp-gate-server/src/client.rs
// ============================================================================
// Module: Haal Centraal Upstream Client
// Description: Authenticated HTTPS client for the upstream BRP registry.
// Purpose: Forward shaped requests with mTLS and OAuth client credentials.
// Dependencies: async-trait, brp-gate-config, brp-gate-core, reqwest, tokio, url
// ============================================================================

//! ## Overview
//! [`HaalCentraalClient`] posts JSON requests to the upstream registry. The
//! connection optionally presents a client certificate, and every request
//! optionally carries an OAuth2 access token obtained with the client
//! credentials grant. Tokens are cached until shortly before they expire.
//! Redirects are never followed and response bodies are read under a hard
//! size limit.
//!
//! Security posture: upstream responses are untrusted until parsed; see
//! `Docs/security/threat_model.md`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use brp_gate_config::OAuthConfig;
use brp_gate_config::UpstreamConfig;
use brp_gate_core::UpstreamClient;
use brp_gate_core::UpstreamError;
use brp_gate_core::UpstreamResponse;
use reqwest::Client;
use reqwest::Identity;
use reqwest::Response;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderValue;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);
/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 300;
/// Maximum size of a token endpoint response.
const MAX_TOKEN_RESPONSE_BYTES: usize = 64 * 1024;
/// Media type sent and accepted on upstream calls.
const JSON_MEDIA_TYPE: &str = "application/json";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building the upstream client.
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// The client certificate or key could not be loaded.
    #[error("upstream mtls identity error: {0}")]
    Identity(String),
    /// The OAuth client secret could not be resolved.
    #[error("upstream oauth error: {0}")]
    OAuth(String),
    /// The HTTP client could not be constructed.
    #[error("upstream client error: {0}")]
    Client(String),
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// OAuth2 client credentials and the cached access token.
struct TokenSource {
    /// Token endpoint URL.
    token_url: String,
    /// OAuth client identifier.
    client_id: String,
    /// OAuth client secret.
    client_secret: String,
    /// Requested scope, when configured.
    scope: Option<String>,
    /// Cached token and its refresh deadline.
    cached: Mutex<Option<CachedToken>>,
}

/// Access token with the instant it must be refreshed.
struct CachedToken {
    /// Bearer token value.
    access_token: String,
    /// Refresh deadline.
    refresh_at: Instant,
}

/// Token endpoint response body.
#[derive(Deserialize)]
struct TokenResponse {
    /// Issued access token.
    access_token: String,
    /// Token lifetime in seconds.
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Upstream client for the Haal Centraal APIs.
pub struct HaalCentraalClient {
    /// Shared HTTP client.
    client: Client,
    /// OAuth token source, when configured.
    tokens: Option<TokenSource>,
    /// Maximum accepted response body size.
    max_response_bytes: usize,
}

impl HaalCentraalClient {
    /// Builds the client from upstream configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when the mTLS identity or OAuth secret
    /// cannot be loaded or the HTTP client cannot be built.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, ClientBuildError> {
        let mut builder = Client::builder()
            .redirect(Policy::none())
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms));
        if let Some(mtls) = &config.mtls {
            let mut pem = fs::read(&mtls.cert_path).map_err(|err| {
                ClientBuildError::Identity(format!("{}: {err}", mtls.cert_path.display()))
            })?;
            let key = fs::read(&mtls.key_path).map_err(|err| {
                ClientBuildError::Identity(format!("{}: {err}", mtls.key_path.display()))
            })?;
            pem.push(b'\n');
            pem.extend_from_slice(&key);
            let identity = Identity::from_pem(&pem)
                .map_err(|err| ClientBuildError::Identity(err.to_string()))?;
            builder = builder.identity(identity);
        }
        let client = builder.build().map_err(|err| ClientBuildError::Client(err.to_string()))?;
        let tokens = config.oauth.as_ref().map(TokenSource::from_config).transpose()?;
        Ok(Self {
            client,
            tokens,
            max_response_bytes: config.max_response_bytes,
        })
    }

    /// Returns the bearer header for the next call, refreshing when needed.
    async fn authorization(&self) -> Result<Option<HeaderValue>, UpstreamError> {
        let Some(tokens) = &self.tokens else {
            return Ok(None);
        };
        let token = tokens.access_token(&self.client).await?;
        HeaderValue::from_str(&format!("Bearer {token}"))
            .map(Some)
            .map_err(|_| UpstreamError::InvalidResponse("invalid access token".to_string()))
    }
}

#[async_trait]
impl UpstreamClient for HaalCentraalClient {
    async fn call(
        &self,
        endpoint_url: &str,
        payload: &Value,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let mut request = self
            .client
            .post(endpoint_url)
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .json(payload);
        if let Some(authorization) = self.authorization().await? {
            request = request.header(AUTHORIZATION, authorization);
        }
        let mut response = request.send().await.map_err(map_transport_error)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = read_response_limited(&mut response, self.max_response_bytes).await?;
        if !response.status().is_success() {
            let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            return Err(UpstreamError::Status {
                status,
                body,
            });
        }
        let body = serde_json::from_slice(&bytes).map_err(|_| {
            UpstreamError::InvalidResponse("upstream response is not valid JSON".to_string())
        })?;
        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

impl TokenSource {
    /// Builds a token source, resolving the client secret once.
    fn from_config(config: &OAuthConfig) -> Result<Self, ClientBuildError> {
        let client_secret =
            config.client_secret().map_err(|err| ClientBuildError::OAuth(err.to_string()))?;
        Ok(Self {
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret,
            scope: config.scope.clone(),
            cached: Mutex::new(None),
        })
    }

    /// Returns a valid access token, fetching a new one when the cache is stale.
    async fn access_token(&self, client: &Client) -> Result<String, UpstreamError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.access_token.clone());
        }
        let fresh = self.fetch(client).await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        drop(cached);
        tracing::debug!(token_url = %self.token_url, "refreshed upstream access token");
        Ok(access_token)
    }

    /// Requests a new token with the client credentials grant.
    async fn fetch(&self, client: &Client) -> Result<CachedToken, UpstreamError> {
        let form_body = {
            let mut form = url::form_urlencoded::Serializer::new(String::new());
            form.append_pair("grant_type", "client_credentials");
            form.append_pair("client_id", &self.client_id);
            form.append_pair("client_secret", &self.client_secret);
            if let Some(scope) = &self.scope {
                form.append_pair("scope", scope);
            }
            form.finish()
        };
        let mut response = client
            .post(&self.token_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .body(form_body)
            .send()
            .await
            .map_err(map_transport_error)?;
        let bytes = read_response_limited(&mut response, MAX_TOKEN_RESPONSE_BYTES).await?;
        if !response.status().is_success() {
            return Err(UpstreamError::Transport(format!(
                "token endpoint returned status {}",
                response.status().as_u16()
            )));
        }
        let token: TokenResponse = serde_json::from_slice(&bytes).map_err(|_| {
            UpstreamError::InvalidResponse("token endpoint response is not valid".to_string())
        })?;
        if token.access_token.trim().is_empty() {
            return Err(UpstreamError::InvalidResponse("token endpoint returned no token".to_string()));
        }
        let lifetime =
            Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS));
        let now = Instant::now();
        let refresh_at = now
            .checked_add(lifetime.saturating_sub(TOKEN_REFRESH_MARGIN))
            .unwrap_or(now);
        Ok(CachedToken {
            access_token: token.access_token,
            refresh_at,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a reqwest send error to an upstream error.
fn map_transport_error(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout(err.to_string())
    } else {
        UpstreamError::Transport(err.to_string())
    }
}

/// Reads a response body while enforcing a size limit.
async fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, UpstreamError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| UpstreamError::InvalidResponse("size limit exceeds u64".to_string()))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(UpstreamError::InvalidResponse("upstream response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(map_transport_error)? {
        if buf.len().saturating_add(chunk.len()) > max_bytes {
            return Err(UpstreamError::InvalidResponse(
                "upstream response exceeds size limit".to_string(),
            ));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}
