// crates/brp-gate-config/src/config.rs
// ============================================================================
// Module: BRP Gate Configuration
// Description: Configuration loading and validation for BRP Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: brp-gate-core, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed. Secrets (the upstream OAuth
//! client secret and the tokenization keys) are never required inline: each
//! can be read from an environment variable or a mounted file instead.
//! Security posture: config inputs are untrusted; see `Docs/security/threat_model.md`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use brp_gate_core::IdentifierCipher;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "brp-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "BRP_GATE_CONFIG";
/// Default environment variable holding comma-separated tokenization keys.
pub const DEFAULT_KEYS_ENV_VAR: &str = "BRP_GATE_ENCRYPTION_KEYS";
/// Default environment variable holding the upstream OAuth client secret.
pub const DEFAULT_CLIENT_SECRET_ENV_VAR: &str = "BRP_OAUTH_CLIENT_SECRET";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum size of a secret file in bytes.
pub(crate) const MAX_SECRET_FILE_SIZE: usize = 64 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum allowed request body size in bytes.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Maximum allowed upstream response size in bytes.
pub(crate) const MAX_RESPONSE_BYTES_LIMIT: usize = 64 * 1024 * 1024;
/// Minimum upstream connect timeout in milliseconds.
pub(crate) const MIN_CONNECT_TIMEOUT_MS: u64 = 100;
/// Maximum upstream connect timeout in milliseconds.
pub(crate) const MAX_CONNECT_TIMEOUT_MS: u64 = 30_000;
/// Minimum upstream request timeout in milliseconds.
pub(crate) const MIN_REQUEST_TIMEOUT_MS: u64 = 500;
/// Maximum upstream request timeout in milliseconds.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 120_000;
/// Maximum number of configured tokenization keys.
pub(crate) const MAX_TOKENIZATION_KEYS: usize = 16;
/// Maximum JWT clock leeway in seconds.
pub(crate) const MAX_LEEWAY_SECS: u64 = 300;
/// Supported JWT signature algorithms.
pub const SUPPORTED_JWT_ALGORITHMS: [&str; 9] =
    ["RS256", "RS384", "RS512", "PS256", "PS384", "PS512", "ES256", "ES384", "EdDSA"];
/// Supported response locales.
pub const SUPPORTED_LOCALES: [&str; 2] = ["nl", "en"];

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// BRP Gate configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Inbound bearer token verification.
    pub auth: AuthConfig,
    /// Upstream registry configuration.
    pub upstream: UpstreamConfig,
    /// Identifier tokenization keys.
    #[serde(default)]
    pub tokenization: TokenizationConfig,
    /// Field catalog location.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Audit record delivery.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Diagnostic logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GatewayConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        if config.catalog.dir.is_relative()
            && let Some(parent) = resolved.parent()
        {
            config.catalog.dir = parent.join(&config.catalog.dir);
        }
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.auth.validate()?;
        self.upstream.validate()?;
        self.tokenization.validate()?;
        self.catalog.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Externally visible base URL used when rewriting upstream links.
    #[serde(default)]
    pub public_base_url: String,
    /// Locale of problem responses (`nl` or `en`).
    #[serde(default = "default_locale")]
    pub locale: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            public_base_url: String::new(),
            locale: default_locale(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid server.bind: {}", self.bind)))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between 1 and {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        let base = self.public_base_url.trim();
        if !base.is_empty() && !base.starts_with('/') {
            validate_http_url("server.public_base_url", base, false)?;
        }
        if !SUPPORTED_LOCALES.contains(&self.locale.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "server.locale must be one of: {}",
                SUPPORTED_LOCALES.join(", ")
            )));
        }
        Ok(())
    }
}

/// Inbound bearer token verification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Path to a JWKS document.
    #[serde(default)]
    pub jwks_path: Option<PathBuf>,
    /// Inline JWKS document.
    #[serde(default)]
    pub jwks: Option<String>,
    /// Required `iss` claim.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Required `aud` claim.
    #[serde(default)]
    pub audience: Option<String>,
    /// Accepted signature algorithms.
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<String>,
    /// Claim holding the user identity; falls back to `sub`.
    #[serde(default = "default_user_claim")]
    pub user_claim: String,
    /// Claim holding the granted scopes.
    #[serde(default = "default_scope_claim")]
    pub scope_claim: String,
    /// Clock leeway in seconds.
    #[serde(default = "default_leeway_secs")]
    pub leeway_secs: u64,
}

impl AuthConfig {
    /// Reads the configured JWKS document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read.
    pub fn jwks_document(&self) -> Result<String, ConfigError> {
        match (&self.jwks, &self.jwks_path) {
            (Some(inline), None) => Ok(inline.clone()),
            (None, Some(path)) => read_secret_file(path),
            _ => Err(ConfigError::Invalid(
                "exactly one of auth.jwks or auth.jwks_path must be set".to_string(),
            )),
        }
    }

    /// Validates auth configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwks.is_some() == self.jwks_path.is_some() {
            return Err(ConfigError::Invalid(
                "exactly one of auth.jwks or auth.jwks_path must be set".to_string(),
            ));
        }
        if let Some(path) = &self.jwks_path {
            validate_path_string("auth.jwks_path", &path.to_string_lossy())?;
        }
        if self.algorithms.is_empty() {
            return Err(ConfigError::Invalid("auth.algorithms must be non-empty".to_string()));
        }
        for algorithm in &self.algorithms {
            if !SUPPORTED_JWT_ALGORITHMS.contains(&algorithm.as_str()) {
                return Err(ConfigError::Invalid(format!("unsupported auth algorithm: {algorithm}")));
            }
        }
        if self.user_claim.trim().is_empty() || self.scope_claim.trim().is_empty() {
            return Err(ConfigError::Invalid("auth claim names must be non-empty".to_string()));
        }
        if self.leeway_secs > MAX_LEEWAY_SECS {
            return Err(ConfigError::Invalid(format!(
                "auth.leeway_secs must be at most {MAX_LEEWAY_SECS}"
            )));
        }
        Ok(())
    }
}

/// Upstream registry settings.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the BRP APIs.
    pub base_url: String,
    /// Override of the personen endpoint URL.
    #[serde(default)]
    pub personen_url: Option<String>,
    /// Override of the bewoningen endpoint URL.
    #[serde(default)]
    pub bewoningen_url: Option<String>,
    /// Override of the verblijfplaatshistorie endpoint URL.
    #[serde(default)]
    pub verblijfplaatshistorie_url: Option<String>,
    /// Override of the reisdocumenten endpoint URL.
    #[serde(default)]
    pub reisdocumenten_url: Option<String>,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Maximum upstream response body size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Allow `http://` upstream URLs (local development only).
    #[serde(default)]
    pub allow_http: bool,
    /// Mutual TLS client identity.
    #[serde(default)]
    pub mtls: Option<MtlsConfig>,
    /// OAuth client-credentials settings.
    #[serde(default)]
    pub oauth: Option<OAuthConfig>,
}

impl UpstreamConfig {
    /// Returns the upstream URL of a service.
    #[must_use]
    pub fn endpoint_url(&self, service: &str) -> String {
        let explicit = match service {
            "personen" => self.personen_url.as_ref(),
            "bewoningen" => self.bewoningen_url.as_ref(),
            "verblijfplaatshistorie" => self.verblijfplaatshistorie_url.as_ref(),
            "reisdocumenten" => self.reisdocumenten_url.as_ref(),
            _ => None,
        };
        explicit.cloned().unwrap_or_else(|| {
            let suffix = match service {
                "bewoningen" => "bewoning/bewoningen",
                other => other,
            };
            format!("{}/{suffix}", self.base_url.trim_end_matches('/'))
        })
    }

    /// Validates upstream configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url("upstream.base_url", &self.base_url, self.allow_http)?;
        let overrides = [
            ("upstream.personen_url", &self.personen_url),
            ("upstream.bewoningen_url", &self.bewoningen_url),
            ("upstream.verblijfplaatshistorie_url", &self.verblijfplaatshistorie_url),
            ("upstream.reisdocumenten_url", &self.reisdocumenten_url),
        ];
        for (field, value) in overrides {
            if let Some(value) = value {
                validate_http_url(field, value, self.allow_http)?;
            }
        }
        if !(MIN_CONNECT_TIMEOUT_MS..=MAX_CONNECT_TIMEOUT_MS).contains(&self.connect_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "upstream.connect_timeout_ms must be between {MIN_CONNECT_TIMEOUT_MS} and \
                 {MAX_CONNECT_TIMEOUT_MS}"
            )));
        }
        if !(MIN_REQUEST_TIMEOUT_MS..=MAX_REQUEST_TIMEOUT_MS).contains(&self.request_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "upstream.request_timeout_ms must be between {MIN_REQUEST_TIMEOUT_MS} and \
                 {MAX_REQUEST_TIMEOUT_MS}"
            )));
        }
        if self.max_response_bytes == 0 || self.max_response_bytes > MAX_RESPONSE_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "upstream.max_response_bytes must be between 1 and {MAX_RESPONSE_BYTES_LIMIT}"
            )));
        }
        if let Some(mtls) = &self.mtls {
            validate_path_string("upstream.mtls.cert_path", &mtls.cert_path.to_string_lossy())?;
            validate_path_string("upstream.mtls.key_path", &mtls.key_path.to_string_lossy())?;
        }
        if let Some(oauth) = &self.oauth {
            oauth.validate(self.allow_http)?;
        }
        Ok(())
    }
}

/// Mutual TLS client identity.
#[derive(Debug, Clone, Deserialize)]
pub struct MtlsConfig {
    /// PEM certificate chain.
    pub cert_path: PathBuf,
    /// PEM private key.
    pub key_path: PathBuf,
}

/// OAuth client-credentials settings for the upstream token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    /// Token endpoint URL.
    pub token_url: String,
    /// Client identifier.
    pub client_id: String,
    /// Requested scope.
    #[serde(default)]
    pub scope: Option<String>,
    /// Environment variable holding the client secret.
    #[serde(default = "default_client_secret_env")]
    pub client_secret_env: String,
    /// File holding the client secret; takes precedence over the variable.
    #[serde(default)]
    pub client_secret_path: Option<PathBuf>,
}

impl OAuthConfig {
    /// Resolves the client secret from its file or environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when no non-empty secret is available.
    pub fn client_secret(&self) -> Result<String, ConfigError> {
        let secret = match &self.client_secret_path {
            Some(path) => read_secret_file(path)?,
            None => env::var(&self.client_secret_env).map_err(|_| {
                ConfigError::Invalid(format!("{} is not set", self.client_secret_env))
            })?,
        };
        let secret = secret.trim().to_string();
        if secret.is_empty() {
            return Err(ConfigError::Invalid("upstream oauth client secret is empty".to_string()));
        }
        Ok(secret)
    }

    /// Validates OAuth configuration.
    fn validate(&self, allow_http: bool) -> Result<(), ConfigError> {
        validate_http_url("upstream.oauth.token_url", &self.token_url, allow_http)?;
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Invalid("upstream.oauth.client_id must be set".to_string()));
        }
        if let Some(path) = &self.client_secret_path {
            validate_path_string("upstream.oauth.client_secret_path", &path.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Tokenization key sources, current key first.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenizationConfig {
    /// Inline keys (development only).
    #[serde(default)]
    pub keys: Vec<String>,
    /// Environment variable holding comma-separated keys.
    #[serde(default = "default_keys_env")]
    pub keys_env: String,
    /// File holding comma-separated keys.
    #[serde(default)]
    pub keys_path: Option<PathBuf>,
}

impl Default for TokenizationConfig {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            keys_env: default_keys_env(),
            keys_path: None,
        }
    }
}

impl TokenizationConfig {
    /// Resolves the encoded keys: inline, then file, then environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when no keys are available.
    pub fn resolve_keys(&self) -> Result<Vec<String>, ConfigError> {
        let keys = if !self.keys.is_empty() {
            self.keys.clone()
        } else if let Some(path) = &self.keys_path {
            split_keys(&read_secret_file(path)?)
        } else {
            let value = env::var(&self.keys_env)
                .map_err(|_| ConfigError::Invalid(format!("{} is not set", self.keys_env)))?;
            split_keys(&value)
        };
        if keys.is_empty() {
            return Err(ConfigError::Invalid("no tokenization keys configured".to_string()));
        }
        if keys.len() > MAX_TOKENIZATION_KEYS {
            return Err(ConfigError::Invalid(format!(
                "at most {MAX_TOKENIZATION_KEYS} tokenization keys are supported"
            )));
        }
        Ok(keys)
    }

    /// Builds the identifier cipher from the resolved keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when keys are missing or malformed.
    pub fn build_cipher(&self) -> Result<IdentifierCipher, ConfigError> {
        let keys = self.resolve_keys()?;
        IdentifierCipher::from_encoded(&keys)
            .map_err(|err| ConfigError::Invalid(format!("tokenization keys: {err}")))
    }

    /// Validates tokenization configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.keys.len() > MAX_TOKENIZATION_KEYS {
            return Err(ConfigError::Invalid(format!(
                "at most {MAX_TOKENIZATION_KEYS} tokenization keys are supported"
            )));
        }
        if !self.keys.is_empty() && self.keys_path.is_some() {
            return Err(ConfigError::Invalid(
                "tokenization.keys and tokenization.keys_path are mutually exclusive".to_string(),
            ));
        }
        if self.keys_env.trim().is_empty() {
            return Err(ConfigError::Invalid("tokenization.keys_env must be non-empty".to_string()));
        }
        if let Some(path) = &self.keys_path {
            validate_path_string("tokenization.keys_path", &path.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Field catalog location.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Directory holding `dataset_fields/`, `fields/`, and `schemas/`.
    #[serde(default = "default_catalog_dir")]
    pub dir: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            dir: default_catalog_dir(),
        }
    }
}

impl CatalogConfig {
    /// Validates catalog configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("catalog.dir", &self.dir.to_string_lossy())
    }
}

/// Audit record delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Whether audit records are written.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// JSON Lines file; stderr when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", &path.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Diagnostic log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable output.
    Pretty,
}

/// Diagnostic logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            filter: default_log_filter(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Invalid field catalog or response shape.
    #[error("invalid catalog: {0}")]
    Catalog(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
pub(crate) fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an absolute http(s) URL.
fn validate_http_url(field: &str, value: &str, allow_http: bool) -> Result<(), ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|err| ConfigError::Invalid(format!("{field} is not a valid url: {err}")))?;
    match url.scheme() {
        "https" => Ok(()),
        "http" if allow_http => Ok(()),
        "http" => Err(ConfigError::Invalid(format!("{field} uses http:// without allow_http"))),
        other => Err(ConfigError::Invalid(format!("{field} has unsupported scheme {other}"))),
    }
}

/// Reads a small secret file.
pub(crate) fn read_secret_file(path: &Path) -> Result<String, ConfigError> {
    let bytes = fs::read(path)
        .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
    if bytes.len() > MAX_SECRET_FILE_SIZE {
        return Err(ConfigError::Invalid(format!("{} exceeds size limit", path.display())));
    }
    String::from_utf8(bytes)
        .map_err(|_| ConfigError::Invalid(format!("{} must be utf-8", path.display())))
}

/// Splits a comma-separated key list, dropping empty entries.
fn split_keys(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|key| !key.is_empty()).map(str::to_string).collect()
}

/// Default bind address.
fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

/// Default maximum request body size in bytes.
pub(crate) const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default locale.
fn default_locale() -> String {
    "nl".to_string()
}

/// Default JWT algorithms.
fn default_algorithms() -> Vec<String> {
    vec!["RS256".to_string()]
}

/// Default user claim.
fn default_user_claim() -> String {
    "email".to_string()
}

/// Default scope claim.
fn default_scope_claim() -> String {
    "roles".to_string()
}

/// Default JWT leeway in seconds.
const fn default_leeway_secs() -> u64 {
    30
}

/// Default upstream connect timeout.
const fn default_connect_timeout_ms() -> u64 {
    2_000
}

/// Default upstream request timeout.
const fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Default upstream response size limit.
const fn default_max_response_bytes() -> usize {
    10 * 1024 * 1024
}

/// Default client secret variable.
fn default_client_secret_env() -> String {
    DEFAULT_CLIENT_SECRET_ENV_VAR.to_string()
}

/// Default key variable.
fn default_keys_env() -> String {
    DEFAULT_KEYS_ENV_VAR.to_string()
}

/// Default catalog directory.
fn default_catalog_dir() -> PathBuf {
    PathBuf::from("config")
}

/// Audit is on unless disabled.
const fn default_audit_enabled() -> bool {
    true
}

/// Default log filter.
fn default_log_filter() -> String {
    "info".to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
