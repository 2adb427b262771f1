// crates/brp-gate-core/src/runtime/pipeline.rs
// ============================================================================
// Module: BRP Gate Proxy Pipeline
// Description: Per-request orchestration of policy, upstream call, and transforms.
// Purpose: Provide the single code path every proxied endpoint runs through.
// Dependencies: crate::{core, interfaces}, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`ProxyPipeline`] binds one [`EndpointConfig`] to the shared cipher,
//! upstream client, and audit sink. [`ProxyPipeline::handle`] runs:
//! variant selection, augmentation, default fields, validation, input
//! detokenization, identifier insertion, the upstream call, and the response
//! stages (links, completion, confidentiality, stripping, tokenization).
//! Every denial, upstream failure, and success produces one audit record.
//!
//! Security posture: callers only learn that access was denied; the cause
//! and missing scopes go to the audit sink. See
//! `Docs/security/threat_model.md`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::core::audit::AuditOutcome;
use crate::core::audit::AuditRecord;
use crate::core::audit::AuditRecordParams;
use crate::core::audit::RetrievedIdentifiers;
use crate::core::endpoint::EndpointConfig;
use crate::core::endpoint::EndpointVariant;
use crate::core::fields::group_dotted_names;
use crate::core::identifiers::CorrelationId;
use crate::core::identifiers::UserId;
use crate::core::policy::PolicyError;
use crate::core::policy::RequiredScopes;
use crate::core::policy::ScopeSet;
use crate::interfaces::AuditSink;
use crate::interfaces::UpstreamClient;
use crate::interfaces::UpstreamError;
use crate::runtime::request::FieldResolution;
use crate::runtime::request::detokenize_parameters;
use crate::runtime::request::insert_identifier_fields;
use crate::runtime::request::requested_fields;
use crate::runtime::request::resolve_default_fields;
use crate::runtime::tokenize::IdentifierCipher;
use crate::runtime::transform::capture_identifiers;
use crate::runtime::transform::complete_schema;
use crate::runtime::transform::filter_confidential;
use crate::runtime::transform::rewrite_links;
use crate::runtime::transform::strip_fields;
use crate::runtime::transform::tokenize_fields;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Caller identity.
    pub user: UserId,
    /// Granted scopes.
    pub scopes: ScopeSet,
}

/// One inbound request as handed over by the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRequest {
    /// Parsed JSON object body.
    pub payload: Map<String, Value>,
    /// Authenticated caller.
    pub principal: Principal,
    /// Caller correlation identifier.
    pub correlation_id: Option<CorrelationId>,
    /// Caller-declared task description.
    pub task_description: Option<String>,
    /// Whether absent fields are completed with empty defaults.
    pub full_result: bool,
}

/// Transformed response returned to the transport layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    /// HTTP status code.
    pub status: u16,
    /// Upstream content type.
    pub content_type: Option<String>,
    /// Transformed JSON body.
    pub body: Value,
}

/// Tokenization-specific denial causes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenDenial {
    /// A tokenizing caller sent no correlation id.
    #[error("tokenized identifiers require a correlation id")]
    MissingCorrelation,
    /// A raw identifier was sent without the raw input scope.
    #[error("raw {parameter} used without the raw identifier scope")]
    RawIdentifier {
        /// Parameter carrying the raw value.
        parameter: String,
    },
    /// A token did not decrypt in this correlation context.
    #[error("cannot decrypt {parameter} in this correlation context: {reason}")]
    Undecryptable {
        /// Parameter carrying the token.
        parameter: String,
        /// Cipher error.
        reason: String,
    },
}

/// Pipeline errors.
///
/// # Invariants
/// - Only [`PipelineError::Policy`] validation variants carry caller-safe text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Validation failure or scope denial.
    #[error(transparent)]
    Policy(PolicyError),
    /// The caller holds no dataset for a variant that needs one.
    #[error("permission denied: no dataset granted")]
    DatasetNotGranted,
    /// Tokenization denial.
    #[error("permission denied: {0}")]
    Tokenization(TokenDenial),
    /// Upstream failure.
    #[error(transparent)]
    Upstream(UpstreamError),
    /// Internal failure while shaping the response.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Returns true for permission denials of any cause.
    #[must_use]
    pub const fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::Policy(PolicyError::PermissionDenied { .. })
                | Self::DatasetNotGranted
                | Self::Tokenization(_)
        )
    }
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Proxy pipeline for one endpoint.
#[derive(Clone)]
pub struct ProxyPipeline {
    /// Endpoint configuration.
    endpoint: Arc<EndpointConfig>,
    /// Identifier cipher shared across endpoints.
    cipher: Arc<IdentifierCipher>,
    /// Upstream registry client.
    client: Arc<dyn UpstreamClient>,
    /// Audit destination.
    audit: Arc<dyn AuditSink>,
}

impl ProxyPipeline {
    /// Creates a pipeline for an endpoint.
    #[must_use]
    pub fn new(
        endpoint: Arc<EndpointConfig>,
        cipher: Arc<IdentifierCipher>,
        client: Arc<dyn UpstreamClient>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            endpoint,
            cipher,
            client,
            audit,
        }
    }

    /// Returns the endpoint configuration.
    #[must_use]
    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Handles one proxied request end to end.
    ///
    /// # Errors
    /// Returns [`PipelineError`] for validation failures, denials, upstream
    /// failures, and response tokenization failures.
    pub async fn handle(&self, request: ProxyRequest) -> Result<ProxyResponse, PipelineError> {
        let endpoint = self.endpoint.as_ref();
        let granted = &request.principal.scopes;
        let mut audit = AuditDraft::new(endpoint, &request);

        let base = RequiredScopes::from_requirements(endpoint.base_scopes.clone());
        if let Err(err) = base.ensure_granted(granted) {
            return Err(self.deny(audit, PipelineError::Policy(err)));
        }

        let variant = endpoint.variant(&request.payload).map_err(PipelineError::Policy)?;
        audit.operation = Some(variant.name.clone());

        let mut payload = request.payload.clone();
        variant.augment(&mut payload, granted);
        if resolve_default_fields(variant, &mut payload, granted) == FieldResolution::NoDataset {
            return Err(self.deny(audit, PipelineError::DatasetNotGranted));
        }
        let caller_fields = requested_fields(&payload);

        let mut required = base;
        match variant.ruleset.required_scopes(&payload) {
            Ok(needed) => required.extend(needed.requirements().iter().cloned()),
            Err(err) => return Err(PipelineError::Policy(err)),
        }
        audit.needed = required.labels();
        if let Err(err) = required.ensure_granted(granted) {
            return Err(self.deny(audit, PipelineError::Policy(err)));
        }

        let tokenizing = self.tokenizing_correlation(granted, request.correlation_id.as_ref());
        let tokenizing = match tokenizing {
            Ok(tokenizing) => tokenizing,
            Err(denial) => return Err(self.deny(audit, PipelineError::Tokenization(denial))),
        };
        if let (Some(rule), Some(correlation)) = (&endpoint.tokenization, tokenizing)
            && let Err(denial) =
                detokenize_parameters(rule, &self.cipher, &mut payload, granted, correlation)
        {
            return Err(self.deny(audit, PipelineError::Tokenization(denial)));
        }

        let inserted = insert_identifier_fields(variant, &mut payload, &endpoint.service);
        info!(
            service = %endpoint.service,
            operation = %variant.name,
            user = %request.principal.user,
            needed = %audit.needed.join(", "),
            "Granted access for {}.{}",
            endpoint.service,
            variant.name
        );

        let upstream_request = Value::Object(payload);
        audit.upstream_request = Some(upstream_request.clone());
        let response = match self.client.call(&endpoint.upstream_url, &upstream_request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(service = %endpoint.service, error = %err, "upstream call failed");
                if let UpstreamError::Status {
                    status,
                    body,
                } = &err
                {
                    audit.upstream_status = Some(*status);
                    audit.upstream_response = Some(body.clone());
                }
                self.audit.record(&audit.finish(AuditOutcome::UpstreamFailed, Some(err.to_string())));
                return Err(PipelineError::Upstream(err));
            }
        };

        audit.upstream_status = Some(response.status);
        audit.upstream_response = Some(response.body.clone());
        let body = self.transform_response(
            response.body,
            variant,
            &caller_fields,
            &inserted,
            granted,
            &request,
            tokenizing,
            &mut audit.retrieved,
        )?;
        self.audit.record(&audit.finish(AuditOutcome::Granted, None));

        Ok(ProxyResponse {
            status: response.status,
            content_type: response.content_type,
            body,
        })
    }

    /// Returns the correlation id when the caller's output is tokenized.
    fn tokenizing_correlation<'a>(
        &self,
        granted: &ScopeSet,
        correlation: Option<&'a CorrelationId>,
    ) -> Result<Option<&'a CorrelationId>, TokenDenial> {
        let Some(rule) = &self.endpoint.tokenization else {
            return Ok(None);
        };
        if !granted.contains(&rule.scope) {
            return Ok(None);
        }
        correlation.map(Some).ok_or(TokenDenial::MissingCorrelation)
    }

    /// Applies the response stages in order.
    #[allow(clippy::too_many_arguments, reason = "Stage inputs are kept explicit for auditability.")]
    fn transform_response(
        &self,
        body: Value,
        variant: &EndpointVariant,
        caller_fields: &[String],
        inserted: &[String],
        granted: &ScopeSet,
        request: &ProxyRequest,
        tokenizing: Option<&CorrelationId>,
        retrieved: &mut Vec<RetrievedIdentifiers>,
    ) -> Result<Value, PipelineError> {
        let endpoint = self.endpoint.as_ref();
        let mut body = rewrite_links(body, &endpoint.upstream_url, &endpoint.public_url);

        let Some(records_key) = endpoint.records_key.as_deref() else {
            return Ok(body);
        };
        *retrieved = capture_identifiers(&body, records_key, &endpoint.audit_identifiers);

        if request.full_result
            && variant.fields.is_some()
            && let Some(shape) = &endpoint.shape
        {
            let requested = group_dotted_names(caller_fields);
            body = complete_schema(body, records_key, &requested, shape.root());
        }

        if let Some(rule) = &endpoint.confidentiality
            && !granted.contains(&rule.override_scope)
        {
            let (filtered, removed) = filter_confidential(body, records_key, &rule.marker_field);
            if removed > 0 {
                info!(service = %endpoint.service, removed, "confidential records removed from response");
            }
            body = filtered;
        }

        body = strip_fields(body, records_key, inserted);

        if let (Some(rule), Some(correlation)) = (&endpoint.tokenization, tokenizing) {
            let mut encrypt = |raw: &str| self.cipher.encrypt(raw, correlation);
            body = tokenize_fields(body, &rule.fields, &mut encrypt)
                .map_err(|err| PipelineError::Internal(err.to_string()))?;
        }
        Ok(body)
    }

    /// Logs and audits a denial, returning the error for the caller.
    fn deny(&self, audit: AuditDraft, err: PipelineError) -> PipelineError {
        let endpoint = self.endpoint.as_ref();
        let mut audit = audit;
        if let PipelineError::Policy(PolicyError::PermissionDenied {
            needed,
            missing,
        }) = &err
        {
            audit.needed.clone_from(needed);
            audit.missing.clone_from(missing);
        }
        info!(
            service = %endpoint.service,
            operation = audit.operation.as_deref().unwrap_or("-"),
            user = %audit.user,
            granted = %audit.granted.join(", "),
            "Denied access to '{}.{}': {}",
            endpoint.service,
            audit.operation.as_deref().unwrap_or("-"),
            err
        );
        self.audit.record(&audit.finish(AuditOutcome::Denied, Some(err.to_string())));
        err
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Audit fields collected while the request progresses.
struct AuditDraft {
    /// Service name.
    service: String,
    /// Resolved operation.
    operation: Option<String>,
    /// Caller identity.
    user: String,
    /// Correlation identifier.
    correlation_id: Option<String>,
    /// Task description.
    task_description: Option<String>,
    /// Granted scopes, sorted.
    granted: Vec<String>,
    /// Needed requirement labels.
    needed: Vec<String>,
    /// Missing requirement labels.
    missing: Vec<String>,
    /// Inbound payload.
    request: Value,
    /// Outbound payload.
    upstream_request: Option<Value>,
    /// Upstream status.
    upstream_status: Option<u16>,
    /// Raw upstream body.
    upstream_response: Option<Value>,
    /// Captured identifiers.
    retrieved: Vec<RetrievedIdentifiers>,
}

impl AuditDraft {
    /// Starts a draft from the inbound request.
    fn new(endpoint: &EndpointConfig, request: &ProxyRequest) -> Self {
        Self {
            service: endpoint.service.clone(),
            operation: None,
            user: request.principal.user.to_string(),
            correlation_id: request.correlation_id.as_ref().map(ToString::to_string),
            task_description: request.task_description.clone(),
            granted: request.principal.scopes.iter().cloned().collect(),
            needed: Vec::new(),
            missing: Vec::new(),
            request: Value::Object(request.payload.clone()),
            upstream_request: None,
            upstream_status: None,
            upstream_response: None,
            retrieved: Vec::new(),
        }
    }

    /// Finalizes the draft into an audit record.
    fn finish(self, outcome: AuditOutcome, reason: Option<String>) -> AuditRecord {
        AuditRecord::new(AuditRecordParams {
            service: self.service,
            operation: self.operation,
            user: self.user,
            correlation_id: self.correlation_id,
            task_description: self.task_description,
            outcome,
            reason,
            granted: self.granted,
            needed: self.needed,
            missing: self.missing,
            request: self.request,
            upstream_request: self.upstream_request,
            upstream_status: self.upstream_status,
            upstream_response: self.upstream_response,
            retrieved: self.retrieved,
        })
    }
}
