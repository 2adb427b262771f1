// crates/brp-gate-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared fixtures for BRP Gate pipeline tests.
// Purpose: Provide a stub upstream, an in-memory audit sink, and small catalogs.
// Dependencies: brp-gate-core
// ============================================================================

//! ## Overview
//! Fixtures build the real endpoint definitions over a compact field catalog
//! and response shape, so pipeline tests run the production rulesets without
//! reading configuration files.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test fixtures use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use brp_gate_core::AuditRecord;
use brp_gate_core::AuditSink;
use brp_gate_core::CorrelationId;
use brp_gate_core::EndpointCatalog;
use brp_gate_core::EndpointConfig;
use brp_gate_core::FieldCatalog;
use brp_gate_core::FieldList;
use brp_gate_core::IdentifierCipher;
use brp_gate_core::Principal;
use brp_gate_core::ProxyPipeline;
use brp_gate_core::ProxyRequest;
use brp_gate_core::ResponseShape;
use brp_gate_core::ScopeSet;
use brp_gate_core::UpstreamClient;
use brp_gate_core::UpstreamError;
use brp_gate_core::UpstreamResponse;
use brp_gate_core::UserId;
use brp_gate_core::brp::EndpointSettings;
use brp_gate_core::brp::bewoningen_endpoint;
use brp_gate_core::brp::personen_endpoint;
use brp_gate_core::brp::reisdocumenten_endpoint;
use brp_gate_core::brp::verblijfplaatshistorie_endpoint;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Upstream base URL used by fixtures.
pub const UPSTREAM_BASE: &str = "https://hc.example/haalcentraal/api";

/// Public base URL used by fixtures.
pub const PUBLIC_BASE: &str = "https://gateway.example";

/// Dataset granting names and identifiers.
pub const DATASET_1: &str = "benk-brp-gegevensset-1";

/// Dataset granting addresses.
pub const DATASET_9: &str = "benk-brp-gegevensset-9";

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
// SECTION: Catalogs
// ============================================================================

/// Returns a compact personen response shape.
pub fn personen_shape() -> ResponseShape {
    ResponseShape::from_json(&json!({
        "aNummer": "1234567890",
        "burgerservicenummer": "999990019",
        "geheimhoudingPersoonsgegevens": 0,
        "leeftijd": 42,
        "naam": {
            "voornamen": "Jan",
            "geslachtsnaam": "Jansen",
            "volledigeNaam": "Jan Jansen"
        },
        "nationaliteiten": [{"nationaliteit": {"code": "0001"}}],
        "verblijfplaats": {"verblijfadres": {"straat": "Amstel", "huisnummer": 1}}
    }))
    .unwrap()
}

/// Returns the personen catalog with two datasets and both record types.
pub fn personen_catalog() -> EndpointCatalog {
    let mut datasets = FieldCatalog::new();
    datasets
        .insert_group(
            DATASET_1,
            FieldList::from_paths([
                "aNummer",
                "burgerservicenummer",
                "geheimhoudingPersoonsgegevens",
                "leeftijd",
                "naam.*",
                "nationaliteiten",
            ])
            .unwrap(),
        )
        .unwrap();
    datasets
        .insert_group(DATASET_9, FieldList::from_paths(["naam.volledigeNaam", "verblijfplaats"]).unwrap())
        .unwrap();

    let mut record_types = BTreeMap::new();
    record_types.insert(
        "Persoon".to_string(),
        FieldList::from_paths([
            "aNummer",
            "burgerservicenummer",
            "geheimhoudingPersoonsgegevens",
            "leeftijd",
            "naam",
            "nationaliteiten",
            "verblijfplaats",
        ])
        .unwrap(),
    );
    record_types.insert(
        "PersoonBeperkt".to_string(),
        FieldList::from_paths([
            "burgerservicenummer",
            "geheimhoudingPersoonsgegevens",
            "leeftijd",
            "naam.volledigeNaam",
            "verblijfplaats",
        ])
        .unwrap(),
    );
    EndpointCatalog {
        datasets,
        shape: Some(personen_shape()),
        record_types,
    }
}

/// Returns the reisdocumenten catalog.
pub fn reisdocumenten_catalog() -> EndpointCatalog {
    let mut datasets = FieldCatalog::new();
    datasets
        .insert_group(
            "benk-brp-reisdocumenten-gegevensset-1",
            FieldList::from_paths(["reisdocumentnummer", "soort.*", "houder.burgerservicenummer"])
                .unwrap(),
        )
        .unwrap();
    let shape = ResponseShape::from_json(&json!({
        "reisdocumentnummer": "NW1234567",
        "soort": {"code": "PN", "omschrijving": "Nationaal paspoort"},
        "houder": {"burgerservicenummer": "999990019"}
    }))
    .unwrap();
    EndpointCatalog {
        datasets,
        shape: Some(shape),
        record_types: BTreeMap::new(),
    }
}

/// Returns settings for an upstream path.
pub fn settings(path: &str) -> EndpointSettings {
    EndpointSettings::new(format!("{UPSTREAM_BASE}/{path}"), PUBLIC_BASE)
}

/// Builds the personen endpoint over the fixture catalog.
pub fn personen() -> Arc<EndpointConfig> {
    Arc::new(personen_endpoint(&settings("brp/personen"), &personen_catalog()).unwrap())
}

/// Builds every endpoint over the fixture catalogs.
pub fn all_endpoints() -> Vec<Arc<EndpointConfig>> {
    vec![
        personen(),
        Arc::new(bewoningen_endpoint(&settings("bewoning/bewoningen"))),
        Arc::new(verblijfplaatshistorie_endpoint(&settings("brphistorie/verblijfplaatshistorie"))),
        Arc::new(
            reisdocumenten_endpoint(&settings("reisdocumenten/reisdocumenten"), &reisdocumenten_catalog())
                .unwrap(),
        ),
    ]
}

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Returns a cipher with one fixed key.
pub fn cipher() -> Arc<IdentifierCipher> {
    Arc::new(IdentifierCipher::new(&[[7u8; 32]]).unwrap())
}

/// Builds a scope set.
pub fn scopes(names: &[&str]) -> ScopeSet {
    names.iter().map(|name| (*name).to_string()).collect()
}

/// Builds a request for a payload and scopes.
pub fn request(payload: &Value, granted: &[&str], correlation: Option<&str>) -> ProxyRequest {
    let payload: Map<String, Value> = payload.as_object().cloned().unwrap();
    ProxyRequest {
        payload,
        principal: Principal {
            user: UserId::new("test@example.com"),
            scopes: scopes(granted),
        },
        correlation_id: correlation.map(CorrelationId::new),
        task_description: Some("unit test".to_string()),
        full_result: false,
    }
}

/// Builds a pipeline for an endpoint.
pub fn pipeline(
    endpoint: Arc<EndpointConfig>,
    upstream: Arc<StubUpstream>,
    audit: Arc<MemoryAudit>,
) -> ProxyPipeline {
    ProxyPipeline::new(endpoint, cipher(), upstream, audit)
}
