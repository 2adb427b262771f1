// crates/brp-gate-core/src/core/brp.rs
// ============================================================================
// Module: BRP Endpoint Definitions
// Description: Built-in Haal Centraal endpoint configurations.
// Purpose: Declare rulesets, scopes, and record handling per BRP endpoint.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Table-driven definitions for the four proxied Haal Centraal APIs:
//! personen, bewoningen, verblijfplaatshistorie, and reisdocumenten. Each
//! builder returns an [`EndpointConfig`] value; nothing here performs I/O.
//!
//! Security posture: every search parameter the upstream accepts is named
//! explicitly so no unlisted flag can widen access.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;

use crate::core::endpoint::Augmentation;
use crate::core::endpoint::ConfidentialityRule;
use crate::core::endpoint::EndpointCatalog;
use crate::core::endpoint::EndpointConfig;
use crate::core::endpoint::EndpointVariant;
use crate::core::endpoint::TokenizationRule;
use crate::core::fields::FieldCatalogError;
use crate::core::policy::ParameterPolicy;
use crate::core::policy::ParameterRuleset;
use crate::core::policy::single_scope;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Municipality code of Amsterdam.
pub const GEMEENTE_AMSTERDAM: &str = "0363";

/// Scope required for every BRP endpoint.
pub const SCOPE_BASE: &str = "benk-brp-api";
/// Scope lifting the Amsterdam municipality restriction.
pub const SCOPE_NATIONWIDE: &str = "benk-brp-landelijk";
/// Scope allowing searches that include deceased persons.
pub const SCOPE_INCLUDE_DECEASED: &str = "benk-brp-inclusief-overledenen";
/// Scope allowing records marked confidential.
pub const SCOPE_ALLOW_CONFIDENTIAL: &str = "benk-brp-inclusief-geheim";
/// Scope turning on BSN tokenization for a caller.
pub const SCOPE_ENCRYPT_BSN: &str = "benk-brp-encrypt-bsn";
/// Scope allowing a tokenizing caller to submit raw BSN values.
pub const SCOPE_RAW_BSN: &str = "benk-brp-bsn-onversleuteld";
/// Scope allowing the `verblijfplaats` filter (persons abroad).
pub const SCOPE_ABROAD: &str = "benk-brp-in-buitenland";
/// Scope allowing searches by BSN.
pub const SCOPE_SEARCH_BSN: &str = "benk-brp-zoekvraag-bsn";

/// Service name of the personen endpoint.
pub const SERVICE_PERSONEN: &str = "personen";
/// Service name of the bewoningen endpoint.
pub const SERVICE_BEWONINGEN: &str = "bewoningen";
/// Service name of the verblijfplaatshistorie endpoint.
pub const SERVICE_VERBLIJFPLAATSHISTORIE: &str = "verblijfplaatshistorie";
/// Service name of the reisdocumenten endpoint.
pub const SERVICE_REISDOCUMENTEN: &str = "reisdocumenten";

/// Record type returned when consulting a person by BSN.
pub const RECORD_PERSOON: &str = "Persoon";
/// Record type returned by person searches.
pub const RECORD_PERSOON_BEPERKT: &str = "PersoonBeperkt";

/// Field holding the citizen service number.
const FIELD_BSN: &str = "burgerservicenummer";
/// Field holding the administration number.
const FIELD_ANUMMER: &str = "aNummer";
/// Parameter filtering by municipality.
const PARAM_GEMEENTE: &str = "gemeenteVanInschrijving";
/// Parameter including deceased persons.
const PARAM_INCLUDE_DECEASED: &str = "inclusiefOverledenPersonen";

/// Person search parameters that need no extra scope.
const PERSONEN_OPEN_PARAMETERS: [&str; 12] = [
    "geboortedatum",
    "geslachtsnaam",
    "geslacht",
    "voorvoegsel",
    "voornamen",
    "straat",
    "huisletter",
    "huisnummer",
    "huisnummertoevoeging",
    "postcode",
    "nummeraanduidingIdentificatie",
    "adresseerbaarObjectIdentificatie",
];

/// Municipality handling of a person query type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Locality {
    /// Amsterdam by default, any municipality with the nationwide scope.
    NationwideByScope,
    /// Always Amsterdam.
    AmsterdamOnly,
}

/// Person query type, its scope, and its municipality handling.
const PERSONEN_TYPES: [(&str, &str, Locality); 7] = [
    ("RaadpleegMetBurgerservicenummer", SCOPE_SEARCH_BSN, Locality::NationwideByScope),
    (
        "ZoekMetGeslachtsnaamEnGeboortedatum",
        "benk-brp-zoekvraag-geslachtsnaam-geboortedatum",
        Locality::NationwideByScope,
    ),
    (
        "ZoekMetNaamEnGemeenteVanInschrijving",
        "benk-brp-zoekvraag-naam-gemeente",
        Locality::AmsterdamOnly,
    ),
    (
        "ZoekMetAdresseerbaarObjectIdentificatie",
        "benk-brp-zoekvraag-adresseerbaar-object",
        Locality::AmsterdamOnly,
    ),
    (
        "ZoekMetNummeraanduidingIdentificatie",
        "benk-brp-zoekvraag-nummeraanduiding",
        Locality::AmsterdamOnly,
    ),
    (
        "ZoekMetPostcodeEnHuisnummer",
        "benk-brp-zoekvraag-postcode-huisnummer",
        Locality::AmsterdamOnly,
    ),
    (
        "ZoekMetStraatHuisnummerEnGemeenteVanInschrijving",
        "benk-brp-zoekvraag-straatnaam-huisnummer",
        Locality::AmsterdamOnly,
    ),
];

/// Query type that consults a single person.
const PERSONEN_CONSULT_TYPE: &str = "RaadpleegMetBurgerservicenummer";

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Deployment settings for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSettings {
    /// Upstream endpoint URL.
    pub upstream_url: String,
    /// Externally visible base URL prefixed to the public path in links.
    pub public_base_url: String,
}

impl EndpointSettings {
    /// Creates settings from an upstream URL and public base URL.
    #[must_use]
    pub fn new(upstream_url: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        Self {
            upstream_url: upstream_url.into(),
            public_base_url: public_base_url.into(),
        }
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds the personen endpoint.
///
/// # Errors
/// Returns [`FieldCatalogError`] when the catalog lacks the record shape or
/// the `Persoon`/`PersoonBeperkt` field lists.
pub fn personen_endpoint(
    settings: &EndpointSettings,
    catalog: &EndpointCatalog,
) -> Result<EndpointConfig, FieldCatalogError> {
    let shape = catalog
        .shape
        .clone()
        .ok_or_else(|| FieldCatalogError::MissingShape(SERVICE_PERSONEN.to_string()))?;
    let datasets = Arc::new(catalog.datasets.clone());
    let mut endpoint = base_endpoint(SERVICE_PERSONEN, "/api/brp/personen", settings);

    for (type_name, type_scope, locality) in PERSONEN_TYPES {
        let consult = type_name == PERSONEN_CONSULT_TYPE;
        let record_type = if consult { RECORD_PERSOON } else { RECORD_PERSOON_BEPERKT };
        let allowed = catalog
            .record_types
            .get(record_type)
            .cloned()
            .ok_or_else(|| FieldCatalogError::MissingRecordType(record_type.to_string()))?;

        let mut variant =
            EndpointVariant::new(type_name, personen_ruleset(type_name, type_scope, locality))
                .with_augmentation(Augmentation::DefaultValue {
                    parameter: PARAM_GEMEENTE.to_string(),
                    value: Value::String(GEMEENTE_AMSTERDAM.to_string()),
                    unless_scope: match locality {
                        Locality::NationwideByScope => Some(SCOPE_NATIONWIDE.to_string()),
                        Locality::AmsterdamOnly => None,
                    },
                })
                .with_fields(Arc::clone(&datasets), Some(allowed), &shape);
        if consult {
            variant = variant.with_inserted_identifiers([FIELD_ANUMMER, FIELD_BSN]);
        } else {
            variant = variant
                .with_augmentation(Augmentation::EnableFlag {
                    parameter: PARAM_INCLUDE_DECEASED.to_string(),
                    scope: SCOPE_INCLUDE_DECEASED.to_string(),
                })
                .with_inserted_identifiers([FIELD_BSN]);
        }
        endpoint = endpoint.with_variant(variant);
    }

    endpoint.records_key = Some("personen".to_string());
    endpoint.shape = Some(Arc::new(shape));
    endpoint.confidentiality = Some(ConfidentialityRule {
        marker_field: "geheimhoudingPersoonsgegevens".to_string(),
        override_scope: SCOPE_ALLOW_CONFIDENTIAL.to_string(),
    });
    endpoint.tokenization = Some(bsn_tokenization(&[FIELD_BSN], &[FIELD_BSN]));
    endpoint.audit_identifiers = vec![FIELD_ANUMMER.to_string(), FIELD_BSN.to_string()];
    Ok(endpoint)
}

/// Builds the bewoningen endpoint.
#[must_use]
pub fn bewoningen_endpoint(settings: &EndpointSettings) -> EndpointConfig {
    let mut endpoint = base_endpoint(SERVICE_BEWONINGEN, "/api/brp/bewoningen", settings);
    for type_name in ["BewoningMetPeildatum", "BewoningMetPeriode"] {
        let ruleset = open_ruleset(
            type_name,
            "benk-brp-zoekvraag-bewoning",
            &["adresseerbaarObjectIdentificatie", "peildatum", "datumVan", "datumTot"],
        );
        endpoint = endpoint.with_variant(EndpointVariant::new(type_name, ruleset));
    }
    endpoint.records_key = Some("bewoningen".to_string());
    endpoint
}

/// Builds the verblijfplaatshistorie endpoint.
#[must_use]
pub fn verblijfplaatshistorie_endpoint(settings: &EndpointSettings) -> EndpointConfig {
    let mut endpoint =
        base_endpoint(SERVICE_VERBLIJFPLAATSHISTORIE, "/api/brp/verblijfplaatshistorie", settings);
    for type_name in ["RaadpleegMetPeildatum", "RaadpleegMetPeriode"] {
        let ruleset = open_ruleset(
            type_name,
            "benk-brp-zoekvraag-verblijfplaatshistorie",
            &[FIELD_BSN, "peildatum", "datumVan", "datumTot"],
        );
        endpoint = endpoint.with_variant(EndpointVariant::new(type_name, ruleset));
    }
    endpoint.records_key = Some("verblijfplaatsen".to_string());
    endpoint.tokenization = Some(bsn_tokenization(&[], &[FIELD_BSN]));
    endpoint
}

/// Builds the reisdocumenten endpoint.
///
/// # Errors
/// Returns [`FieldCatalogError::MissingShape`] when the catalog has no shape.
pub fn reisdocumenten_endpoint(
    settings: &EndpointSettings,
    catalog: &EndpointCatalog,
) -> Result<EndpointConfig, FieldCatalogError> {
    let shape = catalog
        .shape
        .clone()
        .ok_or_else(|| FieldCatalogError::MissingShape(SERVICE_REISDOCUMENTEN.to_string()))?;
    let datasets = Arc::new(catalog.datasets.clone());
    let mut endpoint =
        base_endpoint(SERVICE_REISDOCUMENTEN, "/api/reisdocumenten/reisdocumenten", settings);

    let variants = [
        (
            "RaadpleegMetReisdocumentnummer",
            "benk-brp-zoekvraag-reisdocumentnummer",
            "reisdocumentnummer",
        ),
        ("ZoekMetBurgerservicenummer", "benk-brp-zoekvraag-reisdocument-bsn", FIELD_BSN),
    ];
    for (type_name, type_scope, search_parameter) in variants {
        let ruleset = ParameterRuleset::new()
            .with("type", ParameterPolicy::new().with_value(type_name, type_scope))
            .with(search_parameter, ParameterPolicy::for_all_values(type_scope));
        let variant = EndpointVariant::new(type_name, ruleset).with_fields(
            Arc::clone(&datasets),
            None,
            &shape,
        );
        endpoint = endpoint.with_variant(variant);
    }

    endpoint.records_key = Some("reisdocumenten".to_string());
    endpoint.shape = Some(Arc::new(shape));
    endpoint.tokenization = Some(bsn_tokenization(&[FIELD_BSN], &[FIELD_BSN]));
    endpoint.audit_identifiers = vec![format!("houder.{FIELD_BSN}")];
    Ok(endpoint)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Creates an endpoint with the shared base scope and public URL.
fn base_endpoint(service: &str, public_path: &str, settings: &EndpointSettings) -> EndpointConfig {
    let mut endpoint =
        EndpointConfig::new(service, &settings.upstream_url, public_path, single_scope(SCOPE_BASE));
    endpoint.public_url = format!("{}{public_path}", settings.public_base_url.trim_end_matches('/'));
    endpoint
}

/// Builds the ruleset of one person query type.
fn personen_ruleset(type_name: &str, type_scope: &str, locality: Locality) -> ParameterRuleset {
    let mut ruleset =
        ParameterRuleset::new().with("type", ParameterPolicy::new().with_value(type_name, type_scope));
    for parameter in PERSONEN_OPEN_PARAMETERS {
        ruleset = ruleset.with(parameter, ParameterPolicy::allow_all());
    }
    let gemeente = match locality {
        Locality::NationwideByScope => ParameterPolicy::new()
            .allow_value(GEMEENTE_AMSTERDAM)
            .with_default_scope(single_scope(SCOPE_NATIONWIDE)),
        Locality::AmsterdamOnly => ParameterPolicy::new().allow_value(GEMEENTE_AMSTERDAM),
    };
    ruleset
        .with("verblijfplaats", ParameterPolicy::for_all_values(SCOPE_ABROAD))
        .with(FIELD_BSN, ParameterPolicy::for_all_values(SCOPE_SEARCH_BSN))
        .with(
            PARAM_INCLUDE_DECEASED,
            ParameterPolicy::new().with_value("true", SCOPE_INCLUDE_DECEASED).allow_value("false"),
        )
        .with(PARAM_GEMEENTE, gemeente)
}

/// Builds a ruleset with one typed discriminator and open parameters.
fn open_ruleset(type_name: &str, type_scope: &str, parameters: &[&str]) -> ParameterRuleset {
    let mut ruleset =
        ParameterRuleset::new().with("type", ParameterPolicy::new().with_value(type_name, type_scope));
    for parameter in parameters {
        ruleset = ruleset.with(*parameter, ParameterPolicy::allow_all());
    }
    ruleset
}

/// Builds the BSN tokenization rule.
fn bsn_tokenization(fields: &[&str], parameters: &[&str]) -> TokenizationRule {
    TokenizationRule {
        scope: SCOPE_ENCRYPT_BSN.to_string(),
        raw_input_scope: SCOPE_RAW_BSN.to_string(),
        fields: fields.iter().map(|field| (*field).to_string()).collect(),
        parameters: parameters.iter().map(|parameter| (*parameter).to_string()).collect(),
    }
}
