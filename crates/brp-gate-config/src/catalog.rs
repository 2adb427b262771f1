// crates/brp-gate-config/src/catalog.rs
// ============================================================================
// Module: BRP Gate Catalog Loading
// Description: Loads field groups, record type field lists, and response shapes.
// Purpose: Build the immutable endpoint definitions at startup.
// Dependencies: brp-gate-core, serde_json
// ============================================================================

//! ## Overview
//! The catalog directory holds, per service:
//! - `dataset_fields/{service}/{dataset-scope}.txt`: one field group per
//!   dataset scope,
//! - `fields/{service}/{RecordType}.txt`: fields a record type exposes,
//! - `schemas/{service}.json`: an example record describing the response
//!   shape.
//!
//! Every listed path must be known to the shape. Any missing or malformed
//! file is a startup error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use brp_gate_core::EndpointCatalog;
use brp_gate_core::EndpointConfig;
use brp_gate_core::FieldCatalog;
use brp_gate_core::FieldCatalogError;
use brp_gate_core::FieldList;
use brp_gate_core::ResponseShape;
use brp_gate_core::brp::EndpointSettings;
use brp_gate_core::brp::SERVICE_BEWONINGEN;
use brp_gate_core::brp::SERVICE_PERSONEN;
use brp_gate_core::brp::SERVICE_REISDOCUMENTEN;
use brp_gate_core::brp::SERVICE_VERBLIJFPLAATSHISTORIE;
use brp_gate_core::brp::bewoningen_endpoint;
use brp_gate_core::brp::personen_endpoint;
use brp_gate_core::brp::reisdocumenten_endpoint;
use brp_gate_core::brp::verblijfplaatshistorie_endpoint;
use brp_gate_core::core::fields::wildcard_base;
use serde_json::Value;

use crate::config::ConfigError;
use crate::config::GatewayConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Directory of dataset field groups.
const DATASET_FIELDS_DIR: &str = "dataset_fields";
/// Directory of record type field lists.
const RECORD_FIELDS_DIR: &str = "fields";
/// Directory of response shapes.
const SCHEMAS_DIR: &str = "schemas";
/// Extension of field list files.
const FIELD_FILE_EXTENSION: &str = "txt";
/// Maximum size of one catalog file in bytes.
const MAX_CATALOG_FILE_SIZE: usize = 1024 * 1024;

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads the catalog material of one service.
///
/// # Errors
///
/// Returns [`ConfigError::Catalog`] when a file is missing, malformed, or
/// lists a path the shape does not know.
pub fn load_endpoint_catalog(dir: &Path, service: &str) -> Result<EndpointCatalog, ConfigError> {
    let shape_path = dir.join(SCHEMAS_DIR).join(format!("{service}.json"));
    let example: Value = serde_json::from_str(&read_catalog_file(&shape_path)?)
        .map_err(|err| ConfigError::Catalog(format!("{}: {err}", shape_path.display())))?;
    let shape = ResponseShape::from_json(&example)
        .map_err(|err| ConfigError::Catalog(format!("{}: {err}", shape_path.display())))?;

    let mut datasets = FieldCatalog::new();
    for (dataset, fields) in load_field_lists(&dir.join(DATASET_FIELDS_DIR).join(service), &shape)? {
        datasets
            .insert_group(dataset, fields)
            .map_err(|err| ConfigError::Catalog(format!("{service}: {err}")))?;
    }
    if datasets.datasets().next().is_none() {
        return Err(ConfigError::Catalog(format!("{service}: no dataset field groups")));
    }

    let record_dir = dir.join(RECORD_FIELDS_DIR).join(service);
    let record_types =
        if record_dir.is_dir() { load_field_lists(&record_dir, &shape)? } else { BTreeMap::new() };

    Ok(EndpointCatalog {
        datasets,
        shape: Some(shape),
        record_types,
    })
}

/// Builds every endpoint from the configuration and catalog directory.
///
/// # Errors
///
/// Returns [`ConfigError`] when catalog material is missing or invalid.
pub fn build_endpoints(config: &GatewayConfig) -> Result<Vec<EndpointConfig>, ConfigError> {
    let dir = config.catalog.dir.as_path();
    let public = config.server.public_base_url.as_str();
    let settings = |service: &str| EndpointSettings::new(config.upstream.endpoint_url(service), public);
    let catalog_error = |err: FieldCatalogError| ConfigError::Catalog(err.to_string());

    let personen = personen_endpoint(
        &settings(SERVICE_PERSONEN),
        &load_endpoint_catalog(dir, SERVICE_PERSONEN)?,
    )
    .map_err(catalog_error)?;
    let reisdocumenten = reisdocumenten_endpoint(
        &settings(SERVICE_REISDOCUMENTEN),
        &load_endpoint_catalog(dir, SERVICE_REISDOCUMENTEN)?,
    )
    .map_err(catalog_error)?;

    Ok(vec![
        personen,
        bewoningen_endpoint(&settings(SERVICE_BEWONINGEN)),
        verblijfplaatshistorie_endpoint(&settings(SERVICE_VERBLIJFPLAATSHISTORIE)),
        reisdocumenten,
    ])
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads every `*.txt` field list in a directory, keyed by file stem.
fn load_field_lists(
    dir: &Path,
    shape: &ResponseShape,
) -> Result<BTreeMap<String, FieldList>, ConfigError> {
    let entries = fs::read_dir(dir)
        .map_err(|err| ConfigError::Catalog(format!("{}: {err}", dir.display())))?;
    let mut lists = BTreeMap::new();
    for entry in entries {
        let path = entry.map_err(|err| ConfigError::Catalog(err.to_string()))?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(FIELD_FILE_EXTENSION) {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
            return Err(ConfigError::Catalog(format!("{}: invalid file name", path.display())));
        };
        let fields = FieldList::parse(&read_catalog_file(&path)?)
            .map_err(|err| ConfigError::Catalog(format!("{}: {err}", path.display())))?;
        if let Some(unknown) = fields.iter().find(|field| !shape.knows(wildcard_base(field))) {
            return Err(ConfigError::Catalog(format!(
                "{}: {}",
                path.display(),
                FieldCatalogError::UnknownField(unknown.to_string())
            )));
        }
        lists.insert(name.to_string(), fields);
    }
    Ok(lists)
}

/// Reads one catalog file with a size cap.
fn read_catalog_file(path: &Path) -> Result<String, ConfigError> {
    let bytes =
        fs::read(path).map_err(|err| ConfigError::Catalog(format!("{}: {err}", path.display())))?;
    if bytes.len() > MAX_CATALOG_FILE_SIZE {
        return Err(ConfigError::Catalog(format!("{}: exceeds size limit", path.display())));
    }
    String::from_utf8(bytes)
        .map_err(|_| ConfigError::Catalog(format!("{}: must be utf-8", path.display())))
}
