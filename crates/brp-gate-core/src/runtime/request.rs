// crates/brp-gate-core/src/runtime/request.rs
// ============================================================================
// Module: BRP Gate Request Shaping
// Description: Field defaults, identifier insertion, and input detokenization.
// Purpose: Turn a validated caller payload into the outbound upstream payload.
// Dependencies: serde_json, tracing
// ============================================================================

//! ## Overview
//! Request shaping happens around policy validation:
//! - before validation, an absent `fields` list is filled with the caller's
//!   default fields,
//! - after validation, tokenized identifier parameters are reversed and
//!   identifier fields needed for audit are appended to `fields`.
//!
//! Inserted identifiers never take part in validation, so they never show up
//! in caller-facing validation errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;
use tracing::debug;

use crate::core::endpoint::EndpointVariant;
use crate::core::endpoint::FIELDS_PARAMETER;
use crate::core::endpoint::TokenizationRule;
use crate::core::identifiers::CorrelationId;
use crate::core::policy::ScopeSet;
use crate::runtime::pipeline::TokenDenial;
use crate::runtime::tokenize::IdentifierCipher;

// ============================================================================
// SECTION: Field Resolution
// ============================================================================

/// Outcome of default field resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldResolution {
    /// The variant has no `fields` parameter.
    NotApplicable,
    /// The caller supplied `fields`.
    Explicit,
    /// Defaults were inserted.
    Defaulted(Vec<String>),
    /// The caller holds no dataset granting any field of the variant.
    NoDataset,
}

/// Fills an absent `fields` parameter with the caller's default fields.
pub fn resolve_default_fields(
    variant: &EndpointVariant,
    payload: &mut Map<String, Value>,
    granted: &ScopeSet,
) -> FieldResolution {
    let Some(fields) = &variant.fields else {
        return FieldResolution::NotApplicable;
    };
    if payload.contains_key(FIELDS_PARAMETER) {
        return FieldResolution::Explicit;
    }
    let defaults = fields.default_fields(granted);
    if defaults.is_empty() {
        return FieldResolution::NoDataset;
    }
    payload.insert(
        FIELDS_PARAMETER.to_string(),
        Value::Array(defaults.iter().cloned().map(Value::String).collect()),
    );
    FieldResolution::Defaulted(defaults)
}

/// Returns the string entries of the `fields` parameter.
#[must_use]
pub fn requested_fields(payload: &Map<String, Value>) -> Vec<String> {
    match payload.get(FIELDS_PARAMETER) {
        Some(Value::Array(items)) => {
            items.iter().filter_map(Value::as_str).map(str::to_string).collect()
        }
        Some(Value::String(single)) => vec![single.clone()],
        _ => Vec::new(),
    }
}

// ============================================================================
// SECTION: Identifier Insertion
// ============================================================================

/// Appends the variant's identifier fields the caller did not request.
///
/// Returns the inserted field names.
pub fn insert_identifier_fields(
    variant: &EndpointVariant,
    payload: &mut Map<String, Value>,
    service: &str,
) -> Vec<String> {
    if variant.fields.is_none() || variant.inserted_identifiers.is_empty() {
        return Vec::new();
    }
    let requested = requested_fields(payload);
    let inserted: Vec<String> = variant
        .inserted_identifiers
        .iter()
        .filter(|field| !requested.contains(field))
        .cloned()
        .collect();
    if inserted.is_empty() {
        return inserted;
    }
    debug!(
        service,
        operation = %variant.name,
        fields = ?inserted,
        "identifier fields appended for audit"
    );
    let mut fields: Vec<Value> = requested.into_iter().map(Value::String).collect();
    fields.extend(inserted.iter().cloned().map(Value::String));
    payload.insert(FIELDS_PARAMETER.to_string(), Value::Array(fields));
    inserted
}

// ============================================================================
// SECTION: Detokenization
// ============================================================================

/// Reverses tokenized identifier parameters in place.
///
/// Values that do not decrypt are kept raw only when they are shaped like a
/// raw identifier and the caller holds the raw input scope. Anything else
/// that fails to decrypt, such as a token minted under another correlation
/// id, is denied.
///
/// # Errors
/// Returns [`TokenDenial`] describing the first parameter that cannot be
/// accepted.
pub fn detokenize_parameters(
    rule: &TokenizationRule,
    cipher: &IdentifierCipher,
    payload: &mut Map<String, Value>,
    granted: &ScopeSet,
    correlation: &CorrelationId,
) -> Result<(), TokenDenial> {
    let allow_raw = granted.contains(&rule.raw_input_scope);
    for parameter in &rule.parameters {
        let Some(value) = payload.get_mut(parameter) else {
            continue;
        };
        match value {
            Value::String(text) => {
                *text = detokenize_value(cipher, text, parameter, allow_raw, correlation)?;
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    if let Value::String(text) = item {
                        *text = detokenize_value(cipher, text, parameter, allow_raw, correlation)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Reverses one value or accepts it raw.
fn detokenize_value(
    cipher: &IdentifierCipher,
    value: &str,
    parameter: &str,
    allow_raw: bool,
    correlation: &CorrelationId,
) -> Result<String, TokenDenial> {
    match cipher.decrypt(value, correlation) {
        Ok(raw) => Ok(raw),
        Err(_) if looks_raw(value) && allow_raw => Ok(value.to_string()),
        Err(_) if looks_raw(value) => Err(TokenDenial::RawIdentifier {
            parameter: parameter.to_string(),
        }),
        Err(err) => Err(TokenDenial::Undecryptable {
            parameter: parameter.to_string(),
            reason: err.to_string(),
        }),
    }
}

/// Returns true for values shaped like an untokenized service number.
fn looks_raw(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|ch| ch.is_ascii_digit())
}
