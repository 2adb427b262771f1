// crates/brp-gate-server/src/telemetry.rs
// ============================================================================
// Module: Diagnostic Logging Setup
// Description: tracing subscriber installation from logging configuration.
// Purpose: Route diagnostic events to stderr in JSON or pretty form.
// Dependencies: brp-gate-config, thiserror, tracing-subscriber
// ============================================================================

//! ## Overview
//! Diagnostic logs go to stderr through a `tracing-subscriber` registry.
//! `RUST_LOG` overrides the configured filter directive. Audit records never
//! flow through this path; they have their own sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;

use brp_gate_config::LogFormat;
use brp_gate_config::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Logging setup errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive did not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// A global subscriber is already installed.
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

// ============================================================================
// SECTION: Setup
// ============================================================================

/// Installs the global tracing subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or a subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_writer(io::stderr))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty().with_writer(io::stderr)).try_init(),
    };
    result.map_err(|err| TelemetryError::SubscriberInit(err.to_string()))
}

/// Builds the filter from `RUST_LOG`, falling back to the configured directive.
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|err| TelemetryError::Filter(err.to_string())),
    }
}
