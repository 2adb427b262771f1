// crates/brp-gate-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and command helpers.
// Purpose: Check locale resolution, key generation, and config validation.
// Dependencies: brp-gate-cli main helpers
// ============================================================================

//! ## Overview
//! Exercises the command helpers directly, without spawning the binary.
//!
//! Security posture: generated keys feed identifier tokenization and must be
//! random and in the format the gateway loads.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions use unwrap/expect and Debug output for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use brp_gate_core::IdentifierCipher;
use brp_gate_core::runtime::encode_key;
use clap::Parser;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::KeysCommand;
use super::LangArg;
use super::Locale;
use super::MAX_GENERATED_KEYS;
use super::generate_keys;
use super::resolve_locale;
use super::validate_config;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the workspace root.
fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Writes a config file using `keys` and returns its path.
fn write_config(dir: &Path, keys: &[String]) -> PathBuf {
    let root = workspace_root();
    let jwks = root.join("crates").join("brp-gate-server").join("tests").join("fixtures");
    let keys = keys.iter().map(|key| format!("\"{key}\"")).collect::<Vec<_>>().join(", ");
    let content = format!(
        r#"
[server]
bind = "127.0.0.1:8080"
public_base_url = "https://gateway.example"

[auth]
jwks_path = '{jwks}'
issuer = "https://login.example/tenant/v2.0"
audience = "api://brp-gate"

[upstream]
base_url = "https://haalcentraal.example/haalcentraal/api"

[tokenization]
keys = [{keys}]

[catalog]
dir = '{catalog}'

[audit]
enabled = false
"#,
        jwks = jwks.join("test_jwks.json").display(),
        catalog = root.join("config").display(),
    );
    let path = dir.join("brp-gate.toml");
    fs::write(&path, content).unwrap();
    path
}

// ============================================================================
// SECTION: Locale
// ============================================================================

/// Verifies the flag wins over the environment.
#[test]
fn resolve_locale_prefers_flag_over_env() {
    assert_eq!(resolve_locale(Some(LangArg::En), Some("nl")).unwrap(), Locale::En);
    assert_eq!(resolve_locale(None, Some("nl_NL")).unwrap(), Locale::Nl);
    assert_eq!(resolve_locale(None, None).unwrap(), Locale::En);
}

/// Verifies unsupported environment values are rejected.
#[test]
fn resolve_locale_rejects_unknown_env_value() {
    let err = resolve_locale(None, Some("fr")).unwrap_err();
    assert!(err.to_string().contains("BRP_GATE_LANG"));
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Verifies `config validate --config` parsing.
#[test]
fn parses_config_validate_with_path() {
    let cli = Cli::try_parse_from(["brp-gate", "config", "validate", "--config", "gate.toml"])
        .unwrap();
    let Some(Commands::Config {
        command: ConfigCommand::Validate(command),
    }) = cli.command
    else {
        panic!("expected config validate");
    };
    assert_eq!(command.config, Some(PathBuf::from("gate.toml")));
}

/// Verifies `keys generate` defaults to one key.
#[test]
fn parses_keys_generate_default_count() {
    let cli = Cli::try_parse_from(["brp-gate", "--lang", "nl", "keys", "generate"]).unwrap();
    assert!(matches!(cli.lang, Some(LangArg::Nl)));
    let Some(Commands::Keys {
        command: KeysCommand::Generate(command),
    }) = cli.command
    else {
        panic!("expected keys generate");
    };
    assert_eq!(command.count, 1);
}

/// Verifies unknown subcommands fail to parse.
#[test]
fn rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["brp-gate", "migrate"]).is_err());
}

// ============================================================================
// SECTION: Keys
// ============================================================================

/// Verifies generated keys are distinct and load into the cipher.
#[test]
fn generated_keys_load_into_cipher() {
    let keys = generate_keys(3).unwrap();
    assert_eq!(keys.len(), 3);
    assert_ne!(keys[0], keys[1]);
    assert_ne!(keys[1], keys[2]);
    let cipher = IdentifierCipher::from_encoded(&keys).unwrap();
    assert_eq!(cipher.key_count(), 3);
}

/// Verifies the key count bounds.
#[test]
fn generate_keys_bounds_count() {
    assert!(generate_keys(0).is_err());
    assert!(generate_keys(MAX_GENERATED_KEYS + 1).is_err());
    assert_eq!(generate_keys(MAX_GENERATED_KEYS).unwrap().len(), MAX_GENERATED_KEYS);
}

// ============================================================================
// SECTION: Config Validation
// ============================================================================

/// Verifies a valid config produces the summary lines.
#[test]
fn validate_config_summarizes_shipped_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let keys = vec![encode_key(&[1_u8; 32]), encode_key(&[2_u8; 32])];
    let path = write_config(dir.path(), &keys);

    let lines = validate_config(Some(&path)).unwrap();
    assert_eq!(lines[0], "Config valid.");
    assert_eq!(lines[1], "- Listen address: 127.0.0.1:8080");
    assert!(lines.iter().any(|line| line.starts_with("- Endpoint ")));
    assert!(lines.contains(&"- Tokenization keys: 2".to_string()));
    assert!(lines.contains(&"- Audit logging is disabled".to_string()));
}

/// Verifies malformed tokenization keys are reported.
#[test]
fn validate_config_reports_malformed_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), &["not-a-key".to_string()]);
    let err = validate_config(Some(&path)).unwrap_err();
    assert!(err.to_string().starts_with("Failed to load tokenization keys"), "{err}");
}

/// Verifies a missing config file is reported.
#[test]
fn validate_config_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = validate_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(err.to_string().starts_with("Failed to load config"), "{err}");
}
