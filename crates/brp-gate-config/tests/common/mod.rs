// crates/brp-gate-config/tests/common/mod.rs
// ============================================================================
// Module: Config Test Helpers
// Description: Shared builders for config and catalog tests.
// Purpose: Provide a minimal valid config and on-disk catalog fixtures.
// ============================================================================

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::fs;
use std::path::Path;

use brp_gate_config::ConfigError;
use brp_gate_config::GatewayConfig;

/// Result type used by config tests.
pub type TestResult = Result<(), String>;

/// Smallest configuration that passes validation.
pub const MINIMAL_TOML: &str = r#"
[auth]
jwks = '{"keys": []}'

[upstream]
base_url = "https://hc.example/haalcentraal/api/brp"
"#;

/// Parses a configuration document without validating it.
pub fn config_from_toml(text: &str) -> Result<GatewayConfig, String> {
    toml::from_str(text).map_err(|err| err.to_string())
}

/// Returns the minimal configuration.
pub fn minimal_config() -> Result<GatewayConfig, String> {
    config_from_toml(MINIMAL_TOML)
}

/// Asserts that a result is an error whose message contains `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error '{message}' did not contain '{needle}'"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

/// Writes a file, creating parent directories.
pub fn write_file(path: &Path, contents: &str) -> TestResult {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| err.to_string())?;
    }
    fs::write(path, contents).map_err(|err| err.to_string())
}

/// Writes a complete catalog for personen and reisdocumenten under `dir`.
pub fn write_catalog(dir: &Path) -> TestResult {
    write_file(
        &dir.join("schemas/personen.json"),
        r#"{
            "aNummer": "1234567890",
            "burgerservicenummer": "999990019",
            "geheimhoudingPersoonsgegevens": 0,
            "leeftijd": 42,
            "naam": {"voornamen": "Jan", "geslachtsnaam": "Jansen", "volledigeNaam": "Jan Jansen"},
            "verblijfplaats": {"verblijfadres": {"straat": "Amstel", "huisnummer": 1}}
        }"#,
    )?;
    write_file(
        &dir.join("dataset_fields/personen/benk-brp-gegevensset-1.txt"),
        "# identification\naNummer\nburgerservicenummer\ngeheimhoudingPersoonsgegevens\nleeftijd\nnaam.*\n",
    )?;
    write_file(
        &dir.join("dataset_fields/personen/benk-brp-gegevensset-9.txt"),
        "naam.volledigeNaam\nverblijfplaats\n",
    )?;
    write_file(
        &dir.join("fields/personen/Persoon.txt"),
        "aNummer\nburgerservicenummer\ngeheimhoudingPersoonsgegevens\nleeftijd\nnaam\nverblijfplaats\n",
    )?;
    write_file(
        &dir.join("fields/personen/PersoonBeperkt.txt"),
        "burgerservicenummer\ngeheimhoudingPersoonsgegevens\nleeftijd\nnaam.volledigeNaam\n",
    )?;
    write_file(
        &dir.join("schemas/reisdocumenten.json"),
        r#"{
            "reisdocumentnummer": "NW1234567",
            "soort": {"code": "PN", "omschrijving": "Nationaal paspoort"},
            "houder": {"burgerservicenummer": "999990019"}
        }"#,
    )?;
    write_file(
        &dir.join("dataset_fields/reisdocumenten/benk-brp-reisdocumenten-gegevensset-1.txt"),
        "reisdocumentnummer\nsoort.*\nhouder.burgerservicenummer\n",
    )
}
