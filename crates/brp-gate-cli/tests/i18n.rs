// crates/brp-gate-cli/tests/i18n.rs
// ============================================================================
// Module: CLI i18n Tests
// Description: Exercises the translation catalog and placeholder substitution.
// Purpose: Keep the English and Dutch catalogs in step.
// Dependencies: brp-gate-cli i18n module and the `t!` macro.
// ============================================================================

//! ## Overview
//! Validates the `brp-gate` message catalog:
//! - Both locales define the same keys.
//! - Translation falls back to the key on misses.
//! - The [`t!`](brp_gate_cli::t) macro substitutes named placeholders.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use brp_gate_cli::i18n::Locale;
use brp_gate_cli::i18n::MessageArg;
use brp_gate_cli::i18n::SUPPORTED_LOCALES;
use brp_gate_cli::i18n::catalog_keys;
use brp_gate_cli::i18n::translate;
use brp_gate_cli::i18n::translate_in;
use brp_gate_cli::t;

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Confirms every locale defines the same keys without duplicates.
#[test]
fn catalogs_define_identical_keys() {
    let english = catalog_keys(Locale::En);
    let reference: BTreeSet<_> = english.iter().copied().collect();
    assert_eq!(reference.len(), english.len());
    for locale in SUPPORTED_LOCALES {
        let keys = catalog_keys(*locale);
        let set: BTreeSet<_> = keys.iter().copied().collect();
        assert_eq!(set.len(), keys.len(), "duplicate key in {}", locale.as_str());
        assert_eq!(set, reference, "catalog mismatch for {}", locale.as_str());
    }
}

/// Confirms catalog entries resolve and replace placeholders.
#[test]
fn translate_substitutes_placeholders() {
    let args = vec![MessageArg::new("count", "2")];
    assert_eq!(translate_in(Locale::En, "config.validate.keys", args.clone()), "- Tokenization keys: 2");
    assert_eq!(translate_in(Locale::Nl, "config.validate.keys", args), "- Tokenisatiesleutels: 2");
}

/// Confirms missing keys fall back to the key string.
#[test]
fn translate_falls_back_to_key() {
    assert_eq!(translate("missing.key", Vec::new()), "missing.key");
}

/// Confirms locale labels parse back to the same locale.
#[test]
fn locale_labels_round_trip() {
    for locale in SUPPORTED_LOCALES {
        assert_eq!(Locale::parse(locale.as_str()), Some(*locale));
    }
    assert_eq!(Locale::parse("NL-be"), Some(Locale::Nl));
    assert_eq!(Locale::parse(""), None);
}

/// Confirms the t! macro formats named arguments.
#[test]
fn t_macro_formats_message() {
    let rendered = t!("main.version", version = "0.1.0");
    assert_eq!(rendered, "brp-gate 0.1.0");
}
