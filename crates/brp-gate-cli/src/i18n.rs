// crates/brp-gate-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Message catalog and translation utilities for the CLI.
// Purpose: Keep operator-facing strings in one place for English and Dutch.
// Dependencies: Standard library collections.
// ============================================================================

//! ## Overview
//! The `brp-gate` binary looks up every operator-facing string in a static
//! catalog through the [`t!`](crate::t) macro. The locale is chosen once at
//! startup from `--lang` or `BRP_GATE_LANG`.
//!
//! ## Invariants
//! - The locale is set at most once and read-only thereafter.
//! - Missing keys fall back to English and then to the key itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported CLI locales.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Locale {
    /// English (default).
    En,
    /// Dutch.
    Nl,
}

impl Locale {
    /// Returns the canonical locale label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Nl => "nl",
        }
    }

    /// Parses a locale value, ignoring case and region suffixes.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.split(['-', '_']).next() {
            Some("en") => Some(Self::En),
            Some("nl") => Some(Self::Nl),
            _ => None,
        }
    }
}

/// Ordered list of supported CLI locales.
pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::En, Locale::Nl];

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// Placeholder name without braces.
    pub key: &'static str,
    /// Value substituted for the placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`].
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Locale Selection
// ============================================================================

/// Global locale selection for CLI output.
static CURRENT_LOCALE: OnceLock<Locale> = OnceLock::new();

/// Sets the CLI locale. Only the first call wins.
pub fn set_locale(locale: Locale) {
    let _ = CURRENT_LOCALE.set(locale);
}

/// Returns the current CLI locale (defaults to English).
#[must_use]
pub fn current_locale() -> Locale {
    CURRENT_LOCALE.get().copied().unwrap_or(Locale::En)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// English catalog entries.
const CATALOG_EN: &[(&str, &str)] = &[
    ("main.version", "brp-gate {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("serve.config.load_failed", "Failed to load config: {error}"),
    ("serve.logging_failed", "Failed to initialize logging: {error}"),
    ("serve.init_failed", "Failed to initialize gateway: {error}"),
    ("serve.failed", "Gateway stopped with an error: {error}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.catalog_failed", "Failed to load field catalog: {error}"),
    ("config.keys_failed", "Failed to load tokenization keys: {error}"),
    ("config.auth_failed", "Failed to load token verification keys: {error}"),
    ("config.upstream_failed", "Failed to build upstream client: {error}"),
    ("config.validate.ok", "Config valid."),
    ("config.validate.bind", "- Listen address: {addr}"),
    ("config.validate.endpoint", "- Endpoint {path} -> {upstream} ({variants} request types)"),
    ("config.validate.keys", "- Tokenization keys: {count}"),
    ("config.validate.audit_disabled", "- Audit logging is disabled"),
    ("keys.count_invalid", "count must be between 1 and {max}."),
    ("i18n.lang.invalid_env", "Invalid value for {env}: {value}. Expected 'en' or 'nl'."),
];

/// Dutch catalog entries.
const CATALOG_NL: &[(&str, &str)] = &[
    ("main.version", "brp-gate {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "uitvoer"),
    ("output.write_failed", "Schrijven naar {stream} mislukt: {error}"),
    ("serve.config.load_failed", "Configuratie laden mislukt: {error}"),
    ("serve.logging_failed", "Logging initialiseren mislukt: {error}"),
    ("serve.init_failed", "Gateway initialiseren mislukt: {error}"),
    ("serve.failed", "Gateway gestopt met een fout: {error}"),
    ("config.load_failed", "Configuratie laden mislukt: {error}"),
    ("config.catalog_failed", "Veldencatalogus laden mislukt: {error}"),
    ("config.keys_failed", "Tokenisatiesleutels laden mislukt: {error}"),
    ("config.auth_failed", "Sleutels voor tokenverificatie laden mislukt: {error}"),
    ("config.upstream_failed", "Upstream-client opbouwen mislukt: {error}"),
    ("config.validate.ok", "Configuratie geldig."),
    ("config.validate.bind", "- Luisteradres: {addr}"),
    ("config.validate.endpoint", "- Endpoint {path} -> {upstream} ({variants} vraagtypen)"),
    ("config.validate.keys", "- Tokenisatiesleutels: {count}"),
    ("config.validate.audit_disabled", "- Auditlogging staat uit"),
    ("keys.count_invalid", "count moet tussen 1 en {max} liggen."),
    ("i18n.lang.invalid_env", "Ongeldige waarde voor {env}: {value}. Verwacht 'en' of 'nl'."),
];

/// Returns the message catalog for the requested locale.
fn catalog_for(locale: Locale) -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    static CATALOG_NL_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    match locale {
        Locale::En => CATALOG_EN_MAP.get_or_init(|| CATALOG_EN.iter().copied().collect()),
        Locale::Nl => CATALOG_NL_MAP.get_or_init(|| CATALOG_NL.iter().copied().collect()),
    }
}

/// Returns the catalog keys for `locale` in declaration order.
#[must_use]
pub fn catalog_keys(locale: Locale) -> Vec<&'static str> {
    let entries = match locale {
        Locale::En => CATALOG_EN,
        Locale::Nl => CATALOG_NL,
    };
    entries.iter().map(|(key, _)| *key).collect()
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` in the current locale, substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    translate_in(current_locale(), key, args)
}

/// Translates `key` in an explicit locale, substituting `args`.
#[must_use]
pub fn translate_in(locale: Locale, key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog_for(locale)
        .get(key)
        .copied()
        .or_else(|| catalog_for(Locale::En).get(key).copied())
        .unwrap_or(key);
    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
