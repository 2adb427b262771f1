// crates/brp-gate-server/src/i18n.rs
// ============================================================================
// Module: Server Internationalization Helpers
// Description: Message catalogs for client-facing problem documents.
// Purpose: Keep client messages generic and localized per deployment.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! Problem documents returned to clients carry titles and details from a
//! small per-locale catalog. Dutch is the default; English is available.
//! The locale is chosen once per server from configuration and passed
//! explicitly, so handlers never depend on global state.
//!
//! ## Invariants
//! - Catalogs are initialized once and read-only thereafter.
//! - Missing keys fall back to Dutch and then to the key itself.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported client message locales.
///
/// # Invariants
/// - [`Locale::Nl`] is the default fallback locale.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Locale {
    /// Dutch (default).
    #[default]
    Nl,
    /// English.
    En,
}

impl Locale {
    /// Returns the canonical locale label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nl => "nl",
            Self::En => "en",
        }
    }

    /// Attempts to parse a locale value (case-insensitive, tolerant of region tags).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.split(['-', '_']).next().unwrap_or("") {
            "nl" => Some(Self::Nl),
            "en" => Some(Self::En),
            _ => None,
        }
    }
}

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"parameter"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Dutch catalog entries.
const CATALOG_NL: &[(&str, &str)] = &[
    ("problem.not_authenticated.title", "Niet ingelogd of ongeldig toegangstoken."),
    (
        "problem.not_authenticated.detail",
        "Stuur een geldig bearer token mee in de Authorization header.",
    ),
    ("problem.permission_denied.title", "Je hebt geen toegang tot deze functionaliteit."),
    (
        "problem.permission_denied.detail",
        "Je hebt onvoldoende rechten voor deze zoekvraag of deze gegevens.",
    ),
    ("problem.params_validation.title", "Een of meerdere parameters zijn niet correct."),
    ("problem.params_validation.unknown", "Onbekende parameter: {parameter}."),
    ("problem.params_validation.unsupported", "Ongeldige waarde voor {parameter}: {values}."),
    ("problem.params_validation.missing", "Verplichte parameter ontbreekt: {parameter}."),
    ("problem.params_validation.correlation", "Ongeldige X-Correlation-ID header."),
    ("problem.params_validation.remote", "De bron heeft het verzoek afgewezen."),
    ("problem.parse_error.title", "Het verzoek kon niet worden gelezen."),
    ("problem.parse_error.detail", "De body van het verzoek moet een JSON-object zijn."),
    ("problem.remote_denied.detail", "{status} from remote: {title}"),
    ("problem.not_found.title", "Niet gevonden."),
    ("problem.not_found.detail", "De opgevraagde gegevens zijn niet gevonden."),
    ("problem.upstream_error.title", "Fout bij het raadplegen van de bron."),
    ("problem.upstream_error.detail", "De bron gaf een onverwacht antwoord."),
    ("problem.upstream_timeout.title", "De bron reageerde niet op tijd."),
    ("problem.upstream_timeout.detail", "Probeer het later opnieuw."),
    ("problem.internal.title", "Interne fout."),
    ("problem.internal.detail", "Het verzoek kon niet worden verwerkt."),
];

/// English catalog entries.
const CATALOG_EN: &[(&str, &str)] = &[
    ("problem.not_authenticated.title", "Not authenticated or invalid access token."),
    (
        "problem.not_authenticated.detail",
        "Send a valid bearer token in the Authorization header.",
    ),
    ("problem.permission_denied.title", "You do not have permission to perform this action."),
    (
        "problem.permission_denied.detail",
        "You lack the permissions for this query or these fields.",
    ),
    ("problem.params_validation.title", "One or more parameters are invalid."),
    ("problem.params_validation.unknown", "Unknown parameter: {parameter}."),
    ("problem.params_validation.unsupported", "Unsupported value for {parameter}: {values}."),
    ("problem.params_validation.missing", "Missing required parameter: {parameter}."),
    ("problem.params_validation.correlation", "Invalid X-Correlation-ID header."),
    ("problem.params_validation.remote", "The upstream registry rejected the request."),
    ("problem.parse_error.title", "Malformed request."),
    ("problem.parse_error.detail", "The request body must be a JSON object."),
    ("problem.remote_denied.detail", "{status} from remote: {title}"),
    ("problem.not_found.title", "Not found."),
    ("problem.not_found.detail", "The requested data was not found."),
    ("problem.upstream_error.title", "Error while contacting the upstream registry."),
    ("problem.upstream_error.detail", "The upstream registry returned an unexpected answer."),
    ("problem.upstream_timeout.title", "The upstream registry did not respond in time."),
    ("problem.upstream_timeout.detail", "Please try again later."),
    ("problem.internal.title", "Internal server error."),
    ("problem.internal.detail", "The request could not be processed."),
];

/// Returns the message catalog for the requested locale.
fn catalog_for(locale: Locale) -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_NL_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    match locale {
        Locale::Nl => CATALOG_NL_MAP.get_or_init(|| CATALOG_NL.iter().copied().collect()),
        Locale::En => CATALOG_EN_MAP.get_or_init(|| CATALOG_EN.iter().copied().collect()),
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` for `locale` while substituting `args`.
#[must_use]
pub fn translate(locale: Locale, key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog_for(locale)
        .get(key)
        .copied()
        .or_else(|| catalog_for(Locale::Nl).get(key).copied())
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

/// Formats a localized message from a locale, key, and named arguments.
///
/// # Arguments
///
/// - `$locale` selects the catalog.
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($locale:expr, $key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($locale, $key, args)
    }};
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Verifies both catalogs define the same keys.
    #[test]
    fn catalogs_share_keys() {
        let mut nl: Vec<&str> = CATALOG_NL.iter().map(|(key, _)| *key).collect();
        let mut en: Vec<&str> = CATALOG_EN.iter().map(|(key, _)| *key).collect();
        nl.sort_unstable();
        en.sort_unstable();
        assert_eq!(nl, en);
    }

    /// Verifies placeholders are substituted per locale.
    #[test]
    fn translate_substitutes_placeholders() {
        let message = crate::t!(Locale::En, "problem.params_validation.unknown", parameter = "x");
        assert_eq!(message, "Unknown parameter: x.");
        let message = crate::t!(Locale::Nl, "problem.params_validation.unknown", parameter = "x");
        assert_eq!(message, "Onbekende parameter: x.");
    }

    /// Verifies locale parsing tolerates region tags.
    #[test]
    fn parse_accepts_region_tags() {
        assert_eq!(Locale::parse("nl-NL"), Some(Locale::Nl));
        assert_eq!(Locale::parse("EN_gb"), Some(Locale::En));
        assert_eq!(Locale::parse("de"), None);
    }
}
