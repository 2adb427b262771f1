// crates/brp-gate-core/src/runtime/tokenize.rs
// ============================================================================
// Module: BRP Gate Identifier Tokenization
// Description: Correlation-scoped, reversible tokens for citizen service numbers.
// Purpose: Let identifiers round-trip within one call chain and nowhere else.
// Dependencies: base64, hmac, sha2, subtle, thiserror
// ============================================================================

//! ## Overview
//! [`IdentifierCipher`] turns an identifier into an opaque token and back.
//! The construction is a deterministic SIV built from HMAC-SHA256:
//! - two subkeys (encryption and authentication) are derived from each
//!   configured 32-byte key,
//! - a 16-byte tag authenticates the correlation id and the plaintext,
//! - the tag seeds an HMAC keystream that masks the plaintext.
//!
//! Tokens are `base64url(version || tag || ciphertext)` without padding.
//! The first key encrypts; decryption tries each key in order. A token only
//! decrypts under the correlation id it was minted with.
//!
//! Security posture: tokens and correlation ids are untrusted input; tag
//! comparison is constant-time. See `Docs/security/threat_model.md`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::Hmac;
use hmac::Mac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::core::identifiers::CorrelationId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Required raw key length in bytes.
pub const KEY_LENGTH: usize = 32;

/// Maximum accepted token length in characters.
pub const MAX_TOKEN_LENGTH: usize = 512;

/// Maximum accepted plaintext length in bytes.
pub const MAX_PLAINTEXT_LENGTH: usize = 256;

/// Authentication tag length in bytes.
const TAG_LENGTH: usize = 16;

/// Token format version.
const TOKEN_VERSION: u8 = 1;

/// Derivation label of the encryption subkey.
const ENCRYPTION_LABEL: &[u8] = b"brp-gate/enc";

/// Derivation label of the authentication subkey.
const AUTHENTICATION_LABEL: &[u8] = b"brp-gate/mac";

/// HMAC-SHA256 instance.
type HmacSha256 = Hmac<Sha256>;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Subkeys derived from one configured key.
struct KeyMaterial {
    /// Keystream subkey.
    encryption: [u8; KEY_LENGTH],
    /// Tag subkey.
    authentication: [u8; KEY_LENGTH],
}

impl KeyMaterial {
    /// Derives both subkeys from a raw key.
    fn derive(key: &[u8; KEY_LENGTH]) -> Result<Self, TokenError> {
        Ok(Self {
            encryption: hmac_sha256(key, &[ENCRYPTION_LABEL])?,
            authentication: hmac_sha256(key, &[AUTHENTICATION_LABEL])?,
        })
    }

    /// Computes the authentication tag for a plaintext in a correlation context.
    fn tag(&self, correlation: &CorrelationId, plaintext: &[u8]) -> Result<[u8; TAG_LENGTH], TokenError> {
        let correlation = correlation.as_str().as_bytes();
        let length = u64::try_from(correlation.len())
            .map_err(|_| TokenError::Malformed("correlation id too long".to_string()))?;
        let digest = hmac_sha256(
            &self.authentication,
            &[&length.to_be_bytes(), correlation, plaintext],
        )?;
        let mut tag = [0u8; TAG_LENGTH];
        tag.copy_from_slice(&digest[.. TAG_LENGTH]);
        Ok(tag)
    }

    /// XORs `data` with the keystream seeded by `tag`.
    fn apply_keystream(&self, tag: &[u8; TAG_LENGTH], data: &[u8]) -> Result<Vec<u8>, TokenError> {
        let mut out = Vec::with_capacity(data.len());
        for (index, chunk) in data.chunks(KEY_LENGTH).enumerate() {
            let counter = u32::try_from(index)
                .map_err(|_| TokenError::Malformed("token too long".to_string()))?;
            let block = hmac_sha256(&self.encryption, &[tag, &counter.to_be_bytes()])?;
            out.extend(chunk.iter().zip(block.iter()).map(|(byte, mask)| byte ^ mask));
        }
        Ok(out)
    }
}

/// Correlation-scoped identifier cipher with key rotation.
///
/// # Invariants
/// - Holds at least one key; the first key is used for encryption.
pub struct IdentifierCipher {
    /// Derived key material in rotation order.
    keys: Vec<KeyMaterial>,
}

impl fmt::Debug for IdentifierCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentifierCipher").field("keys", &self.keys.len()).finish()
    }
}

impl IdentifierCipher {
    /// Builds a cipher from raw keys, current key first.
    ///
    /// # Errors
    /// Returns [`TokenError::NoKeys`] when no key is given.
    pub fn new(keys: &[[u8; KEY_LENGTH]]) -> Result<Self, TokenError> {
        if keys.is_empty() {
            return Err(TokenError::NoKeys);
        }
        let keys = keys.iter().map(KeyMaterial::derive).collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            keys,
        })
    }

    /// Builds a cipher from URL-safe base64 keys, current key first.
    ///
    /// Padding is optional. Each key must decode to exactly 32 bytes.
    ///
    /// # Errors
    /// Returns [`TokenError::InvalidKey`] for a malformed key and
    /// [`TokenError::NoKeys`] when the list is empty.
    pub fn from_encoded<I, S>(encoded: I) -> Result<Self, TokenError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keys = Vec::new();
        for (index, key) in encoded.into_iter().enumerate() {
            keys.push(decode_key(key.as_ref()).map_err(|reason| {
                TokenError::InvalidKey(format!("key {index}: {reason}"))
            })?);
        }
        Self::new(&keys)
    }

    /// Returns the number of configured keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Tokenizes an identifier under a correlation id using the current key.
    ///
    /// # Errors
    /// Returns [`TokenError::Malformed`] when the plaintext exceeds
    /// [`MAX_PLAINTEXT_LENGTH`].
    pub fn encrypt(&self, plaintext: &str, correlation: &CorrelationId) -> Result<String, TokenError> {
        if plaintext.len() > MAX_PLAINTEXT_LENGTH {
            return Err(TokenError::Malformed("identifier too long".to_string()));
        }
        let key = self.keys.first().ok_or(TokenError::NoKeys)?;
        let tag = key.tag(correlation, plaintext.as_bytes())?;
        let ciphertext = key.apply_keystream(&tag, plaintext.as_bytes())?;
        let mut token = Vec::with_capacity(1 + TAG_LENGTH + ciphertext.len());
        token.push(TOKEN_VERSION);
        token.extend_from_slice(&tag);
        token.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(token))
    }

    /// Reverses a token minted under the same correlation id.
    ///
    /// # Errors
    /// Returns [`TokenError::Malformed`] for tokens that cannot be parsed and
    /// [`TokenError::Undecryptable`] when no key authenticates the token in
    /// this correlation context.
    pub fn decrypt(&self, token: &str, correlation: &CorrelationId) -> Result<String, TokenError> {
        if token.len() > MAX_TOKEN_LENGTH {
            return Err(TokenError::Malformed("token too long".to_string()));
        }
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| TokenError::Malformed("token is not base64url".to_string()))?;
        let Some((&version, rest)) = bytes.split_first() else {
            return Err(TokenError::Malformed("token is empty".to_string()));
        };
        if version != TOKEN_VERSION {
            return Err(TokenError::Malformed(format!("unsupported token version {version}")));
        }
        if rest.len() < TAG_LENGTH {
            return Err(TokenError::Malformed("token too short".to_string()));
        }
        let (tag_bytes, ciphertext) = rest.split_at(TAG_LENGTH);
        let mut tag = [0u8; TAG_LENGTH];
        tag.copy_from_slice(tag_bytes);

        for key in &self.keys {
            let plaintext = key.apply_keystream(&tag, ciphertext)?;
            let expected = key.tag(correlation, &plaintext)?;
            if bool::from(expected.as_slice().ct_eq(tag.as_slice())) {
                return String::from_utf8(plaintext)
                    .map_err(|_| TokenError::Malformed("identifier is not utf-8".to_string()));
            }
        }
        Err(TokenError::Undecryptable)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tokenization errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// No keys are configured.
    #[error("no tokenization keys configured")]
    NoKeys,
    /// A configured key is malformed.
    #[error("invalid tokenization key: {0}")]
    InvalidKey(String),
    /// A token or identifier has an invalid format.
    #[error("malformed token: {0}")]
    Malformed(String),
    /// No key authenticates the token in this correlation context.
    #[error("token cannot be decrypted in this correlation context")]
    Undecryptable,
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Computes HMAC-SHA256 over the concatenated parts.
fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Result<[u8; KEY_LENGTH], TokenError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|_| TokenError::InvalidKey("hmac rejected key".to_string()))?;
    for part in parts {
        mac.update(part);
    }
    let mut out = [0u8; KEY_LENGTH];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Decodes one URL-safe base64 key.
fn decode_key(encoded: &str) -> Result<[u8; KEY_LENGTH], String> {
    let trimmed = encoded.trim().trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(trimmed).map_err(|_| "not url-safe base64".to_string())?;
    <[u8; KEY_LENGTH]>::try_from(bytes.as_slice())
        .map_err(|_| format!("expected {KEY_LENGTH} bytes, got {}", bytes.len()))
}

/// Encodes a raw key in the configuration format.
#[must_use]
pub fn encode_key(key: &[u8; KEY_LENGTH]) -> String {
    URL_SAFE_NO_PAD.encode(key)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
