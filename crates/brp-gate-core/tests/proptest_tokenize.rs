// crates/brp-gate-core/tests/proptest_tokenize.rs
// ============================================================================
// Module: Tokenization Property-Based Tests
// Description: Property tests for the correlation-scoped identifier cipher.
// Purpose: Check round trips, correlation binding, and key rotation.
// Dependencies: brp-gate-core, proptest
// ============================================================================

//! ## Overview
//! Tokens must round-trip under the minting correlation id, must never
//! decrypt to any value under a different one, and must stay readable after
//! a new key is prepended.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use brp_gate_core::CorrelationId;
use brp_gate_core::IdentifierCipher;
use brp_gate_core::TokenError;
use proptest::prelude::*;

proptest! {
    /// Verifies a token decrypts to the original under the same correlation id.
    #[test]
    fn round_trip_under_same_correlation(
        key in any::<[u8; 32]>(),
        bsn in "[0-9]{9}",
        correlation in "[A-Za-z0-9-]{1,64}",
    ) {
        let cipher = IdentifierCipher::new(&[key]).unwrap();
        let correlation = CorrelationId::new(correlation);
        let token = cipher.encrypt(&bsn, &correlation).unwrap();
        prop_assert_ne!(&token, &bsn);
        prop_assert_eq!(cipher.decrypt(&token, &correlation).unwrap(), bsn);
    }

    /// Verifies a different correlation id is refused, never misread.
    #[test]
    fn other_correlation_is_refused(
        key in any::<[u8; 32]>(),
        bsn in "[0-9]{9}",
        minted in "[a-z]{1,16}",
        used in "[a-z]{1,16}",
    ) {
        prop_assume!(minted != used);
        let cipher = IdentifierCipher::new(&[key]).unwrap();
        let token = cipher.encrypt(&bsn, &CorrelationId::new(minted)).unwrap();
        prop_assert_eq!(
            cipher.decrypt(&token, &CorrelationId::new(used)),
            Err(TokenError::Undecryptable)
        );
    }

    /// Verifies tokens minted with an older key still decrypt after rotation.
    #[test]
    fn rotated_keys_still_decrypt(
        old in any::<[u8; 32]>(),
        new in any::<[u8; 32]>(),
        bsn in "[0-9]{9}",
    ) {
        prop_assume!(old != new);
        let correlation = CorrelationId::new("rotation");
        let before = IdentifierCipher::new(&[old]).unwrap();
        let token = before.encrypt(&bsn, &correlation).unwrap();

        let after = IdentifierCipher::new(&[new, old]).unwrap();
        prop_assert_eq!(after.decrypt(&token, &correlation).unwrap(), bsn.clone());
        prop_assert_ne!(after.encrypt(&bsn, &correlation).unwrap(), token);
    }
}
