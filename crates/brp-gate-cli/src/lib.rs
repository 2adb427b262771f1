// crates/brp-gate-cli/src/lib.rs
// ============================================================================
// Module: BRP Gate CLI Library
// Description: Shared helpers for the `brp-gate` binary.
// Purpose: Expose the CLI message catalog to the binary and its tests.
// Dependencies: Standard library only.
// ============================================================================

//! ## Overview
//! The `brp-gate` binary routes every user-facing string through the
//! [`i18n`] catalog. The catalog lives in the library so integration tests
//! can check it without spawning the binary.

pub mod i18n;
