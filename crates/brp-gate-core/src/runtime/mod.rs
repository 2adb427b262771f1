// crates/brp-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: BRP Gate Runtime
// Description: Request pipeline, response transforms, and identifier tokenization.
// Purpose: Execute the per-request flow over the immutable core configuration.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Runtime modules own everything that happens per request. Stages in
//! [`transform`] and [`request`] are pure; [`pipeline`] sequences them around
//! the upstream call and the audit sink.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod pipeline;
pub mod request;
pub mod tokenize;
pub mod transform;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use pipeline::PipelineError;
pub use pipeline::Principal;
pub use pipeline::ProxyPipeline;
pub use pipeline::ProxyRequest;
pub use pipeline::ProxyResponse;
pub use pipeline::TokenDenial;
pub use tokenize::IdentifierCipher;
pub use tokenize::KEY_LENGTH;
pub use tokenize::TokenError;
pub use tokenize::encode_key;
