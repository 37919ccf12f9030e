//! VERISTEP Response Attestation
//!
//! Binds a provider's claimed model identity, transcript root, and output to
//! a signature, and verifies that binding on the router side. The signing
//! primitive is a capability interface: a symmetric MAC and an asymmetric
//! Ed25519 backend both satisfy it, and protocol code never depends on which
//! one is configured.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binding;
pub mod signature;

// Re-exports
pub use binding::ResponseBinding;
pub use signature::{
    AttestError, AttestVerifier, Attestor, Ed25519Attestor, Ed25519Verifier, MacAttestor,
    PublicKeyBytes,
};
