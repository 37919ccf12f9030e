//! VERISTEP Core Primitives
//!
//! Commitment primitives and shared protocol vocabulary for the
//! commit-then-audit protocol: digests, logit quantization, Merkle
//! transcripts, challenge selection, identifiers, and wire schemas.
//! Pure types and logic with no I/O.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod artifact;
pub mod challenge;
pub mod digest;
pub mod encoding;
pub mod id;
pub mod merkle;
pub mod quantize;
pub mod wire;

// Re-exports
pub use artifact::{output_hash, StepArtifact};
pub use challenge::{
    derive_seed, select_indices, ChallengePolicy, ChallengeSeed, OsBeacon, RandomnessBeacon,
    SeededBeacon,
};
pub use digest::{Digest, DigestError};
pub use id::{JobId, ModelIdentity, Nonce};
pub use merkle::{MerklePath, MerkleTree, PathEntry, Side};
pub use quantize::{QuantizedVector, DEFAULT_PRECISION_BITS, MAX_PRECISION_BITS};
pub use wire::{
    AuditChallenge, AuditProof, GenerationParams, Job, Response, SamplingPolicy, Signature,
    SignatureScheme, StepReveal,
};
