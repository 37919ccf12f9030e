//! Transport-agnostic wire message schemas.
//!
//! Field sets for the four protocol messages exchanged between Router and
//! Provider. Every message is self-describing via its `job_id`; transport,
//! framing, and delivery are out of scope.

use crate::digest::Digest;
use crate::id::{JobId, ModelIdentity, Nonce};
use crate::merkle::MerklePath;
use crate::quantize::QuantizedVector;
use serde::{Deserialize, Serialize};

/// Generation parameters forwarded to the inference engine.
///
/// The protocol itself consults only `temperature` (to derive the sampling
/// policy an audit checks tokens against); the rest rides along opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Maximum number of generation steps.
    pub max_steps: u32,
    /// Sampling temperature; zero means greedy decoding.
    pub temperature: f32,
    /// Nucleus sampling threshold.
    pub top_p: f32,
}

impl GenerationParams {
    /// The sampling policy an audit holds revealed tokens to.
    #[must_use]
    pub fn sampling_policy(&self) -> SamplingPolicy {
        if self.temperature <= 0.0 {
            SamplingPolicy::Greedy
        } else {
            SamplingPolicy::Stochastic
        }
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_steps: 64,
            temperature: 0.0,
            top_p: 1.0,
        }
    }
}

/// How sampled tokens are checked against revealed distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingPolicy {
    /// Temperature zero: the token must be the arg-max of the distribution.
    Greedy,
    /// Temperature above zero: the token must lie inside the vocabulary;
    /// the committed distribution is the cached one, never recomputed.
    Stochastic,
}

/// A job issued by the Router.
///
/// Immutable once issued; retired after finalization or timeout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub job_id: JobId,
    /// Anti-replay nonce, consumed at most once.
    pub nonce: Nonce,
    /// Prompt text handed to the engine.
    pub prompt: String,
    /// Generation parameters.
    pub params: GenerationParams,
    /// The model the Router expects the Provider to run.
    pub expected_model_identity: ModelIdentity,
}

/// Signature scheme tag carried alongside signature bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureScheme {
    /// Ed25519 asymmetric signature.
    Ed25519,
    /// BLAKE3 keyed-MAC over a shared key.
    Blake3Mac,
}

/// A signature over the response binding.
///
/// Plain data; producing and checking it is the attestation layer's job.
/// The protocol only requires unforgeability relative to whichever key
/// material Router and Provider exchanged out of band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Signature scheme used.
    pub scheme: SignatureScheme,
    /// Signature bytes.
    pub bytes: Vec<u8>,
}

impl Signature {
    /// Create a new signature
    #[must_use]
    pub fn new(scheme: SignatureScheme, bytes: Vec<u8>) -> Self {
        Self { scheme, bytes }
    }

    /// Create an Ed25519 signature
    #[must_use]
    pub fn ed25519(bytes: Vec<u8>) -> Self {
        Self {
            scheme: SignatureScheme::Ed25519,
            bytes,
        }
    }

    /// Create a BLAKE3 keyed-MAC signature
    #[must_use]
    pub fn blake3_mac(bytes: Vec<u8>) -> Self {
        Self {
            scheme: SignatureScheme::Blake3Mac,
            bytes,
        }
    }

    /// Get the signature bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// The Provider's committed answer to a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// The job this response answers.
    pub job_id: JobId,
    /// Generated tokens in order; one per committed step.
    pub output_tokens: Vec<u32>,
    /// Hash of the output token sequence.
    pub output_hash: Digest,
    /// Merkle root over the step-artifact leaves.
    pub transcript_root: Digest,
    /// Identity of the model the Provider actually ran.
    pub model_identity: ModelIdentity,
    /// Signature over the response binding (includes the job nonce).
    pub signature: Signature,
}

/// Audit challenge issued by the Router after verifying a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditChallenge {
    /// The job being audited.
    pub job_id: JobId,
    /// Challenged step indices, sorted ascending, no duplicates.
    pub challenge_indices: Vec<u64>,
    /// Router randomness mixed into the challenge seed, disclosed so any
    /// party can recompute `seed = H(root || randomness)`.
    pub router_randomness: [u8; 32],
}

/// One challenged step's reveal: the quantized output, the token, and the
/// authentication path to the committed root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReveal {
    /// The challenged step index.
    pub step_index: u64,
    /// The quantized distribution the provider committed at this step.
    pub quantized_output: QuantizedVector,
    /// The token the provider sampled at this step.
    pub sampled_token: u32,
    /// Authentication path from the step's leaf to the transcript root.
    pub merkle_path: MerklePath,
}

/// The Provider's answer to an audit challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditProof {
    /// The job being audited.
    pub job_id: JobId,
    /// One reveal per challenged index, in challenge order.
    pub reveals: Vec<StepReveal>,
}
