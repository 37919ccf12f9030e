//! Per-step transcript artifacts and their canonical leaf encoding.

use crate::digest::Digest;
use crate::encoding::{put_bytes, put_u32, put_u64};
use serde::{Deserialize, Serialize};

/// Domain tag for step-artifact leaf encoding.
const ARTIFACT_TAG: &[u8] = b"VERISTEP/STEP/V1";

/// Commitment record for one generation step.
///
/// One artifact per step, in execution order. The digest of its canonical
/// encoding is the Merkle leaf; during an audit the Router rebuilds the
/// artifact from the revealed output and recomputes the same leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepArtifact {
    /// Zero-based position in the generation sequence.
    pub step_index: u64,
    /// Digest of the quantized output-distribution vector.
    pub quantized_digest: Digest,
    /// Token the provider sampled at this step.
    pub sampled_token: u32,
}

impl StepArtifact {
    /// Create a new step artifact.
    #[must_use]
    pub const fn new(step_index: u64, quantized_digest: Digest, sampled_token: u32) -> Self {
        Self {
            step_index,
            quantized_digest,
            sampled_token,
        }
    }

    /// Canonical byte encoding: tag, index, quantized digest, token,
    /// each length-prefixed or fixed-width little-endian.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ARTIFACT_TAG.len() + 4 + 8 + 36 + 4);
        put_bytes(&mut buf, ARTIFACT_TAG);
        put_u64(&mut buf, self.step_index);
        put_bytes(&mut buf, self.quantized_digest.as_bytes());
        put_u32(&mut buf, self.sampled_token);
        buf
    }

    /// The Merkle leaf digest for this artifact.
    #[must_use]
    pub fn leaf_digest(&self) -> Digest {
        Digest::compute(&self.encode())
    }
}

/// Hash an output token sequence for the response binding.
///
/// Re-exported here next to the artifact encoding so both canonical forms
/// live in one place for reviewers of the commitment format.
#[must_use]
pub fn output_hash(tokens: &[u32]) -> Digest {
    crate::encoding::hash_output_tokens(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> StepArtifact {
        StepArtifact::new(4, Digest::compute(b"quantized"), 17)
    }

    #[test]
    fn test_leaf_digest_deterministic() {
        assert_eq!(artifact().leaf_digest(), artifact().leaf_digest());
    }

    #[test]
    fn test_leaf_digest_binds_every_field() {
        let base = artifact();

        let mut other = base;
        other.step_index = 5;
        assert_ne!(base.leaf_digest(), other.leaf_digest());

        let mut other = base;
        other.sampled_token = 18;
        assert_ne!(base.leaf_digest(), other.leaf_digest());

        let mut other = base;
        other.quantized_digest = Digest::compute(b"different");
        assert_ne!(base.leaf_digest(), other.leaf_digest());
    }

    #[test]
    fn test_serde_roundtrip() {
        let a = artifact();
        let json = serde_json::to_string(&a).unwrap();
        let restored: StepArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(a, restored);
        assert_eq!(a.leaf_digest(), restored.leaf_digest());
    }
}
