//! Transcript building: from step stream to sealed Merkle commitment.
//!
//! The builder quantizes and digests each step as it arrives and retains
//! the quantized vectors - those exact vectors are what an audit later
//! reveals, so audits stay independent of sampling determinism. The Merkle
//! root exists only after `seal`; no partial root is ever disclosed.

use crate::engine::StepRecord;
use veristep_core::artifact::StepArtifact;
use veristep_core::digest::Digest;
use veristep_core::merkle::MerkleTree;
use veristep_core::quantize::QuantizedVector;
use veristep_core::wire::StepReveal;

/// Transcript-construction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscriptError {
    /// Steps must arrive in execution order without gaps.
    #[error("step out of order: expected index {expected}, got {got}")]
    StepOutOfOrder {
        /// The index the builder expected next.
        expected: u64,
        /// The index the engine delivered.
        got: u64,
    },
    /// A zero-step transcript cannot be committed.
    #[error("cannot seal an empty transcript")]
    Empty,
}

/// Incremental transcript builder consuming an engine's step stream.
#[derive(Debug)]
pub struct TranscriptBuilder {
    precision_bits: u8,
    artifacts: Vec<StepArtifact>,
    quantized: Vec<QuantizedVector>,
}

impl TranscriptBuilder {
    /// Create a builder quantizing at the given precision.
    #[must_use]
    pub fn new(precision_bits: u8) -> Self {
        Self {
            precision_bits,
            artifacts: Vec::new(),
            quantized: Vec::new(),
        }
    }

    /// Ingest the next step: quantize, digest, append, retain.
    ///
    /// # Errors
    ///
    /// Returns [`TranscriptError::StepOutOfOrder`] if the record's index is
    /// not the next expected one.
    pub fn push_step(&mut self, record: &StepRecord) -> Result<(), TranscriptError> {
        let expected = self.artifacts.len() as u64;
        if record.step_index != expected {
            return Err(TranscriptError::StepOutOfOrder {
                expected,
                got: record.step_index,
            });
        }

        let quantized = QuantizedVector::quantize(&record.output_vector, self.precision_bits);
        self.artifacts.push(StepArtifact::new(
            record.step_index,
            quantized.digest(),
            record.sampled_token,
        ));
        self.quantized.push(quantized);
        Ok(())
    }

    /// Number of steps ingested so far.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.artifacts.len() as u64
    }

    /// Build the Merkle tree and fix the root.
    ///
    /// Consumes the builder: once sealed, no leaf can change.
    ///
    /// # Errors
    ///
    /// Returns [`TranscriptError::Empty`] if no steps were ingested.
    pub fn seal(self) -> Result<SealedTranscript, TranscriptError> {
        let leaves: Vec<Digest> = self.artifacts.iter().map(StepArtifact::leaf_digest).collect();
        let tree = MerkleTree::build(&leaves).ok_or(TranscriptError::Empty)?;
        Ok(SealedTranscript {
            artifacts: self.artifacts,
            quantized: self.quantized,
            tree,
        })
    }
}

/// A committed transcript: artifacts, retained quantized vectors, and the
/// Merkle tree over the artifact leaves. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct SealedTranscript {
    artifacts: Vec<StepArtifact>,
    quantized: Vec<QuantizedVector>,
    tree: MerkleTree,
}

impl SealedTranscript {
    /// The committed root.
    #[must_use]
    pub fn root(&self) -> Digest {
        self.tree.root()
    }

    /// Number of committed steps.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.artifacts.len() as u64
    }

    /// The committed step artifacts in order.
    #[must_use]
    pub fn artifacts(&self) -> &[StepArtifact] {
        &self.artifacts
    }

    /// The sampled tokens in order.
    #[must_use]
    pub fn output_tokens(&self) -> Vec<u32> {
        self.artifacts.iter().map(|a| a.sampled_token).collect()
    }

    /// Produce the audit reveal for one challenged step.
    ///
    /// Returns the cached quantized vector (never recomputed), the sampled
    /// token, and the authentication path. `None` if the index is out of
    /// range.
    #[must_use]
    pub fn reveal(&self, step_index: u64) -> Option<StepReveal> {
        let artifact = self.artifacts.get(step_index as usize)?;
        let merkle_path = self.tree.prove(step_index)?;
        Some(StepReveal {
            step_index,
            quantized_output: self.quantized[step_index as usize].clone(),
            sampled_token: artifact.sampled_token,
            merkle_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veristep_core::quantize::DEFAULT_PRECISION_BITS;

    fn record(i: u64, values: &[f32], token: u32) -> StepRecord {
        StepRecord {
            step_index: i,
            output_vector: values.to_vec(),
            sampled_token: token,
        }
    }

    fn sealed(n: u64) -> SealedTranscript {
        let mut builder = TranscriptBuilder::new(DEFAULT_PRECISION_BITS);
        for i in 0..n {
            builder
                .push_step(&record(i, &[i as f32, 1.0 - i as f32], (i % 3) as u32))
                .unwrap();
        }
        builder.seal().unwrap()
    }

    #[test]
    fn test_seal_empty_fails() {
        let builder = TranscriptBuilder::new(DEFAULT_PRECISION_BITS);
        assert_eq!(builder.seal().unwrap_err(), TranscriptError::Empty);
    }

    #[test]
    fn test_out_of_order_step_rejected() {
        let mut builder = TranscriptBuilder::new(DEFAULT_PRECISION_BITS);
        builder.push_step(&record(0, &[0.5], 0)).unwrap();
        let err = builder.push_step(&record(2, &[0.5], 0)).unwrap_err();
        assert_eq!(err, TranscriptError::StepOutOfOrder { expected: 1, got: 2 });
    }

    #[test]
    fn test_duplicate_step_rejected() {
        let mut builder = TranscriptBuilder::new(DEFAULT_PRECISION_BITS);
        builder.push_step(&record(0, &[0.5], 0)).unwrap();
        let err = builder.push_step(&record(0, &[0.5], 0)).unwrap_err();
        assert_eq!(err, TranscriptError::StepOutOfOrder { expected: 1, got: 0 });
    }

    #[test]
    fn test_root_deterministic_for_same_stream() {
        assert_eq!(sealed(8).root(), sealed(8).root());
        assert_ne!(sealed(8).root(), sealed(7).root());
    }

    #[test]
    fn test_reveals_verify_against_root() {
        let transcript = sealed(8);
        let root = transcript.root();
        for i in 0..8u64 {
            let reveal = transcript.reveal(i).unwrap();
            let leaf = StepArtifact::new(
                reveal.step_index,
                reveal.quantized_output.digest(),
                reveal.sampled_token,
            )
            .leaf_digest();
            assert!(reveal.merkle_path.verify(&root, &leaf, i, 8));
        }
    }

    #[test]
    fn test_reveal_out_of_range() {
        assert!(sealed(4).reveal(4).is_none());
    }

    #[test]
    fn test_output_tokens_follow_steps() {
        let transcript = sealed(5);
        assert_eq!(transcript.output_tokens(), vec![0, 1, 2, 0, 1]);
    }
}
