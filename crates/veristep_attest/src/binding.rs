//! Canonical signing payload for a job response.

use veristep_core::digest::Digest;
use veristep_core::encoding::put_bytes;
use veristep_core::id::{JobId, ModelIdentity, Nonce};

/// Domain tag for the response binding.
const BINDING_TAG: &[u8] = b"VERISTEP/RESPONSE/V1";

/// The fields a response signature covers.
///
/// The message is the domain tag followed by every field length-prefixed,
/// so no concatenation of two honest messages is itself a valid message and
/// no pair of fields can be swapped without changing the bytes. The nonce
/// ties the signature to a single job issuance (anti-replay).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseBinding {
    /// Identity of the model the provider claims to have run.
    pub model_identity: ModelIdentity,
    /// Merkle root of the committed transcript.
    pub transcript_root: Digest,
    /// Hash of the output token sequence.
    pub output_hash: Digest,
    /// The job being answered.
    pub job_id: JobId,
    /// The job's anti-replay nonce.
    pub nonce: Nonce,
}

impl ResponseBinding {
    /// Assemble the canonical message bytes to sign or verify.
    #[must_use]
    pub fn message_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(BINDING_TAG.len() + 32 + 32 + 32 + 16 + 16 + 24);
        put_bytes(&mut buf, BINDING_TAG);
        put_bytes(&mut buf, self.model_identity.as_bytes());
        put_bytes(&mut buf, self.transcript_root.as_bytes());
        put_bytes(&mut buf, self.output_hash.as_bytes());
        put_bytes(&mut buf, self.job_id.as_bytes());
        put_bytes(&mut buf, self.nonce.as_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding() -> ResponseBinding {
        ResponseBinding {
            model_identity: ModelIdentity::from_label("model-a"),
            transcript_root: Digest::compute(b"root"),
            output_hash: Digest::compute(b"output"),
            job_id: JobId::from_bytes([1u8; 16]),
            nonce: Nonce::from_bytes([2u8; 16]),
        }
    }

    #[test]
    fn test_message_deterministic() {
        assert_eq!(binding().message_bytes(), binding().message_bytes());
    }

    #[test]
    fn test_message_binds_every_field() {
        let base = binding().message_bytes();

        let mut b = binding();
        b.model_identity = ModelIdentity::from_label("model-b");
        assert_ne!(base, b.message_bytes());

        let mut b = binding();
        b.transcript_root = Digest::compute(b"other root");
        assert_ne!(base, b.message_bytes());

        let mut b = binding();
        b.output_hash = Digest::compute(b"other output");
        assert_ne!(base, b.message_bytes());

        let mut b = binding();
        b.job_id = JobId::from_bytes([9u8; 16]);
        assert_ne!(base, b.message_bytes());

        let mut b = binding();
        b.nonce = Nonce::from_bytes([9u8; 16]);
        assert_ne!(base, b.message_bytes());
    }

    #[test]
    fn test_field_swap_changes_message() {
        // transcript_root and output_hash have the same width; the length
        // prefix alone would not distinguish them, their position does.
        let mut swapped = binding();
        std::mem::swap(&mut swapped.transcript_root, &mut swapped.output_hash);
        assert_ne!(binding().message_bytes(), swapped.message_bytes());
    }
}
