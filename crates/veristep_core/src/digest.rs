//! Cryptographic digests for transcript commitments.
//!
//! Uses BLAKE3 for all hashing operations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A BLAKE3 digest (256 bits / 32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest([u8; 32]);

impl Digest {
    /// The number of bytes in a digest
    pub const LEN: usize = 32;

    /// Compute BLAKE3 digest of data
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// The all-zero digest
    #[must_use]
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Create from bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get as bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string
    ///
    /// # Errors
    ///
    /// Returns error if hex is invalid or not 32 bytes
    pub fn from_hex(hex: &str) -> Result<Self, DigestError> {
        let bytes = hex::decode(hex).map_err(|_| DigestError::InvalidHex)?;
        if bytes.len() != 32 {
            return Err(DigestError::InvalidLength(bytes.len()));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Check if digest matches data
    #[must_use]
    pub fn verify(&self, data: &[u8]) -> bool {
        Self::compute(data) == *self
    }

    /// Combine with another digest (for Merkle node hashing)
    ///
    /// Computes: blake3(self || other)
    #[must_use]
    pub fn combine(&self, other: &Digest) -> Self {
        let mut combined = [0u8; 64];
        combined[0..32].copy_from_slice(&self.0);
        combined[32..64].copy_from_slice(&other.0);
        Self::compute(&combined)
    }
}

impl Default for Digest {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<&[u8; 32]> for Digest {
    fn from(bytes: &[u8; 32]) -> Self {
        Self(*bytes)
    }
}

/// Digest-related errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DigestError {
    /// Invalid hex encoding
    #[error("invalid hex encoding")]
    InvalidHex,
    /// Invalid length (not 32 bytes)
    #[error("invalid digest length: {0} (expected 32)")]
    InvalidLength(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_compute() {
        let data = b"hello world";
        let digest = Digest::compute(data);
        assert_eq!(digest.to_hex().len(), 64); // 32 bytes = 64 hex chars
    }

    #[test]
    fn test_digest_from_to_hex() {
        let digest = Digest::compute(b"test");
        let hex = digest.to_hex();
        let restored = Digest::from_hex(&hex).unwrap();
        assert_eq!(digest, restored);
    }

    #[test]
    fn test_digest_verify() {
        let data = b"test data";
        let digest = Digest::compute(data);
        assert!(digest.verify(data));
        assert!(!digest.verify(b"other data"));
    }

    #[test]
    fn test_digest_combine_deterministic() {
        let d1 = Digest::compute(b"left");
        let d2 = Digest::compute(b"right");

        let combined = d1.combine(&d2);
        assert_ne!(combined, d1);
        assert_ne!(combined, d2);
        assert_eq!(combined, d1.combine(&d2));
    }

    #[test]
    fn test_digest_combine_order_matters() {
        let d1 = Digest::compute(b"left");
        let d2 = Digest::compute(b"right");
        assert_ne!(d1.combine(&d2), d2.combine(&d1));
    }

    #[test]
    fn test_digest_from_hex_invalid() {
        assert!(matches!(Digest::from_hex("zz"), Err(DigestError::InvalidHex)));
        assert!(matches!(
            Digest::from_hex("abcd"),
            Err(DigestError::InvalidLength(2))
        ));
    }
}
