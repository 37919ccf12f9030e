//! Identifiers for protocol entities.
//!
//! Job and nonce identifiers are UUIDs serialized in canonical format.
//! Model identities are opaque 32-byte tokens supplied by the caller.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Job identifier - unique per issued job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Create a new random JobId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from UUID bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get as bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job_{}", self.0)
    }
}

/// Per-job nonce - consumed at most once, prevents response replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nonce(Uuid);

impl Nonce {
    /// Create a new random Nonce
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from UUID bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get as bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for Nonce {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nonce_{}", self.0)
    }
}

/// Opaque token identifying a model + weight version.
///
/// The core never inspects how the token was derived; equality comparison
/// against the expected identity is the sole operation it performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelIdentity([u8; 32]);

impl ModelIdentity {
    /// The number of bytes in an identity token
    pub const LEN: usize = 32;

    /// Create from bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive an identity token from a human-readable label.
    ///
    /// Convenience for tests and operators; this is a naming scheme, not
    /// weight hashing.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        Self(*blake3::hash(label.as_bytes()).as_bytes())
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
    pub fn from_hex(hex: &str) -> Result<Self, crate::digest::DigestError> {
        let digest = crate::digest::Digest::from_hex(hex)?;
        Ok(Self(*digest.as_bytes()))
    }
}

impl fmt::Display for ModelIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model_{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation() {
        assert_ne!(JobId::new(), JobId::new());
        assert_ne!(Nonce::new(), Nonce::new());
    }

    #[test]
    fn test_id_from_bytes() {
        let bytes = [1u8; 16];
        let id = JobId::from_bytes(bytes);
        assert_eq!(id.as_bytes(), &bytes);
    }

    #[test]
    fn test_id_display() {
        assert!(format!("{}", JobId::new()).starts_with("job_"));
        assert!(format!("{}", Nonce::new()).starts_with("nonce_"));
    }

    #[test]
    fn test_model_identity_from_label() {
        let a = ModelIdentity::from_label("qwen3-4b-4bit");
        let b = ModelIdentity::from_label("qwen3-4b-4bit");
        let c = ModelIdentity::from_label("qwen3-0.6b-4bit");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_model_identity_hex_roundtrip() {
        let id = ModelIdentity::from_label("some model");
        let restored = ModelIdentity::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, restored);
    }
}
