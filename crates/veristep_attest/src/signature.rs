//! Signer/verifier capability interface and its backends.
//!
//! Two interchangeable instantiations: Ed25519 (asymmetric, key pair
//! exchanged out of band) and a BLAKE3 keyed MAC (symmetric, shared key).
//! Protocol code is written against the traits and never names a scheme.

use ed25519_dalek::Signature as DalekSignature;
use ed25519_dalek::Signer as DalekSigner;
use ed25519_dalek::SigningKey;
use ed25519_dalek::Verifier as DalekVerifier;
use ed25519_dalek::VerifyingKey;
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use veristep_core::wire::{Signature, SignatureScheme};

/// Capability to sign a response-binding message.
pub trait Attestor {
    /// Sign a message.
    fn sign(&self, message: &[u8]) -> Signature;
}

/// Capability to verify a response-binding signature.
///
/// Verification returns a boolean: a bad signature is a protocol outcome
/// for the caller to act on, never a crash.
pub trait AttestVerifier {
    /// Check a signature over a message.
    fn verify(&self, message: &[u8], signature: &Signature) -> bool;
}

/// Public key bytes for Ed25519 verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyBytes(pub [u8; 32]);

impl PublicKeyBytes {
    /// Create from bytes
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
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
    /// Returns error if hex is invalid
    pub fn from_hex(hex: &str) -> Result<Self, AttestError> {
        let bytes = hex::decode(hex).map_err(|_| AttestError::InvalidHex)?;
        if bytes.len() != 32 {
            return Err(AttestError::InvalidPublicKey);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

/// Ed25519 signing backend.
pub struct Ed25519Attestor {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl Ed25519Attestor {
    /// Create a new attestor with a random keypair
    #[must_use]
    pub fn new() -> Self {
        let mut rng = OsRng;
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        let signing_key = SigningKey::from_bytes(&bytes);
        let verifying_key = VerifyingKey::from(&signing_key);
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Create an attestor from a secret key
    ///
    /// # Errors
    ///
    /// Returns error if the secret key is not 32 bytes
    pub fn from_secret(secret: &[u8]) -> Result<Self, AttestError> {
        let bytes: [u8; 32] = secret
            .try_into()
            .map_err(|_| AttestError::InvalidSecretKey)?;
        let signing_key = SigningKey::from_bytes(&bytes);
        let verifying_key = VerifyingKey::from(&signing_key);
        Ok(Self {
            signing_key,
            verifying_key,
        })
    }

    /// Get the public key
    #[must_use]
    pub fn public_key(&self) -> PublicKeyBytes {
        PublicKeyBytes(self.verifying_key.to_bytes())
    }
}

impl Default for Ed25519Attestor {
    fn default() -> Self {
        Self::new()
    }
}

impl Attestor for Ed25519Attestor {
    fn sign(&self, message: &[u8]) -> Signature {
        let sig = self.signing_key.sign(message);
        Signature::ed25519(sig.to_bytes().to_vec())
    }
}

/// Ed25519 verification backend.
pub struct Ed25519Verifier {
    verifying_key: VerifyingKey,
}

impl Ed25519Verifier {
    /// Create a verifier from a public key
    ///
    /// # Errors
    ///
    /// Returns error if the public key is not a valid curve point
    pub fn new(public_key: PublicKeyBytes) -> Result<Self, AttestError> {
        let verifying_key =
            VerifyingKey::from_bytes(&public_key.0).map_err(|_| AttestError::InvalidPublicKey)?;
        Ok(Self { verifying_key })
    }
}

impl AttestVerifier for Ed25519Verifier {
    fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        if signature.scheme != SignatureScheme::Ed25519 {
            return false;
        }
        let Ok(sig) = DalekSignature::from_slice(&signature.bytes) else {
            return false;
        };
        self.verifying_key.verify(message, &sig).is_ok()
    }
}

/// BLAKE3 keyed-MAC backend.
///
/// Symmetric: the same shared key signs and verifies, so one value
/// implements both capabilities.
#[derive(Clone)]
pub struct MacAttestor {
    key: [u8; 32],
}

impl MacAttestor {
    /// Create from a shared 32-byte key
    #[must_use]
    pub const fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Create with a random key
    #[must_use]
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }
}

impl Attestor for MacAttestor {
    fn sign(&self, message: &[u8]) -> Signature {
        let tag = blake3::keyed_hash(&self.key, message);
        Signature::blake3_mac(tag.as_bytes().to_vec())
    }
}

impl AttestVerifier for MacAttestor {
    fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        if signature.scheme != SignatureScheme::Blake3Mac {
            return false;
        }
        let Ok(bytes) = <[u8; 32]>::try_from(signature.bytes.as_slice()) else {
            return false;
        };
        // blake3::Hash comparison is constant-time.
        blake3::keyed_hash(&self.key, message) == blake3::Hash::from(bytes)
    }
}

/// Attestation-related errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttestError {
    /// Invalid secret key
    #[error("invalid secret key")]
    InvalidSecretKey,
    /// Invalid public key
    #[error("invalid public key")]
    InvalidPublicKey,
    /// Invalid hex encoding
    #[error("invalid hex encoding")]
    InvalidHex,
}
