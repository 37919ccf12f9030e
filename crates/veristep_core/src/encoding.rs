//! Canonical byte encoding for hashed and signed payloads.
//!
//! Every byte string that feeds a digest or a signature is assembled here
//! with explicit length-prefixed little-endian framing. Wire messages use
//! serde; commitments never do. Derived serialization is not stable enough
//! to hash.

use crate::digest::Digest;

/// Domain tag prefixed to the output-token hash input.
pub const OUTPUT_HASH_TAG: &[u8] = b"VERISTEP/OUTPUT/V1";

/// Append a length-prefixed byte string (u32 little-endian length).
pub fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    put_u32(buf, bytes.len() as u32);
    buf.extend_from_slice(bytes);
}

/// Append a u32 in little-endian order.
pub fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Append a u64 in little-endian order.
pub fn put_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Hash an output token sequence.
///
/// Encoding: domain tag (length-prefixed), token count, then each token
/// little-endian.
#[must_use]
pub fn hash_output_tokens(tokens: &[u32]) -> Digest {
    let mut buf = Vec::with_capacity(OUTPUT_HASH_TAG.len() + 8 + tokens.len() * 4);
    put_bytes(&mut buf, OUTPUT_HASH_TAG);
    put_u32(&mut buf, tokens.len() as u32);
    for &token in tokens {
        put_u32(&mut buf, token);
    }
    Digest::compute(&buf)
}
