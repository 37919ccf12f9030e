//! Fixed-point quantization of output-distribution vectors.
//!
//! A provider commits to the hash of a *quantized* distribution so that a
//! later recomputation of the digest is a deterministic function of the
//! vector, tolerant of floating-point noise below the declared precision.
//! The precision is a configuration constant shared by Provider and Router;
//! vectors quantized at different precisions hash differently.

use crate::digest::Digest;
use crate::encoding::{put_u32, put_u64};
use serde::{Deserialize, Serialize};

/// Default fractional precision in bits (2^16 quantization steps per unit).
pub const DEFAULT_PRECISION_BITS: u8 = 16;

/// Maximum supported precision.
///
/// Bounded so the scale factor stays well inside f32's exact-integer range.
pub const MAX_PRECISION_BITS: u8 = 24;

/// Domain tag prefixed to the canonical encoding.
const QVEC_TAG: &[u8; 4] = b"VSQ1";

/// A distribution vector reduced to fixed-point cells at a declared precision.
///
/// Two executions of the same deterministic computation produce byte-identical
/// quantized vectors, so their digests match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantizedVector {
    precision_bits: u8,
    cells: Vec<i32>,
}

impl QuantizedVector {
    /// Quantize a real-valued vector at the given precision.
    ///
    /// Each value is mapped to `round(x * 2^precision_bits)`, saturating at
    /// the i32 range. Precisions above [`MAX_PRECISION_BITS`] are clamped.
    #[must_use]
    pub fn quantize(values: &[f32], precision_bits: u8) -> Self {
        let precision_bits = precision_bits.min(MAX_PRECISION_BITS);
        let scale = (1u32 << precision_bits) as f32;
        let cells = values
            .iter()
            .map(|&v| {
                let scaled = (v * scale).round();
                if scaled >= i32::MAX as f32 {
                    i32::MAX
                } else if scaled <= i32::MIN as f32 {
                    i32::MIN
                } else {
                    scaled as i32
                }
            })
            .collect();
        Self {
            precision_bits,
            cells,
        }
    }

    /// Reconstruct from raw cells (e.g. deserialized audit data).
    #[must_use]
    pub fn from_cells(cells: Vec<i32>, precision_bits: u8) -> Self {
        Self {
            precision_bits: precision_bits.min(MAX_PRECISION_BITS),
            cells,
        }
    }

    /// The declared precision in fractional bits.
    #[must_use]
    pub const fn precision_bits(&self) -> u8 {
        self.precision_bits
    }

    /// Number of cells in the vector.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the vector is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The raw fixed-point cells.
    #[must_use]
    pub fn cells(&self) -> &[i32] {
        &self.cells
    }

    /// Recover the representative real values.
    ///
    /// Re-quantizing the result at the same precision is the identity.
    #[must_use]
    pub fn dequantize(&self) -> Vec<f32> {
        let scale = (1u32 << self.precision_bits) as f32;
        self.cells.iter().map(|&c| c as f32 / scale).collect()
    }

    /// Index of the largest cell (first occurrence on ties).
    ///
    /// This is the token a greedy (temperature-0) sampler must have picked.
    #[must_use]
    pub fn argmax(&self) -> Option<u32> {
        let mut best: Option<(usize, i32)> = None;
        for (i, &c) in self.cells.iter().enumerate() {
            match best {
                Some((_, max)) if c <= max => {}
                _ => best = Some((i, c)),
            }
        }
        best.map(|(i, _)| i as u32)
    }

    /// Canonical byte encoding: tag, precision, cell count, LE cells.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + 8 + 8 + self.cells.len() * 4);
        buf.extend_from_slice(QVEC_TAG);
        put_u32(&mut buf, u32::from(self.precision_bits));
        put_u64(&mut buf, self.cells.len() as u64);
        for &cell in &self.cells {
            buf.extend_from_slice(&cell.to_le_bytes());
        }
        buf
    }

    /// Digest of the canonical encoding.
    #[must_use]
    pub fn digest(&self) -> Digest {
        Digest::compute(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_quantize_deterministic() {
        let v = [0.125f32, -3.5, 7.75];
        let q1 = QuantizedVector::quantize(&v, DEFAULT_PRECISION_BITS);
        let q2 = QuantizedVector::quantize(&v, DEFAULT_PRECISION_BITS);
        assert_eq!(q1, q2);
        assert_eq!(q1.digest(), q2.digest());
    }

    #[test]
    fn test_quantize_precision_changes_digest() {
        let v = [0.123456f32, 0.654321];
        let q16 = QuantizedVector::quantize(&v, 16);
        let q8 = QuantizedVector::quantize(&v, 8);
        assert_ne!(q16.digest(), q8.digest());
    }

    #[test]
    fn test_quantize_absorbs_sub_precision_noise() {
        // Noise below one quantization step must not change the digest.
        let a = [0.5f32, -1.25];
        let b = [0.5f32 + 1e-7, -1.25 - 1e-7];
        let qa = QuantizedVector::quantize(&a, 8);
        let qb = QuantizedVector::quantize(&b, 8);
        assert_eq!(qa.digest(), qb.digest());
    }

    #[test]
    fn test_argmax_first_on_tie() {
        let q = QuantizedVector::from_cells(vec![1, 5, 5, 2], 16);
        assert_eq!(q.argmax(), Some(1));
    }

    #[test]
    fn test_argmax_empty() {
        let q = QuantizedVector::from_cells(vec![], 16);
        assert_eq!(q.argmax(), None);
    }

    #[test]
    fn test_precision_clamped() {
        let q = QuantizedVector::quantize(&[1.0], 31);
        assert_eq!(q.precision_bits(), MAX_PRECISION_BITS);
    }

    #[test]
    fn test_encode_length_sensitive() {
        let q1 = QuantizedVector::from_cells(vec![0], 16);
        let q2 = QuantizedVector::from_cells(vec![0, 0], 16);
        assert_ne!(q1.digest(), q2.digest());
    }

    proptest! {
        #[test]
        fn prop_quantize_idempotent(
            values in proptest::collection::vec(-1.0e4f32..1.0e4f32, 0..64),
            bits in 4u8..=MAX_PRECISION_BITS,
        ) {
            let q = QuantizedVector::quantize(&values, bits);
            let again = QuantizedVector::quantize(&q.dequantize(), bits);
            prop_assert_eq!(q, again);
        }

        #[test]
        fn prop_digest_matches_recomputation(
            values in proptest::collection::vec(-100.0f32..100.0f32, 1..32),
        ) {
            let q = QuantizedVector::quantize(&values, DEFAULT_PRECISION_BITS);
            let rebuilt = QuantizedVector::from_cells(q.cells().to_vec(), q.precision_bits());
            prop_assert_eq!(q.digest(), rebuilt.digest());
        }
    }
}
