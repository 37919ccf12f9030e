//! Challenge-seed derivation and audit index selection.
//!
//! The challenge seed is `blake3(tag || transcript_root || router_randomness)`.
//! The randomness is drawn by the Router only *after* the Provider has
//! disclosed the transcript root, and is itself disclosed in the challenge,
//! so both sides (and any third party) can recompute the seed: the Provider
//! cannot predict which steps will be checked, and the Router cannot re-roll
//! a seed until it finds a passing one.
//!
//! Index expansion is a partial Fisher-Yates shuffle driven by a ChaCha8
//! stream seeded from the full 32-byte seed, with rejection-sampled uniform
//! draws. The algorithm is spelled out here rather than delegated to a
//! library sampler so that any verifier holding `(seed, n, k)` reproduces
//! the exact index set regardless of its dependency versions.

use crate::digest::Digest;
use rand_chacha::ChaCha8Rng;
use rand_core::{OsRng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

/// Domain tag for challenge-seed derivation.
const CHALLENGE_TAG: &[u8] = b"VERISTEP/CHALLENGE/V1";

/// A derived challenge seed (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeSeed([u8; 32]);

impl ChallengeSeed {
    /// Create from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get as bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Derive the challenge seed from a disclosed root and router randomness.
#[must_use]
pub fn derive_seed(transcript_root: &Digest, router_randomness: &[u8; 32]) -> ChallengeSeed {
    let mut hasher = blake3::Hasher::new();
    hasher.update(CHALLENGE_TAG);
    hasher.update(transcript_root.as_bytes());
    hasher.update(router_randomness);
    ChallengeSeed(*hasher.finalize().as_bytes())
}

/// Select `k` distinct indices in `[0, n)`, sorted ascending.
///
/// Deterministic given the seed; uniform without replacement. `k` is clamped
/// to `n`. Returns an empty set when `n` is zero.
#[must_use]
pub fn select_indices(seed: &ChallengeSeed, n: u64, k: u64) -> Vec<u64> {
    if n == 0 {
        return Vec::new();
    }
    let k = k.min(n);
    let mut rng = ChaCha8Rng::from_seed(*seed.as_bytes());

    // Partial Fisher-Yates: after i swaps, pool[..i] holds the selection.
    let mut pool: Vec<u64> = (0..n).collect();
    for i in 0..k as usize {
        let offset = uniform_below(&mut rng, n - i as u64);
        pool.swap(i, i + offset as usize);
    }

    let mut selected: Vec<u64> = pool[..k as usize].to_vec();
    selected.sort_unstable();
    selected
}

/// Draw a uniform value in `[0, bound)` by rejection sampling.
///
/// Rejects draws in the tail zone that would bias the modulo; the zone is
/// shorter than one part in 2^32 for any realistic step count.
fn uniform_below(rng: &mut ChaCha8Rng, bound: u64) -> u64 {
    debug_assert!(bound > 0);
    // Largest multiple of `bound` representable in u64 draws.
    let tail = ((u64::MAX % bound) + 1) % bound;
    let limit = u64::MAX - tail;
    loop {
        let draw = rng.next_u64();
        if draw <= limit {
            return draw % bound;
        }
    }
}

/// Policy for how many steps of an `n`-step transcript get audited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ChallengePolicy {
    /// Audit a fixed number of steps (clamped to the step count).
    Count(u64),
    /// Audit a fraction of the steps, at least one.
    Fraction(f64),
}

impl ChallengePolicy {
    /// Number of indices to challenge for an `n`-step transcript.
    #[must_use]
    pub fn challenge_count(&self, n: u64) -> u64 {
        if n == 0 {
            return 0;
        }
        match *self {
            Self::Count(k) => k.min(n),
            Self::Fraction(f) => {
                let f = f.clamp(0.0, 1.0);
                ((n as f64 * f).ceil() as u64).clamp(1, n)
            }
        }
    }
}

impl Default for ChallengePolicy {
    fn default() -> Self {
        Self::Count(3)
    }
}

/// Source of the router randomness mixed into the challenge seed.
///
/// Two instantiations: OS entropy for real deployments, a seeded stream for
/// deterministic tests. The protocol state machine is correct under either;
/// only the unpredictability guarantee differs.
pub trait RandomnessBeacon {
    /// Draw 32 bytes of randomness.
    fn draw(&mut self) -> [u8; 32];
}

/// Beacon backed by operating-system entropy.
#[derive(Debug, Default)]
pub struct OsBeacon;

impl OsBeacon {
    /// Create a new OS-entropy beacon.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RandomnessBeacon for OsBeacon {
    fn draw(&mut self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        bytes
    }
}

/// Deterministic beacon for reproducible tests.
#[derive(Debug)]
pub struct SeededBeacon {
    rng: ChaCha8Rng,
}

impl SeededBeacon {
    /// Create from a u64 seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomnessBeacon for SeededBeacon {
    fn draw(&mut self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        self.rng.fill_bytes(&mut bytes);
        bytes
    }
}
