//! Binary Merkle tree over ordered leaf digests.
//!
//! Commitment structure for generation transcripts: leaves are step-artifact
//! digests in execution order, internal nodes are `blake3(left || right)`.
//!
//! Odd node counts at any level are handled by promoting the last unpaired
//! node *unchanged* to the next level. This padding policy is deterministic
//! and unambiguous; duplicate-leaf padding is deliberately not used. Because
//! promotion points depend on the leaf count, proofs verify against
//! `(leaf_index, leaf_count)` rather than the index alone.
//!
//! Verification never panics: any structural mismatch (wrong path length,
//! index out of range, side inconsistent with the index) is a `false`.

use crate::digest::Digest;
use serde::{Deserialize, Serialize};

/// Which side of the current node a path sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// Sibling is the left child; current node is the right.
    Left,
    /// Sibling is the right child; current node is the left.
    Right,
}

/// One step of an authentication path: a sibling digest and its side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    /// The sibling node's digest.
    pub digest: Digest,
    /// Which side the sibling sits on.
    pub side: Side,
}

/// Authentication path from a leaf to the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    entries: Vec<PathEntry>,
}

impl MerklePath {
    /// Create a path from entries, leaf-adjacent first.
    #[must_use]
    pub fn new(entries: Vec<PathEntry>) -> Self {
        Self { entries }
    }

    /// The path entries, leaf-adjacent first.
    #[must_use]
    pub fn entries(&self) -> &[PathEntry] {
        &self.entries
    }

    /// Number of entries in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the path is empty (single-leaf tree).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Verify this path against a root.
    ///
    /// Folds the path onto `leaf`, replaying the tree construction for a
    /// tree of `leaf_count` leaves. Each entry's side must match the side
    /// implied by the index at that level, promotion levels consume no
    /// entry, and the path must be exactly consumed. Returns `false` on any
    /// mismatch.
    #[must_use]
    pub fn verify(&self, root: &Digest, leaf: &Digest, leaf_index: u64, leaf_count: u64) -> bool {
        if leaf_count == 0 || leaf_index >= leaf_count {
            return false;
        }

        let mut current = *leaf;
        let mut index = leaf_index;
        let mut width = leaf_count;
        let mut entries = self.entries.iter();

        while width > 1 {
            let sibling_index = index ^ 1;
            if sibling_index < width {
                let Some(entry) = entries.next() else {
                    return false;
                };
                let expected_side = if index % 2 == 0 { Side::Right } else { Side::Left };
                if entry.side != expected_side {
                    return false;
                }
                current = match entry.side {
                    Side::Right => current.combine(&entry.digest),
                    Side::Left => entry.digest.combine(&current),
                };
            }
            // Unpaired node: promoted unchanged, no entry consumed.
            index /= 2;
            width = width / 2 + width % 2;
        }

        entries.next().is_none() && current == *root
    }
}

/// Binary Merkle tree retaining all levels for proof generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<Digest>>,
}

impl MerkleTree {
    /// Build a tree over leaf digests in order.
    ///
    /// Returns `None` for an empty leaf set; there is nothing to commit.
    #[must_use]
    pub fn build(leaves: &[Digest]) -> Option<Self> {
        if leaves.is_empty() {
            return None;
        }

        let mut levels = Vec::new();
        let mut current = leaves.to_vec();
        while current.len() > 1 {
            let mut next = Vec::with_capacity(current.len() / 2 + current.len() % 2);
            let mut chunks = current.chunks_exact(2);
            for pair in &mut chunks {
                next.push(pair[0].combine(&pair[1]));
            }
            if let [unpaired] = chunks.remainder() {
                next.push(*unpaired);
            }
            levels.push(current);
            current = next;
        }
        levels.push(current);

        Some(Self { levels })
    }

    /// The committed root.
    #[must_use]
    pub fn root(&self) -> Digest {
        self.levels[self.levels.len() - 1][0]
    }

    /// Number of leaves committed.
    #[must_use]
    pub fn leaf_count(&self) -> u64 {
        self.levels[0].len() as u64
    }

    /// The leaf digests in order.
    #[must_use]
    pub fn leaves(&self) -> &[Digest] {
        &self.levels[0]
    }

    /// Generate the authentication path for a leaf.
    ///
    /// Returns `None` if the index is out of range.
    #[must_use]
    pub fn prove(&self, leaf_index: u64) -> Option<MerklePath> {
        if leaf_index >= self.leaf_count() {
            return None;
        }

        let mut entries = Vec::new();
        let mut index = leaf_index as usize;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_index = index ^ 1;
            if sibling_index < level.len() {
                let side = if index % 2 == 0 { Side::Right } else { Side::Left };
                entries.push(PathEntry {
                    digest: level[sibling_index],
                    side,
                });
            }
            index /= 2;
        }
        Some(MerklePath::new(entries))
    }
}
