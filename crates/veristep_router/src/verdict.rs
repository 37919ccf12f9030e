//! Terminal audit decisions and the protocol rejection taxonomy.

use serde::{Deserialize, Serialize};

/// Why a job was rejected.
///
/// Every variant is a protocol-level outcome: a rejection is a meaningful
/// security signal, not an exceptional program state, so these travel as
/// values inside [`Verdict::Rejected`] and are never thrown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RejectReason {
    /// Structural or schema violation in a message.
    #[error("malformed message: {detail}")]
    MalformedMessage {
        /// What was wrong with the message.
        detail: String,
    },
    /// Claimed model identity differs from the expected one - a
    /// substitution attempt.
    #[error("claimed model identity does not match expected")]
    IdentityMismatch,
    /// The response signature did not verify - a forgery attempt.
    #[error("response signature invalid")]
    SignatureInvalid,
    /// The job/nonce pair was already consumed.
    #[error("job and nonce already consumed")]
    ReplayDetected,
    /// A revealed step's authentication path did not verify against the
    /// committed root - tampering or forgery.
    #[error("merkle proof invalid at step {step}")]
    MerkleProofInvalid {
        /// The step whose path failed.
        step: u64,
    },
    /// The revealed output does not justify the claimed sampled token.
    #[error("sampled token inconsistent with revealed output at step {step}")]
    TokenInconsistentWithOutput {
        /// The step whose token failed the sampling-policy check.
        step: u64,
    },
    /// No audit proof arrived within the audit window.
    #[error("audit proof not received within the audit window")]
    AuditTimeout,
}

/// Terminal decision for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Every check passed.
    Accepted,
    /// At least one check failed; the reason is retained.
    Rejected(RejectReason),
}

impl Verdict {
    /// Whether this verdict is an acceptance.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}
