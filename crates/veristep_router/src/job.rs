//! Per-job state machine and router-side job records.

use crate::verdict::Verdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use veristep_core::digest::Digest;
use veristep_core::wire::Job;

/// Lifecycle of a job on the router side.
///
/// Transitions only move forward; `Finalized` is terminal. The ordering is
/// load-bearing: the challenge seed depends on the disclosed root, so a
/// challenge can only exist after identity verification, and a proof is
/// only accepted after its challenge was issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Issued to a provider; awaiting a response.
    Issued,
    /// Response passed structural checks.
    ResponseReceived,
    /// Signature and model identity verified.
    IdentityVerified,
    /// Challenge issued; awaiting the audit proof.
    ChallengeSent,
    /// Terminal decision reached.
    Finalized(Verdict),
}

impl JobState {
    /// Whether the job has reached a terminal decision.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        matches!(self, Self::Finalized(_))
    }
}

/// Everything the router retains about one job.
#[derive(Debug, Clone)]
pub struct JobRecord {
    /// The issued job (immutable).
    pub job: Job,
    /// Current lifecycle state.
    pub state: JobState,
    /// When the job was issued.
    pub issued_at: DateTime<Utc>,
    /// The root disclosed in the response; immutable once set.
    pub transcript_root: Option<Digest>,
    /// Committed step count (tokens in the accepted response).
    pub step_count: u64,
    /// Indices challenged for this job; set exactly once.
    pub challenge_indices: Vec<u64>,
    /// Deadline for the audit proof.
    pub deadline: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Create a fresh record for a just-issued job.
    #[must_use]
    pub fn new(job: Job, issued_at: DateTime<Utc>) -> Self {
        Self {
            job,
            state: JobState::Issued,
            issued_at,
            transcript_root: None,
            step_count: 0,
            challenge_indices: Vec::new(),
            deadline: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::RejectReason;
    use veristep_core::id::{JobId, ModelIdentity, Nonce};
    use veristep_core::wire::GenerationParams;

    #[test]
    fn test_new_record_starts_issued() {
        let job = Job {
            job_id: JobId::new(),
            nonce: Nonce::new(),
            prompt: "p".to_string(),
            params: GenerationParams::default(),
            expected_model_identity: ModelIdentity::from_label("m"),
        };
        let record = JobRecord::new(job, Utc::now());
        assert_eq!(record.state, JobState::Issued);
        assert!(record.transcript_root.is_none());
        assert!(!record.state.is_finalized());
    }

    #[test]
    fn test_finalized_is_terminal_marker() {
        assert!(JobState::Finalized(Verdict::Accepted).is_finalized());
        assert!(
            JobState::Finalized(Verdict::Rejected(RejectReason::AuditTimeout)).is_finalized()
        );
        assert!(!JobState::ChallengeSent.is_finalized());
    }
}
