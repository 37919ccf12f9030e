//! Router orchestration: issue jobs, verify responses, audit transcripts.
//!
//! Verification ordering is a protocol requirement, not a convenience: the
//! challenge seed is derived from the disclosed transcript root plus fresh
//! router randomness, so the signature and identity checks must complete
//! before any challenge material exists, and a proof is only meaningful for
//! a challenge that was actually issued. A job gets exactly one challenge;
//! a timed-out audit is a terminal rejection.

use crate::audit_log::{AuditLog, AuditLogEntry};
use crate::job::{JobRecord, JobState};
use crate::verdict::{RejectReason, Verdict};
use chrono::{DateTime, Duration, Utc};
use indexmap::{IndexMap, IndexSet};
use veristep_attest::binding::ResponseBinding;
use veristep_attest::signature::AttestVerifier;
use veristep_core::artifact::StepArtifact;
use veristep_core::challenge::{derive_seed, select_indices, ChallengePolicy, RandomnessBeacon};
use veristep_core::encoding::hash_output_tokens;
use veristep_core::id::{JobId, ModelIdentity, Nonce};
use veristep_core::wire::{AuditChallenge, AuditProof, GenerationParams, Job, Response, SamplingPolicy};

/// Router configuration.
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    /// How many steps of each transcript get challenged.
    pub challenge_policy: ChallengePolicy,
    /// How long the provider has to answer a challenge.
    pub audit_window: Duration,
    /// How long finalized-job log entries are retained.
    pub log_retention: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            challenge_policy: ChallengePolicy::default(),
            audit_window: Duration::minutes(10),
            log_retention: Duration::hours(24),
        }
    }
}

/// Outcome of receiving a response: either a challenge goes out, or the job
/// is rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    /// Response verified; this challenge was issued for it.
    Challenged(AuditChallenge),
    /// Response rejected for the given reason.
    Rejected(RejectReason),
}

/// The verifier side of the protocol.
///
/// Owns its job store, nonce ledger, and audit log explicitly; multiple
/// routers coexist in one process. Verification is stateless per job beyond
/// the job's own record.
pub struct Router {
    expected_model_identity: ModelIdentity,
    verifier: Box<dyn AttestVerifier>,
    beacon: Box<dyn RandomnessBeacon>,
    config: RouterConfig,
    jobs: IndexMap<JobId, JobRecord>,
    consumed_nonces: IndexSet<Nonce>,
    audit_log: AuditLog,
}

impl Router {
    /// Create a router expecting the given model identity.
    #[must_use]
    pub fn new(
        expected_model_identity: ModelIdentity,
        verifier: Box<dyn AttestVerifier>,
        beacon: Box<dyn RandomnessBeacon>,
        config: RouterConfig,
    ) -> Self {
        Self {
            expected_model_identity,
            verifier,
            beacon,
            config,
            jobs: IndexMap::new(),
            consumed_nonces: IndexSet::new(),
            audit_log: AuditLog::new(config.log_retention),
        }
    }

    /// The model identity this router requires providers to run.
    #[must_use]
    pub fn expected_model_identity(&self) -> ModelIdentity {
        self.expected_model_identity
    }

    /// Issue a new job with a fresh id and nonce.
    pub fn create_job(
        &mut self,
        prompt: impl Into<String>,
        params: GenerationParams,
        now: DateTime<Utc>,
    ) -> Job {
        let job = Job {
            job_id: JobId::new(),
            nonce: Nonce::new(),
            prompt: prompt.into(),
            params,
            expected_model_identity: self.expected_model_identity,
        };
        tracing::debug!(job_id = %job.job_id, "issued job");
        self.jobs.insert(job.job_id, JobRecord::new(job.clone(), now));
        job
    }

    /// Look up a job's record.
    #[must_use]
    pub fn job(&self, job_id: JobId) -> Option<&JobRecord> {
        self.jobs.get(&job_id)
    }

    /// Look up a job's current state.
    #[must_use]
    pub fn job_state(&self, job_id: JobId) -> Option<&JobState> {
        self.jobs.get(&job_id).map(|r| &r.state)
    }

    /// Finalized-job audit log entries.
    #[must_use]
    pub fn audit_log(&self) -> &[AuditLogEntry] {
        self.audit_log.entries()
    }

    /// Drop audit log entries older than the retention window.
    pub fn prune_audit_log(&mut self, now: DateTime<Utc>) -> usize {
        self.audit_log.prune(now)
    }

    /// Verify a provider's response and, on success, issue the audit
    /// challenge for it.
    ///
    /// Checks run in protocol order: structure, then signature, then model
    /// identity; only then is the challenge seed derived from the disclosed
    /// root and fresh beacon randomness. Any failure finalizes the job as
    /// rejected - identity and signature failures are cheating signals, not
    /// transient errors, so there is no retry.
    pub fn receive_response(&mut self, response: &Response, now: DateTime<Utc>) -> ResponseOutcome {
        let Some(record) = self.jobs.get_mut(&response.job_id) else {
            tracing::warn!(job_id = %response.job_id, "response for unknown job");
            return ResponseOutcome::Rejected(RejectReason::MalformedMessage {
                detail: "unknown job".to_string(),
            });
        };

        // A response for a job that moved past Issued is a replay of an
        // already-consumed (job, nonce) pair. The existing state (an
        // in-flight audit or a reached verdict) is left untouched.
        if record.state != JobState::Issued {
            tracing::warn!(job_id = %response.job_id, "replayed response");
            return ResponseOutcome::Rejected(RejectReason::ReplayDetected);
        }

        // Structural checks.
        if response.output_tokens.is_empty() {
            let reason = RejectReason::MalformedMessage {
                detail: "empty output".to_string(),
            };
            finalize(record, &mut self.audit_log, Verdict::Rejected(reason.clone()), now);
            return ResponseOutcome::Rejected(reason);
        }
        if hash_output_tokens(&response.output_tokens) != response.output_hash {
            let reason = RejectReason::MalformedMessage {
                detail: "output hash does not match tokens".to_string(),
            };
            finalize(record, &mut self.audit_log, Verdict::Rejected(reason.clone()), now);
            return ResponseOutcome::Rejected(reason);
        }
        if self.consumed_nonces.contains(&record.job.nonce) {
            tracing::warn!(job_id = %response.job_id, "nonce already consumed");
            finalize(
                record,
                &mut self.audit_log,
                Verdict::Rejected(RejectReason::ReplayDetected),
                now,
            );
            return ResponseOutcome::Rejected(RejectReason::ReplayDetected);
        }
        record.state = JobState::ResponseReceived;

        // Signature over the response binding, which includes the nonce.
        let binding = ResponseBinding {
            model_identity: response.model_identity,
            transcript_root: response.transcript_root,
            output_hash: response.output_hash,
            job_id: response.job_id,
            nonce: record.job.nonce,
        };
        if !self.verifier.verify(&binding.message_bytes(), &response.signature) {
            tracing::warn!(job_id = %response.job_id, "signature invalid - possible forgery");
            finalize(
                record,
                &mut self.audit_log,
                Verdict::Rejected(RejectReason::SignatureInvalid),
                now,
            );
            return ResponseOutcome::Rejected(RejectReason::SignatureInvalid);
        }

        // Model identity: mismatch is a substitution attempt.
        if response.model_identity != self.expected_model_identity {
            tracing::warn!(
                job_id = %response.job_id,
                claimed = %response.model_identity,
                expected = %self.expected_model_identity,
                "model substitution detected"
            );
            finalize(
                record,
                &mut self.audit_log,
                Verdict::Rejected(RejectReason::IdentityMismatch),
                now,
            );
            return ResponseOutcome::Rejected(RejectReason::IdentityMismatch);
        }
        record.state = JobState::IdentityVerified;

        // The response is committed: consume the nonce, fix the root.
        self.consumed_nonces.insert(record.job.nonce);
        let step_count = response.output_tokens.len() as u64;
        record.transcript_root = Some(response.transcript_root);
        record.step_count = step_count;

        // Challenge derivation: fresh randomness drawn only now, after the
        // root is fixed, and disclosed so the seed is recomputable.
        let router_randomness = self.beacon.draw();
        let seed = derive_seed(&response.transcript_root, &router_randomness);
        let k = self.config.challenge_policy.challenge_count(step_count);
        let challenge_indices = select_indices(&seed, step_count, k);

        record.challenge_indices = challenge_indices.clone();
        record.deadline = Some(now + self.config.audit_window);
        record.state = JobState::ChallengeSent;

        tracing::debug!(
            job_id = %response.job_id,
            steps = step_count,
            challenged = challenge_indices.len(),
            "issued audit challenge"
        );

        ResponseOutcome::Challenged(AuditChallenge {
            job_id: response.job_id,
            challenge_indices,
            router_randomness,
        })
    }

    /// Resolve an audit: verify every revealed step against the committed
    /// root and the sampling policy.
    ///
    /// Any single failed path or inconsistent token rejects the whole job.
    /// A proof arriving after the deadline is a timeout rejection. Either
    /// way the decision is terminal.
    pub fn receive_proof(&mut self, proof: &AuditProof, now: DateTime<Utc>) -> Verdict {
        let Some(record) = self.jobs.get_mut(&proof.job_id) else {
            tracing::warn!(job_id = %proof.job_id, "proof for unknown job");
            return Verdict::Rejected(RejectReason::MalformedMessage {
                detail: "unknown job".to_string(),
            });
        };

        if record.state != JobState::ChallengeSent {
            tracing::warn!(job_id = %proof.job_id, "proof for job not awaiting audit");
            return Verdict::Rejected(RejectReason::MalformedMessage {
                detail: "job not awaiting audit".to_string(),
            });
        }

        // Both are set on the ChallengeSent transition.
        let (Some(deadline), Some(root)) = (record.deadline, record.transcript_root) else {
            return Verdict::Rejected(RejectReason::MalformedMessage {
                detail: "job has no issued challenge".to_string(),
            });
        };

        if now > deadline {
            tracing::warn!(job_id = %proof.job_id, "audit proof arrived after deadline");
            let verdict = Verdict::Rejected(RejectReason::AuditTimeout);
            finalize(record, &mut self.audit_log, verdict.clone(), now);
            return verdict;
        }

        // The proof must cover exactly the challenged indices, in order.
        let revealed: Vec<u64> = proof.reveals.iter().map(|r| r.step_index).collect();
        if revealed != record.challenge_indices {
            let verdict = Verdict::Rejected(RejectReason::MalformedMessage {
                detail: "proof does not cover the challenged indices".to_string(),
            });
            finalize(record, &mut self.audit_log, verdict.clone(), now);
            return verdict;
        }

        let policy = record.job.params.sampling_policy();
        for reveal in &proof.reveals {
            // Recompute the leaf from the revealed output; a vector that
            // differs from the committed one at this precision cannot
            // reproduce the committed digest.
            let leaf = StepArtifact::new(
                reveal.step_index,
                reveal.quantized_output.digest(),
                reveal.sampled_token,
            )
            .leaf_digest();

            if !reveal
                .merkle_path
                .verify(&root, &leaf, reveal.step_index, record.step_count)
            {
                tracing::warn!(
                    job_id = %proof.job_id,
                    step = reveal.step_index,
                    "merkle path verification failed - tamper or forgery"
                );
                let verdict = Verdict::Rejected(RejectReason::MerkleProofInvalid {
                    step: reveal.step_index,
                });
                finalize(record, &mut self.audit_log, verdict.clone(), now);
                return verdict;
            }

            if !token_consistent(policy, reveal.sampled_token, &reveal.quantized_output) {
                tracing::warn!(
                    job_id = %proof.job_id,
                    step = reveal.step_index,
                    "sampled token not justified by revealed output"
                );
                let verdict = Verdict::Rejected(RejectReason::TokenInconsistentWithOutput {
                    step: reveal.step_index,
                });
                finalize(record, &mut self.audit_log, verdict.clone(), now);
                return verdict;
            }
        }

        tracing::debug!(job_id = %proof.job_id, audited = proof.reveals.len(), "audit passed");
        finalize(record, &mut self.audit_log, Verdict::Accepted, now);
        Verdict::Accepted
    }

    /// Finalize every challenged job whose deadline has passed.
    ///
    /// A silent provider is presumed unresponsive or cheating; there is no
    /// retry and no second challenge. Returns the expired job ids.
    pub fn expire_overdue(&mut self, now: DateTime<Utc>) -> Vec<JobId> {
        let mut expired = Vec::new();
        for record in self.jobs.values_mut() {
            if record.state == JobState::ChallengeSent
                && record.deadline.is_some_and(|d| now > d)
            {
                tracing::warn!(job_id = %record.job.job_id, "audit window elapsed without proof");
                finalize(
                    record,
                    &mut self.audit_log,
                    Verdict::Rejected(RejectReason::AuditTimeout),
                    now,
                );
                expired.push(record.job.job_id);
            }
        }
        expired
    }
}

/// Reach a terminal decision for a job and log it.
fn finalize(record: &mut JobRecord, log: &mut AuditLog, verdict: Verdict, now: DateTime<Utc>) {
    record.state = JobState::Finalized(verdict.clone());
    log.record(AuditLogEntry {
        job_id: record.job.job_id,
        verdict,
        issued_at: record.issued_at,
        finalized_at: now,
    });
}

/// Check a sampled token against the revealed distribution.
fn token_consistent(
    policy: SamplingPolicy,
    token: u32,
    revealed: &veristep_core::quantize::QuantizedVector,
) -> bool {
    match policy {
        SamplingPolicy::Greedy => revealed.argmax() == Some(token),
        SamplingPolicy::Stochastic => (token as usize) < revealed.len(),
    }
}
