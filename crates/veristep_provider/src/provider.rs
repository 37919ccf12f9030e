//! Provider orchestration: run jobs, commit transcripts, answer audits.

use crate::engine::{EngineError, EngineRequest, InferenceEngine};
use crate::transcript::{SealedTranscript, TranscriptBuilder, TranscriptError};
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use veristep_attest::binding::ResponseBinding;
use veristep_attest::signature::Attestor;
use veristep_core::encoding::hash_output_tokens;
use veristep_core::id::{JobId, ModelIdentity};
use veristep_core::quantize::DEFAULT_PRECISION_BITS;
use veristep_core::wire::{AuditChallenge, AuditProof, Job, Response};

/// Provider configuration.
#[derive(Debug, Clone, Copy)]
pub struct ProviderConfig {
    /// Quantization precision shared with the Router.
    pub precision_bits: u8,
    /// How long a job's transcript cache is retained awaiting an audit.
    pub audit_window: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            precision_bits: DEFAULT_PRECISION_BITS,
            audit_window: Duration::minutes(10),
        }
    }
}

/// Provider-side failures.
///
/// These are infrastructure or usage faults, distinct from the Router's
/// cryptographic rejections; the surrounding system may retry the transient
/// ones.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The inference engine failed.
    #[error("inference engine failure: {0}")]
    Engine(#[from] EngineError),
    /// The engine's step stream violated the transcript contract.
    #[error(transparent)]
    Transcript(#[from] TranscriptError),
    /// A job may be processed at most once.
    #[error("job {0} already processed")]
    DuplicateJob(JobId),
    /// No cached transcript for the audited job (unknown or evicted).
    #[error("no cached transcript for job {0}")]
    UnknownJob(JobId),
    /// A challenged index lies outside the committed transcript.
    #[error("challenged step {step} out of range for job {job_id}")]
    IndexOutOfRange {
        /// The audited job.
        job_id: JobId,
        /// The offending index.
        step: u64,
    },
}

struct CachedJob {
    transcript: SealedTranscript,
    created_at: DateTime<Utc>,
}

/// A compute provider executing jobs and committing transcripts.
///
/// Owns its engine, its attestation key material, and the per-job
/// transcript cache. Multiple providers coexist in one process; there is no
/// shared state.
pub struct Provider<E, A> {
    engine: E,
    attestor: A,
    model_identity: ModelIdentity,
    config: ProviderConfig,
    cache: IndexMap<JobId, CachedJob>,
}

impl<E: InferenceEngine, A: Attestor> Provider<E, A> {
    /// Create a provider.
    #[must_use]
    pub fn new(engine: E, attestor: A, model_identity: ModelIdentity, config: ProviderConfig) -> Self {
        Self {
            engine,
            attestor,
            model_identity,
            config,
            cache: IndexMap::new(),
        }
    }

    /// The identity this provider reports for its model.
    #[must_use]
    pub fn model_identity(&self) -> ModelIdentity {
        self.model_identity
    }

    /// Number of jobs currently held in the transcript cache.
    #[must_use]
    pub fn cached_jobs(&self) -> usize {
        self.cache.len()
    }

    /// Execute a job and return the committed, signed response.
    ///
    /// Runs the engine once, commits every step into a transcript, caches
    /// the sealed transcript for the audit window, and signs the response
    /// binding. The root is disclosed only here, after every leaf is fixed.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::DuplicateJob`] on re-invocation for the
    /// same job, or an engine/transcript error if generation fails.
    pub fn process_job(&mut self, job: &Job, now: DateTime<Utc>) -> Result<Response, ProviderError> {
        if self.cache.contains_key(&job.job_id) {
            return Err(ProviderError::DuplicateJob(job.job_id));
        }

        let stream = self.engine.run(EngineRequest {
            prompt: &job.prompt,
            params: &job.params,
        })?;

        let mut builder = TranscriptBuilder::new(self.config.precision_bits);
        for record in stream {
            builder.push_step(&record?)?;
        }
        let transcript = builder.seal()?;

        let output_tokens = transcript.output_tokens();
        let output_hash = hash_output_tokens(&output_tokens);
        let transcript_root = transcript.root();

        let binding = ResponseBinding {
            model_identity: self.model_identity,
            transcript_root,
            output_hash,
            job_id: job.job_id,
            nonce: job.nonce,
        };
        let signature = self.attestor.sign(&binding.message_bytes());

        tracing::debug!(
            job_id = %job.job_id,
            steps = transcript.step_count(),
            root = %transcript_root,
            "committed transcript"
        );

        self.cache.insert(
            job.job_id,
            CachedJob {
                transcript,
                created_at: now,
            },
        );

        Ok(Response {
            job_id: job.job_id,
            output_tokens,
            output_hash,
            transcript_root,
            model_identity: self.model_identity,
            signature,
        })
    }

    /// Answer an audit challenge from the cached transcript.
    ///
    /// Reveals, for each challenged step, the quantized vector produced
    /// during the committed run and its authentication path. Nothing is
    /// recomputed.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UnknownJob`] if the job was never processed
    /// or its cache was evicted, or [`ProviderError::IndexOutOfRange`] for
    /// an index outside the committed step count.
    pub fn answer_challenge(&self, challenge: &AuditChallenge) -> Result<AuditProof, ProviderError> {
        let cached = self
            .cache
            .get(&challenge.job_id)
            .ok_or(ProviderError::UnknownJob(challenge.job_id))?;

        let mut reveals = Vec::with_capacity(challenge.challenge_indices.len());
        for &step in &challenge.challenge_indices {
            let reveal =
                cached
                    .transcript
                    .reveal(step)
                    .ok_or(ProviderError::IndexOutOfRange {
                        job_id: challenge.job_id,
                        step,
                    })?;
            reveals.push(reveal);
        }

        tracing::debug!(
            job_id = %challenge.job_id,
            revealed = reveals.len(),
            "answered audit challenge"
        );

        Ok(AuditProof {
            job_id: challenge.job_id,
            reveals,
        })
    }

    /// Drop a job's transcript cache after its audit resolved.
    ///
    /// Returns whether an entry was evicted.
    pub fn finish_job(&mut self, job_id: JobId) -> bool {
        self.cache.shift_remove(&job_id).is_some()
    }

    /// Evict every cache entry older than the audit window.
    ///
    /// Returns the number of evicted entries. The per-job cache is the
    /// dominant memory cost of the design; this bounds its lifetime.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let window = self.config.audit_window;
        let before = self.cache.len();
        self.cache.retain(|job_id, cached| {
            let keep = now - cached.created_at <= window;
            if !keep {
                tracing::debug!(job_id = %job_id, "evicted expired transcript cache");
            }
            keep
        });
        before - self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ScriptedEngine, StepRecord, StepStream};
    use veristep_attest::signature::{AttestVerifier, MacAttestor};
    use veristep_core::id::Nonce;
    use veristep_core::wire::GenerationParams;

    fn test_job(max_steps: u32) -> Job {
        Job {
            job_id: JobId::new(),
            nonce: Nonce::new(),
            prompt: "what is 2+2?".to_string(),
            params: GenerationParams {
                max_steps,
                ..GenerationParams::default()
            },
            expected_model_identity: ModelIdentity::from_label("test-model"),
        }
    }

    fn test_provider() -> Provider<ScriptedEngine, MacAttestor> {
        let engine = ScriptedEngine::greedy(vec![
            vec![0.1, 0.9, 0.0],
            vec![0.7, 0.2, 0.1],
            vec![0.0, 0.3, 0.6],
            vec![0.5, 0.1, 0.4],
        ]);
        Provider::new(
            engine,
            MacAttestor::new([9u8; 32]),
            ModelIdentity::from_label("test-model"),
            ProviderConfig::default(),
        )
    }

    #[test]
    fn test_process_job_commits_and_signs() {
        let mut provider = test_provider();
        let job = test_job(10);
        let response = provider.process_job(&job, Utc::now()).unwrap();

        assert_eq!(response.job_id, job.job_id);
        assert_eq!(response.output_tokens, vec![1, 0, 2, 0]);
        assert_eq!(response.output_hash, hash_output_tokens(&response.output_tokens));

        let binding = ResponseBinding {
            model_identity: response.model_identity,
            transcript_root: response.transcript_root,
            output_hash: response.output_hash,
            job_id: response.job_id,
            nonce: job.nonce,
        };
        let mac = MacAttestor::new([9u8; 32]);
        assert!(mac.verify(&binding.message_bytes(), &response.signature));
    }

    #[test]
    fn test_process_job_twice_is_duplicate() {
        let mut provider = test_provider();
        let job = test_job(10);
        provider.process_job(&job, Utc::now()).unwrap();
        assert_eq!(
            provider.process_job(&job, Utc::now()).unwrap_err(),
            ProviderError::DuplicateJob(job.job_id)
        );
    }

    #[test]
    fn test_answer_challenge_reveals_cached_steps() {
        let mut provider = test_provider();
        let job = test_job(10);
        let response = provider.process_job(&job, Utc::now()).unwrap();

        let challenge = AuditChallenge {
            job_id: job.job_id,
            challenge_indices: vec![0, 3],
            router_randomness: [0u8; 32],
        };
        let proof = provider.answer_challenge(&challenge).unwrap();
        assert_eq!(proof.reveals.len(), 2);
        assert_eq!(proof.reveals[0].step_index, 0);
        assert_eq!(proof.reveals[1].step_index, 3);

        // Revealed leaves verify against the disclosed root.
        for reveal in &proof.reveals {
            let leaf = veristep_core::artifact::StepArtifact::new(
                reveal.step_index,
                reveal.quantized_output.digest(),
                reveal.sampled_token,
            )
            .leaf_digest();
            assert!(reveal.merkle_path.verify(
                &response.transcript_root,
                &leaf,
                reveal.step_index,
                4,
            ));
        }
    }

    #[test]
    fn test_answer_challenge_unknown_job() {
        let provider = test_provider();
        let challenge = AuditChallenge {
            job_id: JobId::new(),
            challenge_indices: vec![0],
            router_randomness: [0u8; 32],
        };
        assert!(matches!(
            provider.answer_challenge(&challenge),
            Err(ProviderError::UnknownJob(_))
        ));
    }

    #[test]
    fn test_answer_challenge_index_out_of_range() {
        let mut provider = test_provider();
        let job = test_job(10);
        provider.process_job(&job, Utc::now()).unwrap();

        let challenge = AuditChallenge {
            job_id: job.job_id,
            challenge_indices: vec![99],
            router_randomness: [0u8; 32],
        };
        assert_eq!(
            provider.answer_challenge(&challenge).unwrap_err(),
            ProviderError::IndexOutOfRange {
                job_id: job.job_id,
                step: 99
            }
        );
    }

    #[test]
    fn test_engine_failure_surfaces_as_provider_error() {
        struct BrokenEngine;
        impl InferenceEngine for BrokenEngine {
            fn run(&mut self, _request: EngineRequest<'_>) -> Result<StepStream, EngineError> {
                Err(EngineError::Load("weights missing".to_string()))
            }
        }

        let mut provider = Provider::new(
            BrokenEngine,
            MacAttestor::new([0u8; 32]),
            ModelIdentity::from_label("m"),
            ProviderConfig::default(),
        );
        assert!(matches!(
            provider.process_job(&test_job(10), Utc::now()),
            Err(ProviderError::Engine(EngineError::Load(_)))
        ));
    }

    #[test]
    fn test_mid_stream_engine_failure() {
        struct FlakyEngine;
        impl InferenceEngine for FlakyEngine {
            fn run(&mut self, _request: EngineRequest<'_>) -> Result<StepStream, EngineError> {
                let items: Vec<Result<StepRecord, EngineError>> = vec![
                    Ok(StepRecord {
                        step_index: 0,
                        output_vector: vec![1.0],
                        sampled_token: 0,
                    }),
                    Err(EngineError::Execution("device lost".to_string())),
                ];
                Ok(Box::new(items.into_iter()))
            }
        }

        let mut provider = Provider::new(
            FlakyEngine,
            MacAttestor::new([0u8; 32]),
            ModelIdentity::from_label("m"),
            ProviderConfig::default(),
        );
        assert!(matches!(
            provider.process_job(&test_job(10), Utc::now()),
            Err(ProviderError::Engine(EngineError::Execution(_)))
        ));
    }

    #[test]
    fn test_finish_job_evicts_cache() {
        let mut provider = test_provider();
        let job = test_job(10);
        provider.process_job(&job, Utc::now()).unwrap();
        assert_eq!(provider.cached_jobs(), 1);

        assert!(provider.finish_job(job.job_id));
        assert!(!provider.finish_job(job.job_id));
        assert_eq!(provider.cached_jobs(), 0);
    }

    #[test]
    fn test_evict_expired_honors_window() {
        let mut provider = test_provider();
        let job = test_job(10);
        let t0 = Utc::now();
        provider.process_job(&job, t0).unwrap();

        // Inside the window: nothing evicted.
        assert_eq!(provider.evict_expired(t0 + Duration::minutes(5)), 0);
        assert_eq!(provider.cached_jobs(), 1);

        // Past the window: evicted, and audits can no longer be answered.
        assert_eq!(provider.evict_expired(t0 + Duration::minutes(11)), 1);
        let challenge = AuditChallenge {
            job_id: job.job_id,
            challenge_indices: vec![0],
            router_randomness: [0u8; 32],
        };
        assert!(matches!(
            provider.answer_challenge(&challenge),
            Err(ProviderError::UnknownJob(_))
        ));
    }
}
