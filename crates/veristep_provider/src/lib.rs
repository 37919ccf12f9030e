//! VERISTEP Provider
//!
//! The provider side of the commit-then-audit protocol: consumes a step
//! stream from an inference engine, commits each step into a Merkle
//! transcript, signs the response binding, and answers audit challenges
//! from the per-job transcript cache.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod provider;
pub mod transcript;

// Re-exports
pub use engine::{EngineError, EngineRequest, InferenceEngine, ScriptedEngine, StepRecord, StepStream};
pub use provider::{Provider, ProviderConfig, ProviderError};
pub use transcript::{SealedTranscript, TranscriptBuilder, TranscriptError};
