//! Inference-engine contract.
//!
//! The engine is an external collaborator: given a prompt and generation
//! parameters it produces an ordered, finite sequence of per-step records,
//! one invocation per job. Waiting for the next step is an ordinary
//! blocking point inside the iterator; a stream that errors mid-way is an
//! engine fault, surfaced distinctly from any cryptographic rejection.

use serde::{Deserialize, Serialize};
use veristep_core::wire::GenerationParams;

/// One generation step as produced by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Zero-based step position.
    pub step_index: u64,
    /// The output-distribution vector for this step (logits or log-probs).
    pub output_vector: Vec<f32>,
    /// The token the engine sampled.
    pub sampled_token: u32,
}

/// Inputs for one engine invocation.
#[derive(Debug, Clone, Copy)]
pub struct EngineRequest<'a> {
    /// Prompt text.
    pub prompt: &'a str,
    /// Generation parameters.
    pub params: &'a GenerationParams,
}

/// A finite stream of step records.
pub type StepStream = Box<dyn Iterator<Item = Result<StepRecord, EngineError>>>;

/// Engine-side failures - infrastructure faults, not protocol rejections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The model could not be loaded or initialized.
    #[error("model load failed: {0}")]
    Load(String),
    /// Execution failed mid-stream.
    #[error("model execution failed: {0}")]
    Execution(String),
}

/// Producer of generation steps for a given prompt.
///
/// Restartable only by re-invocation: the stream returned by one `run` call
/// is consumed exactly once.
pub trait InferenceEngine {
    /// Execute one generation and return its step stream.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the model cannot start.
    fn run(&mut self, request: EngineRequest<'_>) -> Result<StepStream, EngineError>;
}

/// Deterministic engine that replays a fixed script of steps.
///
/// The in-repo engine implementation: drives the protocol tests and shows
/// integrators the contract shape. Honors `max_steps` by truncating the
/// script.
#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    steps: Vec<StepRecord>,
}

impl ScriptedEngine {
    /// Create from an explicit step script.
    #[must_use]
    pub fn new(steps: Vec<StepRecord>) -> Self {
        Self { steps }
    }

    /// Build a greedy script: one step per distribution, each sampling the
    /// arg-max of its vector (first index on ties).
    #[must_use]
    pub fn greedy(distributions: Vec<Vec<f32>>) -> Self {
        let steps = distributions
            .into_iter()
            .enumerate()
            .map(|(i, output_vector)| {
                let sampled_token = argmax_f32(&output_vector);
                StepRecord {
                    step_index: i as u64,
                    output_vector,
                    sampled_token,
                }
            })
            .collect();
        Self { steps }
    }

    /// Number of scripted steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the script is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl InferenceEngine for ScriptedEngine {
    fn run(&mut self, request: EngineRequest<'_>) -> Result<StepStream, EngineError> {
        let limit = request.params.max_steps as usize;
        let steps: Vec<StepRecord> = self.steps.iter().take(limit).cloned().collect();
        Ok(Box::new(steps.into_iter().map(Ok)))
    }
}

fn argmax_f32(values: &[f32]) -> u32 {
    let mut best = 0usize;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(params: &GenerationParams) -> EngineRequest<'_> {
        EngineRequest {
            prompt: "what is 2+2?",
            params,
        }
    }

    #[test]
    fn test_scripted_engine_replays_in_order() {
        let mut engine = ScriptedEngine::greedy(vec![
            vec![0.1, 0.9],
            vec![0.8, 0.2],
        ]);
        let params = GenerationParams::default();
        let steps: Vec<StepRecord> = engine
            .run(request(&params))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step_index, 0);
        assert_eq!(steps[0].sampled_token, 1);
        assert_eq!(steps[1].sampled_token, 0);
    }

    #[test]
    fn test_scripted_engine_honors_max_steps() {
        let mut engine = ScriptedEngine::greedy(vec![vec![1.0]; 10]);
        let params = GenerationParams {
            max_steps: 4,
            ..GenerationParams::default()
        };
        let steps: Vec<StepRecord> = engine
            .run(request(&params))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(steps.len(), 4);
    }

    #[test]
    fn test_greedy_argmax_first_on_tie() {
        let engine = ScriptedEngine::greedy(vec![vec![0.5, 0.5, 0.1]]);
        assert_eq!(engine.steps[0].sampled_token, 0);
    }

    #[test]
    fn test_rerun_replays_same_script() {
        let mut engine = ScriptedEngine::greedy(vec![vec![0.2, 0.4], vec![0.6, 0.3]]);
        let params = GenerationParams::default();
        let first: Vec<_> = engine
            .run(request(&params))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let second: Vec<_> = engine
            .run(request(&params))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(first, second);
    }
}
