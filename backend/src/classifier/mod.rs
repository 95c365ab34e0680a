pub mod interpreter;
pub mod model;
pub mod simulated;

use crate::preprocess::normalizer::NormalizedTensor;
use shared::Stage;
use std::path::Path;
use std::sync::Arc;

pub use model::OnnxModel;
pub use simulated::SimulatedModel;

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Model inference error: {0}")]
    Inference(String),
    #[error("Model returned {got} scores, expected {expected}")]
    UnexpectedOutputLen { expected: usize, got: usize },
    #[error("Model returned non-finite scores: {0:?}")]
    NonFiniteOutput(Vec<f32>),
}

/// Softmax output of the classifier, indexed by `shared::Stage::ORDER`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityVector(Vec<f32>);

impl ProbabilityVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// Checks raw model scores against the stage table and normalizes them.
    pub fn from_model_output(scores: &[f32]) -> Result<Self, ClassifierError> {
        let expected = Stage::ORDER.len();
        if scores.len() != expected {
            return Err(ClassifierError::UnexpectedOutputLen {
                expected,
                got: scores.len(),
            });
        }
        if scores.iter().any(|v| !v.is_finite()) {
            return Err(ClassifierError::NonFiniteOutput(scores.to_vec()));
        }
        Ok(Self::from_logits(scores))
    }

    /// Normalizes raw model scores.
    pub fn from_logits(logits: &[f32]) -> Self {
        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
        let sum: f32 = exps.iter().sum();
        Self(exps.into_iter().map(|v| v / sum).collect())
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Index and value of the highest score; the first one wins ties.
    pub fn argmax(&self) -> Option<(usize, f32)> {
        self.0
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (i, v)| {
                if v.is_nan() {
                    return best;
                }
                match best {
                    Some((_, bv)) if v <= bv => best,
                    _ => Some((i, v)),
                }
            })
    }
}

/// Maps a normalized image to per-stage probabilities.
pub trait Classifier: Send + Sync {
    fn classify(&self, tensor: &NormalizedTensor) -> Result<ProbabilityVector, ClassifierError>;

    /// `false` when results are synthetic.
    fn is_loaded(&self) -> bool;
}

/// Picks the classifier variant once at startup.
///
/// A model that fails to load puts the service into simulation mode instead
/// of refusing to start.
pub fn load_or_simulate(model_path: &Path) -> Arc<dyn Classifier> {
    match OnnxModel::load(model_path) {
        Ok(model) => {
            log::info!("Model loaded successfully from {}", model_path.display());
            Arc::new(model)
        }
        Err(e) => {
            log::error!("Error loading model: {}", e);
            log::warn!("Using fallback simulation mode");
            Arc::new(SimulatedModel::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_sums_to_one() {
        let probs = ProbabilityVector::from_logits(&[1.0, 2.0, 3.0, 0.5]);
        let sum: f32 = probs.as_slice().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs.as_slice().iter().all(|&p| p >= 0.0));
        assert_eq!(probs.argmax().map(|(i, _)| i), Some(2));
    }

    #[test]
    fn softmax_is_stable_for_large_scores() {
        let probs = ProbabilityVector::from_logits(&[1000.0, 999.0, 0.0, 0.0]);
        assert!(probs.as_slice().iter().all(|p| p.is_finite()));
        assert_eq!(probs.argmax().map(|(i, _)| i), Some(0));
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        let probs = ProbabilityVector::new(vec![0.25, 0.25, 0.25, 0.25]);
        assert_eq!(probs.argmax(), Some((0, 0.25)));
    }

    #[test]
    fn argmax_skips_nan() {
        let probs = ProbabilityVector::new(vec![f32::NAN, 0.1, 0.7, 0.2]);
        assert_eq!(probs.argmax(), Some((2, 0.7)));
        assert_eq!(ProbabilityVector::new(vec![]).argmax(), None);
    }

    #[test]
    fn model_output_must_cover_every_stage() {
        for scores in [
            vec![],
            vec![0.1, 0.8, 0.1],
            vec![0.05, 0.9, 0.01, 0.01, 0.01, 0.01, 0.01],
        ] {
            match ProbabilityVector::from_model_output(&scores) {
                Err(ClassifierError::UnexpectedOutputLen { expected, got }) => {
                    assert_eq!(expected, 4);
                    assert_eq!(got, scores.len());
                }
                other => panic!("expected length error for {:?}, got {:?}", scores, other),
            }
        }
    }

    #[test]
    fn model_output_must_be_finite() {
        for scores in [
            vec![f32::INFINITY, 0.0, 0.0, 0.0],
            vec![f32::NAN; 4],
            vec![0.1, f32::NEG_INFINITY, 0.3, 0.2],
        ] {
            let err = ProbabilityVector::from_model_output(&scores).unwrap_err();
            assert!(matches!(err, ClassifierError::NonFiniteOutput(_)));
            assert!(err.to_string().contains("non-finite"));
        }
    }

    #[test]
    fn valid_model_output_is_normalized() {
        let probs = ProbabilityVector::from_model_output(&[0.2, -1.0, 3.5, 0.0]).unwrap();
        let sum: f32 = probs.as_slice().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert_eq!(probs.argmax().map(|(i, _)| i), Some(2));
    }

    #[test]
    fn missing_model_falls_back_to_simulation() {
        let classifier = load_or_simulate(Path::new("/nonexistent/model.onnx"));
        assert!(!classifier.is_loaded());
    }
}
