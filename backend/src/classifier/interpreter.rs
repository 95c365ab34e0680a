use super::ProbabilityVector;
use shared::Stage;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InterpretError {
    #[error("Unknown label index {0}")]
    UnknownLabel(usize),
    #[error("Probability vector has {got} entries, expected {expected}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("Probability vector has no usable scores")]
    NoScores,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub stage: Stage,
    /// Percentage rounded to one decimal place.
    pub confidence: f64,
}

impl ClassificationResult {
    pub fn display_name(&self) -> &'static str {
        self.stage.display_name()
    }
}

pub struct ResultInterpreter;

impl ResultInterpreter {
    pub fn interpret(probs: &ProbabilityVector) -> Result<ClassificationResult, InterpretError> {
        let expected = Stage::ORDER.len();
        let got = probs.as_slice().len();
        if got != expected {
            return Err(InterpretError::LengthMismatch { expected, got });
        }
        let (index, max) = probs.argmax().ok_or(InterpretError::NoScores)?;
        let stage = Stage::from_index(index).ok_or(InterpretError::UnknownLabel(index))?;
        Ok(ClassificationResult {
            stage,
            confidence: round_tenths(max as f64 * 100.0),
        })
    }
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
