use super::{Classifier, ClassifierError, ProbabilityVector};
use crate::preprocess::normalizer::NormalizedTensor;
use rand::Rng;
use shared::Stage;

/// Stand-in used when no model could be loaded.
///
/// Picks a random stage and a confidence in `[65, 95)` percent, drawn in
/// tenths so one-decimal rounding keeps it inside that range.
#[derive(Default)]
pub struct SimulatedModel;

impl SimulatedModel {
    pub fn new() -> Self {
        Self
    }

    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> ProbabilityVector {
        let stages = Stage::ORDER.len();
        let index = rng.random_range(0..stages);
        let top = rng.random_range(650u32..950) as f32 / 1000.0;
        let rest = (1.0 - top) / (stages - 1) as f32;

        let values = (0..stages)
            .map(|i| if i == index { top } else { rest })
            .collect();
        ProbabilityVector::new(values)
    }
}

impl Classifier for SimulatedModel {
    fn classify(&self, _tensor: &NormalizedTensor) -> Result<ProbabilityVector, ClassifierError> {
        Ok(Self::sample(&mut rand::rng()))
    }

    fn is_loaded(&self) -> bool {
        false
    }
}
