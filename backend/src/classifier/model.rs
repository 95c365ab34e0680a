use super::{Classifier, ClassifierError, ProbabilityVector};
use crate::preprocess::normalizer::{CHANNELS, NormalizedTensor, TARGET_SIZE};
use std::path::Path;
use tract_onnx::prelude::*;

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

#[derive(Debug, thiserror::Error)]
#[error("Failed to load model {path}: {reason}")]
pub struct ModelLoadError {
    path: String,
    reason: String,
}

/// Trained network exported to ONNX, taking NHWC `f32` input.
pub struct OnnxModel {
    plan: Plan,
}

impl OnnxModel {
    pub fn load(model_path: &Path) -> Result<Self, ModelLoadError> {
        let side = TARGET_SIZE as usize;
        let load = || -> TractResult<Plan> {
            tract_onnx::onnx()
                .model_for_path(model_path)?
                .with_input_fact(
                    0,
                    InferenceFact::dt_shape(f32::datum_type(), tvec!(1, side, side, CHANNELS)),
                )?
                .into_optimized()?
                .into_runnable()
        };
        let plan = load().map_err(|e| ModelLoadError {
            path: model_path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { plan })
    }
}

impl Classifier for OnnxModel {
    fn classify(&self, tensor: &NormalizedTensor) -> Result<ProbabilityVector, ClassifierError> {
        let run = || -> TractResult<Vec<f32>> {
            let data: Vec<f32> = tensor.view().iter().copied().collect();
            let input = Tensor::from_shape(tensor.shape(), &data)?;
            let outputs = self.plan.run(tvec!(input.into_tvalue()))?;
            let scores = outputs[0].to_array_view::<f32>()?;
            Ok(scores.iter().copied().collect())
        };
        let scores = run().map_err(|e| ClassifierError::Inference(e.to_string()))?;
        log::debug!("Raw model scores: {:?}", scores);
        ProbabilityVector::from_model_output(&scores)
    }

    fn is_loaded(&self) -> bool {
        true
    }
}
