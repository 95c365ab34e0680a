use crate::annotate::VisualAnnotator;
use crate::classifier::interpreter::{ClassificationResult, InterpretError, ResultInterpreter};
use crate::classifier::{Classifier, ClassifierError};
use crate::preprocess::normalizer::{DecodeError, ImageNormalizer, RawImage};
use crate::storage::artifact_store::{ArtifactStore, RequestOrigin};
use chrono::{SecondsFormat, Utc};
use shared::{InferenceResponse, Prediction, Technical};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error(transparent)]
    Interpret(#[from] InterpretError),
}

/// Runs one upload through decode, classification and annotation.
///
/// Holds only read-only state, so a single instance serves all requests.
pub struct InferenceOrchestrator {
    normalizer: ImageNormalizer,
    classifier: Arc<dyn Classifier>,
    annotator: VisualAnnotator,
    store: ArtifactStore,
}

impl InferenceOrchestrator {
    pub fn new(classifier: Arc<dyn Classifier>, store: ArtifactStore) -> Self {
        Self {
            normalizer: ImageNormalizer::default(),
            classifier,
            annotator: VisualAnnotator,
            store,
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.classifier.is_loaded()
    }

    pub fn run(&self, bytes: &[u8], origin: &RequestOrigin) -> Result<InferenceResponse, PipelineError> {
        let raw = self.normalizer.decode(bytes)?;
        let (width, height) = raw.dimensions();
        log::debug!(
            "Processing {}x{} upload (source {:?})",
            width,
            height,
            raw.source_color()
        );
        let artifact_url = self.annotate(&raw, origin);

        let tensor = self.normalizer.normalize(&raw);
        let probabilities = self.classifier.classify(&tensor)?;
        log::debug!("Probabilities: {:?}", probabilities.as_slice());
        let result = ResultInterpreter::interpret(&probabilities)?;
        log::info!(
            "Predicted {} ({:.1}%){}",
            result.stage.label(),
            result.confidence,
            if self.model_loaded() { "" } else { " [simulated]" }
        );

        Ok(InferenceResponse::succeeded(assemble(result, artifact_url)))
    }

    /// Best effort: any failure leaves the response without an image URL.
    fn annotate(&self, raw: &RawImage, origin: &RequestOrigin) -> Option<String> {
        let artifact = match self.annotator.annotate(raw.pixels()) {
            Ok(artifact) => artifact,
            Err(e) => {
                log::warn!("Error in image processing: {}", e);
                return None;
            }
        };
        match self.store.persist(&artifact) {
            Ok(_) => Some(self.store.url_for(origin, &artifact.filename)),
            Err(e) => {
                log::warn!("Error in image processing: {}", e);
                None
            }
        }
    }
}

fn assemble(result: ClassificationResult, artifact_url: Option<String>) -> Prediction {
    Prediction {
        stage: result.display_name().to_string(),
        confidence: result.confidence,
        processed_image_url: artifact_url,
        technical: Technical {
            original_stage: result.stage,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        },
    }
}
