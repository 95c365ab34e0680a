use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{EnumCount, EnumIter, IntoStaticStr};

/// Diagnostic stage predicted by the classifier.
///
/// Variant order is the classifier's output order: index `i` of a probability
/// vector scores `Stage::ORDER[i]`. The display names live in the same type so
/// the two tables cannot drift apart.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumCount, IntoStaticStr,
)]
pub enum Stage {
    MildDemented,
    ModerateDemented,
    NonDemented,
    VeryMildDemented,
}

impl Stage {
    pub const ORDER: [Stage; 4] = [
        Stage::MildDemented,
        Stage::ModerateDemented,
        Stage::NonDemented,
        Stage::VeryMildDemented,
    ];

    pub fn from_index(index: usize) -> Option<Stage> {
        Self::ORDER.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Raw label as emitted by the model, e.g. `NonDemented`.
    pub fn label(self) -> &'static str {
        self.into()
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Stage::MildDemented => "Early-Stage Alzheimer's",
            Stage::ModerateDemented => "Moderate Alzheimer's",
            Stage::NonDemented => "No Dementia Detected",
            Stage::VeryMildDemented => "Mild Cognitive Impairment (MCI)",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Technical {
    pub original_stage: Stage,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Prediction {
    pub stage: String,
    pub confidence: f64,
    #[serde(rename = "processedImageUrl")]
    pub processed_image_url: Option<String>,
    pub technical: Technical,
}

/// Envelope returned by `/predict`. Either `prediction` or `error` is set,
/// never both.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InferenceResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prediction: Option<Prediction>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl InferenceResponse {
    pub fn succeeded(prediction: Prediction) -> Self {
        Self {
            success: true,
            prediction: Some(prediction),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            prediction: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ServiceInfo {
    pub message: String,
    pub endpoints: BTreeMap<String, String>,
    pub model_loaded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use strum::{EnumCount, IntoEnumIterator};

    #[test]
    fn order_matches_declaration() {
        assert_eq!(Stage::ORDER.len(), Stage::COUNT);
        for (i, stage) in Stage::iter().enumerate() {
            assert_eq!(Stage::ORDER[i], stage);
            assert_eq!(stage.index(), i);
            assert_eq!(Stage::from_index(i), Some(stage));
        }
        assert_eq!(Stage::from_index(Stage::COUNT), None);
    }

    #[test]
    fn display_names_are_total_and_distinct() {
        let names: HashSet<&str> = Stage::iter().map(Stage::display_name).collect();
        assert_eq!(names.len(), Stage::COUNT);
        assert!(names.iter().all(|n| !n.is_empty()));
        assert_eq!(Stage::NonDemented.display_name(), "No Dementia Detected");
    }

    #[test]
    fn raw_labels() {
        assert_eq!(Stage::MildDemented.label(), "MildDemented");
        assert_eq!(Stage::VeryMildDemented.label(), "VeryMildDemented");
    }

    #[test]
    fn success_envelope_shape() {
        let response = InferenceResponse::succeeded(Prediction {
            stage: Stage::NonDemented.display_name().to_string(),
            confidence: 91.0,
            processed_image_url: None,
            technical: Technical {
                original_stage: Stage::NonDemented,
                timestamp: "2024-01-01T00:00:00Z".into(),
            },
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
        assert_eq!(json["prediction"]["stage"], "No Dementia Detected");
        assert_eq!(json["prediction"]["processedImageUrl"], serde_json::Value::Null);
        assert_eq!(json["prediction"]["technical"]["original_stage"], "NonDemented");
    }

    #[test]
    fn failure_envelope_shape() {
        let json = serde_json::to_value(InferenceResponse::failed("No file uploaded")).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "No file uploaded"}));
    }
}
