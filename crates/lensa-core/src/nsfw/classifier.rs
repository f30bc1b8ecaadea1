//! ONNX image classifier (ViT-style, HuggingFace export).

use std::collections::BTreeMap;
use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;
use serde::Deserialize;
use tracing::{debug, warn};

use lensa_inference::{take_output, InferenceBackend, InputTensor};

use crate::error::VisionError;
use crate::preprocess::{softmax, to_nchw, Normalization};

use super::{ImageClassifier, Prediction};

/// Labels used when the model ships without a `config.json`.
pub const DEFAULT_LABELS: [&str; 2] = ["normal", "nsfw"];

/// Image classifier over an exported `pixel_values -> logits` model.
pub struct OnnxImageClassifier<B: InferenceBackend> {
    backend: B,
    labels: Vec<String>,
    input_size: u32,
    model_name: String,
}

#[derive(Deserialize)]
struct HfConfig {
    #[serde(default)]
    id2label: BTreeMap<String, String>,
}

/// Read `id2label` from a HuggingFace `config.json`, ordered by class index.
pub fn load_labels(path: &Path) -> Result<Vec<String>, VisionError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| VisionError::ModelLoad(format!("{}: {}", path.display(), e)))?;
    let config: HfConfig = serde_json::from_str(&content)
        .map_err(|e| VisionError::ModelLoad(format!("{}: {}", path.display(), e)))?;

    let mut indexed: Vec<(usize, String)> = config
        .id2label
        .into_iter()
        .map(|(k, v)| {
            k.parse::<usize>()
                .map(|i| (i, v))
                .map_err(|_| VisionError::ModelLoad(format!("non-numeric label id '{}'", k)))
        })
        .collect::<Result<_, _>>()?;
    indexed.sort_by_key(|(i, _)| *i);

    Ok(indexed.into_iter().map(|(_, label)| label).collect())
}

impl<B: InferenceBackend> OnnxImageClassifier<B> {
    pub fn new(backend: B, model_name: impl Into<String>) -> Self {
        Self {
            backend,
            labels: DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
            input_size: 224,
            model_name: model_name.into(),
        }
    }

    /// Set class labels, index-aligned with the model logits.
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        if labels.is_empty() {
            warn!("Ignoring empty label list, keeping defaults");
        } else {
            self.labels = labels;
        }
        self
    }

    /// Load labels from a `config.json` if it exists.
    pub fn with_labels_from(self, path: &Path) -> Result<Self, VisionError> {
        if !path.exists() {
            debug!("No label config at {}, using defaults", path.display());
            return Ok(self);
        }
        Ok(self.with_labels(load_labels(path)?))
    }

    pub fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = size.max(1);
        self
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl<B: InferenceBackend> ImageClassifier for OnnxImageClassifier<B> {
    fn classify(&self, image: &DynamicImage) -> Result<Vec<Prediction>, VisionError> {
        let size = self.input_size;
        let tensor = to_nchw(image, size, size, FilterType::Triangle, Normalization::HALF);

        let outputs = self
            .backend
            .run(&[("pixel_values", InputTensor::Float32(tensor.into_dyn()))])?;
        let logits = take_output(outputs, "logits")?.into_f32()?;

        let logits: Vec<f32> = logits.iter().cloned().collect();
        if logits.len() != self.labels.len() {
            return Err(VisionError::UnexpectedOutput(format!(
                "model produced {} logits for {} labels",
                logits.len(),
                self.labels.len()
            )));
        }

        let mut predictions: Vec<Prediction> = softmax(&logits)
            .into_iter()
            .zip(&self.labels)
            .map(|(score, label)| Prediction {
                label: label.clone(),
                score,
            })
            .collect();
        predictions.sort_by(|a, b| b.score.total_cmp(&a.score));

        debug!("Classification: {:?}", predictions);
        Ok(predictions)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
