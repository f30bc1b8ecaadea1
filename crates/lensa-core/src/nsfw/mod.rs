//! NSFW image detection on top of a generic image classifier.

mod classifier;

pub use classifier::{load_labels, OnnxImageClassifier, DEFAULT_LABELS};

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::VisionError;

/// One class score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub score: f32,
}

/// Image classification model.
pub trait ImageClassifier: Send + Sync {
    /// Class scores, highest first.
    fn classify(&self, image: &DynamicImage) -> Result<Vec<Prediction>, VisionError>;

    fn model_name(&self) -> &str;
}

/// NSFW verdict for one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NsfwReport {
    pub is_nsfw: bool,
    /// Highest `nsfw` score, rounded to 4 decimals; 0 when the model has no such label.
    pub confidence: f32,
    pub threshold: f32,
    pub predictions: Vec<Prediction>,
}

/// Flags images whose `nsfw` score is strictly above a threshold.
pub struct NsfwDetector {
    classifier: Box<dyn ImageClassifier>,
    threshold: f32,
}

impl NsfwDetector {
    pub fn new(classifier: Box<dyn ImageClassifier>) -> Self {
        Self {
            classifier,
            threshold: 0.5,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn model_name(&self) -> &str {
        self.classifier.model_name()
    }

    pub fn detect(&self, image: &DynamicImage) -> Result<NsfwReport, VisionError> {
        let predictions = self.classifier.classify(image)?;

        let nsfw_scores = predictions
            .iter()
            .filter(|p| p.label.eq_ignore_ascii_case("nsfw"))
            .map(|p| p.score);

        let mut is_nsfw = false;
        let mut confidence = 0.0f32;
        for score in nsfw_scores {
            is_nsfw |= score > self.threshold;
            confidence = confidence.max(score);
        }

        info!("NSFW check: is_nsfw={}, confidence={:.4}", is_nsfw, confidence);

        Ok(NsfwReport {
            is_nsfw,
            confidence: round4(confidence),
            threshold: self.threshold,
            predictions,
        })
    }
}

/// Round to 4 decimal places.
pub fn round4(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}
