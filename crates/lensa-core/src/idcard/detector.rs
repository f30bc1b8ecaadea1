//! Card region detection.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::debug;

use lensa_inference::{InferenceBackend, InputTensor};

use crate::error::VisionError;
use crate::geometry::BoundingBox;
use crate::preprocess::{to_nchw, Normalization};

/// Finds candidate card regions in an image.
pub trait CardDetector: Send + Sync {
    /// Every region scoring above the detector's threshold, in source pixels.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<BoundingBox>, VisionError>;

    /// Detector name for service info.
    fn name(&self) -> &str;
}

/// YOLOv8 exported to ONNX: input `[1, 3, S, S]`, output `[1, 4 + C, N]`
/// with `(cx, cy, w, h)` followed by per-class scores for each anchor.
pub struct YoloCardDetector<B: InferenceBackend> {
    backend: B,
    input_size: u32,
    threshold: f32,
}

impl<B: InferenceBackend> YoloCardDetector<B> {
    /// Create a detector with the standard 640px input and 0.25 threshold.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            input_size: 640,
            threshold: 0.25,
        }
    }

    /// Set the square input size.
    pub fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = size.max(32);
        self
    }

    /// Set the minimum class score.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

impl<B: InferenceBackend> CardDetector for YoloCardDetector<B> {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<BoundingBox>, VisionError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(VisionError::Preprocessing("empty image".to_string()));
        }

        let size = self.input_size;
        let tensor = to_nchw(image, size, size, FilterType::Triangle, Normalization::UNIT);
        let input_name = self
            .backend
            .input_names()
            .first()
            .cloned()
            .unwrap_or_else(|| "images".to_string());

        let outputs = self
            .backend
            .run(&[(input_name.as_str(), InputTensor::Float32(tensor.into_dyn()))])?;

        let output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| VisionError::UnexpectedOutput("no output from detector".to_string()))?
            .1
            .into_f32()?;

        let shape = output.shape().to_vec();
        if shape.len() != 3 || shape[1] < 5 {
            return Err(VisionError::UnexpectedOutput(format!(
                "expected [1, 4+C, N] detector output, got {:?}",
                shape
            )));
        }

        let (channels, anchors) = (shape[1], shape[2]);
        let scale_x = width as f32 / size as f32;
        let scale_y = height as f32 / size as f32;

        let mut boxes = Vec::new();
        for i in 0..anchors {
            let score = (4..channels)
                .map(|c| output[[0, c, i]])
                .fold(f32::NEG_INFINITY, f32::max);
            if score <= self.threshold {
                continue;
            }

            let cx = output[[0, 0, i]] * scale_x;
            let cy = output[[0, 1, i]] * scale_y;
            let w = output[[0, 2, i]] * scale_x;
            let h = output[[0, 3, i]] * scale_y;

            boxes.push(BoundingBox::new(
                (cx - w / 2.0).clamp(0.0, width as f32) as i32,
                (cy - h / 2.0).clamp(0.0, height as f32) as i32,
                (cx + w / 2.0).clamp(0.0, width as f32) as i32,
                (cy + h / 2.0).clamp(0.0, height as f32) as i32,
            ));
        }

        debug!("Detector kept {} of {} anchors", boxes.len(), anchors);
        Ok(boxes)
    }

    fn name(&self) -> &str {
        "YOLOv8"
    }
}
