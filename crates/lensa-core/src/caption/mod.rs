//! Image captioning ("image to text").

mod captioner;

pub use captioner::{greedy_decode, load_tokenizer, OnnxCaptioner};

use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::VisionError;

/// Upper bound on generated length; BLIP's decoder has 512 positions.
pub const MAX_CAPTION_LENGTH: usize = 512;

/// Image-conditioned text generator.
pub trait CaptionModel: Send + Sync {
    /// Generate text for `image`, at most `max_length` tokens including the start token.
    fn generate(&self, image: &DynamicImage, max_length: usize) -> Result<String, VisionError>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionResult {
    pub extracted_text: String,
    /// Length of `extracted_text` in characters.
    pub text_length: usize,
    pub model_used: String,
}

/// Captioning service with a default length limit.
pub struct ImageToText {
    model: Box<dyn CaptionModel>,
    default_max_length: usize,
}

impl ImageToText {
    pub fn new(model: Box<dyn CaptionModel>) -> Self {
        Self {
            model,
            default_max_length: MAX_CAPTION_LENGTH,
        }
    }

    pub fn with_default_max_length(mut self, max_length: usize) -> Self {
        self.default_max_length = max_length.clamp(1, MAX_CAPTION_LENGTH);
        self
    }

    pub fn default_max_length(&self) -> usize {
        self.default_max_length
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn caption(
        &self,
        image: &DynamicImage,
        max_length: Option<usize>,
    ) -> Result<CaptionResult, VisionError> {
        let requested = max_length.unwrap_or(self.default_max_length);
        let max_length = requested.clamp(1, MAX_CAPTION_LENGTH);
        if max_length != requested {
            debug!("Clamped max_length {} to {}", requested, max_length);
        }

        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let text = self.model.generate(&rgb, max_length)?;
        let extracted_text = text.trim().to_string();

        info!("Caption generated: {} chars", extracted_text.chars().count());

        Ok(CaptionResult {
            text_length: extracted_text.chars().count(),
            extracted_text,
            model_used: self.model.model_name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct Echo {
        text: &'static str,
        last_max: Mutex<Option<usize>>,
    }

    impl CaptionModel for std::sync::Arc<Echo> {
        fn generate(&self, _: &DynamicImage, max_length: usize) -> Result<String, VisionError> {
            *self.last_max.lock().unwrap() = Some(max_length);
            Ok(self.text.to_string())
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    fn service(text: &'static str) -> (ImageToText, std::sync::Arc<Echo>) {
        let echo = std::sync::Arc::new(Echo {
            text,
            last_max: Mutex::new(None),
        });
        (ImageToText::new(Box::new(echo.clone())), echo)
    }

    #[test]
    fn test_caption_trims_and_counts_chars() {
        let (svc, _) = service("  une boîte rouge \n");
        let result = svc.caption(&DynamicImage::new_rgb8(4, 4), None).unwrap();
        assert_eq!(result.extracted_text, "une boîte rouge");
        assert_eq!(result.text_length, 15);
        assert_eq!(result.model_used, "echo");
    }

    #[test]
    fn test_default_and_explicit_max_length() {
        let (svc, echo) = service("x");
        svc.caption(&DynamicImage::new_rgb8(4, 4), None).unwrap();
        assert_eq!(*echo.last_max.lock().unwrap(), Some(512));

        svc.caption(&DynamicImage::new_rgb8(4, 4), Some(20)).unwrap();
        assert_eq!(*echo.last_max.lock().unwrap(), Some(20));

        svc.caption(&DynamicImage::new_rgb8(4, 4), Some(10_000)).unwrap();
        assert_eq!(*echo.last_max.lock().unwrap(), Some(MAX_CAPTION_LENGTH));
    }
}
