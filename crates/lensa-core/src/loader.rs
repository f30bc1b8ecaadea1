//! Build the services from configuration with ONNX Runtime backends.

use tracing::{info, warn};

use lensa_inference::OrtBackend;

use crate::caption::{load_tokenizer, ImageToText, OnnxCaptioner};
use crate::config::LensaConfig;
use crate::error::{LensaError, Result, VisionError};
use crate::idcard::{IdCardService, YoloCardDetector};
use crate::nsfw::{NsfwDetector, OnnxImageClassifier};

fn require(path: &std::path::Path, what: &str) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(LensaError::Vision(VisionError::ModelLoad(format!(
            "{} not found: {}",
            what,
            path.display()
        ))))
    }
}

/// ID card service: PaddleOCR reader plus the YOLO detector when its model is present.
#[cfg(feature = "paddle-ocr")]
pub fn create_id_card_service(config: &LensaConfig) -> Result<IdCardService> {
    use crate::ocr::PaddleTextReader;

    let reader = PaddleTextReader::from_config(&config.ocr)?;
    let mut service =
        IdCardService::new(Box::new(reader)).with_padding(config.id_card.crop_padding);

    if let Some(detector) = load_card_detector(config) {
        service = service.with_detector(Box::new(detector));
    }

    Ok(service)
}

/// The YOLO card detector, or `None` when it is unconfigured, missing or
/// fails to load. The ID card service then reads full images.
#[cfg_attr(not(feature = "paddle-ocr"), allow(dead_code))]
fn load_card_detector(config: &LensaConfig) -> Option<YoloCardDetector<OrtBackend>> {
    let Some(path) = &config.id_card.detector_model else {
        info!("No card detector configured, full images will be read");
        return None;
    };
    if !path.exists() {
        warn!(
            "Card detector model not found at {}, full images will be read",
            path.display()
        );
        return None;
    }

    match OrtBackend::from_file(path, &config.runtime.ort_options()) {
        Ok(backend) => {
            info!("Card detector loaded from {}", path.display());
            Some(
                YoloCardDetector::new(backend)
                    .with_input_size(config.id_card.input_size)
                    .with_threshold(config.id_card.detection_threshold),
            )
        }
        Err(e) => {
            warn!(
                "Failed to load card detector from {}, full images will be read: {}",
                path.display(),
                e
            );
            None
        }
    }
}

#[cfg(not(feature = "paddle-ocr"))]
pub fn create_id_card_service(_config: &LensaConfig) -> Result<IdCardService> {
    Err(LensaError::Config(
        "lensa-core was built without the paddle-ocr feature".to_string(),
    ))
}

/// NSFW detector over the configured ONNX classifier.
pub fn create_nsfw_detector(config: &LensaConfig) -> Result<NsfwDetector> {
    let nsfw = &config.nsfw;
    let model_path = nsfw.model_path();
    require(&model_path, "NSFW model")?;

    let backend = OrtBackend::from_file(&model_path, &config.runtime.ort_options())
        .map_err(VisionError::from)?;
    let classifier = OnnxImageClassifier::new(backend, nsfw.model_name.clone())
        .with_input_size(nsfw.input_size)
        .with_labels_from(&nsfw.labels_path())?;

    info!(
        "NSFW classifier {} loaded with labels {:?}",
        nsfw.model_name,
        classifier.labels()
    );

    Ok(NsfwDetector::new(Box::new(classifier)).with_threshold(nsfw.threshold))
}

/// Captioning service over the configured encoder/decoder pair.
pub fn create_captioner(config: &LensaConfig) -> Result<ImageToText> {
    let caption = &config.caption;
    let encoder_path = caption.encoder_path();
    let decoder_path = caption.decoder_path();
    let tokenizer_path = caption.tokenizer_path();

    require(&encoder_path, "caption encoder")?;
    require(&decoder_path, "caption decoder")?;
    require(&tokenizer_path, "tokenizer")?;

    let options = config.runtime.ort_options();
    let encoder = OrtBackend::from_file(&encoder_path, &options).map_err(VisionError::from)?;
    let decoder = OrtBackend::from_file(&decoder_path, &options).map_err(VisionError::from)?;
    let tokenizer = load_tokenizer(&tokenizer_path)?;

    let captioner = OnnxCaptioner::new(encoder, decoder, tokenizer, caption.model_name.clone())?
        .with_image_size(caption.image_size);

    info!("Caption model {} loaded", caption.model_name);

    Ok(ImageToText::new(Box::new(captioner)).with_default_max_length(caption.max_length))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_models_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LensaConfig::default();
        config.nsfw.model_dir = dir.path().to_path_buf();
        config.caption.model_dir = dir.path().to_path_buf();

        assert!(matches!(
            create_nsfw_detector(&config),
            Err(LensaError::Vision(VisionError::ModelLoad(_)))
        ));
        assert!(matches!(
            create_captioner(&config),
            Err(LensaError::Vision(VisionError::ModelLoad(_)))
        ));
    }

    #[test]
    fn test_card_detector_absent_or_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = LensaConfig::default();

        config.id_card.detector_model = None;
        assert!(load_card_detector(&config).is_none());

        config.id_card.detector_model = Some(dir.path().join("yolov8n.onnx"));
        assert!(load_card_detector(&config).is_none());
    }

    #[test]
    fn test_unloadable_card_detector_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yolov8n.onnx");
        std::fs::write(&path, b"not an onnx model").unwrap();

        let mut config = LensaConfig::default();
        config.id_card.detector_model = Some(path);

        assert!(load_card_detector(&config).is_none());
    }
}
