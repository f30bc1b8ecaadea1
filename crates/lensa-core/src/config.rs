//! Configuration structures for the lensa services.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use lensa_inference::OrtOptions;

use crate::geometry::DEFAULT_CROP_PADDING;

/// Main configuration for lensa.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LensaConfig {
    /// HTTP server configuration.
    pub server: ServerConfig,

    /// ONNX Runtime session settings shared by all models.
    pub runtime: RuntimeConfig,

    /// Text reader (PaddleOCR models) configuration.
    pub ocr: OcrConfig,

    /// ID card pipeline configuration.
    pub id_card: IdCardConfig,

    /// NSFW classifier configuration.
    pub nsfw: NsfwConfig,

    /// Image captioning configuration.
    pub caption: CaptionConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Maximum accepted request body, in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

/// ONNX Runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Number of intra-op CPU threads per session.
    pub num_threads: usize,

    /// Register the XNNPACK execution provider.
    pub use_xnnpack: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            num_threads: 4,
            use_xnnpack: true,
        }
    }
}

impl RuntimeConfig {
    pub fn ort_options(&self) -> OrtOptions {
        OrtOptions {
            intra_threads: self.num_threads,
            use_xnnpack: self.use_xnnpack,
        }
    }
}

/// Text reader configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing the OCR model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` tokens in recognized text instead of replacing them with spaces.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models/ocr"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "rec.onnx".to_string(),
            dictionary: "dict.txt".to_string(),
            keep_unk: false,
        }
    }
}

impl OcrConfig {
    pub fn detection_path(&self) -> PathBuf {
        self.model_dir.join(&self.detection_model)
    }

    pub fn recognition_path(&self) -> PathBuf {
        self.model_dir.join(&self.recognition_model)
    }

    pub fn dictionary_path(&self) -> PathBuf {
        self.model_dir.join(&self.dictionary)
    }
}

/// ID card pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdCardConfig {
    /// Load the ID card service at startup.
    pub enabled: bool,

    /// YOLOv8 card detector model. Without it the full image is read.
    pub detector_model: Option<PathBuf>,

    /// Minimum detector score for a box to be considered.
    pub detection_threshold: f32,

    /// Square detector input size.
    pub input_size: u32,

    /// Pixels added around the detected card before cropping.
    pub crop_padding: u32,
}

impl Default for IdCardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detector_model: Some(PathBuf::from("models/id_card/yolov8n.onnx")),
            detection_threshold: 0.25,
            input_size: 640,
            crop_padding: DEFAULT_CROP_PADDING,
        }
    }
}

/// NSFW classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NsfwConfig {
    /// Load the NSFW service at startup.
    pub enabled: bool,

    /// Directory with `model.onnx` and an optional `config.json`.
    pub model_dir: PathBuf,

    /// Model file name inside `model_dir`.
    pub model_file: String,

    /// Name reported by the info endpoints.
    pub model_name: String,

    /// Scores strictly above this flag an image.
    pub threshold: f32,

    /// Square classifier input size.
    pub input_size: u32,
}

impl Default for NsfwConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_dir: PathBuf::from("models/nsfw"),
            model_file: "model.onnx".to_string(),
            model_name: "Falconsai/nsfw_image_detection".to_string(),
            threshold: 0.5,
            input_size: 224,
        }
    }
}

impl NsfwConfig {
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_file)
    }

    pub fn labels_path(&self) -> PathBuf {
        self.model_dir.join("config.json")
    }
}

/// Image captioning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Load the captioning service at startup.
    pub enabled: bool,

    /// Directory with the encoder, decoder and tokenizer files.
    pub model_dir: PathBuf,

    /// Vision encoder model file name.
    pub encoder_model: String,

    /// Text decoder model file name.
    pub decoder_model: String,

    /// HuggingFace `tokenizer.json` file name.
    pub tokenizer: String,

    /// Name reported by the info endpoints.
    pub model_name: String,

    /// Default generated token limit.
    pub max_length: usize,

    /// Square encoder input size.
    pub image_size: u32,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_dir: PathBuf::from("models/caption"),
            encoder_model: "vision_encoder.onnx".to_string(),
            decoder_model: "text_decoder.onnx".to_string(),
            tokenizer: "tokenizer.json".to_string(),
            model_name: "Salesforce/blip-image-captioning-base".to_string(),
            max_length: 512,
            image_size: 384,
        }
    }
}

impl CaptionConfig {
    pub fn encoder_path(&self) -> PathBuf {
        self.model_dir.join(&self.encoder_model)
    }

    pub fn decoder_path(&self) -> PathBuf {
        self.model_dir.join(&self.decoder_model)
    }

    pub fn tokenizer_path(&self) -> PathBuf {
        self.model_dir.join(&self.tokenizer)
    }
}

impl LensaConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// Every model file the enabled services expect, labelled for reporting.
    pub fn model_files(&self) -> Vec<(&'static str, PathBuf)> {
        let mut files = Vec::new();

        if self.id_card.enabled {
            files.push(("ocr detection", self.ocr.detection_path()));
            files.push(("ocr recognition", self.ocr.recognition_path()));
            files.push(("ocr dictionary", self.ocr.dictionary_path()));
            if let Some(detector) = &self.id_card.detector_model {
                files.push(("card detector", detector.clone()));
            }
        }

        if self.nsfw.enabled {
            files.push(("nsfw classifier", self.nsfw.model_path()));
        }

        if self.caption.enabled {
            files.push(("caption encoder", self.caption.encoder_path()));
            files.push(("caption decoder", self.caption.decoder_path()));
            files.push(("caption tokenizer", self.caption.tokenizer_path()));
        }

        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = LensaConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.max_upload_bytes, 16 * 1024 * 1024);
        assert_eq!(config.nsfw.threshold, 0.5);
        assert_eq!(config.caption.max_length, 512);
        assert_eq!(config.id_card.crop_padding, 10);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: LensaConfig =
            serde_json::from_str(r#"{"server": {"port": 8080}, "nsfw": {"threshold": 0.7}}"#)
                .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.nsfw.threshold, 0.7);
        assert_eq!(config.ocr.detection_model, "det.onnx");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = LensaConfig::default();
        config.caption.max_length = 64;
        config.id_card.detector_model = None;
        config.save(&path).unwrap();

        let loaded = LensaConfig::from_file(&path).unwrap();
        assert_eq!(loaded.caption.max_length, 64);
        assert_eq!(loaded.id_card.detector_model, None);
    }

    #[test]
    fn test_model_files_skip_disabled_services() {
        let mut config = LensaConfig::default();
        config.nsfw.enabled = false;
        config.caption.enabled = false;

        let labels: Vec<&str> = config.model_files().iter().map(|(l, _)| *l).collect();
        assert_eq!(
            labels,
            vec!["ocr detection", "ocr recognition", "ocr dictionary", "card detector"]
        );
    }
}
