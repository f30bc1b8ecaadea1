//! Error types for the lensa-core library.

use thiserror::Error;

/// Main error type for the lensa library.
#[derive(Error, Debug)]
pub enum LensaError {
    /// Field extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Vision model error (detector, classifier, captioner).
    #[error("vision error: {0}")]
    Vision(#[from] VisionError),

    /// Image decoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while turning OCR output into structured records.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// A bounding polygon did not have the four-point shape we require.
    #[error("malformed polygon: {0}")]
    MalformedPolygon(String),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The OCR engine failed on an image.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// The engine returned a region we could not convert.
    #[error("invalid OCR region: {0}")]
    InvalidRegion(#[from] ExtractionError),
}

/// Errors from the ONNX-backed vision models.
#[derive(Error, Debug)]
pub enum VisionError {
    /// Model or companion file could not be loaded.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Input image could not be converted to a tensor.
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    /// The runtime failed while executing the model.
    #[error("inference failed: {0}")]
    Inference(#[from] lensa_inference::InferenceError),

    /// The model produced output we do not understand.
    #[error("unexpected model output: {0}")]
    UnexpectedOutput(String),

    /// Tokenizer failure during caption decoding.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
}

/// Result type for the lensa library.
pub type Result<T> = std::result::Result<T, LensaError>;
