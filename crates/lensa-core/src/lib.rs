//! Core library for lensa image services.
//!
//! This crate provides:
//! - Geometry helpers (text polygons, card boxes, best-box selection, cropping)
//! - OCR text items and a PaddleOCR reader
//! - Indonesian ID card (KTP) field extraction and the detect/crop/read pipeline
//! - NSFW image classification
//! - Image captioning (BLIP encoder/decoder)

pub mod caption;
pub mod config;
pub mod error;
pub mod geometry;
pub mod idcard;
pub mod loader;
pub mod nsfw;
pub mod ocr;
pub mod preprocess;

pub use caption::{CaptionModel, CaptionResult, ImageToText};
pub use config::LensaConfig;
pub use error::{ExtractionError, LensaError, OcrError, Result, VisionError};
pub use geometry::{crop_to_box, select_best_box, BoundingBox, Point, Polygon, PolygonInput};
pub use idcard::{
    extract_fields, CardDetector, ExtractedRecord, Field, FieldPolicy, IdCardInfo, IdCardScan,
    IdCardService,
};
pub use loader::{create_captioner, create_id_card_service, create_nsfw_detector};
pub use nsfw::{ImageClassifier, NsfwDetector, NsfwReport, Prediction};
pub use ocr::{TextItem, TextReader};

/// Re-export inference types.
pub use lensa_inference::{InferenceBackend, InputTensor, OrtBackend, OutputTensor};
