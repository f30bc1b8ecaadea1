//! ID card pipeline: detect the card, crop it, read it, parse the fields.

mod detector;
mod fields;
mod patterns;

pub use detector::{CardDetector, YoloCardDetector};
pub use fields::{extract_fields, ExtractedRecord, Field, FieldPolicy};

use std::time::Instant;

use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::geometry::{crop_to_box, select_best_box, BoundingBox, DEFAULT_CROP_PADDING};
use crate::ocr::{TextItem, TextReader};

/// Outcome of a full ID card scan.
#[derive(Debug, Clone, Serialize)]
pub struct IdCardScan {
    /// Whether the detector located a card.
    pub card_detected: bool,

    /// Card region in source pixels, when detected.
    pub bbox: Option<BoundingBox>,

    /// Parsed fields.
    pub record: ExtractedRecord,

    /// Raw OCR output on the cropped card.
    pub items: Vec<TextItem>,

    /// Confidence of each OCR item, in engine order.
    pub confidence_scores: Vec<f32>,

    /// Mean of `confidence_scores`, 0 when nothing was read.
    pub average_confidence: f32,
}

/// Model names reported by the info endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct IdCardInfo {
    pub card_detector: String,
    pub ocr_engine: String,
    pub crop_padding: u32,
}

/// The ID card pipeline over injected detector and reader.
pub struct IdCardService {
    detector: Option<Box<dyn CardDetector>>,
    reader: Box<dyn TextReader>,
    padding: u32,
}

impl IdCardService {
    /// Create a service without a card detector; the full image is read.
    pub fn new(reader: Box<dyn TextReader>) -> Self {
        Self {
            detector: None,
            reader,
            padding: DEFAULT_CROP_PADDING,
        }
    }

    /// Set the card detector.
    pub fn with_detector(mut self, detector: Box<dyn CardDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Set crop padding around the detected card.
    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    /// Largest detected card region. Detector failures degrade to `None`.
    pub fn detect(&self, image: &DynamicImage) -> Option<BoundingBox> {
        let detector = self.detector.as_ref()?;

        match detector.detect(image) {
            Ok(boxes) => {
                debug!("{} returned {} candidate regions", detector.name(), boxes.len());
                select_best_box(&boxes)
            }
            Err(e) => {
                warn!("Card detection failed, using full image: {}", e);
                None
            }
        }
    }

    /// Run detect, crop, read and parse on one image.
    pub fn process(&self, image: &DynamicImage) -> Result<IdCardScan> {
        let start = Instant::now();

        let bbox = self.detect(image);
        let card = crop_to_box(image, bbox, self.padding);
        let items = self.reader.read(&card)?;
        let record = extract_fields(&items);

        let confidence_scores: Vec<f32> = items.iter().map(|i| i.confidence).collect();
        let average_confidence = if confidence_scores.is_empty() {
            0.0
        } else {
            confidence_scores.iter().sum::<f32>() / confidence_scores.len() as f32
        };

        info!(
            "ID card processed: card_detected={}, {} text items, {} fields in {}ms",
            bbox.is_some(),
            items.len(),
            record.filled_count(),
            start.elapsed().as_millis()
        );

        Ok(IdCardScan {
            card_detected: bbox.is_some(),
            bbox,
            record,
            items,
            confidence_scores,
            average_confidence,
        })
    }

    pub fn info(&self) -> IdCardInfo {
        IdCardInfo {
            card_detector: self
                .detector
                .as_ref()
                .map(|d| d.name().to_string())
                .unwrap_or_else(|| "Not loaded".to_string()),
            ocr_engine: self.reader.name().to_string(),
            crop_padding: self.padding,
        }
    }
}
