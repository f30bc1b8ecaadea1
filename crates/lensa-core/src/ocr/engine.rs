//! Text reader backed by `pure-onnx-ocr` (PaddleOCR det/rec models).

use std::sync::Mutex;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::config::OcrConfig;
use crate::error::{ExtractionError, OcrError};
use crate::geometry::Polygon;

use super::{TextItem, TextReader};

/// PaddleOCR reader running on `pure-onnx-ocr`.
pub struct PaddleTextReader {
    engine: Mutex<pure_onnx_ocr::engine::OcrEngine>,
    keep_unk: bool,
}

impl PaddleTextReader {
    /// Load detection, recognition and dictionary files named by `config`.
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        let det_path = config.detection_path();
        let rec_path = config.recognition_path();
        let dict_path = config.dictionary_path();

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "missing OCR model file: {}",
                    path.display()
                )));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded PaddleOCR reader from {}", config.model_dir.display());

        Ok(Self {
            engine: Mutex::new(engine),
            keep_unk: config.keep_unk,
        })
    }
}

impl TextReader for PaddleTextReader {
    fn read(&self, image: &DynamicImage) -> Result<Vec<TextItem>, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        debug!("Reading text from image: {}x{}", width, height);

        let results = {
            let engine = self
                .engine
                .lock()
                .map_err(|e| OcrError::Recognition(format!("engine lock poisoned: {}", e)))?;
            engine
                .run_from_image(image)
                .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?
        };

        let items = results
            .iter()
            .map(|r| {
                let text = if self.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                Ok(TextItem::new(text, r.confidence, to_polygon(&r.bounding_box)?))
            })
            .collect::<Result<Vec<_>, OcrError>>()?;

        info!(
            "OCR complete: {} text items in {}ms",
            items.len(),
            start.elapsed().as_millis()
        );

        Ok(items)
    }

    fn name(&self) -> &str {
        "PaddleOCR"
    }
}

/// First four exterior corners of the engine's polygon.
fn to_polygon(polygon: &pure_onnx_ocr::Polygon<f64>) -> Result<Polygon, ExtractionError> {
    let points: Vec<[f32; 2]> = polygon
        .exterior()
        .coords()
        .take(4)
        .map(|c| [c.x as f32, c.y as f32])
        .collect();
    Polygon::from_points(&points)
}
