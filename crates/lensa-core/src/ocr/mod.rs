//! OCR text items and the reader seam the pipelines depend on.

#[cfg(feature = "paddle-ocr")]
mod engine;

#[cfg(feature = "paddle-ocr")]
pub use engine::PaddleTextReader;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;
use crate::geometry::{Point, Polygon};

/// A single recognized line of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "TextItemRecord")]
pub struct TextItem {
    /// Recognized text, as returned by the engine.
    pub text: String,

    /// Recognition confidence (0.0 - 1.0).
    #[serde(default)]
    pub confidence: f32,

    /// Quadrilateral around the text.
    #[serde(rename = "bbox", alias = "polygon")]
    pub polygon: Polygon,
}

impl TextItem {
    pub fn new(text: impl Into<String>, confidence: f32, polygon: Polygon) -> Self {
        Self {
            text: text.into(),
            confidence,
            polygon,
        }
    }

    /// Center of the bounding polygon.
    pub fn center(&self) -> Point {
        self.polygon.center()
    }
}

/// Serialized form of a [`TextItem`], with its derived center.
#[derive(Serialize)]
struct TextItemRecord {
    text: String,
    confidence: f32,
    bbox: Polygon,
    center: [f32; 2],
}

impl From<TextItem> for TextItemRecord {
    fn from(item: TextItem) -> Self {
        let center = item.center();
        Self {
            text: item.text,
            confidence: item.confidence,
            bbox: item.polygon,
            center: [center.x, center.y],
        }
    }
}

/// Anything that can turn an image into positioned text lines.
pub trait TextReader: Send + Sync {
    /// Recognize every text region in `image`. Order is not guaranteed.
    fn read(&self, image: &DynamicImage) -> Result<Vec<TextItem>, OcrError>;

    /// Engine name for service info.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_text_item_json_includes_center() {
        let item = TextItem::new("NIK", 0.9, Polygon::from_rect(0.0, 0.0, 10.0, 4.0));
        let value = serde_json::to_value(&item).unwrap();

        assert_eq!(value["text"], "NIK");
        assert_eq!(value["center"], serde_json::json!([5.0, 2.0]));
        assert_eq!(value["bbox"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_text_item_parses_both_polygon_encodings() {
        let points: TextItem = serde_json::from_str(
            r#"{"text": "a", "confidence": 0.5, "bbox": [[0,0],[2,0],[2,2],[0,2]]}"#,
        )
        .unwrap();
        let lists: TextItem = serde_json::from_str(
            r#"{"text": "a", "confidence": 0.5, "polygon": {"x": [0,2,2,0], "y": [0,0,2,2]}}"#,
        )
        .unwrap();

        assert_eq!(points, lists);
        assert_eq!(points.center(), Point::new(1.0, 1.0));
    }

    #[test]
    fn test_text_item_rejects_malformed_polygon() {
        let result = serde_json::from_str::<TextItem>(r#"{"text": "a", "bbox": [[0,0],[1,1]]}"#);
        assert!(result.is_err());
    }
}
