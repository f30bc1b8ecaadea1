//! Points, quadrilaterals and axis-aligned boxes shared by the pipelines.

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ExtractionError;

/// Padding added around a detected card before cropping, in pixels.
pub const DEFAULT_CROP_PADDING: u32 = 10;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A quadrilateral text region, always exactly four corners.
///
/// OCR engines hand polygons over in one of two encodings; both are accepted
/// through explicit constructors and normalized here, so nothing downstream
/// has to inspect array shapes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<[f32; 2]>", try_from = "PolygonInput")]
pub struct Polygon {
    points: [Point; 4],
}

impl Polygon {
    /// Build from a list of `[x, y]` pairs.
    pub fn from_points(points: &[[f32; 2]]) -> Result<Self, ExtractionError> {
        if points.len() != 4 {
            return Err(ExtractionError::MalformedPolygon(format!(
                "expected 4 points, got {}",
                points.len()
            )));
        }

        let mut corners = [Point::new(0.0, 0.0); 4];
        for (corner, [x, y]) in corners.iter_mut().zip(points) {
            *corner = Point::new(*x, *y);
        }
        Ok(Self { points: corners })
    }

    /// Build from parallel x and y coordinate lists.
    pub fn from_coordinate_lists(xs: &[f32], ys: &[f32]) -> Result<Self, ExtractionError> {
        if xs.len() != 4 || ys.len() != 4 {
            return Err(ExtractionError::MalformedPolygon(format!(
                "expected 4 x and 4 y coordinates, got {} and {}",
                xs.len(),
                ys.len()
            )));
        }

        let mut corners = [Point::new(0.0, 0.0); 4];
        for (i, corner) in corners.iter_mut().enumerate() {
            *corner = Point::new(xs[i], ys[i]);
        }
        Ok(Self { points: corners })
    }

    /// Axis-aligned rectangle as a polygon (TL, TR, BR, BL).
    pub fn from_rect(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            points: [
                Point::new(x1, y1),
                Point::new(x2, y1),
                Point::new(x2, y2),
                Point::new(x1, y2),
            ],
        }
    }

    /// Arithmetic mean of the four corners.
    pub fn center(&self) -> Point {
        let (sx, sy) = self
            .points
            .iter()
            .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point::new(sx / 4.0, sy / 4.0)
    }
}

impl From<Polygon> for Vec<[f32; 2]> {
    fn from(polygon: Polygon) -> Self {
        polygon.points.iter().map(|p| [p.x, p.y]).collect()
    }
}

/// Wire encodings of a polygon accepted at ingestion.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PolygonInput {
    /// `[[x, y], [x, y], [x, y], [x, y]]`
    Points(Vec<[f32; 2]>),
    /// `{"x": [..4], "y": [..4]}`
    Coordinates { x: Vec<f32>, y: Vec<f32> },
}

impl TryFrom<PolygonInput> for Polygon {
    type Error = ExtractionError;

    fn try_from(input: PolygonInput) -> Result<Self, Self::Error> {
        match input {
            PolygonInput::Points(points) => Polygon::from_points(&points),
            PolygonInput::Coordinates { x, y } => Polygon::from_coordinate_lists(&x, &y),
        }
    }
}

/// Axis-aligned box `(x1, y1, x2, y2)` in integer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "[i32; 4]", from = "[i32; 4]")]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i64 {
        i64::from(self.x2) - i64::from(self.x1)
    }

    pub fn height(&self) -> i64 {
        i64::from(self.y2) - i64::from(self.y1)
    }

    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

impl From<[i32; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [i32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

/// Pick the region with the largest `width * height`.
///
/// Ties keep the earliest box. Returns `None` for an empty slice.
pub fn select_best_box(boxes: &[BoundingBox]) -> Option<BoundingBox> {
    let mut best: Option<BoundingBox> = None;
    for candidate in boxes {
        match best {
            Some(current) if current.area() >= candidate.area() => {}
            _ => best = Some(*candidate),
        }
    }
    best
}

/// Crop `image` to `bbox` grown by `padding` on every side, clamped to the
/// image bounds. Without a box the image is returned unchanged.
pub fn crop_to_box(image: &DynamicImage, bbox: Option<BoundingBox>, padding: u32) -> DynamicImage {
    let Some(bbox) = bbox else {
        return image.clone();
    };

    let (width, height) = image.dimensions();
    let pad = i64::from(padding);

    let x1 = (i64::from(bbox.x1) - pad).clamp(0, i64::from(width));
    let y1 = (i64::from(bbox.y1) - pad).clamp(0, i64::from(height));
    let x2 = (i64::from(bbox.x2) + pad).clamp(0, i64::from(width));
    let y2 = (i64::from(bbox.y2) + pad).clamp(0, i64::from(height));

    if x2 <= x1 || y2 <= y1 {
        debug!("Crop region {:?} is empty after clamping, keeping full image", bbox);
        return image.clone();
    }

    image.crop_imm(x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32)
}
