//! Image to tensor conversion shared by the ONNX vision models.

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;
use tracing::debug;

/// Per-channel normalization applied after scaling pixels to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Normalization {
    /// Plain `[0, 1]` scaling (YOLO).
    pub const UNIT: Normalization = Normalization {
        mean: [0.0, 0.0, 0.0],
        std: [1.0, 1.0, 1.0],
    };

    /// `[-1, 1]` scaling used by ViT image classifiers.
    pub const HALF: Normalization = Normalization {
        mean: [0.5, 0.5, 0.5],
        std: [0.5, 0.5, 0.5],
    };

    /// OpenAI CLIP statistics, used by BLIP.
    pub const CLIP: Normalization = Normalization {
        mean: [0.481_454_66, 0.457_827_5, 0.408_210_73],
        std: [0.268_629_54, 0.261_302_58, 0.275_777_11],
    };
}

/// Resize `image` to exactly `width`x`height` and lay it out as a normalized
/// `[1, 3, H, W]` RGB tensor.
pub fn to_nchw(
    image: &DynamicImage,
    width: u32,
    height: u32,
    filter: FilterType,
    norm: Normalization,
) -> Array4<f32> {
    let resized = image.resize_exact(width, height, filter);
    let rgb = resized.to_rgb8();

    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (value - norm.mean[c]) / norm.std[c];
        }
    }

    debug!("Prepared {}x{} input tensor", width, height);
    tensor
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return vec![0.0; logits.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}
