//! BLIP-style captioning: vision encoder plus autoregressive text decoder.

use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::{ArrayD, Axis};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use lensa_inference::{take_output, InferenceBackend, InputTensor};

use crate::error::VisionError;
use crate::preprocess::{to_nchw, Normalization};

use super::CaptionModel;

/// Captioner over an exported encoder/decoder pair and its `tokenizer.json`.
pub struct OnnxCaptioner<B: InferenceBackend> {
    encoder: B,
    decoder: B,
    tokenizer: Tokenizer,
    bos_token_id: u32,
    eos_token_id: u32,
    image_size: u32,
    model_name: String,
}

/// Load a HuggingFace tokenizer file.
pub fn load_tokenizer(path: &Path) -> Result<Tokenizer, VisionError> {
    Tokenizer::from_file(path)
        .map_err(|e| VisionError::ModelLoad(format!("tokenizer {}: {}", path.display(), e)))
}

impl<B: InferenceBackend> OnnxCaptioner<B> {
    /// Build from loaded parts. The decoder starts from `[DEC]` (or `[CLS]`)
    /// and stops at `[SEP]`.
    pub fn new(
        encoder: B,
        decoder: B,
        tokenizer: Tokenizer,
        model_name: impl Into<String>,
    ) -> Result<Self, VisionError> {
        let bos_token_id = tokenizer
            .token_to_id("[DEC]")
            .or_else(|| tokenizer.token_to_id("[CLS]"))
            .ok_or_else(|| VisionError::Tokenizer("no [DEC] or [CLS] token".to_string()))?;
        let eos_token_id = tokenizer
            .token_to_id("[SEP]")
            .ok_or_else(|| VisionError::Tokenizer("no [SEP] token".to_string()))?;

        debug!("Special tokens - BOS: {}, EOS: {}", bos_token_id, eos_token_id);

        Ok(Self {
            encoder,
            decoder,
            tokenizer,
            bos_token_id,
            eos_token_id,
            image_size: 384,
            model_name: model_name.into(),
        })
    }

    pub fn with_image_size(mut self, size: u32) -> Self {
        self.image_size = size.max(1);
        self
    }

    /// `[1, S, D]` image embeddings.
    fn encode(&self, image: &DynamicImage) -> Result<ArrayD<f32>, VisionError> {
        let size = self.image_size;
        let pixels = to_nchw(image, size, size, FilterType::CatmullRom, Normalization::CLIP);

        let outputs = self
            .encoder
            .run(&[("pixel_values", InputTensor::Float32(pixels.into_dyn()))])?;
        let hidden = take_output(outputs, "last_hidden_state")?.into_f32()?;

        if hidden.ndim() != 3 {
            return Err(VisionError::UnexpectedOutput(format!(
                "expected [1, S, D] image embeddings, got {:?}",
                hidden.shape()
            )));
        }
        Ok(hidden)
    }

    /// Logits for the token after `tokens`.
    fn next_logits(&self, hidden: &ArrayD<f32>, tokens: &[u32]) -> Result<Vec<f32>, VisionError> {
        let len = tokens.len();
        let ids: Vec<i64> = tokens.iter().map(|&t| i64::from(t)).collect();

        let mut inputs = vec![
            ("input_ids", InputTensor::from_i64(ids, &[1, len])?),
            ("encoder_hidden_states", InputTensor::Float32(hidden.clone())),
        ];
        if self.decoder.has_input("attention_mask") {
            inputs.push(("attention_mask", InputTensor::from_i64(vec![1; len], &[1, len])?));
        }
        if self.decoder.has_input("encoder_attention_mask") {
            let seq = hidden.shape()[1];
            inputs.push((
                "encoder_attention_mask",
                InputTensor::from_i64(vec![1; seq], &[1, seq])?,
            ));
        }

        let logits = take_output(self.decoder.run(&inputs)?, "logits")?.into_f32()?;
        if logits.ndim() != 3 || logits.shape()[1] == 0 {
            return Err(VisionError::UnexpectedOutput(format!(
                "expected [1, T, V] logits, got {:?}",
                logits.shape()
            )));
        }

        let last = logits.shape()[1] - 1;
        Ok(logits
            .index_axis(Axis(0), 0)
            .index_axis(Axis(0), last)
            .iter()
            .cloned()
            .collect())
    }
}

/// Greedy decoding: append the argmax token until `eos` or `max_length`
/// total tokens (start token included). Returns the generated tokens.
pub fn greedy_decode<F>(
    bos: u32,
    eos: u32,
    max_length: usize,
    mut next_logits: F,
) -> Result<Vec<u32>, VisionError>
where
    F: FnMut(&[u32]) -> Result<Vec<f32>, VisionError>,
{
    let mut tokens = vec![bos];

    while tokens.len() < max_length {
        let logits = next_logits(&tokens)?;
        let next = logits
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i as u32)
            .ok_or_else(|| VisionError::UnexpectedOutput("empty logits".to_string()))?;

        if next == eos {
            break;
        }
        tokens.push(next);
    }

    Ok(tokens.split_off(1))
}

impl<B: InferenceBackend> CaptionModel for OnnxCaptioner<B> {
    fn generate(&self, image: &DynamicImage, max_length: usize) -> Result<String, VisionError> {
        let hidden = self.encode(image)?;
        debug!("Image embeddings shape: {:?}", hidden.shape());

        let tokens = greedy_decode(self.bos_token_id, self.eos_token_id, max_length, |t| {
            self.next_logits(&hidden, t)
        })?;

        let text = self
            .tokenizer
            .decode(&tokens, true)
            .map_err(|e| VisionError::Tokenizer(e.to_string()))?;

        info!("Generated {} tokens", tokens.len());
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
