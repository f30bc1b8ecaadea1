//! ONNX inference layer for lensa.
//!
//! Every model the services run (card detector, NSFW classifier, caption
//! encoder/decoder) goes through the [`InferenceBackend`] trait so the
//! pipelines can be exercised with in-memory fakes. The production backend is
//! [`OrtBackend`], ONNX Runtime with the XNNPACK execution provider.

mod backend;
mod error;
mod tensor;

pub use backend::ort::{OrtBackend, OrtOptions};
pub use backend::{take_output, InferenceBackend};
pub use error::InferenceError;
pub use tensor::{InputTensor, OutputTensor, TensorType};

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
