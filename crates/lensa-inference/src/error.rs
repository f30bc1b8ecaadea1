//! Error types for the inference layer.

use thiserror::Error;

/// Errors that can occur while loading or running an ONNX model.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// The model file could not be parsed by the runtime.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The runtime refused to build a session.
    #[error("failed to create session: {0}")]
    SessionCreate(String),

    /// Input tensor data did not match its declared shape.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Running the graph failed.
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// An output had a type or shape we cannot convert.
    #[error("failed to extract output: {0}")]
    OutputExtraction(String),

    /// A named output the caller asked for was not produced.
    #[error("model produced no output named '{0}'")]
    MissingOutput(String),

    /// I/O error when reading model files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
