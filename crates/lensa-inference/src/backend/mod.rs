//! Inference backend implementations.

pub mod ort;

use crate::{InferenceError, InputTensor, OutputTensor, Result};

/// Trait for ONNX inference backends.
///
/// Implementations must be shareable across request handlers, so the trait
/// requires `Send + Sync`; backends that need exclusive access to their
/// session serialize internally.
pub trait InferenceBackend: Send + Sync {
    /// Run inference with the given named inputs.
    ///
    /// Returns the named output tensors in the order the model declares them.
    fn run(&self, inputs: &[(&str, InputTensor)]) -> Result<Vec<(String, OutputTensor)>>;

    /// Input names expected by the model.
    fn input_names(&self) -> &[String];

    /// Output names produced by the model.
    fn output_names(&self) -> &[String];

    /// Whether the model declares an input with this name.
    fn has_input(&self, name: &str) -> bool {
        self.input_names().iter().any(|n| n == name)
    }
}

/// Take the output named `name`, or the first output when the model uses
/// an unexpected name and produced exactly one tensor.
pub fn take_output(outputs: Vec<(String, OutputTensor)>, name: &str) -> Result<OutputTensor> {
    let single = outputs.len() == 1;
    let mut first = None;

    for (output_name, tensor) in outputs {
        if output_name == name {
            return Ok(tensor);
        }
        if first.is_none() {
            first = Some(tensor);
        }
    }

    match first {
        Some(tensor) if single => Ok(tensor),
        _ => Err(InferenceError::MissingOutput(name.to_string())),
    }
}
