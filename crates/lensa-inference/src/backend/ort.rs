//! ONNX Runtime (ort) backend with the XNNPACK execution provider.

use std::path::Path;
use std::sync::Mutex;

use ndarray::{ArrayD, IxDyn};
use ort::ep::XNNPACK;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{Session, SessionInputValue};
use ort::value::{DynValue, Tensor};
use tracing::debug;

use crate::error::InferenceError;
use crate::tensor::{InputTensor, OutputTensor};
use crate::{InferenceBackend, Result};

/// Session options shared by every model lensa loads.
#[derive(Debug, Clone)]
pub struct OrtOptions {
    /// Intra-op thread count.
    pub intra_threads: usize,
    /// Register the XNNPACK execution provider.
    pub use_xnnpack: bool,
}

impl Default for OrtOptions {
    fn default() -> Self {
        Self {
            intra_threads: 4,
            use_xnnpack: true,
        }
    }
}

/// Backend using ONNX Runtime for native inference.
pub struct OrtBackend {
    session: Mutex<Session>,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl std::fmt::Debug for OrtBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtBackend")
            .field("input_names", &self.input_names)
            .field("output_names", &self.output_names)
            .finish_non_exhaustive()
    }
}

impl OrtBackend {
    /// Load a model from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P, options: &OrtOptions) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading ONNX model from: {}", path.display());

        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, options)
    }

    /// Load a model from bytes.
    pub fn from_bytes(bytes: &[u8], options: &OrtOptions) -> Result<Self> {
        debug!("Loading ONNX model from {} bytes", bytes.len());

        let mut builder = Session::builder()
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?;

        if options.use_xnnpack {
            builder = builder
                .with_execution_providers([XNNPACK::default().build()])
                .map_err(|e| InferenceError::SessionCreate(e.to_string()))?;
        }

        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .with_intra_threads(options.intra_threads.max(1))
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .commit_from_memory(bytes)
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|i| i.name().to_string())
            .collect();

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();

        debug!("Model inputs: {:?}", input_names);
        debug!("Model outputs: {:?}", output_names);

        Ok(Self {
            session: Mutex::new(session),
            input_names,
            output_names,
        })
    }
}

fn to_ort<T>(arr: &ArrayD<T>) -> Result<SessionInputValue<'static>>
where
    T: Clone + ort::tensor::PrimitiveTensorElementType + std::fmt::Debug + 'static,
{
    let shape: Vec<i64> = arr.shape().iter().map(|&s| s as i64).collect();
    let data: Vec<T> = arr.iter().cloned().collect();
    Tensor::from_array((shape, data))
        .map(Into::into)
        .map_err(|e| InferenceError::InvalidInput(e.to_string()))
}

fn convert_input(tensor: &InputTensor) -> Result<SessionInputValue<'static>> {
    match tensor {
        InputTensor::Float32(arr) => to_ort(arr),
        InputTensor::Float64(arr) => to_ort(arr),
        InputTensor::Int32(arr) => to_ort(arr),
        InputTensor::Int64(arr) => to_ort(arr),
        InputTensor::Uint8(arr) => to_ort(arr),
    }
}

fn from_ort<T: Clone>(shape: &[i64], data: &[T]) -> Result<ArrayD<T>> {
    let shape: Vec<usize> = shape.iter().map(|&s| s as usize).collect();
    ArrayD::from_shape_vec(IxDyn(&shape), data.to_vec())
        .map_err(|e| InferenceError::OutputExtraction(e.to_string()))
}

fn convert_output(name: &str, value: &DynValue) -> Result<OutputTensor> {
    if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
        Ok(OutputTensor::Float32(from_ort(shape, data)?))
    } else if let Ok((shape, data)) = value.try_extract_tensor::<i64>() {
        Ok(OutputTensor::Int64(from_ort(shape, data)?))
    } else if let Ok((shape, data)) = value.try_extract_tensor::<i32>() {
        Ok(OutputTensor::Int32(from_ort(shape, data)?))
    } else if let Ok((shape, data)) = value.try_extract_tensor::<f64>() {
        Ok(OutputTensor::Float64(from_ort(shape, data)?))
    } else {
        Err(InferenceError::OutputExtraction(format!(
            "unsupported output type for '{}'",
            name
        )))
    }
}

impl InferenceBackend for OrtBackend {
    fn run(&self, inputs: &[(&str, InputTensor)]) -> Result<Vec<(String, OutputTensor)>> {
        let ort_inputs: Vec<(&str, SessionInputValue<'static>)> = inputs
            .iter()
            .map(|(name, tensor)| Ok((*name, convert_input(tensor)?)))
            .collect::<Result<Vec<_>>>()?;

        let mut session = self.session.lock().map_err(|e| {
            InferenceError::InferenceFailed(format!("Failed to lock session: {}", e))
        })?;

        let outputs = session
            .run(ort_inputs)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        outputs
            .iter()
            .map(|(name, value)| Ok((name.to_string(), convert_output(name, &value)?)))
            .collect()
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }
}
