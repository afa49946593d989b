//! ONNX Runtime classifier

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;

use super::ClassificationModel;
use crate::error::{Result, ScanError};
use crate::preprocess::{InputTensor, INPUT_SHAPE};

/// Image classifier backed by an ONNX graph, run on CPU
pub struct OnnxModel {
    name: String,
    session: Mutex<Session>,
}

impl OnnxModel {
    /// Load a graph from disk
    ///
    /// Blocking; call from `ModelSlot::load_with`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ScanError::ModelLoad(format!(
                "model file not found: {}",
                path.display()
            )));
        }

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| ScanError::ModelLoad(format!("{}: {e}", path.display())))?;

        Ok(Self {
            name: path.display().to_string(),
            session: Mutex::new(session),
        })
    }
}

impl ClassificationModel for OnnxModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&self, input: &InputTensor) -> Result<Vec<f32>> {
        let data: Vec<f32> = input.view().iter().copied().collect();
        let value = Tensor::from_array((INPUT_SHAPE, data.into_boxed_slice()))
            .map_err(|e| ScanError::InferenceFailure(format!("input tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ScanError::InferenceFailure("session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![value])
            .map_err(|e| ScanError::InferenceFailure(e.to_string()))?;

        let (_, first) = outputs
            .iter()
            .next()
            .ok_or_else(|| ScanError::InferenceFailure("model produced no outputs".to_string()))?;

        let (_, scores) = first
            .try_extract_tensor::<f32>()
            .map_err(|e| ScanError::InferenceFailure(format!("output tensor: {e}")))?;

        Ok(scores.to_vec())
    }
}
