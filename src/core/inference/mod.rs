//! ONNX Runtime inference for the recognition model.

use crate::core::config::OrtSessionConfig;
use crate::core::errors::OCRError;
use ndarray::{Array3, Array4};
use ort::session::Session;
use ort::value::TensorRef;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[path = "ort_infer_config.rs"]
mod ort_infer_config;

/// A loaded ONNX model with a single session.
///
/// `Session::run` needs exclusive access, so the session sits behind a mutex
/// and the wrapper itself can be shared across threads.
pub struct OrtInfer {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    model_path: PathBuf,
    model_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("model_path", &self.model_path)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OrtInfer {
    /// Loads a model, applying the session configuration.
    ///
    /// Input and output names are discovered from the model's first input
    /// and first output.
    ///
    /// # Errors
    ///
    /// Returns [`OCRError::ModelLoad`] if the session cannot be created or the
    /// model declares no inputs or outputs.
    pub fn from_config(cfg: &OrtSessionConfig, model_path: impl AsRef<Path>) -> Result<Self, OCRError> {
        let path = model_path.as_ref();
        let builder = Session::builder()?;
        let builder = Self::apply_ort_config(builder, cfg).map_err(|e| {
            OCRError::model_load_error(
                path,
                "failed to configure ONNX session",
                Some("check the execution provider and enabled features"),
                Some(e),
            )
        })?;
        let session = builder.commit_from_file(path).map_err(|e| {
            OCRError::model_load_error(
                path,
                "failed to create ONNX session",
                Some("verify model path and compatibility with selected execution providers"),
                Some(e),
            )
        })?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| OCRError::model_load_error(path, "model has no inputs", None, None))?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| OCRError::model_load_error(path, "model has no outputs", None, None))?;

        let model_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown_model")
            .to_string();

        tracing::debug!(%model_name, %input_name, %output_name, "ONNX session ready");

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            model_path: path.to_path_buf(),
            model_name,
        })
    }

    /// Returns the model path associated with this inference engine.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Returns the model name associated with this inference engine.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Runs a `[N, C, H, W]` batch and returns the 3-D output tensor.
    ///
    /// The output layout is whatever the model emits; callers decide whether
    /// it is `[N, T, C]` or `[T, N, C]`.
    pub fn infer_3d(&self, x: &Array4<f32>) -> Result<Array3<f32>, OCRError> {
        let input_shape = x.shape().to_vec();

        let input_tensor = TensorRef::from_array_view(x.view()).map_err(|e| {
            OCRError::model_inference_error(
                &self.model_name,
                "tensor_conversion",
                &input_shape,
                "failed to convert input tensor",
                e,
            )
        })?;
        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];

        let mut session = self.session.lock().map_err(|_| OCRError::InvalidInput {
            message: "Failed to acquire session lock".to_string(),
        })?;
        let outputs = session.run(inputs).map_err(|e| {
            OCRError::model_inference_error(
                &self.model_name,
                "forward_pass",
                &input_shape,
                &format!(
                    "ONNX Runtime inference failed with input '{}' -> output '{}'",
                    self.input_name, self.output_name
                ),
                e,
            )
        })?;

        let (output_shape, output_data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                OCRError::model_inference_error(
                    &self.model_name,
                    "output_extraction",
                    &input_shape,
                    &format!("failed to extract output tensor '{}' as f32", self.output_name),
                    e,
                )
            })?;

        if output_shape.len() != 3 {
            return Err(OCRError::InvalidInput {
                message: format!(
                    "model '{}' produced a {}-D output {:?}, expected 3-D",
                    self.model_name,
                    output_shape.len(),
                    &output_shape[..]
                ),
            });
        }
        let dims = (
            output_shape[0] as usize,
            output_shape[1] as usize,
            output_shape[2] as usize,
        );
        Ok(Array3::from_shape_vec(dims, output_data.to_vec())?)
    }
}
