//! Core error types for the recognition toolkit.
//!
//! This module defines the fundamental error types used throughout the crate,
//! including the main OCRError enum and the ProcessingStage enum that tags
//! where in the augmentation, data or inference path a failure happened.

use thiserror::Error;

/// Errors that can occur during low-level image array operations.
#[derive(Debug, Error)]
pub enum ImageProcessError {
    /// The input image is smaller than an operation requires.
    #[error(
        "Input image ({image_width}, {image_height}) smaller than the required size ({min_width}, {min_height})",
        image_width = image_size.0,
        image_height = image_size.1,
        min_width = min_size.0,
        min_height = min_size.1
    )]
    ImageTooSmall {
        /// The actual size of the image (width, height).
        image_size: (usize, usize),
        /// The minimum size the operation needs (width, height).
        min_size: (usize, usize),
    },
    /// The image has a channel count the operation cannot handle.
    #[error("Unsupported channel count: {0}")]
    UnsupportedChannels(usize),
    /// The image array does not have three axes.
    #[error("Expected a 3-D image array, got {0} axes")]
    InvalidRank(usize),
    /// A resampling target has a zero dimension.
    #[error("Invalid target size {width}x{height}")]
    InvalidTargetSize {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
    },
}

/// Enum representing different stages of processing.
///
/// This enum is used to identify which stage an error occurred in,
/// providing context for debugging and error handling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcessingStage {
    /// Error occurred inside an augmentation step.
    Augmentation,
    /// Error occurred during image processing operations.
    ImageProcessing,
    /// Error occurred while loading or collating a batch.
    BatchProcessing,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Augmentation => write!(f, "augmentation"),
            ProcessingStage::ImageProcessing => write!(f, "image processing"),
            ProcessingStage::BatchProcessing => write!(f, "batch processing"),
        }
    }
}

/// Enum representing the errors that can occur anywhere in the crate.
///
/// Augmentation, data loading, training and inference all report through
/// this type so the CLI can surface one error chain.
#[derive(Error, Debug)]
pub enum OCRError {
    /// Error occurred while loading or decoding an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred during model inference with detailed context.
    #[error(
        "model '{model_name}' inference failed: {operation} with input shape {input_shape:?}: {context}"
    )]
    ModelInference {
        /// The name of the model where inference failed.
        model_name: String,
        /// The operation that failed (e.g., "forward_pass", "output_extraction").
        operation: String,
        /// The input tensor shape.
        input_shape: Vec<usize>,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Malformed JSON configuration.
    #[error("json")]
    Json(#[from] serde_json::Error),

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from basic tensor operations (fallback for ndarray errors).
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),

    /// Error loading a model file, with context and suggestions.
    #[error("model load failed for '{model_path}': {reason}{suggestion}")]
    ModelLoad {
        /// Path to the model that failed to load
        model_path: String,
        /// Short reason string
        reason: String,
        /// Optional suggestion (prefixed with '; ' when present)
        suggestion: String,
        /// Underlying source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Convenience alias used across the crate.
pub type OcrResult<T> = Result<T, OCRError>;

impl From<image::ImageError> for OCRError {
    /// Converts an image::ImageError to OCRError::ImageLoad.
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl From<crate::core::config::ConfigError> for OCRError {
    /// Converts a ConfigError to OCRError::ConfigError.
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

impl From<ImageProcessError> for OCRError {
    /// Converts an ImageProcessError to OCRError::Processing.
    fn from(error: ImageProcessError) -> Self {
        Self::Processing {
            kind: ProcessingStage::ImageProcessing,
            context: "Image array operation failed".to_string(),
            source: Box::new(error),
        }
    }
}

impl OCRError {
    /// Creates a configuration error with enhanced context and details.
    ///
    /// # Arguments
    ///
    /// * `context` - High-level description of what was being configured
    /// * `details` - Specific details about what went wrong
    ///
    /// # Example
    ///
    /// ```rust
    /// # use crnn_ocr::core::errors::OCRError;
    /// let err = OCRError::config_error_detailed(
    ///     "RandomStretch",
    ///     "min_ratio must not exceed max_ratio",
    /// );
    /// assert!(matches!(err, OCRError::ConfigError { .. }));
    /// ```
    pub fn config_error_detailed(context: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ConfigError {
            message: format!("{}: {}", context.into(), details.into()),
        }
    }

    /// Creates a configuration error for invalid field values.
    ///
    /// # Arguments
    ///
    /// * `field` - The name of the field with an invalid value
    /// * `expected` - Description of what was expected
    /// * `actual` - Description of what was actually provided
    pub fn invalid_field(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ConfigError {
            message: format!(
                "invalid value for field '{}': expected {}, got {}",
                field.into(),
                expected.into(),
                actual.into()
            ),
        }
    }

    /// Wraps a failure raised by a named augmentation step.
    pub fn augmentation_error(
        step: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind: ProcessingStage::Augmentation,
            context: format!("step '{}'", step.into()),
            source: Box::new(source),
        }
    }

    /// Wraps an error with a processing stage and free-form context.
    pub fn processing(
        kind: ProcessingStage,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Creates a model loading error.
    ///
    /// # Arguments
    ///
    /// * `model_path` - Path of the model that failed to load
    /// * `reason` - Short reason string
    /// * `suggestion` - Optional hint appended to the message
    /// * `source` - Optional underlying error
    pub fn model_load_error(
        model_path: impl AsRef<std::path::Path>,
        reason: impl Into<String>,
        suggestion: Option<&str>,
        source: Option<ort::Error>,
    ) -> Self {
        Self::ModelLoad {
            model_path: model_path.as_ref().display().to_string(),
            reason: reason.into(),
            suggestion: suggestion.map(|s| format!("; {s}")).unwrap_or_default(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Creates a model inference error with the shape that was fed to the model.
    pub fn model_inference_error(
        model_name: &str,
        operation: &str,
        input_shape: &[usize],
        context: &str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ModelInference {
            model_name: model_name.to_string(),
            operation: operation.to_string(),
            input_shape: input_shape.to_vec(),
            context: context.to_string(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_error_display_includes_stage() {
        let err = OCRError::augmentation_error("EdgeCrop", ImageProcessError::InvalidRank(2));
        assert_eq!(err.to_string(), "augmentation failed: step 'EdgeCrop'");
    }

    #[test]
    fn test_model_load_error_suggestion_prefix() {
        let err = OCRError::model_load_error("m.onnx", "missing", Some("download it"), None);
        assert_eq!(
            err.to_string(),
            "model load failed for 'm.onnx': missing; download it"
        );
    }

    #[test]
    fn test_image_process_error_converts_to_processing() {
        let err: OCRError = ImageProcessError::UnsupportedChannels(5).into();
        assert!(matches!(
            err,
            OCRError::Processing {
                kind: ProcessingStage::ImageProcessing,
                ..
            }
        ));
    }
}
