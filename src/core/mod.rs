//! Core building blocks shared by the augmentation, data and inference layers.
//!
//! - Configuration management
//! - Error handling
//! - ONNX Runtime inference

pub mod config;
pub mod errors;
pub mod inference;

pub use config::{ConfigError, ConfigValidator, TrainConfig, WorkerPolicy};
pub use errors::{ImageProcessError, OCRError, OcrResult, ProcessingStage};
pub use inference::OrtInfer;
