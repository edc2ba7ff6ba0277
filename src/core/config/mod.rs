//! Configuration management.
//!
//! This module provides the training configuration, ONNX Runtime session
//! options, loader worker policy and the validation trait they share.

pub mod errors;
pub mod onnx;
pub mod parallel;
pub mod train;

// Re-export commonly used types
pub use errors::{ConfigError, ConfigValidator, validate_probability, validate_range};
pub use onnx::{OrtExecutionProvider, OrtSessionConfig};
pub use parallel::WorkerPolicy;
pub use train::TrainConfig;
