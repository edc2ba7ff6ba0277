//! # crnn-ocr
//!
//! Training-data augmentation, dataset plumbing and ONNX inference for CRNN
//! text-line recognition.
//!
//! ## Modules
//!
//! * [`augment`] - Stochastic image transforms, their composition and the
//!   fixed training pipeline
//! * [`core`] - Errors, configuration and the ONNX Runtime wrapper
//! * [`data`] - Vocabulary, TSV index and batch loading
//! * [`model`] - Recognition network description and the trainer seam
//! * [`predictor`] - Model resolution and text recognition
//! * [`processors`] - CTC decoding, line splitting and shared image types
//! * [`utils`] - Image conversion, warps, filters and logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crnn_ocr::augment::train_transform;
//! use ndarray::Array3;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = train_transform()?;
//! let chw = Array3::<f32>::from_elem((3, 32, 128), 255.0);
//! let out = pipeline.apply_seeded(chw, 7)?;
//! assert_eq!(out.shape()[0], 1);
//! # Ok(())
//! # }
//! ```

pub mod augment;
pub mod core;
pub mod data;
pub mod model;
pub mod predictor;
pub mod processors;
pub mod utils;

/// Commonly used items.
pub mod prelude {
    pub use crate::augment::{
        ChannelFirst, Compose, ImageTransform, PipelineConfig, Step, test_transform,
        train_transform,
    };
    pub use crate::core::{OCRError, OcrResult, TrainConfig};
    pub use crate::data::{OcrDataModule, Vocab};
    pub use crate::model::{DryRunTrainer, Trainer, gen_model};
    pub use crate::predictor::{Context, ModelLocator, Recognizer};
}
