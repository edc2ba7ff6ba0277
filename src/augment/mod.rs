//! Image augmentation for text-line recognition training.
//!
//! Transforms operate on HWC `f32` arrays holding raw pixel values
//! (`0..=255`) until [`conversion::ScaleNormalize`] maps them to `[0, 1]`.
//! Every transform draws its randomness from the generator passed to
//! [`ImageTransform::apply`], so a pipeline run with a seeded generator is
//! reproducible.
//!
//! Pipelines are built from [`compose::Step`]s, either in code or from a
//! [`config::PipelineConfig`], and wrapped in an [`adapter::ChannelFirst`]
//! when the caller works with CHW arrays.

pub mod adapter;
pub mod compose;
pub mod config;
pub mod conversion;
pub mod geometric;
pub mod photometric;
pub mod presets;

use crate::core::errors::OCRError;
use ndarray::Array3;
use rand::{Rng, RngCore};
use std::fmt::Debug;

pub use adapter::ChannelFirst;
pub use compose::{Compose, Step};
pub use config::{AugmentConfig, AugmentStep, PipelineConfig};
pub use conversion::{ScaleNormalize, ToSingleChannelGray};
pub use geometric::{
    EdgeCrop, ElasticTransform, GridDistortion, OpticalDistortion, RandomStretch,
    ShiftScaleRotate,
};
pub use photometric::{
    Emboss, GaussNoise, ImageCompression, InvertImg, RandomBrightnessContrast, Sharpen,
    TransparentOverlay,
};
pub use presets::{test_transform, train_pipeline_config, train_transform};

/// An `[H, W, C]` image with `f32` samples.
pub type ImageArray = Array3<f32>;

/// A transform over HWC image arrays.
///
/// Implementations hold only immutable configuration; all randomness comes
/// from `rng`. Width, height and channel count may change.
pub trait ImageTransform: Debug + Send + Sync {
    /// Applies the transform, consuming the input array.
    fn apply(&self, image: ImageArray, rng: &mut dyn RngCore) -> Result<ImageArray, OCRError>;

    /// Get the transform name for logging and error context
    fn name(&self) -> &str;
}

/// `lo + (hi - lo) * u` with `u` uniform in `[0, 1)`.
#[inline]
pub(crate) fn uniform(rng: &mut dyn RngCore, (lo, hi): (f64, f64)) -> f64 {
    lo + (hi - lo) * rng.random::<f64>()
}

/// Clamps samples to the 8-bit range, as warps on `u8` images saturate.
pub(crate) fn saturate(image: ImageArray) -> ImageArray {
    image.mapv_into(|v| v.clamp(0.0, 255.0))
}

/// Height, width and channel count of an HWC array.
#[inline]
pub(crate) fn hwc(image: &ImageArray) -> (usize, usize, usize) {
    image.dim()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::ImageArray;
    use ndarray::Array3;

    /// A deterministic, textured RGB test image.
    pub fn textured(h: usize, w: usize, c: usize) -> ImageArray {
        Array3::from_shape_fn((h, w, c), |(y, x, ch)| {
            ((x * 7 + y * 13 + ch * 29) % 256) as f32
        })
    }
}
