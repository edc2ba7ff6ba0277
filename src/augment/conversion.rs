//! Deterministic channel reduction and value scaling.

use super::{ImageArray, ImageTransform};
use crate::core::errors::{ImageProcessError, OCRError};
use ndarray::{Array3, s};
use rand::RngCore;

/// Luma weights for R, G and B.
///
/// Sums are accumulated in `f64` so a white pixel maps back to exactly 255.
const GRAY_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// Reduces a multi-channel image to `[H, W, 1]` grayscale.
///
/// Three and four channel input is read as RGB(A) and weighted with
/// [`GRAY_WEIGHTS`]; alpha is ignored. Two channels are read as gray + alpha
/// and keep the gray channel. Single-channel input passes through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToSingleChannelGray;

impl ToSingleChannelGray {
    /// Converts without needing a generator.
    pub fn convert(image: ImageArray) -> Result<ImageArray, OCRError> {
        match image.dim().2 {
            1 => Ok(image),
            2 => Ok(image.slice(s![.., .., 0..1]).to_owned()),
            3 | 4 => {
                let (h, w, _) = image.dim();
                let gray = Array3::from_shape_fn((h, w, 1), |(y, x, _)| {
                    (0..3)
                        .map(|c| GRAY_WEIGHTS[c] * image[[y, x, c]] as f64)
                        .sum::<f64>() as f32
                });
                Ok(gray)
            }
            other => Err(OCRError::InvalidInput {
                message: ImageProcessError::UnsupportedChannels(other).to_string(),
            }),
        }
    }
}

impl ImageTransform for ToSingleChannelGray {
    fn apply(&self, image: ImageArray, _rng: &mut dyn RngCore) -> Result<ImageArray, OCRError> {
        Self::convert(image)
    }

    fn name(&self) -> &str {
        "ToSingleChannelGray"
    }
}

/// Maps raw `0..=255` samples into `[0, 1]` by dividing by 255.
///
/// Applying it twice is not meaningful; pipelines run it once, last.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaleNormalize;

impl ScaleNormalize {
    pub fn normalize(image: ImageArray) -> ImageArray {
        image.mapv_into(|v| v / 255.0)
    }
}

impl ImageTransform for ScaleNormalize {
    fn apply(&self, image: ImageArray, _rng: &mut dyn RngCore) -> Result<ImageArray, OCRError> {
        Ok(Self::normalize(image))
    }

    fn name(&self) -> &str {
        "ScaleNormalize"
    }
}
