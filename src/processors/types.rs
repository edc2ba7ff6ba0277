//! Types shared by image processing operations
//!
//! This module defines the enums that select array layout, resampling kernel
//! and out-of-bounds behaviour for warps and resizes.
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::core::errors::OCRError;

/// Specifies the order of axes in an image array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelOrder {
    /// Channel, Height, Width order (model-facing)
    CHW,
    /// Height, Width, Channel order (augmentation-facing)
    HWC,
}

impl ChannelOrder {
    /// Returns `(height, width, channels)` for an array shape in this layout.
    pub fn dims(&self, shape: &[usize]) -> (usize, usize, usize) {
        match self {
            ChannelOrder::CHW => (shape[1], shape[2], shape[0]),
            ChannelOrder::HWC => (shape[0], shape[1], shape[2]),
        }
    }
}

/// Resampling kernel used by warps and resizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Nearest neighbour
    Nearest,
    /// Bilinear
    #[default]
    Bilinear,
    /// Bicubic with the cubic convolution kernel (a = -0.75)
    Bicubic,
}

impl FromStr for Interpolation {
    type Err = OCRError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" => Ok(Interpolation::Nearest),
            "bilinear" | "linear" => Ok(Interpolation::Bilinear),
            "bicubic" | "cubic" => Ok(Interpolation::Bicubic),
            other => Err(OCRError::invalid_field(
                "interpolation",
                "nearest, bilinear or bicubic",
                other,
            )),
        }
    }
}

/// What a warp samples outside the source image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum BorderMode {
    /// Fill with a constant value on every channel
    Constant(f32),
    /// Repeat the nearest edge pixel
    Replicate,
}

impl Default for BorderMode {
    fn default() -> Self {
        BorderMode::Constant(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolation_from_str() {
        assert_eq!(
            "Linear".parse::<Interpolation>().unwrap(),
            Interpolation::Bilinear
        );
        assert!("area".parse::<Interpolation>().is_err());
    }

    #[test]
    fn test_border_mode_serde() {
        let json = serde_json::to_string(&BorderMode::Constant(255.0)).unwrap();
        assert_eq!(json, r#"{"mode":"constant","value":255.0}"#);
        let back: BorderMode = serde_json::from_str(r#"{"mode":"replicate"}"#).unwrap();
        assert_eq!(back, BorderMode::Replicate);
    }

    #[test]
    fn test_channel_order_dims() {
        assert_eq!(ChannelOrder::CHW.dims(&[1, 32, 100]), (32, 100, 1));
        assert_eq!(ChannelOrder::HWC.dims(&[32, 100, 3]), (32, 100, 3));
    }
}
