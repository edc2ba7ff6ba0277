//! Serializable description of an augmentation pipeline.
//!
//! A pipeline is a list of steps; each step names a transform through its
//! `type` tag, carries the transform's parameters inline and an optional
//! `p` (default 1). `Group` nests a sub-pipeline under one gate.
//!
//! ```json
//! {"steps": [
//!   {"type": "Group", "p": 0.15, "steps": [
//!     {"type": "ShiftScaleRotate", "shift_limit": [0, 0], "scale_limit": [-0.15, 0],
//!      "rotate_limit": [-1, 1], "border": {"mode": "constant", "value": 255}}
//!   ]},
//!   {"type": "InvertImg", "p": 0.3},
//!   {"type": "ToSingleChannelGray"},
//!   {"type": "ScaleNormalize"}
//! ]}
//! ```

use super::compose::{Compose, Step};
use super::conversion::{ScaleNormalize, ToSingleChannelGray};
use super::geometric::{
    EdgeCrop, ElasticTransform, GridDistortion, OpticalDistortion, RandomStretch,
    ShiftScaleRotate,
};
use super::photometric::{
    Emboss, GaussNoise, ImageCompression, InvertImg, RandomBrightnessContrast, Sharpen,
    TransparentOverlay,
};
use super::ImageTransform;
use crate::core::errors::OCRError;
use crate::processors::types::{BorderMode, Interpolation};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters of one transform, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AugmentConfig {
    ShiftScaleRotate {
        #[serde(default)]
        shift_limit: (f64, f64),
        #[serde(default)]
        scale_limit: (f64, f64),
        #[serde(default)]
        rotate_limit: (f64, f64),
        #[serde(default)]
        interpolation: Interpolation,
        #[serde(default)]
        border: BorderMode,
    },
    GridDistortion {
        #[serde(default = "default_num_steps")]
        num_steps: usize,
        distort_limit: (f64, f64),
        #[serde(default)]
        interpolation: Interpolation,
        #[serde(default)]
        border: BorderMode,
    },
    OpticalDistortion {
        distort_limit: (f64, f64),
        #[serde(default)]
        shift_limit: (f64, f64),
        #[serde(default)]
        interpolation: Interpolation,
        #[serde(default)]
        border: BorderMode,
    },
    ElasticTransform {
        alpha: f64,
        sigma: f64,
        #[serde(default)]
        alpha_affine: f64,
        #[serde(default)]
        interpolation: Interpolation,
        #[serde(default)]
        border: BorderMode,
    },
    RandomStretch {
        min_ratio: f64,
        max_ratio: f64,
    },
    EdgeCrop {
        max_height: usize,
        max_width: usize,
    },
    GaussNoise {
        var_limit: (f64, f64),
    },
    RandomBrightnessContrast {
        #[serde(default)]
        brightness_limit: (f64, f64),
        #[serde(default)]
        contrast_limit: (f64, f64),
    },
    ImageCompression {
        quality_lower: u8,
        #[serde(default = "default_quality_upper")]
        quality_upper: u8,
    },
    TransparentOverlay {
        max_height_ratio: f64,
        max_width_ratio: f64,
        alpha: f32,
    },
    Emboss {
        alpha: (f64, f64),
        strength: (f64, f64),
    },
    Sharpen {
        alpha: (f64, f64),
        lightness: (f64, f64),
    },
    InvertImg,
    ToSingleChannelGray,
    ScaleNormalize,
    /// A nested pipeline gated once by the enclosing step.
    Group {
        steps: Vec<AugmentStep>,
    },
}

fn default_num_steps() -> usize {
    5
}

fn default_quality_upper() -> u8 {
    100
}

fn default_probability() -> f64 {
    1.0
}

/// A transform and the probability it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentStep {
    #[serde(flatten)]
    pub transform: AugmentConfig,
    #[serde(default = "default_probability")]
    pub p: f64,
}

impl AugmentStep {
    pub fn new(transform: AugmentConfig, p: f64) -> Self {
        Self { transform, p }
    }

    /// A step that always runs.
    pub fn always(transform: AugmentConfig) -> Self {
        Self::new(transform, 1.0)
    }

    pub fn build(&self) -> Result<Step, OCRError> {
        Step::boxed(self.transform.build()?, self.p)
    }
}

impl AugmentConfig {
    /// Instantiates the transform, validating its parameters.
    pub fn build(&self) -> Result<Box<dyn ImageTransform>, OCRError> {
        Ok(match self {
            AugmentConfig::ShiftScaleRotate {
                shift_limit,
                scale_limit,
                rotate_limit,
                interpolation,
                border,
            } => Box::new(ShiftScaleRotate::new(
                *shift_limit,
                *scale_limit,
                *rotate_limit,
                *interpolation,
                *border,
            )?),
            AugmentConfig::GridDistortion {
                num_steps,
                distort_limit,
                interpolation,
                border,
            } => Box::new(GridDistortion::new(
                *num_steps,
                *distort_limit,
                *interpolation,
                *border,
            )?),
            AugmentConfig::OpticalDistortion {
                distort_limit,
                shift_limit,
                interpolation,
                border,
            } => Box::new(OpticalDistortion::new(
                *distort_limit,
                *shift_limit,
                *interpolation,
                *border,
            )?),
            AugmentConfig::ElasticTransform {
                alpha,
                sigma,
                alpha_affine,
                interpolation,
                border,
            } => Box::new(ElasticTransform::new(
                *alpha,
                *sigma,
                *alpha_affine,
                *interpolation,
                *border,
            )?),
            AugmentConfig::RandomStretch {
                min_ratio,
                max_ratio,
            } => Box::new(RandomStretch::new(*min_ratio, *max_ratio)?),
            AugmentConfig::EdgeCrop {
                max_height,
                max_width,
            } => Box::new(EdgeCrop::new(*max_height, *max_width)),
            AugmentConfig::GaussNoise { var_limit } => Box::new(GaussNoise::new(*var_limit)?),
            AugmentConfig::RandomBrightnessContrast {
                brightness_limit,
                contrast_limit,
            } => Box::new(RandomBrightnessContrast::new(
                *brightness_limit,
                *contrast_limit,
            )?),
            AugmentConfig::ImageCompression {
                quality_lower,
                quality_upper,
            } => Box::new(ImageCompression::new(*quality_lower, *quality_upper)?),
            AugmentConfig::TransparentOverlay {
                max_height_ratio,
                max_width_ratio,
                alpha,
            } => Box::new(TransparentOverlay::new(
                *max_height_ratio,
                *max_width_ratio,
                *alpha,
            )?),
            AugmentConfig::Emboss { alpha, strength } => Box::new(Emboss::new(*alpha, *strength)?),
            AugmentConfig::Sharpen { alpha, lightness } => {
                Box::new(Sharpen::new(*alpha, *lightness)?)
            }
            AugmentConfig::InvertImg => Box::new(InvertImg),
            AugmentConfig::ToSingleChannelGray => Box::new(ToSingleChannelGray),
            AugmentConfig::ScaleNormalize => Box::new(ScaleNormalize),
            AugmentConfig::Group { steps } => Box::new(build_compose(steps)?),
        })
    }
}

fn build_compose(steps: &[AugmentStep]) -> Result<Compose, OCRError> {
    steps
        .iter()
        .map(AugmentStep::build)
        .collect::<Result<Vec<_>, _>>()
        .map(Compose::new)
}

/// An ordered list of steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub steps: Vec<AugmentStep>,
}

impl PipelineConfig {
    pub fn new(steps: Vec<AugmentStep>) -> Self {
        Self { steps }
    }

    /// Builds the composed pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found, in step order.
    pub fn build(&self) -> Result<Compose, OCRError> {
        build_compose(&self.steps)
    }

    pub fn from_json_str(text: &str) -> Result<Self, OCRError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OCRError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_example_pipeline() {
        let text = r#"{"steps": [
            {"type": "Group", "p": 0.15, "steps": [
                {"type": "ShiftScaleRotate", "shift_limit": [0, 0], "scale_limit": [-0.15, 0],
                 "rotate_limit": [-1, 1], "border": {"mode": "constant", "value": 255}}
            ]},
            {"type": "InvertImg", "p": 0.3},
            {"type": "ToSingleChannelGray"},
            {"type": "ScaleNormalize"}
        ]}"#;
        let config = PipelineConfig::from_json_str(text).unwrap();
        assert_eq!(config.steps.len(), 4);
        assert_eq!(config.steps[0].p, 0.15);
        assert_eq!(config.steps[2].p, 1.0);
        let AugmentConfig::Group { steps } = &config.steps[0].transform else {
            panic!("expected a group");
        };
        assert_eq!(
            steps[0].transform,
            AugmentConfig::ShiftScaleRotate {
                shift_limit: (0.0, 0.0),
                scale_limit: (-0.15, 0.0),
                rotate_limit: (-1.0, 1.0),
                interpolation: Interpolation::Bilinear,
                border: BorderMode::Constant(255.0),
            }
        );
        let compose = config.build().unwrap();
        assert_eq!(compose.len(), 4);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = PipelineConfig::from_json_str(r#"{"steps": [{"type": "Solarize"}]}"#);
        assert!(matches!(err, Err(OCRError::Json(_))));
    }

    #[test]
    fn test_invalid_parameters_fail_at_build() {
        let config = PipelineConfig::new(vec![AugmentStep::always(AugmentConfig::RandomStretch {
            min_ratio: 2.0,
            max_ratio: 1.0,
        })]);
        assert!(matches!(config.build(), Err(OCRError::ConfigError { .. })));

        let config = PipelineConfig::new(vec![AugmentStep::new(AugmentConfig::InvertImg, 3.0)]);
        assert!(config.build().is_err());
    }

    #[test]
    fn test_edge_crop_with_oversized_bounds_is_a_no_op() {
        let text = r#"{"steps": [{"type": "EdgeCrop",
            "max_height": 18446744073709551615, "max_width": 18446744073709551615}]}"#;
        let compose = PipelineConfig::from_json_str(text).unwrap().build().unwrap();
        let img = ndarray::Array3::from_shape_fn((8, 8, 1), |(y, x, _)| (y * 8 + x) as f32);
        let out = compose.apply_seeded(img.clone(), 3).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_config_survives_json() {
        let config = crate::augment::presets::train_pipeline_config();
        let json = serde_json::to_string(&config).unwrap();
        let back = PipelineConfig::from_json_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
