//! The fixed training and evaluation pipelines.

use super::adapter::ChannelFirst;
use super::compose::{Compose, Step};
use super::config::{AugmentConfig, AugmentStep, PipelineConfig};
use super::conversion;
use crate::core::errors::OCRError;
use crate::processors::types::{BorderMode, Interpolation};
use once_cell::sync::Lazy;

const WHITE: BorderMode = BorderMode::Constant(255.0);
const BLACK: BorderMode = BorderMode::Constant(0.0);

static TRAIN_TABLE: Lazy<PipelineConfig> = Lazy::new(train_table);

/// The training augmentation table.
///
/// Shift/scale/rotate and grid distortion share one gate of 0.15; the
/// remaining steps are gated independently, then every image is reduced to
/// gray and scaled to `[0, 1]`.
pub fn train_pipeline_config() -> PipelineConfig {
    TRAIN_TABLE.clone()
}

fn train_table() -> PipelineConfig {
    use AugmentConfig::*;

    PipelineConfig::new(vec![
        AugmentStep::new(
            Group {
                steps: vec![
                    AugmentStep::always(ShiftScaleRotate {
                        shift_limit: (0.0, 0.0),
                        scale_limit: (-0.15, 0.0),
                        rotate_limit: (-1.0, 1.0),
                        interpolation: Interpolation::Bilinear,
                        border: WHITE,
                    }),
                    AugmentStep::new(
                        GridDistortion {
                            num_steps: 5,
                            distort_limit: (-0.1, 0.1),
                            interpolation: Interpolation::Bilinear,
                            border: WHITE,
                        },
                        0.5,
                    ),
                ],
            },
            0.15,
        ),
        AugmentStep::new(
            GaussNoise {
                var_limit: (0.0, 10.0),
            },
            0.2,
        ),
        AugmentStep::new(
            RandomBrightnessContrast {
                brightness_limit: (-0.05, 0.05),
                contrast_limit: (-0.2, 0.0),
            },
            0.2,
        ),
        AugmentStep::new(
            ImageCompression {
                quality_lower: 95,
                quality_upper: 100,
            },
            0.3,
        ),
        AugmentStep::new(
            TransparentOverlay {
                max_height_ratio: 1.0,
                max_width_ratio: 0.1,
                alpha: 0.4,
            },
            0.2,
        ),
        AugmentStep::new(
            Emboss {
                alpha: (0.2, 0.5),
                strength: (0.2, 0.7),
            },
            0.3,
        ),
        AugmentStep::new(
            OpticalDistortion {
                distort_limit: (-0.05, 0.05),
                shift_limit: (-0.05, 0.05),
                interpolation: Interpolation::Nearest,
                border: BLACK,
            },
            0.2,
        ),
        AugmentStep::new(
            Sharpen {
                alpha: (0.2, 0.5),
                lightness: (0.5, 1.0),
            },
            0.3,
        ),
        AugmentStep::new(
            ElasticTransform {
                alpha: 0.15,
                sigma: 10.07,
                alpha_affine: 0.15,
                interpolation: Interpolation::Nearest,
                border: WHITE,
            },
            0.3,
        ),
        AugmentStep::new(
            RandomStretch {
                min_ratio: 0.5,
                max_ratio: 1.5,
            },
            0.2,
        ),
        AugmentStep::new(InvertImg, 0.3),
        AugmentStep::always(ToSingleChannelGray),
        AugmentStep::always(ScaleNormalize),
    ])
}

/// Training pipeline over CHW arrays.
pub fn train_transform() -> Result<ChannelFirst<Compose>, OCRError> {
    Ok(ChannelFirst::new(train_pipeline_config().build()?))
}

/// Evaluation pipeline over CHW arrays: gray reduction then scaling, no randomness.
pub fn test_transform() -> ChannelFirst<Compose> {
    ChannelFirst::new(Compose::new(vec![
        Step::always(conversion::ToSingleChannelGray),
        Step::always(conversion::ScaleNormalize),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_table_shape() {
        let config = train_pipeline_config();
        let probs: Vec<f64> = config.steps.iter().map(|s| s.p).collect();
        assert_eq!(
            probs,
            vec![0.15, 0.2, 0.2, 0.3, 0.2, 0.3, 0.2, 0.3, 0.3, 0.2, 0.3, 1.0, 1.0]
        );
        let AugmentConfig::Group { steps } = &config.steps[0].transform else {
            panic!("first step should be the geometric group");
        };
        assert_eq!(steps.iter().map(|s| s.p).collect::<Vec<_>>(), vec![1.0, 0.5]);
    }

    #[test]
    fn test_presets_build() {
        let train = train_transform().unwrap();
        assert_eq!(train.inner().len(), 13);
        assert_eq!(test_transform().inner().len(), 2);
    }
}
