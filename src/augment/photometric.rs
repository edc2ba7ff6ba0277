//! Random intensity, noise, filtering and overlay transforms.
//!
//! All of these keep the image shape. Values are clipped to `[0, 255]`
//! wherever the operation can leave that range.

use super::{ImageArray, ImageTransform, hwc, uniform};
use crate::core::config::validate_range;
use crate::core::errors::{ImageProcessError, OCRError, ProcessingStage};
use crate::utils::filter::filter2d_3x3;
use crate::utils::image::{array_to_dynamic, gray_to_array, rgb_to_array};
use image::ImageFormat;
use image::codecs::jpeg::JpegEncoder;
use ndarray::{Axis, s};
use rand::{Rng, RngCore};
use rand_distr::{Distribution, Normal};

#[inline]
fn clip(v: f32) -> f32 {
    v.clamp(0.0, 255.0)
}

/// Kernel `(1 - alpha) * identity + alpha * effect`.
fn blend_with_identity(alpha: f32, effect: [[f32; 3]; 3]) -> [[f32; 3]; 3] {
    let mut kernel = [[0.0f32; 3]; 3];
    for (y, row) in kernel.iter_mut().enumerate() {
        for (x, k) in row.iter_mut().enumerate() {
            let identity = if (y, x) == (1, 1) { 1.0 } else { 0.0 };
            *k = (1.0 - alpha) * identity + alpha * effect[y][x];
        }
    }
    kernel
}

/// Additive zero-mean Gaussian noise with variance drawn from `var_limit`.
///
/// Noise is independent per pixel and per channel.
#[derive(Debug, Clone)]
pub struct GaussNoise {
    var_limit: (f64, f64),
}

impl GaussNoise {
    pub fn new(var_limit: (f64, f64)) -> Result<Self, OCRError> {
        validate_range("var_limit", var_limit)?;
        if var_limit.0 < 0.0 {
            return Err(OCRError::invalid_field(
                "var_limit",
                "non-negative variances",
                format!("{var_limit:?}"),
            ));
        }
        Ok(Self { var_limit })
    }

    /// `var_limit = (0, max_var)`.
    pub fn with_max_var(max_var: f64) -> Result<Self, OCRError> {
        Self::new((0.0, max_var))
    }
}

impl ImageTransform for GaussNoise {
    fn apply(&self, mut image: ImageArray, rng: &mut dyn RngCore) -> Result<ImageArray, OCRError> {
        let var = uniform(rng, self.var_limit);
        let normal = Normal::new(0.0f32, var.sqrt() as f32)
            .map_err(|e| OCRError::processing(ProcessingStage::Augmentation, "noise distribution", e))?;
        image.mapv_inplace(|v| clip(v + normal.sample(rng)));
        Ok(image)
    }

    fn name(&self) -> &str {
        "GaussNoise"
    }
}

/// Random contrast gain and brightness offset.
///
/// `x * (1 + U(contrast_limit)) + 255 * U(brightness_limit)`, clipped.
#[derive(Debug, Clone)]
pub struct RandomBrightnessContrast {
    brightness_limit: (f64, f64),
    contrast_limit: (f64, f64),
}

impl RandomBrightnessContrast {
    pub fn new(brightness_limit: (f64, f64), contrast_limit: (f64, f64)) -> Result<Self, OCRError> {
        validate_range("brightness_limit", brightness_limit)?;
        validate_range("contrast_limit", contrast_limit)?;
        Ok(Self {
            brightness_limit,
            contrast_limit,
        })
    }
}

impl ImageTransform for RandomBrightnessContrast {
    fn apply(&self, image: ImageArray, rng: &mut dyn RngCore) -> Result<ImageArray, OCRError> {
        let alpha = (1.0 + uniform(rng, self.contrast_limit)) as f32;
        let beta = uniform(rng, self.brightness_limit) as f32;
        Ok(image.mapv_into(|v| clip(v * alpha + 255.0 * beta)))
    }

    fn name(&self) -> &str {
        "RandomBrightnessContrast"
    }
}

/// JPEG round trip at a random quality in `quality_lower..=quality_upper`.
///
/// One and three channel images are encoded directly; a fourth channel is
/// kept aside and reattached unchanged.
#[derive(Debug, Clone)]
pub struct ImageCompression {
    quality_lower: u8,
    quality_upper: u8,
}

impl ImageCompression {
    pub fn new(quality_lower: u8, quality_upper: u8) -> Result<Self, OCRError> {
        if quality_lower == 0 || quality_upper > 100 || quality_lower > quality_upper {
            return Err(OCRError::invalid_field(
                "quality",
                "1 <= lower <= upper <= 100",
                format!("({quality_lower}, {quality_upper})"),
            ));
        }
        Ok(Self {
            quality_lower,
            quality_upper,
        })
    }

    fn round_trip(color: &ImageArray, quality: u8) -> Result<ImageArray, OCRError> {
        let channels = color.dim().2;
        let mut encoded = Vec::new();
        array_to_dynamic(color)?.write_with_encoder(JpegEncoder::new_with_quality(&mut encoded, quality))?;
        let decoded = image::load_from_memory_with_format(&encoded, ImageFormat::Jpeg)?;
        Ok(if channels == 1 {
            gray_to_array(&decoded.to_luma8())
        } else {
            rgb_to_array(&decoded.to_rgb8())
        })
    }
}

impl ImageTransform for ImageCompression {
    fn apply(&self, image: ImageArray, rng: &mut dyn RngCore) -> Result<ImageArray, OCRError> {
        let quality = rng.random_range(self.quality_lower..=self.quality_upper);
        match hwc(&image).2 {
            1 | 3 => Self::round_trip(&image, quality),
            4 => {
                let color = image.slice(s![.., .., 0..3]).to_owned();
                let mut out = Self::round_trip(&color, quality)?;
                let alpha = image.slice(s![.., .., 3..4]);
                out.append(Axis(2), alpha)?;
                Ok(out)
            }
            other => Err(ImageProcessError::UnsupportedChannels(other).into()),
        }
    }

    fn name(&self) -> &str {
        "ImageCompression"
    }
}

/// Semi-transparent filled rectangle, like a highlighter stroke.
///
/// The rectangle is at most `max_height_ratio * h` tall and
/// `max_width_ratio * w` wide, with a random RGB colour, and is blended as
/// `alpha * overlay + (1 - alpha) * image`. Channel count is preserved: one
/// channel blends with the first colour component, a fourth channel blends
/// with zero.
#[derive(Debug, Clone)]
pub struct TransparentOverlay {
    max_height_ratio: f64,
    max_width_ratio: f64,
    alpha: f32,
}

/// Rectangle placement and colour for one overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct OverlayParams {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    pub color: [f32; 3],
}

impl TransparentOverlay {
    pub fn new(max_height_ratio: f64, max_width_ratio: f64, alpha: f32) -> Result<Self, OCRError> {
        for (name, v) in [
            ("max_height_ratio", max_height_ratio),
            ("max_width_ratio", max_width_ratio),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(OCRError::invalid_field(name, "a ratio in [0, 1]", v.to_string()));
            }
        }
        if !(0.0..=1.0).contains(&alpha) {
            return Err(OCRError::invalid_field("alpha", "a value in [0, 1]", alpha.to_string()));
        }
        Ok(Self {
            max_height_ratio,
            max_width_ratio,
            alpha,
        })
    }

    /// Draws rectangle parameters for an `h x w` image.
    ///
    /// Upper bounds are exclusive; a zero bound yields zero.
    pub(crate) fn draw(&self, h: usize, w: usize, rng: &mut dyn RngCore) -> OverlayParams {
        let max_h = (h as f64 * self.max_height_ratio) as usize;
        let max_w = (w as f64 * self.max_width_ratio) as usize;
        let mut below = |upper: usize| {
            if upper == 0 {
                0
            } else {
                rng.random_range(0..upper)
            }
        };

        let x = below(w.saturating_sub(max_w).max(1));
        let y = below(h.saturating_sub(max_h).max(1));
        let width = below(max_w);
        let height = below(max_h);
        let color = [below(256) as f32, below(256) as f32, below(256) as f32];
        OverlayParams {
            x,
            y,
            width,
            height,
            color,
        }
    }

    pub(crate) fn blend(&self, mut image: ImageArray, params: &OverlayParams) -> ImageArray {
        let (h, w, c) = hwc(&image);
        if params.x >= w || params.y >= h {
            return image;
        }
        // The rectangle includes both corners.
        let x_end = (params.x + params.width).min(w - 1);
        let y_end = (params.y + params.height).min(h - 1);
        let mut region = image.slice_mut(s![params.y..=y_end, params.x..=x_end, ..]);
        for ch in 0..c {
            let color = params.color.get(ch).copied().unwrap_or(0.0);
            region
                .index_axis_mut(Axis(2), ch)
                .mapv_inplace(|v| clip(self.alpha * color + (1.0 - self.alpha) * v));
        }
        image
    }
}

impl ImageTransform for TransparentOverlay {
    fn apply(&self, image: ImageArray, rng: &mut dyn RngCore) -> Result<ImageArray, OCRError> {
        let (h, w, _) = hwc(&image);
        let params = self.draw(h, w, rng);
        Ok(self.blend(image, &params))
    }

    fn name(&self) -> &str {
        "TransparentOverlay"
    }
}

/// Relief effect by a blended emboss kernel.
#[derive(Debug, Clone)]
pub struct Emboss {
    alpha: (f64, f64),
    strength: (f64, f64),
}

impl Emboss {
    pub fn new(alpha: (f64, f64), strength: (f64, f64)) -> Result<Self, OCRError> {
        validate_range("alpha", alpha)?;
        validate_range("strength", strength)?;
        Ok(Self { alpha, strength })
    }

    fn kernel(alpha: f32, strength: f32) -> [[f32; 3]; 3] {
        let s = strength;
        blend_with_identity(
            alpha,
            [[-1.0 - s, -s, 0.0], [-s, 1.0, s], [0.0, s, 1.0 + s]],
        )
    }
}

impl ImageTransform for Emboss {
    fn apply(&self, image: ImageArray, rng: &mut dyn RngCore) -> Result<ImageArray, OCRError> {
        let alpha = uniform(rng, self.alpha) as f32;
        let strength = uniform(rng, self.strength) as f32;
        let filtered = filter2d_3x3(&image, &Self::kernel(alpha, strength))?;
        Ok(filtered.mapv_into(clip))
    }

    fn name(&self) -> &str {
        "Emboss"
    }
}

/// Unsharp-style sharpening by a blended Laplacian kernel.
#[derive(Debug, Clone)]
pub struct Sharpen {
    alpha: (f64, f64),
    lightness: (f64, f64),
}

impl Sharpen {
    pub fn new(alpha: (f64, f64), lightness: (f64, f64)) -> Result<Self, OCRError> {
        validate_range("alpha", alpha)?;
        validate_range("lightness", lightness)?;
        Ok(Self { alpha, lightness })
    }

    fn kernel(alpha: f32, lightness: f32) -> [[f32; 3]; 3] {
        blend_with_identity(
            alpha,
            [
                [-1.0, -1.0, -1.0],
                [-1.0, 8.0 + lightness, -1.0],
                [-1.0, -1.0, -1.0],
            ],
        )
    }
}

impl ImageTransform for Sharpen {
    fn apply(&self, image: ImageArray, rng: &mut dyn RngCore) -> Result<ImageArray, OCRError> {
        let alpha = uniform(rng, self.alpha) as f32;
        let lightness = uniform(rng, self.lightness) as f32;
        let filtered = filter2d_3x3(&image, &Self::kernel(alpha, lightness))?;
        Ok(filtered.mapv_into(clip))
    }

    fn name(&self) -> &str {
        "Sharpen"
    }
}

/// `255 - x`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvertImg;

impl ImageTransform for InvertImg {
    fn apply(&self, image: ImageArray, _rng: &mut dyn RngCore) -> Result<ImageArray, OCRError> {
        Ok(image.mapv_into(|v| 255.0 - v))
    }

    fn name(&self) -> &str {
        "InvertImg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::test_support::textured;
    use ndarray::Array3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    fn in_pixel_range(image: &Array3<f32>) -> bool {
        image.iter().all(|v| (0.0..=255.0).contains(v))
    }

    #[test]
    fn test_gauss_noise_changes_and_clips() {
        let t = GaussNoise::with_max_var(10.0).unwrap();
        let img = textured(16, 16, 3);
        let out = t.apply(img.clone(), &mut rng(1)).unwrap();
        assert_eq!(out.dim(), img.dim());
        assert!(in_pixel_range(&out));
        assert_ne!(out, img);
    }

    #[test]
    fn test_brightness_contrast_bounds() {
        let t = RandomBrightnessContrast::new((0.05, 0.05), (-0.2, -0.2)).unwrap();
        let img = Array3::from_elem((2, 2, 1), 100.0f32);
        let out = t.apply(img, &mut rng(0)).unwrap();
        // 100 * 0.8 + 255 * 0.05
        assert!(out.iter().all(|&v| (v - 92.75).abs() < 1e-3));
    }

    #[test]
    fn test_compression_keeps_shape_and_alpha() {
        let t = ImageCompression::new(95, 100).unwrap();
        for c in [1, 3] {
            let out = t.apply(textured(8, 12, c), &mut rng(3)).unwrap();
            assert_eq!(out.dim(), (8, 12, c));
        }
        let mut rgba = textured(8, 12, 4);
        rgba.slice_mut(s![.., .., 3]).fill(77.0);
        let out = t.apply(rgba, &mut rng(3)).unwrap();
        assert_eq!(out.dim(), (8, 12, 4));
        assert!(out.slice(s![.., .., 3]).iter().all(|&v| v == 77.0));
    }

    #[test]
    fn test_compression_rejects_bad_quality() {
        assert!(ImageCompression::new(0, 100).is_err());
        assert!(ImageCompression::new(90, 101).is_err());
        assert!(ImageCompression::new(99, 95).is_err());
    }

    #[test]
    fn test_overlay_preserves_channels() {
        let t = TransparentOverlay::new(1.0, 0.1, 0.4).unwrap();
        for c in [1, 3, 4] {
            let out = t.apply(textured(32, 100, c), &mut rng(c as u64)).unwrap();
            assert_eq!(out.dim(), (32, 100, c));
        }
    }

    #[test]
    fn test_overlay_params_respect_bounds() {
        let t = TransparentOverlay::new(1.0, 0.1, 0.4).unwrap();
        let mut r = rng(9);
        for _ in 0..200 {
            let p = t.draw(32, 100, &mut r);
            assert!(p.x < 90 && p.y < 1);
            assert!(p.width < 10 && p.height < 32);
            assert!(p.color.iter().all(|&c| (0.0..256.0).contains(&c)));
        }
    }

    #[test]
    fn test_overlay_zero_bounds_do_not_panic() {
        let t = TransparentOverlay::new(1.0, 0.1, 0.4).unwrap();
        // max width is 0 for images narrower than 10 pixels.
        let p = t.draw(4, 5, &mut rng(0));
        assert_eq!(p.width, 0);
    }

    #[test]
    fn test_overlay_blend_math() {
        let t = TransparentOverlay::new(1.0, 1.0, 0.5).unwrap();
        let img = Array3::from_elem((4, 4, 3), 100.0f32);
        let params = OverlayParams {
            x: 1,
            y: 1,
            width: 1,
            height: 10,
            color: [200.0, 0.0, 100.0],
        };
        let out = t.blend(img, &params);
        assert_eq!(out[[0, 0, 0]], 100.0);
        assert_eq!(out[[1, 1, 0]], 150.0);
        assert_eq!(out[[3, 2, 1]], 50.0);
        assert_eq!(out[[3, 2, 2]], 100.0);
        assert_eq!(out[[3, 3, 0]], 100.0);
    }

    #[test]
    fn test_kernels_sum() {
        // Emboss keeps mean intensity; sharpen scales it by 1 - a + a * l.
        let sum = |k: [[f32; 3]; 3]| k.iter().flatten().sum::<f32>();
        assert!((sum(Emboss::kernel(0.3, 0.5)) - 1.0).abs() < 1e-6);
        assert!((sum(Sharpen::kernel(0.5, 0.5)) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_filters_clip() {
        let img = textured(10, 10, 3);
        let out = Sharpen::new((0.5, 0.5), (1.0, 1.0))
            .unwrap()
            .apply(img.clone(), &mut rng(0))
            .unwrap();
        assert!(in_pixel_range(&out));
        let out = Emboss::new((0.2, 0.5), (0.2, 0.7))
            .unwrap()
            .apply(img, &mut rng(0))
            .unwrap();
        assert!(in_pixel_range(&out));
    }

    #[test]
    fn test_invert() {
        let out = InvertImg
            .apply(Array3::from_elem((1, 2, 1), 55.0), &mut rng(0))
            .unwrap();
        assert!(out.iter().all(|&v| v == 200.0));
    }
}
