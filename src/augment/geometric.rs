//! Random geometric warps, stretches and crops.

use super::{ImageArray, ImageTransform, hwc, saturate, uniform};
use crate::core::config::validate_range;
use crate::core::errors::OCRError;
use crate::processors::types::{BorderMode, Interpolation};
use crate::utils::filter::gaussian_filter;
use crate::utils::warp::{affine_from_points, remap, resize, rotation_matrix_2d, warp_affine};
use ndarray::{Array1, Array2, s};
use rand::{Rng, RngCore};

/// Attempts [`EdgeCrop`] makes before giving up and leaving the image as is.
const EDGE_CROP_MAX_ATTEMPTS: usize = 10;

/// Random rotation, isotropic scale and translation.
///
/// `scale_limit` is relative (`(-0.15, 0.0)` scales by `0.85..1.0`),
/// `rotate_limit` is in degrees and `shift_limit` is a fraction of the
/// image size.
#[derive(Debug, Clone)]
pub struct ShiftScaleRotate {
    shift_limit: (f64, f64),
    scale_limit: (f64, f64),
    rotate_limit: (f64, f64),
    interpolation: Interpolation,
    border: BorderMode,
}

impl ShiftScaleRotate {
    pub fn new(
        shift_limit: (f64, f64),
        scale_limit: (f64, f64),
        rotate_limit: (f64, f64),
        interpolation: Interpolation,
        border: BorderMode,
    ) -> Result<Self, OCRError> {
        validate_range("shift_limit", shift_limit)?;
        validate_range("scale_limit", scale_limit)?;
        validate_range("rotate_limit", rotate_limit)?;
        if scale_limit.0 <= -1.0 {
            return Err(OCRError::invalid_field(
                "scale_limit",
                "a lower bound above -1",
                scale_limit.0.to_string(),
            ));
        }
        Ok(Self {
            shift_limit,
            scale_limit,
            rotate_limit,
            interpolation,
            border,
        })
    }
}

impl ImageTransform for ShiftScaleRotate {
    fn apply(&self, image: ImageArray, rng: &mut dyn RngCore) -> Result<ImageArray, OCRError> {
        let (h, w, _) = hwc(&image);
        let angle = uniform(rng, self.rotate_limit);
        let scale = 1.0 + uniform(rng, self.scale_limit);
        let dx = uniform(rng, self.shift_limit);
        let dy = uniform(rng, self.shift_limit);

        let mut matrix = rotation_matrix_2d((w as f64 / 2.0, h as f64 / 2.0), angle, scale);
        matrix[(0, 2)] += dx * w as f64;
        matrix[(1, 2)] += dy * h as f64;
        warp_affine(&image, &matrix, (h, w), self.interpolation, self.border).map(saturate)
    }

    fn name(&self) -> &str {
        "ShiftScaleRotate"
    }
}

/// Piecewise-linear grid warp.
///
/// The image is split into `num_steps` cells per axis and each cell boundary
/// is stretched by `1 + U(distort_limit)`.
#[derive(Debug, Clone)]
pub struct GridDistortion {
    num_steps: usize,
    distort_limit: (f64, f64),
    interpolation: Interpolation,
    border: BorderMode,
}

impl GridDistortion {
    pub fn new(
        num_steps: usize,
        distort_limit: (f64, f64),
        interpolation: Interpolation,
        border: BorderMode,
    ) -> Result<Self, OCRError> {
        if num_steps == 0 {
            return Err(OCRError::invalid_field("num_steps", "at least 1", "0"));
        }
        validate_range("distort_limit", distort_limit)?;
        Ok(Self {
            num_steps,
            distort_limit,
            interpolation,
            border,
        })
    }

    /// Builds the source coordinate for every position along one axis.
    fn axis_map(size: usize, num_steps: usize, steps: &[f64]) -> Array1<f32> {
        let mut out = Array1::<f32>::zeros(size);
        let step = size / num_steps;
        let mut prev = 0.0f64;
        for (idx, factor) in steps.iter().enumerate() {
            let start = idx * step;
            let mut end = start + step;
            let cur = if end > size {
                end = size;
                size as f64
            } else {
                prev + step as f64 * factor
            };
            let n = end.saturating_sub(start);
            for i in 0..n {
                // linspace(prev, cur, n), endpoints included
                let t = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
                out[start + i] = (prev + (cur - prev) * t) as f32;
            }
            prev = cur;
        }
        out
    }
}

impl ImageTransform for GridDistortion {
    fn apply(&self, image: ImageArray, rng: &mut dyn RngCore) -> Result<ImageArray, OCRError> {
        let (h, w, _) = hwc(&image);
        let x_steps: Vec<f64> = (0..=self.num_steps)
            .map(|_| 1.0 + uniform(rng, self.distort_limit))
            .collect();
        let y_steps: Vec<f64> = (0..=self.num_steps)
            .map(|_| 1.0 + uniform(rng, self.distort_limit))
            .collect();

        let xx = Self::axis_map(w, self.num_steps, &x_steps);
        let yy = Self::axis_map(h, self.num_steps, &y_steps);
        let map_x = Array2::from_shape_fn((h, w), |(_, x)| xx[x]);
        let map_y = Array2::from_shape_fn((h, w), |(y, _)| yy[y]);
        remap(&image, &map_x, &map_y, self.interpolation, self.border).map(saturate)
    }

    fn name(&self) -> &str {
        "GridDistortion"
    }
}

/// Barrel / pincushion lens distortion.
///
/// Draws `k = U(distort_limit)` and a principal point shift
/// `round(U(shift_limit))` in pixels, then samples through the radial model
/// `1 + k r^2 + k r^4` with focal lengths equal to the image size.
#[derive(Debug, Clone)]
pub struct OpticalDistortion {
    distort_limit: (f64, f64),
    shift_limit: (f64, f64),
    interpolation: Interpolation,
    border: BorderMode,
}

impl OpticalDistortion {
    pub fn new(
        distort_limit: (f64, f64),
        shift_limit: (f64, f64),
        interpolation: Interpolation,
        border: BorderMode,
    ) -> Result<Self, OCRError> {
        validate_range("distort_limit", distort_limit)?;
        validate_range("shift_limit", shift_limit)?;
        Ok(Self {
            distort_limit,
            shift_limit,
            interpolation,
            border,
        })
    }

    fn maps(h: usize, w: usize, k: f64, dx: f64, dy: f64) -> (Array2<f32>, Array2<f32>) {
        let (fx, fy) = (w as f64, h as f64);
        let (cx, cy) = (w as f64 * 0.5 + dx, h as f64 * 0.5 + dy);
        // The undistorted grid is centred on the pixel grid.
        let (ncx, ncy) = ((w as f64 - 1.0) * 0.5, (h as f64 - 1.0) * 0.5);

        let mut map_x = Array2::<f32>::zeros((h, w));
        let mut map_y = Array2::<f32>::zeros((h, w));
        for v in 0..h {
            let y = (v as f64 - ncy) / fy;
            for u in 0..w {
                let x = (u as f64 - ncx) / fx;
                let r2 = x * x + y * y;
                let radial = 1.0 + k * r2 + k * r2 * r2;
                map_x[[v, u]] = (fx * x * radial + cx) as f32;
                map_y[[v, u]] = (fy * y * radial + cy) as f32;
            }
        }
        (map_x, map_y)
    }
}

impl ImageTransform for OpticalDistortion {
    fn apply(&self, image: ImageArray, rng: &mut dyn RngCore) -> Result<ImageArray, OCRError> {
        let (h, w, _) = hwc(&image);
        let k = uniform(rng, self.distort_limit);
        let dx = uniform(rng, self.shift_limit).round_ties_even();
        let dy = uniform(rng, self.shift_limit).round_ties_even();
        let (map_x, map_y) = Self::maps(h, w, k, dx, dy);
        remap(&image, &map_x, &map_y, self.interpolation, self.border).map(saturate)
    }

    fn name(&self) -> &str {
        "OpticalDistortion"
    }
}

/// Random affine jitter followed by a smooth random displacement field.
///
/// Three anchor points around the image centre are moved by up to
/// `alpha_affine` pixels and the image is warped accordingly. Two
/// independent fields of `U(-1, 1)` noise are then smoothed with a Gaussian
/// of `sigma` and scaled by `alpha` to displace every pixel.
#[derive(Debug, Clone)]
pub struct ElasticTransform {
    alpha: f64,
    sigma: f64,
    alpha_affine: f64,
    interpolation: Interpolation,
    border: BorderMode,
}

impl ElasticTransform {
    pub fn new(
        alpha: f64,
        sigma: f64,
        alpha_affine: f64,
        interpolation: Interpolation,
        border: BorderMode,
    ) -> Result<Self, OCRError> {
        for (name, v) in [("alpha", alpha), ("sigma", sigma), ("alpha_affine", alpha_affine)] {
            if !v.is_finite() || v < 0.0 {
                return Err(OCRError::invalid_field(
                    name,
                    "a finite non-negative number",
                    v.to_string(),
                ));
            }
        }
        Ok(Self {
            alpha,
            sigma,
            alpha_affine,
            interpolation,
            border,
        })
    }

    fn displacement(&self, h: usize, w: usize, rng: &mut dyn RngCore) -> Array2<f64> {
        let noise = Array2::from_shape_simple_fn((h, w), || rng.random::<f64>() * 2.0 - 1.0);
        gaussian_filter(&noise, self.sigma).mapv_into(|v| v * self.alpha)
    }
}

impl ImageTransform for ElasticTransform {
    fn apply(&self, image: ImageArray, rng: &mut dyn RngCore) -> Result<ImageArray, OCRError> {
        let (h, w, _) = hwc(&image);

        // Anchor points built from the (height, width) pair, as coordinates.
        let center = ((h / 2) as f64, (w / 2) as f64);
        let square = (h.min(w) / 3) as f64;
        let src = [
            (center.0 + square, center.1 + square),
            (center.0 + square, center.1 - square),
            (center.0 - square, center.1 - square),
        ];
        let mut dst = src;
        for point in dst.iter_mut() {
            point.0 += uniform(rng, (-self.alpha_affine, self.alpha_affine));
            point.1 += uniform(rng, (-self.alpha_affine, self.alpha_affine));
        }
        // Images under three pixels on a side have coincident anchors.
        let image = if square > 0.0 {
            let matrix = affine_from_points(&src, &dst)?;
            warp_affine(&image, &matrix, (h, w), self.interpolation, self.border)?
        } else {
            image
        };

        let dx = self.displacement(h, w, rng);
        let dy = self.displacement(h, w, rng);
        let map_x = Array2::from_shape_fn((h, w), |(y, x)| (x as f64 + dx[[y, x]]) as f32);
        let map_y = Array2::from_shape_fn((h, w), |(y, x)| (y as f64 + dy[[y, x]]) as f32);
        remap(&image, &map_x, &map_y, self.interpolation, self.border).map(saturate)
    }

    fn name(&self) -> &str {
        "ElasticTransform"
    }
}

/// Horizontal stretch by a random ratio in `[min_ratio, max_ratio)`.
///
/// Height is preserved; the new width is `floor(w * ratio)`, at least 1.
#[derive(Debug, Clone)]
pub struct RandomStretch {
    min_ratio: f64,
    max_ratio: f64,
    interpolation: Interpolation,
}

impl RandomStretch {
    pub fn new(min_ratio: f64, max_ratio: f64) -> Result<Self, OCRError> {
        validate_range("stretch ratio", (min_ratio, max_ratio))?;
        if min_ratio <= 0.0 {
            return Err(OCRError::config_error_detailed(
                "RandomStretch",
                "min_ratio must be positive",
            ));
        }
        Ok(Self {
            min_ratio,
            max_ratio,
            interpolation: Interpolation::Bilinear,
        })
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }
}

impl ImageTransform for RandomStretch {
    fn apply(&self, image: ImageArray, rng: &mut dyn RngCore) -> Result<ImageArray, OCRError> {
        let (h, w, _) = hwc(&image);
        let ratio = uniform(rng, (self.min_ratio, self.max_ratio));
        let new_w = ((w as f64 * ratio) as usize).max(1);
        resize(&image, h, new_w, self.interpolation).map(saturate)
    }

    fn name(&self) -> &str {
        "RandomStretch"
    }
}

/// Trims a random margin from each edge and scales the rest back up.
///
/// Margins are drawn from `0..=max_height` (top, bottom) and `0..=max_width`
/// (left, right). A draw that would keep less than half of the height or
/// width is rejected; after a bounded number of rejections the image is
/// returned as is.
#[derive(Debug, Clone)]
pub struct EdgeCrop {
    max_height: usize,
    max_width: usize,
}

impl EdgeCrop {
    pub fn new(max_height: usize, max_width: usize) -> Self {
        Self {
            max_height,
            max_width,
        }
    }

    /// Draws `(top, left, height, width)` of an acceptable crop.
    fn draw(
        &self,
        h: usize,
        w: usize,
        rng: &mut dyn RngCore,
    ) -> Option<(usize, usize, usize, usize)> {
        for _ in 0..EDGE_CROP_MAX_ATTEMPTS {
            let top = rng.random_range(0..=self.max_height);
            let bottom = rng.random_range(0..=self.max_height);
            let left = rng.random_range(0..=self.max_width);
            let right = rng.random_range(0..=self.max_width);
            let ch = top.checked_add(bottom).and_then(|m| h.checked_sub(m));
            let cw = left.checked_add(right).and_then(|m| w.checked_sub(m));
            let (Some(ch), Some(cw)) = (ch, cw) else {
                continue;
            };
            if (ch as f64) < h as f64 * 0.5 || (cw as f64) < w as f64 * 0.5 || ch == 0 || cw == 0 {
                continue;
            }
            return Some((top, left, ch, cw));
        }
        None
    }
}

impl ImageTransform for EdgeCrop {
    fn apply(&self, image: ImageArray, rng: &mut dyn RngCore) -> Result<ImageArray, OCRError> {
        let (h, w, _) = hwc(&image);
        let Some((top, left, ch, cw)) = self.draw(h, w, rng) else {
            tracing::trace!(h, w, "edge crop found no acceptable margins");
            return Ok(image);
        };
        let crop = image.slice(s![top..top + ch, left..left + cw, ..]).to_owned();
        resize(&crop, h, w, Interpolation::Bilinear).map(saturate)
    }

    fn name(&self) -> &str {
        "EdgeCrop"
    }
}
