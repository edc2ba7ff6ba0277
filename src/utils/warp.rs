//! Geometric resampling of HWC `f32` image arrays.
//!
//! Every warp here uses inverse mapping: for each destination pixel a source
//! coordinate is computed and sampled with the requested interpolation.
//! Coordinates follow OpenCV's pixel-centre convention so affine matrices and
//! remap fields built the usual way line up with the image grid.

use crate::core::errors::{ImageProcessError, OCRError};
use crate::processors::types::{BorderMode, Interpolation};
use nalgebra::Matrix3;
use ndarray::{Array2, Array3, ArrayView3};
use rayon::prelude::*;

/// Coordinates beyond this are treated as far outside any image.
const COORD_LIMIT: f32 = 1.0e7;

/// Cubic convolution kernel with `a = -0.75`, matching OpenCV's INTER_CUBIC.
#[inline]
fn cubic_kernel(t: f32) -> f32 {
    const A: f32 = -0.75;
    let t_abs = t.abs();

    if t_abs <= 1.0 {
        (A + 2.0) * t_abs * t_abs * t_abs - (A + 3.0) * t_abs * t_abs + 1.0
    } else if t_abs < 2.0 {
        A * t_abs * t_abs * t_abs - 5.0 * A * t_abs * t_abs + 8.0 * A * t_abs - 4.0 * A
    } else {
        0.0
    }
}

/// Reads one channel at integer coordinates, resolving out-of-bounds reads
/// through the border mode.
#[inline]
fn fetch(src: &ArrayView3<f32>, x: isize, y: isize, c: usize, border: BorderMode) -> f32 {
    let (h, w, _) = src.dim();
    if x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h {
        return src[[y as usize, x as usize, c]];
    }
    match border {
        BorderMode::Constant(value) => value,
        BorderMode::Replicate => {
            let cx = x.clamp(0, w as isize - 1) as usize;
            let cy = y.clamp(0, h as isize - 1) as usize;
            src[[cy, cx, c]]
        }
    }
}

/// Samples all channels at a fractional coordinate into `out`.
fn sample(
    src: &ArrayView3<f32>,
    x: f32,
    y: f32,
    interpolation: Interpolation,
    border: BorderMode,
    out: &mut [f32],
) {
    let x = x.clamp(-COORD_LIMIT, COORD_LIMIT);
    let y = y.clamp(-COORD_LIMIT, COORD_LIMIT);

    match interpolation {
        Interpolation::Nearest => {
            let xi = x.round() as isize;
            let yi = y.round() as isize;
            for (c, v) in out.iter_mut().enumerate() {
                *v = fetch(src, xi, yi, c, border);
            }
        }
        Interpolation::Bilinear => {
            let x0 = x.floor();
            let y0 = y.floor();
            let dx = x - x0;
            let dy = y - y0;
            let (xi, yi) = (x0 as isize, y0 as isize);
            for (c, v) in out.iter_mut().enumerate() {
                let p00 = fetch(src, xi, yi, c, border);
                let p10 = fetch(src, xi + 1, yi, c, border);
                let p01 = fetch(src, xi, yi + 1, c, border);
                let p11 = fetch(src, xi + 1, yi + 1, c, border);
                *v = (1.0 - dx) * (1.0 - dy) * p00
                    + dx * (1.0 - dy) * p10
                    + (1.0 - dx) * dy * p01
                    + dx * dy * p11;
            }
        }
        Interpolation::Bicubic => {
            let x0 = x.floor();
            let y0 = y.floor();
            let dx = x - x0;
            let dy = y - y0;
            let (xi, yi) = (x0 as isize, y0 as isize);
            let wx = [
                cubic_kernel(dx + 1.0),
                cubic_kernel(dx),
                cubic_kernel(dx - 1.0),
                cubic_kernel(dx - 2.0),
            ];
            let wy = [
                cubic_kernel(dy + 1.0),
                cubic_kernel(dy),
                cubic_kernel(dy - 1.0),
                cubic_kernel(dy - 2.0),
            ];
            for (c, v) in out.iter_mut().enumerate() {
                let mut acc = 0.0f32;
                for (j, &weight_y) in wy.iter().enumerate() {
                    let sy = yi - 1 + j as isize;
                    for (i, &weight_x) in wx.iter().enumerate() {
                        let sx = xi - 1 + i as isize;
                        acc += weight_x * weight_y * fetch(src, sx, sy, c, border);
                    }
                }
                *v = acc;
            }
        }
    }
}

/// Core inverse-mapping loop shared by every warp.
///
/// `map` returns the source `(x, y)` for destination pixel `(col, row)`.
/// Rows are processed in parallel.
fn warp_with<F>(
    src: &Array3<f32>,
    dst_size: (usize, usize),
    interpolation: Interpolation,
    border: BorderMode,
    map: F,
) -> Result<Array3<f32>, OCRError>
where
    F: Fn(usize, usize) -> (f32, f32) + Sync,
{
    let (dst_h, dst_w) = dst_size;
    let channels = src.dim().2;
    if dst_h == 0 || dst_w == 0 {
        return Err(ImageProcessError::InvalidTargetSize {
            width: dst_w,
            height: dst_h,
        }
        .into());
    }
    if channels == 0 || src.dim().0 == 0 || src.dim().1 == 0 {
        return Err(ImageProcessError::ImageTooSmall {
            image_size: (src.dim().1, src.dim().0),
            min_size: (1, 1),
        }
        .into());
    }

    let src = src.view();
    let mut buffer = vec![0.0f32; dst_h * dst_w * channels];
    buffer
        .par_chunks_mut(dst_w * channels)
        .enumerate()
        .for_each(|(row, row_buffer)| {
            for (col, pixel) in row_buffer.chunks_mut(channels).enumerate() {
                let (sx, sy) = map(col, row);
                sample(&src, sx, sy, interpolation, border, pixel);
            }
        });

    Ok(Array3::from_shape_vec((dst_h, dst_w, channels), buffer)?)
}

/// Samples `src` at the absolute coordinates given by `map_x`/`map_y`.
///
/// The output has the shape of the maps and the channel count of `src`.
///
/// # Errors
///
/// Returns an error if the maps differ in shape or are empty.
pub fn remap(
    src: &Array3<f32>,
    map_x: &Array2<f32>,
    map_y: &Array2<f32>,
    interpolation: Interpolation,
    border: BorderMode,
) -> Result<Array3<f32>, OCRError> {
    if map_x.dim() != map_y.dim() {
        return Err(OCRError::InvalidInput {
            message: format!(
                "remap fields differ in shape: {:?} vs {:?}",
                map_x.dim(),
                map_y.dim()
            ),
        });
    }
    warp_with(src, map_x.dim(), interpolation, border, |col, row| {
        (map_x[[row, col]], map_y[[row, col]])
    })
}

/// Applies an affine transform given as a homogeneous 3x3 matrix that maps
/// source coordinates to destination coordinates.
///
/// # Errors
///
/// Returns an error if the matrix cannot be inverted.
pub fn warp_affine(
    src: &Array3<f32>,
    matrix: &Matrix3<f64>,
    dst_size: (usize, usize),
    interpolation: Interpolation,
    border: BorderMode,
) -> Result<Array3<f32>, OCRError> {
    let inv = matrix.try_inverse().ok_or_else(|| OCRError::InvalidInput {
        message: "Cannot invert transformation matrix".to_string(),
    })?;
    warp_with(src, dst_size, interpolation, border, |col, row| {
        let (x, y) = (col as f64, row as f64);
        let sx = inv[(0, 0)] * x + inv[(0, 1)] * y + inv[(0, 2)];
        let sy = inv[(1, 0)] * x + inv[(1, 1)] * y + inv[(1, 2)];
        (sx as f32, sy as f32)
    })
}

/// Resizes to `(height, width)`.
///
/// Bilinear and bicubic use half-pixel centres; nearest picks
/// `floor(dst * scale)`. Edges are replicated.
pub fn resize(
    src: &Array3<f32>,
    height: usize,
    width: usize,
    interpolation: Interpolation,
) -> Result<Array3<f32>, OCRError> {
    let (src_h, src_w, _) = src.dim();
    if (src_h, src_w) == (height, width) {
        return Ok(src.clone());
    }
    let scale_x = src_w as f32 / width.max(1) as f32;
    let scale_y = src_h as f32 / height.max(1) as f32;
    warp_with(
        src,
        (height, width),
        interpolation,
        BorderMode::Replicate,
        |col, row| match interpolation {
            Interpolation::Nearest => (
                ((col as f32 * scale_x).floor()).min(src_w as f32 - 1.0),
                ((row as f32 * scale_y).floor()).min(src_h as f32 - 1.0),
            ),
            _ => (
                (col as f32 + 0.5) * scale_x - 0.5,
                (row as f32 + 0.5) * scale_y - 0.5,
            ),
        },
    )
}

/// Resizes to a fixed height, scaling the width by the same factor
/// (rounded, at least 1).
pub fn resize_to_height(
    src: &Array3<f32>,
    height: usize,
    interpolation: Interpolation,
) -> Result<Array3<f32>, OCRError> {
    let (src_h, src_w, _) = src.dim();
    if src_h == 0 {
        return Err(ImageProcessError::ImageTooSmall {
            image_size: (src_w, src_h),
            min_size: (1, 1),
        }
        .into());
    }
    let width = ((src_w as f64 * height as f64 / src_h as f64).round() as usize).max(1);
    resize(src, height, width, interpolation)
}

/// Rotation + isotropic scale about `center`, as a homogeneous matrix.
///
/// Positive angles rotate counter-clockwise in image coordinates (y down),
/// the same convention as OpenCV's `getRotationMatrix2D`.
pub fn rotation_matrix_2d(center: (f64, f64), angle_deg: f64, scale: f64) -> Matrix3<f64> {
    let (cx, cy) = center;
    let theta = angle_deg.to_radians();
    let alpha = scale * theta.cos();
    let beta = scale * theta.sin();
    Matrix3::new(
        alpha,
        beta,
        (1.0 - alpha) * cx - beta * cy,
        -beta,
        alpha,
        beta * cx + (1.0 - alpha) * cy,
        0.0,
        0.0,
        1.0,
    )
}

/// Solves for the affine matrix mapping three source points onto three
/// destination points.
///
/// # Errors
///
/// Returns an error if the source points are collinear.
pub fn affine_from_points(
    src_points: &[(f64, f64); 3],
    dst_points: &[(f64, f64); 3],
) -> Result<Matrix3<f64>, OCRError> {
    let mut a = nalgebra::DMatrix::<f64>::zeros(6, 6);
    let mut b = nalgebra::DVector::<f64>::zeros(6);

    for i in 0..3 {
        let (sx, sy) = src_points[i];
        let (dx, dy) = dst_points[i];

        a.set_row(
            i * 2,
            &nalgebra::RowDVector::from_row_slice(&[sx, sy, 1.0, 0.0, 0.0, 0.0]),
        );
        b[i * 2] = dx;

        a.set_row(
            i * 2 + 1,
            &nalgebra::RowDVector::from_row_slice(&[0.0, 0.0, 0.0, sx, sy, 1.0]),
        );
        b[i * 2 + 1] = dy;
    }

    let solution = a.lu().solve(&b).ok_or_else(|| OCRError::InvalidInput {
        message: "Cannot solve affine transformation from collinear points".to_string(),
    })?;

    Ok(Matrix3::new(
        solution[0],
        solution[1],
        solution[2],
        solution[3],
        solution[4],
        solution[5],
        0.0,
        0.0,
        1.0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn gradient(h: usize, w: usize, c: usize) -> Array3<f32> {
        Array3::from_shape_fn((h, w, c), |(y, x, ch)| (y * 10 + x + ch * 100) as f32)
    }

    #[test]
    fn test_cubic_kernel_interpolates() {
        assert_eq!(cubic_kernel(0.0), 1.0);
        assert!(cubic_kernel(1.0).abs() < 1e-6);
        assert!(cubic_kernel(2.0).abs() < 1e-6);
        let sum: f32 = [1.25, 0.25, -0.75, -1.75].iter().map(|&t| cubic_kernel(t)).sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_identity_affine_is_lossless() {
        let img = gradient(5, 7, 3);
        for interp in [
            Interpolation::Nearest,
            Interpolation::Bilinear,
            Interpolation::Bicubic,
        ] {
            let out =
                warp_affine(&img, &Matrix3::identity(), (5, 7), interp, BorderMode::Constant(0.0))
                    .unwrap();
            for (a, b) in out.iter().zip(img.iter()) {
                assert!((a - b).abs() < 1e-3, "{interp:?}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn test_translation_fills_border() {
        let img = Array3::from_elem((4, 4, 1), 10.0f32);
        let shift = Matrix3::new(1.0, 0.0, 2.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        let out = warp_affine(
            &img,
            &shift,
            (4, 4),
            Interpolation::Nearest,
            BorderMode::Constant(255.0),
        )
        .unwrap();
        assert_eq!(out[[0, 0, 0]], 255.0);
        assert_eq!(out[[0, 1, 0]], 255.0);
        assert_eq!(out[[0, 2, 0]], 10.0);
    }

    #[test]
    fn test_singular_matrix_is_rejected() {
        let img = gradient(2, 2, 1);
        let matrix = Matrix3::new(1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        let result = warp_affine(
            &img,
            &matrix,
            (2, 2),
            Interpolation::Bilinear,
            BorderMode::Replicate,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_bilinear_center_is_average() {
        let mut img = Array3::zeros((2, 2, 1));
        img[[0, 0, 0]] = 0.0;
        img[[0, 1, 0]] = 100.0;
        img[[1, 0, 0]] = 200.0;
        img[[1, 1, 0]] = 100.0;
        let map_x = Array2::from_elem((1, 1), 0.5f32);
        let map_y = Array2::from_elem((1, 1), 0.5f32);
        let out = remap(
            &img,
            &map_x,
            &map_y,
            Interpolation::Bilinear,
            BorderMode::Replicate,
        )
        .unwrap();
        assert!((out[[0, 0, 0]] - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_remap_shape_mismatch() {
        let img = gradient(3, 3, 1);
        let map_x = Array2::zeros((2, 2));
        let map_y = Array2::zeros((2, 3));
        assert!(
            remap(
                &img,
                &map_x,
                &map_y,
                Interpolation::Nearest,
                BorderMode::Replicate
            )
            .is_err()
        );
    }

    #[test]
    fn test_resize_shapes_and_constant_image() {
        let img = Array3::from_elem((8, 20, 3), 42.0f32);
        let out = resize(&img, 4, 33, Interpolation::Bilinear).unwrap();
        assert_eq!(out.dim(), (4, 33, 3));
        assert!(out.iter().all(|&v| (v - 42.0).abs() < 1e-4));

        let out = resize_to_height(&img, 32, Interpolation::Bilinear).unwrap();
        assert_eq!(out.dim(), (32, 80, 3));
    }

    #[test]
    fn test_rotation_matrix_zero_angle_scales_about_center() {
        let m = rotation_matrix_2d((10.0, 5.0), 0.0, 0.5);
        // The centre is a fixed point.
        let x = m[(0, 0)] * 10.0 + m[(0, 1)] * 5.0 + m[(0, 2)];
        let y = m[(1, 0)] * 10.0 + m[(1, 1)] * 5.0 + m[(1, 2)];
        assert!((x - 10.0).abs() < 1e-9 && (y - 5.0).abs() < 1e-9);
        assert!((m[(0, 0)] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_affine_from_points() {
        let src = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];
        let dst = [(2.0, 3.0), (4.0, 3.0), (2.0, 6.0)];
        let m = affine_from_points(&src, &dst).unwrap();
        assert!((m[(0, 0)] - 2.0).abs() < 1e-9);
        assert!((m[(1, 1)] - 3.0).abs() < 1e-9);
        assert!((m[(0, 2)] - 2.0).abs() < 1e-9);
        assert!((m[(1, 2)] - 3.0).abs() < 1e-9);

        let collinear = [(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)];
        assert!(affine_from_points(&collinear, &dst).is_err());
    }
}
