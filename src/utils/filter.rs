//! Neighbourhood filters over image arrays.

use crate::core::errors::OCRError;
use ndarray::{Array2, Array3};
use rayon::prelude::*;

/// Maps an index into `[0, n)` by mirroring without repeating the edge
/// (`gfedcb|abcdefgh|gfedcba`), OpenCV's default border.
#[inline]
fn reflect_101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * n as isize - 2;
    let m = i.rem_euclid(period);
    if m >= n as isize {
        (period - m) as usize
    } else {
        m as usize
    }
}

/// Maps an index into `[0, n)` by mirroring with the edge repeated
/// (`dcba|abcd|dcba`), scipy's `reflect` mode.
#[inline]
fn reflect(i: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let m = i.rem_euclid(period);
    if m >= n as isize {
        (period - 1 - m) as usize
    } else {
        m as usize
    }
}

/// 3x3 correlation applied to every channel independently.
///
/// Borders use reflect-101. The result is not clipped.
pub fn filter2d_3x3(src: &Array3<f32>, kernel: &[[f32; 3]; 3]) -> Result<Array3<f32>, OCRError> {
    let (h, w, c) = src.dim();
    if h == 0 || w == 0 || c == 0 {
        return Ok(src.clone());
    }
    let mut buffer = vec![0.0f32; h * w * c];
    buffer
        .par_chunks_mut(w * c)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..w {
                for ch in 0..c {
                    let mut acc = 0.0f32;
                    for (ky, kernel_row) in kernel.iter().enumerate() {
                        let sy = reflect_101(y as isize + ky as isize - 1, h);
                        for (kx, &weight) in kernel_row.iter().enumerate() {
                            let sx = reflect_101(x as isize + kx as isize - 1, w);
                            acc += weight * src[[sy, sx, ch]];
                        }
                    }
                    row[x * c + ch] = acc;
                }
            }
        });
    Ok(Array3::from_shape_vec((h, w, c), buffer)?)
}

/// Normalized 1-D Gaussian weights with radius `round(truncate * sigma)`.
fn gaussian_kernel_1d(sigma: f64, truncate: f64) -> Vec<f64> {
    let radius = (truncate * sigma + 0.5) as isize;
    let mut weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x * x) as f64 / (sigma * sigma)).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter_mut().for_each(|w| *w /= sum);
    weights
}

/// Separable Gaussian smoothing of a 2-D field with `reflect` borders and a
/// kernel truncated at four standard deviations.
///
/// A non-positive `sigma` returns the field unchanged.
pub fn gaussian_filter(field: &Array2<f64>, sigma: f64) -> Array2<f64> {
    if sigma <= 0.0 || field.is_empty() {
        return field.clone();
    }
    let weights = gaussian_kernel_1d(sigma, 4.0);
    let radius = (weights.len() / 2) as isize;
    let (h, w) = field.dim();

    let mut vertical = Array2::<f64>::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            vertical[[y, x]] = weights
                .iter()
                .enumerate()
                .map(|(k, wt)| wt * field[[reflect(y as isize + k as isize - radius, h), x]])
                .sum();
        }
    }

    let mut out = Array2::<f64>::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            out[[y, x]] = weights
                .iter()
                .enumerate()
                .map(|(k, wt)| wt * vertical[[y, reflect(x as isize + k as isize - radius, w)]])
                .sum();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_modes() {
        // gfedcb|abcdefgh|gfedcba
        assert_eq!(reflect_101(-1, 8), 1);
        assert_eq!(reflect_101(8, 8), 6);
        assert_eq!(reflect_101(0, 1), 0);
        // dcba|abcd|dcba
        assert_eq!(reflect(-1, 4), 0);
        assert_eq!(reflect(4, 4), 3);
        assert_eq!(reflect(-6, 4), 2);
    }

    #[test]
    fn test_identity_kernel() {
        let img = Array3::from_shape_fn((3, 4, 2), |(y, x, c)| (y * 4 + x + c) as f32);
        let identity = [[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]];
        assert_eq!(filter2d_3x3(&img, &identity).unwrap(), img);
    }

    #[test]
    fn test_box_filter_on_constant_image() {
        let img = Array3::from_elem((5, 5, 1), 9.0f32);
        let k = [[1.0 / 9.0; 3]; 3];
        let out = filter2d_3x3(&img, &k).unwrap();
        assert!(out.iter().all(|&v| (v - 9.0).abs() < 1e-4));
    }

    #[test]
    fn test_gaussian_preserves_mean_of_constant_field() {
        let field = Array2::from_elem((6, 9), 0.25f64);
        let out = gaussian_filter(&field, 2.0);
        assert!(out.iter().all(|&v| (v - 0.25).abs() < 1e-12));
    }

    #[test]
    fn test_gaussian_kernel_radius() {
        let k = gaussian_kernel_1d(10.07, 4.0);
        assert_eq!(k.len(), 81);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }
}
