//! Conversion between decoded images and `f32` arrays.

use crate::core::errors::{ImageProcessError, OCRError};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use ndarray::Array3;
use std::path::Path;

/// Loads an image from disk as an RGB `[H, W, 3]` array with raw `0..=255` values.
///
/// # Errors
///
/// Returns [`OCRError::ImageLoad`] if the file cannot be opened or decoded.
pub fn load_image(path: &Path) -> Result<Array3<f32>, OCRError> {
    let img = image::open(path).map_err(OCRError::ImageLoad)?;
    Ok(rgb_to_array(&img.to_rgb8()))
}

/// Converts an RGB image into an `[H, W, 3]` array.
pub fn rgb_to_array(img: &RgbImage) -> Array3<f32> {
    let (w, h) = img.dimensions();
    Array3::from_shape_fn((h as usize, w as usize, 3), |(y, x, c)| {
        img.get_pixel(x as u32, y as u32)[c] as f32
    })
}

/// Converts a grayscale image into an `[H, W, 1]` array.
pub fn gray_to_array(img: &GrayImage) -> Array3<f32> {
    let (w, h) = img.dimensions();
    Array3::from_shape_fn((h as usize, w as usize, 1), |(y, x, _)| {
        img.get_pixel(x as u32, y as u32)[0] as f32
    })
}

/// Rounds and clamps an `[H, W, C]` array (C = 1 or 3) into an 8-bit image.
///
/// # Errors
///
/// Returns an error for any other channel count.
pub fn array_to_dynamic(array: &Array3<f32>) -> Result<DynamicImage, OCRError> {
    let (h, w, c) = array.dim();
    let to_u8 = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    match c {
        1 => Ok(DynamicImage::ImageLuma8(ImageBuffer::from_fn(
            w as u32,
            h as u32,
            |x, y| Luma([to_u8(array[[y as usize, x as usize, 0]])]),
        ))),
        3 => Ok(DynamicImage::ImageRgb8(ImageBuffer::from_fn(
            w as u32,
            h as u32,
            |x, y| {
                let (x, y) = (x as usize, y as usize);
                Rgb([
                    to_u8(array[[y, x, 0]]),
                    to_u8(array[[y, x, 1]]),
                    to_u8(array[[y, x, 2]]),
                ])
            },
        ))),
        other => Err(ImageProcessError::UnsupportedChannels(other).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_round_trip_through_array() {
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(2, 1, Rgb([10, 20, 30]));
        let array = rgb_to_array(&img);
        assert_eq!(array.dim(), (2, 3, 3));
        assert_eq!(array[[1, 2, 1]], 20.0);

        let back = array_to_dynamic(&array).unwrap().to_rgb8();
        assert_eq!(back.get_pixel(2, 1), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_array_to_dynamic_clamps() {
        let array = Array3::from_elem((1, 1, 1), 300.0f32);
        let img = array_to_dynamic(&array).unwrap().to_luma8();
        assert_eq!(img.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn test_unsupported_channels() {
        let array = Array3::<f32>::zeros((2, 2, 2));
        assert!(array_to_dynamic(&array).is_err());
    }

    #[test]
    fn test_load_image_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("line.png");
        GrayImage::from_pixel(5, 4, Luma([7])).save(&path).unwrap();
        let rgb = load_image(&path).unwrap();
        assert_eq!(rgb.dim(), (4, 5, 3));
        assert!(rgb.iter().all(|&v| v == 7.0));
    }
}
