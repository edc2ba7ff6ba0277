//! Splitting a multi-line text image into single-line crops.
//!
//! The image is binarized with Otsu's threshold; rows containing ink form
//! line bands. Bands separated by fewer than `min_gap` blank rows are merged
//! and each band is padded vertically before cropping.

use crate::augment::{ImageArray, ToSingleChannelGray};
use crate::core::errors::OCRError;
use ndarray::{Array2, Axis, s};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSplitter {
    /// Blank runs shorter than this are treated as part of a line.
    pub min_gap: usize,
    /// Rows added above and below each line, clipped to the image.
    pub padding: usize,
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self {
            min_gap: 2,
            padding: 2,
        }
    }
}

impl LineSplitter {
    pub fn new(min_gap: usize, padding: usize) -> Self {
        Self { min_gap, padding }
    }

    /// Row ranges of the text lines in an HWC image, top to bottom.
    pub fn line_ranges(&self, image: &ImageArray) -> Result<Vec<Range<usize>>, OCRError> {
        let gray = ToSingleChannelGray::convert(image.clone())?.index_axis_move(Axis(2), 0);
        let height = gray.nrows();
        let ink = ink_mask(&gray);
        let profile: Vec<usize> = ink
            .axis_iter(Axis(0))
            .map(|row| row.iter().filter(|&&v| v).count())
            .collect();

        let mut bands: Vec<Range<usize>> = Vec::new();
        let mut start = None;
        for (y, &count) in profile.iter().enumerate() {
            match (count > 0, start) {
                (true, None) => start = Some(y),
                (false, Some(s0)) => {
                    bands.push(s0..y);
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s0) = start {
            bands.push(s0..height);
        }

        let mut merged: Vec<Range<usize>> = Vec::with_capacity(bands.len());
        for band in bands {
            match merged.last_mut() {
                Some(last) if band.start - last.end < self.min_gap => last.end = band.end,
                _ => merged.push(band),
            }
        }

        Ok(merged
            .into_iter()
            .map(|r| r.start.saturating_sub(self.padding)..(r.end + self.padding).min(height))
            .collect())
    }

    /// Crops every detected line, keeping the input's channels.
    pub fn split(&self, image: &ImageArray) -> Result<Vec<ImageArray>, OCRError> {
        let ranges = self.line_ranges(image)?;
        tracing::debug!("Split image into {} line(s)", ranges.len());
        Ok(ranges
            .into_iter()
            .map(|r| image.slice(s![r, .., ..]).to_owned())
            .collect())
    }
}

/// Otsu threshold over 256 gray levels; pixels `<= t` form the dark class.
pub fn otsu_threshold(gray: &Array2<f32>) -> u8 {
    let mut hist = [0u64; 256];
    for &v in gray.iter() {
        hist[v.round().clamp(0.0, 255.0) as usize] += 1;
    }
    let total = gray.len() as f64;
    if total == 0.0 {
        return 0;
    }
    let sum_all: f64 = hist.iter().enumerate().map(|(i, &n)| i as f64 * n as f64).sum();

    let mut best = (0u8, -1.0f64);
    let mut weight_bg = 0.0;
    let mut sum_bg = 0.0;
    for (t, &n) in hist.iter().enumerate() {
        weight_bg += n as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0.0 {
            break;
        }
        sum_bg += t as f64 * n as f64;
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let between = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);
        if between > best.1 {
            best = (t as u8, between);
        }
    }
    best.0
}

/// Marks ink pixels: the minority side of the Otsu split.
fn ink_mask(gray: &Array2<f32>) -> Array2<bool> {
    let t = otsu_threshold(gray) as f32;
    let dark = gray.mapv(|v| v.round() <= t);
    let dark_count = dark.iter().filter(|&&d| d).count();
    if dark_count * 2 > gray.len() {
        dark.mapv(|d| !d)
    } else {
        dark
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    /// White page with black bars on the given rows.
    fn page(h: usize, w: usize, ink_rows: &[Range<usize>]) -> ImageArray {
        let mut img = Array3::from_elem((h, w, 3), 255.0f32);
        for r in ink_rows {
            img.slice_mut(s![r.clone(), 2..w - 2, ..]).fill(0.0);
        }
        img
    }

    #[test]
    fn test_otsu_separates_two_levels() {
        let mut gray = Array2::from_elem((4, 4), 200.0f32);
        gray.slice_mut(s![0..2, ..]).fill(20.0);
        let t = otsu_threshold(&gray);
        assert!((20..200).contains(&t));
    }

    #[test]
    fn test_two_lines_are_found_and_padded() {
        let img = page(40, 30, &[5..12, 22..30]);
        let ranges = LineSplitter::default().line_ranges(&img).unwrap();
        assert_eq!(ranges, vec![3..14, 20..32]);
        let lines = LineSplitter::default().split(&img).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].dim(), (11, 30, 3));
    }

    #[test]
    fn test_narrow_gaps_are_merged() {
        let img = page(30, 20, &[5..10, 11..15]);
        let ranges = LineSplitter::new(2, 0).line_ranges(&img).unwrap();
        assert_eq!(ranges, vec![5..15]);
    }

    #[test]
    fn test_inverted_page() {
        let mut img = page(20, 20, &[8..12]);
        img.mapv_inplace(|v| 255.0 - v);
        let ranges = LineSplitter::new(2, 0).line_ranges(&img).unwrap();
        assert_eq!(ranges, vec![8..12]);
    }

    #[test]
    fn test_blank_page_has_no_lines() {
        let img = Array3::from_elem((10, 10, 1), 255.0f32);
        assert!(LineSplitter::default().split(&img).unwrap().is_empty());
    }
}
