//! Tab-separated recognition index.
//!
//! Each non-empty line is `<image path>\t<label tokens separated by spaces>`.
//! Image paths are relative to the dataset's image folder unless absolute.

use crate::core::errors::OCRError;
use crate::processors::types::Interpolation;
use crate::utils::{load_image, resize_to_height};
use ndarray::Array3;
use std::path::{Path, PathBuf};

/// One labelled line image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub image_path: PathBuf,
    pub tokens: Vec<String>,
}

/// Parses index text into samples.
///
/// # Errors
///
/// Returns `OCRError::InvalidInput` naming the 1-based line of the first
/// entry without a tab or with an empty image path.
pub fn parse_index(text: &str) -> Result<Vec<Sample>, OCRError> {
    let mut samples = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let Some((path, label)) = line.split_once('\t') else {
            return Err(OCRError::InvalidInput {
                message: format!("index line {}: expected '<path>\\t<label>'", lineno + 1),
            });
        };
        if path.is_empty() {
            return Err(OCRError::InvalidInput {
                message: format!("index line {}: empty image path", lineno + 1),
            });
        }
        samples.push(Sample {
            image_path: PathBuf::from(path),
            tokens: label.split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect(),
        });
    }
    Ok(samples)
}

/// Samples of one split plus what is needed to load them.
#[derive(Debug, Clone)]
pub struct OcrDataset {
    samples: Vec<Sample>,
    img_folder: PathBuf,
    img_height: usize,
}

impl OcrDataset {
    pub fn new(samples: Vec<Sample>, img_folder: impl Into<PathBuf>, img_height: usize) -> Self {
        Self {
            samples,
            img_folder: img_folder.into(),
            img_height,
        }
    }

    /// Reads an index file.
    pub fn from_index_file(
        index_fp: &Path,
        img_folder: impl Into<PathBuf>,
        img_height: usize,
    ) -> Result<Self, OCRError> {
        let text = std::fs::read_to_string(index_fp).map_err(|e| OCRError::InvalidInput {
            message: format!("Failed to read index '{}': {}", index_fp.display(), e),
        })?;
        let samples = parse_index(&text)?;
        tracing::info!("Loaded {} samples from {}", samples.len(), index_fp.display());
        Ok(Self::new(samples, img_folder, img_height))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn img_height(&self) -> usize {
        self.img_height
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.img_folder.join(path)
        }
    }

    /// Loads sample `index` as a CHW array of raw pixel values, resized to
    /// the dataset height.
    pub fn load_image(&self, index: usize) -> Result<Array3<f32>, OCRError> {
        let sample = self.samples.get(index).ok_or_else(|| OCRError::InvalidInput {
            message: format!("sample index {index} out of range ({} samples)", self.len()),
        })?;
        let hwc = load_image(&self.resolve(&sample.image_path))?;
        let hwc = resize_to_height(&hwc, self.img_height, Interpolation::Bilinear)?;
        Ok(hwc.permuted_axes([2, 0, 1]).as_standard_layout().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_parse_index() {
        let text = "a/1.png\t你 好\n\nb/2.jpg\tx <space> y\r\nc.png\t\n";
        let samples = parse_index(text).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].image_path, PathBuf::from("a/1.png"));
        assert_eq!(samples[0].tokens, vec!["你", "好"]);
        assert_eq!(samples[1].tokens, vec!["x", "<space>", "y"]);
        assert!(samples[2].tokens.is_empty());
    }

    #[test]
    fn test_parse_index_reports_line() {
        let err = parse_index("ok.png\ta\nbroken line\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_load_image_resizes_to_height() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(40, 16, Rgb([10, 20, 30]))
            .save(dir.path().join("s.png"))
            .unwrap();
        let dataset = OcrDataset::new(
            vec![Sample {
                image_path: PathBuf::from("s.png"),
                tokens: vec!["a".into()],
            }],
            dir.path(),
            32,
        );
        let chw = dataset.load_image(0).unwrap();
        assert_eq!(chw.dim(), (3, 32, 80));
        assert!((chw[[1, 5, 5]] - 20.0).abs() < 1e-3);
        assert!(dataset.load_image(1).is_err());
    }
}
