//! Text recognition with an exported CRNN model.
//!
//! Images are reduced to gray, resized to the model height, scaled to
//! `[0, 1]` and fed one line at a time to ONNX Runtime; the class scores are
//! decoded greedily. Multi-line images are first split into lines.

pub mod locator;

use crate::augment::{ImageArray, ScaleNormalize, ToSingleChannelGray};
use crate::core::config::{OrtExecutionProvider, OrtSessionConfig};
use crate::core::errors::OCRError;
use crate::core::inference::OrtInfer;
use crate::data::vocab::Vocab;
use crate::processors::types::Interpolation;
use crate::processors::{CtcGreedyDecoder, LineSplitter};
use crate::utils::{load_image, resize_to_height};
use ndarray::{Array3, Array4, Axis};
use std::path::Path;
use std::str::FromStr;

pub use locator::{ModelFiles, ModelLocator};

/// Input height of the bundled recognition models.
pub const DEFAULT_IMG_HEIGHT: usize = 32;

/// Device inference runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Context {
    #[default]
    Cpu,
    Gpu,
}

impl Context {
    pub fn session_config(self) -> OrtSessionConfig {
        let provider = match self {
            Context::Cpu => OrtExecutionProvider::CPU,
            Context::Gpu => OrtExecutionProvider::CUDA { device_id: Some(0) },
        };
        OrtSessionConfig::new().with_execution_providers(vec![provider])
    }
}

impl FromStr for Context {
    type Err = OCRError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Context::Cpu),
            "gpu" | "cuda" => Ok(Context::Gpu),
            other => Err(OCRError::invalid_field("context", "cpu or gpu", other)),
        }
    }
}

/// One recognized line: text and mean confidence.
pub type LineResult = (String, f32);

#[derive(Debug)]
pub struct Recognizer {
    infer: OrtInfer,
    decoder: CtcGreedyDecoder,
    splitter: LineSplitter,
    img_height: usize,
}

impl Recognizer {
    /// Loads the model and vocabulary located by `locator`.
    pub fn from_locator(locator: &ModelLocator, context: Context) -> Result<Self, OCRError> {
        let files = locator.resolve()?;
        Self::from_files(&files, context)
    }

    pub fn from_files(files: &ModelFiles, context: Context) -> Result<Self, OCRError> {
        let vocab = Vocab::from_file(&files.vocab)?;
        let infer = OrtInfer::from_config(&context.session_config(), &files.model)?;
        tracing::info!(
            "Loaded recognizer {} with {} classes on {:?}",
            infer.model_name(),
            vocab.num_classes(),
            context
        );
        Ok(Self::new(infer, CtcGreedyDecoder::new(vocab)))
    }

    pub fn new(infer: OrtInfer, decoder: CtcGreedyDecoder) -> Self {
        Self {
            infer,
            decoder,
            splitter: LineSplitter::default(),
            img_height: DEFAULT_IMG_HEIGHT,
        }
    }

    pub fn with_img_height(mut self, img_height: usize) -> Self {
        self.img_height = img_height;
        self
    }

    pub fn with_splitter(mut self, splitter: LineSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    /// Recognizes an image holding a single text line.
    pub fn ocr_for_single_line(&self, path: &Path) -> Result<LineResult, OCRError> {
        let image = load_image(path)?;
        self.recognize_line(image)
    }

    /// Recognizes every line of an image, top to bottom.
    pub fn ocr(&self, path: &Path) -> Result<Vec<LineResult>, OCRError> {
        let image = load_image(path)?;
        self.splitter
            .split(&image)?
            .into_iter()
            .map(|line| self.recognize_line(line))
            .collect()
    }

    /// Recognizes one HWC line image with raw pixel values.
    pub fn recognize_line(&self, image: ImageArray) -> Result<LineResult, OCRError> {
        let input = prepare_line(image, self.img_height)?;
        let output = self.infer.infer_3d(&input)?;
        let output = batch_major(output, 1)?;
        Ok(self.decoder.decode(output.index_axis(Axis(0), 0)))
    }
}

/// HWC raw line image to a `[1, 1, H, W]` model input.
fn prepare_line(image: ImageArray, img_height: usize) -> Result<Array4<f32>, OCRError> {
    let gray = ToSingleChannelGray::convert(image)?;
    let resized = resize_to_height(&gray, img_height, Interpolation::Bilinear)?;
    Ok(ScaleNormalize::normalize(resized)
        .permuted_axes([2, 0, 1])
        .insert_axis(Axis(0))
        .as_standard_layout()
        .into_owned())
}

/// Brings model output to `[N, T, C]`, accepting `[T, N, C]` as well.
fn batch_major(output: Array3<f32>, batch: usize) -> Result<Array3<f32>, OCRError> {
    let shape = output.shape().to_vec();
    if shape[0] == batch {
        Ok(output)
    } else if shape[1] == batch {
        Ok(output.permuted_axes([1, 0, 2]).as_standard_layout().into_owned())
    } else {
        Err(OCRError::InvalidInput {
            message: format!("output shape {shape:?} does not match batch size {batch}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_parsing() {
        assert_eq!("cpu".parse::<Context>().unwrap(), Context::Cpu);
        assert_eq!("GPU".parse::<Context>().unwrap(), Context::Gpu);
        assert!("tpu".parse::<Context>().is_err());
        assert_eq!(
            Context::Gpu.session_config().execution_providers,
            vec![OrtExecutionProvider::CUDA { device_id: Some(0) }]
        );
    }

    #[test]
    fn test_prepare_line() {
        let image = Array3::from_elem((16, 50, 3), 255.0f32);
        let input = prepare_line(image, 32).unwrap();
        assert_eq!(input.dim(), (1, 1, 32, 100));
        assert!(input.iter().all(|&v| (v - 1.0).abs() < 1e-4));
    }

    #[test]
    fn test_batch_major() {
        let ntc = Array3::<f32>::zeros((1, 7, 5));
        assert_eq!(batch_major(ntc, 1).unwrap().dim(), (1, 7, 5));
        let tnc = Array3::<f32>::zeros((7, 1, 5));
        assert_eq!(batch_major(tnc, 1).unwrap().dim(), (1, 7, 5));
        assert!(batch_major(Array3::<f32>::zeros((7, 3, 5)), 1).is_err());
    }
}
