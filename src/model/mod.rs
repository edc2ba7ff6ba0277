//! Recognition network description.
//!
//! The network itself is built and trained by an external backend; this
//! module fixes its hyper-parameters, ties it to a vocabulary and records an
//! optional checkpoint to initialize from.

pub mod trainer;

use crate::core::config::{ConfigError, ConfigValidator};
use crate::core::errors::OCRError;
use crate::data::vocab::Vocab;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use trainer::{DryRunTrainer, TrainReport, Trainer};

/// DenseNet feature extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseNetConfig {
    pub growth_rate: usize,
    /// Dense layers per block.
    pub block_config: Vec<usize>,
    pub num_init_features: usize,
}

impl DenseNetConfig {
    pub fn new(growth_rate: usize, block_config: Vec<usize>, num_init_features: usize) -> Self {
        Self {
            growth_rate,
            block_config,
            num_init_features,
        }
    }

    /// Channels leaving the last dense block.
    ///
    /// Each block adds `layers * growth_rate` channels; the transition between
    /// two blocks halves them.
    pub fn out_features(&self) -> usize {
        let mut features = self.num_init_features;
        for (i, &layers) in self.block_config.iter().enumerate() {
            features += layers * self.growth_rate;
            if i + 1 < self.block_config.len() {
                features /= 2;
            }
        }
        features
    }
}

/// Recurrent head on top of the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrnnConfig {
    pub lstm_features: usize,
    pub rnn_units: usize,
}

/// A CRNN bound to a vocabulary.
#[derive(Debug, Clone, Serialize)]
pub struct RecognitionModel {
    pub encoder: DenseNetConfig,
    pub head: CrnnConfig,
    /// Output classes, CTC blank included.
    pub num_classes: usize,
    #[serde(skip)]
    vocab: Vocab,
    pretrained: Option<PathBuf>,
}

impl RecognitionModel {
    pub fn new(encoder: DenseNetConfig, head: CrnnConfig, vocab: Vocab) -> Self {
        Self {
            encoder,
            head,
            num_classes: vocab.num_classes(),
            vocab,
            pretrained: None,
        }
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    /// Checkpoint the backend initializes from, if any.
    pub fn pretrained(&self) -> Option<&Path> {
        self.pretrained.as_deref()
    }

    /// Records pretrained parameters to start from.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `path` is not an existing file.
    pub fn load_pretrained(&mut self, path: &Path) -> Result<(), OCRError> {
        PretrainedCheck.validate_file_path(path)?;
        tracing::info!("Initializing from pretrained parameters {}", path.display());
        self.pretrained = Some(path.to_path_buf());
        Ok(())
    }
}

struct PretrainedCheck;

impl ConfigValidator for PretrainedCheck {
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// The recognition model used by the `train` command.
pub fn gen_model(vocab: Vocab) -> RecognitionModel {
    RecognitionModel::new(
        DenseNetConfig::new(32, vec![2, 2, 2, 2], 64),
        CrnnConfig {
            lstm_features: 512,
            rnn_units: 128,
        },
        vocab,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_model() {
        let model = gen_model(Vocab::from_tokens(["a", "b", "c"]));
        assert_eq!(model.encoder.block_config, vec![2, 2, 2, 2]);
        assert_eq!(model.head.lstm_features, 512);
        assert_eq!(model.head.rnn_units, 128);
        assert_eq!(model.num_classes, 5);
        assert!(model.pretrained().is_none());
    }

    #[test]
    fn test_densenet_out_features() {
        // Every block adds 64 channels and every transition halves them.
        assert_eq!(DenseNetConfig::new(32, vec![2, 2, 2, 2], 64).out_features(), 128);
        assert_eq!(DenseNetConfig::new(12, vec![1], 10).out_features(), 22);
    }

    #[test]
    fn test_pretrained_must_exist() {
        let mut model = gen_model(Vocab::from_tokens(["a"]));
        let err = model.load_pretrained(Path::new("/nonexistent/model.ckpt")).unwrap_err();
        assert!(matches!(err, OCRError::ConfigError { .. }));

        let file = tempfile::NamedTempFile::new().unwrap();
        model.load_pretrained(file.path()).unwrap();
        assert_eq!(model.pretrained(), Some(file.path()));
    }
}
