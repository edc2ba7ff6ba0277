//! Training configuration loaded from a JSON file.

use super::errors::{ConfigError, ConfigValidator};
use crate::core::errors::OCRError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Flat training configuration.
///
/// Only the keys the data pipeline needs are typed; every other key is kept in
/// [`TrainConfig::extra`] and handed to the trainer untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Vocabulary file, one token per line.
    pub vocab_fp: PathBuf,
    /// Root folder that image paths in the index files are relative to.
    pub img_folder: PathBuf,
    /// Samples per batch.
    pub batch_size: usize,
    /// Loader threads; `0` loads batches on the calling thread.
    pub num_workers: usize,
    /// Accepted for compatibility with GPU loaders; has no effect on CPU arrays.
    pub pin_memory: bool,
    /// Number of passes over the training set.
    #[serde(default = "TrainConfig::default_epochs")]
    pub epochs: usize,
    /// Height every sample is resized to before augmentation.
    #[serde(default = "TrainConfig::default_img_height")]
    pub img_height: usize,
    /// Base seed for shuffling and per-sample augmentation.
    #[serde(default = "TrainConfig::default_seed")]
    pub seed: u64,
    /// Keys not interpreted here.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TrainConfig {
    fn default_epochs() -> usize {
        1
    }

    fn default_img_height() -> usize {
        32
    }

    fn default_seed() -> u64 {
        42
    }

    /// Reads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`OCRError::Io`] if the file cannot be read, [`OCRError::Json`] if
    /// it is not valid JSON or lacks a required key, and
    /// [`OCRError::ConfigError`] if a value is out of range.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OCRError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            extra_keys = config.extra.len(),
            "loaded training config"
        );
        Ok(config)
    }

    /// Parses and validates a configuration from a JSON string.
    pub fn from_json_str(text: &str) -> Result<Self, OCRError> {
        let config: TrainConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}

impl ConfigValidator for TrainConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_batch_size(self.batch_size)?;
        if self.img_height == 0 {
            return Err(ConfigError::InvalidConfig {
                message: "img_height must be greater than 0".to_string(),
            });
        }
        if self.epochs == 0 {
            return Err(ConfigError::InvalidConfig {
                message: "epochs must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_keys_and_defaults() {
        let cfg = TrainConfig::from_json_str(
            r#"{"vocab_fp": "v.txt", "img_folder": "imgs", "batch_size": 4,
                "num_workers": 2, "pin_memory": false, "learning_rate": 0.001}"#,
        )
        .unwrap();
        assert_eq!(cfg.batch_size, 4);
        assert_eq!(cfg.epochs, 1);
        assert_eq!(cfg.img_height, 32);
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.extra["learning_rate"], serde_json::json!(0.001));
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let err = TrainConfig::from_json_str(r#"{"vocab_fp": "v.txt"}"#).unwrap_err();
        assert!(matches!(err, OCRError::Json(_)));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let err = TrainConfig::from_json_str(
            r#"{"vocab_fp": "v", "img_folder": "i", "batch_size": 0,
                "num_workers": 0, "pin_memory": true}"#,
        )
        .unwrap_err();
        assert!(matches!(err, OCRError::ConfigError { .. }));
    }

    #[test]
    fn test_extra_keys_survive_serialization() {
        let cfg = TrainConfig::from_json_str(
            r#"{"vocab_fp": "v", "img_folder": "i", "batch_size": 1,
                "num_workers": 0, "pin_memory": false, "trainer": {"gpus": 1}}"#,
        )
        .unwrap();
        let value = serde_json::to_value(&cfg).unwrap();
        assert_eq!(value["trainer"]["gpus"], 1);
    }
}
