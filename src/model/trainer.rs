//! Training entry point.

use super::RecognitionModel;
use crate::core::config::TrainConfig;
use crate::core::errors::OCRError;
use crate::data::{OcrDataModule, Split};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Fits a recognition model on a data module.
pub trait Trainer {
    fn fit(
        &mut self,
        model: &RecognitionModel,
        data: &OcrDataModule,
    ) -> Result<TrainReport, OCRError>;
}

/// What a fit run consumed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainReport {
    pub epochs: usize,
    pub train_batches: usize,
    pub train_samples: usize,
    pub val_batches: usize,
    pub val_samples: usize,
    /// Widest padded batch seen.
    pub max_batch_width: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Streams every epoch through the data pipeline without updating weights.
///
/// Each batch is checked against the model's class count, so a dry run
/// catches vocabulary and image problems before a real backend is started.
#[derive(Debug, Clone)]
pub struct DryRunTrainer {
    epochs: usize,
    backend_options: BTreeMap<String, serde_json::Value>,
}

impl DryRunTrainer {
    pub fn new(epochs: usize) -> Self {
        Self {
            epochs,
            backend_options: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &TrainConfig) -> Self {
        Self {
            epochs: config.epochs,
            backend_options: config.extra.clone(),
        }
    }

    /// Keys of the configuration this trainer does not interpret.
    pub fn backend_options(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.backend_options
    }
}

impl Trainer for DryRunTrainer {
    fn fit(
        &mut self,
        model: &RecognitionModel,
        data: &OcrDataModule,
    ) -> Result<TrainReport, OCRError> {
        let start = Instant::now();
        if !self.backend_options.is_empty() {
            tracing::info!(
                "Ignoring backend options: {}",
                self.backend_options.keys().cloned().collect::<Vec<_>>().join(", ")
            );
        }
        tracing::info!(
            "Dry run: {} epoch(s), {} classes, pretrained: {}",
            self.epochs,
            model.num_classes,
            model
                .pretrained()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "none".to_string())
        );

        let mut report = TrainReport {
            epochs: self.epochs,
            ..TrainReport::default()
        };
        for epoch in 0..self.epochs {
            let mut epoch_samples = 0;
            for batch in data.train_batches(epoch as u64) {
                let batch = batch?;
                check_targets(&batch.targets, model.num_classes)?;
                report.train_batches += 1;
                epoch_samples += batch.len();
                report.max_batch_width = report.max_batch_width.max(batch.images.dim().3);
            }
            report.train_samples += epoch_samples;

            for batch in data.val_batches() {
                let batch = batch?;
                check_targets(&batch.targets, model.num_classes)?;
                report.val_batches += 1;
                report.val_samples += batch.len();
            }
            tracing::info!(
                "epoch {}/{}: {} train samples in {} batches, {} val batches",
                epoch + 1,
                self.epochs,
                epoch_samples,
                data.num_batches(Split::Train),
                data.num_batches(Split::Val)
            );
        }
        report.elapsed = start.elapsed();
        Ok(report)
    }
}

fn check_targets(targets: &[usize], num_classes: usize) -> Result<(), OCRError> {
    match targets.iter().find(|&&t| t == 0 || t >= num_classes) {
        Some(bad) => Err(OCRError::InvalidInput {
            message: format!("target class {bad} outside 1..{num_classes}"),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::augment::test_transform;
    use crate::data::{OcrDataset, Sample, Vocab};
    use crate::model::gen_model;
    use image::{GrayImage, Luma};
    use std::path::PathBuf;

    #[test]
    fn test_dry_run_counts_batches() {
        let dir = tempfile::tempdir().unwrap();
        let mut samples = Vec::new();
        for i in 0..3 {
            let name = format!("{i}.png");
            GrayImage::from_pixel(12, 8, Luma([200])).save(dir.path().join(&name)).unwrap();
            samples.push(Sample {
                image_path: PathBuf::from(name),
                tokens: vec!["x".into(), "y".into()],
            });
        }
        let config = TrainConfig::from_json_str(&format!(
            r#"{{"vocab_fp": "v.txt", "img_folder": {:?}, "batch_size": 2, "num_workers": 0,
                 "pin_memory": false, "epochs": 2, "img_height": 8, "lr": 0.001}}"#,
            dir.path().display().to_string()
        ))
        .unwrap();
        let dataset = OcrDataset::new(samples, dir.path(), 8);
        let vocab = Vocab::from_tokens(["x", "y"]);
        let data = OcrDataModule::from_datasets(
            &config,
            vocab.clone(),
            dataset.clone(),
            dataset,
            test_transform(),
            test_transform(),
        )
        .unwrap();
        let model = gen_model(vocab);

        let mut trainer = DryRunTrainer::from_config(&config);
        assert!(trainer.backend_options().contains_key("lr"));
        let report = trainer.fit(&model, &data).unwrap();
        assert_eq!(report.epochs, 2);
        assert_eq!(report.train_batches, 4);
        assert_eq!(report.train_samples, 6);
        assert_eq!(report.val_samples, 6);
        assert_eq!(report.max_batch_width, 12);
    }

    #[test]
    fn test_check_targets() {
        assert!(check_targets(&[1, 2, 3], 4).is_ok());
        assert!(check_targets(&[0], 4).is_err());
        assert!(check_targets(&[4], 4).is_err());
    }
}
