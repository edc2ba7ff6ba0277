//! Command implementations.

use crnn_ocr::augment::{test_transform, train_transform};
use crnn_ocr::core::TrainConfig;
use crnn_ocr::data::{OcrDataModule, Vocab};
use crnn_ocr::model::{DryRunTrainer, Trainer, gen_model};
use crnn_ocr::predictor::{Context, LineResult, ModelLocator, Recognizer};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use walkdir::WalkDir;

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Builds the data module and model, then fits with the bundled trainer.
pub fn train(
    index_dir: &Path,
    train_config_fp: &Path,
    pretrained_model_fp: Option<&Path>,
) -> CliResult<()> {
    let config = TrainConfig::from_file(train_config_fp)?;
    let vocab = Vocab::from_file(&config.vocab_fp)?;

    // Training images go through the fixed table pipeline, not a lighter
    // invert/rotate/autocontrast chain.
    let data = OcrDataModule::new(
        &config,
        index_dir,
        vocab.clone(),
        train_transform()?,
        test_transform(),
    )?;

    let mut model = gen_model(vocab);
    if let Some(path) = pretrained_model_fp {
        model.load_pretrained(path)?;
    }

    let mut trainer = DryRunTrainer::from_config(&config);
    let report = trainer.fit(&model, &data)?;
    info!(
        "Finished {} epoch(s): {} train batches, {} val batches in {:.2}s",
        report.epochs,
        report.train_batches,
        report.val_batches,
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

pub struct PredictOptions {
    pub model_dir: PathBuf,
    pub model_name: String,
    pub model_epoch: Option<u32>,
    pub context: Context,
    pub single_line: bool,
}

/// Runs recognition on `file`, or on every `*g` entry of it when it is a directory.
pub fn predict(file: &Path, options: &PredictOptions) -> CliResult<()> {
    let locator = ModelLocator::new(&options.model_dir, &options.model_name, options.model_epoch);
    let recognizer = Recognizer::from_locator(&locator, options.context)?;

    for fp in list_inputs(file) {
        let start = Instant::now();
        info!("\n{}{}{}", "=".repeat(10), fp.display(), "=".repeat(10));
        let lines: Vec<LineResult> = if options.single_line {
            vec![recognizer.ocr_for_single_line(&fp)?]
        } else {
            recognizer.ocr(&fp)?
        };
        info!("time cost: {:.6}", start.elapsed().as_secs_f64());
        info!("{:?}", lines);
        for (text, prob) in &lines {
            info!("\npred: {}, with probability {:.6}", text, prob);
        }
    }
    Ok(())
}

/// The file itself, or the sorted non-hidden entries of a directory whose
/// names end in `g` (png, jpg, jpeg, ...).
fn list_inputs(file: &Path) -> Vec<PathBuf> {
    if file.is_file() {
        return vec![file.to_path_buf()];
    }
    if !file.is_dir() {
        tracing::warn!("{} is neither a file nor a directory", file.display());
        return Vec::new();
    }
    WalkDir::new(file)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|name| !name.starts_with('.') && name.ends_with('g'))
        })
        .map(|e| e.into_path())
        .collect()
}
