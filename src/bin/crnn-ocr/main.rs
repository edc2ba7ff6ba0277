//! crnn-ocr command line
//!
//! Trains a CRNN recognizer from TSV index files or runs an exported model on
//! images.
//!
//! # Usage
//!
//! ```bash
//! crnn-ocr train --index-dir data/ --train-config-fp train_config.json
//! crnn-ocr predict --model_name densenet-s-lstm -f scans/
//! crnn-ocr predict -f line.png -s --model-dir ~/models
//! ```

mod cli;

use clap::{Parser, Subcommand, ValueEnum};
use crnn_ocr::predictor::Context;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "crnn-ocr")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train and run CRNN text-line recognizers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model on the train.tsv / dev.tsv indexes of a directory
    Train {
        /// Directory holding train.tsv and dev.tsv
        #[arg(long = "index-dir")]
        index_dir: PathBuf,

        /// JSON training configuration
        #[arg(long = "train-config-fp")]
        train_config_fp: PathBuf,

        /// Parameters to initialize the model from
        #[arg(short = 'm', long = "pretrained-model-fp")]
        pretrained_model_fp: Option<PathBuf>,
    },
    /// Recognize text in an image or every image of a directory
    Predict {
        /// Model name
        #[arg(long = "model_name", default_value = "densenet-s-lstm")]
        model_name: String,

        /// Checkpoint epoch; the latest one when omitted
        #[arg(long = "model_epoch")]
        model_epoch: Option<u32>,

        /// Run on cpu or gpu
        #[arg(long, value_enum, default_value_t = DeviceArg::Cpu)]
        context: DeviceArg,

        /// Image file or directory
        #[arg(short = 'f', long = "file")]
        file: PathBuf,

        /// The image holds a single text line
        #[arg(short = 's', long = "single-line")]
        single_line: bool,

        /// Directory holding <model_name>/ subdirectories
        #[arg(long = "model-dir", default_value = "models", env = "CRNN_OCR_MODEL_DIR")]
        model_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DeviceArg {
    Cpu,
    Gpu,
}

impl From<DeviceArg> for Context {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Cpu => Context::Cpu,
            DeviceArg::Gpu => Context::Gpu,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    crnn_ocr::utils::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            index_dir,
            train_config_fp,
            pretrained_model_fp,
        } => {
            info!("Training from index dir {}", index_dir.display());
            cli::train(&index_dir, &train_config_fp, pretrained_model_fp.as_deref())?;
        }
        Commands::Predict {
            model_name,
            model_epoch,
            context,
            file,
            single_line,
            model_dir,
        } => {
            let options = cli::PredictOptions {
                model_dir,
                model_name,
                model_epoch,
                context: context.into(),
                single_line,
            };
            cli::predict(&file, &options)?;
        }
    }

    Ok(())
}
