//! Resolution of a model name (and optional epoch) to files on disk.
//!
//! Layout under the model directory:
//!
//! ```text
//! <dir>/<name>/<name>-epoch=007.onnx
//! <dir>/<name>/<name>.onnx
//! <dir>/<name>/vocab.txt
//! ```

use crate::core::errors::OCRError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Model and vocabulary files of one recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub model: PathBuf,
    pub vocab: PathBuf,
    /// Epoch of the checkpoint, when the file name carries one.
    pub epoch: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ModelLocator {
    root: PathBuf,
    name: String,
    epoch: Option<u32>,
}

impl ModelLocator {
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>, epoch: Option<u32>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
            epoch,
        }
    }

    pub fn model_dir(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    fn epoch_file_name(&self, epoch: u32) -> String {
        format!("{}-epoch={:03}.onnx", self.name, epoch)
    }

    /// Epoch encoded in `file_name`, if it is one of this model's checkpoints.
    fn parse_epoch(&self, file_name: &str) -> Option<u32> {
        file_name
            .strip_prefix(self.name.as_str())?
            .strip_prefix("-epoch=")?
            .strip_suffix(".onnx")?
            .parse()
            .ok()
    }

    /// Picks the model file.
    ///
    /// A requested epoch must exist. Without one, the highest-epoch
    /// checkpoint wins, falling back to `<name>.onnx`.
    ///
    /// # Errors
    ///
    /// Returns [`OCRError::ModelLoad`] when no candidate exists or the
    /// vocabulary file is missing.
    pub fn resolve(&self) -> Result<ModelFiles, OCRError> {
        let dir = self.model_dir();
        let (model, epoch) = match self.epoch {
            Some(epoch) => {
                let path = dir.join(self.epoch_file_name(epoch));
                if !path.is_file() {
                    return Err(OCRError::model_load_error(
                        &path,
                        format!("no checkpoint for epoch {epoch}"),
                        Some("omit --model_epoch to use the latest checkpoint"),
                        None,
                    ));
                }
                (path, Some(epoch))
            }
            None => match self.latest_checkpoint(&dir) {
                Some((path, epoch)) => (path, Some(epoch)),
                None => {
                    let path = dir.join(format!("{}.onnx", self.name));
                    if !path.is_file() {
                        return Err(OCRError::model_load_error(
                            &path,
                            format!("no model files for '{}'", self.name),
                            Some("set --model-dir or CRNN_OCR_MODEL_DIR to the directory holding the model"),
                            None,
                        ));
                    }
                    (path, None)
                }
            },
        };

        let vocab = dir.join("vocab.txt");
        if !vocab.is_file() {
            return Err(OCRError::model_load_error(
                &vocab,
                "vocabulary file not found",
                None,
                None,
            ));
        }
        tracing::debug!("Resolved model {} (epoch {:?})", model.display(), epoch);
        Ok(ModelFiles { model, vocab, epoch })
    }

    fn latest_checkpoint(&self, dir: &Path) -> Option<(PathBuf, u32)> {
        WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let epoch = self.parse_epoch(e.file_name().to_str()?)?;
                Some((e.into_path(), epoch))
            })
            .max_by_key(|(_, epoch)| *epoch)
    }
}
