//! Batching for training and validation.
//!
//! Samples are loaded, augmented and collated into zero-padded batches. Each
//! sample draws from its own generator seeded by `seed + (epoch << 32) + index`,
//! so a batch is the same whether it was built on one thread or many.

use super::dataset::OcrDataset;
use super::vocab::Vocab;
use crate::augment::{ChannelFirst, Compose};
use crate::core::config::{ConfigValidator, TrainConfig, WorkerPolicy};
use crate::core::errors::{OCRError, ProcessingStage};
use crate::processors::types::ChannelOrder;
use ndarray::{Array3, Array4, s};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;

/// Which split a batch stream draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Val,
}

/// Collated samples.
#[derive(Debug, Clone)]
pub struct Batch {
    /// `[B, C, H, W_max]`, right-padded with zeros.
    pub images: Array4<f32>,
    /// Width of each image before padding.
    pub widths: Vec<usize>,
    /// Concatenated target classes of all samples.
    pub targets: Vec<usize>,
    /// Number of target classes per sample.
    pub target_lengths: Vec<usize>,
}

impl Batch {
    /// Stacks CHW images and their targets.
    ///
    /// # Errors
    ///
    /// Fails on an empty batch or when heights or channel counts differ.
    pub fn collate(samples: Vec<(Array3<f32>, Vec<usize>)>) -> Result<Self, OCRError> {
        let Some((first, _)) = samples.first() else {
            return Err(OCRError::InvalidInput {
                message: "cannot collate an empty batch".to_string(),
            });
        };
        let (height, _, channels) = ChannelOrder::CHW.dims(first.shape());
        let mut max_width = 0;
        for (image, _) in &samples {
            let (h, w, c) = ChannelOrder::CHW.dims(image.shape());
            if (h, c) != (height, channels) {
                return Err(OCRError::InvalidInput {
                    message: format!(
                        "batch images must share height and channels: expected ({height}, {channels}), got ({h}, {c})"
                    ),
                });
            }
            max_width = max_width.max(w);
        }

        let mut images = Array4::zeros((samples.len(), channels, height, max_width));
        let mut widths = Vec::with_capacity(samples.len());
        let mut targets = Vec::new();
        let mut target_lengths = Vec::with_capacity(samples.len());
        for (i, (image, target)) in samples.into_iter().enumerate() {
            let w = image.shape()[2];
            images.slice_mut(s![i, .., .., ..w]).assign(&image);
            widths.push(w);
            target_lengths.push(target.len());
            targets.extend(target);
        }
        Ok(Self {
            images,
            widths,
            targets,
            target_lengths,
        })
    }

    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }
}

/// Train and validation streams over one vocabulary.
#[derive(Debug)]
pub struct OcrDataModule {
    vocab: Arc<Vocab>,
    train: OcrDataset,
    val: OcrDataset,
    train_transform: ChannelFirst<Compose>,
    val_transform: ChannelFirst<Compose>,
    batch_size: usize,
    seed: u64,
    pin_memory: bool,
    pool: Option<rayon::ThreadPool>,
}

impl OcrDataModule {
    /// Builds the module from `index_dir/train.tsv` and `index_dir/dev.tsv`.
    pub fn new(
        config: &TrainConfig,
        index_dir: &Path,
        vocab: Vocab,
        train_transform: ChannelFirst<Compose>,
        val_transform: ChannelFirst<Compose>,
    ) -> Result<Self, OCRError> {
        let train = OcrDataset::from_index_file(
            &index_dir.join("train.tsv"),
            &config.img_folder,
            config.img_height,
        )?;
        let val = OcrDataset::from_index_file(
            &index_dir.join("dev.tsv"),
            &config.img_folder,
            config.img_height,
        )?;
        Self::from_datasets(config, vocab, train, val, train_transform, val_transform)
    }

    /// Builds the module from already loaded datasets.
    pub fn from_datasets(
        config: &TrainConfig,
        vocab: Vocab,
        train: OcrDataset,
        val: OcrDataset,
        train_transform: ChannelFirst<Compose>,
        val_transform: ChannelFirst<Compose>,
    ) -> Result<Self, OCRError> {
        config.validate()?;
        let policy = WorkerPolicy::new(config.num_workers);
        let pool = policy
            .build_pool()
            .map_err(|e| {
                OCRError::processing(ProcessingStage::BatchProcessing, "building loader pool", e)
            })?;
        if config.pin_memory {
            tracing::debug!("pin_memory has no effect on host arrays");
        }
        tracing::info!(
            "Data module: {} train / {} val samples, batch size {}, {} worker(s)",
            train.len(),
            val.len(),
            config.batch_size,
            config.num_workers
        );
        Ok(Self {
            vocab: Arc::new(vocab),
            train,
            val,
            train_transform,
            val_transform,
            batch_size: config.batch_size,
            seed: config.seed,
            pin_memory: config.pin_memory,
            pool,
        })
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn pin_memory(&self) -> bool {
        self.pin_memory
    }

    pub fn dataset(&self, split: Split) -> &OcrDataset {
        match split {
            Split::Train => &self.train,
            Split::Val => &self.val,
        }
    }

    /// Number of batches per pass over `split`, the last one possibly short.
    pub fn num_batches(&self, split: Split) -> usize {
        self.dataset(split).len().div_ceil(self.batch_size)
    }

    /// Shuffled training batches for `epoch`.
    pub fn train_batches(&self, epoch: u64) -> Batches<'_> {
        let mut order: Vec<usize> = (0..self.train.len()).collect();
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(epoch));
        order.shuffle(&mut rng);
        Batches {
            module: self,
            split: Split::Train,
            epoch,
            order,
            pos: 0,
        }
    }

    /// Validation batches in index order.
    pub fn val_batches(&self) -> Batches<'_> {
        Batches {
            module: self,
            split: Split::Val,
            epoch: 0,
            order: (0..self.val.len()).collect(),
            pos: 0,
        }
    }

    fn sample_seed(&self, epoch: u64, index: usize) -> u64 {
        self.seed
            .wrapping_add(epoch << 32)
            .wrapping_add(index as u64)
    }

    fn load_sample(
        &self,
        split: Split,
        epoch: u64,
        index: usize,
    ) -> Result<(Array3<f32>, Vec<usize>), OCRError> {
        let dataset = self.dataset(split);
        let transform = match split {
            Split::Train => &self.train_transform,
            Split::Val => &self.val_transform,
        };
        let image = dataset.load_image(index)?;
        let image = transform.apply_seeded(image, self.sample_seed(epoch, index))?;
        let target = self.vocab.encode(&dataset.samples()[index].tokens);
        Ok((image, target))
    }

    fn load_batch(&self, split: Split, epoch: u64, indices: &[usize]) -> Result<Batch, OCRError> {
        let samples = match &self.pool {
            Some(pool) => pool.install(|| {
                indices
                    .par_iter()
                    .map(|&i| self.load_sample(split, epoch, i))
                    .collect::<Result<Vec<_>, _>>()
            })?,
            None => indices
                .iter()
                .map(|&i| self.load_sample(split, epoch, i))
                .collect::<Result<Vec<_>, _>>()?,
        };
        Batch::collate(samples)
    }
}

/// Lazily loaded batches of one pass.
#[derive(Debug)]
pub struct Batches<'a> {
    module: &'a OcrDataModule,
    split: Split,
    epoch: u64,
    order: Vec<usize>,
    pos: usize,
}

impl Iterator for Batches<'_> {
    type Item = Result<Batch, OCRError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.order.len() {
            return None;
        }
        let end = (self.pos + self.module.batch_size).min(self.order.len());
        let indices = &self.order[self.pos..end];
        self.pos = end;
        Some(self.module.load_batch(self.split, self.epoch, indices))
    }
}
