//! Vocabulary, dataset index and batch loading for recognition training.

pub mod dataset;
pub mod loader;
pub mod vocab;

pub use dataset::{OcrDataset, Sample, parse_index};
pub use loader::{Batch, Batches, OcrDataModule, Split};
pub use vocab::Vocab;
