//! Greedy CTC decoding of recognition model output.

use crate::data::vocab::{BLANK_CLASS, Vocab};
use ndarray::{ArrayView2, ArrayView3, Axis};

/// Decodes `[N, T, C]` class scores into text by best path.
///
/// Repeated classes collapse and blanks (class 0) are removed. Confidence is
/// the mean probability of the kept steps, or 0 when nothing is kept. Rows
/// that are not already probability distributions are passed through a
/// softmax first.
#[derive(Debug, Clone)]
pub struct CtcGreedyDecoder {
    vocab: Vocab,
}

impl CtcGreedyDecoder {
    pub fn new(vocab: Vocab) -> Self {
        Self { vocab }
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    /// Decodes every sequence of a batch.
    pub fn decode_batch(&self, pred: ArrayView3<'_, f32>) -> Vec<(String, f32)> {
        let results: Vec<(String, f32)> = pred
            .axis_iter(Axis(0))
            .map(|seq| self.decode(seq))
            .collect();
        tracing::debug!(
            "CTC decode summary: batch_size={}, empty={}",
            results.len(),
            results.iter().filter(|(t, _)| t.is_empty()).count()
        );
        results
    }

    /// Decodes one `[T, C]` sequence.
    pub fn decode(&self, seq: ArrayView2<'_, f32>) -> (String, f32) {
        let mut text = String::new();
        let mut probs = Vec::new();
        let mut prev = BLANK_CLASS;
        for row in seq.outer_iter() {
            let Some((class, prob)) = best_class(row.to_vec()) else {
                prev = BLANK_CLASS;
                continue;
            };
            if class != BLANK_CLASS && class != prev {
                if let Some(token) = self.vocab.token(class) {
                    text.push_str(token);
                    probs.push(prob);
                }
            }
            prev = class;
        }
        let conf = if probs.is_empty() {
            0.0
        } else {
            probs.iter().sum::<f32>() / probs.len() as f32
        };
        (text, conf)
    }
}

/// Arg-max class and its probability for one time step.
fn best_class(mut row: Vec<f32>) -> Option<(usize, f32)> {
    if !is_distribution(&row) {
        softmax_in_place(&mut row);
    }
    row.iter()
        .copied()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}

fn is_distribution(row: &[f32]) -> bool {
    row.iter().all(|&v| (0.0..=1.0).contains(&v)) && (row.iter().sum::<f32>() - 1.0).abs() < 1e-3
}

fn softmax_in_place(row: &mut [f32]) {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in row.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum > 0.0 {
        row.iter_mut().for_each(|v| *v /= sum);
    }
}
