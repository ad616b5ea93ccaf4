// ============================================================
// Layer 4 — Sentence Pair Batcher
// ============================================================
// Stacks a Vec of encoded sentence pairs into one padded Batch.
//
// For every sentence an end-of-sentence id (0) is appended, so a
// sentence of n tokens occupies n + 1 positions. Each side is
// padded to its longest sentence:
//
//   source "the cat"  → [2, 3, 0]      mask [1, 1, 1]
//   source "a"        → [5, 0, 0]      mask [1, 1, 0]
//
// Padding reuses id 0; the mask is what tells the cost function
// which positions are real.

use crate::data::vocabulary::EOS_ID;
use crate::domain::batch::Batch;

/// One encoded sentence pair, before end-of-sentence and padding.
#[derive(Debug, Clone, PartialEq)]
pub struct SentencePair {
    pub source: Vec<i64>,
    pub target: Vec<i64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PairBatcher;

impl PairBatcher {
    pub fn new() -> Self {
        Self
    }

    /// Convert a non-empty slice of pairs into a single Batch.
    pub fn batch(&self, items: &[SentencePair]) -> Batch {
        let n_samples = items.len();

        let source_len = items.iter().map(|p| p.source.len()).max().unwrap_or(0) + 1;
        let target_len = items.iter().map(|p| p.target.len()).max().unwrap_or(0) + 1;

        let (source_ids, source_mask) = pad(items.iter().map(|p| p.source.as_slice()), source_len);
        let (target_ids, target_mask) = pad(items.iter().map(|p| p.target.as_slice()), target_len);

        Batch {
            n_samples,
            source_len,
            target_len,
            source_ids,
            source_mask,
            target_ids,
            target_mask,
        }
    }
}

/// Flatten sentences row by row into [n, width] ids and mask,
/// appending EOS after each sentence.
fn pad<'a>(rows: impl Iterator<Item = &'a [i64]>, width: usize) -> (Vec<i64>, Vec<f32>) {
    let mut ids  = Vec::new();
    let mut mask = Vec::new();

    for row in rows {
        let real = row.len() + 1;
        ids.extend_from_slice(row);
        ids.push(EOS_ID);
        ids.resize(ids.len() + width - real, EOS_ID);

        mask.resize(mask.len() + real, 1.0);
        mask.resize(mask.len() + width - real, 0.0);
    }

    (ids, mask)
}
