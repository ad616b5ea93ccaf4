// ============================================================
// Layer 3 — Batch
// ============================================================
// One mini-batch of encoded sentence pairs, padded to the
// longest sentence on each side. Batch-major layout:
//
//   source_ids  [n_samples, source_len]   token ids, 0-padded
//   source_mask [n_samples, source_len]   1.0 = real token
//   target_ids  [n_samples, target_len]
//   target_mask [n_samples, target_len]
//
// Built by data::batcher, consumed once by exactly one worker.

/// A padded batch ready for the cost function.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub n_samples:   usize,
    pub source_len:  usize,
    pub target_len:  usize,
    pub source_ids:  Vec<i64>,
    pub source_mask: Vec<f32>,
    pub target_ids:  Vec<i64>,
    pub target_mask: Vec<f32>,
}

impl Batch {
    /// Number of real (unpadded) target tokens, end-of-sentence included.
    pub fn target_tokens(&self) -> usize {
        self.target_mask.iter().filter(|&&m| m > 0.0).count()
    }
}
