// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Turns two aligned plain-text files into padded batches.
//
//   source.txt / target.txt   (one sentence per line)
//       │
//       ▼
//   Preprocessor      → splits a line into word or character tokens
//       │
//       ▼
//   Vocabulary        → maps tokens to ids (unknown / rare → UNK)
//       │
//       ▼
//   ParallelCorpus    → drops overlong pairs, groups pairs into batches
//       │
//       ▼
//   PairBatcher       → appends end-of-sentence, pads, builds masks
//       │
//       ▼
//   Batch             → handed to the task queue
//
// Reference: Rust Book §13 (Iterators and Closures)

/// Token → id mappings loaded from JSON
pub mod vocabulary;

/// Word / character tokenisation of a corpus line
pub mod preprocessor;

/// Pads encoded sentence pairs into a Batch
pub mod batcher;

/// Lazy, restartable batch source over two aligned text files
pub mod corpus;
