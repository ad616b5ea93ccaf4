// ============================================================
// Layer 4 — Parallel Corpus
// ============================================================
// A lazy, finite, restartable source of batches read from two
// aligned text files (line i of the source file translates to
// line i of the target file).
//
// For every line pair:
//   1. tokenise (words or characters, per ModelOptions)
//   2. encode with the source / target vocabulary
//   3. drop the pair if either side is empty or longer than maxlen
//   4. collect up to `batch_size` surviving pairs → PairBatcher
//
// Reading stops at the end of the shorter file. The final,
// possibly smaller, batch is emitted too. `reset()` reopens both
// files so the same corpus can be iterated again.
//
// Reference: Rust Book §13 (Iterators), §12 (I/O)

use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{BufRead, BufReader, Lines},
    path::{Path, PathBuf},
};

use crate::data::{
    batcher::{PairBatcher, SentencePair},
    preprocessor::Preprocessor,
    vocabulary::Vocabulary,
};
use crate::domain::{batch::Batch, errors::EvalError, options::ModelOptions};

/// Batch size used when none is configured.
pub const DEFAULT_BATCH_SIZE: usize = 128;

type LineReader = Lines<BufReader<File>>;

pub struct ParallelCorpus {
    source_path:  PathBuf,
    target_path:  PathBuf,
    source:       LineReader,
    target:       LineReader,
    source_vocab: Vocabulary,
    target_vocab: Vocabulary,
    preprocessor: Preprocessor,
    batcher:      PairBatcher,
    maxlen:       usize,
    batch_size:   usize,
    /// Pairs dropped by the length filter since the last reset
    skipped:      usize,
    exhausted:    bool,
}

impl ParallelCorpus {
    /// Open both files. Vocabularies are capped at the option's
    /// vocabulary sizes so out-of-range ids become UNK.
    pub fn open(
        source_file:  impl AsRef<Path>,
        target_file:  impl AsRef<Path>,
        vocabularies: (Vocabulary, Vocabulary),
        options:      &ModelOptions,
        batch_size:   usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(EvalError::Config("batch size must be at least 1".into()).into());
        }

        let source_path = source_file.as_ref().to_path_buf();
        let target_path = target_file.as_ref().to_path_buf();
        let (source_vocab, target_vocab) = vocabularies;

        Ok(Self {
            source:       open_lines(&source_path)?,
            target:       open_lines(&target_path)?,
            source_path,
            target_path,
            source_vocab: source_vocab.with_limit(options.n_words_source),
            target_vocab: target_vocab.with_limit(options.n_words_target),
            preprocessor: Preprocessor::new(options.characters),
            batcher:      PairBatcher::new(),
            maxlen:       options.maxlen,
            batch_size,
            skipped:      0,
            exhausted:    false,
        })
    }

    /// Rewind to the first line of both files.
    #[allow(dead_code)] // the evaluator opens a fresh corpus per checkpoint
    pub fn reset(&mut self) -> Result<()> {
        self.source    = open_lines(&self.source_path)?;
        self.target    = open_lines(&self.target_path)?;
        self.skipped   = 0;
        self.exhausted = false;
        Ok(())
    }

    /// Number of pairs the filter dropped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Next pair that survives the filter, or None at end of data.
    fn next_pair(&mut self) -> Result<Option<SentencePair>> {
        loop {
            let (src_line, tgt_line) = match (self.source.next(), self.target.next()) {
                (Some(s), Some(t)) => (
                    s.with_context(|| format!("Failed to read '{}'", self.source_path.display()))?,
                    t.with_context(|| format!("Failed to read '{}'", self.target_path.display()))?,
                ),
                (None, None) => return Ok(None),
                (Some(_), None) | (None, Some(_)) => {
                    tracing::warn!(
                        "'{}' and '{}' have different line counts; ignoring the rest",
                        self.source_path.display(),
                        self.target_path.display()
                    );
                    return Ok(None);
                }
            };

            let src_tokens = self.preprocessor.tokenize(&src_line);
            let tgt_tokens = self.preprocessor.tokenize(&tgt_line);

            if src_tokens.is_empty()
                || tgt_tokens.is_empty()
                || src_tokens.len() > self.maxlen
                || tgt_tokens.len() > self.maxlen
            {
                self.skipped += 1;
                continue;
            }

            return Ok(Some(SentencePair {
                source: self.source_vocab.encode_all(&src_tokens),
                target: self.target_vocab.encode_all(&tgt_tokens),
            }));
        }
    }
}

impl Iterator for ParallelCorpus {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        let mut pairs = Vec::with_capacity(self.batch_size);
        while pairs.len() < self.batch_size {
            match self.next_pair() {
                Ok(Some(pair)) => pairs.push(pair),
                Ok(None) => {
                    self.exhausted = true;
                    break;
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }

        if pairs.is_empty() {
            tracing::debug!("Corpus exhausted ({} pairs filtered out)", self.skipped);
            return None;
        }
        Some(Ok(self.batcher.batch(&pairs)))
    }
}

fn open_lines(path: &Path) -> Result<LineReader> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open corpus file '{}'", path.display()))?;
    Ok(BufReader::new(file).lines())
}
