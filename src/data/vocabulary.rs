// ============================================================
// Layer 4 — Vocabulary
// ============================================================
// A token → id dictionary saved as a JSON object during
// preprocessing, e.g. {"eos": 0, "UNK": 1, "the": 2, ...}.
//
// Two ids are reserved:
//   0 — end of sentence (also used as padding, masked out)
//   1 — unknown word
//
// When the model was trained with a capped vocabulary
// (n_words_source / n_words_target), every id at or above the
// cap is mapped to UNK as well, so the embedding lookup never
// goes out of range.

use anyhow::Result;
use std::{collections::HashMap, fs, path::Path};

use crate::domain::errors::EvalError;

pub const EOS_ID: i64 = 0;
pub const UNK_ID: i64 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    ids:   HashMap<String, i64>,
    /// Ids >= limit become UNK; 0 means no cap
    limit: usize,
}

impl Vocabulary {
    /// Parse a vocabulary from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, EvalError> {
        let ids: HashMap<String, i64> = serde_json::from_str(json)
            .map_err(|e| EvalError::Config(format!("invalid vocabulary: {e}")))?;
        Ok(Self { ids, limit: 0 })
    }

    /// Read and parse a vocabulary file.
    /// Both an unreadable file and malformed JSON are config errors.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            EvalError::Config(format!("cannot read vocabulary '{}': {e}", path.display()))
        })?;

        let vocab = Self::from_json(&json).map_err(|e| {
            EvalError::Config(format!("{} ('{}')", e, path.display()))
        })?;

        if vocab.is_empty() {
            return Err(EvalError::Config(format!("vocabulary '{}' is empty", path.display())).into());
        }

        tracing::debug!("Loaded vocabulary '{}' ({} entries)", path.display(), vocab.len());
        Ok(vocab)
    }

    /// Cap the usable ids at `n_words`; 0 leaves the vocabulary uncapped.
    pub fn with_limit(mut self, n_words: usize) -> Self {
        self.limit = n_words;
        self
    }

    /// Id for one token, falling back to UNK.
    pub fn encode(&self, token: &str) -> i64 {
        match self.ids.get(token) {
            Some(&id) if self.limit == 0 || id < self.limit as i64 => id,
            _ => UNK_ID,
        }
    }

    pub fn encode_all<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<i64> {
        tokens.iter().map(|t| self.encode(t.as_ref())).collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
