// ============================================================
// Layer 3 — Model Options
// ============================================================
// The hyperparameters a model was trained with, saved next to
// the checkpoints as a JSON document.
//
// Only four keys matter to the evaluator itself:
//   maxlen          — longest sentence (in tokens) kept from the corpus
//   n_words_source  — source vocabulary size (ids above are mapped to UNK)
//   n_words_target  — target vocabulary size
//   characters      — tokenise per character instead of per word
//
// Everything else (dim_word, optimizer, ...) is kept verbatim in
// `extra` so the cost-function builder can read it if it wants.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::errors::EvalError;

/// Hyperparameters loaded from the model's options file.
/// Immutable once loaded and shared read-only with every worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    pub maxlen: usize,

    #[serde(alias = "n_words_src")]
    pub n_words_source: usize,

    #[serde(alias = "n_words")]
    pub n_words_target: usize,

    pub characters: bool,

    /// Every other key in the options document
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelOptions {
    /// Parse options from a JSON string.
    /// Malformed JSON or a missing required key is a config error.
    pub fn from_json(json: &str) -> Result<Self, EvalError> {
        serde_json::from_str(json)
            .map_err(|e| EvalError::Config(format!("invalid model options: {e}")))
    }

    /// Look up an optional integer hyperparameter, e.g. `dim_word`.
    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.extra
            .get(key)
            .and_then(Value::as_u64)
            .map(|v| v as usize)
    }
}
