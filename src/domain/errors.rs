// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// The failures a caller may want to tell apart. Everything
// else (plain I/O, CSV writing) travels as anyhow::Error with
// context attached; these variants can be recovered from an
// anyhow::Error with `downcast_ref::<EvalError>()`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    /// Malformed or missing options/vocabularies, ambiguous
    /// model directory contents, bad device lists or patterns.
    #[error("configuration error: {0}")]
    Config(String),

    /// The checkpoint could not be read or lacks the arrays
    /// the cost function needs.
    #[error("cannot load model from '{path}': {reason}")]
    ModelLoad { path: String, reason: String },

    /// Every sentence pair was filtered out, so there is no
    /// cost to average.
    #[error("no batches produced from '{source_file}' / '{target_file}' after filtering")]
    EmptyCorpus {
        source_file: String,
        target_file: String,
    },

    /// A worker died, reported an error, or stopped producing
    /// results within the allowed time.
    #[error("worker '{worker}' failed: {reason}")]
    WorkerFailure { worker: String, reason: String },
}

impl EvalError {
    pub fn model_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModelLoad {
            path:   path.into(),
            reason: reason.into(),
        }
    }

    pub fn worker_failure(worker: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WorkerFailure {
            worker: worker.into(),
            reason: reason.into(),
        }
    }
}
