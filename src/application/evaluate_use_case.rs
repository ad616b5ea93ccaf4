// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Computes the mean cost of one checkpoint over a held-out
// parallel corpus:
//
//   Step 1: Load model options            (Layer 6 - infra)
//   Step 2: Load both vocabularies        (Layer 4 - data)
//   Step 3: Load the parameter set and check it against the
//           cost function's needs       (Layer 6 - infra)
//   Step 4: Spawn one worker per device   (Layer 6 - infra)
//   Step 5: Open the corpus batch source  (Layer 4 - data)
//   Step 6: Feed every batch to the pool, then one stop per worker
//   Step 7: Drain exactly as many costs as batches were sent
//   Step 8: Average them
//
// The worker pool lives only inside `evaluate`; whichever way the
// function returns, dropping the pool stops and joins the workers.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::{path::PathBuf, sync::Arc, time::Duration};

use crate::data::{corpus::ParallelCorpus, vocabulary::Vocabulary};
use crate::domain::{
    batch::Batch,
    device::ComputeDevice,
    errors::EvalError,
    traits::CostFunctionBuilder,
};
use crate::infra::{
    checkpoint::{load_options, load_params},
    worker_pool::WorkerPool,
};

// ─── Configuration ───────────────────────────────────────────────────────────
/// The two files that make up one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFiles {
    pub options: PathBuf,
    pub params:  PathBuf,
}

/// Everything that stays the same across checkpoints: the held-out
/// corpus, its vocabularies and how the worker pool is set up.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub source_vocab:   PathBuf,
    pub target_vocab:   PathBuf,
    pub source_file:    PathBuf,
    pub target_file:    PathBuf,
    pub devices:        Vec<ComputeDevice>,
    pub batch_size:     usize,
    /// Longest wait for any single result before the pool is
    /// declared stuck
    pub result_timeout: Duration,
}

// ─── EvaluateUseCase ─────────────────────────────────────────────────────────
pub struct EvaluateUseCase<F> {
    config:  EvalConfig,
    builder: Arc<F>,
}

impl<F: CostFunctionBuilder> EvaluateUseCase<F> {
    pub fn new(config: EvalConfig, builder: F) -> Self {
        Self {
            config,
            builder: Arc::new(builder),
        }
    }

    /// Evaluate one checkpoint and return its mean batch cost.
    pub fn evaluate(&self, model: &ModelFiles) -> Result<f64> {
        let cfg = &self.config;

        // ── Steps 1-3: options, vocabularies, parameters ─────────────────────
        tracing::info!("Loading model options from '{}'", model.options.display());
        let options = Arc::new(load_options(&model.options)?);

        tracing::info!(
            "Loading dictionaries from '{}', '{}'",
            cfg.source_vocab.display(),
            cfg.target_vocab.display()
        );
        let vocabularies = (
            Vocabulary::load(&cfg.source_vocab)?,
            Vocabulary::load(&cfg.target_vocab)?,
        );

        tracing::info!("Loading parameters from '{}'", model.params.display());
        let params = Arc::new(load_params(&model.params)?);
        self.builder.validate(&params, &options)?;

        // ── Step 4: worker pool, scoped to this call ─────────────────────────
        let mut pool = WorkerPool::spawn(
            &cfg.devices,
            params,
            Arc::clone(&options),
            Arc::clone(&self.builder),
        )?;

        // ── Steps 5-6: stream the corpus into the task queue ─────────────────
        let mut corpus = ParallelCorpus::open(
            &cfg.source_file,
            &cfg.target_file,
            vocabularies,
            &options,
            cfg.batch_size,
        )?;
        let num_batches = feed(&mut pool, &mut corpus)?;
        if corpus.skipped() > 0 {
            tracing::info!(
                "Skipped {} sentence pairs (empty or longer than maxlen={})",
                corpus.skipped(),
                options.maxlen
            );
        }

        if num_batches == 0 {
            return Err(EvalError::EmptyCorpus {
                source_file: cfg.source_file.display().to_string(),
                target_file: cfg.target_file.display().to_string(),
            }
            .into());
        }

        // ── Steps 7-8: collect and average ───────────────────────────────────
        let label = model.params.display().to_string();
        let costs = drain(&mut pool, num_batches, &label, cfg.result_timeout)?;
        let mean_cost = mean(&costs);

        tracing::info!("{} {}", label, mean_cost);
        Ok(mean_cost)
    }
}

/// Push every batch onto the task queue, then one stop sentinel per
/// worker. Returns the number of batches sent.
pub fn feed(pool: &mut WorkerPool, batches: impl IntoIterator<Item = Result<Batch>>) -> Result<usize> {
    let mut num_batches = 0usize;
    let mut num_tokens  = 0usize;
    for batch in batches {
        let batch = batch?;
        num_tokens += batch.target_tokens();
        pool.submit(batch)?;
        num_batches += 1;
    }
    pool.finish_submitting()?;

    tracing::debug!(
        "Queued {} batches ({} target tokens) for {} workers",
        num_batches,
        num_tokens,
        pool.size()
    );
    Ok(num_batches)
}

/// Pop exactly `num_batches` costs in arrival order, updating the
/// progress line after each one.
pub fn drain(
    pool:        &mut WorkerPool,
    num_batches: usize,
    label:       &str,
    timeout:     Duration,
) -> Result<Vec<f64>> {
    let progress = progress_bar(num_batches, label)?;
    let mut costs = Vec::with_capacity(num_batches);

    for processed in 1..=num_batches {
        costs.push(pool.next_cost(timeout)?);

        let percentage = processed as f64 / num_batches as f64 * 100.0;
        progress.set_message(format!("{percentage:.2}% of input processed"));
        progress.inc(1);
    }

    progress.finish();
    Ok(costs)
}

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(costs: &[f64]) -> f64 {
    costs.iter().sum::<f64>() / costs.len() as f64
}

fn progress_bar(total: usize, label: &str) -> Result<ProgressBar> {
    let progress = ProgressBar::new(total as u64);
    progress.set_style(ProgressStyle::with_template("{prefix}: {msg}")?);
    progress.set_prefix(label.to_string());
    Ok(progress)
}
