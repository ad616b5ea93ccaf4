// ============================================================
// Layer 2 — SweepUseCase
// ============================================================
// Evaluates every checkpoint of a training run:
//
//   Step 1: Find the checkpoints and the one options file  (infra)
//   Step 2: For each checkpoint, parse (epoch, update) from its
//           file name; skip it with a warning if that fails
//   Step 3: Evaluate it with EvaluateUseCase
//   Step 4: Sort the records by modification time (stable)
//   Step 5: Write the CSV report if one was requested     (infra)
//
// Any evaluation error aborts the whole sweep.

use anyhow::{Context, Result};
use regex::Regex;
use std::{fs, path::{Path, PathBuf}};

use crate::application::evaluate_use_case::{EvaluateUseCase, ModelFiles};
use crate::domain::{errors::EvalError, record::CheckpointRecord, traits::CostFunctionBuilder};
use crate::infra::{checkpoint::ModelDirectory, report};

/// Default checkpoint name pattern: (epoch, update).
pub const DEFAULT_NAME_FORMAT: &str = r"epoch_(.+?)_update_(.+?)\.npz";

#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub model_dir:   PathBuf,
    pub out_file:    Option<PathBuf>,
    /// Regex whose first two capture groups are epoch and update
    pub name_format: String,
}

pub struct SweepUseCase<F> {
    config:    SweepConfig,
    evaluator: EvaluateUseCase<F>,
}

impl<F: CostFunctionBuilder> SweepUseCase<F> {
    pub fn new(config: SweepConfig, evaluator: EvaluateUseCase<F>) -> Self {
        Self { config, evaluator }
    }

    /// Evaluate all matching checkpoints; records come back sorted
    /// by modification time, oldest first.
    pub fn execute(&self) -> Result<Vec<CheckpointRecord>> {
        let pattern = compile_name_format(&self.config.name_format)?;
        let dir     = ModelDirectory::scan(&self.config.model_dir)?;
        let total   = dir.checkpoints.len();

        let mut records = Vec::with_capacity(total);
        for (i, checkpoint) in dir.checkpoints.iter().enumerate() {
            let Some((epoch, update)) = parse_checkpoint_name(&pattern, checkpoint) else {
                tracing::warn!("'{}' did not match name format", checkpoint.display());
                continue;
            };

            let modified = fs::metadata(checkpoint)
                .and_then(|m| m.modified())
                .with_context(|| format!("Cannot read modification time of '{}'", checkpoint.display()))?;

            let cost = self.evaluator.evaluate(&ModelFiles {
                options: dir.options_file.clone(),
                params:  checkpoint.clone(),
            })?;

            records.push(CheckpointRecord {
                modified,
                epoch,
                update,
                cost,
                model: checkpoint.clone(),
            });
            tracing::info!("{}/{} processed", i + 1, total);
        }

        // sort_by is stable: equal times keep listing order
        records.sort_by(|a, b| a.modified.cmp(&b.modified));

        if let Some(out_file) = &self.config.out_file {
            report::write_csv(out_file, &records)?;
        }
        Ok(records)
    }
}

/// Compile the name pattern; it must have at least two capture groups.
pub fn compile_name_format(name_format: &str) -> Result<Regex> {
    let pattern = Regex::new(name_format)
        .map_err(|e| EvalError::Config(format!("invalid name format: {e}")))?;

    // captures_len counts the implicit whole-match group
    if pattern.captures_len() < 3 {
        return Err(EvalError::Config(format!(
            "name format '{name_format}' needs two capture groups (epoch, update)"
        ))
        .into());
    }
    Ok(pattern)
}

/// Search the file name for the pattern and read (epoch, update)
/// from the first two groups. None if there is no match or either
/// group is not an unsigned integer.
pub fn parse_checkpoint_name(pattern: &Regex, path: &Path) -> Option<(u64, u64)> {
    let name = path.file_name()?.to_str()?;
    let caps = pattern.captures(name)?;
    let epoch  = caps.get(1)?.as_str().parse().ok()?;
    let update = caps.get(2)?.as_str().parse().ok()?;
    Some((epoch, update))
}
