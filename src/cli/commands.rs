// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `eval-one-model` and
// `eval-multiple-models`, and their flags.
//
// Input paths are checked here, before any model is loaded:
// files must exist as regular files, MODEL_DIR as a directory.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::{path::PathBuf, time::Duration};

use crate::application::{
    evaluate_use_case::{EvalConfig, ModelFiles},
    sweep_use_case::{SweepConfig, DEFAULT_NAME_FORMAT},
};
use crate::data::corpus::DEFAULT_BATCH_SIZE;
use crate::domain::device::ComputeDevice;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the mean cost of one checkpoint on a parallel corpus
    EvalOneModel(EvalOneModelArgs),

    /// Evaluate every checkpoint in a directory, oldest first
    EvalMultipleModels(EvalMultipleModelsArgs),
}

/// Corpus, vocabularies and worker settings shared by both commands.
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Source vocabulary (JSON word → id)
    #[arg(value_parser = existing_file)]
    pub src_dict: PathBuf,

    /// Target vocabulary (JSON word → id)
    #[arg(value_parser = existing_file)]
    pub tgt_dict: PathBuf,

    /// Source side of the held-out corpus, one sentence per line
    #[arg(value_parser = existing_file)]
    pub source_file: PathBuf,

    /// Target side, line-aligned with the source file
    #[arg(value_parser = existing_file)]
    pub target_file: PathBuf,

    /// One worker per entry: cpu, gpu, gpu1, cuda:0 ...
    #[arg(long, value_delimiter = ',', default_values_t = vec![ComputeDevice::Cpu; 4])]
    pub devices: Vec<ComputeDevice>,

    /// Sentence pairs per batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Give up if no worker reports a result for this long
    #[arg(long, default_value_t = 600)]
    pub result_timeout_secs: u64,
}

impl From<EvalArgs> for EvalConfig {
    fn from(a: EvalArgs) -> Self {
        EvalConfig {
            source_vocab:   a.src_dict,
            target_vocab:   a.tgt_dict,
            source_file:    a.source_file,
            target_file:    a.target_file,
            devices:        a.devices,
            batch_size:     a.batch_size,
            result_timeout: Duration::from_secs(a.result_timeout_secs),
        }
    }
}

#[derive(Args, Debug)]
pub struct EvalOneModelArgs {
    /// Model options file (JSON)
    #[arg(value_parser = existing_file)]
    pub options: PathBuf,

    /// Checkpoint parameters (.npz)
    #[arg(value_parser = existing_file)]
    pub checkpoint: PathBuf,

    #[command(flatten)]
    pub eval: EvalArgs,
}

impl EvalOneModelArgs {
    pub fn model_files(&self) -> ModelFiles {
        ModelFiles {
            options: self.options.clone(),
            params:  self.checkpoint.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct EvalMultipleModelsArgs {
    /// Directory holding the .npz checkpoints and one options .json
    #[arg(value_parser = existing_dir)]
    pub model_dir: PathBuf,

    #[command(flatten)]
    pub eval: EvalArgs,

    /// Also write the results as CSV to this file
    #[arg(long)]
    pub out_file: Option<PathBuf>,

    /// Regex whose first two groups capture epoch and update
    #[arg(long, default_value = DEFAULT_NAME_FORMAT)]
    pub name_format: String,
}

impl EvalMultipleModelsArgs {
    pub fn sweep_config(&self) -> SweepConfig {
        SweepConfig {
            model_dir:   self.model_dir.clone(),
            out_file:    self.out_file.clone(),
            name_format: self.name_format.clone(),
        }
    }
}

// ─── Path validators ──────────────────────────────────────────────────────────
fn existing_file(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("'{s}' is not an existing file"))
    }
}

fn existing_dir(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("'{s}' is not an existing directory"))
    }
}
