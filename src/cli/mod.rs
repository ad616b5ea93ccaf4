// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All real work is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `eval-one-model`       — mean cost of a single checkpoint
//   2. `eval-multiple-models` — every checkpoint in a directory,
//                               printed as a table (and CSV)
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvalMultipleModelsArgs, EvalOneModelArgs};

use crate::application::{evaluate_use_case::EvaluateUseCase, sweep_use_case::SweepUseCase};
use crate::infra::report;
use crate::ml::model::BurnCostBuilder;

#[derive(Parser, Debug)]
#[command(
    name = "checkpoint-eval",
    version,
    about = "Compute the mean cost of NMT checkpoints on a held-out parallel corpus."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::EvalOneModel(args)       => run_eval_one_model(args),
            Commands::EvalMultipleModels(args) => run_eval_multiple_models(args),
        }
    }
}

fn run_eval_one_model(args: EvalOneModelArgs) -> Result<()> {
    let model    = args.model_files();
    let use_case = EvaluateUseCase::new(args.eval.into(), BurnCostBuilder);

    let mean_cost = use_case.evaluate(&model)?;
    println!("{} {}", model.params.display(), mean_cost);
    Ok(())
}

fn run_eval_multiple_models(args: EvalMultipleModelsArgs) -> Result<()> {
    let sweep     = args.sweep_config();
    let evaluator = EvaluateUseCase::new(args.eval.into(), BurnCostBuilder);

    tracing::info!("Evaluating checkpoints in '{}'", sweep.model_dir.display());
    let records = SweepUseCase::new(sweep, evaluator).execute()?;

    report::write_table(std::io::stdout().lock(), &records)
}
