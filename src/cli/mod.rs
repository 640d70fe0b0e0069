// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with clap and hands a validated
// ModelConfig to Layer 2 (application).
//
// Two commands are supported:
//   1. `train` — trains (or resumes) a run on the PTB corpus
//   2. `eval`  — scores the newest checkpoint on valid / test
//
// Both take the same flags: a run is identified by its
// hyperparameters, so `eval` must be given the ones `train` used.

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::Commands;

use crate::domain::settings::RunMode;

#[derive(Parser, Debug)]
#[command(
    name = "rcmn",
    version,
    about = "Train and evaluate a recurrent convolutional language model on Penn Treebank."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Convert the arguments into a ModelConfig and dispatch.
    /// The CLI layer only routes, it never computes.
    pub fn run(self) -> Result<()> {
        let config = match self.command {
            Commands::Train(args) => args.into_config(RunMode::Train)?,
            Commands::Eval(args) => args.into_config(RunMode::Eval)?,
        };

        tracing::info!("Starting {:?} run on '{}'", config.mode, config.dataset_dir().display());
        crate::application::run(config)
    }
}
