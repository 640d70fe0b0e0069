// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one run. No tensor code and
// no printing of results here: the use cases wire the corpus
// reader, the vocabulary, the checkpoint store and the summary
// writer together and hand them to the ML layer.

/// ModelConfig: every hyperparameter of a run
pub mod config;

/// The training workflow
pub mod train_use_case;

/// Scoring the newest checkpoint on valid / test
pub mod eval_use_case;

use anyhow::Result;

use crate::domain::settings::RunMode;
use config::ModelConfig;
use eval_use_case::EvalUseCase;
use train_use_case::TrainUseCase;

/// Run whatever `config.mode` asks for.
pub fn run(config: ModelConfig) -> Result<()> {
    match config.mode {
        RunMode::Train => TrainUseCase::new(config).execute().map(|_| ()),
        RunMode::Eval => EvalUseCase::new(config).execute().map(|_| ()),
    }
}
