// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration          (Layer 2)
//   Step 2: Load the PTB splits                 (Layer 4 - data)
//   Step 3: Build / load the vocabulary         (Layer 6 - infra)
//   Step 4: Encode the splits to token ids      (Layer 4 - data)
//   Step 5: Save config for eval / resume       (Layer 6 - infra)
//   Step 6: Run the training loop               (Layer 5 - ml)
//
// Checkpoints, the vocabulary and summaries all go under
// directories named by ModelConfig::model_dir(), so running the
// same command again resumes the run instead of starting over.

use anyhow::Result;

use crate::application::config::ModelConfig;
use crate::data::{encoding::encode_corpus, loader::PtbLoader};
use crate::domain::{state::TrainingState, traits::CorpusSource};
use crate::infra::{
    checkpoint::CheckpointManager,
    summary::SummaryWriter,
    vocab_store::VocabStore,
};
use crate::ml::trainer::{run_training, TrainContext};

pub struct TrainUseCase {
    config: ModelConfig,
}

impl TrainUseCase {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Returns the counters reached at the end of training.
    pub fn execute(&self) -> Result<TrainingState> {
        let cfg = &self.config;

        // ── Step 1: Fail fast on a bad configuration ──────────────────────────
        cfg.validate()?;
        tracing::info!("Run directory: {}", cfg.model_dir());

        // ── Step 2: Load the raw splits ───────────────────────────────────────
        let loader = PtbLoader::new(cfg.dataset_dir());
        let raw = loader.load()?;

        // ── Step 3: Vocabulary from the training split ────────────────────────
        let ckpt = CheckpointManager::new(cfg.run_checkpoint_dir())?;
        let vocab = VocabStore::new(ckpt.dir()).load_or_build(&raw.train, cfg.vocab_size)?;

        // ── Step 4: Encode ────────────────────────────────────────────────────
        let corpus = encode_corpus(&raw, &vocab, cfg.vocab_size)?;

        // ── Step 5: Save config ───────────────────────────────────────────────
        ckpt.save_config(cfg)?;

        // ── Step 6: Train (Layer 5) ───────────────────────────────────────────
        let summary = SummaryWriter::new(cfg.run_log_dir())?;
        tracing::info!("Writing summaries to '{}'", summary.csv_path().display());
        let ctx = TrainContext { cfg, corpus: &corpus, ckpt: &ckpt, summary: &summary };
        run_training(&ctx)
    }
}
