// ============================================================
// Layer 2 — EvalUseCase
// ============================================================
// Scores the newest checkpoint of a run on the validation and
// test splits. Nothing is trained and nothing is written:
// the vocabulary and a checkpoint must already exist.
//
// The command line only locates the run. The architecture comes
// from the train_config.json stored in it, so the model is rebuilt
// exactly as it was trained.

use anyhow::{Context, Result};

use crate::application::config::ModelConfig;
use crate::data::{encoding::encode_corpus, loader::PtbLoader};
use crate::domain::{corpus::Split, traits::CorpusSource};
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabStore};
use crate::ml::evaluator::{run_evaluation, EvalReport};

pub struct EvalUseCase {
    config: ModelConfig,
}

impl EvalUseCase {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<Vec<(Split, EvalReport)>> {
        self.config.validate()?;

        let ckpt = CheckpointManager::new(self.config.run_checkpoint_dir())?;
        let stored = ckpt.load_config()?;
        let cfg = &eval_config(stored, &self.config);
        cfg.validate()?;
        let vocab = VocabStore::new(ckpt.dir())
            .load()
            .context("eval needs the vocabulary of a trained run")?;

        let raw = PtbLoader::new(cfg.dataset_dir()).load()?;
        let corpus = encode_corpus(&raw, &vocab, cfg.vocab_size)?;

        let reports = run_evaluation(cfg, &corpus, &ckpt)?;
        for (split, report) in &reports {
            println!("{} Perplexity: {:.3}", capitalize(split.name()), report.perplexity);
        }
        Ok(reports)
    }
}

/// The trained run's configuration, with the paths, batch size
/// and mode of this invocation.
fn eval_config(stored: ModelConfig, cli: &ModelConfig) -> ModelConfig {
    ModelConfig {
        batch_size:     cli.batch_size,
        mode:           cli.mode,
        data_dir:       cli.data_dir.clone(),
        checkpoint_dir: cli.checkpoint_dir.clone(),
        log_dir:        cli.log_dir.clone(),
        ..stored
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainUseCase;
    use crate::domain::{settings::{RnnType, RunMode}, state::TrainingState};
    use std::{fs, path::Path};

    fn write_ptb(root: &Path) {
        let dir = root.join("data").join("ptb");
        fs::create_dir_all(&dir).unwrap();
        let lines = |n: usize| "the cat sat on the mat\n".repeat(n);
        fs::write(dir.join("ptb.train.txt"), lines(10)).unwrap();
        fs::write(dir.join("ptb.valid.txt"), lines(5)).unwrap();
        fs::write(dir.join("ptb.test.txt"), lines(5)).unwrap();
    }

    fn tiny_cfg(root: &Path) -> ModelConfig {
        ModelConfig {
            keep_prob:  1.0,
            hidden_dim: 6,
            num_layers: 1,
            embed_dim:  4,
            k_widths:   vec![2],
            num_ks:     vec![3],
            num_steps:  2,
            vocab_size: 10,
            batch_size: 2,
            max_seq_l:  3,
            max_epoch:  1,
            checkpoint_every: 0,
            seed: Some(1),
            data_dir:       root.join("data").display().to_string(),
            checkpoint_dir: root.join("ckpt").display().to_string(),
            log_dir:        root.join("logs").display().to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("valid"), "Valid");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_train_then_eval_scores_both_splits() {
        let tmp = tempfile::tempdir().unwrap();
        write_ptb(tmp.path());
        let cfg = tiny_cfg(tmp.path());

        // 70 train tokens → rows of 35 → (35 - 1) / 3 = 11 windows
        let state = TrainUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(state, TrainingState::new(11, 1));

        let run_dir = cfg.run_checkpoint_dir();
        assert!(run_dir.join("vocab.json").exists());
        assert!(run_dir.join("train_config.json").exists());
        assert!(cfg.run_log_dir().join("summaries.csv").exists());

        let reports = EvalUseCase::new(cfg).execute().unwrap();
        let splits: Vec<Split> = reports.iter().map(|(s, _)| *s).collect();
        assert_eq!(splits, vec![Split::Valid, Split::Test]);
        assert!(reports.iter().all(|(_, r)| r.perplexity.is_finite() && r.perplexity >= 1.0));
    }

    #[test]
    fn test_eval_rebuilds_stored_architecture() {
        let stored = ModelConfig {
            rnn_type: RnnType::Lstm,
            rnn_output_dropout: true,
            hidden_dim: 12,
            data_dir: "old/data".into(),
            ..Default::default()
        };
        let cli = ModelConfig {
            mode: RunMode::Eval,
            batch_size: 5,
            data_dir: "new/data".into(),
            checkpoint_dir: "new/ckpt".into(),
            log_dir: "new/logs".into(),
            ..Default::default()
        };

        let cfg = eval_config(stored, &cli);
        assert_eq!(cfg.rnn_type, RnnType::Lstm);
        assert!(cfg.rnn_output_dropout);
        assert_eq!(cfg.hidden_dim, 12);
        assert_eq!(cfg.mode, RunMode::Eval);
        assert_eq!(cfg.batch_size, 5);
        assert_eq!(cfg.data_dir, "new/data");
        assert_eq!(cfg.checkpoint_dir, "new/ckpt");
        assert_eq!(cfg.log_dir, "new/logs");
    }

    #[test]
    fn test_eval_without_stored_config_fails() {
        let tmp = tempfile::tempdir().unwrap();
        write_ptb(tmp.path());
        let cfg = tiny_cfg(tmp.path());
        TrainUseCase::new(cfg.clone()).execute().unwrap();
        fs::remove_file(cfg.run_checkpoint_dir().join("train_config.json")).unwrap();

        let err = EvalUseCase::new(cfg).execute().unwrap_err();
        assert!(format!("{err:#}").contains("train_config.json"), "{err:#}");
    }

    #[test]
    fn test_eval_before_train_fails() {
        let tmp = tempfile::tempdir().unwrap();
        write_ptb(tmp.path());
        assert!(EvalUseCase::new(tiny_cfg(tmp.path())).execute().is_err());
    }

    #[test]
    fn test_missing_dataset_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let err = TrainUseCase::new(tiny_cfg(tmp.path())).execute().unwrap_err();
        assert!(format!("{err:#}").contains("ptb.train.txt"));
    }
}
