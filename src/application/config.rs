// ============================================================
// Layer 2 — Model / Training Configuration
// ============================================================
// Every hyperparameter of a run lives in ModelConfig. It is
// built once (from the CLI or from a saved train_config.json),
// validated, and then only ever read.
//
// Defaults reproduce the reference PTB setup:
//   650-wide 2-layer GRU, 500-dim embeddings, 5 synthetic steps,
//   one conv stage of width 2 / depth 5, windows of 30 tokens.
//
// The typed enums (RnnType, OptimizerKind, DatasetKind) make an
// unknown cell kind, optimizer, or dataset unrepresentable: they
// fail while the config is being parsed, long before training.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::settings::{DatasetKind, OptimizerKind, RnnType, RunMode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Probability of KEEPING an activation under dropout
    pub keep_prob:  f64,
    pub hidden_dim: usize,
    pub num_layers: usize,
    pub embed_dim:  usize,
    /// Kernel width of each convolution stage
    pub k_widths:   Vec<usize>,
    /// Output depth of each convolution stage
    pub num_ks:     Vec<usize>,
    /// Number of synthetic steps fed to the recurrent encoder
    pub num_steps:  usize,
    pub vocab_size: usize,
    pub batch_size: usize,
    pub max_seq_l:  usize,
    pub max_epoch:  usize,

    pub learning_rate: f64,
    pub max_grad_norm: f64,
    pub decay_rate:    f64,
    pub decay_step:    usize,

    pub dataset:    DatasetKind,
    pub rnn_type:   RnnType,
    pub mode:       RunMode,
    pub l2:         f64,
    pub optim_type: OptimizerKind,

    pub is_single_output:   bool,
    pub max_pool_in_output: bool,
    /// Dropout on recurrent outputs; off unless explicitly enabled
    pub rnn_output_dropout: bool,

    pub data_dir:       String,
    pub checkpoint_dir: String,
    pub log_dir:        String,
    /// Progress lines printed per epoch
    pub log_intervals_per_epoch: usize,
    /// Save a checkpoint every N global steps (0 = only at epoch end)
    pub checkpoint_every: usize,
    pub seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            keep_prob:  0.35,
            hidden_dim: 650,
            num_layers: 2,
            embed_dim:  500,
            k_widths:   vec![2],
            num_ks:     vec![5],
            num_steps:  5,
            vocab_size: 10_000,
            batch_size: 20,
            max_seq_l:  30,
            max_epoch:  100,

            learning_rate: 0.001,
            max_grad_norm: 10.0,
            decay_rate:    0.96,
            decay_step:    10_000,

            dataset:    DatasetKind::Ptb,
            rnn_type:   RnnType::Gru,
            mode:       RunMode::Train,
            l2:         0.0004,
            optim_type: OptimizerKind::Adam,

            is_single_output:   false,
            max_pool_in_output: false,
            rnn_output_dropout: false,

            data_dir:       "./data".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            log_dir:        "logs".to_string(),
            log_intervals_per_epoch: 10,
            checkpoint_every: 500,
            seed: None,
        }
    }
}

impl ModelConfig {
    /// Check every structural invariant. Called before anything
    /// is read from disk or allocated on the device.
    pub fn validate(&self) -> Result<()> {
        if self.k_widths.len() != self.num_ks.len() {
            bail!(
                "k_widths and num_ks must have the same length (got {} and {})",
                self.k_widths.len(),
                self.num_ks.len()
            );
        }
        if self.k_widths.is_empty() {
            bail!("at least one convolution stage is required (k_widths is empty)");
        }
        if self.k_widths.iter().chain(self.num_ks.iter()).any(|&v| v == 0) {
            bail!("convolution widths and depths must be positive");
        }

        let positives = [
            ("hidden_dim", self.hidden_dim),
            ("num_layers", self.num_layers),
            ("embed_dim",  self.embed_dim),
            ("num_steps",  self.num_steps),
            ("vocab_size", self.vocab_size),
            ("batch_size", self.batch_size),
            ("max_seq_l",  self.max_seq_l),
        ];
        for (name, value) in positives {
            if value == 0 {
                bail!("{name} must be strictly positive");
            }
        }

        if !(self.keep_prob > 0.0 && self.keep_prob <= 1.0) {
            bail!("keep_prob must be in (0, 1], got {}", self.keep_prob);
        }
        if self.l2 < 0.0 {
            bail!("l2 coefficient must not be negative, got {}", self.l2);
        }
        if self.learning_rate <= 0.0 {
            bail!("learning_rate must be positive, got {}", self.learning_rate);
        }
        Ok(())
    }

    /// Deterministic directory name built from the salient
    /// hyperparameters. Checkpoints, the vocabulary, and summaries
    /// of a run all live under a directory with this name, so two
    /// runs with the same architecture share (and resume) state.
    pub fn model_dir(&self) -> String {
        let join = |v: &[usize]| {
            v.iter().map(|x| x.to_string()).collect::<Vec<_>>().join("-")
        };
        format!(
            "{}_{}_h{}_l{}_e{}_kw{}_kd{}_s{}_v{}_b{}_seq{}_kp{}_lr{}_clip{}_l2{}_{}{}{}",
            self.dataset,
            self.rnn_type,
            self.hidden_dim,
            self.num_layers,
            self.embed_dim,
            join(&self.k_widths),
            join(&self.num_ks),
            self.num_steps,
            self.vocab_size,
            self.batch_size,
            self.max_seq_l,
            self.keep_prob,
            self.learning_rate,
            self.max_grad_norm,
            self.l2,
            self.optim_type,
            if self.is_single_output { "_single" } else { "" },
            if self.max_pool_in_output { "_maxpool" } else { "" },
        )
    }

    /// `<checkpoint_dir>/<model_dir>`
    pub fn run_checkpoint_dir(&self) -> PathBuf {
        PathBuf::from(&self.checkpoint_dir).join(self.model_dir())
    }

    /// `<log_dir>/<model_dir>`
    pub fn run_log_dir(&self) -> PathBuf {
        PathBuf::from(&self.log_dir).join(self.model_dir())
    }

    /// `<data_dir>/<dataset>`
    pub fn dataset_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(self.dataset.dir_name())
    }

    /// Tokens scored per example in one window: the whole window
    /// in multi-output mode, only the next token in single-output mode.
    pub fn tokens_per_example(&self) -> usize {
        if self.is_single_output { 1 } else { self.max_seq_l }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ModelConfig::default().validate().is_ok());
    }

    #[test]
    fn test_mismatched_kernel_arrays_rejected() {
        let cfg = ModelConfig {
            k_widths: vec![2, 3],
            num_ks:   vec![5],
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("same length"));
    }

    #[test]
    fn test_empty_kernel_list_rejected() {
        let cfg = ModelConfig {
            k_widths: vec![],
            num_ks:   vec![],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_sizes_rejected() {
        let cfg = ModelConfig { num_steps: 0, ..Default::default() };
        assert!(cfg.validate().unwrap_err().to_string().contains("num_steps"));

        let cfg = ModelConfig { batch_size: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_model_dir_is_deterministic() {
        let a = ModelConfig::default();
        let b = ModelConfig::default();
        assert_eq!(a.model_dir(), b.model_dir());

        let c = ModelConfig { hidden_dim: 200, ..Default::default() };
        assert_ne!(a.model_dir(), c.model_dir());
    }

    #[test]
    fn test_unknown_enum_value_in_json_fails() {
        let mut json = serde_json::to_value(ModelConfig::default()).unwrap();
        json["optim_type"] = serde_json::json!("sgd");
        assert!(serde_json::from_value::<ModelConfig>(json).is_err());
    }

    #[test]
    fn test_tokens_per_example() {
        let multi = ModelConfig::default();
        assert_eq!(multi.tokens_per_example(), 30);

        let single = ModelConfig { is_single_output: true, ..Default::default() };
        assert_eq!(single.tokens_per_example(), 1);
    }
}
