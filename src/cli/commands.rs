// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Every flag mirrors one ModelConfig field and defaults to the
// same value as ModelConfig::default().
//
// The cell kind, optimizer and dataset are taken as plain strings
// and parsed by the domain enums, so an unknown value is reported
// with the same message whether it came from the command line or
// from a saved train_config.json.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::application::config::ModelConfig;
use crate::domain::settings::RunMode;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train (or resume) a model
    Train(RunArgs),

    /// Report validation and test perplexity of the newest checkpoint
    Eval(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Probability of keeping an activation under dropout
    #[arg(long, default_value_t = 0.35)]
    pub keep_prob: f64,

    #[arg(long, default_value_t = 650)]
    pub hidden_dim: usize,

    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 500)]
    pub embed_dim: usize,

    /// Kernel width of each convolution stage, comma separated
    #[arg(long, value_delimiter = ',', default_value = "2")]
    pub k_widths: Vec<usize>,

    /// Output depth of each convolution stage, comma separated
    #[arg(long, value_delimiter = ',', default_value = "5")]
    pub num_ks: Vec<usize>,

    /// Synthetic steps fed to the recurrent encoder
    #[arg(long, default_value_t = 5)]
    pub num_steps: usize,

    #[arg(long, default_value_t = 10_000)]
    pub vocab_size: usize,

    #[arg(long, default_value_t = 20)]
    pub batch_size: usize,

    /// Tokens per window
    #[arg(long, default_value_t = 30)]
    pub max_seq_l: usize,

    #[arg(long, default_value_t = 100)]
    pub max_epoch: usize,

    #[arg(long, default_value_t = 0.001)]
    pub learning_rate: f64,

    /// Joint gradient norm cap (<= 0 disables clipping)
    #[arg(long, default_value_t = 10.0)]
    pub max_grad_norm: f64,

    #[arg(long, default_value_t = 0.96)]
    pub decay_rate: f64,

    #[arg(long, default_value_t = 10_000)]
    pub decay_step: usize,

    #[arg(long, default_value = "ptb")]
    pub dataset: String,

    /// GRU or LSTM
    #[arg(long, default_value = "GRU")]
    pub rnn_type: String,

    /// L2 coefficient (0 disables the penalty)
    #[arg(long, default_value_t = 0.0004)]
    pub l2: f64,

    /// adam or adagrad
    #[arg(long, default_value = "adam")]
    pub optim_type: String,

    /// Predict only the token after each window
    #[arg(long)]
    pub is_single_output: bool,

    /// Max-pool the per-step logits instead of using the last step
    #[arg(long)]
    pub max_pool_in_output: bool,

    /// Apply dropout to recurrent outputs as well
    #[arg(long)]
    pub rnn_output_dropout: bool,

    #[arg(long, default_value = "./data")]
    pub data_dir: String,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value = "logs")]
    pub log_dir: String,

    /// Progress lines printed per epoch
    #[arg(long, default_value_t = 10)]
    pub log_intervals_per_epoch: usize,

    /// Save a checkpoint every N global steps (0 = only at epoch end)
    #[arg(long, default_value_t = 500)]
    pub checkpoint_every: usize,

    /// Seed for parameter init and dropout (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,
}

impl RunArgs {
    /// The boundary between Layer 1 and Layer 2: the application
    /// layer never sees clap types or unparsed strings.
    pub fn into_config(self, mode: RunMode) -> Result<ModelConfig> {
        let config = ModelConfig {
            keep_prob:  self.keep_prob,
            hidden_dim: self.hidden_dim,
            num_layers: self.num_layers,
            embed_dim:  self.embed_dim,
            k_widths:   self.k_widths,
            num_ks:     self.num_ks,
            num_steps:  self.num_steps,
            vocab_size: self.vocab_size,
            batch_size: self.batch_size,
            max_seq_l:  self.max_seq_l,
            max_epoch:  self.max_epoch,

            learning_rate: self.learning_rate,
            max_grad_norm: self.max_grad_norm,
            decay_rate:    self.decay_rate,
            decay_step:    self.decay_step,

            dataset:    self.dataset.parse().context("invalid --dataset")?,
            rnn_type:   self.rnn_type.parse().context("invalid --rnn-type")?,
            mode,
            l2:         self.l2,
            optim_type: self.optim_type.parse().context("invalid --optim-type")?,

            is_single_output:   self.is_single_output,
            max_pool_in_output: self.max_pool_in_output,
            rnn_output_dropout: self.rnn_output_dropout,

            data_dir:       self.data_dir,
            checkpoint_dir: self.checkpoint_dir,
            log_dir:        self.log_dir,
            log_intervals_per_epoch: self.log_intervals_per_epoch,
            checkpoint_every: self.checkpoint_every,
            seed: self.seed,
        };
        config.validate()?;
        Ok(config)
    }
}
