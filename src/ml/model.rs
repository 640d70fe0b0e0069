// ============================================================
// Layer 5 — RCMN Model
// ============================================================
// Embedding ─► input dropout ─► conv feature stack ─► recurrent
// encoder ─► output projector.
//
//   ids [B, L] ─► [B, L, E] ─► num_steps × [B, F] ─► num_steps × [B, H] ─► logits
//
// RcmnConfig::init checks the architecture before anything is
// allocated, so a bad kernel list fails before the first tensor
// exists.

use anyhow::{bail, Context, Result};
use burn::{
    nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig},
    prelude::*,
};

use crate::application::config::ModelConfig;
use crate::domain::settings::RnnType;
use crate::ml::conv::{conv_plan, ConvFeatureStack};
use crate::ml::encoder::{RecurrentEncoder, RecurrentState};
use crate::ml::projector::OutputProjector;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct RcmnConfig {
    pub vocab_size:         usize,
    pub embed_dim:          usize,
    pub max_seq_l:          usize,
    pub k_widths:           Vec<usize>,
    pub num_ks:             Vec<usize>,
    pub num_steps:          usize,
    pub hidden_dim:         usize,
    pub num_layers:         usize,
    pub rnn_type:           RnnType,
    pub keep_prob:          f64,
    pub is_single_output:   bool,
    pub max_pool_in_output: bool,
    #[config(default = false)]
    pub rnn_output_dropout: bool,
}

impl From<&ModelConfig> for RcmnConfig {
    fn from(cfg: &ModelConfig) -> Self {
        RcmnConfig::new(
            cfg.vocab_size, cfg.embed_dim, cfg.max_seq_l,
            cfg.k_widths.clone(), cfg.num_ks.clone(), cfg.num_steps,
            cfg.hidden_dim, cfg.num_layers, cfg.rnn_type, cfg.keep_prob,
            cfg.is_single_output, cfg.max_pool_in_output,
        )
        .with_rnn_output_dropout(cfg.rnn_output_dropout)
    }
}

impl RcmnConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_steps == 0 {
            bail!("num_steps must be positive: the convolution stack would produce no features");
        }
        if self.k_widths.is_empty() || self.k_widths.len() != self.num_ks.len() {
            bail!(
                "k_widths ({:?}) and num_ks ({:?}) must be non-empty and of equal length",
                self.k_widths, self.num_ks
            );
        }
        if self.k_widths.iter().chain(self.num_ks.iter()).any(|&v| v == 0) {
            bail!("convolution widths and depths must be positive");
        }
        Ok(())
    }

    /// Width of every flattened convolution feature.
    pub fn feature_width(&self) -> usize {
        self.num_ks.last().copied().unwrap_or(0) * self.max_seq_l
    }

    fn dropout_prob(&self) -> f64 {
        1.0 - self.keep_prob
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<RcmnModel<B>> {
        self.validate()?;

        let embedding = EmbeddingConfig::new(self.vocab_size, self.embed_dim).init(device);
        let input_dropout = DropoutConfig::new(self.dropout_prob()).init();

        let plan = conv_plan(self.num_steps, &self.k_widths, &self.num_ks);
        let features = ConvFeatureStack::<B>::new(&plan, self.embed_dim, device);
        for key in plan.iter().flatten() {
            let conv = features
                .stage(key)
                .with_context(|| format!("convolution stage {} was not built", key.name()))?;
            tracing::debug!("{}: weight {:?}", key.name(), conv.weight.val().dims());
        }

        let output_dropout = (self.rnn_output_dropout && self.keep_prob < 1.0)
            .then(|| self.dropout_prob());
        let encoder = RecurrentEncoder::new(
            self.rnn_type,
            self.feature_width(),
            self.hidden_dim,
            self.num_layers,
            output_dropout,
            device,
        );
        tracing::debug!("Recurrent output dropout: {}", encoder.has_output_dropout());

        let projector = if self.is_single_output {
            OutputProjector::single(self.hidden_dim, self.vocab_size, device)
        } else {
            OutputProjector::per_step(
                self.num_steps, self.hidden_dim, self.max_seq_l,
                self.vocab_size, self.max_pool_in_output, device,
            )
        };

        Ok(RcmnModel { embedding, input_dropout, features, encoder, projector })
    }
}

#[derive(Module, Debug)]
pub struct RcmnModel<B: Backend> {
    pub embedding:     Embedding<B>,
    pub input_dropout: Dropout,
    pub features:      ConvFeatureStack<B>,
    pub encoder:       RecurrentEncoder<B>,
    pub projector:     OutputProjector<B>,
}

pub struct ModelOutput<B: Backend> {
    /// Logits scored by the loss: [batch*seq, vocab] or [batch, vocab]
    pub logits: Tensor<B, 2>,
    /// Recurrent state after the last synthetic step
    pub state:  RecurrentState<B>,
}

impl<B: Backend> RcmnModel<B> {
    pub fn zero_state(&self, batch_size: usize, device: &B::Device) -> RecurrentState<B> {
        self.encoder.zero_state(batch_size, device)
    }

    /// inputs: [batch, seq_len] token ids
    pub fn forward(&self, inputs: Tensor<B, 2, Int>, state: RecurrentState<B>) -> Result<ModelOutput<B>> {
        // Dropout is a no-op outside of an autodiff (training) backend.
        let embedded = self.input_dropout.forward(self.embedding.forward(inputs));

        let features = self.features.forward(embedded);
        let (outputs, state) = self.encoder.forward(features, state)?;

        let logits = self
            .projector
            .forward(outputs)
            .context("recurrent encoder produced no outputs")?;

        Ok(ModelOutput { logits, state })
    }

    /// Targets matching the logits: the whole window flattened to
    /// [batch*seq] in multi-output mode, the last column in single mode.
    pub fn loss_targets(&self, targets: Tensor<B, 2, Int>) -> Tensor<B, 1, Int> {
        let [batch, seq_len] = targets.dims();
        if self.projector.is_single() {
            targets.slice([0..batch, seq_len - 1..seq_len]).reshape([batch])
        } else {
            targets.reshape([batch * seq_len])
        }
    }
}
