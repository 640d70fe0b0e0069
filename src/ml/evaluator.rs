// ============================================================
// Layer 5 — Evaluator
// ============================================================
// The evaluation-only path: forward + loss on a backend without
// autodiff. No gradients are tracked and no optimizer exists.
//
// Used twice:
//   - by the training loop, on `model.valid()`, for validation
//     perplexity after every epoch and test perplexity at the end
//   - by `rcmn eval`, which rebuilds the model on the inference
//     backend and loads the newest checkpoint into it
//
// Windows are visited in order and the recurrent state is carried
// from one to the next, exactly as during training.

use anyhow::{bail, Result};
use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    prelude::*,
};

use crate::application::config::ModelConfig;
use crate::data::{batcher::WindowBatcher, windows::TokenWindows};
use crate::domain::corpus::{Split, TokenCorpus};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    loss::sequence_cost,
    model::{RcmnConfig, RcmnModel},
    progress::EpochStats,
    InferenceBackend,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalReport {
    /// Summed per-example cross-entropy over every window
    pub cost:       f64,
    /// Tokens scored per example, summed over every window
    pub tokens:     usize,
    pub perplexity: f64,
}

/// Perplexity of `model` on one token split.
pub fn evaluate<B: Backend>(
    model:  &RcmnModel<B>,
    cfg:    &ModelConfig,
    tokens: &[u32],
    device: &B::Device,
) -> Result<EvalReport> {
    let windows = TokenWindows::new(tokens, cfg.batch_size, cfg.max_seq_l)?;
    let batcher = WindowBatcher::<B>::new(device.clone());
    let tokens_per_example = cfg.tokens_per_example();

    let mut state = model.zero_state(cfg.batch_size, device);
    let mut stats = EpochStats::new();

    for window in windows.iter() {
        let batch = batcher.batch(vec![window]);
        let output = model.forward(batch.inputs, state)?;

        let targets = model.loss_targets(batch.targets);
        let cost = sequence_cost(output.logits, targets, cfg.batch_size)
            .into_scalar()
            .elem::<f64>();
        if !cost.is_finite() {
            bail!("non-finite evaluation cost ({cost})");
        }

        stats.record(cost, tokens_per_example);
        state = output.state;
    }

    Ok(EvalReport {
        cost:       stats.cost_sum(),
        tokens:     stats.tokens(),
        perplexity: stats.perplexity(),
    })
}

/// `rcmn eval`: load the newest checkpoint and report perplexity
/// on the validation and test splits.
pub fn run_evaluation(
    cfg:    &ModelConfig,
    corpus: &TokenCorpus,
    ckpt:   &CheckpointManager,
) -> Result<Vec<(Split, EvalReport)>> {
    let device: <InferenceBackend as Backend>::Device = Default::default();

    let model: RcmnModel<InferenceBackend> = RcmnConfig::from(cfg).init(&device)?;
    let Some((model, state)) = ckpt.load_latest(model, &device)? else {
        bail!(
            "No checkpoint found in '{}'. Run 'train' with the same configuration first.",
            ckpt.dir().display()
        );
    };
    tracing::info!("Evaluating checkpoint at step {} (epoch {})", state.global_step, state.epoch);

    let mut reports = Vec::new();
    for split in [Split::Valid, Split::Test] {
        let report = evaluate(&model, cfg, split.tokens(corpus), &device)?;
        tracing::info!("{} perplexity: {:.3}", split.name(), report.perplexity);
        reports.push((split, report));
    }
    Ok(reports)
}
