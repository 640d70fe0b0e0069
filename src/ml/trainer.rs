// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Init → RunEpoch* → Done
//
//   Init      seed the backend, build the model, restore the newest
//             checkpoint of the run directory if there is one
//   RunEpoch  walk the training windows in order; every window is
//             forward + loss + backward + clip + optimizer step
//   Done      report test perplexity
//
// Key Burn insight:
//   - Training uses TrainBackend (Autodiff<..>) for gradients
//   - model.valid() returns the model on the inner backend, which
//     is what validation and test perplexity are computed on
//   - the optimizer returns a NEW model value on every step
//
// Recurrent state is carried from window to window within an
// epoch, detached so backward never reaches the previous window,
// and reset to zeros when an epoch starts.

use anyhow::{bail, Result};
use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    module::AutodiffModule,
    optim::{AdaGradConfig, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::config::ModelConfig;
use crate::data::{batcher::WindowBatcher, windows::TokenWindows};
use crate::domain::{
    corpus::{Split, TokenCorpus},
    settings::OptimizerKind,
    state::TrainingState,
    traits::SummarySink,
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    evaluator::evaluate,
    loss::compute_loss,
    model::{RcmnConfig, RcmnModel},
    optim::{clip_by_global_norm, LearningRateSchedule},
    progress::{EpochStats, StepCadence},
    TrainBackend,
};

/// Collaborators of one training run.
pub struct TrainContext<'a> {
    pub cfg:     &'a ModelConfig,
    pub corpus:  &'a TokenCorpus,
    pub ckpt:    &'a CheckpointManager,
    pub summary: &'a dyn SummarySink,
}

pub fn run_training(ctx: &TrainContext<'_>) -> Result<TrainingState> {
    let device: <TrainBackend as Backend>::Device = Default::default();
    tracing::info!("Using device: {:?}", device);

    let seed = ctx.cfg.seed.unwrap_or_else(rand::random);
    TrainBackend::seed(seed);
    tracing::info!("Random seed: {}", seed);

    match ctx.cfg.optim_type {
        OptimizerKind::Adam => {
            let optim = AdamConfig::new().init::<TrainBackend, RcmnModel<TrainBackend>>();
            train_loop(ctx, optim, device)
        }
        OptimizerKind::AdaGrad => {
            let optim = AdaGradConfig::new().init::<TrainBackend, RcmnModel<TrainBackend>>();
            train_loop(ctx, optim, device)
        }
    }
}

fn train_loop<B, O>(ctx: &TrainContext<'_>, mut optim: O, device: B::Device) -> Result<TrainingState>
where
    B: AutodiffBackend,
    O: Optimizer<RcmnModel<B>, B>,
{
    let cfg = ctx.cfg;

    // ── Build / restore model ─────────────────────────────────────────────────
    let mut model: RcmnModel<B> = RcmnConfig::from(cfg).init(&device)?;
    let mut state = TrainingState::new(0, 0);

    if let Some((restored, saved)) = ctx.ckpt.load_latest(model.clone(), &device)? {
        model = restored;
        state = saved;
        tracing::info!(
            "Resuming at global step {}, epoch {}",
            state.global_step, state.epoch
        );
    } else {
        tracing::info!("No checkpoint found, starting fresh");
    }
    tracing::info!(
        "Model ready: {} {} layer(s) × {}, {} synthetic steps",
        cfg.rnn_type, cfg.num_layers, cfg.hidden_dim, model.features.num_steps()
    );

    // ── Training windows ──────────────────────────────────────────────────────
    let windows = TokenWindows::new(Split::Train.tokens(ctx.corpus), cfg.batch_size, cfg.max_seq_l)?;
    let cadence = StepCadence::new(
        windows.epoch_size(),
        cfg.log_intervals_per_epoch,
        cfg.checkpoint_every,
    );
    let schedule = LearningRateSchedule::from(cfg);
    let batcher = WindowBatcher::<B>::new(device.clone());

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in state.remaining_epochs(cfg.max_epoch) {
        println!(
            "Epoch: {} Learning rate: {:.6}",
            epoch + 1,
            schedule.rate(state.global_step)
        );

        let pass = EpochPass { ctx, windows: &windows, batcher: &batcher, cadence, schedule };
        let (trained, train_ppl) = pass.run(model, &mut optim, &mut state, &device)?;
        model = trained;
        state.finish_epoch();
        println!("Epoch: {} Train Perplexity: {:.3}", epoch + 1, train_ppl);

        // ── Validation (inner backend, no autodiff) ───────────────────────────
        let valid = evaluate(&model.valid(), cfg, Split::Valid.tokens(ctx.corpus), &device)?;
        println!("Epoch: {} Valid Perplexity: {:.3}", epoch + 1, valid.perplexity);
        ctx.summary.add_scalar(state.global_step, "valid_perplexity", valid.perplexity)?;

        ctx.ckpt.save(&model, &state)?;
        tracing::info!("Checkpoint saved at step {} (epoch {})", state.global_step, state.epoch);
    }

    let test = evaluate(&model.valid(), cfg, Split::Test.tokens(ctx.corpus), &device)?;
    println!("Test Perplexity: {:.3}", test.perplexity);
    ctx.summary.add_scalar(state.global_step, "test_perplexity", test.perplexity)?;

    tracing::info!("Training complete!");
    Ok(state)
}

/// One pass over the training windows.
struct EpochPass<'a, B: AutodiffBackend> {
    ctx:      &'a TrainContext<'a>,
    windows:  &'a TokenWindows<'a>,
    batcher:  &'a WindowBatcher<B>,
    cadence:  StepCadence,
    schedule: LearningRateSchedule,
}

impl<B: AutodiffBackend> EpochPass<'_, B> {
    /// Returns the updated model and the epoch's training perplexity.
    fn run<O: Optimizer<RcmnModel<B>, B>>(
        &self,
        model:  RcmnModel<B>,
        optim:  &mut O,
        state:  &mut TrainingState,
        device: &B::Device,
    ) -> Result<(RcmnModel<B>, f64)> {
        let cfg = self.ctx.cfg;
        let epoch_size = self.windows.epoch_size();
        let tokens_per_example = cfg.tokens_per_example();

        let mut model = model;
        let mut rnn_state = model.zero_state(cfg.batch_size, device);
        let mut stats = EpochStats::new();

        for (step, window) in self.windows.iter().enumerate() {
            let batch = self.batcher.batch(vec![window]);

            // ── Forward + loss ────────────────────────────────────────────────
            let output = model.forward(batch.inputs, rnn_state)?;
            let loss = compute_loss(&model, &output, batch.targets, cfg.l2);

            let total: f64 = loss.cost.clone().into_scalar().elem::<f64>();
            if !total.is_finite() {
                bail!("non-finite loss ({total}) at global step {}", state.global_step);
            }
            let cost: f64 = loss.cross_entropy.into_scalar().elem::<f64>();
            let l2 = loss.l2.map(|t| t.into_scalar().elem::<f64>());
            rnn_state = output.state.detach();

            // ── Backward + clip + update ──────────────────────────────────────
            let lr = self.schedule.rate(state.global_step);
            let grads = GradientsParams::from_grads(loss.cost.backward(), &model);
            let (grads, grad_norm) = clip_by_global_norm(&model, grads, cfg.max_grad_norm);
            model = optim.step(lr, model, grads);
            state.advance_step();

            stats.record(cost, tokens_per_example);

            if self.cadence.is_log_step(step) {
                let perplexity = stats.perplexity();
                println!(
                    "{:.3} perplexity: {:.3} speed: {:.0} wps",
                    (step + 1) as f64 / epoch_size as f64,
                    perplexity,
                    stats.words_per_sec(cfg.batch_size),
                );

                let summary = self.ctx.summary;
                summary.add_scalar(state.global_step, "loss", total)?;
                summary.add_scalar(state.global_step, "perplexity", perplexity)?;
                summary.add_scalar(state.global_step, "learning_rate", lr)?;
                summary.add_scalar(state.global_step, "grad_norm", grad_norm)?;
                if let Some(l2) = l2 {
                    summary.add_scalar(state.global_step, "l2", l2)?;
                }
            }

            if self.cadence.is_checkpoint_step(state.global_step) {
                self.ctx.ckpt.save(&model, state)?;
                tracing::debug!("Periodic checkpoint at step {}", state.global_step);
            }
        }

        Ok((model, stats.perplexity()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::summary::SummaryWriter;
    use burn::{
        backend::NdArray,
        module::{ModuleMapper, ParamId},
    };
    use std::fs;

    /// Turns every float parameter into NaN.
    struct Poison;

    impl<B: Backend> ModuleMapper<B> for Poison {
        fn map_float<const D: usize>(&mut self, _id: ParamId, tensor: Tensor<B, D>) -> Tensor<B, D> {
            tensor.mul_scalar(f32::NAN)
        }
    }

    fn tiny_cfg() -> ModelConfig {
        ModelConfig {
            keep_prob:  0.9,
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
            log_intervals_per_epoch: 2,
            checkpoint_every: 4,
            seed: Some(7),
            ..Default::default()
        }
    }

    fn corpus() -> TokenCorpus {
        let tokens = |n: u32| (0..n).map(|i| (i * 3 + 1) % 10).collect::<Vec<u32>>();
        // train: rows of 20 → 6 windows per epoch; valid/test: rows of 10 → 3 windows
        TokenCorpus::new(tokens(40), tokens(20), tokens(20), 10)
    }

    #[test]
    fn test_training_advances_counters_and_writes_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = tiny_cfg();
        let corpus = corpus();
        let ckpt = CheckpointManager::new(tmp.path().join("ckpt")).unwrap();
        let summary = SummaryWriter::new(tmp.path().join("logs")).unwrap();

        let ctx = TrainContext { cfg: &cfg, corpus: &corpus, ckpt: &ckpt, summary: &summary };
        let state = run_training(&ctx).unwrap();

        assert_eq!(state, TrainingState::new(6, 1));
        assert_eq!(ckpt.latest_state().unwrap(), Some(state));
        // periodic checkpoint at step 4, end-of-epoch checkpoint at step 6
        assert!(tmp.path().join("ckpt").join("model_step_4.mpk.gz").exists());
        assert!(tmp.path().join("ckpt").join("model_step_6.mpk.gz").exists());

        let csv = fs::read_to_string(summary.csv_path()).unwrap();
        for tag in ["loss", "perplexity", "learning_rate", "grad_norm", "valid_perplexity", "test_perplexity"] {
            assert!(csv.contains(&format!(",{tag},")), "missing {tag} in\n{csv}");
        }
    }

    #[test]
    fn test_resume_keeps_counting_from_checkpoint() {
        let tmp = tempfile::tempdir().unwrap();
        let corpus = corpus();
        let ckpt = CheckpointManager::new(tmp.path().join("ckpt")).unwrap();
        let summary = SummaryWriter::new(tmp.path().join("logs")).unwrap();

        let first = tiny_cfg();
        let ctx = TrainContext { cfg: &first, corpus: &corpus, ckpt: &ckpt, summary: &summary };
        assert_eq!(run_training(&ctx).unwrap(), TrainingState::new(6, 1));

        let second = ModelConfig { max_epoch: 2, optim_type: OptimizerKind::AdaGrad, ..tiny_cfg() };
        let ctx = TrainContext { cfg: &second, corpus: &corpus, ckpt: &ckpt, summary: &summary };
        assert_eq!(run_training(&ctx).unwrap(), TrainingState::new(12, 2));
    }

    #[test]
    fn test_finished_run_only_reports_test_perplexity() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = tiny_cfg();
        let corpus = corpus();
        let ckpt = CheckpointManager::new(tmp.path().join("ckpt")).unwrap();
        let summary = SummaryWriter::new(tmp.path().join("logs")).unwrap();
        let ctx = TrainContext { cfg: &cfg, corpus: &corpus, ckpt: &ckpt, summary: &summary };

        run_training(&ctx).unwrap();
        // max_epoch already reached: nothing more to train
        assert_eq!(run_training(&ctx).unwrap(), TrainingState::new(6, 1));
    }

    #[test]
    fn test_too_short_training_split_fails_before_any_step() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = ModelConfig { batch_size: 50, ..tiny_cfg() };
        let corpus = corpus();
        let ckpt = CheckpointManager::new(tmp.path().join("ckpt")).unwrap();
        let summary = SummaryWriter::new(tmp.path().join("logs")).unwrap();
        let ctx = TrainContext { cfg: &cfg, corpus: &corpus, ckpt: &ckpt, summary: &summary };

        let err = run_training(&ctx).unwrap_err();
        assert!(err.to_string().contains("decrease batch_size"));
        assert!(ckpt.latest_state().unwrap().is_none());
    }

    #[test]
    fn test_l2_is_summarised_when_enabled() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = ModelConfig { l2: 1e-3, ..tiny_cfg() };
        let corpus = corpus();
        let ckpt = CheckpointManager::new(tmp.path().join("ckpt")).unwrap();
        let summary = SummaryWriter::new(tmp.path().join("logs")).unwrap();
        let ctx = TrainContext { cfg: &cfg, corpus: &corpus, ckpt: &ckpt, summary: &summary };

        run_training(&ctx).unwrap();
        let csv = fs::read_to_string(summary.csv_path()).unwrap();
        assert!(csv.contains(",l2,"), "{csv}");
    }

    #[test]
    fn test_non_finite_loss_aborts_with_step() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = tiny_cfg();
        let corpus = corpus();
        let ckpt = CheckpointManager::new(tmp.path().join("ckpt")).unwrap();
        let summary = SummaryWriter::new(tmp.path().join("logs")).unwrap();

        let model: RcmnModel<NdArray> = RcmnConfig::from(&cfg).init(&Default::default()).unwrap();
        ckpt.save(&model.map(&mut Poison), &TrainingState::new(0, 0)).unwrap();

        let ctx = TrainContext { cfg: &cfg, corpus: &corpus, ckpt: &ckpt, summary: &summary };
        let err = run_training(&ctx).unwrap_err();
        assert!(err.to_string().contains("non-finite loss"), "{err}");
        assert!(err.to_string().contains("global step 0"), "{err}");
        // nothing was trained past the poisoned checkpoint
        assert_eq!(ckpt.latest_state().unwrap(), Some(TrainingState::new(0, 0)));
    }
}
