// ============================================================
// Layer 5 — Optimisation Helpers
// ============================================================
// Everything that sits between `loss.backward()` and
// `optim.step(..)`:
//
//   clip_by_global_norm   — one scale factor for ALL gradients:
//                           g ← g · max_norm / max(‖g‖₂, max_norm)
//   LearningRateSchedule  — lr(step) = base · decay_rate^(step / decay_step)
//
// Burn's GradientClipping works tensor by tensor, so the global
// norm is computed here with two module visitors: one sums the
// squared gradient entries, the other rescales every gradient.

use std::marker::PhantomData;

use burn::{
    module::{ModuleVisitor, ParamId},
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::config::ModelConfig;

// ─── Global-norm clipping ─────────────────────────────────────────────────────
struct GradNorm<'a, B: AutodiffBackend> {
    grads:   &'a GradientsParams,
    squared: f64,
    _b:      PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for GradNorm<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            self.squared += grad.powf_scalar(2.0).sum().into_scalar().elem::<f64>();
        }
    }
}

struct GradScale<'a, B: AutodiffBackend> {
    grads: &'a mut GradientsParams,
    scale: f64,
    _b:    PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for GradScale<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) {
            self.grads.register::<B::InnerBackend, D>(id, grad.mul_scalar(self.scale));
        }
    }
}

/// L2 norm over every gradient of `module`, taken jointly.
pub fn global_norm<B: AutodiffBackend, M: Module<B>>(module: &M, grads: &GradientsParams) -> f64 {
    let mut visitor = GradNorm::<B> { grads, squared: 0.0, _b: PhantomData };
    module.visit(&mut visitor);
    visitor.squared.sqrt()
}

/// Rescale all gradients so their joint norm is at most `max_norm`.
/// Returns the gradients and the norm measured BEFORE clipping.
/// `max_norm <= 0` disables clipping.
pub fn clip_by_global_norm<B: AutodiffBackend, M: Module<B>>(
    module:   &M,
    grads:    GradientsParams,
    max_norm: f64,
) -> (GradientsParams, f64) {
    let norm = global_norm(module, &grads);
    if max_norm <= 0.0 || norm <= max_norm {
        return (grads, norm);
    }

    let mut grads = grads;
    let mut visitor = GradScale::<B> {
        grads: &mut grads,
        scale: max_norm / norm,
        _b:    PhantomData,
    };
    module.visit(&mut visitor);
    (grads, norm)
}

// ─── Learning-rate schedule ───────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningRateSchedule {
    pub base:       f64,
    pub decay_rate: f64,
    pub decay_step: usize,
}

impl LearningRateSchedule {
    pub fn new(base: f64, decay_rate: f64, decay_step: usize) -> Self {
        Self { base, decay_rate, decay_step }
    }

    /// Continuous exponential decay; constant when decay_step is 0.
    pub fn rate(&self, global_step: usize) -> f64 {
        if self.decay_step == 0 {
            return self.base;
        }
        let exponent = global_step as f64 / self.decay_step as f64;
        self.base * self.decay_rate.powf(exponent)
    }
}

impl From<&ModelConfig> for LearningRateSchedule {
    fn from(cfg: &ModelConfig) -> Self {
        Self::new(cfg.learning_rate, cfg.decay_rate, cfg.decay_step)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use crate::domain::settings::RnnType;
    use crate::ml::loss::compute_loss;
    use crate::ml::model::{RcmnConfig, RcmnModel};

    type TestBackend = Autodiff<NdArray>;

    fn model_and_grads() -> (RcmnModel<TestBackend>, GradientsParams) {
        let device = Default::default();
        let model: RcmnModel<TestBackend> =
            RcmnConfig::new(11, 4, 3, vec![2], vec![3], 2, 6, 1, RnnType::Lstm, 1.0, false, true)
                .init(&device)
                .unwrap();

        let inputs = Tensor::<TestBackend, 1, Int>::from_ints([1, 2, 3, 4, 5, 6], &device).reshape([2, 3]);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([2, 3, 4, 5, 6, 7], &device).reshape([2, 3]);

        let out = model.forward(inputs, model.zero_state(2, &device)).unwrap();
        let loss = compute_loss(&model, &out, targets, 0.001);
        let grads = GradientsParams::from_grads(loss.cost.backward(), &model);
        (model, grads)
    }

    #[test]
    fn test_clipping_caps_the_joint_norm() {
        let (model, grads) = model_and_grads();
        let before = global_norm(&model, &grads);
        assert!(before > 0.0);

        let max_norm = before / 4.0;
        let (clipped, reported) = clip_by_global_norm(&model, grads, max_norm);
        assert!((reported - before).abs() < 1e-9);

        let after = global_norm(&model, &clipped);
        assert!((after - max_norm).abs() < 1e-3 * max_norm, "after={after} max={max_norm}");
    }

    #[test]
    fn test_small_gradients_are_untouched() {
        let (model, grads) = model_and_grads();
        let before = global_norm(&model, &grads);

        let (same, _) = clip_by_global_norm(&model, grads, before * 10.0);
        assert!((global_norm(&model, &same) - before).abs() < 1e-6 * before.max(1.0));
    }

    #[test]
    fn test_non_positive_max_norm_disables_clipping() {
        let (model, grads) = model_and_grads();
        let before = global_norm(&model, &grads);

        let (same, _) = clip_by_global_norm(&model, grads, 0.0);
        assert!((global_norm(&model, &same) - before).abs() < 1e-6 * before.max(1.0));
    }

    #[test]
    fn test_schedule_decays_once_per_decay_step() {
        let schedule = LearningRateSchedule::new(0.1, 0.5, 100);
        assert_eq!(schedule.rate(0), 0.1);
        assert!((schedule.rate(100) - 0.05).abs() < 1e-12);
        assert!((schedule.rate(200) - 0.025).abs() < 1e-12);
        assert!(schedule.rate(50) < 0.1 && schedule.rate(50) > 0.05);
    }

    #[test]
    fn test_zero_decay_step_is_constant() {
        let schedule = LearningRateSchedule::new(0.01, 0.5, 0);
        assert_eq!(schedule.rate(1_000_000), 0.01);
    }
}
