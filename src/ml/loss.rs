// ============================================================
// Layer 5 — Sequence Loss
// ============================================================
// cost = cross_entropy + l2_penalty
//
//   cross_entropy: summed token NLL per example, i.e. the mean
//                  token cross-entropy × tokens / batch_size
//   l2_penalty:    l2 × Σ ½‖p‖² over every parameter of the model
//                  (embedding included); not built at all when l2 = 0
//
// Both the training and the evaluation path use these
// functions; only training goes on to call `.backward()`.

use burn::{
    module::{ModuleVisitor, ParamId},
    nn::loss::CrossEntropyLossConfig,
    prelude::*,
};

use crate::ml::model::{ModelOutput, RcmnModel};

pub struct LossOutput<B: Backend> {
    /// Scalar the optimizer minimises
    pub cost:          Tensor<B, 1>,
    /// Data term only; this is what perplexity is computed from
    pub cross_entropy: Tensor<B, 1>,
    pub l2:            Option<Tensor<B, 1>>,
}

/// Per-example sequence cross-entropy.
/// logits: [rows, vocab], targets: [rows], rows = batch_size × tokens per example
pub fn sequence_cost<B: Backend>(
    logits:     Tensor<B, 2>,
    targets:    Tensor<B, 1, Int>,
    batch_size: usize,
) -> Tensor<B, 1> {
    let [rows, _] = logits.dims();
    let ce = CrossEntropyLossConfig::new().init(&logits.device());
    ce.forward(logits, targets)
        .mul_scalar(rows as f64 / batch_size as f64)
}

// ─── L2 penalty ───────────────────────────────────────────────────────────────
struct HalfSquaredNorm<B: Backend> {
    total: Option<Tensor<B, 1>>,
}

impl<B: Backend> ModuleVisitor<B> for HalfSquaredNorm<B> {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
        let term = tensor.clone().powf_scalar(2.0).sum().div_scalar(2.0);
        self.total = Some(match self.total.take() {
            Some(acc) => acc + term,
            None => term,
        });
    }
}

/// `coefficient × Σ ½‖p‖²`, or None when the coefficient is 0.
pub fn l2_penalty<B: Backend, M: Module<B>>(module: &M, coefficient: f64) -> Option<Tensor<B, 1>> {
    if coefficient == 0.0 {
        return None;
    }
    let mut visitor = HalfSquaredNorm { total: None };
    module.visit(&mut visitor);
    visitor.total.map(|t| t.mul_scalar(coefficient))
}

/// Score a forward pass against its targets.
pub fn compute_loss<B: Backend>(
    model:       &RcmnModel<B>,
    output:      &ModelOutput<B>,
    targets:     Tensor<B, 2, Int>,
    l2:          f64,
) -> LossOutput<B> {
    let [batch_size, _] = targets.dims();
    let targets = model.loss_targets(targets);

    let cross_entropy = sequence_cost(output.logits.clone(), targets, batch_size);
    let l2 = l2_penalty(model, l2);

    let cost = match &l2 {
        Some(penalty) => cross_entropy.clone() + penalty.clone(),
        None => cross_entropy.clone(),
    };
    LossOutput { cost, cross_entropy, l2 }
}
