// ============================================================
// Layer 5 — Output Projector
// ============================================================
// Maps recurrent outputs to vocabulary logits.
//
// Single-output mode:
//   last output [B, H] ─► Linear(H, V) ─► [B, V]
//   Predicts only the token that follows the window.
//
// Multi-output mode:
//   output_s [B, H] ─► Linear_s(H, L*V) ─► reshape ─► [B*L, V]   (one head per step)
//   Every step proposes a full distribution for every position;
//   the logits used for the loss are either the element-wise max
//   over all steps (max_pool_in_output) or simply the last step.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
};

#[derive(Module, Debug)]
pub struct OutputProjector<B: Backend> {
    heads:      Vec<Linear<B>>,
    max_seq_l:  usize,
    vocab_size: usize,
    single:     bool,
    max_pool:   bool,
}

impl<B: Backend> OutputProjector<B> {
    pub fn single(hidden_dim: usize, vocab_size: usize, device: &B::Device) -> Self {
        Self {
            heads: vec![LinearConfig::new(hidden_dim, vocab_size).init(device)],
            max_seq_l: 1,
            vocab_size,
            single: true,
            max_pool: false,
        }
    }

    pub fn per_step(
        num_steps:  usize,
        hidden_dim: usize,
        max_seq_l:  usize,
        vocab_size: usize,
        max_pool:   bool,
        device:     &B::Device,
    ) -> Self {
        let heads = (0..num_steps)
            .map(|_| LinearConfig::new(hidden_dim, max_seq_l * vocab_size).init(device))
            .collect();
        Self { heads, max_seq_l, vocab_size, single: false, max_pool }
    }

    pub fn is_single(&self) -> bool {
        self.single
    }

    /// Logits the loss is computed on. None only when `outputs` is empty.
    pub fn forward(&self, outputs: Vec<Tensor<B, 2>>) -> Option<Tensor<B, 2>> {
        if self.single {
            let last = outputs.into_iter().last()?;
            return self.heads.first().map(|head| head.forward(last));
        }

        let per_step: Vec<Tensor<B, 2>> = outputs
            .into_iter()
            .zip(self.heads.iter())
            .map(|(out, head)| {
                let [batch, _] = out.dims();
                head.forward(out).reshape([batch * self.max_seq_l, self.vocab_size])
            })
            .collect();

        select_logits(&per_step, self.max_pool)
    }
}

/// Element-wise max over every step's logits when `max_pool`,
/// otherwise the last step's logits.
pub fn select_logits<B: Backend>(per_step: &[Tensor<B, 2>], max_pool: bool) -> Option<Tensor<B, 2>> {
    if max_pool {
        per_step.iter().cloned().reduce(|acc, next| acc.max_pair(next))
    } else {
        per_step.last().cloned()
    }
}
