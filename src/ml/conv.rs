// ============================================================
// Layer 5 — Convolutional Feature Stack
// ============================================================
// Turns one embedded token window into `num_steps` feature
// vectors, one per synthetic step of the recurrent encoder.
//
// Each synthetic step owns a cascade of 1-D convolutions over
// the sequence axis (channels = embedding / feature depth). The
// steps are chained: step 0 reads the embedded window, every
// later step reads the last feature map of the step before it.
//
//   embedded [B, L, E] ─► swap ─► [B, E, L]
//        │
//        ▼
//   step 0: conv(w=1, d=num_ks[0]) ─► conv(w1, d1) ─► ... ─► map₀ ─► flatten ─► feature₀
//                                                            │
//        ┌───────────────────────────────────────────────────┘
//        ▼
//   step 1: conv(w0, d0) ─► conv(w1, d1) ─► ... ─► map₁ ─► flatten ─► feature₁
//        ...
//
// Weights are never shared between steps. The stages are kept in
// an explicit registry addressed by ConvStageKey
// (step, stage, width, depth).
//
// Every convolution pads the tail of the sequence with width-1
// zeros, so the length stays L through the cascade and every
// step flattens to the same width: num_ks.last() * L.

use burn::{
    nn::conv::{Conv1d, Conv1dConfig},
    prelude::*,
};

/// Address of one convolution stage in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConvStageKey {
    pub step:  usize,
    pub stage: usize,
    pub width: usize,
    pub depth: usize,
}

impl ConvStageKey {
    /// Stable name, e.g. `conv_S1_I0_W2_D5`
    pub fn name(&self) -> String {
        format!("conv_S{}_I{}_W{}_D{}", self.step, self.stage, self.width, self.depth)
    }
}

/// Lay out every stage of every step. Stage 0 of step 0 looks at
/// single tokens only: its width is forced to 1.
pub fn conv_plan(num_steps: usize, k_widths: &[usize], num_ks: &[usize]) -> Vec<Vec<ConvStageKey>> {
    (0..num_steps)
        .map(|step| {
            k_widths
                .iter()
                .zip(num_ks.iter())
                .enumerate()
                .map(|(stage, (&width, &depth))| {
                    let (width, depth) = if step == 0 && stage == 0 {
                        (1, num_ks[0])
                    } else {
                        (width, depth)
                    };
                    ConvStageKey { step, stage, width, depth }
                })
                .collect()
        })
        .collect()
}

// ─── ConvCascade ──────────────────────────────────────────────────────────────
/// The convolution stages of a single synthetic step.
#[derive(Module, Debug)]
pub struct ConvCascade<B: Backend> {
    stages: Vec<Conv1d<B>>,
    widths: Vec<usize>,
}

impl<B: Backend> ConvCascade<B> {
    fn new(keys: &[ConvStageKey], in_channels: usize, device: &B::Device) -> Self {
        let mut in_channels = in_channels;
        let mut stages = Vec::with_capacity(keys.len());
        for key in keys {
            stages.push(Conv1dConfig::new(in_channels, key.depth, key.width).init(device));
            in_channels = key.depth;
        }
        Self {
            stages,
            widths: keys.iter().map(|k| k.width).collect(),
        }
    }

    /// [B, C, L] → [B, depth_last, L]
    fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let mut h = x;
        for (conv, &width) in self.stages.iter().zip(self.widths.iter()) {
            h = conv.forward(pad_tail(h, width - 1));
        }
        h
    }

    fn out_channels(&self) -> Option<usize> {
        self.stages.last().map(|conv| conv.weight.val().dims()[0])
    }
}

/// Append `amount` zero columns to the end of the sequence axis.
fn pad_tail<B: Backend>(x: Tensor<B, 3>, amount: usize) -> Tensor<B, 3> {
    if amount == 0 {
        return x;
    }
    let [batch, channels, _] = x.dims();
    let zeros = Tensor::zeros([batch, channels, amount], &x.device());
    Tensor::cat(vec![x, zeros], 2)
}

// ─── ConvFeatureStack ─────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ConvFeatureStack<B: Backend> {
    steps: Vec<ConvCascade<B>>,
}

impl<B: Backend> ConvFeatureStack<B> {
    pub fn new(plan: &[Vec<ConvStageKey>], embed_dim: usize, device: &B::Device) -> Self {
        let mut steps: Vec<ConvCascade<B>> = Vec::with_capacity(plan.len());
        for keys in plan {
            let in_channels = steps
                .last()
                .and_then(ConvCascade::out_channels)
                .unwrap_or(embed_dim);
            steps.push(ConvCascade::new(keys, in_channels, device));
        }
        Self { steps }
    }

    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }

    /// Look up the convolution registered under `key`
    pub fn stage(&self, key: &ConvStageKey) -> Option<&Conv1d<B>> {
        let cascade = self.steps.get(key.step)?;
        match cascade.widths.get(key.stage) {
            Some(&width) if width == key.width => cascade.stages.get(key.stage),
            _ => None,
        }
    }

    /// embedded: [batch, seq_len, embed_dim] → num_steps × [batch, feature_width]
    pub fn forward(&self, embedded: Tensor<B, 3>) -> Vec<Tensor<B, 2>> {
        let mut map = embedded.swap_dims(1, 2);
        let mut features = Vec::with_capacity(self.steps.len());
        for cascade in &self.steps {
            map = cascade.forward(map);
            features.push(map.clone().flatten::<2>(1, 2));
        }
        features
    }
}
