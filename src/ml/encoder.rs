// ============================================================
// Layer 5 — Recurrent Encoder
// ============================================================
// A stack of GRU or LSTM layers driven one synthetic step at a
// time. At each step the feature vector enters layer 0, every
// layer updates its own state, and the output of layer k is the
// input of layer k+1:
//
//   feature_s ─► layer 0 ─► layer 1 ─► ... ─► output_s
//                  │ h₀        │ h₁
//                  ▼           ▼
//               (state carried to step s+1)
//
// The number of steps is fixed by the convolution stack, so the
// encoder simply walks the list of features it is given.
//
// RecurrentState is a plain value: the model takes it in and
// hands the updated one back. The training loop carries it from
// one window to the next (detached from the autodiff graph) and
// replaces it with zeros at the start of every epoch.

use anyhow::{bail, Result};
use burn::{
    nn::{
        gru::{Gru, GruConfig},
        lstm::{Lstm, LstmConfig, LstmState},
        Dropout, DropoutConfig,
    },
    prelude::*,
};

use crate::domain::settings::RnnType;

// ─── RecurrentState ───────────────────────────────────────────────────────────
/// Hidden state of one layer: `h` for GRU, `(c, h)` for LSTM.
/// Every tensor is [batch, hidden_dim].
#[derive(Debug, Clone)]
pub enum LayerState<B: Backend> {
    Gru { hidden: Tensor<B, 2> },
    Lstm { cell: Tensor<B, 2>, hidden: Tensor<B, 2> },
}

impl<B: Backend> LayerState<B> {
    pub fn hidden(&self) -> &Tensor<B, 2> {
        match self {
            Self::Gru { hidden } | Self::Lstm { hidden, .. } => hidden,
        }
    }

    pub fn kind(&self) -> RnnType {
        match self {
            Self::Gru { .. } => RnnType::Gru,
            Self::Lstm { .. } => RnnType::Lstm,
        }
    }

    fn detach(self) -> Self {
        match self {
            Self::Gru { hidden } => Self::Gru { hidden: hidden.detach() },
            Self::Lstm { cell, hidden } => Self::Lstm {
                cell:   cell.detach(),
                hidden: hidden.detach(),
            },
        }
    }
}

/// State of the whole stack, one entry per layer.
#[derive(Debug, Clone)]
pub struct RecurrentState<B: Backend> {
    pub layers: Vec<LayerState<B>>,
}

impl<B: Backend> RecurrentState<B> {
    pub fn zeros(
        kind:       RnnType,
        num_layers: usize,
        batch_size: usize,
        hidden_dim: usize,
        device:     &B::Device,
    ) -> Self {
        let zero = || Tensor::<B, 2>::zeros([batch_size, hidden_dim], device);
        let layers = (0..num_layers)
            .map(|_| match kind {
                RnnType::Gru => LayerState::Gru { hidden: zero() },
                RnnType::Lstm => LayerState::Lstm { cell: zero(), hidden: zero() },
            })
            .collect();
        Self { layers }
    }

    /// Cut the autograd history so the next window does not
    /// backpropagate into this one.
    pub fn detach(self) -> Self {
        Self {
            layers: self.layers.into_iter().map(LayerState::detach).collect(),
        }
    }
}

// ─── RecurrentLayer ───────────────────────────────────────────────────────────
/// Exactly one of `gru` / `lstm` is set.
#[derive(Module, Debug)]
pub struct RecurrentLayer<B: Backend> {
    gru:  Option<Gru<B>>,
    lstm: Option<Lstm<B>>,
}

impl<B: Backend> RecurrentLayer<B> {
    fn new(kind: RnnType, d_input: usize, d_hidden: usize, device: &B::Device) -> Self {
        match kind {
            RnnType::Gru => Self {
                gru:  Some(GruConfig::new(d_input, d_hidden, true).init(device)),
                lstm: None,
            },
            RnnType::Lstm => Self {
                gru:  None,
                lstm: Some(LstmConfig::new(d_input, d_hidden, true).init(device)),
            },
        }
    }

    fn kind(&self) -> RnnType {
        match self.gru {
            Some(_) => RnnType::Gru,
            None => RnnType::Lstm,
        }
    }

    /// One step: input [batch, d_input] → (output [batch, hidden], new state)
    fn step(&self, input: Tensor<B, 2>, state: LayerState<B>) -> Result<(Tensor<B, 2>, LayerState<B>)> {
        let [batch, _] = input.dims();
        // The burn cells take a [batch, seq, d] sequence; ours has length 1.
        let input = input.unsqueeze_dim::<3>(1);

        match (state, &self.gru, &self.lstm) {
            (LayerState::Gru { hidden }, Some(gru), _) => {
                let out = gru.forward(input, Some(hidden.unsqueeze_dim::<3>(1)));
                let [_, _, d_hidden] = out.dims();
                let hidden = out.reshape([batch, d_hidden]);
                Ok((hidden.clone(), LayerState::Gru { hidden }))
            }
            (LayerState::Lstm { cell, hidden }, _, Some(lstm)) => {
                let (_, next) = lstm.forward(input, Some(LstmState::new(cell, hidden)));
                let hidden = next.hidden;
                Ok((hidden.clone(), LayerState::Lstm { cell: next.cell, hidden }))
            }
            (other, _, _) => bail!(
                "recurrent state of kind {} ({:?}) does not match a {} layer",
                other.kind(),
                other.hidden().dims(),
                self.kind()
            ),
        }
    }
}

// ─── RecurrentEncoder ─────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct RecurrentEncoder<B: Backend> {
    layers:         Vec<RecurrentLayer<B>>,
    /// Present only when output dropout is switched on
    output_dropout: Option<Dropout>,
    hidden_dim:     usize,
}

impl<B: Backend> RecurrentEncoder<B> {
    pub fn new(
        kind:           RnnType,
        input_dim:      usize,
        hidden_dim:     usize,
        num_layers:     usize,
        output_dropout: Option<f64>,
        device:         &B::Device,
    ) -> Self {
        let layers = (0..num_layers)
            .map(|i| {
                let d_input = if i == 0 { input_dim } else { hidden_dim };
                RecurrentLayer::new(kind, d_input, hidden_dim, device)
            })
            .collect();
        Self {
            layers,
            output_dropout: output_dropout.map(|p| DropoutConfig::new(p).init()),
            hidden_dim,
        }
    }

    pub fn kind(&self) -> RnnType {
        self.layers.first().map_or(RnnType::Lstm, RecurrentLayer::kind)
    }

    pub fn has_output_dropout(&self) -> bool {
        self.output_dropout.is_some()
    }

    pub fn zero_state(&self, batch_size: usize, device: &B::Device) -> RecurrentState<B> {
        RecurrentState::zeros(self.kind(), self.layers.len(), batch_size, self.hidden_dim, device)
    }

    /// Advance the whole stack by one synthetic step.
    fn step(&self, input: Tensor<B, 2>, state: RecurrentState<B>) -> Result<(Tensor<B, 2>, RecurrentState<B>)> {
        if state.layers.len() != self.layers.len() {
            bail!(
                "recurrent state has {} layers, the encoder has {}",
                state.layers.len(),
                self.layers.len()
            );
        }
        let mut x = input;
        let mut next = Vec::with_capacity(self.layers.len());

        for (layer, layer_state) in self.layers.iter().zip(state.layers) {
            let (out, s) = layer.step(x, layer_state)?;
            x = match &self.output_dropout {
                Some(dropout) => dropout.forward(out),
                None => out,
            };
            next.push(s);
        }
        Ok((x, RecurrentState { layers: next }))
    }

    /// Consume the features in order; returns one output per
    /// feature ([batch, hidden_dim] each) and the final state.
    pub fn forward(
        &self,
        features: Vec<Tensor<B, 2>>,
        state:    RecurrentState<B>,
    ) -> Result<(Vec<Tensor<B, 2>>, RecurrentState<B>)> {
        let mut outputs = Vec::with_capacity(features.len());
        let mut state = state;
        for feature in features {
            let (out, next) = self.step(feature, state)?;
            outputs.push(out);
            state = next;
        }
        Ok((outputs, state))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, module::AutodiffModule};

    type TestBackend = NdArray;

    fn features(n: usize, batch: usize, width: usize) -> Vec<Tensor<TestBackend, 2>> {
        let device = Default::default();
        (0..n)
            .map(|i| Tensor::<TestBackend, 2>::ones([batch, width], &device).mul_scalar(i as f32))
            .collect()
    }

    #[test]
    fn test_gru_stack_shapes() {
        let device = Default::default();
        let enc = RecurrentEncoder::<TestBackend>::new(RnnType::Gru, 6, 4, 3, None, &device);
        let state = enc.zero_state(2, &device);
        assert_eq!(state.layers.len(), 3);

        let (outputs, state) = enc.forward(features(5, 2, 6), state).unwrap();
        assert_eq!(outputs.len(), 5);
        for out in &outputs {
            assert_eq!(out.dims(), [2, 4]);
        }
        assert!(matches!(state.layers[2], LayerState::Gru { .. }));
    }

    #[test]
    fn test_lstm_stack_carries_cell_state() {
        let device = Default::default();
        let enc = RecurrentEncoder::<TestBackend>::new(RnnType::Lstm, 6, 4, 2, None, &device);
        let (outputs, state) = enc.forward(features(3, 2, 6), enc.zero_state(2, &device)).unwrap();

        assert_eq!(outputs.len(), 3);
        match &state.layers[1] {
            LayerState::Lstm { cell, hidden } => {
                assert_eq!(cell.dims(), [2, 4]);
                assert_eq!(hidden.dims(), [2, 4]);
            }
            other => panic!("expected LSTM state, got {other:?}"),
        }
    }

    #[test]
    fn test_last_output_is_top_layer_hidden_state() {
        let device = Default::default();
        let enc = RecurrentEncoder::<TestBackend>::new(RnnType::Gru, 3, 5, 2, None, &device);
        let (outputs, state) = enc.forward(features(4, 1, 3), enc.zero_state(1, &device)).unwrap();

        let last: Vec<f32> = outputs[3].clone().into_data().to_vec().unwrap();
        let top: Vec<f32> = state.layers[1].hidden().clone().into_data().to_vec().unwrap();
        assert_eq!(last, top);
    }

    #[test]
    fn test_gru_state_feeds_next_step() {
        let device = Default::default();
        let enc = RecurrentEncoder::<TestBackend>::new(RnnType::Gru, 3, 4, 1, None, &device);
        let input = features(2, 2, 3).remove(1);

        let (from_zero, _) = enc.step(input.clone(), enc.zero_state(2, &device)).unwrap();
        let warm = RecurrentState {
            layers: vec![LayerState::Gru { hidden: Tensor::ones([2, 4], &device) }],
        };
        let (from_warm, _) = enc.step(input, warm).unwrap();

        let a: Vec<f32> = from_zero.into_data().to_vec().unwrap();
        let b: Vec<f32> = from_warm.into_data().to_vec().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_state_of_wrong_kind_is_an_error() {
        let device = Default::default();
        let enc = RecurrentEncoder::<TestBackend>::new(RnnType::Gru, 3, 4, 2, None, &device);
        let lstm_state = RecurrentState::<TestBackend>::zeros(RnnType::Lstm, 2, 1, 4, &device);

        let err = enc.forward(features(2, 1, 3), lstm_state).unwrap_err();
        assert!(err.to_string().contains("does not match"), "{err}");
    }

    #[test]
    fn test_output_dropout_active_only_with_autodiff() {
        type AdBackend = burn::backend::Autodiff<NdArray>;
        let device = Default::default();
        let enc = RecurrentEncoder::<AdBackend>::new(RnnType::Lstm, 6, 16, 2, Some(0.5), &device);
        assert!(enc.output_dropout.is_some());

        let inputs: Vec<Tensor<AdBackend, 2>> = (1..4)
            .map(|i| Tensor::<AdBackend, 2>::ones([4, 6], &device).mul_scalar(i as f32))
            .collect();
        let run = |enc: &RecurrentEncoder<AdBackend>| -> Vec<f32> {
            let (out, _) = enc.forward(inputs.clone(), enc.zero_state(4, &device)).unwrap();
            out[2].clone().into_data().to_vec().unwrap()
        };
        assert_ne!(run(&enc), run(&enc));

        let inner = enc.valid();
        let inner_inputs: Vec<Tensor<TestBackend, 2>> = inputs.iter().map(|t| t.clone().inner()).collect();
        let run_inner = || -> Vec<f32> {
            let (out, _) = inner
                .forward(inner_inputs.clone(), inner.zero_state(4, &device))
                .unwrap();
            out[2].clone().into_data().to_vec().unwrap()
        };
        assert_eq!(run_inner(), run_inner());

        let plain = RecurrentEncoder::<TestBackend>::new(RnnType::Lstm, 6, 16, 2, None, &device);
        assert!(plain.output_dropout.is_none());
    }

    #[test]
    fn test_zero_state_is_zero() {
        let device = Default::default();
        let state = RecurrentState::<TestBackend>::zeros(RnnType::Lstm, 2, 3, 4, &device);
        let sum: f32 = state.layers[0].hidden().clone().sum().into_scalar();
        assert_eq!(sum, 0.0);
    }
}
