// ============================================================
// Layer 4 — Window Batcher
// ============================================================
// Implements Burn's Batcher trait to turn TokenWindows into
// tensors on the training device.
//
// How batching works here:
//   Input:  Vec of N windows, each [batch_size, seq_len]
//   Output: TokenBatch with tensors of shape [N * batch_size, seq_len]
//
// The training loop feeds one window at a time (N = 1), because
// consecutive windows must stay in order for the recurrent state
// to line up across steps.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::window::TokenWindow;

// ─── TokenBatch ───────────────────────────────────────────────────────────────
/// Input and target token ids for one training step.
#[derive(Debug, Clone)]
pub struct TokenBatch<B: Backend> {
    /// Input ids — shape: [batch_size, seq_len]
    pub inputs: Tensor<B, 2, Int>,

    /// Target ids (inputs shifted by one) — shape: [batch_size, seq_len]
    pub targets: Tensor<B, 2, Int>,
}

// ─── WindowBatcher ────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct WindowBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> WindowBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<TokenWindow, TokenBatch<B>> for WindowBatcher<B> {
    fn batch(&self, items: Vec<TokenWindow>) -> TokenBatch<B> {
        let seq_len = items.first().map(|w| w.seq_len).unwrap_or(0);
        let rows: usize = items.iter().map(|w| w.batch_size).sum();

        // Burn uses i32 for Int tensors; rows are stacked window by window
        let input_flat: Vec<i32> = items
            .iter()
            .flat_map(|w| (0..w.batch_size).flat_map(move |r| w.input_row(r)))
            .map(|&t| t as i32)
            .collect();

        let target_flat: Vec<i32> = items
            .iter()
            .flat_map(|w| (0..w.batch_size).flat_map(move |r| w.target_row(r)))
            .map(|&t| t as i32)
            .collect();

        let inputs = Tensor::<B, 1, Int>::from_ints(
            input_flat.as_slice(), &self.device
        ).reshape([rows, seq_len]);

        let targets = Tensor::<B, 1, Int>::from_ints(
            target_flat.as_slice(), &self.device
        ).reshape([rows, seq_len]);

        TokenBatch { inputs, targets }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_batch_keeps_row_major_layout() {
        let window = TokenWindow {
            inputs:     vec![1, 2, 3, 4, 5, 6],
            targets:    vec![2, 3, 4, 5, 6, 7],
            batch_size: 2,
            seq_len:    3,
        };
        let batcher = WindowBatcher::<NdArray>::new(Default::default());
        let batch = batcher.batch(vec![window]);

        assert_eq!(batch.inputs.dims(), [2, 3]);
        assert_eq!(batch.targets.dims(), [2, 3]);

        let second_row: Vec<i64> = batch.inputs
            .slice([1..2, 0..3])
            .into_data()
            .convert::<i64>()
            .to_vec()
            .unwrap();
        assert_eq!(second_row, vec![4, 5, 6]);
    }
}
