// ============================================================
// Layer 3 — TokenWindow Domain Type
// ============================================================
// One step's worth of training data: an input matrix `x` and the
// target matrix `y`, which is `x` shifted one token to the right.
//
//   x[r] = row r of the corpus, tokens i*L .. (i+1)*L
//   y[r] = row r of the corpus, tokens i*L+1 .. (i+1)*L+1
//
// Both are stored row-major as flat Vecs of shape
// [batch_size, seq_len] so they can go straight into a tensor.

/// A `(x, y)` pair of `[batch_size, seq_len]` token matrices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenWindow {
    pub inputs:     Vec<u32>,
    pub targets:    Vec<u32>,
    pub batch_size: usize,
    pub seq_len:    usize,
}

impl TokenWindow {
    /// Row `r` of the input matrix
    pub fn input_row(&self, r: usize) -> &[u32] {
        &self.inputs[r * self.seq_len..(r + 1) * self.seq_len]
    }

    /// Row `r` of the target matrix
    pub fn target_row(&self, r: usize) -> &[u32] {
        &self.targets[r * self.seq_len..(r + 1) * self.seq_len]
    }
}
