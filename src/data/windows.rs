// ============================================================
// Layer 4 — Token Windows
// ============================================================
// Cuts a flat token array into the (x, y) windows the language
// model trains on.
//
// How windowing works:
//   1. The array is laid out as `batch_size` parallel rows of
//      `batch_len = len / batch_size` tokens (the tail that does
//      not fill a whole row is dropped).
//   2. Window i takes columns i*L .. (i+1)*L of every row as x,
//      and the same columns shifted by one as y.
//
//   row 0: [t0  t1  t2  t3 | t4  t5  t6  t7 | ...]
//   row 1: [u0  u1  u2  u3 | u4  u5  u6  u7 | ...]
//            └── window 0 ──┘└── window 1 ──┘
//
// Because each row is a contiguous stretch of text, window i+1
// continues exactly where window i stopped. That is what lets
// the training loop carry recurrent state from one step to the
// next within an epoch.
//
// TokenWindows implements Burn's Dataset trait, so a pass over
// a split is simply `windows.iter()`.

use anyhow::{bail, Result};
use burn::data::dataset::Dataset;

use crate::domain::window::TokenWindow;

/// Number of windows an array of `data_len` tokens yields.
pub fn epoch_size(data_len: usize, batch_size: usize, seq_len: usize) -> usize {
    if batch_size == 0 || seq_len == 0 {
        return 0;
    }
    (data_len / batch_size).saturating_sub(1) / seq_len
}

/// All windows of one split, in order.
pub struct TokenWindows<'a> {
    data:       &'a [u32],
    batch_size: usize,
    seq_len:    usize,
    batch_len:  usize,
    epoch_size: usize,
}

impl<'a> TokenWindows<'a> {
    /// Fails when the split is too short to produce a single window.
    pub fn new(data: &'a [u32], batch_size: usize, seq_len: usize) -> Result<Self> {
        let epoch_size = epoch_size(data.len(), batch_size, seq_len);
        if epoch_size == 0 {
            bail!(
                "epoch size is 0 for {} tokens: decrease batch_size ({}) or max_seq_l ({})",
                data.len(),
                batch_size,
                seq_len
            );
        }
        Ok(Self {
            data,
            batch_size,
            seq_len,
            batch_len: data.len() / batch_size,
            epoch_size,
        })
    }

    pub fn epoch_size(&self) -> usize {
        self.epoch_size
    }
}

impl Dataset<TokenWindow> for TokenWindows<'_> {
    fn get(&self, index: usize) -> Option<TokenWindow> {
        if index >= self.epoch_size {
            return None;
        }

        let cap = self.batch_size * self.seq_len;
        let mut inputs  = Vec::with_capacity(cap);
        let mut targets = Vec::with_capacity(cap);

        for row in 0..self.batch_size {
            let start = row * self.batch_len + index * self.seq_len;
            inputs.extend_from_slice(&self.data[start..start + self.seq_len]);
            targets.extend_from_slice(&self.data[start + 1..start + self.seq_len + 1]);
        }

        Some(TokenWindow {
            inputs,
            targets,
            batch_size: self.batch_size,
            seq_len:    self.seq_len,
        })
    }

    fn len(&self) -> usize {
        self.epoch_size
    }
}
