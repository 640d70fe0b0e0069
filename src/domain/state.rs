// ============================================================
// Layer 3 — TrainingState
// ============================================================
// The step and epoch counters of a run. They are owned by the
// training loop, passed into and returned from each epoch, and
// written next to every checkpoint so a run can resume.
//
//   global_step — optimizer updates applied since training began
//   epoch       — epochs fully completed
//
// Resumption continues from `epoch` (the next epoch to run) while
// `global_step` keeps counting from where it stopped.

use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingState {
    pub global_step: usize,
    pub epoch:       usize,
}

impl TrainingState {
    pub fn new(global_step: usize, epoch: usize) -> Self {
        Self { global_step, epoch }
    }

    /// Record one applied optimizer update
    pub fn advance_step(&mut self) {
        self.global_step += 1;
    }

    /// Record one completed epoch
    pub fn finish_epoch(&mut self) {
        self.epoch += 1;
    }

    /// The epochs still to run before reaching `max_epoch`.
    /// Empty when the run already completed them all.
    pub fn remaining_epochs(&self, max_epoch: usize) -> Range<usize> {
        self.epoch..max_epoch.max(self.epoch)
    }
}
