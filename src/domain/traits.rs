// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between the training core and its collaborators.
// The application and ML layers only see these traits, so the
// PTB reader or the CSV summary writer can be swapped without
// touching the training loop.

use anyhow::Result;
use crate::domain::corpus::RawCorpus;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can load the raw text of a corpus.
///
/// Implementations:
///   - PtbLoader → reads ptb.{train,valid,test}.txt from a directory
pub trait CorpusSource {
    /// Load the train / validation / test text
    fn load(&self) -> Result<RawCorpus>;
}

// ─── SummarySink ──────────────────────────────────────────────────────────────
/// Append-only channel for scalar training summaries.
///
/// Implementations:
///   - SummaryWriter → appends `step,tag,value` rows to a CSV file
pub trait SummarySink {
    /// Record `value` under `tag` at the given global step
    fn add_scalar(&self, step: usize, tag: &str, value: f64) -> Result<()>;
}
