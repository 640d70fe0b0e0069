// ============================================================
// Layer 6 — Summary Writer
// ============================================================
// Appends scalar training summaries to a CSV file:
//
//   <log_dir>/<model_dir>/summaries.csv
//
//   step,tag,value
//   100,loss,132.418274
//   100,perplexity,812.337120
//   100,learning_rate,0.001000
//   100,grad_norm,4.216531
//   ...
//
// The file is only ever appended to, so a resumed run keeps
// adding rows after the ones of the previous session.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::traits::SummarySink;

pub struct SummaryWriter {
    csv_path: PathBuf,
}

impl SummaryWriter {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create log directory '{}'", dir.display()))?;

        let csv_path = dir.join("summaries.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "step,tag,value")?;
            tracing::debug!("Created summary CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

impl SummarySink for SummaryWriter {
    fn add_scalar(&self, step: usize, tag: &str, value: f64) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;
        writeln!(f, "{step},{tag},{value:.6}")?;
        Ok(())
    }
}
