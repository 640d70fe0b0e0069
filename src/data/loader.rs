// ============================================================
// Layer 4 — PTB Corpus Loader
// ============================================================
// Reads the Penn Treebank language-modelling corpus from disk.
//
// Expected directory layout:
//   data/ptb/
//     ptb.train.txt
//     ptb.valid.txt
//     ptb.test.txt
//
// The files are already tokenised: one sentence per line, words
// separated by spaces, rare words replaced by <unk>. The loader
// only reads the text; turning it into ids is done by the
// vocabulary (see data::encoding).
//
// A missing file is a resource error and is propagated to the
// caller — training cannot proceed without all three splits.

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::corpus::RawCorpus;
use crate::domain::traits::CorpusSource;

/// Loads the three PTB split files from a directory.
/// Implements the CorpusSource trait from Layer 3.
pub struct PtbLoader {
    dir: PathBuf,
}

impl PtbLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn split_path(&self, split: &str) -> PathBuf {
        self.dir.join(format!("ptb.{split}.txt"))
    }
}

impl CorpusSource for PtbLoader {
    fn load(&self) -> Result<RawCorpus> {
        let corpus = RawCorpus {
            train: read_split(&self.split_path("train"))?,
            valid: read_split(&self.split_path("valid"))?,
            test:  read_split(&self.split_path("test"))?,
        };

        tracing::info!(
            "Loaded PTB corpus from '{}' ({} / {} / {} bytes)",
            self.dir.display(),
            corpus.train.len(),
            corpus.valid.len(),
            corpus.test.len(),
        );
        Ok(corpus)
    }
}

fn read_split(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("Cannot read dataset file '{}'", path.display()))
}
