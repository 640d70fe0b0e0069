// ============================================================
// Layer 3 — Token Corpus Domain Types
// ============================================================
// A corpus, once read and encoded, is nothing more than three
// flat arrays of vocabulary ids plus the size of the vocabulary
// they index into. Window and batch construction happens later
// in the data layer.

use serde::{Deserialize, Serialize};

/// Appended after every line of text
pub const EOS_TOKEN: &str = "<eos>";
/// Stands in for any word outside the vocabulary
pub const UNK_TOKEN: &str = "<unk>";

/// Raw text of the three splits, before tokenisation.
#[derive(Debug, Clone, Default)]
pub struct RawCorpus {
    pub train: String,
    pub valid: String,
    pub test:  String,
}

/// Integer-token arrays for train / validation / test.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenCorpus {
    pub train:      Vec<u32>,
    pub valid:      Vec<u32>,
    pub test:       Vec<u32>,
    /// Number of distinct ids the vocabulary can produce
    pub vocab_size: usize,
}

impl TokenCorpus {
    pub fn new(train: Vec<u32>, valid: Vec<u32>, test: Vec<u32>, vocab_size: usize) -> Self {
        Self { train, valid, test, vocab_size }
    }

    /// Total number of tokens across all three splits
    pub fn total_tokens(&self) -> usize {
        self.train.len() + self.valid.len() + self.test.len()
    }
}

/// Which split of the corpus a pass runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Valid,
    Test,
}

impl Split {
    pub fn name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Valid => "valid",
            Split::Test  => "test",
        }
    }

    pub fn tokens<'a>(&self, corpus: &'a TokenCorpus) -> &'a [u32] {
        match self {
            Split::Train => &corpus.train,
            Split::Valid => &corpus.valid,
            Split::Test  => &corpus.test,
        }
    }
}
