// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Builds, saves, and reloads the word-level vocabulary as a
// HuggingFace `tokenizers` WordLevel tokenizer.
//
// Vocabulary rules (the classic PTB reader convention):
//   - every line ends with an <eos> token
//   - words are ranked by descending frequency, ties broken
//     alphabetically, and get ids 0, 1, 2, ... in that order
//   - <unk> is always present so unseen words have an id
//   - at most `vocab_size` entries are kept
//
// The tokenizer JSON is written by hand and loaded back with
// Tokenizer::from_file, which avoids the trainer/ModelWrapper
// type juggling of the tokenizers training API.
//
// Pre-tokenizer is WhitespaceSplit (not Whitespace) so that
// tokens like "<unk>", "n't" and "$" survive intact.

use anyhow::{Context, Result};
use std::{collections::HashMap, path::PathBuf};
use tokenizers::Tokenizer;

use crate::domain::corpus::{EOS_TOKEN, UNK_TOKEN};

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join("vocab.json")
    }

    /// Load the saved vocabulary, or build one from `train_text`
    pub fn load_or_build(&self, train_text: &str, vocab_size: usize) -> Result<Tokenizer> {
        if self.path().exists() {
            tracing::info!("Loading existing vocabulary from '{}'", self.path().display());
            self.load()
        } else {
            tracing::info!("Building new vocabulary (vocab_size={})", vocab_size);
            self.build_and_save(train_text, vocab_size)
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!(
                "Cannot load vocabulary from '{}': {}", path.display(), e
            ))
    }

    fn build_and_save(&self, train_text: &str, vocab_size: usize) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let words = rank_words(train_text, vocab_size);

        let vocab: serde_json::Map<String, serde_json::Value> = words
            .iter()
            .enumerate()
            .map(|(id, w)| (w.clone(), serde_json::json!(id)))
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": { "type": "WhitespaceSplit" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": UNK_TOKEN
            }
        });

        let path = self.path();
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write vocabulary to '{}'", path.display()))?;

        tracing::info!("Vocabulary built with {} words, saved to '{}'", words.len(), path.display());

        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot reload vocabulary: {e}"))
    }
}

/// Words of `text` in id order: frequency descending, then
/// alphabetical. <eos> is counted once per line and <unk> is
/// guaranteed a slot even if the text never contains it.
pub fn rank_words(text: &str, vocab_size: usize) -> Vec<String> {
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for line in text.lines() {
        for word in line.split_whitespace() {
            *freq.entry(word).or_insert(0) += 1;
        }
        *freq.entry(EOS_TOKEN).or_insert(0) += 1;
    }

    let mut ranked: Vec<(&str, usize)> = freq.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut words: Vec<String> = ranked
        .into_iter()
        .map(|(w, _)| w.to_string())
        .take(vocab_size)
        .collect();

    if !words.iter().any(|w| w == UNK_TOKEN) {
        if words.len() >= vocab_size {
            words.pop();
        }
        words.push(UNK_TOKEN.to_string());
    }
    words
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_by_frequency_then_alphabet() {
        let words = rank_words("b a b\nc a b\n", 100);
        // b:3, <eos>:2, a:2, c:1 — ties sorted alphabetically
        assert_eq!(words, vec!["b", "<eos>", "a", "c", "<unk>"]);
    }

    #[test]
    fn test_truncation_keeps_unk() {
        let words = rank_words("a a a b b c\n", 3);
        assert_eq!(words.len(), 3);
        assert_eq!(words.last().unwrap(), UNK_TOKEN);
    }

    #[test]
    fn test_existing_unk_is_not_duplicated() {
        let words = rank_words("<unk> x <unk>\n", 10);
        assert_eq!(words.iter().filter(|w| *w == UNK_TOKEN).count(), 1);
    }

    #[test]
    fn test_build_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = VocabStore::new(dir.path());

        let built = store.load_or_build("the cat the\nthe dog\n", 50).unwrap();
        assert!(dir.path().join("vocab.json").exists());

        let reloaded = store.load_or_build("ignored text", 50).unwrap();
        assert_eq!(built.get_vocab_size(false), reloaded.get_vocab_size(false));
        assert_eq!(reloaded.token_to_id("the"), Some(0));
    }
}
