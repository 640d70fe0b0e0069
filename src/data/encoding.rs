// ============================================================
// Layer 4 — Corpus Encoding
// ============================================================
// Turns the raw text of each split into a flat array of
// vocabulary ids, one <eos> after every line.
//
// The same tokenizer encodes all three splits, so words that
// only appear in validation or test map to <unk>.

use anyhow::{bail, Context, Result};
use tokenizers::Tokenizer;

use crate::domain::corpus::{RawCorpus, TokenCorpus, EOS_TOKEN};

/// Encode every line of `text`, appending the <eos> id per line.
pub fn encode_text(text: &str, tokenizer: &Tokenizer) -> Result<Vec<u32>> {
    let eos = tokenizer
        .token_to_id(EOS_TOKEN)
        .with_context(|| format!("vocabulary has no '{EOS_TOKEN}' token"))?;

    let mut ids = Vec::with_capacity(text.len() / 4);
    for line in text.lines() {
        let enc = tokenizer
            .encode(line, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
        ids.extend_from_slice(enc.get_ids());
        ids.push(eos);
    }
    Ok(ids)
}

/// Encode all three splits and check the vocabulary fits the
/// model's output layer.
pub fn encode_corpus(
    raw:        &RawCorpus,
    tokenizer:  &Tokenizer,
    vocab_size: usize,
) -> Result<TokenCorpus> {
    let actual = tokenizer.get_vocab_size(false);
    if actual > vocab_size {
        bail!(
            "vocabulary has {actual} words but the model is configured for vocab_size={vocab_size}"
        );
    }

    let corpus = TokenCorpus::new(
        encode_text(&raw.train, tokenizer).context("encoding train split")?,
        encode_text(&raw.valid, tokenizer).context("encoding valid split")?,
        encode_text(&raw.test,  tokenizer).context("encoding test split")?,
        actual,
    );

    tracing::info!(
        "Encoded corpus: {} tokens ({} train / {} valid / {} test), {} word vocabulary",
        corpus.total_tokens(),
        corpus.train.len(),
        corpus.valid.len(),
        corpus.test.len(),
        actual,
    );
    Ok(corpus)
}
