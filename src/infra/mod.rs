// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything a run persists, all under directories named after
// ModelConfig::model_dir():
//
//   checkpoint.rs  — model parameters (gzipped MessagePack recorder),
//                    latest.json, train_config.json
//   vocab_store.rs — the WordLevel vocabulary (vocab.json),
//                    built from the training split once and
//                    reloaded afterwards
//   summary.rs     — append-only step,tag,value CSV of scalars

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Vocabulary building, saving, and loading
pub mod vocab_store;

/// Scalar summary CSV writer
pub mod summary;
