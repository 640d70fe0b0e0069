// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From PTB text files to tensor batches:
//
//   ptb.{train,valid,test}.txt
//       │
//       ▼
//   PtbLoader       → reads the three splits          (loader.rs)
//       │
//       ▼
//   encode_corpus   → word ids, <eos> after each line (encoding.rs)
//       │
//       ▼
//   TokenWindows    → Burn Dataset of (x, y) windows  (windows.rs)
//       │
//       ▼
//   WindowBatcher   → Burn Batcher → Int tensors      (batcher.rs)
//
// The vocabulary itself is persisted by infra::vocab_store.

/// Reads the PTB split files from the dataset directory
pub mod loader;

/// Converts text to token ids with the run's vocabulary
pub mod encoding;

/// Implements Burn's Dataset trait over ordered token windows
pub mod windows;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
