// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums, and traits describing what the
// system works with: settings, token corpora, windows, and the
// training counters.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// Closed sets of configuration choices (cell kind, optimizer, ...)
pub mod settings;

// Raw and encoded corpora
pub mod corpus;

// One (x, y) window of token ids
pub mod window;

// Step / epoch counters persisted with checkpoints
pub mod state;

// Core abstractions (traits) that other layers implement
pub mod traits;
