// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that touches Burn modules, tensors, and optimizers.
//
//   conv.rs       — per-step convolution cascades (feature stack)
//   encoder.rs    — multi-layer GRU / LSTM driven step by step
//   projector.rs  — recurrent outputs → vocabulary logits
//   model.rs      — RcmnConfig / RcmnModel wiring the three together
//   loss.rs       — sequence cross-entropy + L2 penalty
//   optim.rs      — global-norm clipping, learning-rate schedule
//   progress.rs   — running perplexity, throughput, step cadence
//   trainer.rs    — the training loop with resume + checkpoints
//   evaluator.rs  — forward + loss only, for valid / test / eval mode
//
// Backends:
//   default       NdArray on the CPU
//   --features wgpu  WGPU on the GPU
// Training always wraps the backend in Autodiff.

pub mod conv;
pub mod encoder;
pub mod projector;
pub mod model;
pub mod loss;
pub mod optim;
pub mod progress;
pub mod trainer;
pub mod evaluator;

#[cfg(not(feature = "wgpu"))]
pub type InferenceBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type InferenceBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<InferenceBackend>;
