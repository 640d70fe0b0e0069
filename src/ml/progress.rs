// ============================================================
// Layer 5 — Training Progress
// ============================================================
// Running statistics of one pass over a split, and the cadence
// at which the training loop reports and checkpoints.

use std::time::Instant;

/// Decides which steps log progress and which save a checkpoint.
/// The two conditions are independent of each other.
#[derive(Debug, Clone, Copy)]
pub struct StepCadence {
    log_every:        usize,
    checkpoint_every: usize,
}

impl StepCadence {
    pub fn new(epoch_size: usize, log_intervals: usize, checkpoint_every: usize) -> Self {
        let log_every = match log_intervals {
            0 => epoch_size.max(1),
            n => (epoch_size / n).max(1),
        };
        Self { log_every, checkpoint_every }
    }

    /// `step_in_epoch` counts from 0.
    pub fn is_log_step(&self, step_in_epoch: usize) -> bool {
        (step_in_epoch + 1) % self.log_every == 0
    }

    /// `global_step` is the count AFTER the update was applied.
    pub fn is_checkpoint_step(&self, global_step: usize) -> bool {
        self.checkpoint_every > 0 && global_step % self.checkpoint_every == 0
    }
}

#[derive(Debug)]
pub struct EpochStats {
    cost_sum: f64,
    tokens:   usize,
    start:    Instant,
}

impl Default for EpochStats {
    fn default() -> Self {
        Self::new()
    }
}

impl EpochStats {
    pub fn new() -> Self {
        Self { cost_sum: 0.0, tokens: 0, start: Instant::now() }
    }

    /// Add one batch: its per-example cost and the tokens each example scored.
    pub fn record(&mut self, cost: f64, tokens_per_example: usize) {
        self.cost_sum += cost;
        self.tokens += tokens_per_example;
    }

    pub fn cost_sum(&self) -> f64 {
        self.cost_sum
    }

    pub fn tokens(&self) -> usize {
        self.tokens
    }

    /// exp(total cost / total tokens); NaN before anything was recorded.
    pub fn perplexity(&self) -> f64 {
        if self.tokens == 0 {
            return f64::NAN;
        }
        (self.cost_sum / self.tokens as f64).exp()
    }

    /// Tokens processed per second across the whole batch.
    pub fn words_per_sec(&self, batch_size: usize) -> f64 {
        let elapsed = self.start.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        (self.tokens * batch_size) as f64 / elapsed
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perplexity_is_exp_of_mean_token_cost() {
        let mut stats = EpochStats::new();
        stats.record(6.0, 3);
        stats.record(3.0, 3);
        assert_eq!(stats.tokens(), 6);
        assert!((stats.perplexity() - (9.0f64 / 6.0).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_uniform_model_has_vocab_sized_perplexity() {
        let mut stats = EpochStats::new();
        // per-example cost of 5 tokens under a uniform 100-word model
        for _ in 0..4 {
            stats.record(5.0 * (100.0f64).ln(), 5);
        }
        assert!((stats.perplexity() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_stats_have_no_perplexity() {
        assert!(EpochStats::new().perplexity().is_nan());
    }

    #[test]
    fn test_log_cadence() {
        // 100 windows, 10 reports per epoch → every 10th step
        let cadence = StepCadence::new(100, 10, 0);
        let logged: Vec<usize> = (0..100).filter(|&s| cadence.is_log_step(s)).collect();
        assert_eq!(logged.len(), 10);
        assert_eq!(logged[0], 9);

        // fewer windows than reports → every step
        let cadence = StepCadence::new(3, 10, 0);
        assert!((0..3).all(|s| cadence.is_log_step(s)));
    }

    #[test]
    fn test_checkpoint_cadence_is_independent() {
        let cadence = StepCadence::new(100, 10, 25);
        assert!(cadence.is_checkpoint_step(25));
        assert!(cadence.is_checkpoint_step(50));
        assert!(!cadence.is_checkpoint_step(30));

        let never = StepCadence::new(100, 10, 0);
        assert!(!never.is_checkpoint_step(0));
        assert!(!never.is_checkpoint_step(500));
    }
}
