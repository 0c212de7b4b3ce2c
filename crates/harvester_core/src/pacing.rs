use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_JITTER_RATIO: f64 = 0.5;

/// Supplies randomized waits between upstream requests so that requests never
/// follow a fixed interval.
#[derive(Debug, Clone)]
pub struct PacingClock {
    jitter_ratio: f64,
    rng: StdRng,
}

impl Default for PacingClock {
    fn default() -> Self {
        Self::new(DEFAULT_JITTER_RATIO)
    }
}

impl PacingClock {
    /// `jitter_ratio` is clamped to `0.0..=1.0`.
    pub fn new(jitter_ratio: f64) -> Self {
        Self::with_rng(jitter_ratio, StdRng::from_entropy())
    }

    /// Deterministic clock for tests and replays.
    pub fn seeded(jitter_ratio: f64, seed: u64) -> Self {
        Self::with_rng(jitter_ratio, StdRng::seed_from_u64(seed))
    }

    fn with_rng(jitter_ratio: f64, rng: StdRng) -> Self {
        let jitter_ratio = if jitter_ratio.is_finite() {
            jitter_ratio.clamp(0.0, 1.0)
        } else {
            DEFAULT_JITTER_RATIO
        };
        Self { jitter_ratio, rng }
    }

    /// A delay uniformly drawn from `base * (1 - jitter) ..= base * (1 + jitter)`.
    pub fn next_delay(&mut self, base: Duration) -> Duration {
        if base.is_zero() || self.jitter_ratio == 0.0 {
            return base;
        }
        let factor: f64 = self
            .rng
            .gen_range((1.0 - self.jitter_ratio)..=(1.0 + self.jitter_ratio));
        Duration::from_secs_f64(base.as_secs_f64() * factor)
    }

    pub fn jitter_ratio(&self) -> f64 {
        self.jitter_ratio
    }
}
