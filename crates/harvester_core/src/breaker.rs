pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Consecutive-failure guard over the reply endpoint.
///
/// Once tripped it stays tripped until [`CircuitBreaker::reset`]; a late
/// success only clears the counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreaker {
    consecutive_failures: u32,
    threshold: u32,
    tripped: bool,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD)
    }
}

impl CircuitBreaker {
    /// A threshold of zero is treated as one.
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive_failures: 0,
            threshold: threshold.max(1),
            tripped: false,
        }
    }

    /// Count one failure and report whether the breaker is now tripped.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures >= self.threshold {
            self.tripped = true;
        }
        self.tripped
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.tripped = false;
    }
}
