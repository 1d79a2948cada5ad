//! Retry budgets for poll loops.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounds on a poll-until-terminal loop.
///
/// `total_timeout` is a hard wall-clock ceiling, enforced independently of
/// `max_attempts`. The per-attempt delay is either fixed or scaled linearly
/// by the attempt index (`delay = attempt × per_attempt_delay`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryBudget {
    /// Maximum number of poll attempts. 0 = bounded only by `total_timeout`.
    pub max_attempts: u32,
    /// Base delay between attempts.
    pub per_attempt_delay: Duration,
    /// Hard ceiling on total elapsed wall-clock time.
    pub total_timeout: Duration,
    /// Scale the delay by the attempt index instead of keeping it fixed.
    pub linear_backoff: bool,
}

impl RetryBudget {
    /// A budget with a fixed delay between attempts.
    #[must_use]
    pub fn fixed(per_attempt_delay: Duration, total_timeout: Duration) -> Self {
        Self {
            max_attempts: 0,
            per_attempt_delay,
            total_timeout,
            linear_backoff: false,
        }
    }

    /// A budget whose delay grows linearly with the attempt index.
    #[must_use]
    pub fn linear(base_delay: Duration, total_timeout: Duration) -> Self {
        Self {
            max_attempts: 0,
            per_attempt_delay: base_delay,
            total_timeout,
            linear_backoff: true,
        }
    }

    /// Caps the number of attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// The delay to sleep after the given 1-based attempt index.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.linear_backoff {
            self.per_attempt_delay.saturating_mul(attempt.max(1))
        } else {
            self.per_attempt_delay
        }
    }

    /// Whether the attempt cap is exhausted after `attempts` polls.
    #[must_use]
    pub fn attempts_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts > 0 && attempts >= self.max_attempts
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            per_attempt_delay: Duration::from_secs(5),
            total_timeout: Duration::from_secs(600),
            linear_backoff: false,
        }
    }
}
