//! Retry policy with exponential backoff and jitter.
//!
//! [`RetryPolicy`] is pure: [`RetryPolicy::should_retry`] decides,
//! [`RetryPolicy::compute_delay`] computes, and the caller owns the
//! actual sleep/retry loop. That split keeps the policy testable
//! without any timing.

use std::time::Duration;

use rand::Rng;

use crate::session::ErrorKind;

/// Context for a retry decision.
#[derive(Debug, Clone, Copy)]
pub struct ErrorContext<'a> {
    /// Classification of the failure.
    pub kind: ErrorKind,
    /// The attempt that just failed (1-based).
    pub attempt: u32,
    /// Total attempts allowed.
    pub max_attempts: u32,
    /// Name of the operation, for logs.
    pub operation: &'a str,
}

/// Configuration for retry behavior.
///
/// Use the preset constructors for common patterns:
/// - [`RetryPolicy::interactive()`] — quick backoff, fail fast
/// - [`RetryPolicy::bulk()`] — patient backoff for long-running jobs
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Cap applied to the exponential backoff.
    pub max_delay: Duration,
    /// Backoff multiplier per attempt.
    pub factor: f64,
    /// Total attempts allowed, including the first.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
            factor: 2.0,
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// Quick retry for interactive callers: fail within a few seconds.
    #[must_use]
    pub const fn interactive() -> Self {
        Self {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            factor: 2.0,
            max_attempts: 3,
        }
    }

    /// Patient retry for long-running bulk jobs.
    #[must_use]
    pub const fn bulk() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            factor: 2.0,
            max_attempts: 5,
        }
    }

    /// Sets the total attempts allowed.
    #[must_use]
    pub const fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the delay before the second attempt.
    #[must_use]
    pub const fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the backoff cap.
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Decides whether a failed attempt should be retried.
    ///
    /// Authentication and permanent failures are never retried,
    /// regardless of attempt count.
    #[must_use]
    pub fn should_retry(&self, context: &ErrorContext<'_>) -> bool {
        if context.attempt >= context.max_attempts {
            return false;
        }
        context.kind.is_retryable()
    }

    /// Jitter-free exponential backoff for the given attempt:
    /// `base * factor^(attempt-1)`, capped at `max_delay`.
    ///
    /// Monotonically non-decreasing in `attempt` (for `factor >= 1`).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        // Exponent capped so the multiplication cannot overflow; the
        // cap below kicks in long before 2^32 anyway.
        #[allow(clippy::cast_possible_wrap)]
        let exponent = (attempt - 1).min(32) as i32;
        let delay = self.base_delay.mul_f64(self.factor.powi(exponent));
        delay.min(self.max_delay)
    }

    /// Backoff plus uniform random jitter in `[0, 10%]` of the capped
    /// delay, preventing synchronized retry storms across concurrent
    /// callers.
    #[must_use]
    pub fn compute_delay(&self, attempt: u32) -> Duration {
        let base = self.backoff(attempt);
        if base.is_zero() {
            return Duration::ZERO;
        }
        let jitter = base.mul_f64(rand::thread_rng().gen_range(0.0..=0.1));
        base + jitter
    }
}
