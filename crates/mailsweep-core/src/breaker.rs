//! Circuit breaker guarding the remote session.
//!
//! A three-state machine (Closed → Open → Half-Open) that stops calling
//! a failing resource for a cooldown period instead of hammering it.
//! The state transitions are exact:
//!
//! - **Closed**: calls pass through. A failure increments the
//!   consecutive-failure count; reaching the threshold opens the
//!   circuit. A success resets the count.
//! - **Open**: calls are rejected without touching the resource until
//!   the recovery timeout has elapsed, at which point the breaker moves
//!   to Half-Open and lets one trial call through.
//! - **Half-Open**: the trial call's outcome decides — success closes
//!   the circuit, failure re-opens it and restarts the cooldown.
//!
//! The breaker holds mutable state and takes `&mut self`: it is meant
//! to be driven from one logical flow at a time, matching the
//! sequential session it guards. Share across tasks only behind a lock.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::time::{Clock, SystemClock};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation; calls pass through.
    Closed,
    /// Resource considered unhealthy; calls fail fast.
    Open,
    /// Probing recovery; one trial call allowed.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => f.write_str("closed"),
            Self::Open => f.write_str("open"),
            Self::HalfOpen => f.write_str("half_open"),
        }
    }
}

/// Error type for circuit-protected operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CircuitError<E> {
    /// The circuit breaker rejected the call without invoking the
    /// operation.
    #[error("circuit breaker open, call rejected")]
    Rejected,

    /// The underlying operation ran and failed.
    #[error("operation failed: {0}")]
    Inner(#[source] E),
}

/// Configuration for a circuit breaker.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures required to open the circuit.
    pub failure_threshold: u32,
    /// Cooldown before a trial call is allowed.
    pub recovery_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

impl BreakerConfig {
    /// Sets the consecutive-failure threshold.
    #[must_use]
    pub const fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the recovery cooldown.
    #[must_use]
    pub const fn recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }
}

/// Three-state circuit breaker over an injected clock.
#[derive(Debug)]
pub struct CircuitBreaker<C: Clock = SystemClock> {
    config: BreakerConfig,
    clock: C,
    state: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
}

impl CircuitBreaker<SystemClock> {
    /// Creates a breaker using real time.
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Creates a breaker with an injected clock.
    #[must_use]
    pub fn with_clock(config: BreakerConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure: None,
        }
    }

    /// Current state.
    ///
    /// The stored state; an Open breaker whose cooldown has elapsed
    /// still reads Open until the next call moves it to Half-Open.
    #[must_use]
    pub const fn state(&self) -> CircuitState {
        self.state
    }

    /// Current consecutive-failure count.
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Executes an operation through the breaker.
    ///
    /// The closure is only invoked if the breaker permits the call.
    ///
    /// # Errors
    ///
    /// [`CircuitError::Rejected`] if the circuit is open and the
    /// cooldown has not elapsed; [`CircuitError::Inner`] if the
    /// operation ran and failed.
    pub async fn call<F, Fut, T, E>(&mut self, operation: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.try_acquire() {
            return Err(CircuitError::Rejected);
        }
        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(CircuitError::Inner(err))
            }
        }
    }

    /// Decides whether a call may proceed, moving Open → Half-Open when
    /// the cooldown has elapsed.
    fn try_acquire(&mut self) -> bool {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let recovered = self.last_failure.is_some_and(|at| {
                    self.clock.has_elapsed(at, self.config.recovery_timeout)
                });
                if recovered {
                    debug!(state = %CircuitState::HalfOpen, "circuit cooldown elapsed, allowing trial call");
                    self.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_success(&mut self) {
        if self.state == CircuitState::HalfOpen {
            debug!("trial call succeeded, closing circuit");
        }
        self.state = CircuitState::Closed;
        self.consecutive_failures = 0;
    }

    fn record_failure(&mut self) {
        self.last_failure = Some(self.clock.now());
        match self.state {
            CircuitState::HalfOpen => {
                warn!("trial call failed, re-opening circuit");
                self.state = CircuitState::Open;
            }
            CircuitState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.config.failure_threshold {
                    warn!(
                        failures = self.consecutive_failures,
                        "failure threshold reached, opening circuit"
                    );
                    self.state = CircuitState::Open;
                }
            }
            CircuitState::Open => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::time::MockClock;
    use std::sync::Arc;

    fn test_breaker(threshold: u32, timeout: Duration) -> (CircuitBreaker<Arc<MockClock>>, Arc<MockClock>) {
        let clock = MockClock::shared();
        let config = BreakerConfig::default()
            .failure_threshold(threshold)
            .recovery_timeout(timeout);
        (CircuitBreaker::with_clock(config, Arc::clone(&clock)), clock)
    }

    async fn fail(breaker: &mut CircuitBreaker<Arc<MockClock>>) -> Result<(), CircuitError<&'static str>> {
        breaker.call(|| async { Err::<(), _>("boom") }).await.map(|()| ())
    }

    async fn succeed(breaker: &mut CircuitBreaker<Arc<MockClock>>) -> Result<(), CircuitError<&'static str>> {
        breaker.call(|| async { Ok::<_, &'static str>(()) }).await
    }

    #[tokio::test]
    async fn passes_successful_calls() {
        let (mut breaker, _clock) = test_breaker(3, Duration::from_secs(30));
        let result: Result<i32, CircuitError<&str>> =
            breaker.call(|| async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn opens_after_threshold() {
        let (mut breaker, _clock) = test_breaker(3, Duration::from_secs(30));
        for _ in 0..2 {
            assert!(matches!(fail(&mut breaker).await, Err(CircuitError::Inner(_))));
            assert_eq!(breaker.state(), CircuitState::Closed);
        }
        assert!(fail(&mut breaker).await.is_err());
        assert_eq!(breaker.state(), CircuitState::Open);
        assert_eq!(breaker.consecutive_failures(), 3);
    }

    #[tokio::test]
    async fn success_resets_failure_count() {
        let (mut breaker, _clock) = test_breaker(3, Duration::from_secs(30));
        fail(&mut breaker).await.ok();
        fail(&mut breaker).await.ok();
        succeed(&mut breaker).await.unwrap();
        assert_eq!(breaker.consecutive_failures(), 0);
        fail(&mut breaker).await.ok();
        fail(&mut breaker).await.ok();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn rejects_without_invoking_while_open() {
        let (mut breaker, clock) = test_breaker(1, Duration::from_secs(30));
        fail(&mut breaker).await.ok();
        assert_eq!(breaker.state(), CircuitState::Open);

        clock.advance(Duration::from_secs(10));
        let mut invoked = false;
        let result: Result<(), CircuitError<&str>> = breaker
            .call(|| {
                invoked = true;
                async { Ok(()) }
            })
            .await;
        assert!(matches!(result, Err(CircuitError::Rejected)));
        assert!(!invoked);
    }

    #[tokio::test]
    async fn trial_success_closes_circuit() {
        let (mut breaker, clock) = test_breaker(1, Duration::from_secs(30));
        fail(&mut breaker).await.ok();
        clock.advance(Duration::from_secs(30));

        succeed(&mut breaker).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn trial_failure_reopens_and_restarts_cooldown() {
        let (mut breaker, clock) = test_breaker(1, Duration::from_secs(30));
        fail(&mut breaker).await.ok();
        clock.advance(Duration::from_secs(30));

        fail(&mut breaker).await.ok();
        assert_eq!(breaker.state(), CircuitState::Open);

        // Cooldown restarted at the trial failure, so 20s in we are
        // still rejected.
        clock.advance(Duration::from_secs(20));
        assert!(matches!(
            succeed(&mut breaker).await,
            Err(CircuitError::Rejected)
        ));

        clock.advance(Duration::from_secs(10));
        succeed(&mut breaker).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
