//! Bulk-operation orchestration.
//!
//! [`BulkOrchestrator`] drives a per-batch operation across an entire
//! [`UidSet`]: batches come from the set's deterministic splitter, every
//! batch call goes through the circuit breaker, failures are classified
//! and retried per the policy, and the run always comes back as a full
//! [`OperationReport`] — one batch exhausting its retries never aborts
//! the rest of the run. That partial-failure isolation, together with
//! the processed-set bookkeeping, is what makes long bulk jobs over
//! large mailboxes resumable.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use mailsweep_imap::{Mailbox, Uid, UidSet};

use crate::breaker::{BreakerConfig, CircuitBreaker, CircuitError, CircuitState};
use crate::error::{Error, Result};
use crate::metrics::{MetricsSink, NoopMetrics};
use crate::retry::{ErrorContext, RetryPolicy};
use crate::session::{ErrorKind, SessionError};
use crate::time::{Clock, SystemClock};

/// Default number of UIDs per batch.
pub const DEFAULT_BATCH_SIZE: u32 = 500;

/// Configuration for a bulk run.
#[derive(Debug, Clone)]
pub struct BulkConfig {
    /// Maximum UIDs per wire command.
    pub batch_size: u32,
    /// Stop the whole run as soon as a batch is rejected by an open
    /// circuit, instead of skipping ahead batch by batch.
    pub abort_on_open: bool,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            abort_on_open: false,
        }
    }
}

impl BulkConfig {
    /// Creates a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the batch size.
    #[must_use]
    pub const fn batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }

    /// Enables or disables abort-on-open.
    #[must_use]
    pub const fn abort_on_open(mut self, abort: bool) -> Self {
        self.abort_on_open = abort;
        self
    }
}

/// Outcome of a single batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The batch operation succeeded.
    Success {
        /// Messages affected.
        messages: u64,
    },
    /// The batch exhausted its retries.
    Failed {
        /// Classification of the final failure.
        kind: ErrorKind,
        /// Description of the final failure.
        message: String,
        /// Attempts made.
        attempts: u32,
    },
    /// The batch was never attempted.
    Skipped {
        /// Why the batch was skipped (e.g. `"circuit-open"`).
        reason: String,
    },
}

impl BatchOutcome {
    /// Returns true for `Success`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Per-batch entry in an [`OperationReport`].
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Zero-based batch index within the run.
    pub index: usize,
    /// The UIDs this batch covered.
    pub uids: UidSet,
    /// What happened.
    pub outcome: BatchOutcome,
}

/// Complete account of a bulk run.
///
/// The orchestrator never raises on a single batch's failure; it always
/// hands back the whole report and leaves the "is this acceptable"
/// decision to the caller (see [`OperationReport::ok_or_partial`]).
#[derive(Debug, Clone)]
pub struct OperationReport {
    /// Name of the operation, as passed to `execute`.
    pub operation: String,
    /// Mailbox the run was scoped to.
    pub mailbox: Mailbox,
    /// Per-batch outcomes, in run order.
    pub batches: Vec<BatchReport>,
    /// Union of all successfully processed batches.
    pub processed: UidSet,
    /// Total messages affected by successful batches.
    pub succeeded_messages: u64,
    /// Number of batches that exhausted retries.
    pub failed_batches: usize,
    /// Number of batches skipped without being attempted.
    pub skipped_batches: usize,
    /// False if the run stopped early (cancellation or abort-on-open).
    pub completed: bool,
}

impl OperationReport {
    fn new(operation: &str, mailbox: Mailbox) -> Self {
        Self {
            operation: operation.to_string(),
            processed: UidSet::empty(mailbox.clone()),
            mailbox,
            batches: Vec::new(),
            succeeded_messages: 0,
            failed_batches: 0,
            skipped_batches: 0,
            completed: true,
        }
    }

    fn record(&mut self, index: usize, uids: UidSet, outcome: BatchOutcome) {
        match &outcome {
            BatchOutcome::Success { messages } => {
                self.succeeded_messages += messages;
                // Batches derive from one set, so the contexts always
                // match and the union cannot fail.
                if let Ok(processed) = self.processed.union(&uids) {
                    self.processed = processed;
                }
            }
            BatchOutcome::Failed { .. } => self.failed_batches += 1,
            BatchOutcome::Skipped { .. } => self.skipped_batches += 1,
        }
        self.batches.push(BatchReport {
            index,
            uids,
            outcome,
        });
    }

    /// True when every batch succeeded and the run was not cut short.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.completed && self.failed_batches == 0 && self.skipped_batches == 0
    }

    /// The highest successfully processed UID, for checkpointing.
    #[must_use]
    pub fn last_processed(&self) -> Option<Uid> {
        self.processed.last()
    }

    /// Converts a clean run into `Ok(self)` and anything else into
    /// [`Error::PartialFailure`].
    ///
    /// # Errors
    ///
    /// Returns the report wrapped in [`Error::PartialFailure`] if any
    /// batch failed or was skipped, or the run stopped early.
    pub fn ok_or_partial(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::PartialFailure(Box::new(self)))
        }
    }

    /// Builds a resume checkpoint: the original set minus everything
    /// successfully processed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] if `original` is scoped to a different
    /// mailbox than the run was.
    pub fn checkpoint(&self, original: &UidSet) -> Result<Checkpoint> {
        let remaining = original.subtract(&self.processed)?;
        Ok(Checkpoint {
            mailbox: self.mailbox.as_str().to_string(),
            remaining: remaining.to_string(),
            last_processed: self.last_processed().map(Uid::get),
        })
    }
}

/// Persistable resume point for a bulk run.
///
/// The payload format for the remaining work is the canonical `UidSet`
/// wire serialization, so a checkpoint written by one process can be
/// restored by any other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Mailbox the remaining set is scoped to.
    pub mailbox: String,
    /// Canonical serialization of the unprocessed UIDs.
    pub remaining: String,
    /// Highest UID known processed, if any.
    pub last_processed: Option<u32>,
}

impl Checkpoint {
    /// Reconstructs the remaining work as a [`UidSet`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] if the stored serialization is
    /// malformed.
    pub fn remaining_set(&self) -> Result<UidSet> {
        Ok(UidSet::parse(
            &self.remaining,
            Mailbox::new(self.mailbox.clone()),
        )?)
    }

    /// Serializes the checkpoint to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Checkpoint`] on serialization failure.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restores a checkpoint from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Checkpoint`] on malformed input.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Drives batched operations with retry, circuit breaking, and
/// partial-failure isolation.
pub struct BulkOrchestrator<C: Clock = SystemClock> {
    config: BulkConfig,
    policy: RetryPolicy,
    breaker: CircuitBreaker<C>,
    metrics: Arc<dyn MetricsSink>,
    cancel: Option<watch::Receiver<bool>>,
}

impl BulkOrchestrator<SystemClock> {
    /// Creates an orchestrator using real time.
    #[must_use]
    pub fn new(config: BulkConfig, policy: RetryPolicy, breaker: BreakerConfig) -> Self {
        Self::with_breaker(config, policy, CircuitBreaker::new(breaker))
    }
}

impl<C: Clock> BulkOrchestrator<C> {
    /// Creates an orchestrator around an existing breaker (useful for
    /// injecting a mock clock).
    #[must_use]
    pub fn with_breaker(config: BulkConfig, policy: RetryPolicy, breaker: CircuitBreaker<C>) -> Self {
        Self {
            config,
            policy,
            breaker,
            metrics: Arc::new(NoopMetrics),
            cancel: None,
        }
    }

    /// Injects a metrics sink.
    #[must_use]
    pub fn metrics(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = sink;
        self
    }

    /// Attaches a cancellation signal, checked between batches.
    #[must_use]
    pub fn cancellation(mut self, signal: watch::Receiver<bool>) -> Self {
        self.cancel = Some(signal);
        self
    }

    /// Current breaker state, for observability.
    #[must_use]
    pub const fn breaker_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Runs `operation` over every batch of `uids`.
    ///
    /// The operation receives one batch at a time and reports the
    /// number of messages it affected. Failures are retried per the
    /// policy; a batch that exhausts its retries is recorded and the
    /// run moves on. Cancellation is honored between batches only,
    /// since each wire command is atomic.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Value`] for an invalid batch size. Batch-level
    /// failures never surface as `Err`; they are in the report.
    pub async fn execute<F>(
        &mut self,
        uids: &UidSet,
        operation_name: &str,
        mut operation: F,
    ) -> Result<OperationReport>
    where
        F: AsyncFnMut(&UidSet) -> std::result::Result<u64, SessionError>,
    {
        let batches = uids.batches(self.config.batch_size)?;
        info!(
            operation = operation_name,
            mailbox = %uids.mailbox(),
            total = uids.len(),
            batch_size = self.config.batch_size,
            "starting bulk run"
        );

        self.metrics.start();
        let mut report = OperationReport::new(operation_name, uids.mailbox().clone());
        for (index, batch) in batches.enumerate() {
            if self.is_canceled() {
                info!(operation = operation_name, index, "cancellation requested, stopping");
                report.completed = false;
                break;
            }

            let outcome = self.run_batch(&batch, operation_name, &mut operation).await;
            let abort = self.config.abort_on_open
                && matches!(outcome, BatchOutcome::Skipped { .. });
            report.record(index, batch, outcome);
            if abort {
                warn!(operation = operation_name, index, "circuit open, aborting run");
                report.completed = false;
                break;
            }
        }
        self.metrics.stop();

        info!(
            operation = operation_name,
            succeeded = report.succeeded_messages,
            failed_batches = report.failed_batches,
            skipped_batches = report.skipped_batches,
            completed = report.completed,
            "bulk run finished"
        );
        Ok(report)
    }

    async fn run_batch<F>(
        &mut self,
        batch: &UidSet,
        operation_name: &str,
        operation: &mut F,
    ) -> BatchOutcome
    where
        F: AsyncFnMut(&UidSet) -> std::result::Result<u64, SessionError>,
    {
        let mut attempt: u32 = 1;
        loop {
            match self.breaker.call(|| operation(batch)).await {
                Ok(messages) => {
                    debug!(operation = operation_name, batch = %batch, messages, "batch succeeded");
                    self.metrics.on_batch_success(operation_name, messages);
                    return BatchOutcome::Success { messages };
                }
                Err(CircuitError::Rejected) => {
                    self.metrics.on_batch_skipped(operation_name);
                    return BatchOutcome::Skipped {
                        reason: "circuit-open".to_string(),
                    };
                }
                Err(CircuitError::Inner(err)) => {
                    let context = ErrorContext {
                        kind: err.kind,
                        attempt,
                        max_attempts: self.policy.max_attempts,
                        operation: operation_name,
                    };
                    if self.policy.should_retry(&context) {
                        let delay = self.policy.compute_delay(attempt);
                        warn!(
                            operation = operation_name,
                            attempt,
                            kind = %err.kind,
                            delay = ?delay,
                            "batch attempt failed, retrying"
                        );
                        self.metrics.on_retry(operation_name, attempt);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    } else {
                        self.metrics.on_batch_failure(operation_name, err.kind);
                        return BatchOutcome::Failed {
                            kind: err.kind,
                            message: err.message,
                            attempts: attempt,
                        };
                    }
                }
            }
        }
    }

    fn is_canceled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }
}
