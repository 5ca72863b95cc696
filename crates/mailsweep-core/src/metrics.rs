//! Metrics sink for bulk-run observability.
//!
//! No ambient globals: a [`MetricsSink`] is explicitly constructed and
//! injected into the orchestrator. All observation hooks default to
//! no-ops, so implementors pick what they care about.

use crate::session::ErrorKind;

/// Observer for orchestrator events.
///
/// `start`/`stop` bracket a sink's lifecycle (flush intervals,
/// background reporters); the remaining hooks are fired by the
/// orchestrator as a run progresses.
pub trait MetricsSink: Send + Sync {
    /// Called when the owning component begins using the sink.
    fn start(&self) {}

    /// Called when the owning component is done with the sink.
    fn stop(&self) {}

    /// A batch completed successfully, affecting `messages` messages.
    fn on_batch_success(&self, operation: &str, messages: u64) {
        let _ = (operation, messages);
    }

    /// A batch exhausted its retries.
    fn on_batch_failure(&self, operation: &str, kind: ErrorKind) {
        let _ = (operation, kind);
    }

    /// A batch was skipped because the circuit was open.
    fn on_batch_skipped(&self, operation: &str) {
        let _ = operation;
    }

    /// An attempt failed and will be retried.
    fn on_retry(&self, operation: &str, attempt: u32) {
        let _ = (operation, attempt);
    }
}

/// A sink that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {}

/// A sink that logs events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetrics;

impl MetricsSink for TracingMetrics {
    fn start(&self) {
        tracing::debug!("metrics sink started");
    }

    fn stop(&self) {
        tracing::debug!("metrics sink stopped");
    }

    fn on_batch_success(&self, operation: &str, messages: u64) {
        tracing::debug!(operation, messages, "batch succeeded");
    }

    fn on_batch_failure(&self, operation: &str, kind: ErrorKind) {
        tracing::warn!(operation, kind = %kind, "batch failed");
    }

    fn on_batch_skipped(&self, operation: &str) {
        tracing::warn!(operation, "batch skipped, circuit open");
    }

    fn on_retry(&self, operation: &str, attempt: u32) {
        tracing::debug!(operation, attempt, "retrying");
    }
}
