//! # mailsweep-core
//!
//! Resilient bulk-operation orchestration over an IMAP session.
//!
//! This crate provides:
//! - The async session boundary ([`MailSession`], [`SessionError`])
//! - A pure retry policy with exponential backoff and jitter
//!   ([`RetryPolicy`])
//! - A three-state circuit breaker ([`CircuitBreaker`])
//! - A bulk orchestrator with partial-failure isolation and
//!   checkpointed resumability ([`BulkOrchestrator`])
//! - A high-level facade tying it all together ([`SweepEngine`])
//!
//! ## Example
//!
//! ```ignore
//! use mailsweep_core::{
//!     BreakerConfig, BulkConfig, BulkOrchestrator, Criteria, Flag, FlagOp,
//!     Mailbox, RetryPolicy, SearchDate, SweepEngine,
//! };
//!
//! let orchestrator = BulkOrchestrator::new(
//!     BulkConfig::new().batch_size(200),
//!     RetryPolicy::bulk(),
//!     BreakerConfig::default(),
//! );
//! let mut engine = SweepEngine::new(session, orchestrator);
//!
//! engine.select(Mailbox::inbox()).await?;
//! let stale = engine
//!     .search(&Criteria::seen().and(Criteria::before(SearchDate::new(2023, 1, 1)?)))
//!     .await?;
//! let report = engine
//!     .store_batched(&stale, FlagOp::Set, &[Flag::Deleted])
//!     .await?;
//! println!("processed {} messages", report.succeeded_messages);
//! ```
//!
//! The underlying session is a single sequential command/response
//! channel; for true parallelism, run one engine per session over
//! disjoint UID partitions (see [`UidSet::batches`] and
//! [`UidSet::subtract`] for carving those out).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod breaker;
pub mod engine;
mod error;
pub mod metrics;
pub mod orchestrator;
pub mod retry;
pub mod session;
pub mod time;

pub use breaker::{BreakerConfig, CircuitBreaker, CircuitError, CircuitState};
pub use engine::SweepEngine;
pub use error::{Error, Result};
pub use metrics::{MetricsSink, NoopMetrics, TracingMetrics};
pub use orchestrator::{
    BatchOutcome, BatchReport, BulkConfig, BulkOrchestrator, Checkpoint, DEFAULT_BATCH_SIZE,
    OperationReport,
};
pub use retry::{ErrorContext, RetryPolicy};
pub use session::{
    ErrorKind, FetchPart, FlagOp, MailSession, MessageRecord, SessionError,
};
pub use time::{Clock, MockClock, SystemClock};

// Re-export the value layer so most callers need only this crate.
pub use mailsweep_imap::{
    Criteria, CriteriaCompiler, Flag, Flags, Mailbox, SearchDate, Uid, UidSet, compile,
};
