//! Error types for the orchestration layer.

use thiserror::Error;

use crate::orchestrator::OperationReport;
use crate::session::SessionError;

/// Errors that can occur driving bulk operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A pure value-layer failure (parse, algebra, compilation).
    /// Always a caller bug; never retried.
    #[error("protocol value error: {0}")]
    Value(#[from] mailsweep_imap::Error),

    /// A classified session-level failure that was not recoverable.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// An operation requiring a mailbox context was attempted before
    /// `select`.
    #[error("no mailbox selected")]
    NoMailboxSelected,

    /// The UID set's mailbox does not match the selected mailbox.
    #[error("identifier set is scoped to \"{set}\", but \"{selected}\" is selected")]
    ContextMismatch {
        /// Mailbox the set is scoped to.
        set: String,
        /// Mailbox currently selected on the session.
        selected: String,
    },

    /// A bulk run finished with failed or skipped batches. The full
    /// report is attached.
    #[error(
        "bulk run finished with {} failed and {} skipped batches",
        .0.failed_batches,
        .0.skipped_batches
    )]
    PartialFailure(Box<OperationReport>),

    /// Checkpoint (de)serialization failed.
    #[error("checkpoint serialization error: {0}")]
    Checkpoint(#[from] serde_json::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
