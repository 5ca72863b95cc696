//! The external session boundary.
//!
//! A [`MailSession`] is a single, stateful, sequential command/response
//! channel: at most one in-flight command at a time, with the selected
//! mailbox part of its state. The engine never implements the wire
//! protocol itself; it drives whatever session implementation it is
//! given and classifies the failures that come back.

use async_trait::async_trait;
use thiserror::Error;

use mailsweep_imap::{Flag, Flags, Mailbox, Uid, UidSet};

/// Classification of a session-level failure.
///
/// The classification, not the error type, is what drives the retry
/// policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection could not be established or was lost.
    Connection,
    /// Authentication was rejected.
    Authentication,
    /// The operation timed out.
    Timeout,
    /// The server rejected or failed the operation.
    Operation,
    /// A network-level failure below the protocol.
    Network,
    /// An explicitly temporary server condition.
    Temporary,
    /// An explicitly permanent server condition.
    Permanent,
}

impl ErrorKind {
    /// Whether failures of this kind may be retried.
    ///
    /// Authentication and permanent failures never are: retrying them
    /// cannot succeed and risks lockouts.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        !matches!(self, Self::Authentication | Self::Permanent)
    }

    /// Stable lowercase label, used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Authentication => "authentication",
            Self::Timeout => "timeout",
            Self::Operation => "operation",
            Self::Network => "network",
            Self::Temporary => "temporary",
            Self::Permanent => "permanent",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified session-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error: {message}")]
pub struct SessionError {
    /// Failure classification.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl SessionError {
    /// Creates a classified session error.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a timeout failure.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Shorthand for an operation failure.
    #[must_use]
    pub fn operation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Operation, message)
    }

    /// Shorthand for a connection failure.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, message)
    }
}

/// Message parts to request in a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchPart {
    /// Raw header block.
    Header,
    /// Message flags.
    Flags,
    /// Message body.
    Body,
    /// Message size in bytes.
    Size,
}

/// Flag mutation to apply in a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagOp {
    /// Add the given flags.
    Set,
    /// Remove the given flags.
    Remove,
}

/// A fetched message, populated according to the requested parts.
#[derive(Debug, Clone, Default)]
pub struct MessageRecord {
    /// The message UID. `None` only if the server misbehaves.
    pub uid: Option<Uid>,
    /// Flags, when requested.
    pub flags: Flags,
    /// Size in bytes, when requested.
    pub size: Option<u32>,
    /// Raw header block, when requested.
    pub header: Option<String>,
    /// Raw body, when requested.
    pub body: Option<Vec<u8>>,
}

/// The external session contract.
///
/// Implementations own transport, framing, and response parsing. All
/// methods take `&mut self`: the channel is sequential and must not be
/// shared across concurrent operations. Mailbox-selection state lives
/// in the session, so UID sets must be re-derived after a `select`.
#[async_trait]
pub trait MailSession: Send {
    /// Selects a mailbox, changing the scoping context for UIDs.
    async fn select(&mut self, mailbox: &Mailbox) -> Result<(), SessionError>;

    /// Executes a compiled search query against the selected mailbox.
    async fn search(&mut self, query: &str) -> Result<Vec<Uid>, SessionError>;

    /// Fetches the given parts for every message in the batch.
    async fn fetch(
        &mut self,
        batch: &UidSet,
        parts: &[FetchPart],
    ) -> Result<Vec<MessageRecord>, SessionError>;

    /// Applies a flag mutation to every message in the batch.
    async fn store(
        &mut self,
        batch: &UidSet,
        op: FlagOp,
        flags: &[Flag],
    ) -> Result<(), SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_and_permanent_are_not_retryable() {
        assert!(!ErrorKind::Authentication.is_retryable());
        assert!(!ErrorKind::Permanent.is_retryable());
    }

    #[test]
    fn transient_kinds_are_retryable() {
        for kind in [
            ErrorKind::Connection,
            ErrorKind::Timeout,
            ErrorKind::Operation,
            ErrorKind::Network,
            ErrorKind::Temporary,
        ] {
            assert!(kind.is_retryable(), "{kind} should be retryable");
        }
    }

    #[test]
    fn error_display_includes_kind() {
        let err = SessionError::timeout("FETCH took too long");
        assert_eq!(err.to_string(), "timeout error: FETCH took too long");
    }
}
