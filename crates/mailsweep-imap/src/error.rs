//! Error types for the protocol value layer.

use thiserror::Error;

/// Errors produced by the pure value types and the criteria compiler.
///
/// None of these indicate a transient condition: they are caller bugs
/// (malformed input, invalid algebra, inexpressible criteria) and must
/// never be retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed argument to a pure component.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed serialized UID set.
    #[error("parse error at token \"{token}\": {message}")]
    Parse {
        /// The offending token from the input.
        token: String,
        /// Description of what went wrong.
        message: String,
    },

    /// Set algebra across different mailbox contexts.
    #[error("cross-mailbox operation: \"{left}\" vs \"{right}\"")]
    CrossMailbox {
        /// Mailbox context of the left operand.
        left: String,
        /// Mailbox context of the right operand.
        right: String,
    },

    /// A criteria operand failed validation.
    #[error("invalid operand for {predicate}: {message}")]
    InvalidOperand {
        /// The SEARCH keyword the operand belongs to.
        predicate: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    /// The criteria tree cannot be expressed in the wire grammar.
    #[error("invalid criteria: {0}")]
    InvalidCriteria(String),

    /// The criteria tree exceeds the configured depth limit.
    #[error("criteria tree depth exceeds limit of {limit}")]
    CriteriaTooComplex {
        /// The configured depth limit.
        limit: usize,
    },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
