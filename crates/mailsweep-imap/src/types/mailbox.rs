//! Mailbox names.

/// Mailbox name.
///
/// UID sets are scoped to the mailbox they were read from; the name is
/// carried alongside the ranges so cross-mailbox algebra can be caught.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox(pub String);

impl Mailbox {
    /// Creates a new mailbox name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The INBOX mailbox (case-insensitive per RFC).
    #[must_use]
    pub fn inbox() -> Self {
        Self("INBOX".to_string())
    }

    /// Returns the mailbox name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_and_as_str() {
        let mb = Mailbox::new("Archive/2024");
        assert_eq!(mb.as_str(), "Archive/2024");
    }

    #[test]
    fn inbox() {
        assert_eq!(Mailbox::inbox().as_str(), "INBOX");
    }

    #[test]
    fn equality() {
        assert_eq!(Mailbox::new("INBOX"), Mailbox::inbox());
        assert_ne!(Mailbox::new("INBOX"), Mailbox::new("Sent"));
    }
}
