//! Message identifiers.

use std::num::NonZeroU32;

/// Unique identifier for a message.
///
/// UIDs are persistent, per-mailbox identifiers that don't change when
/// messages are expunged. They are only comparable within the mailbox
/// they were issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uid(pub NonZeroU32);

impl Uid {
    /// Creates a new UID.
    ///
    /// Returns `None` if the value is 0.
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    /// Returns the underlying value.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_valid() {
        let uid = Uid::new(100);
        assert!(uid.is_some());
        assert_eq!(uid.unwrap().get(), 100);
    }

    #[test]
    fn new_zero_returns_none() {
        assert!(Uid::new(0).is_none());
    }

    #[test]
    fn display() {
        let uid = Uid::new(12345).unwrap();
        assert_eq!(format!("{uid}"), "12345");
    }

    #[test]
    fn ordering() {
        let uid1 = Uid::new(100).unwrap();
        let uid2 = Uid::new(200).unwrap();
        assert!(uid1 < uid2);
    }
}
