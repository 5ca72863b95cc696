//! Core protocol value types.
//!
//! UIDs, mailbox names, flags, and the range-compressed UID set.

mod flags;
mod identifiers;
mod mailbox;
mod uid_set;

pub use flags::{Flag, Flags};
pub use identifiers::Uid;
pub use mailbox::Mailbox;
pub use uid_set::{Batches, UidRange, UidSet};
