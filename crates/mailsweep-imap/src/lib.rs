//! # mailsweep-imap
//!
//! Protocol value types for reliable bulk IMAP operations.
//!
//! This crate is the pure half of the mailsweep engine. It knows how to
//! represent huge sparse UID sets compactly, run set algebra over them,
//! split them into bounded batches, and compile typed search criteria
//! into the SEARCH wire grammar. It performs no I/O: the session
//! boundary and the resilience machinery live in `mailsweep-core`.
//!
//! ## UID sets
//!
//! ```
//! use mailsweep_imap::{Mailbox, Uid, UidSet};
//!
//! # fn main() -> mailsweep_imap::Result<()> {
//! let uids = [1, 2, 3, 7, 8, 20].into_iter().filter_map(Uid::new);
//! let set = UidSet::from_uids(Mailbox::inbox(), uids);
//! assert_eq!(set.to_string(), "1:3,7:8,20");
//!
//! let batches: Vec<String> = set.batches(4)?.map(|b| b.to_string()).collect();
//! assert_eq!(batches, vec!["1:3,7", "8,20"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Search criteria
//!
//! ```
//! use mailsweep_imap::{Criteria, SearchDate, compile};
//!
//! # fn main() -> mailsweep_imap::Result<()> {
//! let query = Criteria::unseen().and(Criteria::since(SearchDate::new(2024, 1, 8)?));
//! assert_eq!(compile(&query)?, "UNSEEN SINCE 08-Jan-2024");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod search;
pub mod types;

pub use error::{Error, Result};
pub use search::{Criteria, CriteriaCompiler, DEFAULT_MAX_DEPTH, SearchDate, compile};
pub use types::{Batches, Flag, Flags, Mailbox, Uid, UidRange, UidSet};
