//! Search criteria trees.
//!
//! [`Criteria`] is an immutable boolean expression over atomic search
//! predicates. Trees are built with the fluent constructors below, which
//! validate operands eagerly, and compiled to the SEARCH wire grammar by
//! [`crate::search::CriteriaCompiler`]. Structural sharing is safe: a
//! tree is never mutated after construction.

use chrono::{Datelike, NaiveDate};

use crate::error::{Error, Result};
use crate::types::Flag;

/// Fixed English month abbreviations for the `DD-Mon-YYYY` date token.
///
/// The wire grammar requires these exact forms regardless of host
/// locale.
pub(crate) const MONTH_ABBREV: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A calendar date usable in date predicates.
///
/// Renders as the protocol's fixed `DD-Mon-YYYY` token, e.g.
/// `08-Jan-2024`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SearchDate(NaiveDate);

impl SearchDate {
    /// Creates a search date from calendar components.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperand`] if the components do not form
    /// a valid calendar date.
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or(Error::InvalidOperand {
                predicate: "date",
                message: format!("{year:04}-{month:02}-{day:02} is not a calendar date"),
            })
    }

    /// Wraps an already-validated date.
    #[must_use]
    pub const fn from_naive(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The underlying calendar date.
    #[must_use]
    pub const fn as_naive(&self) -> NaiveDate {
        self.0
    }
}

impl std::fmt::Display for SearchDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let month = MONTH_ABBREV[self.0.month0() as usize];
        write!(f, "{:02}-{}-{}", self.0.day(), month, self.0.year())
    }
}

/// A search criteria tree.
///
/// Leaf variants are atomic predicates; `And`/`Or`/`Not` combine them.
/// The variants are public so callers can pattern-match, but the fluent
/// constructors are the intended way to build trees: they validate
/// operands (the compiler re-validates at compile time in any case).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criteria {
    /// Matches every message. Only meaningful as the sole criterion.
    All,
    /// The given flag is set.
    FlagSet(Flag),
    /// The given flag is not set.
    FlagUnset(Flag),
    /// A header field contains the given value.
    Header {
        /// Header field name.
        name: String,
        /// Substring to match in the field body.
        value: String,
    },
    /// Subject contains the given text.
    Subject(String),
    /// Body contains the given text.
    Body(String),
    /// Header or body contains the given text.
    Text(String),
    /// From address contains the given text.
    From(String),
    /// To address contains the given text.
    To(String),
    /// Cc address contains the given text.
    Cc(String),
    /// Internal date is strictly before the given date.
    Before(SearchDate),
    /// Internal date is on or after the given date.
    Since(SearchDate),
    /// Internal date is on the given date.
    On(SearchDate),
    /// Message size is larger than the given byte count.
    Larger(u32),
    /// Message size is smaller than the given byte count.
    Smaller(u32),
    /// Both operands match.
    And(Box<Criteria>, Box<Criteria>),
    /// Either operand matches.
    Or(Box<Criteria>, Box<Criteria>),
    /// The operand does not match.
    Not(Box<Criteria>),
}

/// Rejects empty strings and strings containing control characters.
pub(crate) fn validated_text(predicate: &'static str, value: impl Into<String>) -> Result<String> {
    let value = value.into();
    if value.is_empty() {
        return Err(Error::InvalidOperand {
            predicate,
            message: "value must not be empty".to_string(),
        });
    }
    if value.chars().any(char::is_control) {
        return Err(Error::InvalidOperand {
            predicate,
            message: "value must not contain control characters".to_string(),
        });
    }
    Ok(value)
}

/// Keyword flags go on the wire as bare atoms and cannot be quoted.
pub(crate) fn validated_keyword(predicate: &'static str, value: impl Into<String>) -> Result<String> {
    let value = validated_text(predicate, value)?;
    let is_atom = value
        .chars()
        .all(|c| c.is_ascii_graphic() && !matches!(c, '(' | ')' | '{' | '%' | '*' | '"' | '\\'));
    if is_atom {
        Ok(value)
    } else {
        Err(Error::InvalidOperand {
            predicate,
            message: format!("\"{value}\" is not a valid keyword atom"),
        })
    }
}

impl Criteria {
    /// Matches every message in the mailbox.
    #[must_use]
    pub const fn all() -> Self {
        Self::All
    }

    /// Messages with the `\Seen` flag.
    #[must_use]
    pub const fn seen() -> Self {
        Self::FlagSet(Flag::Seen)
    }

    /// Messages without the `\Seen` flag.
    #[must_use]
    pub const fn unseen() -> Self {
        Self::FlagUnset(Flag::Seen)
    }

    /// Messages with the `\Answered` flag.
    #[must_use]
    pub const fn answered() -> Self {
        Self::FlagSet(Flag::Answered)
    }

    /// Messages without the `\Answered` flag.
    #[must_use]
    pub const fn unanswered() -> Self {
        Self::FlagUnset(Flag::Answered)
    }

    /// Messages with the `\Flagged` flag.
    #[must_use]
    pub const fn flagged() -> Self {
        Self::FlagSet(Flag::Flagged)
    }

    /// Messages without the `\Flagged` flag.
    #[must_use]
    pub const fn unflagged() -> Self {
        Self::FlagUnset(Flag::Flagged)
    }

    /// Messages with the `\Deleted` flag.
    #[must_use]
    pub const fn deleted() -> Self {
        Self::FlagSet(Flag::Deleted)
    }

    /// Messages without the `\Deleted` flag.
    #[must_use]
    pub const fn undeleted() -> Self {
        Self::FlagUnset(Flag::Deleted)
    }

    /// Messages with the `\Draft` flag.
    #[must_use]
    pub const fn draft() -> Self {
        Self::FlagSet(Flag::Draft)
    }

    /// Messages with the `\Recent` flag.
    #[must_use]
    pub const fn recent() -> Self {
        Self::FlagSet(Flag::Recent)
    }

    /// Messages without the `\Recent` flag.
    #[must_use]
    pub const fn old() -> Self {
        Self::FlagUnset(Flag::Recent)
    }

    /// Messages carrying the given keyword flag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperand`] if the keyword is not a bare
    /// atom.
    pub fn keyword(name: impl Into<String>) -> Result<Self> {
        Ok(Self::FlagSet(Flag::Keyword(validated_keyword(
            "KEYWORD", name,
        )?)))
    }

    /// Messages not carrying the given keyword flag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperand`] if the keyword is not a bare
    /// atom.
    pub fn unkeyword(name: impl Into<String>) -> Result<Self> {
        Ok(Self::FlagUnset(Flag::Keyword(validated_keyword(
            "UNKEYWORD",
            name,
        )?)))
    }

    /// Messages whose named header field contains `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperand`] for empty operands or control
    /// characters.
    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        Ok(Self::Header {
            name: validated_text("HEADER", name)?,
            value: validated_text("HEADER", value)?,
        })
    }

    /// Messages whose subject contains the given text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperand`] for empty operands or control
    /// characters.
    pub fn subject(text: impl Into<String>) -> Result<Self> {
        Ok(Self::Subject(validated_text("SUBJECT", text)?))
    }

    /// Messages whose body contains the given text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperand`] for empty operands or control
    /// characters.
    pub fn body(text: impl Into<String>) -> Result<Self> {
        Ok(Self::Body(validated_text("BODY", text)?))
    }

    /// Messages whose header or body contains the given text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperand`] for empty operands or control
    /// characters.
    pub fn text(text: impl Into<String>) -> Result<Self> {
        Ok(Self::Text(validated_text("TEXT", text)?))
    }

    /// Messages whose From address contains the given text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperand`] for empty operands or control
    /// characters.
    pub fn from(text: impl Into<String>) -> Result<Self> {
        Ok(Self::From(validated_text("FROM", text)?))
    }

    /// Messages whose To address contains the given text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperand`] for empty operands or control
    /// characters.
    pub fn to(text: impl Into<String>) -> Result<Self> {
        Ok(Self::To(validated_text("TO", text)?))
    }

    /// Messages whose Cc address contains the given text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperand`] for empty operands or control
    /// characters.
    pub fn cc(text: impl Into<String>) -> Result<Self> {
        Ok(Self::Cc(validated_text("CC", text)?))
    }

    /// Messages dated strictly before the given date.
    #[must_use]
    pub const fn before(date: SearchDate) -> Self {
        Self::Before(date)
    }

    /// Messages dated on or after the given date.
    #[must_use]
    pub const fn since(date: SearchDate) -> Self {
        Self::Since(date)
    }

    /// Messages dated on the given date.
    #[must_use]
    pub const fn on(date: SearchDate) -> Self {
        Self::On(date)
    }

    /// Messages larger than the given byte count.
    #[must_use]
    pub const fn larger(bytes: u32) -> Self {
        Self::Larger(bytes)
    }

    /// Messages smaller than the given byte count.
    #[must_use]
    pub const fn smaller(bytes: u32) -> Self {
        Self::Smaller(bytes)
    }

    /// Conjunction of this criterion with another.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Disjunction of this criterion with another.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// Negation of this criterion.
    #[must_use]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Returns true for `And`/`Or`/`Not` nodes.
    #[must_use]
    pub const fn is_compound(&self) -> bool {
        matches!(self, Self::And(..) | Self::Or(..) | Self::Not(..))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod search_date_tests {
        use super::*;

        #[test]
        fn renders_fixed_format() {
            let d = SearchDate::new(2024, 1, 8).unwrap();
            assert_eq!(d.to_string(), "08-Jan-2024");
        }

        #[test]
        fn renders_every_month() {
            let rendered: Vec<String> = (1..=12)
                .map(|m| SearchDate::new(2024, m, 15).unwrap().to_string())
                .collect();
            assert_eq!(rendered[0], "15-Jan-2024");
            assert_eq!(rendered[8], "15-Sep-2024");
            assert_eq!(rendered[11], "15-Dec-2024");
        }

        #[test]
        fn rejects_invalid_date() {
            assert!(SearchDate::new(2024, 2, 30).is_err());
            assert!(SearchDate::new(2024, 13, 1).is_err());
        }

        #[test]
        fn accepts_leap_day() {
            assert!(SearchDate::new(2024, 2, 29).is_ok());
            assert!(SearchDate::new(2023, 2, 29).is_err());
        }
    }

    mod builder_tests {
        use super::*;

        #[test]
        fn fluent_combinators() {
            let c = Criteria::unseen()
                .and(Criteria::from("alerts@example.com").unwrap())
                .or(Criteria::flagged());
            assert!(matches!(c, Criteria::Or(..)));
            assert!(c.is_compound());
        }

        #[test]
        fn rejects_empty_operand() {
            let err = Criteria::subject("").unwrap_err();
            assert!(matches!(
                err,
                Error::InvalidOperand {
                    predicate: "SUBJECT",
                    ..
                }
            ));
        }

        #[test]
        fn rejects_control_characters() {
            assert!(Criteria::body("line\r\nbreak").is_err());
            assert!(Criteria::text("nul\0").is_err());
        }

        #[test]
        fn rejects_non_atom_keyword() {
            assert!(Criteria::keyword("has space").is_err());
            assert!(Criteria::keyword("par(en").is_err());
            assert!(Criteria::keyword("$Forwarded").is_ok());
        }

        #[test]
        fn atoms_are_not_compound() {
            assert!(!Criteria::all().is_compound());
            assert!(!Criteria::larger(1024).is_compound());
            assert!(Criteria::seen().not().is_compound());
        }
    }
}
