//! Range-compressed UID sets.
//!
//! A [`UidSet`] is a compact representation of a possibly huge, sparse
//! set of message UIDs, scoped to one mailbox. Internally it is a
//! minimal sorted list of inclusive ranges: no two ranges overlap or
//! touch, so `{1,2,3,7,8,20}` is stored (and serialized) as
//! `"1:3,7:8,20"`.
//!
//! All algebra returns new normalized sets; nothing mutates in place.
//! Binary operations require both operands to share a mailbox context,
//! since UIDs are not comparable across mailboxes.

use std::fmt;

use crate::error::{Error, Result};

use super::{Mailbox, Uid};

/// A closed, inclusive range of UIDs.
///
/// Invariant: `1 <= lo <= hi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UidRange {
    lo: u32,
    hi: u32,
}

impl UidRange {
    fn new(lo: u32, hi: u32) -> Self {
        debug_assert!(lo >= 1 && lo <= hi);
        Self { lo, hi }
    }

    /// Lower bound of the range.
    #[must_use]
    pub fn lo(&self) -> u32 {
        self.lo
    }

    /// Upper bound of the range (inclusive).
    #[must_use]
    pub fn hi(&self) -> u32 {
        self.hi
    }

    /// Number of UIDs covered by this range.
    #[must_use]
    pub fn len(&self) -> u64 {
        u64::from(self.hi - self.lo) + 1
    }

    /// A range is never empty; provided for symmetry with collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for UidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lo == self.hi {
            write!(f, "{}", self.lo)
        } else {
            write!(f, "{}:{}", self.lo, self.hi)
        }
    }
}

/// Compact, ordered, range-compressed set of message UIDs scoped to one
/// mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidSet {
    mailbox: Mailbox,
    ranges: Vec<UidRange>,
}

impl UidSet {
    /// Creates an empty set scoped to the given mailbox.
    #[must_use]
    pub fn empty(mailbox: Mailbox) -> Self {
        Self {
            mailbox,
            ranges: Vec::new(),
        }
    }

    /// Creates a set from an arbitrary collection of UIDs.
    ///
    /// Duplicates are dropped and adjacent values are merged into
    /// minimal ranges. O(n log n) in the number of input values.
    #[must_use]
    pub fn from_uids(mailbox: Mailbox, uids: impl IntoIterator<Item = Uid>) -> Self {
        let mut values: Vec<u32> = uids.into_iter().map(Uid::get).collect();
        values.sort_unstable();
        values.dedup();

        let mut ranges: Vec<UidRange> = Vec::new();
        for v in values {
            if let Some(last) = ranges.last_mut() {
                if last.hi + 1 == v {
                    last.hi = v;
                    continue;
                }
            }
            ranges.push(UidRange::new(v, v));
        }
        Self { mailbox, ranges }
    }

    /// Creates a set covering a single inclusive range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `lo > hi`.
    pub fn from_range(mailbox: Mailbox, lo: Uid, hi: Uid) -> Result<Self> {
        if lo > hi {
            return Err(Error::InvalidArgument(format!(
                "range bounds out of order: {lo} > {hi}"
            )));
        }
        Ok(Self {
            mailbox,
            ranges: vec![UidRange::new(lo.get(), hi.get())],
        })
    }

    /// Creates a set containing a single UID.
    #[must_use]
    pub fn single(mailbox: Mailbox, uid: Uid) -> Self {
        Self {
            mailbox,
            ranges: vec![UidRange::new(uid.get(), uid.get())],
        }
    }

    /// Parses the compact wire form (`"1:3,7:8,20"`).
    ///
    /// An empty input yields the empty set. Tokens may arrive in any
    /// order; the result is normalized.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] naming the offending token for
    /// non-numeric values, zero UIDs, or range bounds that are not
    /// strictly ascending.
    pub fn parse(input: &str, mailbox: Mailbox) -> Result<Self> {
        if input.is_empty() {
            return Ok(Self::empty(mailbox));
        }

        fn parse_bound(s: &str, token: &str) -> Result<u32> {
            let v: u32 = s.parse().map_err(|_| Error::Parse {
                token: token.to_string(),
                message: "expected a decimal UID".to_string(),
            })?;
            if v == 0 {
                return Err(Error::Parse {
                    token: token.to_string(),
                    message: "UIDs start at 1".to_string(),
                });
            }
            Ok(v)
        }

        let mut ranges = Vec::new();
        for token in input.split(',') {
            if let Some((a, b)) = token.split_once(':') {
                let lo = parse_bound(a, token)?;
                let hi = parse_bound(b, token)?;
                if hi <= lo {
                    return Err(Error::Parse {
                        token: token.to_string(),
                        message: "range bounds must be strictly ascending".to_string(),
                    });
                }
                ranges.push(UidRange::new(lo, hi));
            } else {
                let v = parse_bound(token, token)?;
                ranges.push(UidRange::new(v, v));
            }
        }
        Ok(Self {
            mailbox,
            ranges: normalize(ranges),
        })
    }

    /// The mailbox this set is scoped to.
    #[must_use]
    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// The normalized ranges, ascending and non-adjacent.
    #[must_use]
    pub fn ranges(&self) -> &[UidRange] {
        &self.ranges
    }

    /// Number of UIDs in the set.
    ///
    /// O(#ranges), not O(#elements).
    #[must_use]
    pub fn len(&self) -> u64 {
        self.ranges.iter().map(UidRange::len).sum()
    }

    /// Returns true if the set contains no UIDs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns true if the set contains the given UID.
    ///
    /// O(log #ranges).
    #[must_use]
    pub fn contains(&self, uid: Uid) -> bool {
        let v = uid.get();
        match self.ranges.binary_search_by(|r| r.lo.cmp(&v)) {
            Ok(_) => true,
            Err(0) => false,
            Err(i) => self.ranges[i - 1].hi >= v,
        }
    }

    /// The smallest UID in the set.
    #[must_use]
    pub fn first(&self) -> Option<Uid> {
        self.ranges.first().and_then(|r| Uid::new(r.lo))
    }

    /// The largest UID in the set.
    #[must_use]
    pub fn last(&self) -> Option<Uid> {
        self.ranges.last().and_then(|r| Uid::new(r.hi))
    }

    /// Iterates over every UID in ascending order.
    ///
    /// Expands ranges lazily; prefer [`UidSet::ranges`] or
    /// [`UidSet::batches`] for bulk work.
    pub fn iter(&self) -> impl Iterator<Item = Uid> + '_ {
        self.ranges
            .iter()
            .flat_map(|r| (r.lo..=r.hi).filter_map(Uid::new))
    }

    /// Union of two sets sharing a mailbox context.
    ///
    /// O(|a| + |b|) in the number of ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CrossMailbox`] if the contexts differ.
    pub fn union(&self, other: &Self) -> Result<Self> {
        self.check_context(other)?;

        // Merge the two sorted lists, then coalesce.
        let mut merged = Vec::with_capacity(self.ranges.len() + other.ranges.len());
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() || j < other.ranges.len() {
            let take_left = match (self.ranges.get(i), other.ranges.get(j)) {
                (Some(a), Some(b)) => a.lo <= b.lo,
                (Some(_), None) => true,
                _ => false,
            };
            if take_left {
                merged.push(self.ranges[i]);
                i += 1;
            } else {
                merged.push(other.ranges[j]);
                j += 1;
            }
        }

        let mut out: Vec<UidRange> = Vec::new();
        for r in merged {
            // Coalesce overlapping or directly adjacent ranges.
            if let Some(last) = out.last_mut() {
                if u64::from(last.hi) + 1 >= u64::from(r.lo) {
                    last.hi = last.hi.max(r.hi);
                    continue;
                }
            }
            out.push(r);
        }
        Ok(Self {
            mailbox: self.mailbox.clone(),
            ranges: out,
        })
    }

    /// Intersection of two sets sharing a mailbox context.
    ///
    /// O(|a| + |b|) in the number of ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CrossMailbox`] if the contexts differ.
    pub fn intersection(&self, other: &Self) -> Result<Self> {
        self.check_context(other)?;

        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let a = self.ranges[i];
            let b = other.ranges[j];
            let lo = a.lo.max(b.lo);
            let hi = a.hi.min(b.hi);
            if lo <= hi {
                out.push(UidRange::new(lo, hi));
            }
            // Advance whichever range ends first.
            if a.hi <= b.hi {
                i += 1;
            } else {
                j += 1;
            }
        }
        Ok(Self {
            mailbox: self.mailbox.clone(),
            ranges: out,
        })
    }

    /// Set difference: the UIDs of `self` not present in `other`.
    ///
    /// O(|a| + |b|) in the number of ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CrossMailbox`] if the contexts differ.
    pub fn subtract(&self, other: &Self) -> Result<Self> {
        self.check_context(other)?;

        let mut out = Vec::new();
        let mut j = 0;
        for r in &self.ranges {
            let mut lo = r.lo;
            // Ranges of `other` that end before this one starts are done.
            while j < other.ranges.len() && other.ranges[j].hi < lo {
                j += 1;
            }
            // A single range of `other` may clip several of ours, so scan
            // with a local cursor without consuming `j`.
            let mut k = j;
            let mut exhausted = false;
            while k < other.ranges.len() && other.ranges[k].lo <= r.hi {
                let b = other.ranges[k];
                if b.lo > lo {
                    out.push(UidRange::new(lo, b.lo - 1));
                }
                if b.hi >= r.hi {
                    exhausted = true;
                    break;
                }
                lo = b.hi + 1;
                k += 1;
            }
            if !exhausted && lo <= r.hi {
                out.push(UidRange::new(lo, r.hi));
            }
        }
        Ok(Self {
            mailbox: self.mailbox.clone(),
            ranges: out,
        })
    }

    /// Splits the set into batches of at most `batch_size` UIDs.
    ///
    /// Batches are produced lazily in ascending UID order; a source
    /// range may be split across two batches. Boundaries are
    /// deterministic for a given set and batch size, which is what
    /// makes checkpointed bulk runs resumable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `batch_size` is 0.
    pub fn batches(&self, batch_size: u32) -> Result<Batches<'_>> {
        if batch_size == 0 {
            return Err(Error::InvalidArgument(
                "batch size must be positive".to_string(),
            ));
        }
        Ok(Batches {
            set: self,
            range_ix: 0,
            cursor: None,
            batch_size: u64::from(batch_size),
        })
    }

    fn check_context(&self, other: &Self) -> Result<()> {
        if self.mailbox == other.mailbox {
            Ok(())
        } else {
            Err(Error::CrossMailbox {
                left: self.mailbox.as_str().to_string(),
                right: other.mailbox.as_str().to_string(),
            })
        }
    }
}

impl fmt::Display for UidSet {
    /// Canonical wire form: ranges joined by `,`, bounds by `:`, no
    /// whitespace. The empty set renders as the empty string, which is
    /// not valid on the wire; callers must not send empty sets.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (ix, r) in self.ranges.iter().enumerate() {
            if ix > 0 {
                f.write_str(",")?;
            }
            write!(f, "{r}")?;
        }
        Ok(())
    }
}

/// Sorts and coalesces a list of ranges into normalized form.
fn normalize(mut ranges: Vec<UidRange>) -> Vec<UidRange> {
    ranges.sort_unstable_by_key(|r| r.lo);
    let mut out: Vec<UidRange> = Vec::with_capacity(ranges.len());
    for r in ranges {
        if let Some(last) = out.last_mut() {
            if u64::from(last.hi) + 1 >= u64::from(r.lo) {
                last.hi = last.hi.max(r.hi);
                continue;
            }
        }
        out.push(r);
    }
    out
}

/// Lazy batch iterator returned by [`UidSet::batches`].
///
/// Each item is itself a normalized [`UidSet`] scoped to the source
/// mailbox. Restart by calling [`UidSet::batches`] again.
#[derive(Debug)]
pub struct Batches<'a> {
    set: &'a UidSet,
    range_ix: usize,
    /// Next UID within the current range, when a range was split.
    cursor: Option<u32>,
    batch_size: u64,
}

impl Iterator for Batches<'_> {
    type Item = UidSet;

    fn next(&mut self) -> Option<UidSet> {
        if self.range_ix >= self.set.ranges.len() {
            return None;
        }

        let mut out = Vec::new();
        let mut remaining = self.batch_size;
        while remaining > 0 && self.range_ix < self.set.ranges.len() {
            let r = self.set.ranges[self.range_ix];
            let lo = self.cursor.unwrap_or(r.lo);
            let available = u64::from(r.hi - lo) + 1;
            if available <= remaining {
                out.push(UidRange::new(lo, r.hi));
                remaining -= available;
                self.range_ix += 1;
                self.cursor = None;
            } else {
                // remaining < available <= u32 range width, so the cast
                // cannot truncate.
                #[allow(clippy::cast_possible_truncation)]
                let hi = lo + (remaining as u32) - 1;
                out.push(UidRange::new(lo, hi));
                self.cursor = Some(hi + 1);
                remaining = 0;
            }
        }

        Some(UidSet {
            mailbox: self.set.mailbox.clone(),
            ranges: out,
        })
    }
}
