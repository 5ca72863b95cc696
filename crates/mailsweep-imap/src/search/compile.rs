//! Compilation of criteria trees to the SEARCH wire grammar.
//!
//! Compilation is pure and deterministic: the same tree always renders
//! to byte-identical output, and nothing here touches a session.
//!
//! Grammar choices, bit-exact where the wire cares:
//!
//! - Conjunction is juxtaposition: `A B` means A AND B, so nested `And`
//!   nodes flatten into one space-separated sequence.
//! - `OR`/`NOT` are explicit keywords. A compound operand is wrapped in
//!   parentheses to remove precedence ambiguity; atomic operands stay
//!   bare.
//! - String operands are always sent as quoted strings, escaping only
//!   backslash and double-quote.
//! - Dates render as `DD-Mon-YYYY` with fixed English month names.

use crate::error::{Error, Result};
use crate::types::Flag;

use super::criteria::{Criteria, validated_keyword, validated_text};

/// Default maximum criteria tree depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Renders [`Criteria`] trees to wire query strings.
#[derive(Debug, Clone)]
pub struct CriteriaCompiler {
    max_depth: usize,
}

impl Default for CriteriaCompiler {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl CriteriaCompiler {
    /// Creates a compiler with the default depth limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum tree depth.
    ///
    /// Trees deeper than this fail with [`Error::CriteriaTooComplex`],
    /// bounding the size of the resulting wire command.
    #[must_use]
    pub const fn max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }

    /// Compiles a criteria tree to its wire query string.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidOperand`] for operands failing validation.
    /// - [`Error::InvalidCriteria`] for `NOT ALL`, which the grammar
    ///   cannot express safely.
    /// - [`Error::CriteriaTooComplex`] past the depth limit.
    pub fn compile(&self, criteria: &Criteria) -> Result<String> {
        let mut out = String::new();
        self.render(criteria, &mut out, 1)?;
        Ok(out)
    }

    fn render(&self, criteria: &Criteria, out: &mut String, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(Error::CriteriaTooComplex {
                limit: self.max_depth,
            });
        }

        match criteria {
            Criteria::All => out.push_str("ALL"),
            Criteria::FlagSet(flag) => render_flag(flag, true, out)?,
            Criteria::FlagUnset(flag) => render_flag(flag, false, out)?,
            Criteria::Header { name, value } => {
                out.push_str("HEADER ");
                push_quoted(out, "HEADER", name)?;
                out.push(' ');
                push_quoted(out, "HEADER", value)?;
            }
            Criteria::Subject(s) => {
                out.push_str("SUBJECT ");
                push_quoted(out, "SUBJECT", s)?;
            }
            Criteria::Body(s) => {
                out.push_str("BODY ");
                push_quoted(out, "BODY", s)?;
            }
            Criteria::Text(s) => {
                out.push_str("TEXT ");
                push_quoted(out, "TEXT", s)?;
            }
            Criteria::From(s) => {
                out.push_str("FROM ");
                push_quoted(out, "FROM", s)?;
            }
            Criteria::To(s) => {
                out.push_str("TO ");
                push_quoted(out, "TO", s)?;
            }
            Criteria::Cc(s) => {
                out.push_str("CC ");
                push_quoted(out, "CC", s)?;
            }
            Criteria::Before(date) => {
                out.push_str("BEFORE ");
                out.push_str(&date.to_string());
            }
            Criteria::Since(date) => {
                out.push_str("SINCE ");
                out.push_str(&date.to_string());
            }
            Criteria::On(date) => {
                out.push_str("ON ");
                out.push_str(&date.to_string());
            }
            Criteria::Larger(size) => {
                out.push_str("LARGER ");
                out.push_str(&size.to_string());
            }
            Criteria::Smaller(size) => {
                out.push_str("SMALLER ");
                out.push_str(&size.to_string());
            }
            Criteria::And(left, right) => {
                // Juxtaposition is conjunction; nested ANDs flatten into
                // one space-separated sequence.
                self.render(left, out, depth + 1)?;
                out.push(' ');
                self.render(right, out, depth + 1)?;
            }
            Criteria::Or(left, right) => {
                out.push_str("OR ");
                let group = left.is_compound() || right.is_compound();
                self.render_operand(left, out, depth + 1, group)?;
                out.push(' ');
                self.render_operand(right, out, depth + 1, group)?;
            }
            Criteria::Not(child) => {
                if matches!(child.as_ref(), Criteria::All) {
                    return Err(Error::InvalidCriteria(
                        "NOT ALL is not expressible".to_string(),
                    ));
                }
                out.push_str("NOT ");
                self.render_operand(child, out, depth + 1, child.is_compound())?;
            }
        }
        Ok(())
    }

    fn render_operand(
        &self,
        criteria: &Criteria,
        out: &mut String,
        depth: usize,
        group: bool,
    ) -> Result<()> {
        if group {
            out.push('(');
        }
        self.render(criteria, out, depth)?;
        if group {
            out.push(')');
        }
        Ok(())
    }
}

/// Compiles with the default compiler settings.
///
/// # Errors
///
/// See [`CriteriaCompiler::compile`].
pub fn compile(criteria: &Criteria) -> Result<String> {
    CriteriaCompiler::new().compile(criteria)
}

fn render_flag(flag: &Flag, set: bool, out: &mut String) -> Result<()> {
    let keyword = match (flag, set) {
        (Flag::Seen, true) => "SEEN",
        (Flag::Seen, false) => "UNSEEN",
        (Flag::Answered, true) => "ANSWERED",
        (Flag::Answered, false) => "UNANSWERED",
        (Flag::Flagged, true) => "FLAGGED",
        (Flag::Flagged, false) => "UNFLAGGED",
        (Flag::Deleted, true) => "DELETED",
        (Flag::Deleted, false) => "UNDELETED",
        (Flag::Draft, true) => "DRAFT",
        (Flag::Draft, false) => "UNDRAFT",
        (Flag::Recent, true) => "RECENT",
        (Flag::Recent, false) => "OLD",
        (Flag::Keyword(name), set) => {
            out.push_str(if set { "KEYWORD " } else { "UNKEYWORD " });
            let atom = validated_keyword(if set { "KEYWORD" } else { "UNKEYWORD" }, name.clone())?;
            out.push_str(&atom);
            return Ok(());
        }
    };
    out.push_str(keyword);
    Ok(())
}

/// Validates and appends a quoted-string operand, escaping backslash
/// and double-quote.
fn push_quoted(out: &mut String, predicate: &'static str, value: &str) -> Result<()> {
    let value = validated_text(predicate, value)?;
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::search::SearchDate;

    fn date(year: i32, month: u32, day: u32) -> SearchDate {
        SearchDate::new(year, month, day).unwrap()
    }

    mod atom_tests {
        use super::*;

        #[test]
        fn all() {
            assert_eq!(compile(&Criteria::all()).unwrap(), "ALL");
        }

        #[test]
        fn builtin_flags() {
            assert_eq!(compile(&Criteria::seen()).unwrap(), "SEEN");
            assert_eq!(compile(&Criteria::unseen()).unwrap(), "UNSEEN");
            assert_eq!(compile(&Criteria::unanswered()).unwrap(), "UNANSWERED");
            assert_eq!(compile(&Criteria::old()).unwrap(), "OLD");
        }

        #[test]
        fn keyword_flags() {
            let c = Criteria::keyword("$Forwarded").unwrap();
            assert_eq!(compile(&c).unwrap(), "KEYWORD $Forwarded");
            let c = Criteria::unkeyword("$Phishing").unwrap();
            assert_eq!(compile(&c).unwrap(), "UNKEYWORD $Phishing");
        }

        #[test]
        fn strings_are_always_quoted() {
            let c = Criteria::subject("x").unwrap();
            assert_eq!(compile(&c).unwrap(), "SUBJECT \"x\"");
        }

        #[test]
        fn quoting_escapes_backslash_and_quote() {
            let c = Criteria::subject(r#"say "hi" \now"#).unwrap();
            assert_eq!(compile(&c).unwrap(), r#"SUBJECT "say \"hi\" \\now""#);
        }

        #[test]
        fn header_quotes_both_operands() {
            let c = Criteria::header("X-Priority", "1 (Highest)").unwrap();
            assert_eq!(compile(&c).unwrap(), "HEADER \"X-Priority\" \"1 (Highest)\"");
        }

        #[test]
        fn non_ascii_is_preserved_inside_quotes() {
            let c = Criteria::from("bjørn@example.no").unwrap();
            assert_eq!(compile(&c).unwrap(), "FROM \"bjørn@example.no\"");
        }

        #[test]
        fn dates() {
            assert_eq!(
                compile(&Criteria::before(date(2023, 12, 1))).unwrap(),
                "BEFORE 01-Dec-2023"
            );
            assert_eq!(
                compile(&Criteria::on(date(2024, 2, 29))).unwrap(),
                "ON 29-Feb-2024"
            );
        }

        #[test]
        fn sizes() {
            assert_eq!(compile(&Criteria::larger(1_048_576)).unwrap(), "LARGER 1048576");
            assert_eq!(compile(&Criteria::smaller(0)).unwrap(), "SMALLER 0");
        }
    }

    mod compound_tests {
        use super::*;

        #[test]
        fn and_is_juxtaposition() {
            let c = Criteria::unseen().and(Criteria::since(date(2024, 1, 8)));
            assert_eq!(compile(&c).unwrap(), "UNSEEN SINCE 08-Jan-2024");
        }

        #[test]
        fn nested_ands_flatten() {
            let c = Criteria::unseen()
                .and(Criteria::flagged())
                .and(Criteria::larger(512).and(Criteria::smaller(4096)));
            assert_eq!(
                compile(&c).unwrap(),
                "UNSEEN FLAGGED LARGER 512 SMALLER 4096"
            );
        }

        #[test]
        fn or_with_atomic_operands_stays_bare() {
            let c = Criteria::flagged().or(Criteria::subject("x").unwrap());
            assert_eq!(compile(&c).unwrap(), "OR FLAGGED SUBJECT \"x\"");
        }

        #[test]
        fn or_groups_compound_operands() {
            let c = Criteria::unseen()
                .and(Criteria::since(date(2024, 1, 8)))
                .or(Criteria::flagged());
            assert_eq!(
                compile(&c).unwrap(),
                "OR (UNSEEN SINCE 08-Jan-2024) (FLAGGED)"
            );
        }

        #[test]
        fn nested_or() {
            let inner = Criteria::seen().or(Criteria::draft());
            let c = inner.or(Criteria::flagged());
            assert_eq!(compile(&c).unwrap(), "OR (OR SEEN DRAFT) (FLAGGED)");
        }

        #[test]
        fn not_atomic_stays_bare() {
            let c = Criteria::from("noise@example.com").unwrap().not();
            assert_eq!(compile(&c).unwrap(), "NOT FROM \"noise@example.com\"");
        }

        #[test]
        fn not_compound_is_grouped() {
            let c = Criteria::seen().and(Criteria::answered()).not();
            assert_eq!(compile(&c).unwrap(), "NOT (SEEN ANSWERED)");
        }

        #[test]
        fn not_all_is_rejected() {
            let err = compile(&Criteria::all().not()).unwrap_err();
            assert!(matches!(err, Error::InvalidCriteria(_)));
        }

        #[test]
        fn all_inside_and_is_degenerate_but_allowed() {
            let c = Criteria::all().and(Criteria::unseen());
            assert_eq!(compile(&c).unwrap(), "ALL UNSEEN");
        }
    }

    mod limit_tests {
        use super::*;

        #[test]
        fn deterministic_output() {
            let c = Criteria::unseen()
                .and(Criteria::from("a@b.c").unwrap())
                .or(Criteria::flagged().not());
            assert_eq!(compile(&c).unwrap(), compile(&c).unwrap());
        }

        #[test]
        fn depth_limit_enforced() {
            let mut c = Criteria::seen();
            for _ in 0..70 {
                c = c.and(Criteria::flagged());
            }
            let err = compile(&c).unwrap_err();
            assert_eq!(err, Error::CriteriaTooComplex { limit: 64 });
        }

        #[test]
        fn depth_limit_configurable() {
            let c = Criteria::seen().and(Criteria::flagged()).not();
            let compiler = CriteriaCompiler::new().max_depth(2);
            assert!(compiler.compile(&c).is_err());
            let compiler = CriteriaCompiler::new().max_depth(3);
            assert_eq!(compiler.compile(&c).unwrap(), "NOT (SEEN FLAGGED)");
        }

        #[test]
        fn invalid_operand_caught_at_compile_time() {
            // Variants are public, so a tree can be built without the
            // validating constructors; compilation still rejects it.
            let c = Criteria::Subject(String::new());
            assert!(matches!(
                compile(&c).unwrap_err(),
                Error::InvalidOperand {
                    predicate: "SUBJECT",
                    ..
                }
            ));
        }
    }
}
