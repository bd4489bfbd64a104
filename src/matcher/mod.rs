//! The matcher family: a closed tagged variant (`{Fuzzy, ExtendedFuzzy,
//! ExtendedExact}`) behind one contract exposing `is_empty`/`compile`/`scan`.

pub mod extended;
pub mod fields;
pub mod fuzzy;

use std::fmt;

use crate::item::Offset;

/// Case-sensitivity policy for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum CaseMatching {
    /// Case-insensitive by default, case-sensitive if the query contains any
    /// uppercase rune (smart-case).
    #[default]
    Smart,
    Ignore,
    Respect,
}

impl CaseMatching {
    /// Resolves smart-case against a query string.
    pub fn is_case_sensitive(self, query: &str) -> bool {
        match self {
            CaseMatching::Respect => true,
            CaseMatching::Ignore => false,
            CaseMatching::Smart => query.chars().any(|c| c.is_uppercase()),
        }
    }
}

/// One compiled query, ready to be scanned against candidate lines.
pub trait CompiledPattern: fmt::Debug {
    /// Whether this pattern selects the whole input (empty query).
    fn is_empty(&self) -> bool;

    /// Scans a single line, returning the offsets that justify a match, or
    /// `None` if the line does not match.
    fn scan(&self, line: &str) -> Option<Vec<Offset>>;
}

/// A matcher variant: compiles a query (`prefix`/`suffix` being the query
/// text split at the cursor) into a [`CompiledPattern`].
pub trait Matcher {
    fn compile(&self, query: &str, prefix: &str, suffix: &str, case: CaseMatching) -> Box<dyn CompiledPattern>;
}

/// The three matcher variants behind one contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatcherKind {
    #[default]
    Fuzzy,
    ExtendedFuzzy,
    ExtendedExact,
}

impl MatcherKind {
    pub fn from_options(extended: bool, exact: bool) -> Self {
        match (extended, exact) {
            (false, _) => MatcherKind::Fuzzy,
            (true, false) => MatcherKind::ExtendedFuzzy,
            (true, true) => MatcherKind::ExtendedExact,
        }
    }

    pub fn compile(self, query: &str, prefix: &str, suffix: &str, case: CaseMatching) -> Box<dyn CompiledPattern> {
        match self {
            MatcherKind::Fuzzy => fuzzy::FuzzyMatcher.compile(query, prefix, suffix, case),
            MatcherKind::ExtendedFuzzy => extended::ExtendedMatcher { exact_terms: false }.compile(query, prefix, suffix, case),
            MatcherKind::ExtendedExact => extended::ExtendedMatcher { exact_terms: true }.compile(query, prefix, suffix, case),
        }
    }
}

/// Lets [`MatcherKind`] plug into generic decorators such as
/// [`fields::FieldRestricted`] that are written against the trait rather
/// than the concrete enum.
impl Matcher for MatcherKind {
    fn compile(&self, query: &str, prefix: &str, suffix: &str, case: CaseMatching) -> Box<dyn CompiledPattern> {
        MatcherKind::compile(*self, query, prefix, suffix, case)
    }
}

/// Length of the union of offsets after collapsing overlaps — the
/// `match_span_length` term of the rank key.
pub fn span_length(offsets: &[Offset]) -> usize {
    if offsets.is_empty() {
        return 0;
    }
    let mut sorted: Vec<Offset> = offsets.to_vec();
    sorted.sort_unstable();
    let mut total = 0usize;
    let (mut cur_begin, mut cur_end) = sorted[0];
    for &(b, e) in &sorted[1..] {
        if b > cur_end {
            total += cur_end - cur_begin;
            cur_begin = b;
            cur_end = e;
        } else {
            cur_end = cur_end.max(e);
        }
    }
    total += cur_end - cur_begin;
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_length_collapses_overlaps() {
        assert_eq!(span_length(&[(0, 3), (2, 5)]), 5);
        assert_eq!(span_length(&[(0, 1), (5, 6)]), 2);
        assert_eq!(span_length(&[]), 0);
    }

    #[test]
    fn smart_case_detects_uppercase() {
        assert!(CaseMatching::Smart.is_case_sensitive("Mc"));
        assert!(!CaseMatching::Smart.is_case_sensitive("mc"));
        assert!(!CaseMatching::Ignore.is_case_sensitive("Mc"));
        assert!(CaseMatching::Respect.is_case_sensitive("mc"));
    }
}
