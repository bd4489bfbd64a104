//! Plain fuzzy matcher.
//!
//! For a query of runes `c1 c2 … cn`, builds a regex equivalent to
//! `c1 [^c1]*? c2 [^c2]*? … cn`: between consecutive query runes, zero or
//! more characters *not equal to the preceding query rune* (lazy). This
//! enforces a unique canonical match position — the leftmost occurrence of
//! each query rune not already consumed, uniformly as
//! "greedy-avoid-the-next-query-rune" for every rune, multi-byte or not,
//! since `regex` escapes whole runes rather than bytes.

use regex::Regex;

use super::{CaseMatching, CompiledPattern, Matcher};
use crate::item::Offset;

/// Escapes a single rune for use as a bare literal in a pattern.
fn escape_literal(c: char) -> String {
    regex::escape(&c.to_string())
}

/// Escapes a single rune for use inside a `[...]` character class.
fn escape_in_class(c: char) -> String {
    match c {
        '\\' => "\\\\".to_string(),
        ']' => "\\]".to_string(),
        '^' => "\\^".to_string(),
        _ => c.to_string(),
    }
}

/// Builds the fuzzy regex for a query, or `None` for an empty query (which
/// matches everything with no offsets).
pub fn build_pattern(query: &str, case_sensitive: bool) -> Option<Regex> {
    let runes: Vec<char> = query.chars().collect();
    if runes.is_empty() {
        return None;
    }

    let mut pattern = String::new();
    if !case_sensitive {
        pattern.push_str("(?i)");
    }
    for (i, &c) in runes.iter().enumerate() {
        pattern.push_str(&escape_literal(c));
        if i + 1 < runes.len() {
            pattern.push_str("[^");
            pattern.push_str(&escape_in_class(c));
            pattern.push_str("]*?");
        }
    }

    Regex::new(&pattern).ok()
}

#[derive(Debug)]
pub struct FuzzyPattern {
    regex: Option<Regex>,
}

impl CompiledPattern for FuzzyPattern {
    fn is_empty(&self) -> bool {
        self.regex.is_none()
    }

    fn scan(&self, line: &str) -> Option<Vec<Offset>> {
        match &self.regex {
            None => Some(Vec::new()),
            Some(re) => re.find(line).map(|m| vec![(m.start(), m.end())]),
        }
    }
}

/// The plain fuzzy matcher variant.
pub struct FuzzyMatcher;

impl Matcher for FuzzyMatcher {
    fn compile(&self, query: &str, _prefix: &str, _suffix: &str, case: CaseMatching) -> Box<dyn CompiledPattern> {
        let case_sensitive = case.is_case_sensitive(query);
        Box::new(FuzzyPattern { regex: build_pattern(query, case_sensitive) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(query: &str, line: &str) -> Option<Vec<Offset>> {
        let case_sensitive = CaseMatching::Smart.is_case_sensitive(query);
        let pattern = FuzzyPattern { regex: build_pattern(query, case_sensitive) };
        pattern.scan(line)
    }

    #[test]
    fn fuzzy_match_picks_leftmost_canonical_position() {
        // corpus ["Makefile","main.c","README"], query "mc" -> main.c only: leftmost
        // 'm' at 0, then the leftmost 'c' not preceded by another 'm', at 5 (exclusive end 6).
        assert_eq!(scan("mc", "Makefile"), None);
        assert_eq!(scan("mc", "main.c"), Some(vec![(0, 6)]));
        assert_eq!(scan("mc", "README"), None);
    }

    #[test]
    fn empty_query_matches_everything_with_no_offsets() {
        assert_eq!(scan("", "anything"), Some(vec![]));
    }

    #[test]
    fn smart_case_becomes_sensitive_on_uppercase() {
        assert_eq!(scan("Mc", "main.c"), None);
        assert_eq!(scan("Mc", "Mainframe.c"), Some(vec![(0, 11)]));
    }

    #[test]
    fn query_longer_than_line_has_no_match() {
        assert_eq!(scan("xxxxxxxxxxxxxxxxxxxx", "short"), None);
    }

    #[test]
    fn reconstructs_query_runes_in_order() {
        // match soundness: the offsets span reconstructs the query in order
        let offsets = scan("abc", "xaxxbxxc").unwrap();
        let (b, e) = offsets[0];
        assert_eq!(b, 1);
        assert_eq!(e, 8);
    }

    #[test]
    fn prefix_subsumption() {
        // matches(q + c) is a subset of matches(q)
        let lines = ["abc", "aXbXc", "xyz", "ac"];
        for line in lines {
            let m_q = scan("ac", line).is_some();
            let m_qc = scan("acb", line).is_some();
            if m_qc {
                assert!(m_q, "matches({line:?}, 'acb') implies matches({line:?}, 'ac')");
            }
        }
    }
}
