//! Extended matcher: field-restricted matching intersects with this through
//! [`crate::matcher::fields`].
//!
//! The query is split on whitespace into terms; each term contributes one
//! sub-pattern and all of them must match (logical AND). Offsets returned
//! are the union of offsets from every positive (non-negated) sub-match.

use regex::{escape, Regex};

use super::fuzzy::build_pattern;
use super::{CaseMatching, CompiledPattern, Matcher};
use crate::item::Offset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TermKind {
    /// Bare `word`: fuzzy sub-match in fuzzy mode, literal substring in exact mode.
    Sub,
    /// `'word`: forces exact-substring sub-match even in fuzzy mode.
    ExactSub,
    /// `^word`: literal prefix match.
    Prefix,
    /// `word$`: literal suffix match.
    Suffix,
    /// `^word$`: literal full-line match.
    FullLine,
}

#[derive(Debug, Clone)]
struct Term {
    kind: TermKind,
    text: String,
    negate: bool,
}

/// Parses one whitespace-delimited token into a [`Term`]. A term of length 1
/// after stripping its leading `!` is never treated as an anchor form (the
/// bare `^`, `$` or `'` character is matched literally instead), since
/// stripping the anchor would otherwise leave an empty pattern.
fn parse_term(token: &str) -> Term {
    let (negate, body) = match token.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, token),
    };

    if body.len() == 1 {
        return Term { kind: TermKind::Sub, text: body.to_string(), negate };
    }

    if let Some(inner) = body.strip_prefix('^').and_then(|s| s.strip_suffix('$')) {
        if !inner.is_empty() {
            return Term { kind: TermKind::FullLine, text: inner.to_string(), negate };
        }
    }
    if let Some(inner) = body.strip_prefix('^') {
        return Term { kind: TermKind::Prefix, text: inner.to_string(), negate };
    }
    if let Some(inner) = body.strip_suffix('$') {
        return Term { kind: TermKind::Suffix, text: inner.to_string(), negate };
    }
    if let Some(inner) = body.strip_prefix('\'') {
        return Term { kind: TermKind::ExactSub, text: inner.to_string(), negate };
    }

    Term { kind: TermKind::Sub, text: body.to_string(), negate }
}

fn parse_query(query: &str) -> Vec<Term> {
    query.split_whitespace().map(parse_term).collect()
}

fn literal_regex(text: &str, case_sensitive: bool, anchor_start: bool, anchor_end: bool) -> Option<Regex> {
    let mut pattern = String::new();
    if !case_sensitive {
        pattern.push_str("(?i)");
    }
    if anchor_start {
        pattern.push('^');
    }
    pattern.push_str(&escape(text));
    if anchor_end {
        pattern.push('$');
    }
    Regex::new(&pattern).ok()
}

#[derive(Debug)]
struct CompiledTerm {
    regex: Option<Regex>,
    negate: bool,
    /// fuzzy sub-matches go through the same lazy-regex construction as the
    /// plain fuzzy matcher rather than a single literal regex.
    fuzzy: bool,
}

impl CompiledTerm {
    fn eval(&self, line: &str) -> Option<Vec<Offset>> {
        let found = match &self.regex {
            None => Some((0, 0)),
            Some(re) => re.find(line).map(|m| (m.start(), m.end())),
        };
        match (found, self.negate) {
            (Some(_), true) => None,
            (None, true) => Some(Vec::new()),
            (Some((b, e)), false) => Some(vec![(b, e)]),
            (None, false) => None,
        }
    }
}

fn compile_term(term: &Term, exact_terms: bool, case_sensitive: bool) -> CompiledTerm {
    let use_exact = exact_terms || matches!(term.kind, TermKind::ExactSub | TermKind::Prefix | TermKind::Suffix | TermKind::FullLine);

    let regex = match term.kind {
        TermKind::Prefix => literal_regex(&term.text, case_sensitive, true, false),
        TermKind::Suffix => literal_regex(&term.text, case_sensitive, false, true),
        TermKind::FullLine => literal_regex(&term.text, case_sensitive, true, true),
        TermKind::ExactSub => literal_regex(&term.text, case_sensitive, false, false),
        TermKind::Sub if use_exact => literal_regex(&term.text, case_sensitive, false, false),
        TermKind::Sub => build_pattern(&term.text, case_sensitive),
    };

    CompiledTerm { regex, negate: term.negate, fuzzy: !use_exact && term.kind == TermKind::Sub }
}

#[derive(Debug)]
pub struct ExtendedPattern {
    terms: Vec<CompiledTerm>,
}

impl CompiledPattern for ExtendedPattern {
    fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn scan(&self, line: &str) -> Option<Vec<Offset>> {
        if self.terms.is_empty() {
            return Some(Vec::new());
        }
        let mut offsets = Vec::new();
        for term in &self.terms {
            let result = term.eval(line)?;
            offsets.extend(result);
        }
        offsets.sort_unstable();
        offsets.dedup();
        Some(offsets)
    }
}

/// The extended matcher, operating either in fuzzy-sub-term or
/// exact-sub-term mode (`-x`/`-e` at the CLI).
pub struct ExtendedMatcher {
    pub exact_terms: bool,
}

impl Matcher for ExtendedMatcher {
    fn compile(&self, query: &str, _prefix: &str, _suffix: &str, case: CaseMatching) -> Box<dyn CompiledPattern> {
        let case_sensitive = case.is_case_sensitive(query);
        let terms = parse_query(query)
            .iter()
            .map(|t| compile_term(t, self.exact_terms, case_sensitive))
            .collect();
        Box::new(ExtendedPattern { terms })
    }
}

#[allow(dead_code)]
fn is_fuzzy_term(term: &CompiledTerm) -> bool {
    term.fuzzy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(query: &str, line: &str, exact: bool) -> Option<Vec<Offset>> {
        let case_sensitive = CaseMatching::Smart.is_case_sensitive(query);
        let terms: Vec<CompiledTerm> = parse_query(query).iter().map(|t| compile_term(t, exact, case_sensitive)).collect();
        ExtendedPattern { terms }.scan(line)
    }

    #[test]
    fn and_with_negation_excludes_matching_term() {
        // corpus ["foo.rb","foo.py","bar.py"], query "^foo !rb" -> foo.py only
        assert!(scan("^foo !rb", "foo.rb", false).is_none());
        assert!(scan("^foo !rb", "foo.py", false).is_some());
        assert!(scan("^foo !rb", "bar.py", false).is_none());
    }

    #[test]
    fn full_line_anchor_requires_exact_match() {
        assert!(scan("^abc$", "abc", false).is_some());
        assert!(scan("^abc$", "abcd", false).is_none());
    }

    #[test]
    fn forced_exact_sub_term_is_literal_even_in_fuzzy_mode() {
        assert!(scan("'abc", "axbxcx", false).is_none());
        assert!(scan("'abc", "xxabcxx", false).is_some());
    }

    #[test]
    fn bare_word_is_fuzzy_in_fuzzy_mode_and_literal_in_exact_mode() {
        assert!(scan("abc", "axbxcx", false).is_some());
        assert!(scan("abc", "axbxcx", true).is_none());
        assert!(scan("abc", "xxabcxx", true).is_some());
    }

    #[test]
    fn single_char_anchor_tokens_are_literal() {
        // a lone "^" or "$" token is length 1, so it's matched literally
        // rather than treated as a (now-empty) anchored pattern.
        assert!(scan("^", "a^b", false).is_some());
        assert!(scan("^", "abc", false).is_none());
    }

    #[test]
    fn negation_contributes_no_offsets() {
        let offsets = scan("foo !bar", "foozzz", false).unwrap();
        assert!(!offsets.is_empty());
        // every offset must come from the positive "foo" term, never "!bar"
        for (b, e) in &offsets {
            assert!(*e <= 3 || *b < 3);
        }
    }
}
