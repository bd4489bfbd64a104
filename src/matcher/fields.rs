//! Field-restricted matching (`nth`).
//!
//! Wraps any [`Matcher`] so it only considers the configured 1-based
//! (possibly negative) field indices, tokenizing each line with either the
//! AWK default or a user-supplied delimiter regex. Tokenization is memoized
//! per line text since the same batch is rescanned on every keystroke.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use regex::Regex;

use super::{CaseMatching, CompiledPattern, Matcher};
use crate::error::{Error, Result};
use crate::item::Offset;

/// How a line is split into fields.
#[derive(Clone)]
pub enum Delimiter {
    /// Leading whitespace is ignored; fields are non-whitespace runs with
    /// their trailing whitespace attached.
    Awk,
    /// `(?:.*?DELIM)|(?:.+?$)` — built once from a user regex.
    Custom(Regex),
}

impl Delimiter {
    /// Compiles a user delimiter regex, wrapped so it also matches a
    /// trailing field with no terminating delimiter.
    pub fn custom(pattern: &str) -> Result<Self> {
        let compiled = Regex::new(&format!("(?:.*?{pattern})|(?:.+?$)"))
            .map_err(|source| Error::InvalidDelimiter { pattern: pattern.to_string(), source })?;
        Ok(Delimiter::Custom(compiled))
    }

    fn tokenize(&self, line: &str) -> Vec<Offset> {
        match self {
            Delimiter::Awk => awk_fields(line),
            Delimiter::Custom(re) => re.find_iter(line).map(|m| (m.start(), m.end())).collect(),
        }
    }
}

fn awk_fields(line: &str) -> Vec<Offset> {
    let bytes = line.as_bytes();
    let len = bytes.len();
    let mut fields = Vec::new();
    let mut i = 0;
    while i < len {
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len {
            break;
        }
        let begin = i;
        while i < len && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        fields.push((begin, i));
    }
    if fields.is_empty() {
        fields.push((0, len));
    }
    fields
}

/// Resolves a signed 1-based field index (negative = from the end) against
/// the number of fields found. Returns `None` if out of range.
fn resolve_index(idx: i64, n_fields: usize) -> Option<usize> {
    if idx == 0 || n_fields == 0 {
        return None;
    }
    let pos = if idx > 0 { idx - 1 } else { n_fields as i64 + idx };
    if pos < 0 || pos as usize >= n_fields {
        None
    } else {
        Some(pos as usize)
    }
}

struct CompiledField {
    indices: Vec<i64>,
    delimiter: Arc<Delimiter>,
    token_cache: Arc<Mutex<HashMap<Arc<str>, Arc<Vec<Offset>>>>>,
    inner: Box<dyn CompiledPattern>,
}

impl CompiledField {
    fn fields_for(&self, line: &str) -> Arc<Vec<Offset>> {
        let mut cache = self.token_cache.lock().unwrap();
        if let Some(hit) = cache.get(line) {
            return hit.clone();
        }
        let computed = Arc::new(self.delimiter.tokenize(line));
        cache.insert(Arc::from(line), computed.clone());
        computed
    }
}

impl std::fmt::Debug for CompiledField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledField").field("indices", &self.indices).finish()
    }
}

impl CompiledPattern for CompiledField {
    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn scan(&self, line: &str) -> Option<Vec<Offset>> {
        if self.inner.is_empty() {
            return Some(Vec::new());
        }
        let fields = self.fields_for(line);
        for &idx in &self.indices {
            let Some(pos) = resolve_index(idx, fields.len()) else {
                continue;
            };
            let (start, end) = fields[pos];
            let field_text = &line[start..end];
            if let Some(offsets) = self.inner.scan(field_text) {
                return Some(offsets.into_iter().map(|(b, e)| (b + start, e + start)).collect());
            }
        }
        None
    }
}

/// Decorates any matcher with field restriction, the way
/// `SplitMatchEngineFactory` wraps an inner factory.
pub struct FieldRestricted<M> {
    inner: M,
    indices: Vec<i64>,
    delimiter: Arc<Delimiter>,
    token_cache: Arc<Mutex<HashMap<Arc<str>, Arc<Vec<Offset>>>>>,
}

impl<M: Matcher> FieldRestricted<M> {
    pub fn new(inner: M, indices: Vec<i64>, delimiter: Delimiter) -> Self {
        Self { inner, indices, delimiter: Arc::new(delimiter), token_cache: Arc::new(Mutex::new(HashMap::new())) }
    }
}

impl<M: Matcher> Matcher for FieldRestricted<M> {
    fn compile(&self, query: &str, prefix: &str, suffix: &str, case: CaseMatching) -> Box<dyn CompiledPattern> {
        let inner = self.inner.compile(query, prefix, suffix, case);
        Box::new(CompiledField {
            indices: self.indices.clone(),
            delimiter: self.delimiter.clone(),
            token_cache: self.token_cache.clone(),
            inner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::fuzzy::FuzzyMatcher;

    #[test]
    fn nth_restricts_matching_to_the_chosen_field() {
        // corpus ["  alpha   beta"], default AWK delim, query "b", nth=2 -> (10,11) absolute
        let m = FieldRestricted::new(FuzzyMatcher, vec![2], Delimiter::Awk);
        let compiled = m.compile("b", "b", "", CaseMatching::Smart);
        let offsets = compiled.scan("  alpha   beta").unwrap();
        assert_eq!(offsets, vec![(10, 11)]);
    }

    #[test]
    fn out_of_range_index_contributes_no_match_others_still_considered() {
        let m = FieldRestricted::new(FuzzyMatcher, vec![99, 1], Delimiter::Awk);
        let compiled = m.compile("alpha", "alpha", "", CaseMatching::Smart);
        assert!(compiled.scan("alpha beta").is_some());
    }

    #[test]
    fn delimiter_never_matching_makes_whole_line_one_field() {
        let delim = Delimiter::custom(",").unwrap();
        let m = FieldRestricted::new(FuzzyMatcher, vec![1], delim);
        let compiled = m.compile("beta", "beta", "", CaseMatching::Smart);
        assert!(compiled.scan("alpha beta").is_some());
    }

    #[test]
    fn awk_fields_skip_leading_whitespace() {
        assert_eq!(awk_fields("  alpha   beta"), vec![(2, 10), (10, 14)]);
    }

    #[test]
    fn custom_delimiter_rejects_invalid_regex() {
        assert!(Delimiter::custom("(unclosed").is_err());
    }
}
