//! Match cache with prefix/suffix-reuse seeding.
//!
//! Per current batch-set, maps a query text to its match list. Cleared
//! whenever a new batch is appended (the searcher calls [`MatchCache::flush`]
//! on every `new` event). Additionally offers [`MatchCache::seed_universe`],
//! which looks for a shorter already-cached query whose result list can
//! serve as the candidate universe for the current query — matches for a
//! longer fuzzy query are a subset of matches for a strict prefix, so a
//! shorter cached result can always be narrowed rather than rescanned.

use std::collections::HashMap;
use std::sync::Arc;

use crate::item::Match;

#[derive(Default)]
pub struct MatchCache {
    entries: HashMap<String, Arc<Vec<Match>>>,
}

impl MatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the cache; called whenever a `new` event lands (a fresh batch
    /// invalidates every previously-memoized result).
    pub fn flush(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, query: &str) -> Option<Arc<Vec<Match>>> {
        self.entries.get(query).cloned()
    }

    pub fn insert(&mut self, query: impl Into<String>, matches: Arc<Vec<Match>>) {
        self.entries.insert(query.into(), matches);
    }

    /// Trims an extended query's prefix down to its last *complete*
    /// whitespace-delimited token, so we never seed from a result computed
    /// against an incomplete `$`-anchored or negation term still being typed.
    pub fn trim_incomplete_last_token(prefix: &str) -> &str {
        match prefix.rfind(char::is_whitespace) {
            Some(idx) => &prefix[..=idx],
            None => "",
        }
    }

    /// Finds the smaller of a prefix-seed and a suffix-seed for `(prefix,
    /// suffix)` (the query text split at the cursor). `extended`
    /// callers should pass a prefix already trimmed with
    /// [`MatchCache::trim_incomplete_last_token`].
    pub fn seed_universe(&self, prefix: &str, suffix: &str) -> Option<Arc<Vec<Match>>> {
        let prefix_seed = Self::shrinking_prefixes(prefix).find_map(|p| self.get(p));
        let suffix_seed = Self::growing_suffix_drops(suffix).find_map(|s| self.get(s));
        match (prefix_seed, suffix_seed) {
            (Some(p), Some(s)) => Some(if p.len() <= s.len() { p } else { s }),
            (Some(p), None) => Some(p),
            (None, Some(s)) => Some(s),
            (None, None) => None,
        }
    }

    /// `prefix[0:len]` for `len` from `|prefix|-1` down to `1` — the
    /// longest (tightest) candidate first.
    fn shrinking_prefixes(prefix: &str) -> impl Iterator<Item = &str> {
        let char_count = prefix.chars().count();
        let boundaries: Vec<usize> = prefix.char_indices().map(|(i, _)| i).chain(std::iter::once(prefix.len())).collect();
        (1..char_count).rev().map(move |len| &prefix[..boundaries[len]])
    }

    /// `suffix[idx:]` for `idx` from `0` upward.
    fn growing_suffix_drops(suffix: &str) -> impl Iterator<Item = &str> {
        let boundaries: Vec<usize> = suffix.char_indices().map(|(i, _)| i).chain(std::iter::once(suffix.len())).collect();
        let char_count = suffix.chars().count();
        (0..char_count).map(move |idx| &suffix[boundaries[idx]..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Candidate;

    fn matches(lines: &[&str]) -> Arc<Vec<Match>> {
        Arc::new(lines.iter().enumerate().map(|(i, l)| Match::whole_line(Candidate::new(*l, i as u32))).collect())
    }

    #[test]
    fn flush_clears_all_entries() {
        let mut cache = MatchCache::new();
        cache.insert("a", matches(&["a"]));
        cache.flush();
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn seeds_from_longest_cached_strict_prefix() {
        let mut cache = MatchCache::new();
        cache.insert("a", matches(&["alpha", "aardvark", "beta"]));
        cache.insert("al", matches(&["alpha"]));
        let seed = cache.seed_universe("alp", "").unwrap();
        // "al" is a longer/tighter cached prefix than "a", so it wins
        assert_eq!(seed.len(), 1);
    }

    #[test]
    fn falls_back_to_shorter_prefix_when_longer_not_cached() {
        let mut cache = MatchCache::new();
        cache.insert("a", matches(&["alpha", "aardvark"]));
        let seed = cache.seed_universe("alp", "").unwrap();
        assert_eq!(seed.len(), 2);
    }

    #[test]
    fn picks_smaller_of_prefix_and_suffix_seed() {
        let mut cache = MatchCache::new();
        cache.insert("a", matches(&["alpha", "aardvark", "apple"]));
        cache.insert("c", matches(&["cat"]));
        // prefix = "ab", suffix = "c" (cursor between them)
        let seed = cache.seed_universe("ab", "c").unwrap();
        assert_eq!(seed.len(), 1);
    }

    #[test]
    fn no_seed_when_nothing_cached() {
        let cache = MatchCache::new();
        assert!(cache.seed_universe("xyz", "").is_none());
    }

    #[test]
    fn trims_incomplete_last_token() {
        assert_eq!(MatchCache::trim_incomplete_last_token("foo ba"), "foo ");
        assert_eq!(MatchCache::trim_incomplete_last_token("foo"), "");
        assert_eq!(MatchCache::trim_incomplete_last_token("foo bar "), "foo bar ");
    }
}
