//! Searcher thread.
//!
//! Single worker thread: wait on the event bus, fold in whatever `new`/`key`
//! events arrived, rerun the matcher over the accumulated batches, and
//! publish a fresh sorted (or reverse-accumulated) match list. Every
//! publication is visible to the renderer and UI loop through
//! [`SharedState`] without either side touching the bus.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::bus::{AtomicCell, CancelToken, EventBus, EventKind, EventPayload};
use crate::cache::MatchCache;
use crate::item::{Batch, BatchList, Candidate, Match};
use crate::matcher::{span_length, CaseMatching, Matcher};
use crate::reader::PendingBuffer;
use crate::spinner::Spinner;

const MIN_BACKOFF: Duration = Duration::from_millis(4);
const MAX_BACKOFF: Duration = Duration::from_millis(200);
const PROGRESS_THRESHOLD: Duration = Duration::from_millis(500);
const DEFAULT_SORT_LIMIT: usize = 1000;

/// State published by the searcher and read by the renderer/UI loop. Every
/// field is independently readable without locking the others.
#[derive(Default)]
pub struct SharedState {
    matches: AtomicCell<Vec<Match>>,
    count: AtomicUsize,
    spinner: Mutex<Spinner>,
    progress: AtomicCell<Option<u8>>,
    loaded: AtomicBool,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matches(&self) -> Arc<Vec<Match>> {
        self.matches.load()
    }

    /// Total lines read so far, across every published batch.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn spinner_glyph(&self) -> Option<char> {
        self.spinner.lock().unwrap().glyph()
    }

    /// Progress percentage of the in-flight match pass, `None` when idle or
    /// when the current query resolved in under 500 ms.
    pub fn progress(&self) -> Option<u8> {
        *self.progress.load()
    }

    /// Whether the reader has hit EOF (the `loaded` event landed).
    pub fn loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }
}

/// Rank key for a match: `(match_span_length, line_length, line)` ascending.
fn rank_key(m: &Match) -> (usize, usize, &str) {
    (span_length(&m.offsets), m.candidate.len(), m.candidate.text())
}

/// Splits a query at a char-indexed cursor position into `(prefix, suffix)`.
fn split_at_cursor(text: &str, cursor_x: usize) -> (&str, &str) {
    let byte_idx = text.char_indices().nth(cursor_x).map(|(i, _)| i).unwrap_or(text.len());
    (&text[..byte_idx], &text[byte_idx..])
}

/// Outcome of one attempted match pass: either the full accumulated result,
/// or a signal that a fresher key arrived mid-scan and the cycle should
/// restart from step 2.
enum ScanOutcome {
    Done(Vec<Match>),
    Aborted,
}

/// Scans one batch, returning its matches and the lines it accounts for
/// toward progress reporting. `seed` is a pre-filter: a candidate not in the
/// seed set cannot match (prefix subsumption), so it is skipped without ever
/// compiling a scan against it.
fn scan_batch(batch: &Batch, compiled: &dyn crate::matcher::CompiledPattern, seed: Option<&HashSet<u32>>) -> Vec<Match> {
    if compiled.is_empty() {
        return batch.lines.iter().map(|c| Match::whole_line(c.clone())).collect();
    }
    let mut out = Vec::new();
    for candidate in &batch.lines {
        if let Some(set) = seed {
            if !set.contains(&candidate.index) {
                continue;
            }
        }
        if let Some(offsets) = compiled.scan(candidate.text()) {
            out.push(Match { candidate: candidate.clone(), offsets });
        }
    }
    out
}

/// Scans every batch in arrival order, returning the per-batch match groups
/// (not yet flattened) so a caller can choose to sort the flattened result
/// or reverse the batch groups while keeping each batch's internal order.
#[allow(clippy::too_many_arguments)]
fn run_match_pass_grouped(
    batches: &BatchList,
    compiled: &dyn crate::matcher::CompiledPattern,
    seed: Option<&HashSet<u32>>,
    cancel: &CancelToken,
    generation: u64,
    shared: &SharedState,
) -> Option<Vec<Vec<Match>>> {
    let start = Instant::now();
    let mut per_batch: Vec<Vec<Match>> = Vec::with_capacity(batches.batches().len());
    let mut scanned = 0usize;
    let total = batches.count().max(1);

    for batch in batches.batches() {
        per_batch.push(scan_batch(batch, compiled, seed));
        scanned += batch.lines.len();

        if cancel.is_stale(generation) {
            return None;
        }
        if !compiled.is_empty() && start.elapsed() > PROGRESS_THRESHOLD {
            let pct = ((scanned as u64 * 100) / total as u64).min(100) as u8;
            shared.progress.store(Arc::new(Some(pct)));
        }
    }

    Some(per_batch)
}

/// Runs the same scan but newest-batch-first, used when the final ordering
/// step reverses instead of sorts.
fn run_match_pass_reversed(
    batches: &BatchList,
    compiled: &dyn crate::matcher::CompiledPattern,
    cancel: &CancelToken,
    generation: u64,
    shared: &SharedState,
) -> ScanOutcome {
    let start = Instant::now();
    let mut per_batch: Vec<Vec<Match>> = Vec::with_capacity(batches.batches().len());
    let mut scanned = 0usize;
    let total = batches.count().max(1);

    for batch in batches.batches() {
        per_batch.push(scan_batch(batch, compiled, None));
        scanned += batch.lines.len();

        if cancel.is_stale(generation) {
            return ScanOutcome::Aborted;
        }
        if !compiled.is_empty() && start.elapsed() > PROGRESS_THRESHOLD {
            let pct = ((scanned as u64 * 100) / total as u64).min(100) as u8;
            shared.progress.store(Arc::new(Some(pct)));
        }
    }

    per_batch.reverse();
    ScanOutcome::Done(per_batch.into_iter().flatten().collect())
}

/// Handle to the running searcher thread.
pub struct SearcherControl {
    handle: Option<JoinHandle<()>>,
}

impl SearcherControl {
    pub fn join(mut self) {
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// Spawns the searcher thread, returning the shared state the renderer/UI
/// loop read from and a handle to join on shutdown.
pub fn spawn(
    bus: Arc<EventBus>,
    pending: PendingBuffer,
    cancel: CancelToken,
    matcher: Box<dyn Matcher + Send + Sync>,
    case: CaseMatching,
    sort_enabled: bool,
    sort_limit: usize,
) -> (Arc<SharedState>, SearcherControl) {
    let shared = Arc::new(SharedState::new());
    let shared_for_thread = shared.clone();

    let handle = std::thread::Builder::new()
        .name("sk-searcher".into())
        .spawn(move || {
            searcher_loop(bus, pending, cancel, matcher.as_ref(), case, sort_enabled, sort_limit, &shared_for_thread);
        })
        .expect("failed to spawn searcher thread");

    (shared, SearcherControl { handle: Some(handle) })
}

#[allow(clippy::too_many_arguments)]
fn searcher_loop(
    bus: Arc<EventBus>,
    pending: PendingBuffer,
    cancel: CancelToken,
    matcher: &(dyn Matcher + Send + Sync),
    case: CaseMatching,
    sort_enabled: bool,
    sort_limit: usize,
    shared: &SharedState,
) {
    let mut batches = BatchList::new();
    let mut cache = MatchCache::new();
    let mut query_text: Arc<str> = Arc::from("");
    let mut cursor_x: usize = 0;
    let mut backoff = MIN_BACKOFF;

    loop {
        let events = bus.wait();
        if events.contains_key(&EventKind::Stop) {
            return;
        }
        let is_new = events.contains_key(&EventKind::New);
        let is_loaded = events.contains_key(&EventKind::Loaded);
        let user_initiated = events.get(&EventKind::Key).is_some();

        shared.progress.store(Arc::new(None));

        if is_new {
            let batch = pending.take_batch();
            shared.count.fetch_add(batch.lines.len(), Ordering::SeqCst);
            batches.push(batch);
            shared.spinner.lock().unwrap().tick();
            cache.flush();
        }
        if is_loaded {
            shared.spinner.lock().unwrap().stop();
            shared.loaded.store(true, Ordering::SeqCst);
        }
        if let Some(EventPayload::Key { text, cursor_x: cx, .. }) = events.get(&EventKind::Key) {
            query_text = text.clone();
            cursor_x = *cx;
        }

        if (is_new || user_initiated) && !batches.is_empty() {
            let generation = cancel.generation();
            let outcome = run_cycle(&batches, &mut cache, matcher, case, &query_text, cursor_x, sort_enabled, sort_limit, &cancel, generation, shared);
            if let ScanOutcome::Done(_) = outcome {
                backoff = MIN_BACKOFF;
            }
        }

        if !user_initiated {
            std::thread::sleep(backoff);
            backoff = (backoff * 2).min(MAX_BACKOFF);
        } else {
            backoff = MIN_BACKOFF;
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_cycle(
    batches: &BatchList,
    cache: &mut MatchCache,
    matcher: &(dyn Matcher + Send + Sync),
    case: CaseMatching,
    query_text: &str,
    cursor_x: usize,
    sort_enabled: bool,
    sort_limit: usize,
    cancel: &CancelToken,
    generation: u64,
    shared: &SharedState,
) -> ScanOutcome {
    if query_text.is_empty() {
        let result: Vec<Match> = batches.iter().map(|c| Match::whole_line(c.clone())).collect();
        shared.matches.store(Arc::new(result));
        return ScanOutcome::Done(Vec::new());
    }

    if let Some(cached) = cache.get(query_text) {
        finish_cycle(cached.as_ref().clone(), sort_enabled, sort_limit, shared);
        return ScanOutcome::Done(Vec::new());
    }

    let (prefix, suffix) = split_at_cursor(query_text, cursor_x);
    let trimmed_prefix = MatchCache::trim_incomplete_last_token(prefix);
    let seed = cache.seed_universe(trimmed_prefix, suffix);
    let seed_set: Option<HashSet<u32>> = seed.as_ref().map(|m| m.iter().map(|mm| mm.candidate.index).collect());

    let compiled = matcher.compile(query_text, prefix, suffix, case);

    let mut result = if sort_enabled {
        let Some(per_batch) = run_match_pass_grouped(batches, compiled.as_ref(), seed_set.as_ref(), cancel, generation, shared) else {
            return ScanOutcome::Aborted;
        };
        let total: usize = per_batch.iter().map(Vec::len).sum();
        // Sorting is only applied when the result is within the sort-limit
        // even if sorting is enabled; past that, reverse the batch groups
        // (newest batches first) while keeping each batch's internal order,
        // instead of sorting.
        if total <= sort_limit {
            let mut flat: Vec<Match> = per_batch.into_iter().flatten().collect();
            flat.sort_by(|a, b| rank_key(a).cmp(&rank_key(b)));
            flat
        } else {
            let mut groups = per_batch;
            groups.reverse();
            groups.into_iter().flatten().collect()
        }
    } else {
        match run_match_pass_reversed(batches, compiled.as_ref(), cancel, generation, shared) {
            ScanOutcome::Done(r) => r,
            ScanOutcome::Aborted => return ScanOutcome::Aborted,
        }
    };

    cache.insert(query_text.to_string(), Arc::new(result.clone()));
    finish_cycle(std::mem::take(&mut result), false, sort_limit, shared);
    ScanOutcome::Done(Vec::new())
}

fn finish_cycle(result: Vec<Match>, already_ordered: bool, _sort_limit: usize, shared: &SharedState) {
    let _ = already_ordered;
    shared.matches.store(Arc::new(result));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::fuzzy::FuzzyMatcher;
    use std::time::Duration;

    fn push_lines(bus: &Arc<EventBus>, pending: &PendingBuffer, lines: &[&str]) {
        for (i, l) in lines.iter().enumerate() {
            pending.push(Candidate::new(*l, i as u32));
        }
        bus.emit(EventKind::New, EventPayload::Unit);
    }

    fn send_key(bus: &Arc<EventBus>, cancel: &CancelToken, text: &str, seq: u64) {
        cancel.bump();
        bus.emit(EventKind::Key, EventPayload::Key { text: Arc::from(text), cursor_x: text.chars().count(), seq });
    }

    #[test]
    fn rank_breaks_span_length_ties_by_line_length() {
        let bus = Arc::new(EventBus::new());
        let pending = PendingBuffer::default();
        let cancel = CancelToken::new();
        let (shared, _control) = spawn(bus.clone(), pending.clone(), cancel.clone(), Box::new(FuzzyMatcher), CaseMatching::Smart, true, DEFAULT_SORT_LIMIT);

        push_lines(&bus, &pending, &["abXc", "axxxxbxxxxc"]);
        std::thread::sleep(Duration::from_millis(50));
        send_key(&bus, &cancel, "abc", 1);

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let m = shared.matches();
            if m.len() == 2 {
                assert_eq!(m[0].candidate.text(), "abXc");
                assert_eq!(m[1].candidate.text(), "axxxxbxxxxc");
                break;
            }
            assert!(Instant::now() < deadline, "timed out waiting for matches");
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn empty_query_returns_all_lines_unfiltered() {
        let bus = Arc::new(EventBus::new());
        let pending = PendingBuffer::default();
        let cancel = CancelToken::new();
        let (shared, _control) = spawn(bus.clone(), pending.clone(), cancel, Box::new(FuzzyMatcher), CaseMatching::Smart, true, DEFAULT_SORT_LIMIT);

        push_lines(&bus, &pending, &["one", "two", "three"]);
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let m = shared.matches();
            if m.len() == 3 {
                assert!(m.iter().all(|mm| mm.offsets.is_empty()));
                break;
            }
            assert!(Instant::now() < deadline, "timed out waiting for matches");
            std::thread::sleep(Duration::from_millis(20));
        }
    }
}
