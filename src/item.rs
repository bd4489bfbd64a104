//! Data model: candidate lines, batches, offsets and matches.
//!
//! A [`Batch`] is append-only once published; the [`BatchList`] the
//! searcher thread owns is therefore safe to iterate without locking past
//! the point a batch was handed over.

use std::sync::Arc;

/// An immutable candidate line as read from the input stream, trailing
/// newline stripped. Lines retain their arrival order.
#[derive(Debug, Clone)]
pub struct Candidate {
    text: Arc<str>,
    /// 0-based arrival index; monotonically increasing across the whole run.
    pub index: u32,
}

impl Candidate {
    pub fn new(text: impl Into<Arc<str>>, index: u32) -> Self {
        Self { text: text.into(), index }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

/// A `[begin, end)` byte interval into a candidate line, `0 <= begin <= end
/// <= len(line)`.
pub type Offset = (usize, usize);

/// A match: a candidate line plus the offsets that justify it. Offsets are
/// sorted and never overlap-merged here; rendering and ranking collapse
/// overlaps when they need a span length.
#[derive(Debug, Clone)]
pub struct Match {
    pub candidate: Candidate,
    pub offsets: Vec<Offset>,
}

impl Match {
    pub fn whole_line(candidate: Candidate) -> Self {
        Self { candidate, offsets: Vec::new() }
    }
}

/// An ordered, append-only sequence of candidate lines published together by
/// the reader between two successive searcher pickups. A batch, once
/// appended, is immutable.
#[derive(Debug, Default, Clone)]
pub struct Batch {
    pub lines: Vec<Candidate>,
}

/// The searcher's accumulated list of batches, iterated in arrival order.
/// The published match list derives exclusively from the concatenation of
/// all published batches in arrival order.
#[derive(Debug, Default)]
pub struct BatchList {
    batches: Vec<Batch>,
    count: usize,
}

impl BatchList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a freshly-read batch, bumping the monotonic total line count.
    pub fn push(&mut self, batch: Batch) {
        self.count += batch.lines.len();
        self.batches.push(batch);
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Total lines read so far across all batches.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Iterates every candidate line across all batches in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.batches.iter().flat_map(|b| b.lines.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_list_preserves_arrival_order_and_count() {
        let mut list = BatchList::new();
        list.push(Batch { lines: vec![Candidate::new("a", 0), Candidate::new("b", 1)] });
        list.push(Batch { lines: vec![Candidate::new("c", 2)] });

        let collected: Vec<&str> = list.iter().map(Candidate::text).collect();
        assert_eq!(collected, vec!["a", "b", "c"]);
        assert_eq!(list.count(), 3);
    }
}
