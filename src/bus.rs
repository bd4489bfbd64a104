//! The event bus and the atomic cells shared between the four worker
//! threads.
//!
//! The bus is a mutex-protected map from [`EventKind`] to [`EventPayload`],
//! woken by a condition variable. Events are idempotent: only the most
//! recent payload per kind survives between pickups, because a producer
//! simply overwrites the map entry rather than queueing. The consumer
//! (the searcher) atomically drains and clears the whole map on each wake.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// The events producers can post. `New` and `Loaded` come from the reader,
/// `Key` from the UI loop, `Stop` from the orchestrator at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A new batch of lines is available.
    New,
    /// The reader has hit EOF; delivered at-most-once.
    Loaded,
    /// The query text or cursor position changed.
    Key,
    /// The session is ending; the searcher thread should exit its loop.
    Stop,
}

/// The payload carried by an event. `New`/`Loaded` carry no data (the
/// searcher re-reads shared state); `Key` carries the query snapshot.
#[derive(Debug, Clone)]
pub enum EventPayload {
    Unit,
    Key { text: Arc<str>, cursor_x: usize, seq: u64 },
}

#[derive(Default)]
struct Inner {
    pending: HashMap<EventKind, EventPayload>,
}

/// A mutex-protected map of pending events plus a condvar to wake a
/// consumer blocked on [`EventBus::wait`].
pub struct EventBus {
    inner: Mutex<Inner>,
    cv: Condvar,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()), cv: Condvar::new() }
    }

    /// Posts (or overwrites) an event. Idempotent: a second `emit` for the
    /// same kind before the consumer wakes simply replaces the payload.
    pub fn emit(&self, kind: EventKind, payload: EventPayload) {
        let mut inner = self.inner.lock().unwrap();
        inner.pending.insert(kind, payload);
        self.cv.notify_all();
    }

    /// Blocks until at least one event is pending, then atomically takes and
    /// clears the whole map.
    pub fn wait(&self) -> HashMap<EventKind, EventPayload> {
        let mut inner = self.inner.lock().unwrap();
        while inner.pending.is_empty() {
            inner = self.cv.wait(inner).unwrap();
        }
        std::mem::take(&mut inner.pending)
    }

    /// Like [`EventBus::wait`] but gives up after `timeout`, returning
    /// whatever (possibly empty) map is pending — used by the searcher's
    /// backoff sleep so it still notices a fresh `Key` promptly.
    pub fn wait_timeout(&self, timeout: Duration) -> HashMap<EventKind, EventPayload> {
        let mut inner = self.inner.lock().unwrap();
        if inner.pending.is_empty() {
            let (guard, _timeout_result) = self.cv.wait_timeout(inner, timeout).unwrap();
            inner = guard;
        }
        std::mem::take(&mut inner.pending)
    }
}

/// A cancellation token set whenever a new `Key` event arrives; the match
/// routine checks it at batch boundaries so a stale in-flight scan can bail
/// out as soon as a fresher query supersedes it.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<std::sync::atomic::AtomicU64>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1
    }

    pub fn generation(&self) -> u64 {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Returns true if the generation observed when the scan started is
    /// stale, i.e. a fresher key event has since bumped the token.
    pub fn is_stale(&self, observed: u64) -> bool {
        self.generation() != observed
    }
}

/// A snapshot cell: the last value published, readable without blocking the
/// writer and vice versa.
#[derive(Default)]
pub struct AtomicCell<T> {
    inner: Mutex<Arc<T>>,
}

impl<T> AtomicCell<T> {
    pub fn new(value: T) -> Self {
        Self { inner: Mutex::new(Arc::new(value)) }
    }

    pub fn load(&self) -> Arc<T> {
        self.inner.lock().unwrap().clone()
    }

    pub fn store(&self, value: Arc<T>) {
        *self.inner.lock().unwrap() = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_cell_roundtrips_latest_value() {
        let cell: AtomicCell<Vec<i32>> = AtomicCell::new(vec![1, 2, 3]);
        assert_eq!(&*cell.load(), &[1, 2, 3]);
        cell.store(Arc::new(vec![4, 5]));
        assert_eq!(&*cell.load(), &[4, 5]);
    }

    #[test]
    fn emit_is_idempotent_keeping_latest_payload() {
        let bus = EventBus::new();
        bus.emit(EventKind::Key, EventPayload::Key { text: "a".into(), cursor_x: 1, seq: 1 });
        bus.emit(EventKind::Key, EventPayload::Key { text: "ab".into(), cursor_x: 2, seq: 2 });
        let drained = bus.wait();
        assert_eq!(drained.len(), 1);
        match &drained[&EventKind::Key] {
            EventPayload::Key { text, seq, .. } => {
                assert_eq!(&**text, "ab");
                assert_eq!(*seq, 2);
            }
            _ => panic!("wrong payload"),
        }
    }

    #[test]
    fn cancel_token_detects_staleness() {
        let token = CancelToken::new();
        let observed = token.generation();
        assert!(!token.is_stale(observed));
        token.bump();
        assert!(token.is_stale(observed));
    }
}
