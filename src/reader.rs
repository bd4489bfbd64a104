//! Reader thread.
//!
//! Drains an input stream into an append-only pending buffer, posting `new`
//! on every append (coalescing is fine — the searcher reads the whole
//! buffer) and `loaded` exactly once at EOF.

use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::bus::{EventBus, EventKind, EventPayload};
use crate::error::{Error, Result};
use crate::item::{Batch, Candidate};

const SKIM_DEFAULT_COMMAND_FALLBACK: &str = "find * -path '*/\\.*' -prune -o -type f -print -o -type l -print";

/// Resolves the default command to run when stdin is a TTY: the
/// `$SKIM_DEFAULT_COMMAND` environment variable if set and non-empty, else
/// the fixed find-style enumeration.
pub fn default_command() -> String {
    match std::env::var("SKIM_DEFAULT_COMMAND") {
        Ok(cmd) if !cmd.is_empty() => cmd,
        _ => SKIM_DEFAULT_COMMAND_FALLBACK.to_string(),
    }
}

/// Where the reader pulls candidate lines from.
pub enum Source {
    /// Any readable stream, typically stdin when it is not a TTY.
    Stream(Box<dyn Read + Send>),
    /// Spawn a shell command and read its stdout.
    Command(String),
}

/// Shared pending-buffer handle the reader appends to and the searcher
/// drains from.
#[derive(Clone, Default)]
pub struct PendingBuffer {
    inner: Arc<Mutex<Vec<Candidate>>>,
}

impl PendingBuffer {
    pub(crate) fn push(&self, line: Candidate) {
        self.inner.lock().unwrap().push(line);
    }

    /// Takes everything accumulated so far as one batch, leaving the buffer
    /// empty for the next round.
    pub fn take_batch(&self) -> Batch {
        let mut guard = self.inner.lock().unwrap();
        Batch { lines: std::mem::take(&mut guard) }
    }
}

/// Handle to a running reader thread.
pub struct ReaderControl {
    handle: Option<JoinHandle<()>>,
    pub pending: PendingBuffer,
}

impl ReaderControl {
    pub fn join(mut self) {
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// Spawns the reader thread over `source`, posting events on `bus` as lines
/// arrive and at EOF.
///
/// A [`Source::Command`] is spawned synchronously, before the thread starts,
/// so a failure to launch it (no input source available at all) surfaces as
/// [`Error::NoInputSource`] to the caller instead of silently producing zero
/// candidates.
pub fn spawn(source: Source, bus: Arc<EventBus>) -> Result<ReaderControl> {
    let pending = PendingBuffer::default();
    let pending_for_thread = pending.clone();
    let index = AtomicU32::new(0);

    let reader: Box<dyn BufRead + Send> = match source {
        Source::Stream(s) => Box::new(BufReader::new(s)),
        Source::Command(cmd) => spawn_command(&cmd).map_err(|e| {
            log::warn!("failed to spawn default command {cmd:?}: {e}");
            Error::NoInputSource
        })?,
    };

    let handle = std::thread::Builder::new()
        .name("sk-reader".into())
        .spawn(move || {
            let mut lines = reader.lines();
            while let Some(next) = lines.next() {
                match next {
                    Ok(text) => {
                        let idx = index.fetch_add(1, Ordering::SeqCst);
                        pending_for_thread.push(Candidate::new(text, idx));
                        bus.emit(EventKind::New, EventPayload::Unit);
                    }
                    Err(e) => {
                        // invalid byte sequences: skip the malformed line, keep draining.
                        log::warn!("skipping unreadable line: {e}");
                    }
                }
            }
            bus.emit(EventKind::Loaded, EventPayload::Unit);
        })
        .expect("failed to spawn reader thread");

    Ok(ReaderControl { handle: Some(handle), pending })
}

fn spawn_command(cmd: &str) -> std::io::Result<Box<dyn BufRead + Send>> {
    let mut child = Command::new("sh").arg("-c").arg(cmd).stdout(Stdio::piped()).stderr(Stdio::null()).spawn()?;
    let stdout = child.stdout.take().expect("piped stdout");
    // Reap in the background so the sub-process never lingers as a zombie;
    // its exit status carries no information skim needs.
    std::thread::spawn(move || {
        let _ = child.wait();
    });
    Ok(Box::new(BufReader::new(stdout)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    #[test]
    fn reads_lines_and_emits_new_then_loaded() {
        let bus = Arc::new(EventBus::new());
        let input = "one\ntwo\nthree\n";
        let control = spawn(Source::Stream(Box::new(Cursor::new(input.as_bytes().to_vec()))), bus.clone()).unwrap();

        // Drain events until we see Loaded, collecting pending batches as we go.
        let mut collected = Vec::new();
        let mut saw_loaded = false;
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !saw_loaded && std::time::Instant::now() < deadline {
            let events = bus.wait_timeout(Duration::from_millis(50));
            if events.contains_key(&EventKind::New) {
                let batch = control.pending.take_batch();
                collected.extend(batch.lines.into_iter().map(|c| c.text().to_string()));
            }
            if events.contains_key(&EventKind::Loaded) {
                saw_loaded = true;
            }
        }
        let trailing = control.pending.take_batch();
        collected.extend(trailing.lines.into_iter().map(|c| c.text().to_string()));

        assert!(saw_loaded);
        assert_eq!(collected, vec!["one", "two", "three"]);
        control.join();
    }

    #[test]
    fn default_command_fallback_is_find_style() {
        // SAFETY: test-only env mutation, single-threaded per test binary run
        unsafe { std::env::remove_var("SKIM_DEFAULT_COMMAND") };
        assert!(default_command().contains("find"));
    }
}
