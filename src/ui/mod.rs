//! Render queue and UI loop.
//!
//! [`RenderQueue`] is the FIFO of draw jobs T4 pushes and T3 drains; only T3
//! ever touches the [`ScreenDriver`]. [`run_ui_loop`] is T4's body: it polls
//! the terminal for keystrokes, folds them into [`QueryState`]/[`ViewState`]
//! through [`input::apply`], publishes `key` events to the searcher, and
//! composes what it reads back from [`crate::searcher::SharedState`] into
//! frames for the renderer.

pub mod input;
pub mod render;
pub mod screen;

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::bus::{CancelToken, EventBus, EventKind, EventPayload};
use crate::item::Match;
use crate::searcher::SharedState;
use input::{decode, Flow, KeyAction, QueryState, ViewState};
use render::{tokenize_row, trim_line, Token};
use screen::{poll_event, ScreenDriver};

/// Short poll window for each terminal read (a short non-blocking poll to
/// disambiguate a bare `Esc`), also the cadence at which the UI loop
/// re-renders to reflect the searcher's background progress/spinner.
const POLL_INTERVAL: Duration = Duration::from_millis(30);

/// One row ready to draw: its tokens, whether it is the highlighted row and
/// whether it is part of the multi-select set.
pub struct RowData {
    pub tokens: Vec<Token>,
    pub current: bool,
    pub selected: bool,
}

/// Everything T3 needs to paint one full frame.
pub struct FrameData {
    pub status_line: String,
    pub prompt_line: String,
    pub cursor_col: usize,
    /// Candidate rows, topmost-first, each already trimmed/tokenized to the
    /// screen width.
    pub rows: Vec<RowData>,
    /// The window height in effect (`--height`, clamped to the terminal's
    /// actual row count); the renderer confines drawing to this many rows
    /// from the top rather than the whole terminal.
    pub total_rows: usize,
}

/// One unit of work for the renderer thread.
pub enum DrawJob {
    Frame(FrameData),
    Stop,
}

/// Mutex/condvar FIFO of [`DrawJob`]s. The UI loop is the only producer in
/// this wiring (it polls the searcher's shared state on its own cadence
/// rather than the searcher pushing directly), but the queue itself makes no
/// such assumption.
#[derive(Default)]
pub struct RenderQueue {
    inner: Mutex<VecDeque<DrawJob>>,
    cv: Condvar,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, job: DrawJob) {
        let mut q = self.inner.lock().unwrap();
        q.push_back(job);
        self.cv.notify_one();
    }

    fn pop_blocking(&self) -> DrawJob {
        let mut q = self.inner.lock().unwrap();
        loop {
            if let Some(job) = q.pop_front() {
                return job;
            }
            q = self.cv.wait(q).unwrap();
        }
    }
}

/// Spawns the renderer thread (T3): owns the screen driver exclusively,
/// drains [`RenderQueue`] jobs and issues the matching draw calls until it
/// sees [`DrawJob::Stop`], then restores the terminal.
pub fn spawn_renderer<D: ScreenDriver + Send + 'static>(mut driver: D, queue: Arc<RenderQueue>) -> std::thread::JoinHandle<crate::error::Result<()>> {
    std::thread::Builder::new()
        .name("sk-renderer".into())
        .spawn(move || {
            let result = renderer_loop(&mut driver, &queue);
            let _ = driver.close();
            result
        })
        .expect("failed to spawn renderer thread")
}

fn renderer_loop(driver: &mut dyn ScreenDriver, queue: &RenderQueue) -> crate::error::Result<()> {
    loop {
        match queue.pop_blocking() {
            DrawJob::Stop => return Ok(()),
            DrawJob::Frame(frame) => render_frame(driver, &frame)?,
        }
    }
}

fn render_frame(driver: &mut dyn ScreenDriver, frame: &FrameData) -> crate::error::Result<()> {
    let rows = frame.total_rows.min(driver.rows());
    let status_row = rows.saturating_sub(2);
    let prompt_row = rows.saturating_sub(1);

    for (i, row) in frame.rows.iter().enumerate() {
        driver.set_pos(i, 0)?;
        driver.clear_to_eol()?;
        if row.selected {
            driver.addstr(if row.current { "+>" } else { "+ " })?;
        } else {
            driver.addstr(if row.current { "> " } else { "  " })?;
        }
        for token in &row.tokens {
            match token {
                Token::Plain(s) => driver.addstr(s)?,
                Token::Highlight(s) => {
                    driver.set_highlight(true)?;
                    driver.addstr(s)?;
                    driver.set_highlight(false)?;
                }
            }
        }
    }
    for i in frame.rows.len()..status_row {
        driver.set_pos(i, 0)?;
        driver.clear_to_eol()?;
    }

    driver.set_pos(status_row, 0)?;
    driver.clear_to_eol()?;
    driver.addstr(&frame.status_line)?;

    driver.set_pos(prompt_row, 0)?;
    driver.clear_to_eol()?;
    driver.addstr(&frame.prompt_line)?;
    driver.set_pos(prompt_row, frame.cursor_col)?;

    driver.refresh()
}

/// Builds one [`FrameData`] from the current query/view/searcher state.
/// `rows` is the resolved window height (`--height`), not necessarily the
/// full terminal height.
#[allow(clippy::too_many_arguments)]
fn build_frame(query: &QueryState, view: &ViewState, matches: &[Match], count: usize, spinner_glyph: Option<char>, progress: Option<u8>, rows: usize, cols: usize) -> FrameData {
    let visible_rows = rows.saturating_sub(2);
    let gutter = 2;
    let width = cols.saturating_sub(gutter);

    let start = view.vcursor.saturating_sub(visible_rows.saturating_sub(1));
    let window: Vec<(usize, &Match)> = matches.iter().enumerate().skip(start).take(visible_rows).collect();

    // Rows are drawn bottom-up, so the match at `vcursor` sits on the
    // bottommost candidate line and the window grows upward from there.
    let mut rows_data: Vec<RowData> = window
        .into_iter()
        .map(|(idx, m)| {
            let (trimmed, offsets) = trim_line(m.candidate.text(), &m.offsets, width);
            let tokens = tokenize_row(&trimmed, &offsets);
            let selected = view.selected.contains_key(m.candidate.text());
            RowData { tokens, current: idx == view.vcursor, selected }
        })
        .collect();
    rows_data.reverse();

    let glyph = spinner_glyph.unwrap_or(' ');
    let mut status_line = format!("{glyph}  {}/{}", matches.len(), count);
    if !view.selected.is_empty() {
        status_line.push_str(&format!(" ({})", view.selected.len()));
    }
    if let Some(pct) = progress {
        status_line.push_str(&format!("  {pct}%"));
    }

    let prompt_line = format!("> {}", query.text);
    let cursor_col = 2 + query.text.char_indices().nth(query.cursor_x).map(|(i, _)| i).unwrap_or(query.text.len());

    FrameData { status_line, prompt_line, cursor_col, rows: rows_data, total_rows: rows }
}

/// Outcome of the UI loop: either a commit (selected lines, in multi-select
/// insertion order, or the single highlighted line) or an abort.
#[derive(Debug, Clone)]
pub enum UiOutcome {
    Commit(Vec<String>),
    Abort,
}

/// Runs the UI loop (T4) until the user commits or aborts. Publishes `key`
/// events to `bus`/`cancel` on every query-text change, polls `shared` for
/// the searcher's latest matches, and pushes frames to `queue`.
#[allow(clippy::too_many_arguments)]
pub fn run_ui_loop(bus: Arc<EventBus>, cancel: CancelToken, shared: Arc<SharedState>, queue: Arc<RenderQueue>, multi: bool, initial_query: String, rows: usize, cols: usize) -> crate::error::Result<UiOutcome> {
    let mut query = QueryState { text: initial_query.clone(), cursor_x: initial_query.chars().count() };
    let mut view = ViewState::new();
    let mut yank = String::new();
    let mut seq: u64 = 0;

    if !query.text.is_empty() {
        seq += 1;
        cancel.bump();
        bus.emit(EventKind::Key, EventPayload::Key { text: Arc::from(query.text.as_str()), cursor_x: query.cursor_x, seq });
    }

    loop {
        let matches = shared.matches();
        let visible_rows = rows.saturating_sub(2).min(matches.len());
        view.clamp(visible_rows);

        let frame = build_frame(&query, &view, &matches, shared.count(), shared.spinner_glyph(), shared.progress(), rows, cols);
        queue.push(DrawJob::Frame(frame));

        let Some(event) = poll_event(POLL_INTERVAL)? else {
            continue;
        };
        let action = decode(event, query.text.is_empty());
        if matches!(action, KeyAction::Noop) {
            continue;
        }

        let (changed, flow) = input::apply(action, &mut query, &mut view, &matches, multi, &mut yank, visible_rows);

        if changed {
            seq += 1;
            cancel.bump();
            bus.emit(EventKind::Key, EventPayload::Key { text: Arc::from(query.text.as_str()), cursor_x: query.cursor_x, seq });
        }

        match flow {
            Flow::Continue => {}
            Flow::Abort => return Ok(UiOutcome::Abort),
            Flow::Commit => {
                let picked = if multi && !view.selected.is_empty() {
                    view.selected.keys().map(|k| k.to_string()).collect()
                } else if let Some(m) = matches.get(view.vcursor) {
                    vec![m.candidate.text().to_string()]
                } else {
                    Vec::new()
                };
                return Ok(UiOutcome::Commit(picked));
            }
        }
    }
}
