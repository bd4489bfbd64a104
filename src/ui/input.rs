//! Keystroke/mouse decoding and query/view state mutation.
//!
//! Decodes each terminal event once into a flat [`KeyAction`] enum, then
//! applies it with [`apply`] — byte-level CSI/SS3 parsing is delegated to
//! `crossterm`, which already solves it; this module only re-expresses the
//! fixed binding table.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use indexmap::IndexMap;
use std::sync::Arc;

use crate::item::Match;

/// One fixed action out of the binding table.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyAction {
    Insert(String),
    DeleteBefore,
    DeleteUnder,
    CursorStart,
    CursorEnd,
    CursorLeft,
    CursorRight,
    WordLeft,
    WordRight,
    KillToStart,
    KillWordBefore,
    Yank,
    Down,
    Up,
    PageTop,
    PageBottom,
    ToggleSelectDown,
    ToggleSelectUp,
    Commit,
    Abort,
    Redraw,
    MouseClick { row: usize, toggle: bool },
    MouseScroll { delta: i32 },
    Noop,
}

/// Decodes one terminal event into a [`KeyAction`]. `empty_query` controls
/// whether Ctrl-D aborts (only when the query is empty).
pub fn decode(event: Event, empty_query: bool) -> KeyAction {
    match event {
        Event::Key(KeyEvent { code, modifiers, .. }) => decode_key(code, modifiers, empty_query),
        Event::Mouse(MouseEvent { kind, column, row, .. }) => decode_mouse(kind, column, row),
        _ => KeyAction::Noop,
    }
}

fn decode_key(code: KeyCode, modifiers: KeyModifiers, empty_query: bool) -> KeyAction {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    let alt = modifiers.contains(KeyModifiers::ALT);

    match (code, ctrl, alt) {
        (KeyCode::Char(c), false, false) => KeyAction::Insert(c.to_string()),
        (KeyCode::Char('h'), true, _) | (KeyCode::Backspace, _, _) => KeyAction::DeleteBefore,
        (KeyCode::Delete, _, _) => KeyAction::DeleteUnder,
        (KeyCode::Char('a'), true, _) | (KeyCode::Home, _, _) => KeyAction::CursorStart,
        (KeyCode::Char('e'), true, _) | (KeyCode::End, _, _) => KeyAction::CursorEnd,
        (KeyCode::Char('b'), true, false) | (KeyCode::Left, _, _) => KeyAction::CursorLeft,
        (KeyCode::Char('f'), true, false) | (KeyCode::Right, _, _) => KeyAction::CursorRight,
        (KeyCode::Char('b'), false, true) => KeyAction::WordLeft,
        (KeyCode::Char('f'), false, true) => KeyAction::WordRight,
        (KeyCode::Char('u'), true, _) => KeyAction::KillToStart,
        (KeyCode::Char('w'), true, _) => KeyAction::KillWordBefore,
        (KeyCode::Char('y'), true, _) => KeyAction::Yank,
        (KeyCode::Char('j'), true, _) | (KeyCode::Char('n'), true, _) | (KeyCode::Down, _, _) => KeyAction::Down,
        (KeyCode::Char('k'), true, _) | (KeyCode::Char('p'), true, _) | (KeyCode::Up, _, _) => KeyAction::Up,
        (KeyCode::PageDown, _, _) => KeyAction::PageTop,
        (KeyCode::PageUp, _, _) => KeyAction::PageBottom,
        (KeyCode::Tab, false, _) => KeyAction::ToggleSelectDown,
        (KeyCode::BackTab, _, _) => KeyAction::ToggleSelectUp,
        (KeyCode::Char('m'), true, _) | (KeyCode::Enter, _, _) => KeyAction::Commit,
        (KeyCode::Char('d'), true, _) if empty_query => KeyAction::Abort,
        (KeyCode::Char('c'), true, _) | (KeyCode::Char('g'), true, _) | (KeyCode::Char('q'), true, _) | (KeyCode::Esc, _, _) => {
            KeyAction::Abort
        }
        (KeyCode::Char('l'), true, _) => KeyAction::Redraw,
        _ => KeyAction::Noop,
    }
}

fn decode_mouse(kind: MouseEventKind, _column: u16, row: u16) -> KeyAction {
    match kind {
        MouseEventKind::Down(MouseButton::Left) => KeyAction::MouseClick { row: row as usize, toggle: false },
        MouseEventKind::Drag(MouseButton::Left) => KeyAction::MouseClick { row: row as usize, toggle: true },
        MouseEventKind::ScrollUp => KeyAction::MouseScroll { delta: 1 },
        MouseEventKind::ScrollDown => KeyAction::MouseScroll { delta: -1 },
        _ => KeyAction::Noop,
    }
}

/// Query text and insertion cursor, owned by the UI loop.
#[derive(Debug, Clone, Default)]
pub struct QueryState {
    pub text: String,
    pub cursor_x: usize,
}

impl QueryState {
    fn char_boundary(&self, idx: usize) -> usize {
        self.text.char_indices().nth(idx).map(|(b, _)| b).unwrap_or(self.text.len())
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn insert(&mut self, s: &str) {
        let byte_idx = self.char_boundary(self.cursor_x);
        self.text.insert_str(byte_idx, s);
        self.cursor_x += s.chars().count();
    }

    /// Deletes the rune before the cursor; returns it for the yank buffer.
    pub fn delete_before(&mut self) -> Option<String> {
        if self.cursor_x == 0 {
            return None;
        }
        let end = self.char_boundary(self.cursor_x);
        let start = self.char_boundary(self.cursor_x - 1);
        let removed = self.text[start..end].to_string();
        self.text.replace_range(start..end, "");
        self.cursor_x -= 1;
        Some(removed)
    }

    pub fn delete_under(&mut self) {
        if self.cursor_x >= self.char_len() {
            return;
        }
        let start = self.char_boundary(self.cursor_x);
        let end = self.char_boundary(self.cursor_x + 1);
        self.text.replace_range(start..end, "");
    }

    pub fn move_left(&mut self) {
        self.cursor_x = self.cursor_x.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor_x = (self.cursor_x + 1).min(self.char_len());
    }

    pub fn move_start(&mut self) {
        self.cursor_x = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor_x = self.char_len();
    }

    /// Moves to the start of the previous whitespace-delimited word.
    pub fn word_left(&mut self) {
        let chars: Vec<char> = self.text.chars().collect();
        let mut i = self.cursor_x;
        while i > 0 && chars[i - 1].is_whitespace() {
            i -= 1;
        }
        while i > 0 && !chars[i - 1].is_whitespace() {
            i -= 1;
        }
        self.cursor_x = i;
    }

    /// Moves to the end of the next whitespace-delimited word.
    pub fn word_right(&mut self) {
        let chars: Vec<char> = self.text.chars().collect();
        let n = chars.len();
        let mut i = self.cursor_x;
        while i < n && chars[i].is_whitespace() {
            i += 1;
        }
        while i < n && !chars[i].is_whitespace() {
            i += 1;
        }
        self.cursor_x = i;
    }

    /// Deletes from the start of the line to the cursor; returns the killed
    /// text for the yank buffer.
    pub fn kill_to_start(&mut self) -> String {
        let end = self.char_boundary(self.cursor_x);
        let killed = self.text[..end].to_string();
        self.text.replace_range(..end, "");
        self.cursor_x = 0;
        killed
    }

    /// Deletes the previous word; returns the killed text.
    pub fn kill_word_before(&mut self) -> String {
        let before = self.cursor_x;
        self.word_left();
        let start = self.char_boundary(self.cursor_x);
        let end = self.char_boundary(before);
        let killed = self.text[start..end].to_string();
        self.text.replace_range(start..end, "");
        killed
    }
}

/// View state: highlighted row, multi-select set, redraw bookkeeping.
#[derive(Default)]
pub struct ViewState {
    pub vcursor: usize,
    pub selected: IndexMap<Arc<str>, ()>,
    pub dirty_rows: HashSet<usize>,
    last_click: Option<(usize, Instant)>,
}

const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(500);

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clamps `vcursor` into `[0, visible_rows.saturating_sub(1)]`, always
    /// valid, or zero when there are no matches.
    pub fn clamp(&mut self, visible_rows: usize) {
        if visible_rows == 0 {
            self.vcursor = 0;
        } else {
            self.vcursor = self.vcursor.min(visible_rows - 1);
        }
    }

    pub fn toggle_selection(&mut self, line: &Match) {
        let key: Arc<str> = Arc::from(line.candidate.text());
        if self.selected.shift_remove(&key).is_none() {
            self.selected.insert(key, ());
        }
    }

    pub fn mark_all_dirty(&mut self, visible_rows: usize) {
        self.dirty_rows = (0..visible_rows).collect();
    }

    /// Returns `true` if this click lands within the double-click window of
    /// the previous click on the same row.
    fn is_double_click(&mut self, row: usize) -> bool {
        let now = Instant::now();
        let double = matches!(self.last_click, Some((r, t)) if r == row && now.duration_since(t) < DOUBLE_CLICK_WINDOW);
        self.last_click = Some((row, now));
        double
    }
}

/// Outcome of applying one [`KeyAction`]: whether the loop should keep
/// going, commit the current pick, or abort.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Commit,
    Abort,
}

/// Applies one decoded action to the query/view state. `matches` is the
/// current published match list; `multi` enables Tab/Shift-Tab/mouse
/// toggling. Returns whether the query text changed (a `key` event should be
/// published) and the resulting control flow.
pub fn apply(action: KeyAction, query: &mut QueryState, view: &mut ViewState, matches: &[Match], multi: bool, yank: &mut String, visible_rows: usize) -> (bool, Flow) {
    let mut query_changed = false;
    let flow = match action {
        KeyAction::Insert(s) => {
            query.insert(&s);
            query_changed = true;
            Flow::Continue
        }
        KeyAction::DeleteBefore => {
            if let Some(removed) = query.delete_before() {
                *yank = removed;
                query_changed = true;
            }
            Flow::Continue
        }
        KeyAction::DeleteUnder => {
            query.delete_under();
            query_changed = true;
            Flow::Continue
        }
        KeyAction::CursorStart => {
            query.move_start();
            Flow::Continue
        }
        KeyAction::CursorEnd => {
            query.move_end();
            Flow::Continue
        }
        KeyAction::CursorLeft => {
            query.move_left();
            Flow::Continue
        }
        KeyAction::CursorRight => {
            query.move_right();
            Flow::Continue
        }
        KeyAction::WordLeft => {
            query.word_left();
            Flow::Continue
        }
        KeyAction::WordRight => {
            query.word_right();
            Flow::Continue
        }
        KeyAction::KillToStart => {
            *yank = query.kill_to_start();
            query_changed = true;
            Flow::Continue
        }
        KeyAction::KillWordBefore => {
            *yank = query.kill_word_before();
            query_changed = true;
            Flow::Continue
        }
        KeyAction::Yank => {
            if !yank.is_empty() {
                query.insert(&yank.clone());
                query_changed = true;
            }
            Flow::Continue
        }
        KeyAction::Down => {
            view.vcursor = view.vcursor.saturating_sub(1);
            Flow::Continue
        }
        KeyAction::Up => {
            view.vcursor = (view.vcursor + 1).min(visible_rows.saturating_sub(1));
            Flow::Continue
        }
        KeyAction::PageTop => {
            view.vcursor = 0;
            Flow::Continue
        }
        KeyAction::PageBottom => {
            view.vcursor = visible_rows.saturating_sub(1);
            Flow::Continue
        }
        KeyAction::ToggleSelectDown => {
            if multi {
                if let Some(m) = matches.get(view.vcursor) {
                    view.toggle_selection(m);
                }
                view.vcursor = view.vcursor.saturating_sub(1);
            }
            Flow::Continue
        }
        KeyAction::ToggleSelectUp => {
            if multi {
                if let Some(m) = matches.get(view.vcursor) {
                    view.toggle_selection(m);
                }
                view.vcursor = (view.vcursor + 1).min(visible_rows.saturating_sub(1));
            }
            Flow::Continue
        }
        KeyAction::Commit => Flow::Commit,
        KeyAction::Abort => Flow::Abort,
        KeyAction::Redraw => {
            view.mark_all_dirty(visible_rows);
            Flow::Continue
        }
        KeyAction::MouseClick { row, toggle } => {
            view.vcursor = row.min(visible_rows.saturating_sub(1));
            if toggle && multi {
                if let Some(m) = matches.get(view.vcursor) {
                    view.toggle_selection(m);
                }
            }
            if view.is_double_click(row) {
                Flow::Commit
            } else {
                Flow::Continue
            }
        }
        KeyAction::MouseScroll { delta } => {
            if delta > 0 {
                view.vcursor = (view.vcursor + 1).min(visible_rows.saturating_sub(1));
            } else {
                view.vcursor = view.vcursor.saturating_sub(1);
            }
            Flow::Continue
        }
        KeyAction::Noop => Flow::Continue,
    };
    (query_changed, flow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Candidate;

    #[test]
    fn insert_advances_cursor_and_is_utf8_safe() {
        let mut q = QueryState::default();
        q.insert("日本語");
        assert_eq!(q.cursor_x, 3);
        q.insert("x");
        assert_eq!(q.text, "日本語x");
    }

    #[test]
    fn delete_before_removes_preceding_rune() {
        let mut q = QueryState { text: "abc".into(), cursor_x: 2 };
        let removed = q.delete_before().unwrap();
        assert_eq!(removed, "b");
        assert_eq!(q.text, "ac");
        assert_eq!(q.cursor_x, 1);
    }

    #[test]
    fn kill_to_start_fills_yank_buffer() {
        let mut q = QueryState { text: "hello world".into(), cursor_x: 5 };
        let killed = q.kill_to_start();
        assert_eq!(killed, "hello");
        assert_eq!(q.text, " world");
        assert_eq!(q.cursor_x, 0);
    }

    #[test]
    fn word_left_and_right_stop_at_whitespace_boundaries() {
        let mut q = QueryState { text: "foo bar baz".into(), cursor_x: 11 };
        q.word_left();
        assert_eq!(q.cursor_x, 8);
        q.word_left();
        assert_eq!(q.cursor_x, 4);
        q.word_right();
        assert_eq!(q.cursor_x, 7);
    }

    #[test]
    fn tab_toggles_selection_and_moves_down_in_multi_mode() {
        let mut query = QueryState::default();
        let mut view = ViewState::new();
        let mut yank = String::new();
        let matches = vec![Match::whole_line(Candidate::new("a", 0)), Match::whole_line(Candidate::new("b", 1))];
        view.vcursor = 1;
        let (_, flow) = apply(KeyAction::ToggleSelectDown, &mut query, &mut view, &matches, true, &mut yank, 2);
        assert_eq!(flow, Flow::Continue);
        assert!(view.selected.contains_key("b"));
        assert_eq!(view.vcursor, 0);
    }

    #[test]
    fn multi_select_preserves_insertion_order() {
        let mut view = ViewState::new();
        let candidates = ["A", "B", "C"];
        let matches: Vec<Match> = candidates.iter().enumerate().map(|(i, c)| Match::whole_line(Candidate::new(*c, i as u32))).collect();
        // user selects A, then C, then B
        view.toggle_selection(&matches[0]);
        view.toggle_selection(&matches[2]);
        view.toggle_selection(&matches[1]);
        let order: Vec<&str> = view.selected.keys().map(|k| k.as_ref()).collect();
        assert_eq!(order, vec!["A", "C", "B"]);
    }

    #[test]
    fn enter_commits_escape_aborts() {
        let mut query = QueryState::default();
        let mut view = ViewState::new();
        let mut yank = String::new();
        let (_, flow) = apply(KeyAction::Commit, &mut query, &mut view, &[], false, &mut yank, 0);
        assert_eq!(flow, Flow::Commit);
        let (_, flow) = apply(KeyAction::Abort, &mut query, &mut view, &[], false, &mut yank, 0);
        assert_eq!(flow, Flow::Abort);
    }
}
