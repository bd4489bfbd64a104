//! Screen driver.
//!
//! [`ScreenDriver`] is the abstract curses-like surface the renderer thread
//! talks to; [`CrosstermScreen`] implements it on top of the `crossterm`
//! dependency's `use-dev-tty` feature, which makes both its terminal-size
//! queries and its event reads target `/dev/tty` directly rather than
//! process stdin, so keystrokes can be read while stdout stays free. Screen
//! output itself is written to stderr, so the real stdout stays reserved for
//! the final selection.

use std::io::{self, Stderr, Write};
use std::time::Duration;

use crossterm::cursor;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};

use crate::error::Result;

/// The abstract screen surface: row/col addressing, a cursor, attribute
/// toggling for highlights, and raw/mouse mode control.
pub trait ScreenDriver {
    fn init(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;
    fn set_pos(&mut self, row: usize, col: usize) -> Result<()>;
    fn clear_to_eol(&mut self) -> Result<()>;
    fn addstr(&mut self, text: &str) -> Result<()>;
    /// Toggles the highlight attribute used for matched spans and the
    /// selection gutter.
    fn set_highlight(&mut self, on: bool) -> Result<()>;
    fn refresh(&mut self) -> Result<()>;
}

/// Resolves the highlight foreground color from `$TERM`'s 256-color support
/// and the `--black`/`--use-256` toggles.
fn resolve_highlight_color(use_256: bool) -> Color {
    if use_256 {
        Color::AnsiValue(220)
    } else {
        Color::Yellow
    }
}

/// `crossterm`-backed screen driver. Drawing goes to stderr; `/dev/tty`
/// reads/writes for terminal size and input are handled internally by
/// `crossterm`'s `use-dev-tty` feature.
pub struct CrosstermScreen {
    out: Stderr,
    rows: usize,
    cols: usize,
    highlight_color: Color,
    mouse_enabled: bool,
}

impl CrosstermScreen {
    pub fn new(use_256_color: bool, mouse_enabled: bool) -> Self {
        Self { out: io::stderr(), rows: 24, cols: 80, highlight_color: resolve_highlight_color(use_256_color), mouse_enabled }
    }
}

impl ScreenDriver for CrosstermScreen {
    fn init(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        execute!(self.out, EnterAlternateScreen, cursor::Hide)?;
        if self.mouse_enabled {
            execute!(self.out, EnableMouseCapture)?;
        }
        let (cols, rows) = terminal::size()?;
        self.rows = rows as usize;
        self.cols = cols as usize;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.mouse_enabled {
            execute!(self.out, DisableMouseCapture)?;
        }
        execute!(self.out, cursor::Show, LeaveAlternateScreen)?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn set_pos(&mut self, row: usize, col: usize) -> Result<()> {
        queue!(self.out, cursor::MoveTo(col as u16, row as u16))?;
        Ok(())
    }

    fn clear_to_eol(&mut self) -> Result<()> {
        queue!(self.out, Clear(ClearType::UntilNewLine))?;
        Ok(())
    }

    fn addstr(&mut self, text: &str) -> Result<()> {
        queue!(self.out, Print(text))?;
        Ok(())
    }

    fn set_highlight(&mut self, on: bool) -> Result<()> {
        if on {
            queue!(self.out, SetAttribute(Attribute::Reverse), SetForegroundColor(self.highlight_color))?;
        } else {
            queue!(self.out, SetAttribute(Attribute::Reset), ResetColor)?;
        }
        Ok(())
    }

    fn refresh(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Polls for a keyboard/mouse event from the controlling terminal, waiting
/// at most `timeout` — a short non-blocking poll used to disambiguate a
/// bare `Esc` from the start of a CSI sequence.
pub fn poll_event(timeout: Duration) -> Result<Option<crossterm::event::Event>> {
    if crossterm::event::poll(timeout)? {
        Ok(Some(crossterm::event::read()?))
    } else {
        Ok(None)
    }
}
