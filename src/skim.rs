//! Top-level orchestrator: wires the four worker threads together and runs
//! one finder session end to end.

use std::io::{IsTerminal, Read, Write};
use std::sync::Arc;

use crate::bus::{CancelToken, EventBus};
use crate::error::{Error, Result};
use crate::matcher::fields::{Delimiter, FieldRestricted};
use crate::matcher::{CaseMatching, Matcher, MatcherKind};
use crate::options::SkimOptions;
use crate::reader::{self, Source};
use crate::searcher;
use crate::ui::screen::CrosstermScreen;
use crate::ui::{self, RenderQueue, UiOutcome};

/// The outcome of one `Skim::run_with` call.
#[derive(Debug, Clone)]
pub struct SkimOutput {
    /// Whether the user committed a selection (vs. aborting).
    pub accepted: bool,
    /// Selected lines, in multi-select insertion order, or the single
    /// highlighted line when multi-select is off.
    pub selected: Vec<String>,
    /// The final query text, for callers that want to remember it.
    pub query: String,
}

/// Entry point: reads `source`, runs the full reader/searcher/UI/renderer
/// pipeline and returns the user's pick.
///
/// `input` is `None` to read from stdin (or the default command when stdin
/// is a terminal); `Some(reader)` lets library callers feed candidates
/// programmatically.
pub fn run_with(options: &SkimOptions, input: Option<Box<dyn Read + Send>>) -> Result<SkimOutput> {
    let matcher = build_matcher(options)?;
    let case = options.case;
    let sort_enabled = options.sort_enabled();
    let sort_limit = options.sort_limit;

    let source = match input {
        Some(r) => Source::Stream(r),
        None if std::io::stdin().is_terminal() => Source::Command(reader::default_command()),
        None => Source::Stream(Box::new(std::io::stdin())),
    };

    if let Some(pattern) = &options.filter {
        return run_filter(source, matcher, case, pattern);
    }

    let bus = Arc::new(EventBus::new());
    let cancel = CancelToken::new();

    let reader_control = reader::spawn(source, bus.clone())?;
    let (shared, searcher_control) = searcher::spawn(bus.clone(), reader_control.pending.clone(), cancel.clone(), matcher, case, sort_enabled, sort_limit);

    if !options.query.is_empty() {
        cancel.bump();
        let cursor_x = options.query.chars().count();
        bus.emit(crate::bus::EventKind::Key, crate::bus::EventPayload::Key { text: Arc::from(options.query.as_str()), cursor_x, seq: 0 });
    }

    if options.select_1 || options.exit_0 {
        if let Some(output) = try_scripted_exit(options, &shared)? {
            bus.emit(crate::bus::EventKind::Stop, crate::bus::EventPayload::Unit);
            searcher_control.join();
            reader_control.join();
            return Ok(output);
        }
    }

    let mut driver = CrosstermScreen::new(options.use_256_color, options.mouse);
    driver.init()?;
    let rows = options.resolved_height(driver.rows())?.max(1);
    let cols = driver.cols();

    let queue = Arc::new(RenderQueue::new());
    let renderer = ui::spawn_renderer(driver, queue.clone());

    // Any uncaught panic in a worker thread must still leave the screen
    // restored. `run_ui_loop` is the only thread that can observe and
    // report that; the others are joined for their exit status only.
    let outcome = ui::run_ui_loop(bus.clone(), cancel, shared, queue.clone(), options.multi, options.query.clone(), rows, cols);

    bus.emit(crate::bus::EventKind::Stop, crate::bus::EventPayload::Unit);
    queue.push(ui::DrawJob::Stop);
    let render_result = renderer.join();
    searcher_control.join();
    reader_control.join();

    match render_result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(e),
        Err(e) => return Err(Error::WorkerPanic(format!("{e:?}"))),
    }

    match outcome? {
        UiOutcome::Abort => Ok(SkimOutput { accepted: false, selected: Vec::new(), query: String::new() }),
        UiOutcome::Commit(selected) => Ok(SkimOutput { accepted: true, selected, query: String::new() }),
    }
}

/// Writes `output.selected` to `out`, one per line, and returns the process
/// exit code: `0` on a successful selection (including an empty one via
/// `exit-0`), `1` on abort.
pub fn write_output(output: &SkimOutput, mut out: impl Write) -> Result<i32> {
    if output.accepted {
        for line in &output.selected {
            writeln!(out, "{line}")?;
        }
        Ok(0)
    } else {
        Ok(1)
    }
}

fn build_matcher(options: &SkimOptions) -> Result<Box<dyn Matcher + Send + Sync>> {
    let kind = MatcherKind::from_options(options.extended, options.exact);
    let indices = options.field_indices()?;
    if indices.is_empty() {
        return Ok(Box::new(kind));
    }
    let delimiter = match &options.delimiter {
        Some(pattern) => Delimiter::custom(pattern)?,
        None => Delimiter::Awk,
    };
    Ok(Box::new(FieldRestricted::new(kind, indices, delimiter)))
}

/// Filter mode (`-f`): scans the whole corpus against a fixed query and
/// prints matches to stdout, without ever touching the screen.
fn run_filter(source: Source, matcher: Box<dyn Matcher + Send + Sync>, case: CaseMatching, query: &str) -> Result<SkimOutput> {
    let bus = Arc::new(EventBus::new());
    let reader_control = reader::spawn(source, bus.clone())?;

    loop {
        let events = bus.wait();
        if events.contains_key(&crate::bus::EventKind::Loaded) {
            break;
        }
    }
    let batch = reader_control.pending.take_batch();
    reader_control.join();

    let compiled = matcher.compile(query, query, "", case);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut selected = Vec::new();
    for candidate in &batch.lines {
        if compiled.scan(candidate.text()).is_some() {
            writeln!(out, "{}", candidate.text())?;
            selected.push(candidate.text().to_string());
        }
    }
    Ok(SkimOutput { accepted: true, selected, query: query.to_string() })
}

/// Checks the `select-1`/`exit-0` scripting conditions once the reader has
/// fully loaded, before the screen is ever initialized.
fn try_scripted_exit(options: &SkimOptions, shared: &Arc<searcher::SharedState>) -> Result<Option<SkimOutput>> {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
    while !shared.loaded() && std::time::Instant::now() < deadline {
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    // Give the searcher a moment to fold in the final batch once loaded.
    std::thread::sleep(std::time::Duration::from_millis(20));

    let matches = shared.matches();
    if options.select_1 && matches.len() == 1 {
        return Ok(Some(SkimOutput { accepted: true, selected: vec![matches[0].candidate.text().to_string()], query: options.query.clone() }));
    }
    if options.exit_0 && matches.is_empty() {
        return Ok(Some(SkimOutput { accepted: true, selected: Vec::new(), query: options.query.clone() }));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn filter_mode_prints_matching_lines_only() {
        let source = Source::Stream(Box::new(Cursor::new(b"main.c\nMakefile\nREADME\n".to_vec())));
        let output = run_filter(source, Box::new(MatcherKind::Fuzzy), CaseMatching::Smart, "mc").unwrap();
        assert_eq!(output.selected, vec!["main.c"]);
    }
}
