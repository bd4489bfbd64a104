//! Configuration.
//!
//! `SkimOptions` is built with [`derive_builder`] for library callers and,
//! under the `cli` feature, doubles as a [`clap::Parser`] — one struct
//! serves as the config surface whether it is populated by a binary's argv
//! or by an embedding application.

use derive_builder::Builder;

use crate::error::{Error, Result};
use crate::matcher::CaseMatching;

/// `sk` - fuzzy finder in Rust
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(name = "final_build"))]
#[builder(default)]
#[cfg_attr(feature = "cli", derive(clap::Parser))]
#[cfg_attr(feature = "cli", command(name = "sk", version, about))]
pub struct SkimOptions {
    //  --- Search ---
    /// Extended mode with fuzzy sub-terms
    #[cfg_attr(feature = "cli", arg(short = 'x', long, help_heading = "Search"))]
    pub extended: bool,

    /// Extended mode with exact (literal) sub-terms
    #[cfg_attr(feature = "cli", arg(short = 'e', long, help_heading = "Search"))]
    pub exact: bool,

    /// Case sensitivity: smart (default), ignore, or respect
    #[cfg_attr(feature = "cli", arg(long, default_value = "smart", value_enum, help_heading = "Search"))]
    pub case: CaseMatching,

    /// Fields to be matched, comma-separated signed 1-based indices (`-n 2,-1`)
    #[cfg_attr(feature = "cli", arg(short, long, default_value = "", value_delimiter = ',', help_heading = "Search"))]
    pub nth: Vec<String>,

    /// Field delimiter regex (default: AWK-style whitespace runs)
    #[cfg_attr(feature = "cli", arg(short, long, help_heading = "Search"))]
    pub delimiter: Option<String>,

    /// Sort cap: results are ranked only up to this many matches
    #[cfg_attr(feature = "cli", arg(short = 's', long, default_value_t = 1000, help_heading = "Search"))]
    pub sort_limit: usize,

    /// Disable sorting: newest-batch-first accumulation order instead
    #[cfg_attr(feature = "cli", arg(long, help_heading = "Search"))]
    pub no_sort: bool,

    //  --- Interface ---
    /// Enable multi-select (Tab to toggle, Enter emits all selected lines)
    #[cfg_attr(feature = "cli", arg(short, long, help_heading = "Interface"))]
    pub multi: bool,

    /// Initial query
    #[cfg_attr(feature = "cli", arg(short, long, default_value = "", help_heading = "Interface"))]
    pub query: String,

    /// Automatically select the only match and exit
    #[cfg_attr(feature = "cli", arg(short = '1', long = "select-1", help_heading = "Interface"))]
    pub select_1: bool,

    /// Automatically exit with no selection if there is no match after load
    #[cfg_attr(feature = "cli", arg(short = '0', long = "exit-0", help_heading = "Interface"))]
    pub exit_0: bool,

    /// Filter mode: print matches for STR to stdout, no screen
    #[cfg_attr(feature = "cli", arg(short, long, help_heading = "Interface"))]
    pub filter: Option<String>,

    //  --- Layout ---
    /// Height of skim's window: an integer row count or a `N%` percentage
    #[cfg_attr(feature = "cli", arg(long, default_value = "100%", help_heading = "Layout"))]
    pub height: String,

    //  --- Display ---
    /// Enable color output
    #[cfg_attr(feature = "cli", arg(short = 'c', long, default_value_t = true, help_heading = "Display"))]
    pub color: bool,

    /// Disable color output (the `+c` form)
    #[cfg_attr(feature = "cli", arg(long, help_heading = "Display"))]
    pub no_color: bool,

    /// Use 256-color palette when `$TERM` supports it
    #[cfg_attr(feature = "cli", arg(short = '2', long = "use-256", default_value_t = true, help_heading = "Display"))]
    pub use_256_color: bool,

    /// Force the 8-color fallback palette (the `+2` form)
    #[cfg_attr(feature = "cli", arg(long = "no-256", help_heading = "Display"))]
    pub no_256_color: bool,

    /// Assume black background (`COLOR_BLACK` instead of a transparent default)
    #[cfg_attr(feature = "cli", arg(long, help_heading = "Display"))]
    pub black: bool,

    /// Enable mouse reporting
    #[cfg_attr(feature = "cli", arg(long, default_value_t = true, help_heading = "Display"))]
    pub mouse: bool,

    /// Disable mouse reporting
    #[cfg_attr(feature = "cli", arg(long, help_heading = "Display"))]
    pub no_mouse: bool,
}

impl Default for SkimOptions {
    fn default() -> Self {
        Self {
            extended: false,
            exact: false,
            case: CaseMatching::Smart,
            nth: Vec::new(),
            delimiter: None,
            sort_limit: 1000,
            no_sort: false,
            multi: false,
            query: String::new(),
            select_1: false,
            exit_0: false,
            filter: None,
            height: String::from("100%"),
            color: true,
            no_color: false,
            use_256_color: true,
            no_256_color: false,
            black: false,
            mouse: true,
            no_mouse: false,
        }
    }
}

impl SkimOptionsBuilder {
    /// Builds the options, running [`SkimOptions::finalize`] afterwards.
    pub fn build(&mut self) -> std::result::Result<SkimOptions, SkimOptionsBuilderError> {
        self.final_build().map(SkimOptions::finalize)
    }
}

impl SkimOptions {
    /// Resolves the `-opt`/`+opt` pairs and validates the fields that need
    /// parsing beyond what clap's value types express.
    pub fn finalize(mut self) -> Self {
        if self.no_color {
            self.color = false;
        }
        if self.no_256_color {
            self.use_256_color = false;
        }
        if self.no_mouse {
            self.mouse = false;
        }
        if self.no_sort {
            self.sort_limit = 0;
        }
        self
    }

    /// Parses `nth` into signed 1-based field indices.
    pub fn field_indices(&self) -> Result<Vec<i64>> {
        self.nth
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<i64>().map_err(|_| Error::InvalidFieldSpec(s.clone())))
            .collect()
    }

    /// Whether sorting is enabled at all — `no_sort` collapses `sort_limit`
    /// to zero, which the searcher treats as "never sort".
    pub fn sort_enabled(&self) -> bool {
        !self.no_sort
    }

    /// Parses `height` into a row count against the given terminal height.
    pub fn resolved_height(&self, screen_rows: usize) -> Result<usize> {
        parse_height(&self.height, screen_rows)
    }
}

fn parse_height(spec: &str, screen_rows: usize) -> Result<usize> {
    let spec = spec.trim();
    if let Some(pct) = spec.strip_suffix('%') {
        let pct: f64 = pct.parse().map_err(|_| Error::InvalidHeight(spec.to_string()))?;
        if !(0.0..=100.0).contains(&pct) {
            return Err(Error::InvalidHeight(spec.to_string()));
        }
        Ok(((screen_rows as f64) * pct / 100.0).round() as usize)
    } else {
        spec.parse::<usize>().map_err(|_| Error::InvalidHeight(spec.to_string())).map(|rows| rows.min(screen_rows))
    }
}

/// Splits `$SKIM_DEFAULT_OPTS` / `$FZF_DEFAULT_OPTS` with POSIX shell
/// quoting rules, to be prepended to argv before parsing.
#[cfg(feature = "cli")]
pub fn default_opts_argv() -> Vec<String> {
    let raw = std::env::var("SKIM_DEFAULT_OPTS").or_else(|_| std::env::var("FZF_DEFAULT_OPTS")).unwrap_or_default();
    if raw.is_empty() {
        return Vec::new();
    }
    shlex::split(&raw).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_forms_override_their_minus_counterparts() {
        let opts = SkimOptions { no_color: true, no_256_color: true, no_mouse: true, ..Default::default() }.finalize();
        assert!(!opts.color);
        assert!(!opts.use_256_color);
        assert!(!opts.mouse);
    }

    #[test]
    fn field_indices_parses_signed_list() {
        let opts = SkimOptions { nth: vec!["2".into(), "-1".into()], ..Default::default() };
        assert_eq!(opts.field_indices().unwrap(), vec![2, -1]);
    }

    #[test]
    fn field_indices_rejects_garbage() {
        let opts = SkimOptions { nth: vec!["abc".into()], ..Default::default() };
        assert!(opts.field_indices().is_err());
    }

    #[test]
    fn height_parses_percentage_and_rows() {
        assert_eq!(parse_height("50%", 40).unwrap(), 20);
        assert_eq!(parse_height("10", 40).unwrap(), 10);
        assert!(parse_height("bogus", 40).is_err());
    }

    #[test]
    fn no_sort_collapses_sort_limit_to_zero() {
        let opts = SkimOptions { no_sort: true, ..Default::default() }.finalize();
        assert_eq!(opts.sort_limit, 0);
        assert!(!opts.sort_enabled());
    }
}
