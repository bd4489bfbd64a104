//! Error types for the library surface.
//!
//! Recoverable errors (bad delimiter regex, malformed `--nth` spec, height
//! parse failures) are typed here so callers can match on them; everything
//! else is surfaced through `color_eyre` at the binary's top level.

use thiserror::Error;

/// Errors that can be returned from the library API.
#[derive(Debug, Error)]
pub enum Error {
    /// The user-supplied field delimiter failed to compile as a regex.
    #[error("invalid delimiter regex {pattern:?}: {source}")]
    InvalidDelimiter {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A `-n`/`--nth` field spec could not be parsed.
    #[error("invalid field index {0:?}")]
    InvalidFieldSpec(String),

    /// `--height` could not be parsed as a row count or percentage.
    #[error("invalid height spec {0:?}")]
    InvalidHeight(String),

    /// The input source is a TTY and no default command is available.
    #[error("no input source: stdin is a tty and no default command could be run")]
    NoInputSource,

    /// A worker thread (reader, searcher or renderer) panicked.
    #[error("worker thread panicked: {0}")]
    WorkerPanic(String),

    /// Wraps a lower-level I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
