//! Interactive fuzzy finder library.
//!
//! The crate is split along its four worker threads — [`reader`],
//! [`searcher`], [`ui`] (renderer and input loop) — plus the supporting
//! [`matcher`] family, the prefix-reuse [`cache`], and [`options`] for
//! configuration. [`skim::run_with`] ties them together.
//!
//! ```no_run
//! use skim::{SkimOptions, SkimOptionsBuilder};
//!
//! let options: SkimOptions = SkimOptionsBuilder::default().multi(true).build().unwrap();
//! let output = skim::run_with(&options, None).unwrap();
//! for line in &output.selected {
//!     println!("{line}");
//! }
//! ```

pub mod bus;
pub mod cache;
pub mod error;
pub mod item;
pub mod matcher;
pub mod options;
pub mod reader;
pub mod searcher;
mod skim;
pub mod spinner;
pub mod ui;
pub mod util;

pub use error::{Error, Result};
pub use matcher::CaseMatching;
pub use options::{SkimOptions, SkimOptionsBuilder, SkimOptionsBuilderError};
pub use skim::{run_with, write_output, SkimOutput};
