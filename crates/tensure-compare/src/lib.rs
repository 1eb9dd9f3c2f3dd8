//! Tensure Output Comparator
//!
//! Loads numeric tensor outputs written by backends and decides whether two
//! runs agree.
//!
//! # Formats
//!
//! | Extension | Records |
//! |---|---|
//! | `.tns`, `.ttx` | `c0 c1 ... value` per line |
//! | `.mtx` | `%` comments, `rows cols nnz` header, `row col value` |
//!
//! Explicit zeros are dropped on load and later duplicates overwrite earlier
//! ones, so a table only ever holds the effective nonzeros.
//!
//! # Example
//!
//! ```rust,ignore
//! use tensure_compare::{compare, DEFAULT_TOLERANCE};
//!
//! let verdict = compare(&ref_dir.join("y.tns"), &cand_dir.join("y.tns"), DEFAULT_TOLERANCE)?;
//! if !verdict.is_equal() {
//!     tracing::warn!(%verdict, "backends disagree");
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod compare;
mod error;
mod parsers;

pub use compare::{
    compare, compare_dirs, compare_tables, DirReport, FileVerdict, Verdict, DEFAULT_TOLERANCE,
};
pub use error::CompareError;
pub use parsers::{
    default_parsers, load_output, CoordinateListParser, MatrixMarketParser, OutputParser,
    ParserRegistry,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
