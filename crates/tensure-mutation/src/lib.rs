//! Format mutation engine
//!
//! Storage formats never change the value a kernel computes, so every
//! sibling produced here must agree with its seed on every backend. Any
//! divergence is attributable to the backend.
//!
//! - [`enumerate_formats`]: all `2^rank` assignments, lazily, in canonical
//!   DFS order (`Dense` before `Sparse`, first mode varies slowest)
//! - [`equal_formats`]: positional label equality
//! - [`FormatMutator`]: expands a seed kernel into persisted siblings

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod enumerate;
mod mutator;

pub use enumerate::{enumerate_formats, equal_formats, FormatEnumerator};
pub use mutator::{FormatMutator, MutationError, MutationScope, PersistedVariant};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
