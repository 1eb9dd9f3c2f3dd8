//! Tensure Kernel Model
//!
//! Data entities shared by every stage of the fuzzing pipeline, plus their
//! persisted representation.
//!
//! # Core Concepts
//!
//! - [`Kernel`]: ordered tensors (output first), data sources, computations
//! - [`TensorDescriptor`]: name, index variables, shape and per-mode storage
//! - [`FormatAssignment`]: ordered `Dense`/`Sparse` labels for one tensor
//! - [`TensorData`]: sparse coordinate → value table
//! - [`ContentHash`]: Blake3 hash naming persisted kernel variants
//!
//! # Example
//!
//! ```rust,ignore
//! use tensure_model::{Kernel, TensorDescriptor, Computation, DataSource};
//!
//! let kernel = Kernel::from_parts(tensors, vec![Computation::new(eq)], sources)?;
//! kernel.save(&dir.join("kernel.json"))?; // atomic replace
//! assert_eq!(Kernel::load(&dir.join("kernel.json"))?, kernel);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod data;
mod error;
mod format;
mod hash;
mod kernel;
mod persist;
mod tensor;

pub use data::{Coordinate, TensorData};
pub use error::ModelError;
pub use format::{FormatAssignment, FormatLabel};
pub use hash::ContentHash;
pub use kernel::{Computation, DataSource, Kernel};
pub use persist::{read_file, write_atomic, write_atomic_with};
pub use tensor::{term_repr, TensorDescriptor};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
