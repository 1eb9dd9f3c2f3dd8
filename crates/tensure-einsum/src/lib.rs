//! Einsum equation validation
//!
//! Gates generated computations before anything is written to disk:
//! - [`validate`] / [`Equation::parse`] check one `Out(..) = In1(..) * In2(..)`
//!   assignment
//! - [`check_kernel`] checks every computation of a kernel against its
//!   declared tensors
//!
//! # Example
//!
//! ```rust,ignore
//! use tensure_einsum::{validate, EquationError};
//!
//! assert!(validate("A(i,j)=B(i,k)*C(k,j)").is_ok());
//! assert!(matches!(
//!     validate("A(i,j)=B(i,k)"),
//!     Err(EquationError::UnboundOutputIndex { index: 'j' })
//! ));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod check;
mod equation;

pub use check::{check_kernel, KernelCheckError};
pub use equation::{validate, Equation, EquationError, Side, TensorTerm};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
