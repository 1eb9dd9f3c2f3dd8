//! Whole-kernel consistency checks
//!
//! A kernel is consistent when its structure is sound and every computation
//! validates and refers only to declared tensors with their declared index
//! lists. Matching index lists term by term also guarantees that every index
//! character of a computation is declared by some tensor.

use crate::equation::{Equation, EquationError, TensorTerm};
use tensure_model::{Kernel, ModelError};

/// Kernel-level consistency failures
#[derive(Debug, thiserror::Error)]
pub enum KernelCheckError {
    /// Descriptor or data-file invariant violated
    #[error(transparent)]
    Structure(#[from] ModelError),

    /// A computation failed equation validation
    #[error("computation {computation}: {source}")]
    Equation {
        computation: usize,
        #[source]
        source: EquationError,
    },

    /// A computation names a tensor that is not declared
    #[error("computation {computation} uses undeclared tensor '{name}'")]
    UndeclaredTensor { computation: usize, name: String },

    /// A term's index list differs from the declared `idxs`
    #[error("tensor {tensor} used as {used:?} but declared as {declared:?}")]
    IndexMismatch {
        tensor: char,
        declared: Vec<char>,
        used: Vec<char>,
    },

    /// Kernel has no computations or no tensors
    #[error("kernel is empty")]
    Empty,
}

/// Check a kernel before it is persisted or mutated
///
/// # Errors
/// The first [`KernelCheckError`] found
pub fn check_kernel(kernel: &Kernel) -> Result<(), KernelCheckError> {
    if kernel.tensors.is_empty() || kernel.computations.is_empty() {
        return Err(KernelCheckError::Empty);
    }
    kernel.check_structure()?;

    for (i, computation) in kernel.computations.iter().enumerate() {
        let equation =
            Equation::parse(&computation.expression).map_err(|source| KernelCheckError::Equation {
                computation: i,
                source,
            })?;

        for term in std::iter::once(&equation.output).chain(&equation.operands) {
            check_term(kernel, i, term)?;
        }
    }
    Ok(())
}

fn check_term(kernel: &Kernel, computation: usize, term: &TensorTerm) -> Result<(), KernelCheckError> {
    let undeclared = || KernelCheckError::UndeclaredTensor {
        computation,
        name: term.name.clone(),
    };

    let mut chars = term.name.chars();
    let name = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => return Err(undeclared()),
    };
    let tensor = kernel.tensor(name).ok_or_else(undeclared)?;

    if tensor.idxs != term.idxs {
        return Err(KernelCheckError::IndexMismatch {
            tensor: name,
            declared: tensor.idxs.clone(),
            used: term.idxs.clone(),
        });
    }
    Ok(())
}
