//! Tensor descriptors
//!
//! A [`TensorDescriptor`] carries everything a backend needs to declare one
//! named tensor: its index variables, dimension sizes and per-mode storage.

use crate::error::ModelError;
use crate::format::{FormatAssignment, FormatLabel};
use std::fmt::{self, Display, Formatter};

/// One named tensor of a kernel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TensorDescriptor {
    /// Single-character name, unique within a kernel
    pub name: char,
    /// Index variable per mode
    pub idxs: Vec<char>,
    /// Dimension size per mode
    pub shape: Vec<usize>,
    /// Storage label per mode
    pub storage_format: FormatAssignment,
    /// Free-form display string, usually `Name(i,j)`
    pub str_repr: String,
}

impl TensorDescriptor {
    /// Create descriptor with the conventional `Name(i,j,...)` display string
    #[must_use]
    pub fn new(
        name: char,
        idxs: Vec<char>,
        shape: Vec<usize>,
        storage_format: FormatAssignment,
    ) -> Self {
        let str_repr = term_repr(name, &idxs);
        Self {
            name,
            idxs,
            shape,
            storage_format,
            str_repr,
        }
    }

    /// Create descriptor with every mode dense
    #[must_use]
    pub fn dense(name: char, idxs: Vec<char>, shape: Vec<usize>) -> Self {
        let rank = idxs.len();
        Self::new(name, idxs, shape, FormatAssignment::all_dense(rank))
    }

    /// Number of modes
    #[inline]
    #[must_use]
    pub fn rank(&self) -> usize {
        self.idxs.len()
    }

    /// Label of mode `mode`, if in range
    #[inline]
    #[must_use]
    pub fn format_of(&self, mode: usize) -> Option<FormatLabel> {
        self.storage_format.labels().get(mode).copied()
    }

    /// Copy with a different storage assignment
    ///
    /// # Errors
    /// `ModelError::FormatRank` if the assignment length differs from the rank
    pub fn with_format(&self, storage_format: FormatAssignment) -> Result<Self, ModelError> {
        if storage_format.len() != self.rank() {
            return Err(ModelError::FormatRank {
                tensor: self.name,
                expected: self.rank(),
                actual: storage_format.len(),
            });
        }
        Ok(Self {
            storage_format,
            ..self.clone()
        })
    }

    /// Check `len(idxs) == len(shape) == len(storageFormat)` and positive dims
    ///
    /// # Errors
    /// `ModelError::RankMismatch` or `ModelError::ZeroDimension`
    pub fn check(&self) -> Result<(), ModelError> {
        let rank = self.idxs.len();
        if self.shape.len() != rank || self.storage_format.len() != rank {
            return Err(ModelError::RankMismatch {
                tensor: self.name,
                idxs: rank,
                shape: self.shape.len(),
                formats: self.storage_format.len(),
            });
        }
        if let Some(mode) = self.shape.iter().position(|&d| d == 0) {
            return Err(ModelError::ZeroDimension {
                tensor: self.name,
                mode,
            });
        }
        Ok(())
    }
}

impl Display for TensorDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let shape: Vec<String> = self.shape.iter().map(ToString::to_string).collect();
        write!(
            f,
            "Tensor: {}\nShape: [{}]\nFormats: {}",
            self.str_repr,
            shape.join(", "),
            self.storage_format
        )
    }
}

/// `A(i,j)` rendering of a tensor term
#[must_use]
pub fn term_repr(name: char, idxs: &[char]) -> String {
    let list: Vec<String> = idxs.iter().map(ToString::to_string).collect();
    format!("{name}({})", list.join(","))
}
