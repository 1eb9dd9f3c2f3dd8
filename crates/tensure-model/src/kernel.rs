//! Kernels and their JSON representation
//!
//! A [`Kernel`] is an ordered list of tensors (element 0 is the output), a
//! data-file mapping and one or more einsum computations. Kernels are
//! immutable once persisted: a storage variant is a new file, never an
//! in-place edit.
//!
//! # Persisted layout
//!
//! ```json
//! {
//!     "tensors": [
//!         {
//!             "name": "A",
//!             "shape": [3, 4],
//!             "str_repr": "A(i,j)",
//!             "idxs": ["i", "j"],
//!             "storageFormat": ["Dense", "Sparse"],
//!             "dataFile": "-"
//!         }
//!     ],
//!     "computations": [{ "expression": "A(i,j) = B(i,k) * C(k,j)" }]
//! }
//! ```

use crate::error::ModelError;
use crate::format::FormatAssignment;
use crate::hash::ContentHash;
use crate::persist::{read_file, write_atomic};
use crate::tensor::TensorDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

/// Where a tensor's initial values come from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataSource {
    /// Coordinate file on disk
    File(PathBuf),
    /// No external data: fresh, uninitialized tensor
    Fresh,
}

impl DataSource {
    /// Persisted spelling of [`DataSource::Fresh`]
    pub const FRESH_SENTINEL: &'static str = "-";

    /// File path, if any
    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(p) => Some(p),
            Self::Fresh => None,
        }
    }

    fn from_wire(s: &str) -> Self {
        if s.is_empty() || s == Self::FRESH_SENTINEL {
            Self::Fresh
        } else {
            Self::File(PathBuf::from(s))
        }
    }

    fn to_wire(&self) -> String {
        match self {
            Self::File(p) => p.to_string_lossy().into_owned(),
            Self::Fresh => Self::FRESH_SENTINEL.to_string(),
        }
    }
}

/// One assignment expression, `Out(i,j) = In1(i,k) * In2(k,j)`
///
/// Stored verbatim; validated by the einsum crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Computation {
    pub expression: String,
}

impl Computation {
    /// Wrap an expression string
    #[inline]
    #[must_use]
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }
}

impl Display for Computation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

/// A tensor computation with its operands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kernel {
    /// Tensors in declaration order; index 0 is the output
    pub tensors: Vec<TensorDescriptor>,
    /// Data source per tensor name
    pub data_files: BTreeMap<char, DataSource>,
    /// Computations in program order
    pub computations: Vec<Computation>,
}

impl Kernel {
    /// Build a kernel, pairing tensors with data sources by position
    ///
    /// # Errors
    /// - `ModelError::CountMismatch` if `data_files.len() != tensors.len()`
    /// - any structural violation from [`Kernel::check_structure`]
    pub fn from_parts(
        tensors: Vec<TensorDescriptor>,
        computations: Vec<Computation>,
        data_files: Vec<DataSource>,
    ) -> Result<Self, ModelError> {
        if tensors.len() != data_files.len() {
            return Err(ModelError::CountMismatch {
                expected: tensors.len(),
                actual: data_files.len(),
            });
        }
        let data_files = tensors
            .iter()
            .map(|t| t.name)
            .zip(data_files)
            .collect();
        let kernel = Self {
            tensors,
            data_files,
            computations,
        };
        kernel.check_structure()?;
        Ok(kernel)
    }

    /// Output tensor (element 0)
    #[inline]
    #[must_use]
    pub fn output(&self) -> Option<&TensorDescriptor> {
        self.tensors.first()
    }

    /// Input tensors (everything after element 0)
    #[inline]
    #[must_use]
    pub fn inputs(&self) -> &[TensorDescriptor] {
        self.tensors.get(1..).unwrap_or(&[])
    }

    /// Look up a tensor by name
    #[must_use]
    pub fn tensor(&self, name: char) -> Option<&TensorDescriptor> {
        self.tensors.iter().find(|t| t.name == name)
    }

    /// Sum of all tensor ranks
    #[must_use]
    pub fn total_rank(&self) -> usize {
        self.tensors.iter().map(TensorDescriptor::rank).sum()
    }

    /// Storage assignment of every tensor, in tensor order
    #[must_use]
    pub fn formats(&self) -> Vec<FormatAssignment> {
        self.tensors
            .iter()
            .map(|t| t.storage_format.clone())
            .collect()
    }

    /// Sibling kernel that differs only in storage formats
    ///
    /// # Errors
    /// - `ModelError::CountMismatch` if `formats` has the wrong length
    /// - `ModelError::FormatRank` if an assignment does not fit its tensor
    pub fn with_formats(&self, formats: &[FormatAssignment]) -> Result<Self, ModelError> {
        if formats.len() != self.tensors.len() {
            return Err(ModelError::CountMismatch {
                expected: self.tensors.len(),
                actual: formats.len(),
            });
        }
        let tensors = self
            .tensors
            .iter()
            .zip(formats)
            .map(|(t, f)| t.with_format(f.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            tensors,
            data_files: self.data_files.clone(),
            computations: self.computations.clone(),
        })
    }

    /// Check descriptor lengths, name uniqueness and data-file keys
    ///
    /// # Errors
    /// The first violated invariant
    pub fn check_structure(&self) -> Result<(), ModelError> {
        let mut names = BTreeSet::new();
        for tensor in &self.tensors {
            tensor.check()?;
            if !names.insert(tensor.name) {
                return Err(ModelError::DuplicateTensor(tensor.name));
            }
        }

        let keys: BTreeSet<char> = self.data_files.keys().copied().collect();
        if keys != names {
            return Err(ModelError::DataFileKeys {
                expected: names.into_iter().collect(),
                found: keys.into_iter().collect(),
            });
        }
        Ok(())
    }

    /// Encode as pretty-printed JSON (4-space indent)
    ///
    /// # Errors
    /// `ModelError::Encode` if serialization fails
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, ModelError> {
        let document = KernelDocument::from(self);
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        document
            .serialize(&mut serializer)
            .map_err(ModelError::Encode)?;
        Ok(out)
    }

    /// Decode from JSON bytes
    ///
    /// # Errors
    /// - `ModelError::Parse` for malformed JSON
    /// - `ModelError::UnknownFormatLabel`, `InvalidTensorName`, `InvalidIndex`
    /// - any structural violation from [`Kernel::check_structure`]
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        let document: KernelDocument = serde_json::from_slice(bytes).map_err(ModelError::Parse)?;
        document.try_into()
    }

    /// Content hash of the persisted representation
    ///
    /// # Errors
    /// `ModelError::Encode` if serialization fails
    pub fn content_hash(&self) -> Result<ContentHash, ModelError> {
        Ok(ContentHash::compute(&self.to_json_bytes()?))
    }

    /// Persist with atomic replace
    ///
    /// # Errors
    /// Encoding or IO failures; the destination is never left partial
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let bytes = self.to_json_bytes()?;
        write_atomic(path, &bytes)?;
        tracing::debug!(path = %path.display(), tensors = self.tensors.len(), "kernel saved");
        Ok(())
    }

    /// Load a persisted kernel
    ///
    /// # Errors
    /// `ModelError::NotFound` / `ModelError::Io` if the file cannot be read,
    /// otherwise see [`Kernel::from_json_slice`]
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let bytes = read_file(path)?;
        Self::from_json_slice(&bytes)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct KernelDocument {
    tensors: Vec<TensorEntry>,
    computations: Vec<ComputationEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TensorEntry {
    name: String,
    shape: Vec<usize>,
    str_repr: String,
    idxs: Vec<String>,
    #[serde(rename = "storageFormat")]
    storage_format: Vec<String>,
    #[serde(rename = "dataFile", default)]
    data_file: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ComputationEntry {
    expression: String,
}

impl From<&Kernel> for KernelDocument {
    fn from(kernel: &Kernel) -> Self {
        let tensors = kernel
            .tensors
            .iter()
            .map(|t| TensorEntry {
                name: t.name.to_string(),
                shape: t.shape.clone(),
                str_repr: t.str_repr.clone(),
                idxs: t.idxs.iter().map(ToString::to_string).collect(),
                storage_format: t.storage_format.to_strings(),
                data_file: kernel
                    .data_files
                    .get(&t.name)
                    .map(DataSource::to_wire)
                    .unwrap_or_default(),
            })
            .collect();
        let computations = kernel
            .computations
            .iter()
            .map(|c| ComputationEntry {
                expression: c.expression.clone(),
            })
            .collect();
        Self {
            tensors,
            computations,
        }
    }
}

impl TryFrom<KernelDocument> for Kernel {
    type Error = ModelError;

    fn try_from(document: KernelDocument) -> Result<Self, Self::Error> {
        let mut tensors = Vec::with_capacity(document.tensors.len());
        let mut data_files = BTreeMap::new();

        for entry in document.tensors {
            let name = single_char(&entry.name)
                .ok_or_else(|| ModelError::InvalidTensorName(entry.name.clone()))?;
            let idxs = entry
                .idxs
                .iter()
                .map(|token| {
                    single_char(token).ok_or_else(|| ModelError::InvalidIndex {
                        tensor: name,
                        token: token.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let storage_format = FormatAssignment::parse(&entry.storage_format)?;

            data_files.insert(name, DataSource::from_wire(&entry.data_file));
            tensors.push(TensorDescriptor {
                name,
                idxs,
                shape: entry.shape,
                storage_format,
                str_repr: entry.str_repr,
            });
        }

        let computations = document
            .computations
            .into_iter()
            .map(|c| Computation::new(c.expression))
            .collect();

        let kernel = Self {
            tensors,
            data_files,
            computations,
        };
        kernel.check_structure()?;
        Ok(kernel)
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}
