//! Error types for the kernel model
//!
//! Covers:
//! - Malformed persisted kernels (`Parse`)
//! - Structural invariant violations on descriptors and kernels
//! - File access failures during load and atomic save

use std::path::PathBuf;

/// Errors raised while building, loading or saving kernels
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Persisted kernel is not valid JSON or misses required fields
    #[error("malformed kernel document: {0}")]
    Parse(#[source] serde_json::Error),

    /// Storage format label other than `Dense` / `Sparse`
    #[error("unknown format label: '{0}'")]
    UnknownFormatLabel(String),

    /// Tensor names must be exactly one character
    #[error("invalid tensor name: '{0}'")]
    InvalidTensorName(String),

    /// Index variables must be exactly one character
    #[error("invalid index '{token}' on tensor {tensor}")]
    InvalidIndex { tensor: char, token: String },

    /// `idxs`, `shape` and `storageFormat` lengths disagree
    #[error("rank mismatch on tensor {tensor}: {idxs} idxs, {shape} dims, {formats} formats")]
    RankMismatch {
        tensor: char,
        idxs: usize,
        shape: usize,
        formats: usize,
    },

    /// Dimension sizes must be positive
    #[error("tensor {tensor} has a zero-sized mode {mode}")]
    ZeroDimension { tensor: char, mode: usize },

    /// Same tensor name declared twice in one kernel
    #[error("duplicate tensor name: {0}")]
    DuplicateTensor(char),

    /// Data-file mapping keys differ from the declared tensor names
    #[error("data files {found:?} do not match tensors {expected:?}")]
    DataFileKeys { expected: Vec<char>, found: Vec<char> },

    /// Number of supplied parts differs from the number of tensors
    #[error("expected {expected} entries, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    /// A format vector was supplied for a tensor of a different rank
    #[error("format assignment of length {actual} does not fit tensor {tensor} of rank {expected}")]
    FormatRank {
        tensor: char,
        expected: usize,
        actual: usize,
    },

    /// Rank-0 values have no `.tns` spelling; a bare value line is skipped on load
    #[error("cannot write scalar data to {}", path.display())]
    ScalarData { path: PathBuf },

    /// File does not exist
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// IO failure on a specific path
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization of an in-memory kernel failed
    #[error("failed to encode kernel: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ModelError {
    /// Map an IO error on `path`, separating "not found" from other failures
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// True when the error came from reading or writing the filesystem
    #[inline]
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Io { .. })
    }
}
