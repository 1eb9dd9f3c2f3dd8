//! Comparator errors

use std::path::PathBuf;

/// Errors raised while loading or comparing outputs
#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    /// Extension has no registered parser
    #[error("unsupported output format: {}", path.display())]
    UnsupportedFormat {
        /// Offending file
        path: PathBuf,
    },

    /// File or directory does not exist
    #[error("not found: {}", path.display())]
    NotFound {
        /// Missing path
        path: PathBuf,
    },

    /// Any other IO failure
    #[error("io error on {}: {source}", path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Token that is not a valid coordinate or value
    #[error("invalid number {token:?} at line {line}")]
    InvalidNumber {
        /// 1-based line number
        line: usize,
        /// Offending token
        token: String,
    },

    /// Matrix Market header with fewer than three fields
    #[error("malformed matrix market header at line {line}")]
    MalformedHeader {
        /// 1-based line number
        line: usize,
    },

    /// Outputs loaded fine but disagree
    #[error("outputs differ: {detail}")]
    Mismatch {
        /// Human readable description of the first disagreement
        detail: String,
    },

    /// Error while parsing a specific file
    #[error("{}: {source}", path.display())]
    InFile {
        /// File being parsed
        path: PathBuf,
        /// Parse failure
        #[source]
        source: Box<CompareError>,
    },
}

impl CompareError {
    /// Map an IO error, keeping `NotFound` distinct
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Attach the file being parsed
    #[must_use]
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            e @ (Self::InvalidNumber { .. } | Self::MalformedHeader { .. }) => Self::InFile {
                path: path.into(),
                source: Box::new(e),
            },
            other => other,
        }
    }

    /// True when the outputs were readable but disagreed
    #[inline]
    #[must_use]
    pub fn is_mismatch(&self) -> bool {
        matches!(self, Self::Mismatch { .. })
    }
}
