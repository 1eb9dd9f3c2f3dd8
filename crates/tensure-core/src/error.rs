//! Error types for the orchestrator
//!
//! Most failures inside an iteration are recorded as that iteration's
//! outcome and never reach the caller. `FuzzError` is what remains: setup
//! problems and the few harness faults worth surfacing.

use std::path::PathBuf;
use tensure_backend::BackendError;
use tensure_compare::CompareError;
use tensure_model::ModelError;

/// Main orchestrator error type
#[derive(Debug, thiserror::Error)]
pub enum FuzzError {
    /// Invalid or unparsable configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Kernel model failure (encode, save, load)
    #[error("kernel model error: {0}")]
    Model(#[from] ModelError),

    /// Backend could not be created or addressed
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Output comparison could not be performed
    #[error("comparison error: {0}")]
    Compare(#[from] CompareError),

    /// Format mutation failure
    #[error("mutation error: {0}")]
    Mutation(#[from] tensure_mutation::MutationError),

    /// Worker pool failure
    #[error("worker pool error: {0}")]
    Pool(#[from] PoolError),

    /// Generator could not produce a kernel
    #[error("generator failed: {0}")]
    Generator(String),

    /// Filesystem failure on the campaign layout
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FuzzError {
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the error only ends the iteration it happened in
    #[inline]
    #[must_use]
    pub fn is_iteration_local(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::Pool(_))
    }
}

/// Worker pool errors
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Submission after shutdown began
    #[error("worker pool is shut down")]
    ShutDown,

    /// Pool size must be at least one
    #[error("worker pool needs at least one worker")]
    NoWorkers,

    /// OS refused to start a worker thread
    #[error("failed to spawn worker: {0}")]
    Spawn(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_and_pool_errors_end_the_run() {
        assert!(!FuzzError::Config("bad".into()).is_iteration_local());
        assert!(!FuzzError::from(PoolError::ShutDown).is_iteration_local());
        assert!(FuzzError::Generator("x".into()).is_iteration_local());
    }

    #[test]
    fn pool_error_message() {
        assert_eq!(PoolError::ShutDown.to_string(), "worker pool is shut down");
    }
}
