//! Run-scoped ownership of one backend instance

use crate::backend::Backend;
use crate::error::BackendError;
use crate::status::ExecStatus;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One live backend, created once per run and destroyed once at shutdown
///
/// Operations clone the inner `Arc` under a read lock and run outside it, so
/// concurrent iterations can share a handle. After [`destroy`](Self::destroy)
/// every operation fails with `BackendError::Destroyed`.
pub struct BackendHandle {
    name: String,
    inner: RwLock<Option<Arc<dyn Backend>>>,
}

impl std::fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendHandle")
            .field("name", &self.name)
            .field("live", &self.is_live())
            .finish()
    }
}

impl BackendHandle {
    /// Take ownership of a constructed backend
    #[must_use]
    pub fn new(name: impl Into<String>, backend: Box<dyn Backend>) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(Some(Arc::from(backend))),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.inner.read().is_some()
    }

    fn backend(&self) -> Result<Arc<dyn Backend>, BackendError> {
        self.inner
            .read()
            .clone()
            .ok_or_else(|| BackendError::Destroyed(self.name.clone()))
    }

    /// See [`Backend::generate_kernel`]
    ///
    /// # Errors
    /// `Destroyed` after shutdown
    pub async fn generate_kernel(
        &self,
        kernel_files: &[PathBuf],
        output_dir: &Path,
    ) -> Result<bool, BackendError> {
        let backend = self.backend()?;
        Ok(backend.generate_kernel(kernel_files, output_dir).await)
    }

    /// See [`Backend::execute_kernel`]
    ///
    /// # Errors
    /// `Destroyed` after shutdown
    pub async fn execute_kernel(
        &self,
        artifact: &Path,
        output_dir: &Path,
    ) -> Result<ExecStatus, BackendError> {
        let backend = self.backend()?;
        Ok(backend.execute_kernel(artifact, output_dir).await)
    }

    /// See [`Backend::compare_results`]
    ///
    /// # Errors
    /// `Destroyed` after shutdown
    pub async fn compare_results(
        &self,
        reference_dir: &Path,
        candidate_dir: &Path,
    ) -> Result<bool, BackendError> {
        let backend = self.backend()?;
        Ok(backend.compare_results(reference_dir, candidate_dir).await)
    }

    /// See [`Backend::artifact_path`]
    ///
    /// # Errors
    /// `Destroyed` after shutdown
    pub fn artifact_path(&self, output_dir: &Path, kernel_file: &Path) -> Result<PathBuf, BackendError> {
        Ok(self.backend()?.artifact_path(output_dir, kernel_file))
    }

    /// Tear the backend down; later calls are no-ops
    pub async fn destroy(&self) {
        let taken = self.inner.write().take();
        if let Some(backend) = taken {
            backend.teardown().await;
            tracing::info!(backend = %self.name, "backend destroyed");
        }
    }
}
