//! The backend capability interface

use crate::status::ExecStatus;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tensure_compare::{compare_dirs, DEFAULT_TOLERANCE};

/// One interchangeable execution engine
///
/// Implementations never raise past these operations: translation failures
/// return `false`, execution failures are an [`ExecStatus`]. Backends do not
/// enforce a wall-clock limit; callers wrap `execute_kernel` in a deadline
/// and drop the future on expiry, so implementations must release their
/// execution unit when dropped mid-run.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Instance name, used in directory names and logs
    fn name(&self) -> &str;

    /// Translate persisted kernels into runnable artifacts under `output_dir`
    ///
    /// The artifact for `kernel_files[i]` must land at
    /// [`artifact_path`](Self::artifact_path)`(output_dir, kernel_files[i])`.
    async fn generate_kernel(&self, kernel_files: &[PathBuf], output_dir: &Path) -> bool;

    /// Run one artifact, writing numeric outputs under `output_dir`
    async fn execute_kernel(&self, artifact: &Path, output_dir: &Path) -> ExecStatus;

    /// Compare two output directories; read-only on both
    async fn compare_results(&self, reference_dir: &Path, candidate_dir: &Path) -> bool {
        match compare_dirs(reference_dir, candidate_dir, self.tolerance()) {
            Ok(report) => {
                if !report.is_equal() {
                    tracing::info!(backend = self.name(), %report, "outputs differ");
                }
                report.is_equal()
            }
            Err(e) => {
                tracing::warn!(backend = self.name(), error = %e, "comparison failed");
                false
            }
        }
    }

    /// Absolute tolerance used by `compare_results`
    fn tolerance(&self) -> f64 {
        DEFAULT_TOLERANCE
    }

    /// Where `generate_kernel` places the artifact for `kernel_file`
    fn artifact_path(&self, output_dir: &Path, kernel_file: &Path) -> PathBuf {
        let stem = kernel_file
            .file_stem()
            .map_or_else(|| "kernel".into(), |s| s.to_os_string());
        output_dir.join(stem)
    }

    /// Release resources; called exactly once, when the handle is destroyed
    async fn teardown(&self) {}
}
