//! Command-driven backend
//!
//! Wraps an external compiler/runtime through two argv templates:
//!
//! - `generate`: run once per kernel file with `{kernel}` and `{artifact}`
//!   bound. When empty, the kernel file is copied into the artifact directory
//!   as `kernel.json`.
//! - `execute`: run once per artifact with `{artifact}`, `{kernel}` (the
//!   copied or original kernel file) and `{out}` bound.

use crate::backend::Backend;
use crate::error::BackendError;
use crate::process::{run_command, Placeholders};
use crate::spec::BackendSpec;
use crate::status::ExecStatus;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tensure_compare::DEFAULT_TOLERANCE;

/// File name of the kernel copy inside an artifact directory
pub const ARTIFACT_KERNEL: &str = "kernel.json";

/// Backend that shells out to configured commands
#[derive(Debug, Clone)]
pub struct CommandBackend {
    name: String,
    generate: Vec<String>,
    execute: Vec<String>,
    env: BTreeMap<String, String>,
    tolerance: f64,
}

impl CommandBackend {
    /// Build from a spec
    ///
    /// # Errors
    /// `InvalidSpec` if the execute template is empty or the tolerance is
    /// negative or not finite
    pub fn from_spec(spec: &BackendSpec) -> Result<Self, BackendError> {
        let invalid = |reason: &str| BackendError::InvalidSpec {
            backend: spec.name.clone(),
            reason: reason.to_string(),
        };
        if spec.execute.is_empty() {
            return Err(invalid("execute command is empty"));
        }
        let tolerance = spec.tolerance.unwrap_or(DEFAULT_TOLERANCE);
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(invalid("tolerance must be a non-negative number"));
        }
        Ok(Self {
            name: spec.name.clone(),
            generate: spec.generate.clone(),
            execute: spec.execute.clone(),
            env: spec.env.clone(),
            tolerance,
        })
    }

    async fn generate_one(&self, kernel_file: &Path, artifact: &Path) -> Result<(), String> {
        tokio::fs::create_dir_all(artifact)
            .await
            .map_err(|e| format!("{}: {e}", artifact.display()))?;
        tokio::fs::copy(kernel_file, artifact.join(ARTIFACT_KERNEL))
            .await
            .map_err(|e| format!("{}: {e}", kernel_file.display()))?;
        if self.generate.is_empty() {
            return Ok(());
        }
        let placeholders = Placeholders {
            kernel: Some(kernel_file),
            artifact: Some(artifact),
            out: None,
        };
        match run_command(&self.generate, &self.env, placeholders, artifact, "generate").await {
            ExecStatus::Ok => Ok(()),
            status => Err(status.to_string()),
        }
    }
}

#[async_trait]
impl Backend for CommandBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_kernel(&self, kernel_files: &[PathBuf], output_dir: &Path) -> bool {
        for kernel_file in kernel_files {
            let artifact = self.artifact_path(output_dir, kernel_file);
            if let Err(reason) = self.generate_one(kernel_file, &artifact).await {
                tracing::warn!(
                    backend = %self.name,
                    kernel = %kernel_file.display(),
                    %reason,
                    "kernel generation failed"
                );
                return false;
            }
        }
        true
    }

    async fn execute_kernel(&self, artifact: &Path, output_dir: &Path) -> ExecStatus {
        if let Err(e) = tokio::fs::create_dir_all(output_dir).await {
            return ExecStatus::SpawnFailed(format!("{}: {e}", output_dir.display()));
        }
        let kernel = artifact.join(ARTIFACT_KERNEL);
        let placeholders = Placeholders {
            kernel: Some(&kernel),
            artifact: Some(artifact),
            out: Some(output_dir),
        };
        run_command(&self.execute, &self.env, placeholders, output_dir, "execute").await
    }

    fn tolerance(&self) -> f64 {
        self.tolerance
    }
}
