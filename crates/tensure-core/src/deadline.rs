//! Wall-clock limits on backend execution
//!
//! The deadline is owned here, not by backends. On expiry the execution
//! future is dropped, which is how a backend's execution unit gets killed
//! (see `tensure_backend::run_command`).

use std::path::Path;
use std::time::Duration;
use tensure_backend::{BackendError, BackendHandle, ExecStatus};

/// Run `execute_kernel` with a deadline, mapping expiry to `TimedOut`
///
/// # Errors
/// `BackendError::Destroyed` if the handle is gone
pub async fn execute_with_deadline(
    handle: &BackendHandle,
    artifact: &Path,
    output_dir: &Path,
    timeout: Duration,
) -> Result<ExecStatus, BackendError> {
    match tokio::time::timeout(timeout, handle.execute_kernel(artifact, output_dir)).await {
        Ok(status) => status,
        Err(_) => {
            tracing::warn!(
                backend = handle.name(),
                artifact = %artifact.display(),
                timeout_secs = timeout.as_secs_f64(),
                "execution timed out, terminated"
            );
            Ok(ExecStatus::TimedOut)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use tensure_backend::Backend;

    struct Sleeper(Duration);

    #[async_trait]
    impl Backend for Sleeper {
        fn name(&self) -> &str {
            "sleeper"
        }

        async fn generate_kernel(&self, _: &[PathBuf], _: &Path) -> bool {
            true
        }

        async fn execute_kernel(&self, _: &Path, _: &Path) -> ExecStatus {
            tokio::time::sleep(self.0).await;
            ExecStatus::Ok
        }
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_maps_to_timed_out() {
        let handle = BackendHandle::new("s", Box::new(Sleeper(Duration::from_secs(3600))));
        let status = execute_with_deadline(&handle, Path::new("a"), Path::new("o"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(status, ExecStatus::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn fast_runs_keep_their_status() {
        let handle = BackendHandle::new("s", Box::new(Sleeper(Duration::from_millis(10))));
        let status = execute_with_deadline(&handle, Path::new("a"), Path::new("o"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(status, ExecStatus::Ok);
    }
}
