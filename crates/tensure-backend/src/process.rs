//! Subprocess execution for command-driven backends
//!
//! Children are spawned with `kill_on_drop`. On unix each child also leads a
//! fresh process group, and the whole group is sent `SIGKILL` once the run is
//! over or its future is dropped (for example when a deadline expires), so
//! work started by a wrapper script cannot outlive the run.

use crate::status::ExecStatus;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Placeholder values substituted into argv templates
#[derive(Debug, Clone, Copy, Default)]
pub struct Placeholders<'a> {
    pub kernel: Option<&'a Path>,
    pub artifact: Option<&'a Path>,
    pub out: Option<&'a Path>,
}

impl Placeholders<'_> {
    /// Substitute `{kernel}`, `{artifact}` and `{out}` in one argument
    #[must_use]
    pub fn expand(&self, arg: &str) -> String {
        let mut expanded = arg.to_string();
        for (key, value) in [
            ("{kernel}", self.kernel),
            ("{artifact}", self.artifact),
            ("{out}", self.out),
        ] {
            if let Some(path) = value {
                expanded = expanded.replace(key, &path.to_string_lossy());
            }
        }
        expanded
    }
}

/// Run `argv` to completion, saving stdout/stderr as `<log_stem>.stdout.log`
/// and `<log_stem>.stderr.log` under `log_dir`
///
/// Never fails: spawn and log-write problems become `SpawnFailed`.
pub async fn run_command(
    argv: &[String],
    env: &BTreeMap<String, String>,
    placeholders: Placeholders<'_>,
    log_dir: &Path,
    log_stem: &str,
) -> ExecStatus {
    let Some((program, args)) = argv.split_first() else {
        return ExecStatus::SpawnFailed("empty command".into());
    };
    let program = placeholders.expand(program);
    let args: Vec<String> = args.iter().map(|a| placeholders.expand(a)).collect();

    let mut cmd = Command::new(&program);
    cmd.args(&args)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    tracing::debug!(program = %program, ?args, "spawning");
    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return ExecStatus::SpawnFailed(format!("{program}: {e}")),
    };
    #[cfg(unix)]
    let _group = ProcessGroup::of(&child);
    let output = match child.wait_with_output().await {
        Ok(output) => output,
        Err(e) => return ExecStatus::SpawnFailed(format!("{program}: {e}")),
    };

    for (suffix, bytes) in [("stdout", &output.stdout), ("stderr", &output.stderr)] {
        let path = log_dir.join(format!("{log_stem}.{suffix}.log"));
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            tracing::warn!(path = %path.display(), error = %e, "could not save process log");
        }
    }

    ExecStatus::from_code(output.status.code().unwrap_or(-1))
}

/// Kills every process in a child's group when dropped
#[cfg(unix)]
struct ProcessGroup(Option<nix::unistd::Pid>);

#[cfg(unix)]
impl ProcessGroup {
    fn of(child: &tokio::process::Child) -> Self {
        Self(
            child
                .id()
                .and_then(|id| i32::try_from(id).ok())
                .map(nix::unistd::Pid::from_raw),
        )
    }
}

#[cfg(unix)]
impl Drop for ProcessGroup {
    fn drop(&mut self) {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};

        let Some(pgid) = self.0 else { return };
        match killpg(pgid, Signal::SIGKILL) {
            // group already empty
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => tracing::warn!(pgid = pgid.as_raw(), error = %e, "could not kill process group"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn placeholders_expand_inside_arguments() {
        let kernel = PathBuf::from("/k/abc.json");
        let out = PathBuf::from("/o");
        let p = Placeholders {
            kernel: Some(&kernel),
            artifact: None,
            out: Some(&out),
        };
        assert_eq!(p.expand("--in={kernel}"), "--in=/k/abc.json");
        assert_eq!(p.expand("{out}/y.tns"), "/o/y.tns");
        assert_eq!(p.expand("{artifact}"), "{artifact}");
    }

    #[tokio::test]
    async fn exit_codes_and_logs_are_captured() {
        let dir = tempfile::tempdir().unwrap();
        let argv: Vec<String> = ["sh", "-c", "echo hello; exit 3"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let status = run_command(&argv, &BTreeMap::new(), Placeholders::default(), dir.path(), "run").await;
        assert_eq!(status, ExecStatus::NonZeroExit(3));
        let log = std::fs::read_to_string(dir.path().join("run.stdout.log")).unwrap();
        assert_eq!(log, "hello\n");
    }

    #[tokio::test]
    async fn missing_program_is_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let argv = vec!["/nonexistent/tensure-backend-binary".to_string()];
        let status = run_command(&argv, &BTreeMap::new(), Placeholders::default(), dir.path(), "run").await;
        assert!(matches!(status, ExecStatus::SpawnFailed(_)));
        assert!(matches!(
            run_command(&[], &BTreeMap::new(), Placeholders::default(), dir.path(), "run").await,
            ExecStatus::SpawnFailed(_)
        ));
    }
}
