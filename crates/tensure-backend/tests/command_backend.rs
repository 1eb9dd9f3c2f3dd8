//! End-to-end behaviour of the built-in `command` backend using `sh`.

use std::path::PathBuf;
use std::time::{Duration, Instant};
use tensure_backend::{BackendRegistry, BackendSpec, ExecStatus, ARTIFACT_KERNEL};

fn sh(script: &str) -> Vec<String> {
    vec!["sh".into(), "-c".into(), script.into()]
}

fn kernel_file(dir: &std::path::Path, stem: &str) -> PathBuf {
    let path = dir.join(format!("{stem}.json"));
    std::fs::write(&path, "{\"tensors\": [], \"computations\": []}").unwrap();
    path
}

#[tokio::test]
async fn generate_execute_compare() {
    let work = tempfile::tempdir().unwrap();
    let kernels = [kernel_file(work.path(), "v0"), kernel_file(work.path(), "v1")];

    // Extra arguments after the script become `$0`, `$1`, ...
    let mut generate = sh("echo built > \"$0\"/built.txt");
    generate.push("{artifact}".into());
    let mut execute = sh("test -f \"$0\"/built.txt && printf '0 0 1.5\\n1 1 2.0\\n' > \"$1\"/y.tns");
    execute.extend(["{artifact}".to_string(), "{out}".to_string()]);
    let spec = BackendSpec::command("ref", generate, execute);

    let handle = BackendRegistry::with_defaults().create(&spec).unwrap();
    let gen_dir = work.path().join("ref");
    assert!(handle.generate_kernel(&kernels, &gen_dir).await.unwrap());

    let mut outputs = Vec::new();
    for kernel in &kernels {
        let artifact = handle.artifact_path(&gen_dir, kernel).unwrap();
        assert!(artifact.join(ARTIFACT_KERNEL).is_file());
        assert!(artifact.join("built.txt").is_file());

        let out = gen_dir.join("out").join(kernel.file_stem().unwrap());
        let status = handle.execute_kernel(&artifact, &out).await.unwrap();
        assert_eq!(status, ExecStatus::Ok);
        outputs.push(out);
    }

    assert!(handle.compare_results(&outputs[0], &outputs[1]).await.unwrap());
    handle.destroy().await;
}

#[tokio::test]
async fn failing_generation_returns_false() {
    let work = tempfile::tempdir().unwrap();
    let kernels = [kernel_file(work.path(), "v0")];
    let spec = BackendSpec::command("bad", sh("exit 1"), sh("true"));
    let handle = BackendRegistry::with_defaults().create(&spec).unwrap();
    assert!(!handle.generate_kernel(&kernels, work.path()).await.unwrap());
}

#[tokio::test]
async fn nonzero_exit_is_reported() {
    let work = tempfile::tempdir().unwrap();
    let spec = BackendSpec::command("crash", Vec::new(), sh("exit 7"));
    let handle = BackendRegistry::with_defaults().create(&spec).unwrap();
    let status = handle
        .execute_kernel(work.path(), &work.path().join("out"))
        .await
        .unwrap();
    assert_eq!(status, ExecStatus::NonZeroExit(7));
}

#[tokio::test]
async fn dropping_a_hung_run_reclaims_control() {
    let work = tempfile::tempdir().unwrap();
    let marker = work.path().join("late.txt");
    // the wrapper waits on a subshell that would write the marker later
    let mut execute = sh("(sleep 1; touch \"$0\") & wait");
    execute.push(marker.to_string_lossy().into_owned());
    let spec = BackendSpec::command("hang", Vec::new(), execute);
    let handle = BackendRegistry::with_defaults().create(&spec).unwrap();

    let started = Instant::now();
    let result = tokio::time::timeout(
        Duration::from_millis(200),
        handle.execute_kernel(work.path(), &work.path().join("out")),
    )
    .await;
    assert!(result.is_err());
    assert!(started.elapsed() < Duration::from_secs(10));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists(), "subshell of a timed-out run kept running");
}

#[cfg(unix)]
#[tokio::test]
async fn background_work_does_not_outlive_a_finished_run() {
    let work = tempfile::tempdir().unwrap();
    let marker = work.path().join("late.txt");
    let mut execute = sh("(sleep 1; touch \"$0\") >/dev/null 2>&1 & exit 0");
    execute.push(marker.to_string_lossy().into_owned());
    let spec = BackendSpec::command("leaky", Vec::new(), execute);
    let handle = BackendRegistry::with_defaults().create(&spec).unwrap();

    let status = handle
        .execute_kernel(work.path(), &work.path().join("out"))
        .await
        .unwrap();
    assert_eq!(status, ExecStatus::Ok);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!marker.exists(), "background job survived its run");
}

#[tokio::test]
async fn mismatching_outputs_compare_false() {
    let reference = tempfile::tempdir().unwrap();
    let candidate = tempfile::tempdir().unwrap();
    std::fs::write(reference.path().join("y.tns"), "0 1.0\n").unwrap();
    std::fs::write(candidate.path().join("y.tns"), "0 2.0\n").unwrap();

    let spec = BackendSpec::command("cmp", Vec::new(), sh("true"));
    let handle = BackendRegistry::with_defaults().create(&spec).unwrap();
    assert!(!handle
        .compare_results(reference.path(), candidate.path())
        .await
        .unwrap());
}
