//! End-to-end fuzz loop behaviour with scripted in-process backends.

use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tensure_backend::{BackendRegistry, BackendSpec, ExecStatus};
use tensure_core::{
    Finding, FuzzError, FuzzLoop, GeneratorConfig, HarnessConfig, IterationRecord, KernelGenerator, Outcome,
    RandomEinsumGenerator, RunSummary, ShutdownToken, RECORD_FILE, SEED_KERNEL_FILE, VARIANTS_DIR,
};
use tensure_test_utils::{
    matmul_kernel, register_scripted, unbound_output_kernel, FailingGenerator, FixedGenerator,
    PanickingGenerator, Script,
};

struct Harness {
    registry: BackendRegistry,
    teardowns: Arc<AtomicUsize>,
}

impl Harness {
    fn new(scripts: &[(&str, Script)]) -> Self {
        let teardowns = Arc::new(AtomicUsize::new(0));
        let mut registry = BackendRegistry::with_defaults();
        for (kind, script) in scripts {
            register_scripted(&mut registry, kind, script.clone(), Arc::clone(&teardowns));
        }
        Self {
            registry,
            teardowns,
        }
    }

    fn run(&self, config: HarnessConfig, generator: Arc<dyn KernelGenerator>) -> RunSummary {
        self.run_with(config, generator, &ShutdownToken::new())
    }

    fn run_with(
        &self,
        config: HarnessConfig,
        generator: Arc<dyn KernelGenerator>,
        shutdown: &ShutdownToken,
    ) -> RunSummary {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let fuzz = FuzzLoop::new(config, &self.registry, generator).unwrap();
        fuzz.run(shutdown, runtime.handle()).unwrap()
    }
}

fn config(root: &Path, iterations: u64) -> HarnessConfig {
    HarnessConfig::new()
        .with_output_dir(root)
        .with_max_iterations(iterations)
        .with_workers(2)
        .with_variants(3)
        .with_heartbeat_every(1)
        .with_exec_timeout_secs(1)
        .with_reference(BackendSpec::new("ref", "agree"))
}

fn subdirs(dir: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs
}

fn fixed() -> Arc<dyn KernelGenerator> {
    Arc::new(FixedGenerator::new(matmul_kernel()))
}

#[test]
fn agreeing_backends_fill_the_corpus() {
    let root = tempfile::tempdir().unwrap();
    let harness = Harness::new(&[("agree", Script::Constant(1.0))]);
    let config = config(root.path(), 4).with_candidate(BackendSpec::new("cand", "agree"));

    let summary = harness.run(config, fixed());
    assert_eq!((summary.iterations, summary.passed), (4, 4));
    assert!(!summary.interrupted);

    let corpus = subdirs(&root.path().join("corpus"));
    assert_eq!(corpus.len(), 4);
    assert!(subdirs(&root.path().join("failures")).is_empty());
    for dir in &corpus {
        assert!(dir.join(SEED_KERNEL_FILE).is_file());
        assert!(dir.join(RECORD_FILE).is_file());
        assert_eq!(std::fs::read_dir(dir.join(VARIANTS_DIR)).unwrap().count(), 3);
        let record = IterationRecord::load(dir).unwrap();
        assert_eq!(record.outcome, Outcome::Pass);
        assert_eq!(record.kernel_files.len(), 4);
        assert_eq!(record.kernel_files[0], SEED_KERNEL_FILE);
        assert!(dir.file_name().unwrap().to_string_lossy().starts_with("iter_"));
    }
}

#[test]
fn candidate_disagreement_is_archived_as_failure() {
    let root = tempfile::tempdir().unwrap();
    let harness = Harness::new(&[("agree", Script::Constant(1.0)), ("off", Script::Constant(1.5))]);
    let config = config(root.path(), 2).with_candidate(BackendSpec::new("cand", "off"));

    let summary = harness.run(config, fixed());
    assert_eq!((summary.failed, summary.passed), (2, 0));
    assert!(subdirs(&root.path().join("corpus")).is_empty());

    let failures = subdirs(&root.path().join("failures"));
    assert_eq!(failures.len(), 2);
    let record = IterationRecord::load(&failures[0]).unwrap();
    assert_eq!(record.outcome, Outcome::Fail);
    let mismatches = record
        .findings
        .iter()
        .filter(|f| matches!(f, Finding::Mismatch { backend, .. } if backend == "cand"))
        .count();
    assert_eq!(mismatches, 4);
    // both outputs retained for reproduction
    assert!(failures[0].join("ref/out/kernel/y.tns").is_file());
    assert!(failures[0].join("cand/out/kernel/y.tns").is_file());
}

#[test]
fn reference_sibling_divergence_is_metamorphic_failure() {
    let root = tempfile::tempdir().unwrap();
    let harness = Harness::new(&[("agree", Script::PerVariant)]);

    let summary = harness.run(config(root.path(), 1), fixed());
    assert_eq!(summary.failed, 1);
    let failures = subdirs(&root.path().join("failures"));
    let record = IterationRecord::load(&failures[0]).unwrap();
    assert_eq!(record.findings.len(), 3);
    assert!(record
        .findings
        .iter()
        .all(|f| matches!(f, Finding::Metamorphic { .. })));
}

#[test]
fn hung_candidate_times_out() {
    let root = tempfile::tempdir().unwrap();
    let harness = Harness::new(&[("agree", Script::Constant(1.0)), ("hang", Script::Hang)]);
    let config = config(root.path(), 1)
        .with_variants(0)
        .with_candidate(BackendSpec::new("cand", "hang"));

    let summary = harness.run(config, fixed());
    assert_eq!(summary.failed, 1);
    let failures = subdirs(&root.path().join("failures"));
    let record = IterationRecord::load(&failures[0]).unwrap();
    assert_eq!(
        record.findings,
        vec![Finding::ExecFailed {
            backend: "cand".into(),
            variant: "kernel".into(),
            status: ExecStatus::TimedOut,
        }]
    );
}

#[test]
fn crashes_and_generation_failures_are_findings() {
    let root = tempfile::tempdir().unwrap();
    let harness = Harness::new(&[
        ("agree", Script::Constant(1.0)),
        ("crash", Script::Exit(3)),
        ("nogen", Script::FailGenerate),
    ]);
    let config = config(root.path(), 1)
        .with_variants(1)
        .with_candidate(BackendSpec::new("crashy", "crash"))
        .with_candidate(BackendSpec::new("broken", "nogen"));

    let summary = harness.run(config, fixed());
    assert_eq!(summary.failed, 1);
    let record = IterationRecord::load(&subdirs(&root.path().join("failures"))[0]).unwrap();
    assert!(record.findings.contains(&Finding::GenerateFailed {
        backend: "broken".into()
    }));
    let crashes = record
        .findings
        .iter()
        .filter(|f| {
            matches!(f, Finding::ExecFailed { backend, status: ExecStatus::NonZeroExit(3), .. } if backend == "crashy")
        })
        .count();
    assert_eq!(crashes, 2);
}

#[test]
fn invalid_kernels_are_skipped_and_cleaned_up() {
    let root = tempfile::tempdir().unwrap();
    let harness = Harness::new(&[("agree", Script::Constant(1.0))]);
    let generator = Arc::new(FixedGenerator::new(unbound_output_kernel()));

    let summary = harness.run(config(root.path(), 3), generator);
    assert_eq!((summary.skipped, summary.iterations), (3, 3));
    assert!(subdirs(&root.path().join("corpus")).is_empty());
    assert!(subdirs(&root.path().join("data")).is_empty());
}

#[test]
fn a_panicking_iteration_does_not_stop_the_run() {
    let root = tempfile::tempdir().unwrap();
    let harness = Harness::new(&[("agree", Script::Constant(1.0))]);
    let generator = Arc::new(PanickingGenerator {
        panic_on: 1,
        inner: FixedGenerator::new(matmul_kernel()),
    });

    let summary = harness.run(config(root.path(), 4), generator);
    assert_eq!((summary.errors, summary.passed), (1, 3));

    let corpus = subdirs(&root.path().join("corpus"));
    assert_eq!(corpus.len(), 3);
    for dir in &corpus {
        assert_eq!(IterationRecord::load(dir).unwrap().outcome, Outcome::Pass);
    }
    let errored = subdirs(&root.path().join("failures"));
    assert_eq!(errored.len(), 1);
    let record = IterationRecord::load(&errored[0]).unwrap();
    assert_eq!(record.index, 1);
    assert!(record.detail.unwrap().contains("generator exploded"));
}

#[test]
fn generator_errors_are_archived_with_the_failures() {
    let root = tempfile::tempdir().unwrap();
    let harness = Harness::new(&[("agree", Script::Constant(1.0))]);

    let summary = harness.run(config(root.path(), 2), Arc::new(FailingGenerator));
    assert_eq!(summary.errors, 2);
    assert!(subdirs(&root.path().join("corpus")).is_empty());
    let left = subdirs(&root.path().join("failures"));
    assert_eq!(left.len(), 2);
    for dir in left {
        assert_eq!(IterationRecord::load(&dir).unwrap().outcome, Outcome::Error);
    }
}

#[test]
fn triggered_shutdown_dispatches_nothing() {
    let root = tempfile::tempdir().unwrap();
    let harness = Harness::new(&[("agree", Script::Constant(1.0))]);
    let shutdown = ShutdownToken::new();
    shutdown.trigger();

    let summary = harness.run_with(config(root.path(), 100), fixed(), &shutdown);
    assert_eq!(summary.iterations, 0);
    assert!(summary.interrupted);
    assert_eq!(harness.teardowns.load(Ordering::SeqCst), 1);
}

#[test]
fn every_backend_is_destroyed_once() {
    let root = tempfile::tempdir().unwrap();
    let harness = Harness::new(&[("agree", Script::Constant(1.0))]);
    let config = config(root.path(), 2)
        .with_candidate(BackendSpec::new("c1", "agree"))
        .with_candidate(BackendSpec::new("c2", "agree"));

    harness.run(config, fixed());
    assert_eq!(harness.teardowns.load(Ordering::SeqCst), 3);
}

#[test]
fn random_kernels_run_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    let harness = Harness::new(&[("agree", Script::Constant(1.0))]);
    let generator = Arc::new(RandomEinsumGenerator::new(42, GeneratorConfig::default()));
    let config = config(root.path(), 6).with_candidate(BackendSpec::new("cand", "agree"));

    let summary = harness.run(config, generator);
    assert_eq!(summary.passed, 6);
    assert_eq!(subdirs(&root.path().join("data")).len(), 6);
}

#[test]
fn unknown_backend_kind_fails_setup() {
    let root = tempfile::tempdir().unwrap();
    let harness = Harness::new(&[]);
    let err = FuzzLoop::new(config(root.path(), 1), &harness.registry, fixed()).unwrap_err();
    assert!(matches!(err, FuzzError::Backend(_)));
    assert!(err.to_string().contains("unknown backend kind 'agree'"));
}
