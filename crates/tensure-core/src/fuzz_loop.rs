//! The fuzz loop
//!
//! A synchronous driver hands iteration indices to a [`WorkerPool`], keeping
//! at most `workers` iterations in flight. Each worker runs one iteration to
//! completion on the shared tokio runtime:
//!
//! 1. generate a kernel into `data/<id>` and gate it with `check_kernel`
//! 2. persist the seed and its format siblings under `corpus/<id>`
//! 3. generate and execute every variant on the reference backend, then on
//!    all candidates concurrently, each execution under a deadline
//! 4. compare candidate vs reference per variant, and reference sibling vs
//!    reference seed
//! 5. write `record.json`; on any finding move the directory to `failures/`
//!
//! An aborted iteration (error or panic) is archived under `failures/` too,
//! with `outcome: error` and the cause in its record.
//!
//! A failure or panic inside an iteration is caught at the iteration
//! boundary and never ends the run. Only the iteration budget or the
//! shutdown token does.

use crate::config::HarnessConfig;
use crate::deadline::execute_with_deadline;
use crate::error::FuzzError;
use crate::generator::KernelGenerator;
use crate::iteration::{
    CampaignLayout, Finding, IterationId, IterationRecord, Outcome, SEED_KERNEL_FILE, VARIANTS_DIR,
};
use crate::pool::WorkerPool;
use crate::shutdown::ShutdownToken;
use futures::future::join_all;
use std::any::Any;
use std::fmt::{self, Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};
use tensure_backend::{BackendHandle, BackendRegistry};
use tensure_einsum::check_kernel;
use tensure_mutation::FormatMutator;
use tokio::runtime::Handle;
use tracing::Instrument;

/// Per-outcome counts of a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub errors: u64,
    /// Stopped by the shutdown token rather than the budget
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    fn record(&mut self, outcome: Outcome) {
        self.iterations += 1;
        match outcome {
            Outcome::Pass => self.passed += 1,
            Outcome::Fail => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Error => self.errors += 1,
        }
    }
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} iterations in {:.1}s: {} passed, {} failed, {} skipped, {} errors{}",
            self.iterations,
            self.elapsed.as_secs_f64(),
            self.passed,
            self.failed,
            self.skipped,
            self.errors,
            if self.interrupted { " (interrupted)" } else { "" }
        )
    }
}

/// A configured campaign, ready to run once
pub struct FuzzLoop {
    config: HarnessConfig,
    ctx: Arc<IterationContext>,
}

impl std::fmt::Debug for FuzzLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuzzLoop")
            .field("config", &self.config)
            .field("reference", &self.ctx.reference.name())
            .field("candidates", &self.ctx.candidates.len())
            .finish_non_exhaustive()
    }
}

impl FuzzLoop {
    /// Validate `config` and create every backend it names
    ///
    /// # Errors
    /// - `Config` for invalid settings
    /// - `Backend` if a backend cannot be constructed
    pub fn new(
        config: HarnessConfig,
        registry: &BackendRegistry,
        generator: Arc<dyn KernelGenerator>,
    ) -> Result<Self, FuzzError> {
        config.validate()?;
        let reference_spec = config
            .reference
            .as_ref()
            .ok_or_else(|| FuzzError::Config("no reference backend configured".into()))?;
        let reference = registry.create(reference_spec)?;
        let candidates = config
            .candidates
            .iter()
            .map(|spec| registry.create(spec))
            .collect::<Result<Vec<_>, _>>()?;

        let ctx = IterationContext {
            layout: CampaignLayout::new(&config.output_dir),
            generator,
            mutator: FormatMutator::new(config.mutation_scope()),
            variants: config.variants,
            timeout: config.exec_timeout(),
            reference,
            candidates,
        };
        Ok(Self {
            config,
            ctx: Arc::new(ctx),
        })
    }

    #[inline]
    #[must_use]
    pub fn layout(&self) -> &CampaignLayout {
        &self.ctx.layout
    }

    /// Run the campaign until the budget is spent or `shutdown` is triggered
    ///
    /// Blocks the calling thread; `runtime` drives backend futures on the
    /// pool's workers. Must not be called from inside an async context.
    /// Backends are destroyed before returning.
    ///
    /// # Errors
    /// Only setup failures (layout creation, worker pool); iteration
    /// failures are counted in the summary.
    pub fn run(self, shutdown: &ShutdownToken, runtime: &Handle) -> Result<RunSummary, FuzzError> {
        self.ctx.layout.create_all()?;
        let workers = self.config.workers;
        tracing::info!(
            seed = self.config.seed,
            max_iterations = self.config.max_iterations,
            workers,
            reference = self.ctx.reference.name(),
            candidates = self.ctx.candidates.len(),
            output = %self.ctx.layout.root.display(),
            "starting fuzz loop"
        );

        let started = Instant::now();
        let pool = WorkerPool::new(workers)?;
        let (tx, rx) = mpsc::channel::<(u64, Outcome)>();
        let mut summary = RunSummary::default();
        let mut in_flight = 0usize;
        let mut next = 0u64;

        while next < self.config.max_iterations {
            if shutdown.is_triggered() {
                summary.interrupted = true;
                break;
            }
            if in_flight >= workers {
                if let Ok((index, outcome)) = rx.recv() {
                    in_flight -= 1;
                    self.tally(&mut summary, index, outcome);
                }
                continue;
            }
            let ctx = Arc::clone(&self.ctx);
            let tx = tx.clone();
            let rt = runtime.clone();
            let index = next;
            pool.submit(move || {
                let outcome = ctx.run_guarded(index, &rt);
                // receiver outlives every task
                let _ = tx.send((index, outcome));
            })?;
            in_flight += 1;
            next += 1;
        }

        drop(tx);
        while in_flight > 0 {
            let Ok((index, outcome)) = rx.recv() else {
                break;
            };
            in_flight -= 1;
            self.tally(&mut summary, index, outcome);
        }
        pool.shutdown();
        if shutdown.is_triggered() {
            summary.interrupted = true;
        }

        runtime.block_on(self.ctx.destroy_backends());
        summary.elapsed = started.elapsed();
        tracing::info!(%summary, "fuzz loop finished");
        Ok(summary)
    }

    fn tally(&self, summary: &mut RunSummary, index: u64, outcome: Outcome) {
        summary.record(outcome);
        if index % self.config.heartbeat_every == 0 {
            tracing::info!(
                iteration = index,
                %outcome,
                passed = summary.passed,
                failed = summary.failed,
                skipped = summary.skipped,
                errors = summary.errors,
                "heartbeat"
            );
        }
    }
}

/// Everything a worker needs to run one iteration
struct IterationContext {
    layout: CampaignLayout,
    generator: Arc<dyn KernelGenerator>,
    mutator: FormatMutator,
    variants: usize,
    timeout: Duration,
    reference: BackendHandle,
    candidates: Vec<BackendHandle>,
}

/// Outputs of one backend over all variants of an iteration
#[derive(Default)]
struct BackendRun {
    /// Output directory per variant; `None` when execution failed
    outputs: Vec<Option<PathBuf>>,
    findings: Vec<Finding>,
}

impl IterationContext {
    /// Run one iteration, converting errors and panics into `Outcome::Error`
    fn run_guarded(&self, index: u64, runtime: &Handle) -> Outcome {
        let id = IterationId::now(index);
        let span = tracing::info_span!("iteration", id = %id);
        let result = catch_unwind(AssertUnwindSafe(|| {
            runtime.block_on(self.run_iteration(index, &id).instrument(span.clone()))
        }));
        let detail = match result {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!("panic: {}", panic_message(payload.as_ref())),
        };
        span.in_scope(|| tracing::error!(error = %detail, "iteration aborted"));
        self.record_error(&id, index, detail);
        Outcome::Error
    }

    /// Best-effort `record.json` for an aborted iteration, archived under
    /// `failures/` as left, without cleanup
    fn record_error(&self, id: &IterationId, index: u64, detail: String) {
        let staging = self.layout.staging_dir(id);
        if !staging.is_dir() {
            return;
        }
        let mut record = IterationRecord::new(id.clone(), index);
        record.outcome = Outcome::Error;
        record.detail = Some(detail);
        if let Err(e) = record.save(&staging) {
            tracing::warn!(error = %e, "could not write error record");
        }
        let target = self.layout.failure_dir(id);
        match std::fs::rename(&staging, &target) {
            Ok(()) => tracing::warn!(dir = %target.display(), "aborted iteration archived"),
            Err(e) => tracing::warn!(dir = %staging.display(), error = %e, "could not archive aborted iteration"),
        }
    }

    async fn run_iteration(&self, index: u64, id: &IterationId) -> Result<Outcome, FuzzError> {
        let staging = self.layout.staging_dir(id);
        let data_dir = self.layout.data_dir(id);
        let variants_dir = staging.join(VARIANTS_DIR);
        for dir in [&staging, &data_dir, &variants_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| FuzzError::io(dir, e))?;
        }

        let kernel = self.generator.generate(index, &data_dir)?;
        if let Err(reason) = check_kernel(&kernel) {
            tracing::info!(%reason, "kernel rejected, skipping");
            for dir in [&staging, &data_dir] {
                if let Err(e) = tokio::fs::remove_dir_all(dir).await {
                    tracing::debug!(dir = %dir.display(), error = %e, "cleanup failed");
                }
            }
            return Ok(Outcome::Skipped);
        }

        let seed_path = staging.join(SEED_KERNEL_FILE);
        kernel.save(&seed_path)?;
        let siblings = self.mutator.persist(&kernel, self.variants, &variants_dir)?;
        let mut variant_files = vec![seed_path];
        variant_files.extend(siblings.into_iter().map(|v| v.path));

        let mut record = IterationRecord::new(id.clone(), index);
        record.kernel_files = variant_files
            .iter()
            .map(|p| {
                p.strip_prefix(&staging)
                    .unwrap_or(p)
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        tracing::debug!(
            variants = variant_files.len(),
            equation = ?kernel.computations.first().map(|c| c.expression.as_str()),
            "kernel persisted"
        );

        let reference = self.run_backend(&self.reference, &variant_files, &staging).await?;
        let candidates = join_all(
            self.candidates
                .iter()
                .map(|handle| self.run_backend(handle, &variant_files, &staging)),
        )
        .await;

        let mut findings = reference.findings.clone();
        if let Some(Some(seed_out)) = reference.outputs.first() {
            for (file, output) in variant_files.iter().zip(&reference.outputs).skip(1) {
                let Some(output) = output else { continue };
                if !self.reference.compare_results(seed_out, output).await? {
                    findings.push(Finding::Metamorphic {
                        variant: variant_name(file),
                    });
                }
            }
        }

        for (handle, run) in self.candidates.iter().zip(candidates) {
            let run = run?;
            findings.extend(run.findings);
            for ((file, ref_out), cand_out) in variant_files
                .iter()
                .zip(&reference.outputs)
                .zip(&run.outputs)
            {
                let (Some(ref_out), Some(cand_out)) = (ref_out, cand_out) else {
                    continue;
                };
                if !handle.compare_results(ref_out, cand_out).await? {
                    findings.push(Finding::Mismatch {
                        backend: handle.name().to_string(),
                        variant: variant_name(file),
                    });
                }
            }
        }

        record.findings = findings;
        record.settle();
        record.save(&staging)?;

        if record.outcome == Outcome::Fail {
            let target = self.layout.failure_dir(id);
            tokio::fs::rename(&staging, &target)
                .await
                .map_err(|e| FuzzError::io(&target, e))?;
            for finding in &record.findings {
                tracing::warn!(%finding, "finding");
            }
            tracing::warn!(dir = %target.display(), "iteration failed, archived");
        } else {
            tracing::debug!("iteration passed");
        }
        Ok(record.outcome)
    }

    async fn run_backend(
        &self,
        handle: &BackendHandle,
        variant_files: &[PathBuf],
        staging: &Path,
    ) -> Result<BackendRun, FuzzError> {
        let backend_dir = staging.join(handle.name());
        let mut run = BackendRun::default();

        if !handle.generate_kernel(variant_files, &backend_dir).await? {
            run.findings.push(Finding::GenerateFailed {
                backend: handle.name().to_string(),
            });
            run.outputs = vec![None; variant_files.len()];
            return Ok(run);
        }

        for file in variant_files {
            let variant = variant_name(file);
            let artifact = handle.artifact_path(&backend_dir, file)?;
            let output = backend_dir.join("out").join(&variant);
            let status = execute_with_deadline(handle, &artifact, &output, self.timeout).await?;
            if status.is_ok() {
                run.outputs.push(Some(output));
            } else {
                tracing::info!(backend = handle.name(), %variant, %status, "execution failed");
                run.findings.push(Finding::ExecFailed {
                    backend: handle.name().to_string(),
                    variant,
                    status,
                });
                run.outputs.push(None);
            }
        }
        Ok(run)
    }

    async fn destroy_backends(&self) {
        self.reference.destroy().await;
        for handle in &self.candidates {
            handle.destroy().await;
        }
    }
}

fn variant_name(file: &Path) -> String {
    file.file_stem()
        .map_or_else(|| "kernel".to_string(), |s| s.to_string_lossy().into_owned())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_outcomes() {
        let mut summary = RunSummary::default();
        for outcome in [Outcome::Pass, Outcome::Pass, Outcome::Fail, Outcome::Skipped, Outcome::Error] {
            summary.record(outcome);
        }
        assert_eq!(summary.iterations, 5);
        assert_eq!(summary.passed, 2);
        assert_eq!((summary.failed, summary.skipped, summary.errors), (1, 1, 1));
        assert!(summary.to_string().starts_with("5 iterations in"));
    }

    #[test]
    fn variant_names_are_file_stems() {
        assert_eq!(variant_name(Path::new("/x/kernel.json")), "kernel");
        assert_eq!(variant_name(Path::new("/x/kernels/0a1b2c.json")), "0a1b2c");
    }

    #[test]
    fn panic_payloads_are_readable() {
        let payload = catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static message");
        let payload = catch_unwind(|| panic!("formatted {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted 7");
    }
}
