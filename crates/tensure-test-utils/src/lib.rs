//! Testing utilities for the tensure workspace
//!
//! Shared fixtures: sample kernels, an in-process scripted backend and
//! deterministic generators.

#![allow(missing_docs)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tensure_backend::{Backend, BackendRegistry, BackendSpec, ExecStatus};
use tensure_core::{FuzzError, KernelGenerator};
use tensure_model::{Computation, DataSource, FormatAssignment, Kernel, TensorDescriptor};

/// Output file written by [`ScriptedBackend`]
pub const SCRIPTED_OUTPUT: &str = "y.tns";

pub fn matmul_kernel() -> Kernel {
    Kernel::from_parts(
        vec![
            TensorDescriptor::dense('A', vec!['i', 'j'], vec![3, 4]),
            TensorDescriptor::new(
                'B',
                vec!['i', 'k'],
                vec![3, 5],
                FormatAssignment::parse(&["Dense", "Sparse"]).unwrap(),
            ),
            TensorDescriptor::dense('C', vec!['k', 'j'], vec![5, 4]),
        ],
        vec![Computation::new("A(i,j) = B(i,k) * C(k,j)")],
        vec![
            DataSource::Fresh,
            DataSource::File(PathBuf::from("B.tns")),
            DataSource::File(PathBuf::from("C.tns")),
        ],
    )
    .unwrap()
}

pub fn spmv_kernel() -> Kernel {
    Kernel::from_parts(
        vec![
            TensorDescriptor::dense('y', vec!['i'], vec![4]),
            TensorDescriptor::dense('A', vec!['i', 'j'], vec![4, 5]),
            TensorDescriptor::dense('x', vec!['j'], vec![5]),
        ],
        vec![Computation::new("y(i) = A(i,j) * x(j)")],
        vec![
            DataSource::Fresh,
            DataSource::File(PathBuf::from("A.tns")),
            DataSource::File(PathBuf::from("x.tns")),
        ],
    )
    .unwrap()
}

/// Structurally sound kernel whose equation leaves `j` unbound
pub fn unbound_output_kernel() -> Kernel {
    Kernel::from_parts(
        vec![
            TensorDescriptor::dense('A', vec!['i', 'j'], vec![2, 2]),
            TensorDescriptor::dense('B', vec!['i', 'k'], vec![2, 2]),
            TensorDescriptor::dense('C', vec!['j', 'k'], vec![2, 2]),
        ],
        vec![Computation::new("A(i,j) = B(i,k)")],
        vec![DataSource::Fresh, DataSource::Fresh, DataSource::Fresh],
    )
    .unwrap()
}

/// What a [`ScriptedBackend`] does when asked to execute
#[derive(Debug, Clone, PartialEq)]
pub enum Script {
    /// Write `0 0 <value>` for every variant
    Constant(f64),
    /// Write `1.0` for the seed variant and `2.0` for every sibling
    PerVariant,
    /// Exit with this code
    Exit(i32),
    /// Never finish
    Hang,
    /// `generate_kernel` returns false
    FailGenerate,
}

/// In-process backend driven by a [`Script`]
#[derive(Debug)]
pub struct ScriptedBackend {
    name: String,
    script: Script,
    teardowns: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub fn new(name: impl Into<String>, script: Script) -> Self {
        Self {
            name: name.into(),
            script,
            teardowns: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_teardown_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.teardowns = counter;
        self
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_kernel(&self, kernel_files: &[PathBuf], output_dir: &Path) -> bool {
        if self.script == Script::FailGenerate {
            return false;
        }
        for file in kernel_files {
            let artifact = self.artifact_path(output_dir, file);
            if tokio::fs::create_dir_all(&artifact).await.is_err() {
                return false;
            }
        }
        true
    }

    async fn execute_kernel(&self, artifact: &Path, output_dir: &Path) -> ExecStatus {
        let value = match &self.script {
            Script::Constant(v) => *v,
            Script::PerVariant => {
                if artifact.file_name().is_some_and(|n| n == "kernel") {
                    1.0
                } else {
                    2.0
                }
            }
            Script::Exit(code) => return ExecStatus::from_code(*code),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                return ExecStatus::Ok;
            }
            Script::FailGenerate => return ExecStatus::SpawnFailed("never generated".into()),
        };
        if let Err(e) = tokio::fs::create_dir_all(output_dir).await {
            return ExecStatus::SpawnFailed(e.to_string());
        }
        match tokio::fs::write(output_dir.join(SCRIPTED_OUTPUT), format!("0 0 {value}\n")).await {
            Ok(()) => ExecStatus::Ok,
            Err(e) => ExecStatus::SpawnFailed(e.to_string()),
        }
    }

    async fn teardown(&self) {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Register `kind` as a scripted backend following `script`
pub fn register_scripted(
    registry: &mut BackendRegistry,
    kind: &str,
    script: Script,
    teardowns: Arc<AtomicUsize>,
) {
    registry.register(kind, move |spec: &BackendSpec| {
        Ok(Box::new(
            ScriptedBackend::new(spec.name.clone(), script.clone())
                .with_teardown_counter(Arc::clone(&teardowns)),
        ) as Box<dyn Backend>)
    });
}

/// Always returns the same kernel
#[derive(Debug, Clone)]
pub struct FixedGenerator {
    kernel: Kernel,
}

impl FixedGenerator {
    pub fn new(kernel: Kernel) -> Self {
        Self { kernel }
    }
}

impl KernelGenerator for FixedGenerator {
    fn generate(&self, _iteration: u64, _data_dir: &Path) -> Result<Kernel, FuzzError> {
        Ok(self.kernel.clone())
    }
}

/// Panics on one iteration, delegates otherwise
pub struct PanickingGenerator<G> {
    pub panic_on: u64,
    pub inner: G,
}

impl<G: KernelGenerator> KernelGenerator for PanickingGenerator<G> {
    fn generate(&self, iteration: u64, data_dir: &Path) -> Result<Kernel, FuzzError> {
        assert!(iteration != self.panic_on, "generator exploded on iteration {iteration}");
        self.inner.generate(iteration, data_dir)
    }
}

/// Fails with `FuzzError::Generator` on every iteration
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingGenerator;

impl KernelGenerator for FailingGenerator {
    fn generate(&self, iteration: u64, _data_dir: &Path) -> Result<Kernel, FuzzError> {
        Err(FuzzError::Generator(format!("no kernel for iteration {iteration}")))
    }
}
