//! Tensure Core - Fuzz Loop Orchestrator
//!
//! Drives a metamorphic/differential campaign against tensor-algebra
//! backends: generate a kernel, expand it into storage-format siblings, run
//! every sibling on a reference and on candidate backends, compare, and
//! archive.
//!
//! # Core Concepts
//!
//! - [`FuzzLoop`]: the campaign driver; returns a [`RunSummary`]
//! - [`WorkerPool`]: fixed-size FIFO pool running iterations in parallel
//! - [`KernelGenerator`]: source of candidate kernels
//! - [`ShutdownToken`]: graceful stop after in-flight iterations
//! - [`HarnessConfig`]: defaults < TOML < environment < CLI
//!
//! # Example
//!
//! ```rust,ignore
//! use tensure_core::{FuzzLoop, HarnessConfig, RandomEinsumGenerator, ShutdownToken};
//!
//! let config = HarnessConfig::from_toml_file(path)?.apply_env()?;
//! let generator = Arc::new(RandomEinsumGenerator::new(config.seed, config.generator.clone()));
//! let fuzz = FuzzLoop::new(config, &BackendRegistry::with_defaults(), generator)?;
//! let summary = fuzz.run(&ShutdownToken::new(), &runtime_handle)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod deadline;
mod error;
mod fuzz_loop;
mod generator;
mod iteration;
mod logging;
mod pool;
mod shutdown;

pub use config::{GeneratorConfig, HarnessConfig, ENV_ITERS, ENV_SEED};
pub use deadline::execute_with_deadline;
pub use error::{FuzzError, PoolError};
pub use fuzz_loop::{FuzzLoop, RunSummary};
pub use generator::{KernelGenerator, RandomEinsumGenerator};
pub use iteration::{
    CampaignLayout, Finding, IterationId, IterationRecord, Outcome, RECORD_FILE,
    SEED_KERNEL_FILE, VARIANTS_DIR,
};
pub use logging::{init_logging, LogOptions};
pub use pool::{PoolStats, WorkerPool};
pub use shutdown::{listen_for_signals, ShutdownToken};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
