//! Tensure Backend Plugin Protocol
//!
//! A backend is anything that can turn a persisted kernel into a runnable
//! artifact, run it, and compare two output directories:
//!
//! - [`Backend`]: the capability interface (`generate_kernel`,
//!   `execute_kernel`, `compare_results`)
//! - [`BackendRegistry`]: kind → constructor closures, so new backends are
//!   added without touching the orchestrator
//! - [`BackendHandle`]: run-scoped owner with a single `destroy`
//! - [`CommandBackend`]: built-in `command` kind driving external tools
//!
//! Execution reports an [`ExecStatus`] rather than a bare integer, keeping a
//! timeout distinct from an application exit code.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod backend;
mod command;
mod error;
mod handle;
mod process;
mod registry;
mod spec;
mod status;

pub use backend::Backend;
pub use command::{CommandBackend, ARTIFACT_KERNEL};
pub use error::BackendError;
pub use handle::BackendHandle;
pub use process::{run_command, Placeholders};
pub use registry::{BackendFactory, BackendRegistry};
pub use spec::{BackendSpec, DEFAULT_KIND};
pub use status::ExecStatus;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
