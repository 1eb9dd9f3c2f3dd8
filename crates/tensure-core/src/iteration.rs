//! Iteration identity, outcome and on-disk layout

use crate::error::FuzzError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use tensure_backend::ExecStatus;
use tensure_model::{write_atomic, ModelError};

/// Name of the per-iteration record file
pub const RECORD_FILE: &str = "record.json";
/// Name of the seed kernel file inside an iteration directory
pub const SEED_KERNEL_FILE: &str = "kernel.json";
/// Subdirectory holding format siblings
pub const VARIANTS_DIR: &str = "kernels";

/// Unique id of one iteration: `iter_<index>_<YYYYmmdd-HHMMSS>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IterationId(String);

impl IterationId {
    #[must_use]
    pub fn new(index: u64, at: DateTime<Local>) -> Self {
        Self(format!("iter_{index}_{}", at.format("%Y%m%d-%H%M%S")))
    }

    /// Id stamped with the current local time
    #[must_use]
    pub fn now(index: u64) -> Self {
        Self::new(index, Local::now())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IterationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Final state of an iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Every backend agreed on every variant
    Pass,
    /// Disagreement or backend error; archived under `failures/`
    Fail,
    /// Generated kernel rejected by validation
    Skipped,
    /// Harness fault; directory left in place for inspection
    Error,
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skipped => "skipped",
            Self::Error => "error",
        })
    }
}

/// One reason an iteration failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// `generate_kernel` returned false
    GenerateFailed { backend: String },
    /// `execute_kernel` did not return `Ok`
    ExecFailed {
        backend: String,
        variant: String,
        status: ExecStatus,
    },
    /// Candidate output differs from the reference for the same variant
    Mismatch { backend: String, variant: String },
    /// Reference output for a sibling differs from the seed's
    Metamorphic { variant: String },
}

impl Display for Finding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenerateFailed { backend } => write!(f, "{backend}: kernel generation failed"),
            Self::ExecFailed {
                backend,
                variant,
                status,
            } => write!(f, "{backend}/{variant}: {status}"),
            Self::Mismatch { backend, variant } => {
                write!(f, "{backend}/{variant}: output differs from reference")
            }
            Self::Metamorphic { variant } => {
                write!(f, "reference/{variant}: output differs from the seed format")
            }
        }
    }
}

/// Persisted summary of one iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub id: IterationId,
    pub index: u64,
    pub outcome: Outcome,
    /// Variant files relative to the iteration directory, seed first
    pub kernel_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Finding>,
    /// Harness error message for `Outcome::Error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl IterationRecord {
    #[must_use]
    pub fn new(id: IterationId, index: u64) -> Self {
        Self {
            id,
            index,
            outcome: Outcome::Pass,
            kernel_files: Vec::new(),
            findings: Vec::new(),
            detail: None,
        }
    }

    /// Outcome implied by the findings
    pub fn settle(&mut self) {
        self.outcome = if self.findings.is_empty() {
            Outcome::Pass
        } else {
            Outcome::Fail
        };
    }

    /// Write as `record.json` in `dir` (atomic replace)
    ///
    /// # Errors
    /// Encoding or IO failure
    pub fn save(&self, dir: &Path) -> Result<(), ModelError> {
        let bytes = serde_json::to_vec_pretty(self).map_err(ModelError::Encode)?;
        write_atomic(&dir.join(RECORD_FILE), &bytes)
    }

    /// Read `record.json` from `dir`
    ///
    /// # Errors
    /// IO failure or malformed content
    pub fn load(dir: &Path) -> Result<Self, ModelError> {
        let bytes = tensure_model::read_file(&dir.join(RECORD_FILE))?;
        serde_json::from_slice(&bytes).map_err(ModelError::Parse)
    }
}

/// Directory layout of a campaign
///
/// ```text
/// <root>/corpus/<id>/     staging, then retained on pass
/// <root>/failures/<id>/   moved here on fail
/// <root>/data/<id>/       generated inputs
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignLayout {
    pub root: PathBuf,
    pub corpus: PathBuf,
    pub failures: PathBuf,
    pub data: PathBuf,
}

impl CampaignLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            corpus: root.join("corpus"),
            failures: root.join("failures"),
            data: root.join("data"),
            root,
        }
    }

    /// Create the three top-level directories
    ///
    /// # Errors
    /// `FuzzError::Io` naming the directory that could not be created
    pub fn create_all(&self) -> Result<(), FuzzError> {
        for dir in [&self.corpus, &self.failures, &self.data] {
            std::fs::create_dir_all(dir).map_err(|e| FuzzError::io(dir, e))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn staging_dir(&self, id: &IterationId) -> PathBuf {
        self.corpus.join(id.as_str())
    }

    #[must_use]
    pub fn failure_dir(&self, id: &IterationId) -> PathBuf {
        self.failures.join(id.as_str())
    }

    #[must_use]
    pub fn data_dir(&self, id: &IterationId) -> PathBuf {
        self.data.join(id.as_str())
    }
}
