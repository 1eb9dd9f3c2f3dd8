//! Equivalence predicates over loaded outputs

use crate::error::CompareError;
use crate::parsers::{default_parsers, ParserRegistry};
use std::fmt::{self, Display, Formatter};
use std::path::Path;
use tensure_model::{Coordinate, TensorData};

/// Default absolute tolerance
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Outcome of comparing two coordinate tables
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Same coordinates, values within tolerance
    Equal,
    /// Tables hold a different number of records
    SizeMismatch { reference: usize, candidate: usize },
    /// Reference coordinate absent from the candidate
    MissingCoordinate { coord: Coordinate },
    /// Values differ by more than the tolerance
    ValueMismatch {
        coord: Coordinate,
        reference: f64,
        candidate: f64,
    },
}

impl Verdict {
    #[inline]
    #[must_use]
    pub fn is_equal(&self) -> bool {
        matches!(self, Self::Equal)
    }

    /// Turn a disagreement into `CompareError::Mismatch`
    ///
    /// # Errors
    /// Any verdict other than `Equal`
    pub fn ensure_equal(self) -> Result<(), CompareError> {
        if self.is_equal() {
            Ok(())
        } else {
            Err(CompareError::Mismatch {
                detail: self.to_string(),
            })
        }
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => f.write_str("equal"),
            Self::SizeMismatch {
                reference,
                candidate,
            } => write!(f, "{reference} reference records vs {candidate} candidate records"),
            Self::MissingCoordinate { coord } => write!(f, "candidate lacks coordinate {coord:?}"),
            Self::ValueMismatch {
                coord,
                reference,
                candidate,
            } => write!(f, "at {coord:?}: reference {reference} vs candidate {candidate}"),
        }
    }
}

/// Compare two loaded tables
///
/// Sizes must match, then every reference coordinate must be present in the
/// candidate with `|ref - cand| <= tolerance`. Coordinates match exactly.
#[must_use]
pub fn compare_tables(reference: &TensorData, candidate: &TensorData, tolerance: f64) -> Verdict {
    if reference.len() != candidate.len() {
        return Verdict::SizeMismatch {
            reference: reference.len(),
            candidate: candidate.len(),
        };
    }
    for (coord, ref_value) in reference.iter() {
        let Some(cand_value) = candidate.get(coord) else {
            return Verdict::MissingCoordinate {
                coord: coord.clone(),
            };
        };
        // NaN on either side fails this test
        let within = (ref_value - cand_value).abs() <= tolerance;
        if !within {
            return Verdict::ValueMismatch {
                coord: coord.clone(),
                reference: ref_value,
                candidate: cand_value,
            };
        }
    }
    Verdict::Equal
}

/// Load and compare two output files
///
/// # Errors
/// Loading failures from either file
pub fn compare(ref_path: &Path, cand_path: &Path, tolerance: f64) -> Result<Verdict, CompareError> {
    compare_with(&default_parsers(), ref_path, cand_path, tolerance)
}

fn compare_with(
    parsers: &ParserRegistry,
    ref_path: &Path,
    cand_path: &Path,
    tolerance: f64,
) -> Result<Verdict, CompareError> {
    let reference = parsers.load(ref_path)?;
    let candidate = parsers.load(cand_path)?;
    Ok(compare_tables(&reference, &candidate, tolerance))
}

/// Per-file result of a directory comparison
#[derive(Debug, Clone, PartialEq)]
pub struct FileVerdict {
    /// File name shared by both directories
    pub file: String,
    /// `None` when the candidate directory lacks the file
    pub verdict: Option<Verdict>,
}

/// Result of [`compare_dirs`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirReport {
    /// Supported reference outputs, sorted by file name
    pub files: Vec<FileVerdict>,
}

impl DirReport {
    /// At least one output compared and every output equal
    #[must_use]
    pub fn is_equal(&self) -> bool {
        !self.files.is_empty()
            && self
                .files
                .iter()
                .all(|f| f.verdict.as_ref().is_some_and(Verdict::is_equal))
    }

    /// First disagreement, if any
    #[must_use]
    pub fn first_mismatch(&self) -> Option<&FileVerdict> {
        self.files
            .iter()
            .find(|f| !f.verdict.as_ref().is_some_and(Verdict::is_equal))
    }
}

impl Display for DirReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.files.is_empty() {
            return f.write_str("no comparable outputs");
        }
        match self.first_mismatch() {
            None => write!(f, "{} outputs equal", self.files.len()),
            Some(FileVerdict {
                file,
                verdict: None,
            }) => write!(f, "{file}: missing from candidate"),
            Some(FileVerdict {
                file,
                verdict: Some(v),
            }) => write!(f, "{file}: {v}"),
        }
    }
}

/// Compare every supported output in `ref_dir` with its namesake in `cand_dir`
///
/// Read-only on both directories. Files the parsers do not recognise are
/// ignored.
///
/// # Errors
/// - `NotFound` / `Io` if `ref_dir` cannot be listed
/// - Loading failures from any compared file
pub fn compare_dirs(ref_dir: &Path, cand_dir: &Path, tolerance: f64) -> Result<DirReport, CompareError> {
    let parsers = default_parsers();
    let entries = std::fs::read_dir(ref_dir).map_err(|e| CompareError::io(ref_dir, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CompareError::io(ref_dir, e))?;
        let path = entry.path();
        if path.is_file() && parsers.supports(&path) {
            names.push(entry.file_name());
        }
    }
    names.sort();

    let mut report = DirReport::default();
    for name in names {
        let ref_path = ref_dir.join(&name);
        let cand_path = cand_dir.join(&name);
        let file = name.to_string_lossy().into_owned();
        let verdict = if cand_path.is_file() {
            Some(compare_with(&parsers, &ref_path, &cand_path, tolerance)?)
        } else {
            None
        };
        tracing::debug!(file = %file, equal = verdict.as_ref().is_some_and(Verdict::is_equal), "output compared");
        report.files.push(FileVerdict { file, verdict });
    }
    Ok(report)
}
