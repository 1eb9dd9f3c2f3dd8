//! Mutation driver
//!
//! Expands a seed kernel into siblings that differ from it only in the
//! `storageFormat` of one or more tensors. Computations, shapes and data
//! sources are copied unchanged.

use crate::enumerate::enumerate_formats;
use std::path::{Path, PathBuf};
use tensure_model::{ContentHash, FormatAssignment, Kernel, ModelError};

/// Mutation driver errors
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    /// Building or persisting a sibling failed
    #[error("variant construction failed: {0}")]
    Model(#[from] ModelError),
}

/// Which tensors may change storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationScope {
    /// Output and inputs
    #[default]
    AllTensors,
    /// Inputs only; the output keeps the seed's storage
    InputsOnly,
}

impl MutationScope {
    #[inline]
    fn includes(self, tensor_index: usize) -> bool {
        match self {
            Self::AllTensors => true,
            Self::InputsOnly => tensor_index > 0,
        }
    }
}

/// A sibling written to disk
#[derive(Debug, Clone)]
pub struct PersistedVariant {
    /// File holding the sibling
    pub path: PathBuf,
    /// Hash of the persisted bytes
    pub hash: ContentHash,
    /// The sibling itself
    pub kernel: Kernel,
}

/// Produces format-equivalent siblings of a seed kernel
///
/// Siblings follow the canonical enumeration over the concatenated modes of
/// the mutable tensors. The seed's own assignment is skipped, so every
/// sibling is distinct from the seed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatMutator {
    scope: MutationScope,
}

impl FormatMutator {
    /// Create mutator with the given scope
    #[inline]
    #[must_use]
    pub fn new(scope: MutationScope) -> Self {
        Self { scope }
    }

    /// Configured scope
    #[inline]
    #[must_use]
    pub fn scope(&self) -> MutationScope {
        self.scope
    }

    /// Lazily enumerate siblings of `seed`
    pub fn siblings<'a>(
        &self,
        seed: &'a Kernel,
    ) -> impl Iterator<Item = Result<Kernel, MutationError>> + 'a {
        let scope = self.scope;
        let mutable: Vec<usize> = (0..seed.tensors.len())
            .filter(|&i| scope.includes(i))
            .collect();
        let rank = mutable.iter().map(|&i| seed.tensors[i].rank()).sum();
        let seed_formats = seed.formats();

        enumerate_formats(rank).filter_map(move |joint| {
            let mut formats = seed_formats.clone();
            let mut labels = joint.labels().iter().copied();
            for &i in &mutable {
                let rank = seed.tensors[i].rank();
                formats[i] = FormatAssignment::new(labels.by_ref().take(rank).collect());
            }
            if formats == seed_formats {
                return None;
            }
            Some(seed.with_formats(&formats).map_err(MutationError::from))
        })
    }

    /// Up to `n` siblings of `seed`
    ///
    /// # Errors
    /// `MutationError::Model` if a sibling cannot be built
    pub fn mutate(&self, seed: &Kernel, n: usize) -> Result<Vec<Kernel>, MutationError> {
        self.siblings(seed).take(n).collect()
    }

    /// Write up to `n` siblings into `dir`, one file per sibling
    ///
    /// Files are named `<short-hash>.json` after their content.
    ///
    /// # Errors
    /// `MutationError::Model` on encoding or IO failure
    pub fn persist(
        &self,
        seed: &Kernel,
        n: usize,
        dir: &Path,
    ) -> Result<Vec<PersistedVariant>, MutationError> {
        let mut written = Vec::new();
        for sibling in self.siblings(seed).take(n) {
            let kernel = sibling?;
            let hash = kernel.content_hash()?;
            let path = dir.join(hash.file_name());
            kernel.save(&path)?;
            written.push(PersistedVariant { path, hash, kernel });
        }
        tracing::debug!(dir = %dir.display(), variants = written.len(), "format variants persisted");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tensure_model::{Computation, DataSource, FormatLabel, TensorDescriptor};

    fn spmv() -> Kernel {
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

    #[test]
    fn all_tensors_scope_yields_every_other_assignment() {
        let seed = spmv();
        let siblings = FormatMutator::default().mutate(&seed, usize::MAX).unwrap();
        // 4 modes in total, minus the seed's own assignment
        assert_eq!(siblings.len(), 15);
        assert!(siblings.iter().all(|k| k.formats() != seed.formats()));
    }

    #[test]
    fn siblings_differ_only_in_storage() {
        let seed = spmv();
        for sibling in FormatMutator::default().mutate(&seed, 5).unwrap() {
            assert_eq!(sibling.computations, seed.computations);
            assert_eq!(sibling.data_files, seed.data_files);
            for (a, b) in sibling.tensors.iter().zip(&seed.tensors) {
                assert_eq!(a.name, b.name);
                assert_eq!(a.idxs, b.idxs);
                assert_eq!(a.shape, b.shape);
                assert_eq!(a.str_repr, b.str_repr);
            }
        }
    }

    #[test]
    fn first_sibling_follows_canonical_order() {
        let seed = spmv();
        let first = FormatMutator::default().mutate(&seed, 1).unwrap();
        // Seed is all dense; next in DFS order flips only the last mode.
        assert_eq!(first[0].tensors[2].storage_format.labels(), &[FormatLabel::Sparse]);
        assert_eq!(
            first[0].tensors[1].storage_format,
            FormatAssignment::all_dense(2)
        );
    }

    #[test]
    fn inputs_only_scope_keeps_output_storage() {
        let seed = spmv();
        let siblings = FormatMutator::new(MutationScope::InputsOnly)
            .mutate(&seed, usize::MAX)
            .unwrap();
        assert_eq!(siblings.len(), 7);
        assert!(siblings
            .iter()
            .all(|k| k.tensors[0].storage_format == seed.tensors[0].storage_format));
    }

    #[test]
    fn scalar_only_kernel_has_no_siblings() {
        let seed = Kernel::from_parts(
            vec![
                TensorDescriptor::dense('a', vec![], vec![]),
                TensorDescriptor::dense('b', vec![], vec![]),
            ],
            vec![Computation::new("a() = b()")],
            vec![DataSource::Fresh, DataSource::Fresh],
        )
        .unwrap();
        assert!(FormatMutator::default().mutate(&seed, 10).unwrap().is_empty());
    }

    #[test]
    fn persist_writes_one_file_per_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let seed = spmv();
        let written = FormatMutator::default().persist(&seed, 3, dir.path()).unwrap();
        assert_eq!(written.len(), 3);
        for variant in &written {
            assert!(variant.path.exists());
            assert_eq!(Kernel::load(&variant.path).unwrap(), variant.kernel);
            assert_eq!(
                variant.path.file_name().unwrap().to_string_lossy(),
                variant.hash.file_name()
            );
        }
    }
}
