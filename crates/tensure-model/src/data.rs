//! Sparse coordinate tables
//!
//! [`TensorData`] maps integer coordinate tuples to values. Iteration follows
//! first-insertion order so files written from a table are reproducible.

use crate::error::ModelError;
use crate::persist::write_atomic_with;
use indexmap::IndexMap;
use std::io::Write;
use std::path::Path;

/// Coordinate tuple, one entry per mode
pub type Coordinate = Vec<i64>;

/// Coordinate → value table for one tensor
///
/// Zeros are stored if inserted; dropping explicit zeros is a loader rule,
/// not a property of the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TensorData {
    entries: IndexMap<Coordinate, f64>,
}

impl TensorData {
    /// Empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the value at `coord`
    ///
    /// Returns the previous value when the coordinate was already present.
    pub fn insert(&mut self, coord: Coordinate, value: f64) -> Option<f64> {
        self.entries.insert(coord, value)
    }

    /// Value at `coord`
    #[inline]
    #[must_use]
    pub fn get(&self, coord: &[i64]) -> Option<f64> {
        self.entries.get(coord).copied()
    }

    /// Number of stored coordinates
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries in first-insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Coordinate, f64)> {
        self.entries.iter().map(|(c, v)| (c, *v))
    }

    /// Write as a `.tns` coordinate list (`c0 c1 ... value` per line)
    ///
    /// # Errors
    /// `ScalarData` if any coordinate is empty (nothing is written), otherwise
    /// IO failures from the atomic write
    pub fn write_tns(&self, path: &Path) -> Result<(), ModelError> {
        if self.entries.keys().any(Vec::is_empty) {
            return Err(ModelError::ScalarData {
                path: path.to_path_buf(),
            });
        }
        write_atomic_with(path, |w| {
            for (coord, value) in &self.entries {
                for c in coord {
                    write!(w, "{c} ")?;
                }
                writeln!(w, "{value}")?;
            }
            Ok(())
        })
    }
}

impl FromIterator<(Coordinate, f64)> for TensorData {
    fn from_iter<I: IntoIterator<Item = (Coordinate, f64)>>(iter: I) -> Self {
        let mut data = Self::new();
        for (coord, value) in iter {
            data.insert(coord, value);
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_overwrites_existing_coordinate() {
        let mut data = TensorData::new();
        assert_eq!(data.insert(vec![0, 1], 1.0), None);
        assert_eq!(data.insert(vec![0, 1], 2.5), Some(1.0));
        assert_eq!(data.len(), 1);
        assert_eq!(data.get(&[0, 1]), Some(2.5));
    }

    #[test]
    fn insert_appends_new_coordinate() {
        let mut data = TensorData::new();
        data.insert(vec![1], 1.0);
        data.insert(vec![0], 2.0);
        let order: Vec<_> = data.iter().map(|(c, _)| c.clone()).collect();
        assert_eq!(order, vec![vec![1], vec![0]]);
    }

    #[test]
    fn zeros_are_kept_by_the_table() {
        let mut data = TensorData::new();
        data.insert(vec![0, 0], 0.0);
        assert_eq!(data.len(), 1);
        data.clear();
        assert!(data.is_empty());
    }

    #[test]
    fn write_tns_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("B.tns");
        let data: TensorData = vec![(vec![1, 2], 0.5), (vec![3, 1], 2.0)]
            .into_iter()
            .collect();
        data.write_tns(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "1 2 0.5\n3 1 2\n");
    }

    #[test]
    fn scalar_data_is_refused_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.tns");
        let data: TensorData = std::iter::once((vec![], 3.0)).collect();
        let err = data.write_tns(&path).unwrap_err();
        assert!(matches!(err, ModelError::ScalarData { .. }));
        assert!(!path.exists());
    }
}
