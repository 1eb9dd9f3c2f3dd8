//! Lazy enumeration of format assignments
//!
//! Depth-first binary choice (`Dense` first, then `Sparse`, at every mode)
//! visits assignments in the same order as counting in binary with `Dense`
//! as 0 and the first mode as the most significant digit. The enumerator
//! keeps a single odometer and advances it in place, so callers needing only
//! the first few variants never materialize all `2^rank`.

use tensure_model::{FormatAssignment, FormatLabel};

/// Iterator over every assignment of a fixed rank
#[derive(Debug, Clone)]
pub struct FormatEnumerator {
    current: Vec<FormatLabel>,
    done: bool,
    emitted: u128,
}

impl FormatEnumerator {
    /// Start at the all-dense assignment
    #[must_use]
    pub fn new(rank: usize) -> Self {
        Self {
            current: vec![FormatLabel::Dense; rank],
            done: false,
            emitted: 0,
        }
    }

    /// Rank of produced assignments
    #[inline]
    #[must_use]
    pub fn rank(&self) -> usize {
        self.current.len()
    }

    /// Total number of assignments, when representable
    #[must_use]
    pub fn total(&self) -> Option<u128> {
        u32::try_from(self.rank())
            .ok()
            .and_then(|r| 1u128.checked_shl(r))
    }

    /// Move the odometer to the next assignment; false once exhausted
    fn advance(&mut self) -> bool {
        for label in self.current.iter_mut().rev() {
            match label {
                FormatLabel::Dense => {
                    *label = FormatLabel::Sparse;
                    return true;
                }
                FormatLabel::Sparse => *label = FormatLabel::Dense,
            }
        }
        false
    }
}

impl Iterator for FormatEnumerator {
    type Item = FormatAssignment;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = FormatAssignment::new(self.current.clone());
        self.emitted += 1;
        if !self.advance() {
            self.done = true;
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        match self
            .total()
            .and_then(|t| usize::try_from(t - self.emitted).ok())
        {
            Some(n) => (n, Some(n)),
            None => (0, None),
        }
    }
}

/// All `2^rank` assignments of length `rank` in canonical order
///
/// `rank == 0` yields exactly one empty assignment.
#[inline]
#[must_use]
pub fn enumerate_formats(rank: usize) -> FormatEnumerator {
    FormatEnumerator::new(rank)
}

/// Same length and same label at every position
#[inline]
#[must_use]
pub fn equal_formats(a: &FormatAssignment, b: &FormatAssignment) -> bool {
    a.len() == b.len()
        && a
            .labels()
            .iter()
            .zip(b.labels())
            .all(|(x, y)| x == y)
}
