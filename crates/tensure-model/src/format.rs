//! Per-mode storage format labels

use crate::error::ModelError;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Storage label for a single tensor mode
///
/// Ordering is `Dense < Sparse`, which is the canonical enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormatLabel {
    /// Mode stored as a dense array
    Dense,
    /// Mode stored compressed
    Sparse,
}

impl FormatLabel {
    /// Persisted spelling (case-sensitive)
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dense => "Dense",
            Self::Sparse => "Sparse",
        }
    }

    /// The other label
    #[inline]
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Dense => Self::Sparse,
            Self::Sparse => Self::Dense,
        }
    }
}

impl Display for FormatLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatLabel {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Dense" => Ok(Self::Dense),
            "Sparse" => Ok(Self::Sparse),
            other => Err(ModelError::UnknownFormatLabel(other.to_string())),
        }
    }
}

impl serde::Serialize for FormatLabel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for FormatLabel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Ordered per-mode labels for one tensor
///
/// Two assignments are equal iff they have the same length and the same
/// label at every position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FormatAssignment(Vec<FormatLabel>);

impl FormatAssignment {
    /// Wrap a label vector
    #[inline]
    #[must_use]
    pub fn new(labels: Vec<FormatLabel>) -> Self {
        Self(labels)
    }

    /// Every mode dense
    #[inline]
    #[must_use]
    pub fn all_dense(rank: usize) -> Self {
        Self(vec![FormatLabel::Dense; rank])
    }

    /// Every mode sparse
    #[inline]
    #[must_use]
    pub fn all_sparse(rank: usize) -> Self {
        Self(vec![FormatLabel::Sparse; rank])
    }

    /// Parse persisted label strings
    ///
    /// # Errors
    /// `ModelError::UnknownFormatLabel` on the first unrecognized string
    pub fn parse<S: AsRef<str>>(labels: &[S]) -> Result<Self, ModelError> {
        labels
            .iter()
            .map(|s| s.as_ref().parse())
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Labels in mode order
    #[inline]
    #[must_use]
    pub fn labels(&self) -> &[FormatLabel] {
        &self.0
    }

    /// Number of modes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for rank-0 tensors
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Persisted spellings in mode order
    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|l| l.as_str().to_string()).collect()
    }
}

impl From<Vec<FormatLabel>> for FormatAssignment {
    fn from(labels: Vec<FormatLabel>) -> Self {
        Self(labels)
    }
}

impl Display for FormatAssignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.to_strings().join(", "))
    }
}
