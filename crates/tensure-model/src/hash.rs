//! Content addressing for persisted kernel variants
//!
//! Siblings are named after a Blake3 hash of their JSON bytes, so two
//! siblings with identical content share a file and distinct ones never
//! collide in practice.

use std::fmt::{self, Display, Formatter};

/// Digest bytes kept in short names (16 hex chars)
const SHORT_LEN: usize = 8;

/// Blake3 hash of a kernel's persisted bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// First 16 hex characters
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..SHORT_LEN])
    }

    /// `<short>.json`, the file name of a persisted variant
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.json", self.short())
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl serde::Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_bytes_equal_hash() {
        assert_eq!(ContentHash::compute(b"{}"), ContentHash::compute(b"{}"));
        assert_ne!(ContentHash::compute(b"{}"), ContentHash::compute(b"[]"));
    }

    #[test]
    fn file_name_uses_short_prefix() {
        let h = ContentHash::compute(b"kernel");
        assert_eq!(h.short().len(), SHORT_LEN * 2);
        assert_eq!(h.short().len(), 16);
        assert!(h.to_string().starts_with(&h.short()));
        assert_eq!(h.file_name(), format!("{}.json", h.short()));
    }
}
