//! Output parsers for the supported coordinate formats
//!
//! Parsers are dispatched by file extension:
//! - `.tns`, `.ttx`: coordinate lists ([`CoordinateListParser`])
//! - `.mtx`: Matrix Market triplets ([`MatrixMarketParser`])
//!
//! Every parser shares the same loading rules: records whose value is exactly
//! `0.0` are dropped, and a repeated coordinate overwrites the earlier one.

use crate::error::CompareError;
use std::path::Path;
use tensure_model::{Coordinate, TensorData};

mod coord;
mod mtx;

pub use coord::CoordinateListParser;
pub use mtx::MatrixMarketParser;

/// Parses one textual output format into a coordinate table
///
/// Implement this trait to support a new output format.
pub trait OutputParser: Send + Sync + 'static {
    /// Supported file extensions (without dot)
    fn extensions(&self) -> &[&str];

    /// Append every record of `content` to `table`
    fn parse_into(&self, content: &str, table: &mut TensorData) -> Result<(), CompareError>;

    /// Parse `content` into a fresh table
    fn parse(&self, content: &str) -> Result<TensorData, CompareError> {
        let mut table = TensorData::new();
        self.parse_into(content, &mut table)?;
        Ok(table)
    }

    /// Check if this parser can handle the given path
    fn can_parse(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions().contains(&ext))
            .unwrap_or(false)
    }
}

/// Extension-keyed parser lookup
pub struct ParserRegistry {
    parsers: Vec<Box<dyn OutputParser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        default_parsers()
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("extensions", &self.all_extensions())
            .finish()
    }
}

impl ParserRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Register a parser; later registrations do not shadow earlier ones
    pub fn register<P: OutputParser>(&mut self, parser: P) {
        self.parsers.push(Box::new(parser));
    }

    /// Find parser for path
    #[must_use]
    pub fn find_for_path(&self, path: &Path) -> Option<&dyn OutputParser> {
        self.parsers.iter().find(|p| p.can_parse(path)).map(|p| &**p)
    }

    /// True when some parser accepts `path`
    #[inline]
    #[must_use]
    pub fn supports(&self, path: &Path) -> bool {
        self.find_for_path(path).is_some()
    }

    /// Get all registered extensions
    #[must_use]
    pub fn all_extensions(&self) -> Vec<&str> {
        self.parsers
            .iter()
            .flat_map(|p| p.extensions())
            .copied()
            .collect()
    }

    /// Read and parse the file at `path`
    ///
    /// # Errors
    /// - `UnsupportedFormat` for unknown extensions (checked before any IO)
    /// - `NotFound` / `Io` when the file cannot be read
    /// - `InFile` wrapping the parse failure otherwise
    pub fn load(&self, path: &Path) -> Result<TensorData, CompareError> {
        let parser = self
            .find_for_path(path)
            .ok_or_else(|| CompareError::UnsupportedFormat {
                path: path.to_path_buf(),
            })?;
        let content = std::fs::read_to_string(path).map_err(|e| CompareError::io(path, e))?;
        let table = parser.parse(&content).map_err(|e| e.in_file(path))?;
        tracing::trace!(path = %path.display(), records = table.len(), "output loaded");
        Ok(table)
    }
}

/// Create default parser registry with built-in parsers
#[inline]
#[must_use]
pub fn default_parsers() -> ParserRegistry {
    let mut registry = ParserRegistry::empty();
    registry.register(CoordinateListParser);
    registry.register(MatrixMarketParser);
    registry
}

/// Load one output file with the built-in parsers
///
/// # Errors
/// See [`ParserRegistry::load`]
pub fn load_output(path: &Path) -> Result<TensorData, CompareError> {
    default_parsers().load(path)
}

fn parse_coordinate(token: &str, line: usize) -> Result<i64, CompareError> {
    token.parse().map_err(|_| CompareError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}

fn parse_value(token: &str, line: usize) -> Result<f64, CompareError> {
    token.parse().map_err(|_| CompareError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}

/// Apply the shared loading rules to one parsed record
fn record(table: &mut TensorData, coord: Coordinate, value: f64, line: usize) {
    if value == 0.0 {
        return;
    }
    if let Some(previous) = table.insert(coord, value) {
        tracing::debug!(line, previous, value, "duplicate coordinate, later record wins");
    }
}
