//! `.mtx` Matrix Market triplets

use super::{parse_coordinate, parse_value, record, OutputParser};
use crate::error::CompareError;
use tensure_model::TensorData;

/// `%` comments, a `rows cols nnz` header, then `row col value` lines
///
/// The header is only checked for having at least three fields. Body lines
/// with fewer than three fields are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatrixMarketParser;

impl OutputParser for MatrixMarketParser {
    fn extensions(&self) -> &[&str] {
        &["mtx"]
    }

    fn parse_into(&self, content: &str, table: &mut TensorData) -> Result<(), CompareError> {
        let mut header_seen = false;
        for (n, line) in content.lines().enumerate() {
            let line_no = n + 1;
            if line.starts_with('%') {
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if !header_seen {
                if tokens.is_empty() {
                    continue;
                }
                if tokens.len() < 3 {
                    return Err(CompareError::MalformedHeader { line: line_no });
                }
                header_seen = true;
                continue;
            }
            if tokens.len() < 3 {
                continue;
            }
            let row = parse_coordinate(tokens[0], line_no)?;
            let col = parse_coordinate(tokens[1], line_no)?;
            let value = parse_value(tokens[2], line_no)?;
            record(table, vec![row, col], value, line_no);
        }
        Ok(())
    }
}
