//! `.tns` / `.ttx` coordinate lists

use super::{parse_coordinate, parse_value, record, OutputParser};
use crate::error::CompareError;
use tensure_model::TensorData;

/// Whitespace-separated `c0 c1 ... value` lines
///
/// Lines with fewer than two tokens are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateListParser;

impl OutputParser for CoordinateListParser {
    fn extensions(&self) -> &[&str] {
        &["tns", "ttx"]
    }

    fn parse_into(&self, content: &str, table: &mut TensorData) -> Result<(), CompareError> {
        for (n, line) in content.lines().enumerate() {
            let line_no = n + 1;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let Some((value, coords)) = tokens.split_last() else {
                continue;
            };
            if coords.is_empty() {
                continue;
            }
            let value = parse_value(value, line_no)?;
            let coord = coords
                .iter()
                .map(|t| parse_coordinate(t, line_no))
                .collect::<Result<Vec<_>, _>>()?;
            record(table, coord, value, line_no);
        }
        Ok(())
    }
}
