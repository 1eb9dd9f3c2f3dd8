//! Single-equation parsing and validation

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

/// Reasons an equation is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EquationError {
    /// Zero or several `=` signs
    #[error("expected exactly one '=', found {count}")]
    MissingEquals { count: usize },

    /// One side of the assignment is empty
    #[error("{side} side of the equation is empty")]
    EmptySide { side: Side },

    /// A term is not `Name(i,j,...)`
    #[error("invalid tensor term '{term}': {reason}")]
    InvalidTensorSyntax { term: String, reason: &'static str },

    /// An operand repeats an index (trace within one operand)
    #[error("index '{index}' repeated in operand {tensor}")]
    RepeatedIndexInTensor { tensor: String, index: char },

    /// Output index with no input dimension to draw from
    #[error("output index '{index}' does not appear on the right-hand side")]
    UnboundOutputIndex { index: char },

    /// Output repeats an index
    #[error("output index '{index}' is repeated")]
    RepeatedOutputIndex { index: char },
}

/// Side of an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

/// `Name(i,j,...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorTerm {
    pub name: String,
    pub idxs: Vec<char>,
}

impl TensorTerm {
    fn parse(term: &str) -> Result<Self, EquationError> {
        let invalid = |reason| EquationError::InvalidTensorSyntax {
            term: term.to_string(),
            reason,
        };

        let open = term.find('(').ok_or_else(|| invalid("missing '('"))?;
        let name = &term[..open];
        if name.is_empty() {
            return Err(invalid("missing tensor name"));
        }
        if name.contains(')') {
            return Err(invalid("unexpected ')' in tensor name"));
        }

        let rest = &term[open + 1..];
        let content = rest
            .strip_suffix(')')
            .ok_or_else(|| invalid("missing closing ')'"))?;
        if content.contains('(') || content.contains(')') {
            return Err(invalid("unbalanced parentheses"));
        }

        let idxs = if content.is_empty() {
            Vec::new()
        } else {
            content
                .split(',')
                .map(|token| {
                    let mut chars = token.chars();
                    match (chars.next(), chars.next()) {
                        (Some(c), None) => Ok(c),
                        _ => Err(invalid("indices must be single characters")),
                    }
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            name: name.to_string(),
            idxs,
        })
    }

    /// First index appearing twice, if any
    fn repeated_index(&self) -> Option<char> {
        let mut seen = BTreeSet::new();
        self.idxs.iter().copied().find(|c| !seen.insert(*c))
    }
}

impl Display for TensorTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let idxs: Vec<String> = self.idxs.iter().map(ToString::to_string).collect();
        write!(f, "{}({})", self.name, idxs.join(","))
    }
}

/// A validated einsum assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equation {
    pub output: TensorTerm,
    pub operands: Vec<TensorTerm>,
}

impl Equation {
    /// Parse and validate an equation
    ///
    /// Whitespace is ignored anywhere in the string.
    ///
    /// # Errors
    /// The first [`EquationError`] in checking order: `=` count, empty sides,
    /// term syntax (left then right), operand repeats, unbound output
    /// indices, output repeats
    pub fn parse(equation: &str) -> Result<Self, EquationError> {
        let compact: String = equation.chars().filter(|c| !c.is_whitespace()).collect();

        let count = compact.matches('=').count();
        if count != 1 {
            return Err(EquationError::MissingEquals { count });
        }
        let (lhs, rhs) = compact
            .split_once('=')
            .ok_or(EquationError::MissingEquals { count })?;
        if lhs.is_empty() {
            return Err(EquationError::EmptySide { side: Side::Left });
        }
        if rhs.is_empty() {
            return Err(EquationError::EmptySide { side: Side::Right });
        }

        let output = TensorTerm::parse(lhs)?;
        let operands = rhs
            .split('*')
            .map(TensorTerm::parse)
            .collect::<Result<Vec<_>, _>>()?;

        for operand in &operands {
            if let Some(index) = operand.repeated_index() {
                return Err(EquationError::RepeatedIndexInTensor {
                    tensor: operand.name.clone(),
                    index,
                });
            }
        }

        let bound: BTreeSet<char> = operands.iter().flat_map(|t| t.idxs.iter().copied()).collect();
        if let Some(&index) = output.idxs.iter().find(|c| !bound.contains(c)) {
            return Err(EquationError::UnboundOutputIndex { index });
        }

        if let Some(index) = output.repeated_index() {
            return Err(EquationError::RepeatedOutputIndex { index });
        }

        Ok(Self { output, operands })
    }

    /// Every index variable, output first, in first-appearance order
    #[must_use]
    pub fn indices(&self) -> Vec<char> {
        let mut seen = BTreeSet::new();
        std::iter::once(&self.output)
            .chain(&self.operands)
            .flat_map(|t| t.idxs.iter().copied())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Indices summed over (on the right but not in the output)
    #[must_use]
    pub fn contracted_indices(&self) -> Vec<char> {
        self.indices()
            .into_iter()
            .filter(|c| !self.output.idxs.contains(c))
            .collect()
    }
}

impl Display for Equation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let operands: Vec<String> = self.operands.iter().map(ToString::to_string).collect();
        write!(f, "{} = {}", self.output, operands.join(" * "))
    }
}

/// Accept or reject one equation
///
/// Pure apart from a debug diagnostic on rejection.
///
/// # Errors
/// See [`Equation::parse`]
pub fn validate(equation: &str) -> Result<(), EquationError> {
    match Equation::parse(equation) {
        Ok(_) => Ok(()),
        Err(e) => {
            tracing::debug!(equation, reason = %e, "equation rejected");
            Err(e)
        }
    }
}
