//! Structured execution status

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Result of one `execute_kernel` call
///
/// Keeps a deadline expiry distinguishable from an application exit code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ExecStatus {
    /// Exit code 0
    Ok,
    /// Backend-defined failure code; `-1` when killed by a signal
    NonZeroExit(i32),
    /// Deadline expired and the run was forcibly terminated
    TimedOut,
    /// The execution unit could not be started
    SpawnFailed(String),
}

impl ExecStatus {
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Map a raw exit code
    #[inline]
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            Self::Ok
        } else {
            Self::NonZeroExit(code)
        }
    }
}

impl Display for ExecStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::NonZeroExit(code) => write!(f, "exited with status {code}"),
            Self::TimedOut => f.write_str("timed out"),
            Self::SpawnFailed(reason) => write!(f, "failed to spawn: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_code_is_ok() {
        assert!(ExecStatus::from_code(0).is_ok());
        assert_eq!(ExecStatus::from_code(139), ExecStatus::NonZeroExit(139));
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(ExecStatus::TimedOut.to_string(), "timed out");
        assert_eq!(ExecStatus::NonZeroExit(2).to_string(), "exited with status 2");
    }
}
