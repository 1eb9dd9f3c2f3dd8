//! Backend configuration as read from the harness config file

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Registry kind used when a spec does not name one
pub const DEFAULT_KIND: &str = "command";

/// Declarative description of one backend instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSpec {
    /// Instance name; must be unique within a run
    pub name: String,
    /// Registry key selecting the constructor
    #[serde(default = "default_kind")]
    pub kind: String,
    /// argv template run once per kernel file during generation
    #[serde(default)]
    pub generate: Vec<String>,
    /// argv template run once per artifact during execution
    #[serde(default)]
    pub execute: Vec<String>,
    /// Comparator tolerance override
    #[serde(default)]
    pub tolerance: Option<f64>,
    /// Extra environment for spawned processes
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_kind() -> String {
    DEFAULT_KIND.to_string()
}

impl BackendSpec {
    /// Spec for `kind` with no templates
    #[must_use]
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            generate: Vec::new(),
            execute: Vec::new(),
            tolerance: None,
            env: BTreeMap::new(),
        }
    }

    /// Command backend running the given templates
    #[must_use]
    pub fn command<S: Into<String>>(
        name: impl Into<String>,
        generate: impl IntoIterator<Item = S>,
        execute: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            generate: generate.into_iter().map(Into::into).collect(),
            execute: execute.into_iter().map(Into::into).collect(),
            ..Self::new(name, DEFAULT_KIND)
        }
    }

    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}
