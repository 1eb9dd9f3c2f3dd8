//! Harness configuration
//!
//! Layering, lowest to highest precedence:
//! 1. [`HarnessConfig::default`]
//! 2. an optional TOML file ([`HarnessConfig::from_toml_file`])
//! 3. `FUZZ_SEED` / `FUZZ_ITERS` ([`HarnessConfig::apply_env`])
//! 4. command-line overrides via the `with_*` builders

use crate::error::FuzzError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tensure_backend::BackendSpec;
use tensure_mutation::MutationScope;

/// Environment variable overriding the random seed
pub const ENV_SEED: &str = "FUZZ_SEED";
/// Environment variable overriding the iteration budget
pub const ENV_ITERS: &str = "FUZZ_ITERS";

/// Random kernel generator bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Smallest tensor rank
    pub min_rank: usize,
    /// Largest tensor rank
    pub max_rank: usize,
    /// Largest number of input tensors (2..=25, named `B`, `C`, ...)
    pub max_inputs: usize,
    /// Largest size of any mode
    pub max_dim: usize,
    /// Fraction of input coordinates that hold a nonzero
    pub density: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_rank: 2,
            max_rank: 3,
            max_inputs: 3,
            max_dim: 8,
            density: 0.3,
        }
    }
}

/// Complete configuration of one fuzzing campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Root holding `corpus/`, `failures/` and `data/`
    pub output_dir: PathBuf,
    /// Random seed
    pub seed: u64,
    /// Iteration budget
    pub max_iterations: u64,
    /// Format siblings generated per kernel, besides the seed
    pub variants: usize,
    /// Concurrent iterations
    pub workers: usize,
    /// Heartbeat log every N iterations
    pub heartbeat_every: u64,
    /// Wall-clock limit for one `execute_kernel` call, in seconds
    pub exec_timeout_secs: u64,
    /// Whether the output tensor's storage is mutated too
    pub mutate_output: bool,
    /// Generator bounds
    pub generator: GeneratorConfig,
    /// Trusted backend
    pub reference: Option<BackendSpec>,
    /// Backends under test
    pub candidates: Vec<BackendSpec>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("fuzz_output"),
            seed: 42,
            max_iterations: 1_000_000,
            variants: 8,
            workers: 4,
            heartbeat_every: 100,
            exec_timeout_secs: 60,
            mutate_output: true,
            generator: GeneratorConfig::default(),
            reference: None,
            candidates: Vec::new(),
        }
    }
}

impl HarnessConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys keep their defaults
    ///
    /// # Errors
    /// `FuzzError::Config` on malformed TOML or mistyped values
    pub fn from_toml_str(src: &str) -> Result<Self, FuzzError> {
        toml::from_str(src).map_err(|e| FuzzError::Config(e.to_string()))
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// `FuzzError::Io` if unreadable, `FuzzError::Config` if malformed
    pub fn from_toml_file(path: &Path) -> Result<Self, FuzzError> {
        let src = std::fs::read_to_string(path).map_err(|e| FuzzError::io(path, e))?;
        Self::from_toml_str(&src)
    }

    /// Apply `FUZZ_SEED` / `FUZZ_ITERS` from the process environment
    ///
    /// # Errors
    /// `FuzzError::Config` when a variable is set but not a number
    pub fn apply_env(self) -> Result<Self, FuzzError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    ///
    /// # Errors
    /// `FuzzError::Config` when a variable is set but not a number
    pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self, FuzzError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(seed) = parse_env(&lookup, ENV_SEED)? {
            self.seed = seed;
        }
        if let Some(iters) = parse_env(&lookup, ENV_ITERS)? {
            self.max_iterations = iters;
        }
        Ok(self)
    }

    #[inline]
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_max_iterations(mut self, max: u64) -> Self {
        self.max_iterations = max;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_variants(mut self, variants: usize) -> Self {
        self.variants = variants;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_heartbeat_every(mut self, n: u64) -> Self {
        self.heartbeat_every = n;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_exec_timeout_secs(mut self, secs: u64) -> Self {
        self.exec_timeout_secs = secs;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_mutate_output(mut self, mutate: bool) -> Self {
        self.mutate_output = mutate;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_generator(mut self, generator: GeneratorConfig) -> Self {
        self.generator = generator;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_reference(mut self, spec: BackendSpec) -> Self {
        self.reference = Some(spec);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_candidate(mut self, spec: BackendSpec) -> Self {
        self.candidates.push(spec);
        self
    }

    /// Execution deadline as a `Duration`
    #[inline]
    #[must_use]
    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }

    /// Which tensors the mutation engine may touch
    #[inline]
    #[must_use]
    pub fn mutation_scope(&self) -> MutationScope {
        if self.mutate_output {
            MutationScope::AllTensors
        } else {
            MutationScope::InputsOnly
        }
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    /// `FuzzError::Config` describing the first violated constraint
    pub fn validate(&self) -> Result<(), FuzzError> {
        let g = &self.generator;
        let fail = |msg: String| Err(FuzzError::Config(msg));
        if self.workers == 0 {
            return fail("workers must be at least 1".into());
        }
        if self.heartbeat_every == 0 {
            return fail("heartbeat_every must be at least 1".into());
        }
        if self.exec_timeout_secs == 0 {
            return fail("exec_timeout_secs must be at least 1".into());
        }
        if g.min_rank > g.max_rank {
            return fail(format!(
                "rank range {}..={} is empty",
                g.min_rank, g.max_rank
            ));
        }
        if !(2..=25).contains(&g.max_inputs) {
            return fail("generator.max_inputs must be within 2..=25".into());
        }
        if g.max_dim == 0 {
            return fail("generator.max_dim must be at least 1".into());
        }
        if !(g.density > 0.0 && g.density <= 1.0) {
            return fail(format!("generator.density {} is outside (0, 1]", g.density));
        }
        let Some(reference) = &self.reference else {
            return fail("no reference backend configured".into());
        };
        let mut names = vec![reference.name.as_str()];
        for candidate in &self.candidates {
            if names.contains(&candidate.name.as_str()) {
                return fail(format!("backend name '{}' is used twice", candidate.name));
            }
            names.push(&candidate.name);
        }
        Ok(())
    }
}

fn parse_env<F>(lookup: &F, key: &str) -> Result<Option<u64>, FuzzError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| FuzzError::Config(format!("{key}={raw:?} is not a non-negative integer"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn true_backend(name: &str) -> BackendSpec {
        BackendSpec::command(name, Vec::<String>::new(), vec!["true".to_string()])
    }

    fn with_reference() -> HarnessConfig {
        HarnessConfig::new().with_reference(true_backend("ref"))
    }

    #[test]
    fn env_fallbacks_are_fixed() {
        let config = HarnessConfig::new().apply_env_with(env(&[])).unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.max_iterations, 1_000_000);
    }

    #[test]
    fn env_overrides_file_values() {
        let config = HarnessConfig::from_toml_str("seed = 7\nmax_iterations = 10")
            .unwrap()
            .apply_env_with(env(&[(ENV_SEED, "99")]))
            .unwrap();
        assert_eq!(config.seed, 99);
        assert_eq!(config.max_iterations, 10);
    }

    #[test]
    fn unparsable_env_is_rejected() {
        let err = HarnessConfig::new()
            .apply_env_with(env(&[(ENV_ITERS, "lots")]))
            .unwrap_err();
        assert!(matches!(err, FuzzError::Config(msg) if msg.contains("FUZZ_ITERS")));
    }

    #[test]
    fn toml_reads_backends() {
        let config = HarnessConfig::from_toml_str(
            r#"
            workers = 2
            [generator]
            max_rank = 4

            [reference]
            name = "ref"
            execute = ["./ref", "{artifact}", "{out}"]

            [[candidates]]
            name = "cand"
            kind = "command"
            execute = ["./cand", "{artifact}", "{out}"]
            tolerance = 1e-3
            "#,
        )
        .unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.generator.max_rank, 4);
        assert_eq!(config.generator.min_rank, 2);
        assert_eq!(config.reference.as_ref().unwrap().kind, "command");
        assert_eq!(config.candidates[0].tolerance, Some(1e-3));
        config.validate().unwrap();
    }

    #[test]
    fn malformed_toml_is_config_error() {
        assert!(matches!(
            HarnessConfig::from_toml_str("workers = \"many\""),
            Err(FuzzError::Config(_))
        ));
    }

    #[test]
    fn validation_catches_bad_values() {
        assert!(HarnessConfig::new().validate().is_err());
        assert!(with_reference().validate().is_ok());
        assert!(with_reference().with_workers(0).validate().is_err());

        let mut config = with_reference();
        config.generator.min_rank = 5;
        assert!(config.validate().is_err());

        let dup = with_reference().with_candidate(true_backend("ref"));
        assert!(dup.validate().is_err());
    }

    #[test]
    fn scope_follows_flag() {
        assert_eq!(HarnessConfig::new().mutation_scope(), MutationScope::AllTensors);
        assert_eq!(
            HarnessConfig::new().with_mutate_output(false).mutation_scope(),
            MutationScope::InputsOnly
        );
    }
}
