//! Name → constructor registry
//!
//! New backend kinds are added by registering a constructor closure; the
//! orchestrator only ever sees [`BackendSpec`]s and [`BackendHandle`]s.

use crate::backend::Backend;
use crate::command::CommandBackend;
use crate::error::BackendError;
use crate::handle::BackendHandle;
use crate::spec::{BackendSpec, DEFAULT_KIND};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Constructor for one backend kind
pub type BackendFactory =
    Arc<dyn Fn(&BackendSpec) -> Result<Box<dyn Backend>, BackendError> + Send + Sync>;

/// Registry of backend constructors keyed by kind
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: BTreeMap<String, BackendFactory>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl BackendRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create registry with the built-in `command` kind
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DEFAULT_KIND, |spec| {
            Ok(Box::new(CommandBackend::from_spec(spec)?) as Box<dyn Backend>)
        });
        registry
    }

    /// Register (or replace) the constructor for `kind`
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&BackendSpec) -> Result<Box<dyn Backend>, BackendError> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds in sorted order
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Instantiate the backend described by `spec`
    ///
    /// # Errors
    /// - `UnknownKind` if no constructor is registered for `spec.kind`
    /// - whatever the constructor rejects
    pub fn create(&self, spec: &BackendSpec) -> Result<BackendHandle, BackendError> {
        let factory = self
            .factories
            .get(&spec.kind)
            .ok_or_else(|| BackendError::UnknownKind {
                kind: spec.kind.clone(),
                registered: self.kinds().join(", "),
            })?;
        let backend = factory(spec)?;
        tracing::info!(backend = %spec.name, kind = %spec.kind, "backend created");
        Ok(BackendHandle::new(spec.name.clone(), backend))
    }
}
