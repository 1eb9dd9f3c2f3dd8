//! Backend errors
//!
//! Failures of a backend *run* (non-zero exit, timeout) are not errors here;
//! they are reported through [`crate::ExecStatus`]. These variants cover
//! loading, configuring and addressing backends.

/// Errors raised by the backend layer
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No constructor registered under this kind
    #[error("unknown backend kind '{kind}' (registered: {registered})")]
    UnknownKind { kind: String, registered: String },

    /// Spec is not usable by the selected constructor
    #[error("invalid spec for backend '{backend}': {reason}")]
    InvalidSpec { backend: String, reason: String },

    /// Operation attempted after the handle was destroyed
    #[error("backend '{0}' has been destroyed")]
    Destroyed(String),
}

impl BackendError {
    /// True for configuration problems detected before any run
    #[inline]
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::UnknownKind { .. } | Self::InvalidSpec { .. })
    }
}
