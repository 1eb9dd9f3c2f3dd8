//! Graceful termination
//!
//! A [`ShutdownToken`] is threaded through the loop instead of a global
//! flag. Interrupt signals set it once; the loop finishes in-flight
//! iterations and stops dispatching new ones.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable, set-once termination flag
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request termination; returns `true` only for the first request
    pub fn trigger(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    #[inline]
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Set `token` when SIGINT or SIGTERM arrives
///
/// Both signals are treated identically. Returns after the first one.
pub async fn listen_for_signals(token: ShutdownToken) {
    let signal_name = wait_for_signal().await;
    if token.trigger() {
        tracing::warn!(signal = signal_name, "signal received, stopping after in-flight iterations");
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, listening for SIGINT only");
            return match tokio::signal::ctrl_c().await {
                Ok(()) => "SIGINT",
                Err(_) => std::future::pending().await,
            };
        }
    };
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => "SIGINT",
            Err(_) => {
                term.recv().await;
                "SIGTERM"
            }
        },
        _ = term.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "SIGINT",
        Err(_) => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_is_set_once() {
        let token = ShutdownToken::new();
        let clone = token.clone();
        assert!(!clone.is_triggered());
        assert!(token.trigger());
        assert!(!clone.trigger());
        assert!(clone.is_triggered());
    }
}
