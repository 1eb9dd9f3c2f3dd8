//! Tracing subscriber setup for the binary

use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Output options for [`init_logging`]
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// JSON lines on stderr instead of human-readable text
    pub json: bool,
    /// Also append plain lines to this file
    pub file: Option<PathBuf>,
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: Option<String>,
}

/// Install the global subscriber
///
/// # Errors
/// The log file cannot be opened, or a subscriber is already installed
pub fn init_logging(options: &LogOptions) -> anyhow::Result<()> {
    let default = options.default_filter.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let stderr = if options.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let file = match &options.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file))
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .try_init()?;
    Ok(())
}
