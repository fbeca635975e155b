//! `tracing` integration
//!
//! Routes `tracing` events into a [`RotatingWriter`] through a
//! `tracing_subscriber` fmt layer. The writer implements `io::Write` for
//! shared references, so an `Arc<RotatingWriter>` is directly usable as a
//! `MakeWriter`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::Subscriber;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::writer::RotatingWriter;

/// Line format for events written to the rotating file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line format
    #[default]
    Full,
    /// One JSON object per line
    Json,
}

/// Subscriber configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriberConfig {
    /// Default level directive
    pub default_level: String,
    /// Let `RUST_LOG` override `default_level`
    pub use_env_filter: bool,
    /// Output format
    pub format: LogFormat,
    /// Include ANSI colors (full format only)
    pub ansi: bool,
    /// Include file/line information
    pub include_location: bool,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            use_env_filter: true,
            format: LogFormat::Full,
            ansi: false,
            include_location: false,
        }
    }
}

impl SubscriberConfig {
    /// JSON lines with source locations
    pub fn json() -> Self {
        Self {
            format: LogFormat::Json,
            include_location: true,
            ..Self::default()
        }
    }

    /// Set the default level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }

    fn env_filter(&self) -> EnvFilter {
        if self.use_env_filter {
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&self.default_level))
        } else {
            EnvFilter::new(&self.default_level)
        }
    }
}

/// Build a subscriber that writes events into `writer`
pub fn build_subscriber<C>(
    writer: Arc<RotatingWriter<C>>,
    config: &SubscriberConfig,
) -> Box<dyn Subscriber + Send + Sync>
where
    C: Clock + 'static,
    RotatingWriter<C>: Send + Sync,
{
    let registry = Registry::default().with(config.env_filter());

    match config.format {
        LogFormat::Full => {
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(config.ansi)
                .with_target(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_writer(writer);
            Box::new(registry.with(layer))
        }
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .flatten_event(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_writer(writer);
            Box::new(registry.with(layer))
        }
    }
}

/// Install a subscriber writing into `writer` as the global default
///
/// Fails if a global subscriber has already been set.
pub fn init<C>(writer: Arc<RotatingWriter<C>>, config: &SubscriberConfig) -> Result<()>
where
    C: Clock + 'static,
    RotatingWriter<C>: Send + Sync,
{
    tracing::subscriber::set_global_default(build_subscriber(writer, config))
        .map_err(|e| Error::Subscriber(e.to_string()))
}
