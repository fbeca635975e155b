//! Configuration types for rotating file output

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::policy::Rotation;
use crate::writer::RotatingWriter;

/// Environment variable naming the base log path
pub const PATH_ENV: &str = "LOGROTATE_PATH";

/// Environment variable naming the rotation (`none`, `hourly`, `daily`)
pub const ROTATION_ENV: &str = "LOGROTATE_ROTATION";

/// Rotating file output configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotatingFileConfig {
    /// Base path; rotated files get a timestamp suffix appended
    pub path: PathBuf,
    /// Rotation granularity
    pub rotation: Rotation,
}

impl Default for RotatingFileConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./logs/app.log"),
            rotation: Rotation::Daily,
        }
    }
}

impl RotatingFileConfig {
    /// Create a config writing under `path` with daily rotation
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the rotation
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Create config from environment variables, falling back to defaults
    ///
    /// An unrecognized `LOGROTATE_ROTATION` is a configuration error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = lookup(PATH_ENV).filter(|p| !p.is_empty()) {
            config.path = PathBuf::from(path);
        }
        if let Some(rotation) = lookup(ROTATION_ENV).filter(|r| !r.is_empty()) {
            config.rotation = rotation.parse()?;
        }
        Ok(config)
    }

    /// Open a writer for this config
    pub fn open(&self) -> Result<RotatingWriter> {
        RotatingWriter::open(&self.path, self.rotation)
    }

    /// Open a writer for this config, falling back to standard error
    pub fn open_or_stderr(&self) -> RotatingWriter {
        RotatingWriter::open_or_stderr(&self.path, self.rotation)
    }
}
