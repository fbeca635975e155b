use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use logrotate::{RotatingFileConfig, Rotation};

#[derive(Debug, Parser)]
#[command(
    name = "logrotate",
    about = "Append standard input to log files rotated by hour or day"
)]
pub struct Cli {
    /// Base log path; rotated files get a `.YYYYMMDD[HH]` suffix
    #[arg(long)]
    pub path: Option<PathBuf>,
    /// Rotation (none, hourly, daily)
    #[arg(long)]
    pub rotation: Option<Rotation>,
    /// JSON file with `path` and `rotation`
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Also copy input to standard output
    #[arg(long)]
    pub tee: bool,
    /// Log level for diagnostics (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Merge the config file (or environment) with command-line overrides
    pub fn resolve(&self) -> anyhow::Result<RotatingFileConfig> {
        let mut config = match &self.config {
            Some(file) => {
                let raw = std::fs::read_to_string(file)
                    .with_context(|| format!("reading config {}", file.display()))?;
                serde_json::from_str::<RotatingFileConfig>(&raw)
                    .with_context(|| format!("parsing config {}", file.display()))?
            }
            None => RotatingFileConfig::from_env()?,
        };

        if let Some(path) = &self.path {
            config.path = path.clone();
        }
        if let Some(rotation) = self.rotation {
            config.rotation = rotation;
        }
        Ok(config)
    }
}
