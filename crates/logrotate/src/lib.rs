//! Time-rotated log files behind a thread-safe writer
//!
//! This crate provides an appending writer that switches to a new file when
//! an hourly or daily boundary passes, and is safe to share between any number
//! of threads writing at the same time.
//!
//! # Features
//!
//! - **Exactly-once rotation**: a boundary crossing closes the old file and
//!   opens the next one in a single caller, under an exclusive lock, while
//!   ordinary writes share the lock
//! - **Time-bucketed file names**: `app.log.2024031214` (hourly) or
//!   `app.log.20240312` (daily), following the wall clock of the writer's time zone
//! - **Never stops logging**: if the next file cannot be opened the writer
//!   falls back to standard error and stops rotating
//! - **tracing integration**: use the writer as a `tracing_subscriber` sink
//!
//! # Quick Start
//!
//! ```ignore
//! use logrotate::{RotatingWriter, Rotation};
//! use std::io::Write;
//!
//! let writer = RotatingWriter::open("/var/log/app/app.log", Rotation::Daily)?;
//! writeln!(&writer, "service started")?;
//! ```
//!
//! # tracing
//!
//! ```ignore
//! use std::sync::Arc;
//! use logrotate::{subscriber, RotatingWriter, Rotation, SubscriberConfig};
//!
//! let writer = Arc::new(RotatingWriter::open_or_stderr("logs/app.log", Rotation::Hourly));
//! subscriber::init(writer, &SubscriberConfig::json())?;
//!
//! tracing::info!("Logging to rotating files");
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod policy;
pub mod subscriber;
pub mod writer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RotatingFileConfig;
pub use error::{Error, Result};
pub use policy::{next_boundary, real_path, Rotation};
pub use subscriber::{LogFormat, SubscriberConfig};
pub use writer::RotatingWriter;
