mod config;

use std::io::{self, BufRead, Write};

use clap::Parser;
use logrotate::{Clock, RotatingWriter};
use tracing_subscriber::EnvFilter;

use crate::config::Cli;

/// Copy `input` line by line into `writer`, optionally echoing to `tee`.
///
/// Each line goes to the writer in one call so concurrent producers never
/// split it across files. Returns the number of lines copied.
fn pump<R, C, W>(mut input: R, writer: &RotatingWriter<C>, mut tee: Option<W>) -> io::Result<u64>
where
    R: BufRead,
    C: Clock,
    W: Write,
{
    let mut line = Vec::with_capacity(256);
    let mut lines = 0;
    let mut out = writer;

    loop {
        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        out.write_all(&line)?;
        if let Some(tee) = tee.as_mut() {
            tee.write_all(&line)?;
        }
        lines += 1;
    }

    if let Some(tee) = tee.as_mut() {
        tee.flush()?;
    }
    Ok(lines)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = cli.resolve()?;
    let writer = config.open_or_stderr();
    tracing::info!(
        path = %config.path.display(),
        rotation = %config.rotation,
        "Writing standard input"
    );

    let stdin = io::stdin().lock();
    let lines = if cli.tee {
        pump(stdin, &writer, Some(io::stdout().lock()))?
    } else {
        pump(stdin, &writer, None::<io::Stdout>)?
    };
    writer.flush()?;

    tracing::debug!(lines, "Input closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta};
    use logrotate::{ManualClock, Rotation};
    use tempfile::TempDir;

    #[test]
    fn test_pump_copies_lines() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("out.log");
        let writer = RotatingWriter::open(&base, Rotation::None).unwrap();

        let input = io::Cursor::new("first\nsecond\nno newline");
        let mut echoed = Vec::new();
        let lines = pump(input, &writer, Some(&mut echoed)).unwrap();

        assert_eq!(lines, 3);
        assert_eq!(std::fs::read_to_string(&base).unwrap(), "first\nsecond\nno newline");
        assert_eq!(echoed, b"first\nsecond\nno newline");
    }

    #[test]
    fn test_pump_follows_rotation() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("out.log");
        let start = DateTime::parse_from_rfc3339("2024-03-12T23:00:00+00:00").unwrap();
        let clock = ManualClock::new(start);
        let writer = RotatingWriter::with_clock(&base, Rotation::Daily, clock.clone()).unwrap();

        pump(io::Cursor::new("monday\n"), &writer, None::<Vec<u8>>).unwrap();
        clock.advance(TimeDelta::hours(2));
        pump(io::Cursor::new("tuesday\n"), &writer, None::<Vec<u8>>).unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("out.log.20240312")).unwrap(),
            "monday\n"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out.log.20240313")).unwrap(),
            "tuesday\n"
        );
    }
}
