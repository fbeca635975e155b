//! Rotation policy
//!
//! Pure functions deciding where the current log bucket ends and which file a
//! bucket is written to. Both operate on the wall clock of the time zone the
//! instant carries, so a writer driven by local time rotates at local
//! midnight.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{
    DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike,
};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Suffix format for hourly buckets, e.g. `2024031214`
pub const HOURLY_SUFFIX: &str = "%Y%m%d%H";

/// Suffix format for daily buckets, e.g. `20240312`
pub const DAILY_SUFFIX: &str = "%Y%m%d";

/// Wall-clock hours probed past a boundary that falls into a DST gap
const MAX_GAP_HOURS: usize = 4;

/// How often the log file changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    /// Never rotate; write to the base path
    #[serde(alias = "never")]
    None,
    /// Rotate by accumulated size. Reserved, rejected at construction.
    #[serde(rename = "size", alias = "bysize")]
    BySize,
    /// Rotate at the start of every hour
    Hourly,
    /// Rotate at local midnight
    #[default]
    Daily,
}

impl Rotation {
    /// Whether a writer can be constructed with this rotation
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::BySize)
    }

    /// Whether this rotation ever switches files
    pub fn rotates(self) -> bool {
        matches!(self, Self::Hourly | Self::Daily)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::BySize => "size",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
        };
        f.write_str(name)
    }
}

impl FromStr for Rotation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "never" => Ok(Self::None),
            "size" | "bysize" => Ok(Self::BySize),
            "hourly" | "hour" => Ok(Self::Hourly),
            "daily" | "day" => Ok(Self::Daily),
            _ => Err(Error::UnknownRotation(s.to_string())),
        }
    }
}

impl TryFrom<u8> for Rotation {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::BySize),
            2 => Ok(Self::Hourly),
            3 => Ok(Self::Daily),
            other => Err(Error::UnknownRotation(other.to_string())),
        }
    }
}

/// Compute the instant at which the bucket containing `since` ends.
///
/// The result is strictly after `since` and expressed in the same time zone.
/// For rotations that never switch files a far-future sentinel
/// (`3000-01-01T00:00:00`) is returned, so `now < boundary` always holds.
pub fn next_boundary<Tz: TimeZone>(rotation: Rotation, since: &DateTime<Tz>) -> DateTime<Tz> {
    let local = since.naive_local();
    let wall = match rotation {
        Rotation::Hourly => {
            local.date().and_time(NaiveTime::MIN) + TimeDelta::hours(i64::from(local.hour() + 1))
        }
        Rotation::Daily => match local.date().succ_opt() {
            Some(next_day) => next_day.and_time(NaiveTime::MIN),
            None => return far_future(since),
        },
        Rotation::None | Rotation::BySize => return far_future(since),
    };

    resolve_after(&since.timezone(), wall, since)
}

/// Derive the file a bucket is written to.
///
/// Hourly buckets append `.YYYYMMDDHH`, daily buckets `.YYYYMMDD`, using the
/// wall clock of `at`. Other rotations return `base` unchanged.
pub fn real_path<Tz: TimeZone>(base: &Path, rotation: Rotation, at: &DateTime<Tz>) -> PathBuf {
    let suffix = match rotation {
        Rotation::Hourly => HOURLY_SUFFIX,
        Rotation::Daily => DAILY_SUFFIX,
        Rotation::None | Rotation::BySize => return base.to_path_buf(),
    };

    let mut path = base.as_os_str().to_owned();
    path.push(".");
    path.push(at.naive_local().format(suffix).to_string());
    PathBuf::from(path)
}

/// Map a wall-clock boundary to the first real instant after `since`.
///
/// A wall time skipped by a DST jump moves forward on the hour grid; a wall
/// time repeated by a DST fallback resolves to the earliest occurrence that
/// is still after `since`.
fn resolve_after<Tz: TimeZone>(
    tz: &Tz,
    mut wall: NaiveDateTime,
    since: &DateTime<Tz>,
) -> DateTime<Tz> {
    for _ in 0..MAX_GAP_HOURS {
        match tz.from_local_datetime(&wall) {
            LocalResult::Single(at) if at > *since => return at,
            LocalResult::Ambiguous(earliest, latest) => {
                if earliest > *since {
                    return earliest;
                }
                if latest > *since {
                    return latest;
                }
            }
            _ => {}
        }
        wall += TimeDelta::hours(1);
    }
    tz.from_utc_datetime(&wall)
}

fn far_future<Tz: TimeZone>(since: &DateTime<Tz>) -> DateTime<Tz> {
    let wall = NaiveDate::from_ymd_opt(3000, 1, 1)
        .unwrap_or(NaiveDate::MAX)
        .and_time(NaiveTime::MIN);
    let tz = since.timezone();
    tz.from_local_datetime(&wall)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&wall))
}
