//! Rotating file writer
//!
//! [`RotatingWriter`] appends to a file derived from a base path and switches
//! to the next file the first time a write lands past the current bucket's
//! boundary. The file handle and the boundary bookkeeping share one
//! [`RwLock`]: ordinary writes take the shared side, and only the write that
//! crosses a boundary takes the exclusive side to close the old file and open
//! the new one. The boundary is checked again under the exclusive hold, so a
//! crossing is handled by exactly one caller no matter how many race for it.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Stderr, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::DateTime;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::policy::{next_boundary, real_path, Rotation};

/// Where bytes currently go
enum Sink {
    File { file: File, path: PathBuf },
    Stderr(Stderr),
}

impl Sink {
    fn stderr() -> Self {
        Self::Stderr(io::stderr())
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::File { file, .. } => {
                let mut file: &File = file;
                file.write(buf)
            }
            Self::Stderr(stderr) => {
                let mut stderr: &Stderr = stderr;
                stderr.write(buf)
            }
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self {
            Self::File { file, .. } => {
                let mut file: &File = file;
                file.flush()
            }
            Self::Stderr(stderr) => {
                let mut stderr: &Stderr = stderr;
                stderr.flush()
            }
        }
    }

    fn path(&self) -> Option<&Path> {
        match self {
            Self::File { path, .. } => Some(path.as_path()),
            Self::Stderr(_) => None,
        }
    }

    /// Close a file sink, returning the path it pointed at. Stderr stays open.
    fn close(self) -> Option<PathBuf> {
        match self {
            Self::File { file, path } => {
                drop(file);
                Some(path)
            }
            Self::Stderr(_) => None,
        }
    }
}

/// Everything the rotation decision reads or replaces, guarded as one unit
struct State<C: Clock> {
    sink: Sink,
    rotation: Rotation,
    rotated_at: DateTime<C::Tz>,
    next_rotate_at: DateTime<C::Tz>,
}

/// Outcome of a boundary crossing, reported once the guard is released
enum Transition {
    Rotated {
        closed: Option<PathBuf>,
        opened: PathBuf,
    },
    Degraded {
        closed: Option<PathBuf>,
        path: PathBuf,
        error: io::Error,
    },
}

impl Transition {
    fn report(self) {
        match self {
            Self::Rotated { closed, opened } => {
                if let Some(closed) = closed {
                    debug!(path = %closed.display(), "Closed log file");
                }
                info!(path = %opened.display(), "Rotated log file");
            }
            Self::Degraded {
                closed,
                path,
                error,
            } => {
                if let Some(closed) = closed {
                    debug!(path = %closed.display(), "Closed log file");
                }
                warn!(
                    path = %path.display(),
                    error = %error,
                    "Rotation disabled after open failure"
                );
            }
        }
    }
}

/// An appending writer that switches files on hourly or daily boundaries
///
/// Safe to share between threads by reference or through an `Arc`;
/// [`std::io::Write`] is implemented for `&RotatingWriter` as well as for the
/// owned value.
///
/// If opening the next file fails during a rotation, the writer falls back to
/// standard error and stops rotating for the rest of its life. The write that
/// hit the failure still succeeds.
pub struct RotatingWriter<C: Clock = SystemClock> {
    base_path: PathBuf,
    clock: C,
    state: RwLock<State<C>>,
    rotations: AtomicU64,
}

impl RotatingWriter<SystemClock> {
    /// Open a writer on the system clock.
    ///
    /// Fails on an unsupported rotation, or when the log directory or the
    /// first file cannot be created.
    pub fn open(base_path: impl Into<PathBuf>, rotation: Rotation) -> Result<Self> {
        Self::with_clock(base_path, rotation, SystemClock)
    }

    /// Open a writer on the system clock, falling back to standard error.
    pub fn open_or_stderr(base_path: impl Into<PathBuf>, rotation: Rotation) -> Self {
        Self::with_clock_or_stderr(base_path, rotation, SystemClock)
    }
}

impl<C: Clock> RotatingWriter<C> {
    /// Open a writer that reads time from `clock`.
    pub fn with_clock(
        base_path: impl Into<PathBuf>,
        rotation: Rotation,
        clock: C,
    ) -> Result<Self> {
        let base_path = base_path.into();
        let state = open_state(&base_path, rotation, &clock)?;
        Ok(Self::from_state(base_path, clock, state))
    }

    /// Like [`with_clock`](Self::with_clock), but never fails.
    ///
    /// On error a diagnostic line is printed to standard error and the
    /// returned writer sends everything there, with rotation disabled.
    pub fn with_clock_or_stderr(
        base_path: impl Into<PathBuf>,
        rotation: Rotation,
        clock: C,
    ) -> Self {
        let base_path = base_path.into();
        match open_state(&base_path, rotation, &clock) {
            Ok(state) => Self::from_state(base_path, clock, state),
            Err(err) => {
                eprintln!("logrotate: {err}, writing to stderr instead");
                let now = clock.now();
                let state = State {
                    sink: Sink::stderr(),
                    rotation: Rotation::None,
                    next_rotate_at: next_boundary(Rotation::None, &now),
                    rotated_at: now,
                };
                Self::from_state(base_path, clock, state)
            }
        }
    }

    fn from_state(base_path: PathBuf, clock: C, state: State<C>) -> Self {
        Self {
            base_path,
            clock,
            state: RwLock::new(state),
            rotations: AtomicU64::new(0),
        }
    }

    /// Append `buf` to the current file, rotating first if a boundary passed.
    ///
    /// Returns the underlying write result. A failed rotation is not an error
    /// here; see the type-level docs.
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let now = {
            let state = self.state.read();
            if !state.rotation.rotates() {
                return state.sink.write(buf);
            }
            let now = self.clock.now();
            if now < state.next_rotate_at {
                return state.sink.write(buf);
            }
            now
        };

        let mut state = self.state.write();
        // Another caller may have rotated while we waited for the exclusive hold.
        if now < state.next_rotate_at {
            return state.sink.write(buf);
        }

        let transition = self.rotate(&mut state, now);
        let written = state.sink.write(buf);
        drop(state);

        transition.report();
        written
    }

    /// Flush the current sink
    pub fn flush(&self) -> io::Result<()> {
        self.state.read().sink.flush()
    }

    /// Must be called with the exclusive hold.
    fn rotate(&self, state: &mut State<C>, now: DateTime<C::Tz>) -> Transition {
        let closed = std::mem::replace(&mut state.sink, Sink::stderr()).close();
        let path = real_path(&self.base_path, state.rotation, &now);

        let transition = match open_append(&path) {
            Ok(file) => {
                state.sink = Sink::File {
                    file,
                    path: path.clone(),
                };
                Transition::Rotated {
                    closed,
                    opened: path,
                }
            }
            Err(error) => {
                eprintln!(
                    "logrotate: failed to open {}, writing to stderr instead: {error}",
                    path.display()
                );
                state.rotation = Rotation::None;
                Transition::Degraded {
                    closed,
                    path,
                    error,
                }
            }
        };

        state.next_rotate_at = next_boundary(state.rotation, &now);
        state.rotated_at = now;
        self.rotations.fetch_add(1, Ordering::Relaxed);
        transition
    }

    /// The logical path supplied at construction
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Active rotation; `None` after a failed rotation
    pub fn rotation(&self) -> Rotation {
        self.state.read().rotation
    }

    /// When the current sink was opened
    pub fn rotated_at(&self) -> DateTime<C::Tz> {
        self.state.read().rotated_at.clone()
    }

    /// First instant at which a write triggers rotation
    pub fn next_rotate_at(&self) -> DateTime<C::Tz> {
        self.state.read().next_rotate_at.clone()
    }

    /// File currently written to, or `None` when writing to standard error
    pub fn current_path(&self) -> Option<PathBuf> {
        self.state.read().sink.path().map(Path::to_path_buf)
    }

    /// Whether output currently goes to standard error
    pub fn is_stderr(&self) -> bool {
        self.state.read().sink.path().is_none()
    }

    /// Number of boundary crossings handled, including ones that degraded to stderr
    pub fn rotation_count(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }
}

impl<C: Clock> Write for &RotatingWriter<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RotatingWriter::write(*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        RotatingWriter::flush(*self)
    }
}

impl<C: Clock> Write for RotatingWriter<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RotatingWriter::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        RotatingWriter::flush(self)
    }
}

impl<C: Clock> fmt::Debug for RotatingWriter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("RotatingWriter")
            .field("base_path", &self.base_path)
            .field("current_path", &state.sink.path())
            .field("rotation", &state.rotation)
            .field("rotated_at", &state.rotated_at)
            .field("next_rotate_at", &state.next_rotate_at)
            .finish()
    }
}

fn open_state<C: Clock>(base_path: &Path, rotation: Rotation, clock: &C) -> Result<State<C>> {
    if !rotation.is_supported() {
        return Err(Error::UnsupportedRotation(rotation));
    }

    let now = clock.now();
    let path = real_path(base_path, rotation, &now);
    create_parent_dir(&path)?;

    let file = open_append(&path).map_err(|source| Error::Open {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), %rotation, "Opened log file");

    Ok(State {
        sink: Sink::File { file, path },
        rotation,
        next_rotate_at: next_boundary(rotation, &now),
        rotated_at: now,
    })
}

fn create_parent_dir(path: &Path) -> Result<()> {
    let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
        return Ok(());
    };
    if dir.is_dir() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(dir).map_err(|source| Error::CreateDirectory {
        path: dir.to_path_buf(),
        source,
    })
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
