//! Stress tests for concurrent writers sharing one RotatingWriter
//!
//! These tests drive many threads through the same writer while a manual clock
//! crosses rotation boundaries, and check that every line lands exactly once
//! and each boundary is handled by exactly one rotation.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;

use chrono::{DateTime, TimeDelta};
use logrotate::{ManualClock, RotatingWriter, Rotation};
use tempfile::TempDir;

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn line(thread_id: usize, i: usize) -> String {
    format!("t{thread_id:02}-{i:04}")
}

/// Many threads race across a single hourly boundary
#[test]
fn test_concurrent_writers_rotate_exactly_once() {
    const NUM_THREADS: usize = 32;
    const PER_THREAD: usize = 200;

    let dir = TempDir::new().unwrap();
    let base = dir.path().join("app.log");
    let start = DateTime::parse_from_rfc3339("2024-03-12T10:59:59+00:00").unwrap();
    let clock = ManualClock::new(start);
    let writer =
        Arc::new(RotatingWriter::with_clock(&base, Rotation::Hourly, clock.clone()).unwrap());

    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let mut handles = vec![];

    let timer = Instant::now();

    for thread_id in 0..NUM_THREADS {
        let writer = Arc::clone(&writer);
        let barrier = Arc::clone(&barrier);
        let clock = clock.clone();

        let handle = thread::spawn(move || {
            barrier.wait();

            for i in 0..PER_THREAD {
                if thread_id == 0 && i == PER_THREAD / 2 {
                    clock.advance(TimeDelta::seconds(2));
                }
                // A line must reach the writer in one call; `writeln!` splits it.
                let record = format!("{}\n", line(thread_id, i));
                assert_eq!(writer.write(record.as_bytes()).unwrap(), record.len());
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }

    println!(
        "Wrote {} lines from {} threads in {:?}",
        NUM_THREADS * PER_THREAD,
        NUM_THREADS,
        timer.elapsed()
    );

    assert_eq!(writer.rotation_count(), 1);
    assert_eq!(writer.current_path(), Some(dir.path().join("app.log.2024031211")));

    let before = read_lines(&dir.path().join("app.log.2024031210"));
    let after = read_lines(&dir.path().join("app.log.2024031211"));
    assert_eq!(before.len() + after.len(), NUM_THREADS * PER_THREAD);

    let seen: HashSet<&String> = before.iter().chain(after.iter()).collect();
    assert_eq!(seen.len(), NUM_THREADS * PER_THREAD);
    for thread_id in 0..NUM_THREADS {
        for i in 0..PER_THREAD {
            assert!(seen.contains(&line(thread_id, i)));
        }
    }

    // The writer that moved the clock wrote its second half after the boundary.
    for i in PER_THREAD / 2..PER_THREAD {
        assert!(after.contains(&line(0, i)));
    }

    // Per thread, writes never go back to the old file once they reach the new one.
    for thread_id in 0..NUM_THREADS {
        let moved = (0..PER_THREAD)
            .position(|i| after.contains(&line(thread_id, i)))
            .unwrap_or(PER_THREAD);
        for i in moved..PER_THREAD {
            assert!(!before.contains(&line(thread_id, i)));
        }
    }
}

/// Concurrent writers while the clock walks across several hours
#[test]
fn test_concurrent_writers_across_many_boundaries() {
    const NUM_THREADS: usize = 8;
    const PER_THREAD: usize = 500;
    const HOURS: usize = 5;

    let dir = TempDir::new().unwrap();
    let base = dir.path().join("svc.log");
    let start = DateTime::parse_from_rfc3339("2024-03-12T22:30:00+02:00").unwrap();
    let clock = ManualClock::new(start);
    let writer =
        Arc::new(RotatingWriter::with_clock(&base, Rotation::Hourly, clock.clone()).unwrap());

    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let mut handles = vec![];

    for thread_id in 0..NUM_THREADS {
        let writer = Arc::clone(&writer);
        let barrier = Arc::clone(&barrier);
        let clock = clock.clone();

        handles.push(thread::spawn(move || {
            barrier.wait();
            for i in 0..PER_THREAD {
                if thread_id == 0 && i > 0 && i % (PER_THREAD / HOURS) == 0 {
                    clock.advance(TimeDelta::hours(1));
                }
                writer.write(format!("{}\n", line(thread_id, i)).as_bytes()).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(writer.rotation_count(), (HOURS - 1) as u64);

    let mut files: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    files.sort();
    assert_eq!(
        files,
        vec![
            "svc.log.2024031222",
            "svc.log.2024031223",
            "svc.log.2024031300",
            "svc.log.2024031301",
            "svc.log.2024031302",
        ]
    );

    let total: usize = files
        .iter()
        .map(|name| read_lines(&dir.path().join(name)).len())
        .sum();
    assert_eq!(total, NUM_THREADS * PER_THREAD);
}

/// Concurrent writers without rotation share one file
#[test]
fn test_concurrent_writers_without_rotation() {
    const NUM_THREADS: usize = 16;
    const PER_THREAD: usize = 250;

    let dir = TempDir::new().unwrap();
    let base = dir.path().join("plain.log");
    let writer = Arc::new(RotatingWriter::open(&base, Rotation::None).unwrap());

    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let mut handles = vec![];

    for thread_id in 0..NUM_THREADS {
        let writer = Arc::clone(&writer);
        let barrier = Arc::clone(&barrier);

        handles.push(thread::spawn(move || {
            barrier.wait();
            for i in 0..PER_THREAD {
                writer.write(format!("{}\n", line(thread_id, i)).as_bytes()).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let lines = read_lines(&base);
    assert_eq!(lines.len(), NUM_THREADS * PER_THREAD);
    assert!(lines.iter().all(|l| l.len() == "t00-0000".len() && l.starts_with('t')));
    assert_eq!(writer.rotation_count(), 0);
}
