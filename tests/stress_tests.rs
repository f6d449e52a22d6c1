//! Stress tests for concurrent logging
//!
//! These tests verify:
//! - Lines stay whole when many threads share one small-buffer file
//! - Configuration can change while other threads are logging
//! - Concurrent registry access hands out one logger per path

use segment_logger::outputters::FileOutputter;
use segment_logger::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

const THREADS: usize = 8;
const LINES_PER_THREAD: usize = 500;

fn tagged_line(thread: usize, seq: usize) -> String {
    // Fixed width so a merged or torn line changes the length
    format!("t{:02}-m{:05}-{}", thread, seq, "x".repeat(40))
}

#[test]
fn test_line_atomicity_under_load() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("atomicity.log");

    // Room for only a few lines, so buffers flush constantly
    let outputter = FileOutputter::builder(&path)
        .capacity(256)
        .build()
        .expect("Failed to create outputter");
    let logger = Arc::new(
        Logger::builder("stress")
            .outputter(Arc::new(outputter))
            .flush_policy(FlushPolicy::Never)
            .build(),
    );

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = Arc::clone(&logger);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for seq in 0..LINES_PER_THREAD {
                    logger.info(tagged_line(t, seq));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("logging thread panicked");
    }
    logger.flush().expect("Failed to flush");

    let content = fs::read_to_string(&path).expect("Failed to read log file");
    let expected_len = tagged_line(0, 0).len();
    let mut seen = HashSet::new();

    for line in content.lines() {
        assert_eq!(line.len(), expected_len, "torn or merged line: {:?}", line);
        assert!(seen.insert(line.to_string()), "duplicated line: {:?}", line);
    }
    assert_eq!(seen.len(), THREADS * LINES_PER_THREAD);
    assert_eq!(logger.metrics().write_failures(), 0);
}

#[test]
fn test_oversized_lines_under_load() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("oversized.log");

    // Every line exceeds the capacity and takes the direct path
    let outputter = Arc::new(
        FileOutputter::builder(&path)
            .capacity(16)
            .build()
            .expect("Failed to create outputter"),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let outputter = Arc::clone(&outputter);
            thread::spawn(move || {
                for seq in 0..100 {
                    outputter
                        .output(&tagged_line(t, seq))
                        .expect("Failed to write line");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("writer thread panicked");
    }

    let content = fs::read_to_string(&path).expect("Failed to read log file");
    let expected_len = tagged_line(0, 0).len();
    assert_eq!(content.lines().count(), THREADS * 100);
    assert!(content.lines().all(|l| l.len() == expected_len));
}

#[test]
fn test_add_outputter_while_logging() {
    let logger = Arc::new(Logger::new("hot"));
    let first = Arc::new(MemoryOutputter::new());
    logger.add_outputter(first.clone());

    let running = Arc::new(AtomicBool::new(true));
    let writers: Vec<_> = (0..4)
        .map(|t| {
            let logger = Arc::clone(&logger);
            let running = Arc::clone(&running);
            thread::spawn(move || {
                let mut sent = 0usize;
                while running.load(Ordering::Relaxed) {
                    logger.info(format!("writer {} line {}", t, sent));
                    sent += 1;
                }
                sent
            })
        })
        .collect();

    let added: Vec<Arc<MemoryOutputter>> = (0..20)
        .map(|_| {
            let extra = Arc::new(MemoryOutputter::new());
            logger.add_outputter(extra.clone());
            logger.set_flush_policy(FlushPolicy::every_n(7));
            extra
        })
        .collect();

    running.store(false, Ordering::Relaxed);
    let total: usize = writers
        .into_iter()
        .map(|h| h.join().expect("writer thread panicked"))
        .sum();

    // The first outputter was attached for the whole run
    assert_eq!(first.lines().len(), total);
    assert_eq!(logger.outputters().len(), 21);
    for extra in &added {
        assert!(extra.lines().len() <= total);
    }
    assert_eq!(logger.metrics().write_failures(), 0);
}

#[test]
fn test_concurrent_get_or_create_single_instance() {
    let registry = Arc::new(LoggerRegistry::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..50)
                    .map(|i| registry.get_or_create(&format!("svc.worker{}", i), Inheritance::Enabled))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let results: Vec<Vec<Arc<Logger>>> = handles
        .into_iter()
        .map(|h| h.join().expect("registry thread panicked"))
        .collect();

    assert_eq!(registry.len(), 50);
    for loggers in &results[1..] {
        for (a, b) in loggers.iter().zip(&results[0]) {
            assert!(Arc::ptr_eq(a, b));
        }
    }
}

#[test]
fn test_level_changes_while_logging() {
    let memory = Arc::new(MemoryOutputter::new());
    let logger = Arc::new(
        Logger::builder("flip")
            .outputter(memory.clone())
            .flush_policy(FlushPolicy::Never)
            .build(),
    );

    let writer = {
        let logger = Arc::clone(&logger);
        thread::spawn(move || {
            for i in 0..2000 {
                logger.debug(format!("debug {}", i));
                logger.error(format!("error {}", i));
            }
        })
    };

    for i in 0..200 {
        let level = if i % 2 == 0 { LogLevel::Debug } else { LogLevel::Error };
        logger.set_log_level(level);
    }
    writer.join().expect("writer thread panicked");

    // Error lines pass at every level
    let errors = memory
        .lines()
        .iter()
        .filter(|l| l.starts_with("error"))
        .count();
    assert_eq!(errors, 2000);
}
