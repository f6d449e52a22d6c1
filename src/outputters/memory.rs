//! In-process outputter that records lines instead of writing them

use crate::core::{Outputter, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Keeps every line it receives in memory.
///
/// Useful for capturing output in tests and for routing log lines to an
/// in-process consumer. Lines are visible immediately; `flush` only counts
/// calls and updates [`Outputter::last_flush`].
///
/// # Example
///
/// ```
/// use segment_logger::prelude::*;
/// use std::sync::Arc;
///
/// let memory = Arc::new(MemoryOutputter::new());
/// let logger = Logger::new("app");
/// logger.add_outputter(memory.clone());
///
/// logger.info("captured");
/// assert_eq!(memory.take_lines(), vec!["captured".to_string()]);
/// assert!(memory.lines().is_empty());
/// ```
#[derive(Debug)]
pub struct MemoryOutputter {
    lines: Mutex<Vec<String>>,
    last_flush: Mutex<Instant>,
    flushes: AtomicU64,
}

impl MemoryOutputter {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
            last_flush: Mutex::new(Instant::now()),
            flushes: AtomicU64::new(0),
        }
    }

    /// Copy of all recorded lines, oldest first
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Remove and return all recorded lines
    pub fn take_lines(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }

    /// Number of `flush` calls so far
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }
}

impl Default for MemoryOutputter {
    fn default() -> Self {
        Self::new()
    }
}

impl Outputter for MemoryOutputter {
    fn output(&self, line: &str) -> Result<()> {
        self.lines.lock().push(line.to_string());
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        *self.last_flush.lock() = Instant::now();
        Ok(())
    }

    fn last_flush(&self) -> Instant {
        *self.last_flush.lock()
    }

    fn name(&self) -> &str {
        "memory"
    }
}
