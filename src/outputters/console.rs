//! Console outputter implementation

use super::buffered::{LineBuffer, LineSink};
use super::KIB;
use crate::core::{LoggerError, Outputter, Result};
use std::io::{self, Write};
use std::time::Instant;

/// Default buffer capacity of [`ConsoleOutputter`]
pub const DEFAULT_CONSOLE_CAPACITY: usize = 4 * KIB;

struct StdoutSink;

impl LineSink for StdoutSink {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        io::stdout().lock().write_all(bytes)
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")
    }

    fn flush_handle(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// Buffered outputter writing to the process's standard output.
///
/// # Example
///
/// ```
/// use segment_logger::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::new("app");
/// logger.add_outputter(Arc::new(ConsoleOutputter::new()));
/// logger.info("hello from the console");
/// ```
pub struct ConsoleOutputter {
    buffer: LineBuffer<StdoutSink>,
}

impl ConsoleOutputter {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CONSOLE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: LineBuffer::new(StdoutSink, capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }
}

impl Default for ConsoleOutputter {
    fn default() -> Self {
        Self::new()
    }
}

impl Outputter for ConsoleOutputter {
    fn output(&self, line: &str) -> Result<()> {
        self.buffer
            .push_line(line)
            .map_err(|e| LoggerError::io_operation("writing to stdout", "line not written", e))
    }

    fn flush(&self) -> Result<()> {
        self.buffer
            .flush()
            .map_err(|e| LoggerError::io_operation("flushing stdout", "buffered lines lost", e))
    }

    fn last_flush(&self) -> Instant {
        self.buffer.last_flush()
    }

    fn name(&self) -> &str {
        "console"
    }
}
