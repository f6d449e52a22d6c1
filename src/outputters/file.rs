//! File outputter implementation

use super::buffered::{LineBuffer, LineSink};
use super::native::NativeFile;
use super::KIB;
use crate::core::{LoggerError, Outputter, Result};
#[cfg(feature = "file")]
use fs2::FileExt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Default buffer capacity of [`FileOutputter`]
pub const DEFAULT_FILE_CAPACITY: usize = 64 * KIB;

struct FileSink {
    file: NativeFile,
    #[cfg(feature = "file")]
    exclusive_lock: bool,
}

impl FileSink {
    /// Run one native write, holding the advisory lock around it when enabled.
    fn locked<R>(&mut self, write: impl FnOnce(&mut NativeFile) -> io::Result<R>) -> io::Result<R> {
        #[cfg(feature = "file")]
        if self.exclusive_lock {
            FileExt::lock_exclusive(self.file.file())?;
            let result = write(&mut self.file);
            let unlocked = FileExt::unlock(self.file.file());
            let value = result?;
            unlocked?;
            return Ok(value);
        }

        write(&mut self.file)
    }
}

impl LineSink for FileSink {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.locked(|file| file.write_bytes(bytes))
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.locked(|file| file.write_line(line))
    }
}

/// Buffered, append-only file outputter.
///
/// The file is opened (and created if needed) at construction; failing to
/// open it is an error returned to the caller. Lines are buffered up to the
/// configured capacity and always reach the file whole.
///
/// # Example
///
/// ```no_run
/// use segment_logger::prelude::*;
/// use segment_logger::outputters::MIB;
/// use std::sync::Arc;
///
/// let file = FileOutputter::builder("/var/log/app.log")
///     .capacity(MIB)
///     .build()
///     .unwrap();
///
/// let logger = Logger::new("app");
/// logger
///     .add_outputter(Arc::new(file))
///     .set_flush_policy(FlushPolicy::time_threshold());
/// ```
pub struct FileOutputter {
    path: PathBuf,
    buffer: LineBuffer<FileSink>,
}

impl FileOutputter {
    /// Open `path` for appending with the default capacity.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Self::builder(path).build()
    }

    #[must_use]
    pub fn builder(path: impl Into<PathBuf>) -> FileOutputterBuilder {
        FileOutputterBuilder::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Bytes accepted but not yet written to the file
    pub fn buffered_len(&self) -> usize {
        self.buffer.buffered_len()
    }

    fn io_error(&self, operation: &str, e: io::Error) -> LoggerError {
        LoggerError::io_operation(operation, self.path.display().to_string(), e)
    }
}

impl Outputter for FileOutputter {
    fn output(&self, line: &str) -> Result<()> {
        self.buffer
            .push_line(line)
            .map_err(|e| self.io_error("writing log line", e))
    }

    fn flush(&self) -> Result<()> {
        self.buffer
            .flush()
            .map_err(|e| self.io_error("flushing log file", e))
    }

    fn last_flush(&self) -> Instant {
        self.buffer.last_flush()
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Builder for [`FileOutputter`]
#[derive(Debug, Clone)]
pub struct FileOutputterBuilder {
    path: PathBuf,
    capacity: usize,
    #[cfg(feature = "file")]
    exclusive_lock: bool,
}

impl FileOutputterBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            capacity: DEFAULT_FILE_CAPACITY,
            #[cfg(feature = "file")]
            exclusive_lock: false,
        }
    }

    /// Buffer capacity in bytes. Lines longer than this are written directly.
    #[must_use = "builder methods return a new value"]
    pub fn capacity(mut self, bytes: usize) -> Self {
        self.capacity = bytes;
        self
    }

    /// Hold an exclusive advisory lock on the file during every write, so
    /// processes sharing the file cannot interleave their buffers.
    #[cfg(feature = "file")]
    #[must_use = "builder methods return a new value"]
    pub fn exclusive_lock(mut self, enabled: bool) -> Self {
        self.exclusive_lock = enabled;
        self
    }

    /// Open the file and build the outputter.
    pub fn build(self) -> Result<FileOutputter> {
        let file = NativeFile::open(&self.path).map_err(|e| {
            let mut message = format!("Failed to open for appending: {}", e);
            if self.path.exists() {
                message.push_str(" (insufficient access rights)");
            }
            LoggerError::file_outputter(self.path.display().to_string(), message)
        })?;

        let sink = FileSink {
            file,
            #[cfg(feature = "file")]
            exclusive_lock: self.exclusive_lock,
        };

        Ok(FileOutputter {
            buffer: LineBuffer::new(sink, self.capacity),
            path: self.path,
        })
    }
}
