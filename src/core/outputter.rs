//! Outputter trait for log output destinations

use super::error::Result;
use std::time::Instant;

/// A shared, thread-safe line sink.
///
/// Outputters are attached to loggers as `Arc<dyn Outputter>`; one outputter
/// may serve several loggers at once, so every method takes `&self` and
/// implementations serialize access internally. Implementations must flush
/// any buffered lines when dropped.
pub trait Outputter: Send + Sync {
    /// Accept one complete line (without trailing newline).
    fn output(&self, line: &str) -> Result<()>;

    /// Push buffered lines to the underlying handle.
    fn flush(&self) -> Result<()>;

    /// Instant of the last completed flush (or construction).
    fn last_flush(&self) -> Instant;

    fn name(&self) -> &str;
}
