//! Header generators
//!
//! A header generator produces one fragment of the line prefix. Every
//! fragment is written as `[fragment] `, in registration order, in front of
//! the message body.

use super::metadata::{with_thread_label, LogMetadata};
use super::time_cache::{with_thread_cache, TimeZoneMode, DEFAULT_TIME_PATTERN};
use std::fmt;
use std::sync::Arc;

/// User supplied header closure.
///
/// Closures are shared between threads and between loggers that inherit
/// them, so they should not capture mutable state.
pub type HeaderFn = Arc<dyn Fn(&LogMetadata<'_>) -> String + Send + Sync>;

/// One fragment of a log line prefix.
///
/// # Example
///
/// ```
/// use segment_logger::{HeaderGenerator, TimeZoneMode};
///
/// let headers = vec![
///     HeaderGenerator::time_with(TimeZoneMode::Utc, "%H:%M:%S"),
///     HeaderGenerator::Level,
///     HeaderGenerator::custom(|meta| format!("pid={}", std::process::id())),
/// ];
/// assert_eq!(headers.len(), 3);
/// ```
#[derive(Clone)]
pub enum HeaderGenerator {
    /// Severity name, e.g. `WARN`
    Level,
    /// Severity name wrapped in ANSI color codes
    #[cfg(feature = "console")]
    ColoredLevel,
    /// Name (path) of the emitting logger
    LoggerName,
    /// Name of the emitting thread, or its id when unnamed
    ThreadId,
    /// Timestamp rendered through the per-thread [`TimeFormatCache`](super::TimeFormatCache)
    Time { zone: TimeZoneMode, pattern: String },
    /// Arbitrary closure
    Custom(HeaderFn),
}

impl HeaderGenerator {
    /// Local time with the default ISO 8601 pattern.
    #[must_use]
    pub fn time() -> Self {
        Self::time_with(TimeZoneMode::Local, DEFAULT_TIME_PATTERN)
    }

    /// Timestamp in `zone` using a strftime-compatible `pattern`.
    #[must_use]
    pub fn time_with(zone: TimeZoneMode, pattern: impl Into<String>) -> Self {
        HeaderGenerator::Time {
            zone,
            pattern: pattern.into(),
        }
    }

    #[must_use]
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&LogMetadata<'_>) -> String + Send + Sync + 'static,
    {
        HeaderGenerator::Custom(Arc::new(f))
    }

    /// Append this generator's fragment (without brackets) to `buf`.
    pub fn write_fragment(&self, meta: &LogMetadata<'_>, buf: &mut String) {
        match self {
            HeaderGenerator::Level => buf.push_str(meta.level.to_str()),
            #[cfg(feature = "console")]
            HeaderGenerator::ColoredLevel => {
                use colored::Colorize;
                let colored = meta.level.to_str().color(meta.level.color_code());
                buf.push_str(&colored.to_string());
            }
            HeaderGenerator::LoggerName => buf.push_str(meta.logger_name),
            HeaderGenerator::ThreadId => {
                with_thread_label(meta.thread_id, |label| buf.push_str(label))
            }
            HeaderGenerator::Time { zone, pattern } => with_thread_cache(|cache| {
                buf.push_str(cache.render(*zone, pattern, &meta.timestamp));
            }),
            HeaderGenerator::Custom(f) => buf.push_str(&f(meta)),
        }
    }

    /// Render this generator's fragment into a fresh string.
    pub fn render(&self, meta: &LogMetadata<'_>) -> String {
        let mut out = String::new();
        self.write_fragment(meta, &mut out);
        out
    }
}

impl fmt::Debug for HeaderGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderGenerator::Level => write!(f, "Level"),
            #[cfg(feature = "console")]
            HeaderGenerator::ColoredLevel => write!(f, "ColoredLevel"),
            HeaderGenerator::LoggerName => write!(f, "LoggerName"),
            HeaderGenerator::ThreadId => write!(f, "ThreadId"),
            HeaderGenerator::Time { zone, pattern } => f
                .debug_struct("Time")
                .field("zone", zone)
                .field("pattern", pattern)
                .finish(),
            HeaderGenerator::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Build `[h1] [h2] ... message` for one emitted record.
pub fn compose_line(meta: &LogMetadata<'_>, headers: &[HeaderGenerator], message: &str) -> String {
    // Rough guess: timestamps and levels are short, most messages are too
    const AVG_HEADER_LEN: usize = 32;
    const HEADER_OVERHEAD: usize = 3;

    let mut line =
        String::with_capacity(headers.len() * (AVG_HEADER_LEN + HEADER_OVERHEAD) + message.len());
    for header in headers {
        line.push('[');
        header.write_fragment(meta, &mut line);
        line.push_str("] ");
    }
    line.push_str(message);
    line
}
