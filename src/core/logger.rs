//! Logger: a named bundle of level, headers, outputters and flush policy

use super::{
    error::{LoggerError, Result},
    flush_policy::FlushPolicy,
    header::{compose_line, HeaderGenerator},
    log_level::LogLevel,
    metadata::LogMetadata,
    metrics::LoggerMetrics,
    outputter::Outputter,
};
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Configuration read by every emitted message.
///
/// Held as an immutable `Arc` snapshot: emission clones the `Arc` and drops
/// the lock before doing any I/O, mutators replace the value under the write
/// lock.
#[derive(Clone, Default)]
struct LoggerSinks {
    outputters: Vec<Arc<dyn Outputter>>,
    headers: Vec<HeaderGenerator>,
    flush_policy: FlushPolicy,
}

pub struct Logger {
    name: String,
    level: AtomicU8,
    sinks: RwLock<Arc<LoggerSinks>>,
    metrics: LoggerMetrics,
}

impl Logger {
    /// Logger with default configuration: `Info`, no outputters, no headers,
    /// [`FlushPolicy::Always`].
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: AtomicU8::new(LogLevel::default().as_u8()),
            sinks: RwLock::new(Arc::new(LoggerSinks::default())),
            metrics: LoggerMetrics::new(),
        }
    }

    /// New logger named `name` holding a copy of `parent`'s current
    /// configuration. Later changes to either side are not shared.
    #[must_use]
    pub fn inherit(name: impl Into<String>, parent: &Logger) -> Self {
        let parent_sinks = parent.snapshot();
        let sinks = LoggerSinks {
            outputters: parent_sinks.outputters.clone(),
            headers: parent_sinks.headers.clone(),
            flush_policy: parent_sinks.flush_policy.fork(),
        };

        Self {
            name: name.into(),
            level: AtomicU8::new(parent.log_level().as_u8()),
            sinks: RwLock::new(Arc::new(sinks)),
            metrics: LoggerMetrics::new(),
        }
    }

    /// Create a builder for Logger
    ///
    /// # Example
    /// ```
    /// use segment_logger::prelude::*;
    /// use std::sync::Arc;
    ///
    /// let logger = Logger::builder("app")
    ///     .level(LogLevel::Debug)
    ///     .header(HeaderGenerator::Level)
    ///     .outputter(Arc::new(MemoryOutputter::new()))
    ///     .flush_policy(FlushPolicy::Never)
    ///     .build();
    /// assert_eq!(logger.log_level(), LogLevel::Debug);
    /// ```
    #[must_use]
    pub fn builder(name: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder::new(name)
    }

    /// Path this logger was created for. Immutable.
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level.as_u8() >= self.level.load(Ordering::Relaxed)
    }

    pub fn set_log_level(&self, level: LogLevel) -> &Self {
        self.level.store(level.as_u8(), Ordering::Relaxed);
        self
    }

    pub fn add_outputter(&self, outputter: Arc<dyn Outputter>) -> &Self {
        self.update(|sinks| sinks.outputters.push(outputter));
        self
    }

    pub fn add_header_generator(&self, generator: HeaderGenerator) -> &Self {
        self.update(|sinks| sinks.headers.push(generator));
        self
    }

    pub fn set_flush_policy(&self, policy: FlushPolicy) -> &Self {
        self.update(|sinks| sinks.flush_policy = policy);
        self
    }

    pub fn clear_outputters(&self) -> &Self {
        self.update(|sinks| sinks.outputters.clear());
        self
    }

    pub fn clear_header_generators(&self) -> &Self {
        self.update(|sinks| sinks.headers.clear());
        self
    }

    pub fn outputters(&self) -> Vec<Arc<dyn Outputter>> {
        self.snapshot().outputters.clone()
    }

    pub fn header_generators(&self) -> Vec<HeaderGenerator> {
        self.snapshot().headers.clone()
    }

    /// Current flush policy. Every-N counters are shared with the logger.
    pub fn flush_policy(&self) -> FlushPolicy {
        self.snapshot().flush_policy.clone()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Emit `message` at `level`.
    ///
    /// Below the configured level this is a single relaxed atomic load.
    /// Otherwise the header prefix is built and the line is handed to every
    /// outputter in registration order, each followed by one evaluation of
    /// the flush policy. Outputter failures are reported on stderr and
    /// counted in [`Logger::metrics`], never returned.
    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        if !self.is_enabled(level) {
            return;
        }

        let sinks = self.snapshot();
        let meta = LogMetadata::new(&self.name, level);
        let line = compose_line(&meta, &sinks.headers, message.as_ref());
        self.dispatch(&sinks, &line);
    }

    #[inline]
    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warn, message);
    }

    #[inline]
    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, message);
    }

    /// Flush every attached outputter, returning the first failure.
    pub fn flush(&self) -> Result<()> {
        let mut first_error = None;
        for outputter in &self.snapshot().outputters {
            if let Err(e) = outputter.flush() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn snapshot(&self) -> Arc<LoggerSinks> {
        Arc::clone(&self.sinks.read())
    }

    fn update(&self, f: impl FnOnce(&mut LoggerSinks)) {
        let mut guard = self.sinks.write();
        f(Arc::make_mut(&mut guard));
    }

    /// Hand `line` to every outputter with per-outputter panic isolation, so a
    /// single misbehaving sink cannot starve the others.
    fn dispatch(&self, sinks: &LoggerSinks, line: &str) {
        for (idx, outputter) in sinks.outputters.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| outputter.output(line))) {
                Ok(Ok(())) => {
                    self.metrics.record_written();
                }
                Ok(Err(e)) => {
                    self.report_failure(idx, outputter.as_ref(), "write", &e);
                    continue;
                }
                Err(panic_info) => {
                    self.report_panic(idx, outputter.as_ref(), "write", panic_info.as_ref());
                    continue;
                }
            }

            match catch_unwind(AssertUnwindSafe(|| sinks.flush_policy.apply(outputter))) {
                Ok(Ok(true)) => {
                    self.metrics.record_forced_flush();
                }
                Ok(Ok(false)) => {}
                Ok(Err(e)) => self.report_failure(idx, outputter.as_ref(), "flush", &e),
                Err(panic_info) => {
                    self.report_panic(idx, outputter.as_ref(), "flush", panic_info.as_ref())
                }
            }
        }
    }

    fn report_failure(&self, idx: usize, outputter: &dyn Outputter, op: &str, e: &LoggerError) {
        self.metrics.record_failure();
        eprintln!(
            "[LOGGER ERROR] Logger '{}': outputter #{} ({}) {} failed: {}",
            self.name,
            idx,
            outputter.name(),
            op,
            e
        );
    }

    fn report_panic(
        &self,
        idx: usize,
        outputter: &dyn Outputter,
        op: &str,
        panic_info: &(dyn Any + Send),
    ) {
        self.metrics.record_failure();
        eprintln!(
            "[LOGGER CRITICAL] Logger '{}': outputter #{} ({}) panicked during {}: {}. \
             Other outputters continue to function.",
            self.name,
            idx,
            outputter.name(),
            op,
            panic_message(panic_info)
        );
    }
}

fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sinks = self.snapshot();
        let outputters: Vec<&str> = sinks.outputters.iter().map(|o| o.name()).collect();
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.log_level())
            .field("outputters", &outputters)
            .field("headers", &sinks.headers)
            .field("flush_policy", &sinks.flush_policy)
            .finish()
    }
}

/// Builder for constructing Logger with a fluent API
pub struct LoggerBuilder {
    name: String,
    level: LogLevel,
    outputters: Vec<Arc<dyn Outputter>>,
    headers: Vec<HeaderGenerator>,
    flush_policy: FlushPolicy,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: LogLevel::default(),
            outputters: Vec::new(),
            headers: Vec::new(),
            flush_policy: FlushPolicy::default(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn outputter(mut self, outputter: Arc<dyn Outputter>) -> Self {
        self.outputters.push(outputter);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn header(mut self, generator: HeaderGenerator) -> Self {
        self.headers.push(generator);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.flush_policy = policy;
        self
    }

    /// Build the Logger
    pub fn build(self) -> Logger {
        let logger = Logger::new(self.name);
        logger.set_log_level(self.level);
        *logger.sinks.write() = Arc::new(LoggerSinks {
            outputters: self.outputters,
            headers: self.headers,
            flush_policy: self.flush_policy,
        });
        logger
    }
}
