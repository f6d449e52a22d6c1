//! Path-keyed logger registry
//!
//! Loggers are addressed by dot-delimited paths (`"app.db.pool"`); the empty
//! path is the root/default logger. The registry is an ordinary value owned by
//! the application: construct it at startup, hand out `&LoggerRegistry` or
//! `Arc<LoggerRegistry>`, and call [`LoggerRegistry::shutdown`] on exit.
//!
//! All operations take one registry-wide lock. They are expected to run once
//! per component at startup; the logging hot path only touches the returned
//! `Arc<Logger>`.

use super::error::Result;
use super::logger::Logger;
use super::outputter::Outputter;
use super::segment_trie::SegmentTrie;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Path of the root/default logger
pub const ROOT_PATH: &str = "";

/// Whether [`LoggerRegistry::get_or_create`] copies configuration from the
/// nearest registered ancestor when `path` is not registered yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Inheritance {
    Enabled,
    #[default]
    Disabled,
}

impl From<bool> for Inheritance {
    fn from(enabled: bool) -> Self {
        if enabled {
            Inheritance::Enabled
        } else {
            Inheritance::Disabled
        }
    }
}

/// Hierarchical logger registry
///
/// # Example
///
/// ```
/// use segment_logger::prelude::*;
/// use std::sync::Arc;
///
/// let registry = LoggerRegistry::new();
/// let memory = Arc::new(MemoryOutputter::new());
///
/// registry
///     .get_or_create("app", Inheritance::Disabled)
///     .set_log_level(LogLevel::Warn)
///     .add_outputter(memory.clone());
///
/// // Copies "app"'s configuration at creation time
/// let db = registry.get_or_create("app.db", Inheritance::Enabled);
/// assert_eq!(db.log_level(), LogLevel::Warn);
///
/// db.warn("pool exhausted");
/// assert_eq!(memory.lines(), vec!["pool exhausted".to_string()]);
///
/// registry.shutdown().unwrap();
/// ```
pub struct LoggerRegistry {
    loggers: Mutex<SegmentTrie<Arc<Logger>>>,
}

impl LoggerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            loggers: Mutex::new(SegmentTrie::new()),
        }
    }

    /// Return the logger registered at exactly `path`, or create one.
    ///
    /// With [`Inheritance::Enabled`] a new logger copies the level, headers,
    /// outputters and flush policy of the deepest registered ancestor
    /// (falling back to the root logger, then to defaults). The copy is a
    /// snapshot: later changes to the ancestor are not propagated.
    pub fn get_or_create(&self, path: &str, inherit: Inheritance) -> Arc<Logger> {
        let mut loggers = self.loggers.lock();
        if let Some(existing) = loggers.get(path) {
            return Arc::clone(existing);
        }

        let parent = match inherit {
            Inheritance::Enabled => loggers.find_by_longest_prefix(path),
            Inheritance::Disabled => None,
        };
        let logger = Arc::new(match parent {
            Some(parent) => Logger::inherit(path, parent),
            None => Logger::new(path),
        });

        loggers.insert(path, Arc::clone(&logger));
        logger
    }

    /// The root logger at [`ROOT_PATH`], created with defaults on first use.
    pub fn default_logger(&self) -> Arc<Logger> {
        self.get_or_create(ROOT_PATH, Inheritance::Disabled)
    }

    /// Exact lookup without creation
    pub fn get(&self, path: &str) -> Option<Arc<Logger>> {
        self.loggers.lock().get(path).cloned()
    }

    /// Place `logger` at `path`, replacing any logger registered there.
    ///
    /// Returns the replaced logger. The inserted logger keeps its own name.
    pub fn insert(&self, path: &str, logger: Arc<Logger>) -> Option<Arc<Logger>> {
        self.loggers.lock().insert(path, logger)
    }

    /// Detach the logger at `path` and prune now-empty ancestor nodes.
    ///
    /// Handles already given out keep working; later lookups of `path` no
    /// longer see the removed logger.
    pub fn remove(&self, path: &str) -> Option<Arc<Logger>> {
        self.loggers.lock().remove(path)
    }

    /// Deepest registered logger on `path` (the path itself included).
    pub fn find_by_longest_prefix(&self, path: &str) -> Option<Arc<Logger>> {
        self.loggers.lock().find_by_longest_prefix(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.loggers.lock().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.loggers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.lock().is_empty()
    }

    /// Snapshot of all registered loggers, sorted by path.
    pub fn loggers(&self) -> Vec<(String, Arc<Logger>)> {
        let mut all: Vec<(String, Arc<Logger>)> = self
            .loggers
            .lock()
            .entries()
            .into_iter()
            .map(|(path, logger)| (path, Arc::clone(logger)))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Flush every distinct outputter attached to any registered logger.
    ///
    /// Outputters shared by several loggers are flushed once. All outputters
    /// are attempted; the first failure is returned.
    pub fn flush_all(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let mut first_error = None;

        for (_, logger) in self.loggers() {
            for outputter in logger.outputters() {
                if !seen.insert(outputter_key(&outputter)) {
                    continue;
                }
                if let Err(e) = outputter.flush() {
                    eprintln!(
                        "[LOGGER ERROR] Failed to flush outputter '{}' of logger '{}': {}",
                        outputter.name(),
                        logger.name(),
                        e
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Flush everything, then unregister all loggers.
    pub fn shutdown(&self) -> Result<()> {
        let result = self.flush_all();
        self.loggers.lock().clear();
        result
    }
}

fn outputter_key(outputter: &Arc<dyn Outputter>) -> usize {
    Arc::as_ptr(outputter) as *const () as usize
}

impl Default for LoggerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LoggerRegistry {
    fn drop(&mut self) {
        if self.is_empty() {
            return;
        }
        if let Err(e) = self.flush_all() {
            eprintln!("[LOGGER ERROR] Failed to flush during shutdown: {}", e);
        }
    }
}

impl fmt::Debug for LoggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paths: Vec<String> = self.loggers().into_iter().map(|(path, _)| path).collect();
        f.debug_struct("LoggerRegistry").field("paths", &paths).finish()
    }
}
