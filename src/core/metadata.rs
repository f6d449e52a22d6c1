//! Per-call log metadata handed to header generators

use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::thread::{self, ThreadId};

// Thread-local cache for the printable thread label to avoid repeated allocations
thread_local! {
    static THREAD_LABEL_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn current_thread_label() -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}

/// Run `f` with the calling thread's label: its name if it has one,
/// otherwise its debug-formatted id.
///
/// `id` must be the calling thread's id. Once the thread's storage is torn
/// down the label falls back to that id alone.
pub fn with_thread_label<R>(id: ThreadId, mut f: impl FnMut(&str) -> R) -> R {
    let cached = THREAD_LABEL_CACHE.try_with(|cache| {
        cache
            .try_borrow_mut()
            .ok()
            .map(|mut cache| f(cache.get_or_insert_with(current_thread_label).as_str()))
    });
    match cached {
        Ok(Some(result)) => result,
        _ => f(&format!("{:?}", id)),
    }
}

/// Metadata captured once per emitted message.
///
/// The timestamp and thread are captured at construction, i.e. on the
/// emitting thread at the moment the level check passed.
#[derive(Debug, Clone)]
pub struct LogMetadata<'a> {
    pub logger_name: &'a str,
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    pub thread_id: ThreadId,
}

impl<'a> LogMetadata<'a> {
    pub fn new(logger_name: &'a str, level: LogLevel) -> Self {
        Self {
            logger_name,
            level,
            timestamp: Utc::now(),
            thread_id: thread::current().id(),
        }
    }

    /// Override the captured timestamp, mostly useful for deterministic tests.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_current_thread() {
        let meta = LogMetadata::new("app", LogLevel::Warn);
        assert_eq!(meta.thread_id, thread::current().id());
        assert_eq!(meta.logger_name, "app");
        assert_eq!(meta.level, LogLevel::Warn);
    }

    #[test]
    fn test_named_thread_label() {
        let label = thread::Builder::new()
            .name("worker-7".to_string())
            .spawn(|| with_thread_label(thread::current().id(), |l| l.to_string()))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(label, "worker-7");
    }

    #[test]
    fn test_unnamed_thread_label_is_cached() {
        let (first, second) = thread::spawn(|| {
            let id = thread::current().id();
            let a = with_thread_label(id, |l| l.to_string());
            let b = with_thread_label(id, |l| l.to_string());
            (a, b)
        })
        .join()
        .unwrap();
        assert!(first.starts_with("ThreadId("));
        assert_eq!(first, second);
    }
}
