//! Core logger types and traits

pub mod error;
pub mod flush_policy;
pub mod header;
pub mod log_level;
pub mod logger;
pub mod metadata;
pub mod metrics;
pub mod outputter;
pub mod registry;
pub mod segment_trie;
pub mod time_cache;

pub use error::{LoggerError, Result};
pub use flush_policy::{CounterScope, FlushFn, FlushPolicy, DEFAULT_FLUSH_THRESHOLD};
pub use header::{compose_line, HeaderFn, HeaderGenerator};
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder};
pub use metadata::LogMetadata;
pub use metrics::LoggerMetrics;
pub use outputter::Outputter;
pub use registry::{Inheritance, LoggerRegistry, ROOT_PATH};
pub use segment_trie::SegmentTrie;
pub use time_cache::{TimeFormatCache, TimeZoneMode, DEFAULT_TIME_PATTERN};
