//! # Segment Logger
//!
//! A hierarchical logger registry with buffered, thread-safe output sinks.
//!
//! ## Features
//!
//! - **Hierarchical**: loggers live at dot-delimited paths and can copy their
//!   configuration from the nearest registered ancestor
//! - **Line Atomic**: buffered outputters never split a line across writes
//! - **Flush Policies**: never, always, time threshold, every N writes, custom
//! - **Cheap Headers**: time prefixes are rendered once per second per thread
//!
//! ## Example
//!
//! ```
//! use segment_logger::prelude::*;
//! use std::sync::Arc;
//!
//! let registry = LoggerRegistry::new();
//! let memory = Arc::new(MemoryOutputter::new());
//!
//! registry
//!     .default_logger()
//!     .add_header_generator(HeaderGenerator::Level)
//!     .add_outputter(memory.clone());
//!
//! let logger = registry.get_or_create("app.http", Inheritance::Enabled);
//! segment_logger::info!(logger, "listening on port {}", 8080);
//!
//! assert_eq!(memory.lines(), vec!["[INFO] listening on port 8080".to_string()]);
//! ```

pub mod config;
pub mod core;
pub mod macros;
pub mod outputters;

pub mod prelude {
    pub use crate::config::RegistryConfig;
    pub use crate::core::{
        CounterScope, FlushPolicy, HeaderGenerator, Inheritance, LogLevel, LogMetadata, Logger,
        LoggerBuilder, LoggerError, LoggerMetrics, LoggerRegistry, Outputter, Result,
        TimeZoneMode,
    };
    pub use crate::outputters::{ConsoleOutputter, FileOutputter, MemoryOutputter};
}

pub use config::RegistryConfig;
pub use core::{
    CounterScope, FlushPolicy, HeaderFn, HeaderGenerator, Inheritance, LogLevel, LogMetadata,
    Logger, LoggerBuilder, LoggerError, LoggerMetrics, LoggerRegistry, Outputter, Result,
    SegmentTrie, TimeFormatCache, TimeZoneMode,
};
pub use outputters::{ConsoleOutputter, FileOutputter, MemoryOutputter};
