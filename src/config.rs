//! Declarative registry configuration
//!
//! A JSON document names a set of outputters and configures loggers by path:
//!
//! ```json
//! {
//!   "outputters": {
//!     "main": { "kind": "file", "path": "/var/log/app.log", "capacity": 65536 },
//!     "console": { "kind": "console" }
//!   },
//!   "loggers": {
//!     "": { "level": "info", "outputters": ["console"], "headers": [{ "kind": "level" }] },
//!     "app.db": {
//!       "inherit": true,
//!       "level": "debug",
//!       "outputters": ["main"],
//!       "flush": { "kind": "every_n", "n": 100 }
//!     }
//!   }
//! }
//! ```
//!
//! Loggers are configured in ascending path order, so an ancestor is always
//! configured before the loggers that inherit from it. Every outputter named
//! in the document is created once and shared by all loggers referencing it.

use crate::core::{
    CounterScope, FlushPolicy, HeaderGenerator, Inheritance, LogLevel, Logger, LoggerError,
    LoggerRegistry, Outputter, Result, TimeZoneMode, DEFAULT_FLUSH_THRESHOLD,
    DEFAULT_TIME_PATTERN,
};
use crate::outputters::{ConsoleOutputter, FileOutputter, MemoryOutputter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Outputters built from a configuration, by name
pub type NamedOutputters = BTreeMap<String, Arc<dyn Outputter>>;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Outputter definitions, by name
    pub outputters: BTreeMap<String, OutputterSpec>,
    /// Logger settings, by path
    pub loggers: BTreeMap<String, LoggerSpec>,
}

/// Outputter definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputterSpec {
    Console {
        #[serde(default)]
        capacity: Option<usize>,
    },
    File {
        path: PathBuf,
        #[serde(default)]
        capacity: Option<usize>,
        #[serde(default)]
        exclusive_lock: bool,
    },
    Memory,
}

/// Settings applied to the logger at one path.
///
/// Absent fields leave the logger's current (possibly inherited) value alone.
/// `outputters` and `headers` replace the current lists when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerSpec {
    /// Copy configuration from the nearest configured ancestor on creation
    pub inherit: bool,
    pub level: Option<LogLevel>,
    /// Names from [`RegistryConfig::outputters`]
    pub outputters: Option<Vec<String>>,
    pub headers: Option<Vec<HeaderSpec>>,
    pub flush: Option<FlushSpec>,
}

/// Header generator definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeaderSpec {
    Level,
    #[cfg(feature = "console")]
    ColoredLevel,
    LoggerName,
    ThreadId,
    Time {
        #[serde(default)]
        zone: TimeZoneMode,
        #[serde(default = "default_time_pattern")]
        pattern: String,
    },
}

fn default_time_pattern() -> String {
    DEFAULT_TIME_PATTERN.to_string()
}

impl From<&HeaderSpec> for HeaderGenerator {
    fn from(spec: &HeaderSpec) -> Self {
        match spec {
            HeaderSpec::Level => HeaderGenerator::Level,
            #[cfg(feature = "console")]
            HeaderSpec::ColoredLevel => HeaderGenerator::ColoredLevel,
            HeaderSpec::LoggerName => HeaderGenerator::LoggerName,
            HeaderSpec::ThreadId => HeaderGenerator::ThreadId,
            HeaderSpec::Time { zone, pattern } => HeaderGenerator::time_with(*zone, pattern.clone()),
        }
    }
}

/// Flush policy definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlushSpec {
    Never,
    Always,
    TimeThreshold {
        #[serde(default = "default_threshold_millis")]
        millis: u64,
    },
    EveryN {
        n: u64,
        #[serde(default)]
        scope: CounterScope,
    },
}

fn default_threshold_millis() -> u64 {
    DEFAULT_FLUSH_THRESHOLD.as_millis() as u64
}

impl FlushSpec {
    pub fn to_policy(self) -> Result<FlushPolicy> {
        Ok(match self {
            FlushSpec::Never => FlushPolicy::Never,
            FlushSpec::Always => FlushPolicy::Always,
            FlushSpec::TimeThreshold { millis } => {
                FlushPolicy::TimeThreshold(Duration::from_millis(millis))
            }
            FlushSpec::EveryN { n: 0, .. } => {
                return Err(LoggerError::config("flush", "every_n requires n >= 1"))
            }
            FlushSpec::EveryN { n, scope } => FlushPolicy::every_n_scoped(n, scope),
        })
    }
}

impl OutputterSpec {
    /// Create the outputter. File outputters open their file here.
    pub fn build(&self) -> Result<Arc<dyn Outputter>> {
        let outputter: Arc<dyn Outputter> = match self {
            OutputterSpec::Console { capacity } => Arc::new(match capacity {
                Some(bytes) => ConsoleOutputter::with_capacity(*bytes),
                None => ConsoleOutputter::new(),
            }),
            OutputterSpec::File {
                path,
                capacity,
                exclusive_lock,
            } => {
                let mut builder = FileOutputter::builder(path);
                if let Some(bytes) = capacity {
                    builder = builder.capacity(*bytes);
                }
                #[cfg(feature = "file")]
                {
                    builder = builder.exclusive_lock(*exclusive_lock);
                }
                #[cfg(not(feature = "file"))]
                if *exclusive_lock {
                    return Err(LoggerError::config(
                        "outputters",
                        "exclusive_lock requires the `file` feature",
                    ));
                }
                Arc::new(builder.build()?)
            }
            OutputterSpec::Memory => Arc::new(MemoryOutputter::new()),
        };
        Ok(outputter)
    }
}

impl LoggerSpec {
    fn configure(&self, logger: &Logger, outputters: &NamedOutputters) -> Result<()> {
        if let Some(level) = self.level {
            logger.set_log_level(level);
        }
        if let Some(names) = &self.outputters {
            logger.clear_outputters();
            for name in names {
                logger.add_outputter(lookup(outputters, name)?);
            }
        }
        if let Some(headers) = &self.headers {
            logger.clear_header_generators();
            for header in headers {
                logger.add_header_generator(header.into());
            }
        }
        if let Some(flush) = self.flush {
            logger.set_flush_policy(flush.to_policy()?);
        }
        Ok(())
    }
}

fn lookup(outputters: &NamedOutputters, name: &str) -> Result<Arc<dyn Outputter>> {
    outputters
        .get(name)
        .cloned()
        .ok_or_else(|| LoggerError::config("outputters", format!("unknown outputter '{}'", name)))
}

impl RegistryConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation("reading configuration", path.display().to_string(), e)
        })?;
        Self::from_json_str(&json)
    }

    /// Create every outputter named in the configuration.
    pub fn build_outputters(&self) -> Result<NamedOutputters> {
        self.outputters
            .iter()
            .map(|(name, spec)| Ok((name.clone(), spec.build()?)))
            .collect()
    }

    /// Build the outputters and configure `registry`.
    pub fn apply(&self, registry: &LoggerRegistry) -> Result<()> {
        let outputters = self.build_outputters()?;
        self.apply_with_outputters(registry, &outputters)
    }

    /// Configure `registry` using already-built outputters.
    ///
    /// Outputter references and flush specs are checked before any logger is
    /// touched, so an invalid configuration leaves the registry unchanged.
    pub fn apply_with_outputters(
        &self,
        registry: &LoggerRegistry,
        outputters: &NamedOutputters,
    ) -> Result<()> {
        self.validate(outputters)?;

        for (path, spec) in &self.loggers {
            let logger = registry.get_or_create(path, Inheritance::from(spec.inherit));
            spec.configure(&logger, outputters)?;
        }
        Ok(())
    }

    fn validate(&self, outputters: &NamedOutputters) -> Result<()> {
        for spec in self.loggers.values() {
            for name in spec.outputters.iter().flatten() {
                lookup(outputters, name)?;
            }
            if let Some(flush) = spec.flush {
                flush.to_policy()?;
            }
        }
        Ok(())
    }
}
