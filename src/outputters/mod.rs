//! Outputter implementations

pub mod buffered;
pub mod console;
pub mod file;
pub mod memory;
pub(crate) mod native;

pub use buffered::{LineBuffer, LineSink};
pub use console::{ConsoleOutputter, DEFAULT_CONSOLE_CAPACITY};
pub use file::{FileOutputter, FileOutputterBuilder, DEFAULT_FILE_CAPACITY};
pub use memory::MemoryOutputter;

pub use crate::core::Outputter;

/// One kibibyte, for buffer capacities
pub const KIB: usize = 1024;
/// One mebibyte, for buffer capacities
pub const MIB: usize = 1024 * KIB;
