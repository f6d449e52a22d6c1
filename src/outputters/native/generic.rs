use super::write_fully;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

pub(crate) struct NativeFile {
    file: File,
}

impl NativeFile {
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        write_fully(&mut self.file, bytes)
    }

    /// No gathered write here: the line and its newline are copied into one
    /// buffer and appended with a single call.
    pub(crate) fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        write_fully(&mut self.file, &buf)
    }

    #[cfg_attr(not(feature = "file"), allow(dead_code))]
    pub(crate) fn file(&self) -> &File {
        &self.file
    }
}
