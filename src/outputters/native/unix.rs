use super::write_fully;
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, IoSlice, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

const FILE_MODE: u32 = 0o644;

pub(crate) struct NativeFile {
    file: File,
}

impl NativeFile {
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .mode(FILE_MODE)
            .open(path)?;
        Ok(Self { file })
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        write_fully(&mut self.file, bytes)
    }

    /// Append `line` and its newline with one gathered `writev` where the
    /// kernel accepts it whole.
    pub(crate) fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut parts = [IoSlice::new(line.as_bytes()), IoSlice::new(b"\n")];
        let mut remaining: &mut [IoSlice<'_>] = &mut parts;

        while !remaining.is_empty() {
            match self.file.write_vectored(remaining) {
                Ok(0) => {
                    return Err(io::Error::new(
                        ErrorKind::WriteZero,
                        "native write accepted zero bytes",
                    ))
                }
                Ok(n) => IoSlice::advance_slices(&mut remaining, n),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    #[cfg_attr(not(feature = "file"), allow(dead_code))]
    pub(crate) fn file(&self) -> &File {
        &self.file
    }
}
