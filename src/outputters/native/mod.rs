//! Platform file primitives behind one narrow interface
//!
//! `NativeFile` offers open (append + create), whole-buffer append, single
//! line append and access to the raw handle. Everything above this module is
//! platform independent.

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub(crate) use unix::NativeFile;

#[cfg(not(unix))]
mod generic;
#[cfg(not(unix))]
pub(crate) use generic::NativeFile;

use std::io::{self, ErrorKind, Write};

/// `write_all` with the retry rules shared by every platform: `Interrupted`
/// is retried, partial writes are completed and a zero-byte write is an error.
fn write_fully<W: Write>(writer: &mut W, mut bytes: &[u8]) -> io::Result<()> {
    while !bytes.is_empty() {
        match writer.write(bytes) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "native write accepted zero bytes",
                ))
            }
            Ok(n) => bytes = &bytes[n..],
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
