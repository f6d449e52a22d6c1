//! Line-atomic write buffer shared by the console and file outputters
//!
//! A [`LineBuffer`] accumulates complete lines and hands them to its
//! [`LineSink`] in one piece. A line is never split between two sink writes:
//! if it does not fit behind the buffered lines, those are written out first;
//! if it does not fit into an empty buffer, it bypasses the buffer entirely.

use parking_lot::Mutex;
use std::io;
use std::time::Instant;

/// Destination of a [`LineBuffer`].
pub trait LineSink: Send {
    /// Append a buffer made of complete, newline-terminated lines.
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Append one line plus its newline, bypassing the buffer.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Push any buffering of the underlying handle itself.
    fn flush_handle(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct BufferState<S> {
    buffer: Vec<u8>,
    last_flush: Instant,
    sink: S,
}

impl<S: LineSink> BufferState<S> {
    /// The buffer is emptied even when the sink fails, so a broken handle
    /// cannot make it grow past its capacity.
    fn flush_buffer(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let result = self.sink.write_bytes(&self.buffer);
        self.buffer.clear();
        result?;
        self.sink.flush_handle()?;
        self.last_flush = Instant::now();
        Ok(())
    }
}

/// Capacity-bounded line buffer in front of a [`LineSink`].
///
/// # Example
///
/// ```
/// use segment_logger::outputters::{LineBuffer, LineSink};
/// use std::io;
///
/// #[derive(Default)]
/// struct Collect(Vec<u8>);
///
/// impl LineSink for Collect {
///     fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
///         self.0.extend_from_slice(bytes);
///         Ok(())
///     }
///     fn write_line(&mut self, line: &str) -> io::Result<()> {
///         self.0.extend_from_slice(line.as_bytes());
///         self.0.push(b'\n');
///         Ok(())
///     }
/// }
///
/// let buffer = LineBuffer::new(Collect::default(), 16);
/// buffer.push_line("short").unwrap();
/// assert_eq!(buffer.buffered_len(), 6);
/// buffer.flush().unwrap();
/// assert_eq!(buffer.buffered_len(), 0);
/// ```
pub struct LineBuffer<S: LineSink> {
    capacity: usize,
    state: Mutex<BufferState<S>>,
}

impl<S: LineSink> LineBuffer<S> {
    pub fn new(sink: S, capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(BufferState {
                buffer: Vec::with_capacity(capacity),
                last_flush: Instant::now(),
                sink,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently waiting in the buffer
    pub fn buffered_len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    pub fn last_flush(&self) -> Instant {
        self.state.lock().last_flush
    }

    /// Append `line` and a newline, flushing first when it would not fit.
    ///
    /// `line` is still buffered (or written directly) when that flush fails;
    /// the flush error is reported afterwards.
    pub fn push_line(&self, line: &str) -> io::Result<()> {
        let needed = line.len() + 1;
        let mut state = self.state.lock();

        let flushed = if state.buffer.len() + needed > self.capacity {
            state.flush_buffer()
        } else {
            Ok(())
        };

        if needed > self.capacity {
            state.sink.write_line(line)?;
            state.sink.flush_handle()?;
            state.last_flush = Instant::now();
            return flushed;
        }

        state.buffer.extend_from_slice(line.as_bytes());
        state.buffer.push(b'\n');
        flushed
    }

    /// Write out buffered lines. A no-op on an empty buffer.
    pub fn flush(&self) -> io::Result<()> {
        self.state.lock().flush_buffer()
    }

    /// Run `f` with exclusive access to the sink.
    pub fn with_sink<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.state.lock().sink)
    }
}

impl<S: LineSink> Drop for LineBuffer<S> {
    fn drop(&mut self) {
        if let Err(e) = self.state.get_mut().flush_buffer() {
            eprintln!("[LOGGER ERROR] Failed to flush buffered lines on drop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Records every sink call separately so tests can check line boundaries.
    #[derive(Clone, Default)]
    struct Recorder {
        writes: Arc<Mutex<Vec<Vec<u8>>>>,
        direct: Arc<Mutex<Vec<String>>>,
        fail: bool,
        // Number of upcoming writes that fail before the sink recovers
        fail_next: Arc<Mutex<usize>>,
    }

    impl Recorder {
        fn check(&self) -> io::Result<()> {
            let mut fail_next = self.fail_next.lock();
            if self.fail || *fail_next > 0 {
                *fail_next = fail_next.saturating_sub(1);
                return Err(io::Error::new(io::ErrorKind::Other, "sink down"));
            }
            Ok(())
        }
    }

    impl LineSink for Recorder {
        fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.check()?;
            self.writes.lock().push(bytes.to_vec());
            Ok(())
        }

        fn write_line(&mut self, line: &str) -> io::Result<()> {
            self.check()?;
            self.direct.lock().push(line.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_small_lines_are_buffered() {
        let sink = Recorder::default();
        let buffer = LineBuffer::new(sink.clone(), 64);

        buffer.push_line("one").unwrap();
        buffer.push_line("two").unwrap();
        assert!(sink.writes.lock().is_empty());

        buffer.flush().unwrap();
        assert_eq!(*sink.writes.lock(), vec![b"one\ntwo\n".to_vec()]);
    }

    #[test]
    fn test_overflow_flushes_before_append() {
        let sink = Recorder::default();
        let buffer = LineBuffer::new(sink.clone(), 10);

        buffer.push_line("abcd").unwrap(); // 5 bytes
        buffer.push_line("efgh").unwrap(); // 10 bytes, still fits
        buffer.push_line("ij").unwrap(); // would be 13

        assert_eq!(*sink.writes.lock(), vec![b"abcd\nefgh\n".to_vec()]);
        assert_eq!(buffer.buffered_len(), 3);
    }

    #[test]
    fn test_oversized_line_bypasses_buffer() {
        let sink = Recorder::default();
        let buffer = LineBuffer::new(sink.clone(), 8);

        buffer.push_line("ab").unwrap();
        buffer.push_line("this line is too long").unwrap();

        assert_eq!(*sink.writes.lock(), vec![b"ab\n".to_vec()]);
        assert_eq!(*sink.direct.lock(), vec!["this line is too long".to_string()]);
        assert_eq!(buffer.buffered_len(), 0);
    }

    #[test]
    fn test_exact_capacity_is_buffered() {
        let sink = Recorder::default();
        let buffer = LineBuffer::new(sink.clone(), 4);
        buffer.push_line("abc").unwrap();
        assert!(sink.direct.lock().is_empty());
        assert_eq!(buffer.buffered_len(), 4);
    }

    #[test]
    fn test_flush_empty_is_noop() {
        let sink = Recorder::default();
        let buffer = LineBuffer::new(sink.clone(), 16);
        let before = buffer.last_flush();
        buffer.flush().unwrap();
        assert!(sink.writes.lock().is_empty());
        assert_eq!(buffer.last_flush(), before);
    }

    #[test]
    fn test_flush_updates_last_flush() {
        let buffer = LineBuffer::new(Recorder::default(), 16);
        let before = buffer.last_flush();
        std::thread::sleep(std::time::Duration::from_millis(5));
        buffer.push_line("x").unwrap();
        buffer.flush().unwrap();
        assert!(buffer.last_flush() > before);
    }

    #[test]
    fn test_drop_flushes() {
        let sink = Recorder::default();
        {
            let buffer = LineBuffer::new(sink.clone(), 64);
            buffer.push_line("pending").unwrap();
        }
        assert_eq!(*sink.writes.lock(), vec![b"pending\n".to_vec()]);
    }

    #[test]
    fn test_failed_flush_empties_buffer() {
        let sink = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let buffer = LineBuffer::new(sink, 64);
        buffer.push_line("lost").unwrap();
        assert!(buffer.flush().is_err());
        assert_eq!(buffer.buffered_len(), 0);
    }

    #[test]
    fn test_failed_overflow_flush_keeps_incoming_line() {
        let sink = Recorder::default();
        let buffer = LineBuffer::new(sink.clone(), 8);

        buffer.push_line("abc").unwrap();
        *sink.fail_next.lock() = 1;
        assert!(buffer.push_line("defg").is_err());
        assert_eq!(buffer.buffered_len(), 5);

        buffer.flush().unwrap();
        assert_eq!(*sink.writes.lock(), vec![b"defg\n".to_vec()]);
    }

    #[test]
    fn test_failed_overflow_flush_still_writes_oversized_line() {
        let sink = Recorder::default();
        let buffer = LineBuffer::new(sink.clone(), 8);

        buffer.push_line("abc").unwrap();
        *sink.fail_next.lock() = 1;
        assert!(buffer.push_line("much longer than eight").is_err());
        assert_eq!(*sink.direct.lock(), vec!["much longer than eight".to_string()]);
        assert_eq!(buffer.buffered_len(), 0);
    }
}
