use std::borrow::Cow;
use std::io::{self, Read, Result as IoResult, Write};

/// Fixed-capacity sink for the captured standard output of a pipeline.
///
/// Bytes beyond `capacity` are dropped silently. After a capture completes,
/// trailing `\n` and `\r` characters are stripped.
#[derive(Debug, Clone)]
pub struct CaptureBuffer {
    buf: Vec<u8>,
    capacity: usize,
}

impl CaptureBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() >= self.capacity
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// The captured bytes as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.buf)
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Reads `reader` to end of file, keeping what fits.
    ///
    /// Once the buffer is full the rest of the stream is still drained, so a
    /// writer on the other end of a pipe never blocks on a reader that stopped.
    pub(crate) fn fill_from(&mut self, mut reader: impl Read) -> IoResult<()> {
        let mut chunk = [0u8; 4096];
        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => return Ok(()),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            self.keep(&chunk[..n]);
        }
    }

    pub(crate) fn trim_line_endings(&mut self) {
        while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
            self.buf.pop();
        }
    }

    fn keep(&mut self, data: &[u8]) {
        let room = self.capacity.saturating_sub(self.buf.len());
        let take = room.min(data.len());
        self.buf.extend_from_slice(&data[..take]);
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.keep(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}
