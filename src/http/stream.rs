//! Body streams for [`Message`](crate::http::message::Message).
//!
//! Streams are an external concern: decorators (lazy open, size caps,
//! inflating, ...) live outside this crate and only need to implement
//! [`Stream`]. The crate itself ships [`BufferStream`], an in-memory stream
//! used for empty bodies and for bodies extracted by the
//! [`parser`](crate::http::parser).
//!
//! A [`Body`] is a shared handle: cloning a message clones the handle, not the
//! bytes, so every holder sees the same read/seek position.

use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("stream I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("body stream lock poisoned")]
    Poisoned,
}

/// Minimal byte source a message body is built on.
///
/// `read`, `write` and `seek` come from the std I/O traits; `tell`, `eof` and
/// `size` complete the contract.
pub trait Stream: Read + Write + Seek + Send {
    fn tell(&mut self) -> io::Result<u64> {
        self.stream_position()
    }

    fn eof(&mut self) -> io::Result<bool>;

    /// Total size in bytes, when known.
    fn size(&self) -> Option<u64>;
}

#[derive(Debug, Default, Clone)]
pub struct BufferStream {
    inner: Cursor<Vec<u8>>,
}

impl BufferStream {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: Cursor::new(bytes.into()),
        }
    }
}

impl Read for BufferStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for BufferStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for BufferStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl Stream for BufferStream {
    fn eof(&mut self) -> io::Result<bool> {
        Ok(self.inner.position() >= self.inner.get_ref().len() as u64)
    }

    fn size(&self) -> Option<u64> {
        Some(self.inner.get_ref().len() as u64)
    }
}

/// Shared handle to a message body stream.
#[derive(Clone)]
pub struct Body {
    stream: Arc<Mutex<dyn Stream>>,
}

impl Body {
    pub fn new(stream: impl Stream + 'static) -> Self {
        Self {
            stream: Arc::new(Mutex::new(stream)),
        }
    }

    pub fn empty() -> Self {
        Self::new(BufferStream::default())
    }

    /// Grants exclusive access to the underlying stream.
    pub fn lock(&self) -> Result<MutexGuard<'_, dyn Stream + 'static>, StreamError> {
        self.stream.lock().map_err(|_| StreamError::Poisoned)
    }

    pub fn size(&self) -> Result<Option<u64>, StreamError> {
        Ok(self.lock()?.size())
    }

    /// Reads from the current position until EOF, or until `max_len` bytes
    /// have been read.
    pub fn read_to_end(&self, max_len: Option<u64>) -> Result<Vec<u8>, StreamError> {
        let mut stream = self.lock()?;
        let mut buf = Vec::new();
        match max_len {
            Some(limit) => {
                (&mut *stream).take(limit).read_to_end(&mut buf)?;
            }
            None => {
                stream.read_to_end(&mut buf)?;
            }
        }
        Ok(buf)
    }

    /// Rewinds the stream when it is not already at the start, then reads it
    /// entirely.
    pub fn contents(&self) -> Result<Vec<u8>, StreamError> {
        let mut stream = self.lock()?;
        if stream.tell()? != 0 {
            stream.rewind()?;
        }
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Lossy UTF-8 view of [`Body::contents`].
    pub fn to_string_lossy(&self) -> Result<String, StreamError> {
        Ok(String::from_utf8_lossy(&self.contents()?).into_owned())
    }

    /// Whether both handles point at the same stream.
    pub fn ptr_eq(&self, other: &Body) -> bool {
        Arc::ptr_eq(&self.stream, &other.stream)
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.stream.lock().ok().and_then(|s| s.size());
        f.debug_struct("Body").field("size", &size).finish()
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(BufferStream::new(bytes))
    }
}

impl From<&[u8]> for Body {
    fn from(bytes: &[u8]) -> Self {
        Self::new(BufferStream::new(bytes))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self::new(BufferStream::new(s))
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Self::new(BufferStream::new(s))
    }
}
