//! Message body streams
//!
//! This module provides the stream abstraction that backs every message
//! body. The [`Stream`] trait is the capability contract, [`HandleStream`]
//! adapts any `Read + Write + Seek` handle to it, and [`Body`] is the shared
//! handle stored in messages.
//!
//! A body is shared between a message and its copies, the same way two
//! messages built around one file handle would observe the same cursor.

use super::{Error, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

/// Stream metadata
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamMetadata {
    pub readable: bool,
    pub writable: bool,
    pub seekable: bool,
    /// Location of the underlying resource, if it has one
    pub uri: Option<String>,
}

/// Byte stream capability
///
/// Once [`Stream::detach`] has been called, every operation except
/// [`Stream::to_bytes`] and [`Stream::close`] fails with [`Error::Detached`].
pub trait Stream: Send {
    /// Read up to `len` bytes from the current position
    fn read(&mut self, len: usize) -> Result<Vec<u8>>;

    /// Write bytes at the current position, returning the count written
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Move the cursor
    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;

    /// Current cursor position
    fn tell(&mut self) -> Result<u64>;

    /// Whether the last read hit the end of the stream
    fn eof(&self) -> bool;

    /// Total size in bytes, if known
    fn size(&mut self) -> Option<u64>;

    /// Read everything from the current position to the end
    fn contents(&mut self) -> Result<Vec<u8>>;

    /// Release the underlying resource
    fn close(&mut self);

    /// Separate the underlying resource from the stream
    fn detach(&mut self) -> Option<Box<dyn Any + Send>>;

    fn metadata(&self) -> StreamMetadata;

    /// Read the whole stream from the start.
    ///
    /// Never fails: a detached or unreadable stream yields no bytes.
    fn to_bytes(&mut self) -> Vec<u8> {
        if self.seek(SeekFrom::Start(0)).is_err() {
            return Vec::new();
        }
        self.contents().unwrap_or_default()
    }
}

/// Stream over a `Read + Write + Seek` handle
pub struct HandleStream<H> {
    handle: Option<H>,
    eof: bool,
    metadata: StreamMetadata,
}

/// Stream held entirely in memory
pub type MemoryStream = HandleStream<Cursor<Vec<u8>>>;

impl<H: Read + Write + Seek + Send + 'static> HandleStream<H> {
    /// Wrap a readable, writable and seekable handle
    pub fn new(handle: H) -> Self {
        HandleStream {
            handle: Some(handle),
            eof: false,
            metadata: StreamMetadata {
                readable: true,
                writable: true,
                seekable: true,
                uri: None,
            },
        }
    }

    fn handle(&mut self) -> Result<&mut H> {
        self.handle.as_mut().ok_or(Error::Detached)
    }

    /// Take the underlying handle back, leaving the stream detached
    pub fn into_inner(mut self) -> Option<H> {
        self.handle.take()
    }
}

impl MemoryStream {
    /// Create an in-memory stream positioned at the start of `data`
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        HandleStream::new(Cursor::new(data.into()))
    }

    /// Create an empty in-memory stream
    pub fn empty() -> Self {
        Self::from_bytes(Vec::new())
    }
}

impl HandleStream<File> {
    /// Open a file for reading
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut stream = HandleStream::new(File::open(path)?);
        stream.metadata.writable = false;
        stream.metadata.uri = Some(path.display().to_string());
        Ok(stream)
    }
}

impl<H: Read + Write + Seek + Send + 'static> Stream for HandleStream<H> {
    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        let handle = self.handle()?;
        let mut buf = Vec::with_capacity(len);
        let read = Read::take(handle, len as u64).read_to_end(&mut buf)?;
        self.eof = read < len;
        Ok(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        if !self.metadata.writable {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "stream is not writable",
            )));
        }
        let handle = self.handle()?;
        handle.write_all(data)?;
        Ok(data.len())
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let offset = self.handle()?.seek(pos)?;
        self.eof = false;
        Ok(offset)
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.handle()?.stream_position()?)
    }

    fn eof(&self) -> bool {
        self.handle.is_none() || self.eof
    }

    fn size(&mut self) -> Option<u64> {
        let handle = self.handle.as_mut()?;
        let current = handle.stream_position().ok()?;
        let end = handle.seek(SeekFrom::End(0)).ok()?;
        handle.seek(SeekFrom::Start(current)).ok()?;
        Some(end)
    }

    fn contents(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.handle()?.read_to_end(&mut buf)?;
        self.eof = true;
        Ok(buf)
    }

    fn close(&mut self) {
        self.handle = None;
    }

    fn detach(&mut self) -> Option<Box<dyn Any + Send>> {
        self.eof = false;
        self.handle
            .take()
            .map(|handle| Box::new(handle) as Box<dyn Any + Send>)
    }

    fn metadata(&self) -> StreamMetadata {
        if self.handle.is_none() {
            return StreamMetadata::default();
        }
        self.metadata.clone()
    }
}

impl<H> fmt::Debug for HandleStream<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleStream")
            .field("detached", &self.handle.is_none())
            .field("eof", &self.eof)
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Shared handle to a message body stream
///
/// Cloning a `Body` yields another handle to the same stream.
#[derive(Clone)]
pub struct Body {
    inner: Arc<Mutex<Box<dyn Stream>>>,
}

impl Body {
    /// Create a body over an empty in-memory stream
    pub fn empty() -> Self {
        Self::from_stream(MemoryStream::empty())
    }

    /// Create a body over an in-memory copy of `data`
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::from_stream(MemoryStream::from_bytes(data.into().to_vec()))
    }

    /// Create a body over any stream
    pub fn from_stream(stream: impl Stream + 'static) -> Self {
        Body {
            inner: Arc::new(Mutex::new(Box::new(stream))),
        }
    }

    pub fn read(&self, len: usize) -> Result<Vec<u8>> {
        self.inner.lock().read(len)
    }

    pub fn write(&self, data: &[u8]) -> Result<usize> {
        self.inner.lock().write(data)
    }

    pub fn seek(&self, pos: SeekFrom) -> Result<u64> {
        self.inner.lock().seek(pos)
    }

    pub fn rewind(&self) -> Result<()> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    pub fn tell(&self) -> Result<u64> {
        self.inner.lock().tell()
    }

    pub fn eof(&self) -> bool {
        self.inner.lock().eof()
    }

    pub fn size(&self) -> Option<u64> {
        self.inner.lock().size()
    }

    pub fn contents(&self) -> Result<Vec<u8>> {
        self.inner.lock().contents()
    }

    pub fn close(&self) {
        self.inner.lock().close()
    }

    pub fn detach(&self) -> Option<Box<dyn Any + Send>> {
        self.inner.lock().detach()
    }

    pub fn metadata(&self) -> StreamMetadata {
        self.inner.lock().metadata()
    }

    /// Read the whole body from the start; yields no bytes on failure
    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.lock().to_bytes()
    }

    /// Read the whole body as text, replacing invalid UTF-8
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }

    /// Whether both handles refer to the same stream
    pub fn ptr_eq(&self, other: &Body) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("metadata", &self.metadata())
            .finish()
    }
}

/// Input accepted wherever a message body is expected
///
/// Resolved once into a [`Body`] when the message is constructed.
#[derive(Debug)]
pub enum BodySource {
    Empty,
    Bytes(Bytes),
    Handle(Body),
}

impl BodySource {
    pub fn into_body(self) -> Body {
        match self {
            BodySource::Empty => Body::empty(),
            BodySource::Bytes(data) if data.is_empty() => Body::empty(),
            BodySource::Bytes(data) => Body::from_bytes(data),
            BodySource::Handle(body) => body,
        }
    }
}

impl From<&str> for BodySource {
    fn from(data: &str) -> Self {
        BodySource::Bytes(Bytes::copy_from_slice(data.as_bytes()))
    }
}

impl From<String> for BodySource {
    fn from(data: String) -> Self {
        BodySource::Bytes(Bytes::from(data))
    }
}

impl From<&[u8]> for BodySource {
    fn from(data: &[u8]) -> Self {
        BodySource::Bytes(Bytes::copy_from_slice(data))
    }
}

impl From<Vec<u8>> for BodySource {
    fn from(data: Vec<u8>) -> Self {
        BodySource::Bytes(Bytes::from(data))
    }
}

impl From<Bytes> for BodySource {
    fn from(data: Bytes) -> Self {
        BodySource::Bytes(data)
    }
}

impl From<Body> for BodySource {
    fn from(body: Body) -> Self {
        BodySource::Handle(body)
    }
}

impl From<()> for BodySource {
    fn from(_: ()) -> Self {
        BodySource::Empty
    }
}

impl<T: Into<BodySource>> From<Option<T>> for BodySource {
    fn from(source: Option<T>) -> Self {
        source.map_or(BodySource::Empty, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_and_eof() {
        let mut stream = MemoryStream::from_bytes("hello world");
        assert_eq!(stream.read(5).unwrap(), b"hello");
        assert!(!stream.eof());
        assert_eq!(stream.read(100).unwrap(), b" world");
        assert!(stream.eof());
    }

    #[test]
    fn test_seek_and_tell() {
        let mut stream = MemoryStream::from_bytes("abcdef");
        stream.seek(SeekFrom::Start(2)).unwrap();
        assert_eq!(stream.tell().unwrap(), 2);
        assert_eq!(stream.contents().unwrap(), b"cdef");
        assert_eq!(stream.size(), Some(6));
        assert_eq!(stream.tell().unwrap(), 6);
    }

    #[test]
    fn test_write() {
        let mut stream = MemoryStream::empty();
        assert_eq!(stream.write(b"abc").unwrap(), 3);
        assert_eq!(stream.to_bytes(), b"abc");
    }

    #[test]
    fn test_detached_stream() {
        let mut stream = MemoryStream::from_bytes("data");
        let handle = stream.detach().unwrap();
        assert!(handle.downcast::<Cursor<Vec<u8>>>().is_ok());

        assert!(matches!(stream.read(1), Err(Error::Detached)));
        assert!(matches!(stream.write(b"x"), Err(Error::Detached)));
        assert!(matches!(stream.seek(SeekFrom::Start(0)), Err(Error::Detached)));
        assert!(matches!(stream.tell(), Err(Error::Detached)));
        assert!(stream.eof());
        assert_eq!(stream.size(), None);
        assert_eq!(stream.to_bytes(), b"");
        assert_eq!(stream.metadata(), StreamMetadata::default());
        assert!(stream.detach().is_none());
    }

    #[test]
    fn test_file_stream_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.txt");
        std::fs::write(&path, "from disk").unwrap();

        let mut stream = HandleStream::<File>::open(&path).unwrap();
        assert_eq!(stream.to_bytes(), b"from disk");
        assert!(stream.write(b"x").is_err());

        let metadata = stream.metadata();
        assert!(metadata.readable);
        assert!(!metadata.writable);
        assert_eq!(metadata.uri.as_deref(), Some(path.display().to_string().as_str()));
    }

    #[test]
    fn test_body_handles_share_stream() {
        let body = Body::from_bytes("shared");
        let copy = body.clone();
        assert!(body.ptr_eq(&copy));

        body.seek(SeekFrom::Start(3)).unwrap();
        assert_eq!(copy.tell().unwrap(), 3);
        assert_eq!(copy.to_string_lossy(), "shared");
    }

    #[test]
    fn test_body_source_resolution() {
        assert_eq!(BodySource::from("").into_body().to_bytes(), b"");
        assert_eq!(BodySource::from("text").into_body().to_bytes(), b"text");
        assert_eq!(BodySource::from(None::<&str>).into_body().size(), Some(0));

        let body = Body::from_bytes("handle");
        let resolved = BodySource::from(body.clone()).into_body();
        assert!(resolved.ptr_eq(&body));
    }
}
