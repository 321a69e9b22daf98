use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use bytes::{BufMut, BytesMut};
use tracing::{debug, trace};

use crate::error::{BufferError, Result};
use crate::primitive::Sink;
use crate::{check_capacity, DEFAULT_CAPACITY};

/// Writes primitives to any `Write` channel through a fixed-capacity buffer.
#[derive(Debug)]
pub struct ChunkWriter<W: Write> {
    inner: W,
    buf: BytesMut,
    capacity: usize,
    written: u64,
}

impl ChunkWriter<File> {
    /// Create (or truncate) a file channel for writing.
    pub fn create(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| BufferError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(?path, capacity, "opened channel for writing");
        Self::with_capacity(file, capacity)
    }
}

impl<W: Write> ChunkWriter<W> {
    /// Create a writer with the default capacity.
    pub fn new(inner: W) -> Self {
        Self::build(inner, DEFAULT_CAPACITY)
    }

    /// Create a writer with an explicit capacity (at least 8 bytes).
    pub fn with_capacity(inner: W, capacity: usize) -> Result<Self> {
        check_capacity(capacity)?;
        Ok(Self::build(inner, capacity))
    }

    fn build(inner: W, capacity: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(capacity),
            capacity,
            written: 0,
        }
    }

    /// Flush the occupied region first if `needed` more bytes would overflow.
    fn ensure(&mut self, needed: usize) -> Result<()> {
        if self.buf.len() + needed > self.capacity {
            self.drain()?;
        }
        self.written += needed as u64;
        Ok(())
    }

    /// Push the whole occupied region to the channel and reset to empty.
    fn drain(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(BufferError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(BufferError::Io(err)),
            }
        }
        trace!(drained = offset, "drained buffer");
        self.buf.clear();
        Ok(())
    }

    /// Write residual bytes and flush the channel.
    pub fn flush(&mut self) -> Result<()> {
        self.drain()?;
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(BufferError::Io(err)),
            }
        }
    }

    /// Flush and hand back the channel.
    pub fn finish(mut self) -> Result<W> {
        self.flush()?;
        debug!(written = self.written, "finished channel");
        Ok(self.inner)
    }

    /// Flush and release the channel.
    pub fn close(self) -> Result<()> {
        self.finish().map(drop)
    }

    /// Bytes accepted from callers so far, flushed or not.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Bytes waiting in the buffer.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Fixed buffer capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}

impl<W: Write> Sink for ChunkWriter<W> {
    fn put_u8(&mut self, value: u8) -> Result<()> {
        self.ensure(1)?;
        BufMut::put_u8(&mut self.buf, value);
        Ok(())
    }

    fn put_u16(&mut self, value: u16) -> Result<()> {
        self.ensure(2)?;
        BufMut::put_u16(&mut self.buf, value);
        Ok(())
    }

    fn put_u32(&mut self, value: u32) -> Result<()> {
        self.ensure(4)?;
        BufMut::put_u32(&mut self.buf, value);
        Ok(())
    }

    fn put_u64(&mut self, value: u64) -> Result<()> {
        self.ensure(8)?;
        BufMut::put_u64(&mut self.buf, value);
        Ok(())
    }

    fn put_bytes(&mut self, src: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < src.len() {
            if self.buf.len() == self.capacity {
                self.drain()?;
            }
            let take = (self.capacity - self.buf.len()).min(src.len() - offset);
            self.buf.put_slice(&src[offset..offset + take]);
            offset += take;
        }
        self.written += src.len() as u64;
        Ok(())
    }
}
