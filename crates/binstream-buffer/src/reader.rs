use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use bytes::{Buf, BytesMut};
use tracing::{debug, trace};

use crate::error::{BufferError, Result};
use crate::primitive::Source;
use crate::{check_capacity, DEFAULT_CAPACITY};

/// Reads primitives from any `Read` channel through a fixed-capacity buffer.
///
/// Handles partial reads internally: a primitive is only handed out once all
/// of its bytes are buffered.
#[derive(Debug)]
pub struct ChunkReader<R> {
    inner: R,
    buf: BytesMut,
    scratch: Box<[u8]>,
    capacity: usize,
    position: u64,
}

impl ChunkReader<File> {
    /// Open a file channel for reading.
    pub fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| BufferError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(?path, capacity, "opened channel for reading");
        Self::with_capacity(file, capacity)
    }
}

impl<R: Read> ChunkReader<R> {
    /// Create a reader with the default capacity.
    pub fn new(inner: R) -> Self {
        Self::build(inner, DEFAULT_CAPACITY)
    }

    /// Create a reader with an explicit capacity (at least 8 bytes).
    pub fn with_capacity(inner: R, capacity: usize) -> Result<Self> {
        check_capacity(capacity)?;
        Ok(Self::build(inner, capacity))
    }

    fn build(inner: R, capacity: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(capacity),
            scratch: vec![0u8; capacity].into_boxed_slice(),
            capacity,
            position: 0,
        }
    }

    /// Move unread bytes to the front and read once from the channel.
    ///
    /// Returns the number of bytes read; zero means end of channel.
    fn refill(&mut self) -> Result<usize> {
        let space = self.capacity - self.buf.len();
        if space == 0 {
            return Ok(0);
        }

        loop {
            match self.inner.read(&mut self.scratch[..space]) {
                Ok(read) => {
                    self.buf.extend_from_slice(&self.scratch[..read]);
                    trace!(read, buffered = self.buf.len(), "refilled buffer");
                    return Ok(read);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(BufferError::Io(err)),
            }
        }
    }

    fn require(&mut self, needed: usize) -> Result<()> {
        while self.buf.len() < needed {
            if self.refill()? == 0 {
                return Err(BufferError::Underflow {
                    needed,
                    available: self.buf.len(),
                });
            }
        }
        self.position += needed as u64;
        Ok(())
    }

    /// Bytes consumed by callers so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes currently buffered but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Fixed buffer capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the reader and return the channel. Buffered bytes are discarded.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Source for ChunkReader<R> {
    fn has_remaining(&mut self) -> Result<bool> {
        if self.buf.is_empty() {
            self.refill()?;
        }
        Ok(!self.buf.is_empty())
    }

    fn get_u8(&mut self) -> Result<u8> {
        self.require(1)?;
        Ok(self.buf.get_u8())
    }

    fn get_u16(&mut self) -> Result<u16> {
        self.require(2)?;
        Ok(self.buf.get_u16())
    }

    fn get_u32(&mut self) -> Result<u32> {
        self.require(4)?;
        Ok(self.buf.get_u32())
    }

    fn get_u64(&mut self) -> Result<u64> {
        self.require(8)?;
        Ok(self.buf.get_u64())
    }

    fn get_bytes_into(&mut self, dst: &mut [u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < dst.len() {
            if self.buf.is_empty() && self.refill()? == 0 {
                return Err(BufferError::Underflow {
                    needed: dst.len(),
                    available: offset,
                });
            }

            let take = self.buf.len().min(dst.len() - offset);
            self.buf.copy_to_slice(&mut dst[offset..offset + take]);
            offset += take;
        }
        self.position += dst.len() as u64;
        Ok(())
    }
}
