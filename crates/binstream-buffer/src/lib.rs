//! Fixed-capacity chunked byte buffers over blocking channels.
//!
//! This is the lowest layer of binstream. A [`ChunkReader`] refills from its
//! channel whenever a requested primitive is not fully buffered, and a
//! [`ChunkWriter`] flushes its occupied region whenever the next primitive
//! would not fit. Callers never observe a primitive split across channel I/O.
//!
//! All multi-byte numerics are big-endian.

pub mod error;
pub mod primitive;
pub mod reader;
pub mod writer;

pub use error::{BufferError, Result};
pub use primitive::{Sink, Source};
pub use reader::ChunkReader;
pub use writer::ChunkWriter;

/// Default buffer capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 8 * 1024;

/// Smallest accepted capacity: the width of the widest primitive (long/double).
pub const MIN_CAPACITY: usize = 8;

pub(crate) fn check_capacity(capacity: usize) -> Result<()> {
    if capacity < MIN_CAPACITY {
        return Err(BufferError::Capacity {
            capacity,
            min: MIN_CAPACITY,
        });
    }
    Ok(())
}
