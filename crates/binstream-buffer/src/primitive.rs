//! Object-safe primitive accessors shared by buffers and codecs.
//!
//! Codecs are stored as trait objects, so they read and write through
//! `&mut dyn Source` / `&mut dyn Sink` rather than through a generic buffer
//! type. Implementors supply the unsigned fixed-width accessors; signed and
//! floating-point accessors are derived from them bit for bit.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{BufferError, Result};

/// Read side of the primitive wire layer.
pub trait Source {
    /// Whether at least one more byte can be read. May perform channel I/O.
    fn has_remaining(&mut self) -> Result<bool>;

    fn get_u8(&mut self) -> Result<u8>;
    fn get_u16(&mut self) -> Result<u16>;
    fn get_u32(&mut self) -> Result<u32>;
    fn get_u64(&mut self) -> Result<u64>;

    /// Fill `dst` completely or fail with [`BufferError::Underflow`].
    fn get_bytes_into(&mut self, dst: &mut [u8]) -> Result<()>;

    fn get_i8(&mut self) -> Result<i8> {
        self.get_u8().map(|v| v as i8)
    }

    fn get_i16(&mut self) -> Result<i16> {
        self.get_u16().map(|v| v as i16)
    }

    fn get_i32(&mut self) -> Result<i32> {
        self.get_u32().map(|v| v as i32)
    }

    fn get_i64(&mut self) -> Result<i64> {
        self.get_u64().map(|v| v as i64)
    }

    fn get_f32(&mut self) -> Result<f32> {
        self.get_u32().map(f32::from_bits)
    }

    fn get_f64(&mut self) -> Result<f64> {
        self.get_u64().map(f64::from_bits)
    }

    /// Read exactly `len` bytes.
    fn get_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; len];
        self.get_bytes_into(&mut out)?;
        Ok(out)
    }
}

/// Write side of the primitive wire layer.
pub trait Sink {
    fn put_u8(&mut self, value: u8) -> Result<()>;
    fn put_u16(&mut self, value: u16) -> Result<()>;
    fn put_u32(&mut self, value: u32) -> Result<()>;
    fn put_u64(&mut self, value: u64) -> Result<()>;
    fn put_bytes(&mut self, src: &[u8]) -> Result<()>;

    fn put_i8(&mut self, value: i8) -> Result<()> {
        self.put_u8(value as u8)
    }

    fn put_i16(&mut self, value: i16) -> Result<()> {
        self.put_u16(value as u16)
    }

    fn put_i32(&mut self, value: i32) -> Result<()> {
        self.put_u32(value as u32)
    }

    fn put_i64(&mut self, value: i64) -> Result<()> {
        self.put_u64(value as u64)
    }

    fn put_f32(&mut self, value: f32) -> Result<()> {
        self.put_u32(value.to_bits())
    }

    fn put_f64(&mut self, value: f64) -> Result<()> {
        self.put_u64(value.to_bits())
    }
}

fn require(buf: &Bytes, needed: usize) -> Result<()> {
    if buf.remaining() < needed {
        return Err(BufferError::Underflow {
            needed,
            available: buf.remaining(),
        });
    }
    Ok(())
}

/// In-memory source, handy for decoding a fully buffered payload.
impl Source for Bytes {
    fn has_remaining(&mut self) -> Result<bool> {
        Ok(self.remaining() > 0)
    }

    fn get_u8(&mut self) -> Result<u8> {
        require(self, 1)?;
        Ok(Buf::get_u8(self))
    }

    fn get_u16(&mut self) -> Result<u16> {
        require(self, 2)?;
        Ok(Buf::get_u16(self))
    }

    fn get_u32(&mut self) -> Result<u32> {
        require(self, 4)?;
        Ok(Buf::get_u32(self))
    }

    fn get_u64(&mut self) -> Result<u64> {
        require(self, 8)?;
        Ok(Buf::get_u64(self))
    }

    fn get_bytes_into(&mut self, dst: &mut [u8]) -> Result<()> {
        require(self, dst.len())?;
        self.copy_to_slice(dst);
        Ok(())
    }
}

/// In-memory sink; never fails.
impl Sink for BytesMut {
    fn put_u8(&mut self, value: u8) -> Result<()> {
        BufMut::put_u8(self, value);
        Ok(())
    }

    fn put_u16(&mut self, value: u16) -> Result<()> {
        BufMut::put_u16(self, value);
        Ok(())
    }

    fn put_u32(&mut self, value: u32) -> Result<()> {
        BufMut::put_u32(self, value);
        Ok(())
    }

    fn put_u64(&mut self, value: u64) -> Result<()> {
        BufMut::put_u64(self, value);
        Ok(())
    }

    fn put_bytes(&mut self, src: &[u8]) -> Result<()> {
        self.put_slice(src);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_and_float_accessors_share_bit_patterns() {
        let mut out = BytesMut::new();
        let sink: &mut dyn Sink = &mut out;
        sink.put_i8(-1).unwrap();
        sink.put_i16(-2).unwrap();
        sink.put_i32(-3).unwrap();
        sink.put_i64(-4).unwrap();
        sink.put_f32(1.5).unwrap();
        sink.put_f64(-0.25).unwrap();

        let mut bytes = out.freeze();
        let src: &mut dyn Source = &mut bytes;
        assert_eq!(src.get_i8().unwrap(), -1);
        assert_eq!(src.get_i16().unwrap(), -2);
        assert_eq!(src.get_i32().unwrap(), -3);
        assert_eq!(src.get_i64().unwrap(), -4);
        assert_eq!(src.get_f32().unwrap(), 1.5);
        assert_eq!(src.get_f64().unwrap(), -0.25);
        assert!(!src.has_remaining().unwrap());
    }

    #[test]
    fn big_endian_layout() {
        let mut out = BytesMut::new();
        let sink: &mut dyn Sink = &mut out;
        sink.put_i32(20456).unwrap();
        sink.put_u16(0x3042).unwrap();
        assert_eq!(out.as_ref(), &[0x00, 0x00, 0x4F, 0xE8, 0x30, 0x42]);
    }

    #[test]
    fn short_source_underflows() {
        let mut src = Bytes::from_static(&[0x01, 0x02, 0x03]);
        let err = Source::get_u32(&mut src).unwrap_err();
        assert!(matches!(
            err,
            BufferError::Underflow {
                needed: 4,
                available: 3
            }
        ));
    }
}
