//! Value streams bound to a single codec.
//!
//! A [`StreamWriter`] encodes each value into a [`ChunkWriter`] and flushes on
//! completion. A [`StreamReader`] decodes ahead by one value so that
//! [`StreamReader::has_next`] is exact, and releases its channel as soon as
//! the end of the stream is seen.

use std::borrow::Borrow;
use std::fs::File;
use std::io::{Read, Write};
use std::iter::FusedIterator;

use binstream_buffer::{BufferError, ChunkReader, ChunkWriter, Source};
use binstream_codec::{SharedCodec, Value};
use tracing::{debug, trace, warn};

use crate::error::{Result, StreamError};

/// Writes values of one type to a buffered channel.
#[derive(Debug)]
pub struct StreamWriter<W: Write = File> {
    sink: Option<ChunkWriter<W>>,
    codec: SharedCodec,
    count: u64,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(sink: ChunkWriter<W>, codec: SharedCodec) -> Self {
        Self {
            sink: Some(sink),
            codec,
            count: 0,
        }
    }

    /// Encode one value into the buffer, draining to the channel as needed.
    pub fn write(&mut self, value: &Value) -> Result<()> {
        let sink = self
            .sink
            .as_mut()
            .ok_or(StreamError::Buffer(BufferError::Closed))?;
        self.codec.encode(value, sink)?;
        self.count += 1;
        trace!(count = self.count, "value written");
        Ok(())
    }

    /// Write every value, then flush and close the channel.
    ///
    /// The channel is closed even when `values` is empty. Returns the number
    /// of values written.
    pub fn write_all<I, V>(mut self, values: I) -> Result<u64>
    where
        I: IntoIterator<Item = V>,
        V: Borrow<Value>,
    {
        for value in values {
            self.write(value.borrow())?;
        }
        let count = self.count;
        self.finish()?;
        Ok(count)
    }

    /// Flush buffered bytes without closing.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(sink) = self.sink.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }

    /// Flush everything and hand back the channel.
    pub fn finish(mut self) -> Result<W> {
        let sink = self
            .sink
            .take()
            .ok_or(StreamError::Buffer(BufferError::Closed))?;
        let written = sink.written();
        let inner = sink.finish()?;
        debug!(values = self.count, bytes = written, "stream closed");
        Ok(inner)
    }

    /// Values written so far.
    pub fn values_written(&self) -> u64 {
        self.count
    }

    /// Bytes encoded so far, flushed or not.
    pub fn bytes_written(&self) -> u64 {
        self.sink.as_ref().map_or(0, ChunkWriter::written)
    }
}

impl<W: Write> Drop for StreamWriter<W> {
    fn drop(&mut self) {
        if let Some(sink) = self.sink.take() {
            if let Err(err) = sink.close() {
                warn!(error = %err, values = self.count, "failed to flush stream on drop");
            }
        }
    }
}

/// Reads values of one type from a buffered channel.
///
/// Iteration yields `Result<Value>` and stops after the end of the stream or
/// after the first error.
#[derive(Debug)]
pub struct StreamReader<R: Read = File> {
    source: Option<ChunkReader<R>>,
    codec: SharedCodec,
    pending: Option<Result<Value>>,
    pending_end: u64,
    consumed: u64,
    count: u64,
}

impl<R: Read> StreamReader<R> {
    /// Wrap `source`, decoding the first value immediately.
    pub fn new(source: ChunkReader<R>, codec: SharedCodec) -> Self {
        let mut reader = Self {
            source: Some(source),
            codec,
            pending: None,
            pending_end: 0,
            consumed: 0,
            count: 0,
        };
        reader.advance();
        reader
    }

    fn advance(&mut self) {
        let Some(source) = self.source.as_mut() else {
            self.pending = None;
            return;
        };

        match source.has_remaining() {
            Ok(true) => match self.codec.decode(source) {
                Ok(value) => {
                    self.pending_end = source.position();
                    self.pending = Some(Ok(value));
                }
                Err(err) => {
                    debug!(
                        error = %err,
                        position = source.position(),
                        "decode failed, closing channel"
                    );
                    self.pending = Some(Err(err.into()));
                    self.source = None;
                }
            },
            Ok(false) => {
                debug!(
                    values = self.count,
                    bytes = source.position(),
                    "end of stream, closing channel"
                );
                self.pending = None;
                self.source = None;
            }
            Err(err) => {
                self.pending = Some(Err(err.into()));
                self.source = None;
            }
        }
    }

    fn take_pending(&mut self) -> Option<Result<Value>> {
        let item = self.pending.take()?;
        if item.is_ok() {
            self.consumed = self.pending_end;
            self.count += 1;
        }
        self.advance();
        Some(item)
    }

    /// Whether another value (or error) is ready.
    pub fn has_next(&self) -> bool {
        self.pending.is_some()
    }

    /// Return the next value, or [`StreamError::Exhausted`] past the end.
    pub fn next_value(&mut self) -> Result<Value> {
        self.take_pending().unwrap_or(Err(StreamError::Exhausted))
    }

    /// Whether the channel has been released.
    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    /// Values returned so far.
    pub fn values_read(&self) -> u64 {
        self.count
    }

    /// Bytes occupied by the values returned so far.
    pub fn bytes_read(&self) -> u64 {
        self.consumed
    }
}

impl<R: Read> Iterator for StreamReader<R> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.take_pending()
    }
}

impl<R: Read> FusedIterator for StreamReader<R> {}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use binstream_codec::{IntCodec, StringCodec};

    use super::*;

    fn write_ints(values: &[i32], capacity: usize) -> Vec<u8> {
        let sink = ChunkWriter::with_capacity(Vec::new(), capacity).unwrap();
        let mut writer = StreamWriter::new(sink, Arc::new(IntCodec));
        for v in values {
            writer.write(&Value::Int(*v)).unwrap();
        }
        writer.finish().unwrap()
    }

    fn reader(bytes: Vec<u8>, capacity: usize) -> StreamReader<Cursor<Vec<u8>>> {
        let source = ChunkReader::with_capacity(Cursor::new(bytes), capacity).unwrap();
        StreamReader::new(source, Arc::new(IntCodec))
    }

    #[test]
    fn ints_round_trip_across_small_buffers() {
        let values: Vec<i32> = (-5..20).collect();
        let bytes = write_ints(&values, 8);
        assert_eq!(bytes.len(), values.len() * 4);

        let read: Vec<Value> = reader(bytes, 8).map(|v| v.unwrap()).collect();
        let expected: Vec<Value> = values.into_iter().map(Value::Int).collect();
        assert_eq!(read, expected);
    }

    #[test]
    fn empty_stream_is_closed_immediately() {
        let mut reader = reader(Vec::new(), 8);
        assert!(!reader.has_next());
        assert!(reader.is_closed());
        assert!(matches!(reader.next_value(), Err(StreamError::Exhausted)));
        assert!(reader.next().is_none());
    }

    #[test]
    fn has_next_is_exact_and_channel_closes_after_last_value() {
        let mut reader = reader(write_ints(&[7, 8], 8), 8);
        assert!(reader.has_next());
        assert_eq!(reader.next_value().unwrap(), Value::Int(7));
        assert!(!reader.is_closed());
        assert_eq!(reader.next_value().unwrap(), Value::Int(8));
        assert!(!reader.has_next());
        assert!(reader.is_closed());
        assert!(matches!(reader.next_value(), Err(StreamError::Exhausted)));
        assert_eq!(reader.values_read(), 2);
        assert_eq!(reader.bytes_read(), 8);
    }

    #[test]
    fn truncated_value_surfaces_once_then_fuses() {
        let mut bytes = write_ints(&[1], 8);
        bytes.extend_from_slice(&[0, 0]);

        let mut reader = reader(bytes, 8);
        assert_eq!(reader.next_value().unwrap(), Value::Int(1));
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(
            err,
            StreamError::Codec(binstream_codec::CodecError::Buffer(
                BufferError::Underflow { .. }
            ))
        ));
        assert!(reader.next().is_none());
    }

    #[test]
    fn write_all_closes_empty_streams() {
        let sink = ChunkWriter::with_capacity(Vec::new(), 8).unwrap();
        let writer = StreamWriter::new(sink, Arc::new(StringCodec));
        let count = writer.write_all(Vec::<Value>::new()).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn bytes_read_tracks_variable_width_values() {
        let sink = ChunkWriter::with_capacity(Vec::new(), 8).unwrap();
        let mut writer = StreamWriter::new(sink, Arc::new(StringCodec));
        writer.write(&Value::from("a")).unwrap();
        writer.write(&Value::from("hello world")).unwrap();
        assert_eq!(writer.bytes_written(), 5 + 15);
        let bytes = writer.finish().unwrap();

        let source = ChunkReader::with_capacity(Cursor::new(bytes), 8).unwrap();
        let mut reader = StreamReader::new(source, Arc::new(StringCodec));
        reader.next_value().unwrap();
        assert_eq!(reader.bytes_read(), 5);
        reader.next_value().unwrap();
        assert_eq!(reader.bytes_read(), 20);
    }

    #[test]
    fn bytes_written_counts_buffered_bytes_once() {
        let sink = ChunkWriter::new(Vec::new());
        let mut writer = StreamWriter::new(sink, Arc::new(IntCodec));
        writer.write(&Value::Int(42)).unwrap();
        assert_eq!(writer.bytes_written(), 4);
        assert_eq!(writer.values_written(), 1);
        let bytes = writer.finish().unwrap();
        assert_eq!(bytes.len(), 4);
    }

    #[test]
    fn values_read_reports_progress_without_consuming() {
        let mut reader = reader(write_ints(&[1, 2, 3], 8), 8);
        assert_eq!(reader.values_read(), 0);
        reader.next_value().unwrap();
        assert_eq!(reader.values_read(), 1);
        let rest: Vec<Value> = reader.by_ref().map(|v| v.unwrap()).collect();
        assert_eq!(rest, vec![Value::Int(2), Value::Int(3)]);
        assert_eq!(reader.values_read(), 3);
    }

    #[derive(Debug, Default)]
    struct Shared(Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn drop_flushes_pending_bytes() {
        let out = Arc::new(std::sync::Mutex::new(Vec::new()));
        {
            let sink = ChunkWriter::with_capacity(Shared(out.clone()), 64).unwrap();
            let mut writer = StreamWriter::new(sink, Arc::new(IntCodec));
            writer.write(&Value::Int(0x0102_0304)).unwrap();
        }
        assert_eq!(*out.lock().unwrap(), vec![1, 2, 3, 4]);
    }
}
