use std::borrow::Borrow;
use std::fs::File;
use std::io::{Read, Write};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use binstream_buffer::{ChunkReader, ChunkWriter, DEFAULT_CAPACITY};
use binstream_codec::{CodecRegistry, SharedCodec, Type, Value, WireType};
use tracing::debug;

use crate::error::Result;
use crate::stream::{StreamReader, StreamWriter};

/// Settings applied to every stream a factory opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Fixed capacity of each stream's byte buffer.
    pub buffer_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Opens typed value streams over files.
///
/// Every stream opened by one factory shares the same [`CodecRegistry`], so
/// codecs registered or declared here are visible to all of them.
#[derive(Debug, Clone, Default)]
pub struct StreamFactory {
    registry: Arc<CodecRegistry>,
    config: StreamConfig,
}

impl StreamFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StreamConfig) -> Self {
        Self::with_registry(Arc::new(CodecRegistry::new()), config)
    }

    pub fn with_registry(registry: Arc<CodecRegistry>, config: StreamConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Register a custom codec, replacing any existing one for `ty`.
    pub fn register(&self, ty: &Type, codec: SharedCodec) {
        self.registry.register(ty, codec);
    }

    /// Declare an enum or record type.
    pub fn declare(&self, ty: Type) -> Result<()> {
        Ok(self.registry.declare(ty)?)
    }

    /// Load enum and record declarations from a JSON file.
    pub fn load_declarations(&self, path: &Path) -> Result<usize> {
        Ok(self.registry.load_declarations(path)?)
    }

    /// Toggle structural derivation of codecs for declared records.
    pub fn set_generic_records(&self, enabled: bool) {
        self.registry.set_generic_records(enabled);
    }

    /// Create (or truncate) `path` for writing values of `ty`.
    ///
    /// The codec is resolved before the file is touched.
    pub fn open_write(&self, path: impl AsRef<Path>, ty: &Type) -> Result<StreamWriter<File>> {
        let path = path.as_ref();
        let codec = self.registry.resolve(ty)?;
        let sink = ChunkWriter::create(path, self.config.buffer_capacity)?;
        debug!(path = %path.display(), ty = %ty, "opened stream for writing");
        Ok(StreamWriter::new(sink, codec))
    }

    /// Open `path` for reading values of `ty`.
    pub fn open_read(&self, path: impl AsRef<Path>, ty: &Type) -> Result<StreamReader<File>> {
        let path = path.as_ref();
        let codec = self.registry.resolve(ty)?;
        let source = ChunkReader::open(path, self.config.buffer_capacity)?;
        debug!(path = %path.display(), ty = %ty, "opened stream for reading");
        Ok(StreamReader::new(source, codec))
    }

    /// Stream values of `ty` into an arbitrary channel.
    pub fn writer<W: Write>(&self, inner: W, ty: &Type) -> Result<StreamWriter<W>> {
        let codec = self.registry.resolve(ty)?;
        let sink = ChunkWriter::with_capacity(inner, self.config.buffer_capacity)?;
        Ok(StreamWriter::new(sink, codec))
    }

    /// Stream values of `ty` out of an arbitrary channel.
    pub fn reader<R: Read>(&self, inner: R, ty: &Type) -> Result<StreamReader<R>> {
        let codec = self.registry.resolve(ty)?;
        let source = ChunkReader::with_capacity(inner, self.config.buffer_capacity)?;
        Ok(StreamReader::new(source, codec))
    }

    /// Write every value to `path` and close it. Returns the number written.
    pub fn write_values<I, V>(&self, path: impl AsRef<Path>, ty: &Type, values: I) -> Result<u64>
    where
        I: IntoIterator<Item = V>,
        V: Borrow<Value>,
    {
        self.open_write(path, ty)?.write_all(values)
    }

    /// Read every value from `path`.
    pub fn read_values(&self, path: impl AsRef<Path>, ty: &Type) -> Result<Vec<Value>> {
        self.open_read(path, ty)?.collect()
    }

    /// Write Rust values of a [`WireType`] to `path`.
    pub fn write_typed<'a, T, I>(&self, path: impl AsRef<Path>, items: I) -> Result<u64>
    where
        T: WireType + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut writer = self.open_write(path, &T::wire_type())?;
        for item in items {
            writer.write(&item.to_value()?)?;
        }
        let count = writer.values_written();
        writer.finish()?;
        Ok(count)
    }

    /// Open `path` for reading Rust values of a [`WireType`].
    pub fn open_read_typed<T: WireType>(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<TypedReader<T, File>> {
        Ok(TypedReader::new(self.open_read(path, &T::wire_type())?))
    }
}

/// Adapts a [`StreamReader`] to yield Rust values.
#[derive(Debug)]
pub struct TypedReader<T, R: Read = File> {
    inner: StreamReader<R>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: WireType, R: Read> TypedReader<T, R> {
    pub fn new(inner: StreamReader<R>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    pub fn has_next(&self) -> bool {
        self.inner.has_next()
    }

    pub fn next_item(&mut self) -> Result<T> {
        let value = self.inner.next_value()?;
        Ok(T::from_value(value)?)
    }

    pub fn into_inner(self) -> StreamReader<R> {
        self.inner
    }
}

impl<T: WireType, R: Read> Iterator for TypedReader<T, R> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.inner.next()?;
        Some(value.and_then(|value| Ok(T::from_value(value)?)))
    }
}

impl<T: WireType, R: Read> std::iter::FusedIterator for TypedReader<T, R> {}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use binstream_codec::{CollectionKind, RecordType};

    use super::*;
    use crate::error::StreamError;

    fn small() -> StreamFactory {
        StreamFactory::with_config(StreamConfig { buffer_capacity: 8 })
    }

    #[test]
    fn default_capacity() {
        assert_eq!(StreamFactory::new().config().buffer_capacity, 8192);
    }

    #[test]
    fn in_memory_round_trip() {
        let factory = small();
        let ty = Type::list(Type::String);
        let value = Value::List(vec!["x".into(), "yz".into()]);

        let mut writer = factory.writer(Vec::new(), &ty).unwrap();
        writer.write(&value).unwrap();
        let bytes = writer.finish().unwrap();

        let values: Vec<Value> = factory
            .reader(Cursor::new(bytes), &ty)
            .unwrap()
            .map(|v| v.unwrap())
            .collect();
        assert_eq!(values, vec![value]);
    }

    #[test]
    fn undeclared_record_fails_before_io() {
        let factory = small();
        let person = Type::record(RecordType::builder("Person").field("age", Type::Int).build());
        let err = factory.writer(Vec::new(), &person).unwrap_err();
        assert!(matches!(err, StreamError::Codec(_)));

        factory.set_generic_records(true);
        assert!(factory.writer(Vec::new(), &person).is_ok());
    }

    #[test]
    fn rejects_tiny_buffers() {
        let factory = StreamFactory::with_config(StreamConfig { buffer_capacity: 4 });
        let err = factory.writer(Vec::new(), &Type::Int).unwrap_err();
        assert!(matches!(
            err,
            StreamError::Buffer(binstream_buffer::BufferError::Capacity { .. })
        ));
    }

    #[test]
    fn typed_reader_decodes_rust_values() {
        let factory = small();
        let ty = <Vec<i64>>::wire_type();
        assert_eq!(ty, Type::collection(CollectionKind::List, Type::Long));

        let mut writer = factory.writer(Vec::new(), &ty).unwrap();
        writer.write(&vec![1i64, 2, 3].to_value().unwrap()).unwrap();
        writer.write(&Vec::<i64>::new().to_value().unwrap()).unwrap();
        let bytes = writer.finish().unwrap();

        let reader = factory.reader(Cursor::new(bytes), &ty).unwrap();
        let items: Vec<Vec<i64>> = TypedReader::new(reader).map(|v| v.unwrap()).collect();
        assert_eq!(items, vec![vec![1, 2, 3], vec![]]);
    }
}
