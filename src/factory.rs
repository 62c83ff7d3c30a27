use std::rc::Rc;

use bytes::Bytes;
use http::HeaderMap;

use crate::{
    config::ReaderConfig,
    error::MultipartError,
    multipart::MultipartReader,
    part::BodyPartReader,
    stream::{ByteStream, SharedStream},
};

/// Constructs child readers for the parts a [`MultipartReader`] yields.
///
/// Replace the default with [`MultipartReader::set_factory`] to wrap or
/// preconfigure part readers. A nested reader receives the factory that
/// created it, so an override applies at every nesting level.
pub trait ReaderFactory<S> {
    /// Builds the reader for a non-multipart part.
    fn body_part_reader(
        &self,
        boundary: Bytes,
        headers: HeaderMap,
        stream: SharedStream<S>,
        config: &ReaderConfig,
    ) -> Result<BodyPartReader<S>, MultipartError>;

    /// Builds the reader for a nested `multipart/*` part.
    fn multipart_reader(
        &self,
        headers: HeaderMap,
        stream: SharedStream<S>,
        config: &ReaderConfig,
        factory: Rc<dyn ReaderFactory<S>>,
    ) -> Result<MultipartReader<S>, MultipartError>;
}

/// Factory building the stock readers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFactory;

impl<S: ByteStream> ReaderFactory<S> for DefaultFactory {
    fn body_part_reader(
        &self,
        boundary: Bytes,
        headers: HeaderMap,
        stream: SharedStream<S>,
        config: &ReaderConfig,
    ) -> Result<BodyPartReader<S>, MultipartError> {
        Ok(BodyPartReader::new(boundary, headers, stream)?.with_chunk_size(config.chunk_size))
    }

    fn multipart_reader(
        &self,
        headers: HeaderMap,
        stream: SharedStream<S>,
        config: &ReaderConfig,
        factory: Rc<dyn ReaderFactory<S>>,
    ) -> Result<MultipartReader<S>, MultipartError> {
        MultipartReader::with_factory(headers, stream, *config, factory)
    }
}
