use http::HeaderMap;

use crate::{
    config::ReaderConfig,
    error::{ConfigError, MultipartError},
    limits::Limits,
    multipart::MultipartReader,
    stream::{ByteStream, SharedStream},
};

/// Fluent setup for a [`MultipartReader`]: the chunk size used when
/// draining length-delimited parts, and the line, field, header-count and
/// boundary-length limits enforced while parsing part headers.
#[derive(Debug, Clone, Default)]
pub struct ReaderBuilder {
    config: ReaderConfig,
}

impl ReaderBuilder {
    /// Starts from [`ReaderConfig::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the configuration the reader would be built with.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Replaces chunk size and limits at once.
    pub fn with_config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the chunk size `read` and `release` use on parts with a `Content-Length`.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    /// Sets the limits applied to boundaries and part header blocks.
    pub fn limits(mut self, limits: Limits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Checks for zero values and a line limit shorter than a boundary line.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.config.validate()
    }

    /// Returns the configuration once it validates.
    pub fn build_config(self) -> Result<ReaderConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Validates the configuration and opens a reader over `stream`.
    ///
    /// `headers` must carry the `multipart/*` `Content-Type` of the body.
    pub fn build<S: ByteStream>(
        self,
        headers: HeaderMap,
        stream: SharedStream<S>,
    ) -> Result<MultipartReader<S>, MultipartError> {
        MultipartReader::with_config(headers, stream, self.build_config()?)
    }
}
