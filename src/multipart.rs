use std::{collections::VecDeque, fmt, rc::Rc};

use bytes::Bytes;
use http::{header, HeaderMap};

use crate::{
    config::ReaderConfig,
    error::{HeaderError, MultipartError, ParseError},
    factory::{DefaultFactory, ReaderFactory},
    parser::{
        boundary::extract_boundary,
        disposition::parse_content_disposition,
        headers::{header_str, trim_line_end, HeaderParser},
        mimetype::parse_mimetype,
    },
    part::BodyPartReader,
    stream::{shared, ByteStream, SharedStream},
};

/// A part yielded by [`MultipartReader::next_part`].
pub enum Part<S> {
    /// A leaf part.
    Body(BodyPartReader<S>),
    /// A nested `multipart/*` part.
    Multipart(MultipartReader<S>),
}

impl<S> fmt::Debug for Part<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Body(part) => f.debug_tuple("Body").field(part).finish(),
            Self::Multipart(reader) => f.debug_tuple("Multipart").field(reader).finish(),
        }
    }
}

impl<S> Part<S> {
    /// Returns the part headers.
    pub fn headers(&self) -> &HeaderMap {
        match self {
            Self::Body(part) => part.headers(),
            Self::Multipart(reader) => reader.headers(),
        }
    }

    /// Returns `true` for a nested multipart part.
    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }

    /// Returns the `name` parameter of the part `Content-Disposition`.
    pub fn name(&self) -> Option<String> {
        parse_content_disposition(header_str(self.headers(), header::CONTENT_DISPOSITION))
            .name()
            .map(str::to_owned)
    }

    /// Returns the file name from the part `Content-Disposition`.
    pub fn filename(&self) -> Option<String> {
        parse_content_disposition(header_str(self.headers(), header::CONTENT_DISPOSITION))
            .filename()
    }

    /// Returns `true` once the part has been fully consumed.
    pub fn at_eof(&self) -> bool {
        match self {
            Self::Body(part) => part.at_eof(),
            Self::Multipart(reader) => reader.at_eof(),
        }
    }

    /// Returns the leaf reader, if this is a leaf part.
    pub fn as_body_mut(&mut self) -> Option<&mut BodyPartReader<S>> {
        match self {
            Self::Body(part) => Some(part),
            Self::Multipart(_) => None,
        }
    }

    /// Returns the nested reader, if this is a nested multipart part.
    pub fn as_multipart_mut(&mut self) -> Option<&mut MultipartReader<S>> {
        match self {
            Self::Body(_) => None,
            Self::Multipart(reader) => Some(reader),
        }
    }

    fn take_unread(&mut self) -> VecDeque<Bytes> {
        match self {
            Self::Body(part) => part.take_unread(),
            Self::Multipart(reader) => std::mem::take(&mut reader.unread),
        }
    }
}

impl<S: ByteStream> Part<S> {
    /// Discards whatever is left of the part.
    pub fn release(&mut self) -> Result<(), MultipartError> {
        match self {
            Self::Body(part) => part.release(),
            Self::Multipart(reader) => reader.release(),
        }
    }
}

/// Streaming reader over the parts of a `multipart/*` body.
///
/// Parts are produced one at a time. Requesting the next part releases
/// whatever is left of the previous one, so a caller may skip any part.
pub struct MultipartReader<S> {
    headers: HeaderMap,
    boundary: Bytes,
    stream: SharedStream<S>,
    config: ReaderConfig,
    factory: Rc<dyn ReaderFactory<S>>,
    last_part: Option<Box<Part<S>>>,
    unread: VecDeque<Bytes>,
    at_eof: bool,
    at_bof: bool,
}

impl<S> fmt::Debug for MultipartReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartReader")
            .field("headers", &self.headers)
            .field("boundary", &self.boundary)
            .field("config", &self.config)
            .field("factory", &"<factory>")
            .field("last_part", &self.last_part)
            .field("unread", &self.unread)
            .field("at_eof", &self.at_eof)
            .field("at_bof", &self.at_bof)
            .finish()
    }
}

impl<S: ByteStream> MultipartReader<S> {
    /// Creates a reader for a body whose `Content-Type` is in `headers`.
    pub fn new(headers: HeaderMap, stream: SharedStream<S>) -> Result<Self, MultipartError> {
        Self::with_config(headers, stream, ReaderConfig::default())
    }

    /// Creates a reader that owns `stream`.
    pub fn from_reader(headers: HeaderMap, stream: S) -> Result<Self, MultipartError> {
        Self::new(headers, shared(stream))
    }

    /// Creates a reader with explicit validated configuration.
    pub fn with_config(
        headers: HeaderMap,
        stream: SharedStream<S>,
        config: ReaderConfig,
    ) -> Result<Self, MultipartError> {
        Self::with_factory(headers, stream, config, Rc::new(DefaultFactory))
    }

    /// Creates a reader whose child parts are built by `factory`.
    pub fn with_factory(
        headers: HeaderMap,
        stream: SharedStream<S>,
        config: ReaderConfig,
        factory: Rc<dyn ReaderFactory<S>>,
    ) -> Result<Self, MultipartError> {
        config.validate()?;

        let content_type = header_str(&headers, header::CONTENT_TYPE)
            .ok_or_else(|| ParseError::new("missing Content-Type header"))?;
        let boundary = extract_boundary(content_type, config.limits.max_boundary_len)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(boundary = boundary.as_str(), "multipart: reader created");

        Ok(Self {
            boundary: Bytes::from(format!("--{boundary}")),
            headers,
            stream,
            config,
            factory,
            last_part: None,
            unread: VecDeque::new(),
            at_eof: false,
            at_bof: true,
        })
    }

    /// Returns the next part, or `None` once the closing boundary was read.
    ///
    /// The previous part is released first if it was not fully consumed.
    pub fn next_part(&mut self) -> Result<Option<&mut Part<S>>, MultipartError> {
        if self.at_eof {
            return Ok(None);
        }

        self.release_last_part()?;
        if self.at_bof {
            self.read_until_first_boundary()?;
            self.at_bof = false;
        } else {
            self.read_boundary()?;
        }

        if self.at_eof {
            #[cfg(feature = "tracing")]
            tracing::debug!("multipart: closing boundary reached");
            return Ok(None);
        }

        let headers = self.read_headers()?;
        let part = self.dispatch(headers)?;

        #[cfg(feature = "tracing")]
        tracing::trace!(multipart = part.is_multipart(), "multipart: part started");

        let part = self.last_part.insert(Box::new(part));
        Ok(Some(&mut **part))
    }

    /// Builds the reader for a part with the given headers through the current factory.
    pub fn dispatch(&self, headers: HeaderMap) -> Result<Part<S>, MultipartError> {
        let content_type = header_str(&headers, header::CONTENT_TYPE).unwrap_or_default();
        if parse_mimetype(content_type).is_multipart() {
            let reader = self.factory.multipart_reader(
                headers,
                Rc::clone(&self.stream),
                &self.config,
                Rc::clone(&self.factory),
            )?;
            return Ok(Part::Multipart(reader));
        }

        let part = self.factory.body_part_reader(
            self.boundary.clone(),
            headers,
            Rc::clone(&self.stream),
            &self.config,
        )?;
        Ok(Part::Body(part))
    }

    /// Reads and discards every remaining part, nested ones included.
    pub fn release(&mut self) -> Result<(), MultipartError> {
        while let Some(part) = self.next_part()? {
            part.release()?;
        }
        Ok(())
    }

    fn release_last_part(&mut self) -> Result<(), MultipartError> {
        if let Some(mut part) = self.last_part.take() {
            if !part.at_eof() {
                part.release()?;
            }
            self.unread.extend(part.take_unread());
        }
        Ok(())
    }

    fn readline(&mut self) -> Result<Bytes, MultipartError> {
        match self.unread.pop_front() {
            Some(line) => Ok(line),
            None => Ok(self.stream.borrow_mut().readline()?),
        }
    }

    fn read_until_first_boundary(&mut self) -> Result<(), MultipartError> {
        loop {
            let line = self.readline()?;
            if line.is_empty() {
                return Err(MultipartError::MissingStartBoundary {
                    boundary: String::from_utf8_lossy(&self.boundary).into_owned(),
                });
            }

            let line = trim_trailing_whitespace(&line);
            if line == &self.boundary[..] {
                return Ok(());
            }
            if self.is_closing(line) {
                self.at_eof = true;
                return Ok(());
            }
        }
    }

    fn read_boundary(&mut self) -> Result<(), MultipartError> {
        let line = self.readline()?;
        if line.is_empty() {
            return Err(MultipartError::IncompleteStream);
        }

        let line = trim_trailing_whitespace(&line);
        if self.is_closing(line) {
            self.at_eof = true;
            return Ok(());
        }
        if line == &self.boundary[..] {
            return Ok(());
        }

        Err(MultipartError::MalformedBoundary {
            found: String::from_utf8_lossy(line).into_owned(),
            expected: String::from_utf8_lossy(&self.boundary).into_owned(),
        })
    }

    fn read_headers(&mut self) -> Result<HeaderMap, MultipartError> {
        let limit = self.config.limits.max_line_size;
        let mut lines = Vec::new();

        loop {
            let line = self.readline()?;
            if line.is_empty() {
                return Err(MultipartError::IncompleteStream);
            }
            if line.len() > limit {
                return Err(HeaderError::LineTooLong { limit }.into());
            }
            if trim_line_end(&line).is_empty() {
                break;
            }
            lines.push(line);
        }

        let parsed = HeaderParser::new(self.config.limits).parse_headers(&lines)?;
        Ok(parsed.headers)
    }

    fn is_closing(&self, line: &[u8]) -> bool {
        line.len() == self.boundary.len() + 2
            && line.starts_with(&self.boundary)
            && line.ends_with(b"--")
    }
}

impl<S> MultipartReader<S> {
    /// Returns the headers this reader was created from.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the delimiter line content, leading `--` included.
    pub fn boundary(&self) -> &[u8] {
        &self.boundary
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Returns `true` once the closing boundary was read.
    pub fn at_eof(&self) -> bool {
        self.at_eof
    }

    /// Replaces the factory used for parts dispatched from now on.
    pub fn set_factory(&mut self, factory: Rc<dyn ReaderFactory<S>>) {
        self.factory = factory;
    }
}

fn trim_trailing_whitespace(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |index| index + 1);
    &line[..end]
}
