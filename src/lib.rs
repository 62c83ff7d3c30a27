#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Streaming reader for MIME multipart bodies.
//!
//! [`MultipartReader`] walks the parts of a `multipart/*` body one at a
//! time over a blocking [`ByteStream`]. Leaf parts are read through
//! [`BodyPartReader`], nested `multipart/*` parts through another
//! [`MultipartReader`]. The header parsers used along the way are exposed
//! in [`parser`].

/// Fluent builder API.
pub mod builder;
/// Reader configuration.
pub mod config;
/// Payload and charset decoding.
pub mod decode;
/// Error types exposed by this crate.
pub mod error;
/// Child reader construction.
pub mod factory;
/// Framing and header limits.
pub mod limits;
/// Multipart reader and yielded part type.
pub mod multipart;
/// Low-level header parsers.
pub mod parser;
/// Body part reader.
pub mod part;
/// Byte source abstraction.
pub mod stream;

pub use builder::ReaderBuilder;
pub use config::{ReaderConfig, DEFAULT_CHUNK_SIZE};
pub use error::{ConfigError, HeaderError, MultipartError, ParseError};
pub use factory::{DefaultFactory, ReaderFactory};
pub use limits::Limits;
pub use multipart::{MultipartReader, Part};
pub use parser::{
    content_disposition_filename, extract_boundary, parse_content_disposition, parse_mimetype,
    ContentDisposition, DispositionWarning, HeaderParser, MimeType, ParsedHeaders,
};
pub use part::BodyPartReader;
pub use stream::{shared, ByteStream, SharedStream};
