use std::io;

use thiserror::Error;

/// Configuration-time validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A configured numeric limit must be strictly greater than zero.
    #[error("limit `{limit}` must be greater than 0")]
    InvalidLimitValue {
        /// Name of the limit.
        limit: &'static str,
    },
    /// The line limit cannot be smaller than the longest boundary line.
    #[error("`max_line_size` ({max_line_size}) cannot be smaller than a boundary line ({boundary_line})")]
    LineSizeBelowBoundary {
        /// Configured `max_line_size`.
        max_line_size: usize,
        /// Length of the longest terminal boundary line.
        boundary_line: usize,
    },
}

/// Content-Type and boundary parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Generic parser failure with message context.
    #[error("{message}")]
    Message {
        /// Parser failure message.
        message: String,
    },
}

impl ParseError {
    /// Creates a parser error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Failures raised while parsing a block of raw header lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum HeaderError {
    /// A header field (including its continuation lines) exceeded the size limit.
    #[error("limit request headers fields size ({limit} bytes)")]
    LineTooLong {
        /// Configured limit in bytes.
        limit: usize,
    },
    /// A header line has no `:` delimiter or an invalid field name.
    #[error("Invalid HTTP Header: {line}")]
    InvalidHeader {
        /// The offending line or name.
        line: String,
    },
    /// A header block carried more fields than allowed.
    #[error("header block exceeded max header count of {limit}")]
    TooManyHeaders {
        /// Configured maximum number of header fields.
        limit: usize,
    },
}

/// Runtime error type used by the multipart readers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MultipartError {
    /// Configuration error surfaced at runtime.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Content-Type or boundary parsing failure.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Part header block could not be parsed.
    #[error(transparent)]
    Header(#[from] HeaderError),
    /// The underlying byte stream failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The stream ended before the opening boundary was seen.
    #[error("could not find starting boundary {boundary:?}")]
    MissingStartBoundary {
        /// Expected boundary line.
        boundary: String,
    },
    /// A line at a boundary position is not a valid boundary line.
    #[error("invalid boundary {found:?}, expected {expected:?}")]
    MalformedBoundary {
        /// Line found in the stream.
        found: String,
        /// Expected boundary line.
        expected: String,
    },
    /// Multipart stream ended where a boundary or header block was expected.
    #[error("multipart stream ended unexpectedly")]
    IncompleteStream,
    /// A chunked read was attempted on a part without `Content-Length`.
    #[error("Content-Length required for chunked read")]
    ContentLengthRequired,
    /// A part carries a `Content-Length` header that is not a valid size.
    #[error("invalid Content-Length header `{value}`")]
    InvalidContentLength {
        /// Raw header value.
        value: String,
    },
    /// A length-delimited part body was not followed by CRLF.
    #[error("reader did not read all the data or it is malformed")]
    MalformedPart,
    /// The part declares a `Content-Encoding` this crate cannot decode.
    #[error("unknown content-encoding `{encoding}`")]
    UnknownContentEncoding {
        /// Declared encoding.
        encoding: String,
    },
    /// The part declares a `Content-Transfer-Encoding` this crate cannot decode.
    #[error("unknown content-transfer-encoding `{encoding}`")]
    UnknownTransferEncoding {
        /// Declared encoding.
        encoding: String,
    },
    /// Decoding a compressed or transfer-encoded payload failed.
    #[error("failed to decode `{encoding}` payload: {message}")]
    Decode {
        /// Encoding that failed.
        encoding: &'static str,
        /// Decoder failure message.
        message: String,
    },
    /// A charset label is not known.
    #[error("unknown charset `{charset}`")]
    UnknownCharset {
        /// Requested charset label.
        charset: String,
    },
    /// The part body is not valid text in the selected charset.
    #[error("part body is not valid `{charset}` text")]
    InvalidText {
        /// Canonical name of the selected charset.
        charset: &'static str,
    },
    /// The part body is not valid JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
