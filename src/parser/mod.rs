/// Multipart boundary extraction.
pub mod boundary;
/// `Content-Disposition` parsing.
pub mod disposition;
/// Raw header-line parsing.
pub mod headers;
/// MIME type and parameter parsing.
pub mod mimetype;

pub use boundary::extract_boundary;
pub use disposition::{
    content_disposition_filename, parse_content_disposition, ContentDisposition,
    DispositionWarning,
};
pub use headers::{HeaderParser, ParsedHeaders};
pub use mimetype::{parse_mimetype, MimeType};
