use http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::{error::HeaderError, limits::Limits};

/// `Content-Transfer-Encoding`, a MIME header `http` has no constant for.
pub const CONTENT_TRANSFER_ENCODING: HeaderName =
    HeaderName::from_static("content-transfer-encoding");

/// Header block parsed from raw lines.
#[derive(Debug, Clone, Default)]
pub struct ParsedHeaders {
    /// Parsed header fields in order of appearance.
    pub headers: HeaderMap,
    /// `Some(true)` for `Connection: close`, `Some(false)` for `keep-alive`.
    pub close: Option<bool>,
    /// `gzip` or `deflate` when declared by `Content-Encoding`.
    pub compression: Option<&'static str>,
}

/// RFC 822 style header-line parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderParser {
    limits: Limits,
}

impl HeaderParser {
    /// Creates a parser enforcing `limits`.
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    /// Parses header lines up to the first empty line.
    ///
    /// Lines may still carry their trailing CRLF. Continuation lines (leading
    /// space or tab) are folded into the previous field with a single space.
    pub fn parse_headers<L>(&self, lines: &[L]) -> Result<ParsedHeaders, HeaderError>
    where
        L: AsRef<[u8]>,
    {
        let mut parsed = ParsedHeaders::default();
        let mut lines = lines
            .iter()
            .map(|line| trim_line_end(line.as_ref()))
            .take_while(|line| !line.is_empty())
            .peekable();

        while let Some(line) = lines.next() {
            let Some(colon) = line.iter().position(|b| *b == b':') else {
                return Err(HeaderError::InvalidHeader {
                    line: String::from_utf8_lossy(line).into_owned(),
                });
            };

            let raw_name = trim_whitespace(&line[..colon]);
            let name = HeaderName::from_bytes(raw_name).map_err(|_| HeaderError::InvalidHeader {
                line: String::from_utf8_lossy(raw_name).into_owned(),
            })?;

            let mut field_len = line.len();
            let mut value = trim_whitespace(&line[colon + 1..]).to_vec();
            while let Some(continuation) = lines.next_if(|next| is_continuation(next)) {
                field_len += continuation.len();
                self.check_field_len(field_len)?;
                let folded = trim_whitespace(continuation);
                if !folded.is_empty() {
                    if !value.is_empty() {
                        value.push(b' ');
                    }
                    value.extend_from_slice(folded);
                }
            }
            self.check_field_len(field_len)?;

            if parsed.headers.len() >= self.limits.max_headers {
                return Err(HeaderError::TooManyHeaders {
                    limit: self.limits.max_headers,
                });
            }

            if name == header::CONNECTION {
                if value.eq_ignore_ascii_case(b"close") {
                    parsed.close = Some(true);
                } else if value.eq_ignore_ascii_case(b"keep-alive") {
                    parsed.close = Some(false);
                }
            } else if name == header::CONTENT_ENCODING {
                if value.eq_ignore_ascii_case(b"gzip") {
                    parsed.compression = Some("gzip");
                } else if value.eq_ignore_ascii_case(b"deflate") {
                    parsed.compression = Some("deflate");
                }
            }

            // obs-text bytes are kept as is
            let value = HeaderValue::from_bytes(&value).map_err(|_| HeaderError::InvalidHeader {
                line: String::from_utf8_lossy(line).into_owned(),
            })?;
            parsed.headers.append(name, value);
        }

        Ok(parsed)
    }

    fn check_field_len(&self, field_len: usize) -> Result<(), HeaderError> {
        if field_len > self.limits.max_field_size {
            return Err(HeaderError::LineTooLong {
                limit: self.limits.max_field_size,
            });
        }
        Ok(())
    }
}

fn trim_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |index| index + 1);
    &bytes[start..end]
}

fn is_continuation(line: &[u8]) -> bool {
    matches!(line.first(), Some(b' ' | b'\t'))
}

/// Returns a header value as text, accepting UTF-8 beyond visible ASCII.
pub(crate) fn header_str<'h>(headers: &'h HeaderMap, name: HeaderName) -> Option<&'h str> {
    headers
        .get(name)
        .and_then(|value| std::str::from_utf8(value.as_bytes()).ok())
}

pub(crate) fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
