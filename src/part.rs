use std::{collections::VecDeque, fmt};

use bytes::{Bytes, BytesMut};
use encoding_rs::Encoding;
use http::{header, HeaderMap};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;

use crate::{
    config::DEFAULT_CHUNK_SIZE,
    decode::{decode_content, decode_text, decode_transfer, resolve_charset},
    error::MultipartError,
    parser::{
        disposition::parse_content_disposition,
        headers::{header_str, CONTENT_TRANSFER_ENCODING},
        mimetype::parse_mimetype,
    },
    stream::{ByteStream, SharedStream},
};

/// Reader for a single boundary-delimited body part.
///
/// With a `Content-Length` header the part is read in bounded chunks;
/// without one it is scanned line by line until the boundary line. Lines
/// read past the end of the part are kept in an internal buffer and handed
/// back to the parent reader.
pub struct BodyPartReader<S> {
    boundary: Bytes,
    headers: HeaderMap,
    stream: SharedStream<S>,
    unread: VecDeque<Bytes>,
    at_eof: bool,
    at_bof: bool,
    length: Option<u64>,
    consumed: u64,
    chunk_size: usize,
}

impl<S> fmt::Debug for BodyPartReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyPartReader")
            .field("boundary", &self.boundary)
            .field("headers", &self.headers)
            .field("unread", &self.unread)
            .field("at_eof", &self.at_eof)
            .field("at_bof", &self.at_bof)
            .field("length", &self.length)
            .field("consumed", &self.consumed)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

impl<S> BodyPartReader<S> {
    /// Creates a part reader.
    ///
    /// `boundary` is the full delimiter line content, leading `--` included.
    pub fn new(
        boundary: impl Into<Bytes>,
        headers: HeaderMap,
        stream: SharedStream<S>,
    ) -> Result<Self, MultipartError> {
        let length = match headers.get(header::CONTENT_LENGTH) {
            Some(value) => {
                let raw = String::from_utf8_lossy(value.as_bytes());
                let length = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| MultipartError::InvalidContentLength {
                        value: raw.to_string(),
                    })?;
                Some(length)
            }
            None => None,
        };

        Ok(Self {
            boundary: boundary.into(),
            headers,
            stream,
            unread: VecDeque::new(),
            at_eof: false,
            at_bof: true,
            length,
            consumed: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Sets the chunk size used by [`read`](Self::read) and [`release`](Self::release).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Returns the part headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the delimiter this part ends at.
    pub fn boundary(&self) -> &[u8] {
        &self.boundary
    }

    /// Returns the declared `Content-Length`, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.length
    }

    /// Returns `true` once the whole part has been consumed.
    pub fn at_eof(&self) -> bool {
        self.at_eof
    }

    /// Returns `true` until the first read.
    pub fn at_bof(&self) -> bool {
        self.at_bof
    }

    /// Lines read past the end of this part, pending hand-back to the parent.
    pub fn unread(&self) -> impl Iterator<Item = &Bytes> + '_ {
        self.unread.iter()
    }

    /// Returns the file name from the `Content-Disposition` header.
    pub fn filename(&self) -> Option<String> {
        parse_content_disposition(header_str(&self.headers, header::CONTENT_DISPOSITION))
            .filename()
    }

    /// Returns the parsed part `Content-Type`, if present and valid.
    pub fn content_type(&self) -> Option<mime::Mime> {
        header_str(&self.headers, header::CONTENT_TYPE)?.parse().ok()
    }

    /// Applies `Content-Encoding` and then `Content-Transfer-Encoding` decoding.
    pub fn decode(&self, data: Bytes) -> Result<Bytes, MultipartError> {
        if data.is_empty() {
            return Ok(data);
        }

        let data = match header_str(&self.headers, header::CONTENT_ENCODING) {
            Some(encoding) => decode_content(data, encoding)?,
            None => data,
        };

        match header_str(&self.headers, CONTENT_TRANSFER_ENCODING) {
            Some(encoding) => decode_transfer(data, encoding),
            None => Ok(data),
        }
    }

    pub(crate) fn take_unread(&mut self) -> VecDeque<Bytes> {
        std::mem::take(&mut self.unread)
    }

    fn charset(&self) -> Option<String> {
        let content_type = header_str(&self.headers, header::CONTENT_TYPE)?;
        parse_mimetype(content_type)
            .params
            .remove(mime::CHARSET.as_str())
    }

    fn resolve_encoding(&self, encoding: Option<&str>) -> Result<&'static Encoding, MultipartError> {
        match encoding {
            Some(label) => resolve_charset(Some(label)),
            None => resolve_charset(self.charset().as_deref()),
        }
    }

    fn is_boundary_line(&self, line: &[u8]) -> bool {
        if !line.starts_with(&self.boundary) {
            return false;
        }

        let end = line
            .iter()
            .rposition(|b| !matches!(b, b'\r' | b'\n'))
            .map_or(0, |index| index + 1);
        let line = &line[..end];
        let tail = &line[self.boundary.len().min(line.len())..];
        tail == b"--" || tail.is_empty()
    }
}

impl<S: ByteStream> BodyPartReader<S> {
    /// Reads the rest of the part.
    ///
    /// Returns empty bytes once the part is exhausted.
    pub fn read(&mut self) -> Result<Bytes, MultipartError> {
        if self.at_eof {
            return Ok(Bytes::new());
        }

        let mut data = BytesMut::new();
        if self.length.is_some() {
            while !self.at_eof {
                data.extend_from_slice(&self.read_chunk(self.chunk_size)?);
            }
        } else {
            while !self.at_eof {
                data.extend_from_slice(&self.readline()?);
            }
        }

        Ok(data.freeze())
    }

    /// Reads the rest of the part and decodes it, see [`decode`](Self::decode).
    pub fn read_decoded(&mut self) -> Result<Bytes, MultipartError> {
        let data = self.read()?;
        self.decode(data)
    }

    /// Reads at most `size` bytes of a part with a declared `Content-Length`.
    ///
    /// Fails with [`MultipartError::ContentLengthRequired`] when the part has
    /// no declared length; such parts are only readable through
    /// [`read`](Self::read) and [`readline`](Self::readline).
    pub fn read_chunk(&mut self, size: usize) -> Result<Bytes, MultipartError> {
        if self.at_eof {
            return Ok(Bytes::new());
        }

        let length = self.length.ok_or(MultipartError::ContentLengthRequired)?;
        self.at_bof = false;

        let remaining = length - self.consumed;
        let want = usize::try_from(remaining).map_or(size, |remaining| remaining.min(size));

        let chunk = match self.unread.pop_front() {
            Some(mut pending) => {
                if pending.len() > want {
                    self.unread.push_front(pending.split_off(want));
                }
                pending
            }
            None => self.stream.borrow_mut().read_some(want)?,
        };

        self.consumed += chunk.len() as u64;
        if self.consumed == length {
            self.at_eof = true;
            self.expect_line_break()?;
        } else if chunk.is_empty() && want > 0 {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                declared = length,
                consumed = self.consumed,
                "body part: stream ended before declared length"
            );
            self.at_eof = true;
        }

        Ok(chunk)
    }

    /// Reads one line of a part, stripping the line break that precedes the boundary.
    pub fn readline(&mut self) -> Result<Bytes, MultipartError> {
        if self.at_eof {
            return Ok(Bytes::new());
        }
        self.at_bof = false;

        let line = self.next_line()?;
        if line.is_empty() {
            self.at_eof = true;
            return Ok(line);
        }

        if self.is_boundary_line(&line) {
            self.at_eof = true;
            self.unread.push_back(line);
            return Ok(Bytes::new());
        }

        let next_line = self.next_line()?;
        let line = if self.is_boundary_line(&next_line) {
            strip_line_break(line)
        } else {
            line
        };
        if !next_line.is_empty() {
            self.unread.push_back(next_line);
        }

        Ok(line)
    }

    /// Reads the part as text.
    ///
    /// The charset is `encoding` when given, else the `charset` parameter of
    /// the part `Content-Type`, else UTF-8.
    pub fn text(&mut self, encoding: Option<&str>) -> Result<String, MultipartError> {
        let data = self.read_decoded()?;
        let encoding = self.resolve_encoding(encoding)?;
        decode_text(&data, encoding)
    }

    /// Reads the part as JSON; `None` when the part had no content left.
    pub fn json<T>(&mut self, encoding: Option<&str>) -> Result<Option<T>, MultipartError>
    where
        T: DeserializeOwned,
    {
        let data = self.read_decoded()?;
        if data.is_empty() {
            return Ok(None);
        }

        let encoding = self.resolve_encoding(encoding)?;
        let text = decode_text(&data, encoding)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Reads the part as `application/x-www-form-urlencoded` pairs.
    ///
    /// Pairs with an empty value are dropped. `None` when the part had no
    /// content left.
    pub fn form(
        &mut self,
        encoding: Option<&str>,
    ) -> Result<Option<Vec<(String, String)>>, MultipartError> {
        let data = self.read_decoded()?;
        if data.is_empty() {
            return Ok(None);
        }

        let encoding = self.resolve_encoding(encoding)?;
        let text = decode_text(&data, encoding)?;

        let pairs = text
            .trim_end()
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (unquote_plus(key, encoding), unquote_plus(value, encoding)))
            .collect();
        Ok(Some(pairs))
    }

    /// Discards the rest of the part so the parent reader can advance.
    pub fn release(&mut self) -> Result<(), MultipartError> {
        if self.at_eof {
            return Ok(());
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(
            length = ?self.length,
            consumed = self.consumed,
            "body part: releasing unread content"
        );

        if self.length.is_some() {
            while !self.at_eof {
                self.read_chunk(self.chunk_size)?;
            }
        } else {
            while !self.at_eof {
                self.readline()?;
            }
        }

        Ok(())
    }

    fn next_line(&mut self) -> Result<Bytes, MultipartError> {
        match self.unread.pop_front() {
            Some(line) => Ok(line),
            None => Ok(self.stream.borrow_mut().readline()?),
        }
    }

    fn expect_line_break(&mut self) -> Result<(), MultipartError> {
        let line = self.next_line()?;
        if line.is_empty() || &line[..] == b"\r\n" {
            return Ok(());
        }
        Err(MultipartError::MalformedPart)
    }
}

impl<S: ByteStream> Iterator for BodyPartReader<S> {
    type Item = Result<Bytes, MultipartError>;

    /// Drains the rest of the part; `None` once the part was already exhausted.
    fn next(&mut self) -> Option<Self::Item> {
        if self.at_eof {
            return None;
        }
        Some(self.read())
    }
}

fn strip_line_break(line: Bytes) -> Bytes {
    if line.ends_with(b"\r\n") {
        line.slice(..line.len() - 2)
    } else if line.ends_with(b"\n") {
        line.slice(..line.len() - 1)
    } else {
        line
    }
}

/// Form-urlencoded unquoting: `+` is a space, runs of `%XX` escapes are
/// bytes in `encoding`, everything else is kept as is.
fn unquote_plus(value: &str, encoding: &'static Encoding) -> String {
    let value = value.replace('+', " ");
    if !value.contains('%') {
        return value;
    }

    let mut out = String::with_capacity(value.len());
    let mut escaped = Vec::new();
    let mut rest = value.as_str();

    while let Some(ch) = rest.chars().next() {
        match rest.as_bytes() {
            [b'%', hi, lo, ..] if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                escaped.extend(percent_decode_str(&rest[..3]));
                rest = &rest[3..];
            }
            _ => {
                flush_escaped(&mut out, &mut escaped, encoding);
                out.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
    }
    flush_escaped(&mut out, &mut escaped, encoding);

    out
}

fn flush_escaped(out: &mut String, escaped: &mut Vec<u8>, encoding: &'static Encoding) {
    if escaped.is_empty() {
        return;
    }
    let (text, _) = encoding.decode_without_bom_handling(escaped);
    out.push_str(&text);
    escaped.clear();
}
