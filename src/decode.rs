//! Content-Encoding, Content-Transfer-Encoding and charset decoding.

use std::io::Read;

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use encoding_rs::Encoding;
use flate2::read::{DeflateDecoder, GzDecoder};

use crate::error::MultipartError;

/// Decodes a payload according to its `Content-Encoding`.
///
/// `deflate` is raw deflate without a zlib header, as used by HTTP.
pub fn decode_content(data: Bytes, encoding: &str) -> Result<Bytes, MultipartError> {
    match encoding.trim().to_ascii_lowercase().as_str() {
        "identity" | "" => Ok(data),
        "gzip" => inflate(GzDecoder::new(&data[..]), "gzip"),
        "deflate" => inflate(DeflateDecoder::new(&data[..]), "deflate"),
        _ => Err(MultipartError::UnknownContentEncoding {
            encoding: encoding.to_owned(),
        }),
    }
}

/// Decodes a payload according to its `Content-Transfer-Encoding`.
pub fn decode_transfer(data: Bytes, encoding: &str) -> Result<Bytes, MultipartError> {
    match encoding.trim().to_ascii_lowercase().as_str() {
        "" | "binary" | "8bit" | "7bit" => Ok(data),
        "base64" => {
            let compact: Vec<u8> = data
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            STANDARD
                .decode(compact)
                .map(Bytes::from)
                .map_err(|err| MultipartError::Decode {
                    encoding: "base64",
                    message: err.to_string(),
                })
        }
        "quoted-printable" => Ok(Bytes::from(decode_quoted_printable(&data))),
        _ => Err(MultipartError::UnknownTransferEncoding {
            encoding: encoding.to_owned(),
        }),
    }
}

/// Resolves a charset label, falling back to UTF-8 when none is given.
pub fn resolve_charset(label: Option<&str>) -> Result<&'static Encoding, MultipartError> {
    let Some(label) = label.map(str::trim).filter(|label| !label.is_empty()) else {
        return Ok(encoding_rs::UTF_8);
    };

    Encoding::for_label(label.as_bytes()).ok_or_else(|| {
        #[cfg(feature = "tracing")]
        tracing::warn!(charset = label, "decode: unknown charset");

        MultipartError::UnknownCharset {
            charset: label.to_owned(),
        }
    })
}

/// Decodes `data` as text in `encoding`, rejecting malformed input.
pub fn decode_text(data: &[u8], encoding: &'static Encoding) -> Result<String, MultipartError> {
    encoding
        .decode_without_bom_handling_and_without_replacement(data)
        .map(|text| text.into_owned())
        .ok_or(MultipartError::InvalidText {
            charset: encoding.name(),
        })
}

fn inflate(mut decoder: impl Read, encoding: &'static str) -> Result<Bytes, MultipartError> {
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|err| MultipartError::Decode {
            encoding,
            message: err.to_string(),
        })?;
    Ok(Bytes::from(out))
}

fn decode_quoted_printable(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut index = 0;

    while index < data.len() {
        let byte = data[index];
        if byte != b'=' {
            out.push(byte);
            index += 1;
            continue;
        }

        match &data[index + 1..] {
            [b'\r', b'\n', ..] => index += 3,
            [b'\n', ..] => index += 2,
            [hi, lo, ..] => match (hex_value(*hi), hex_value(*lo)) {
                (Some(hi), Some(lo)) => {
                    out.push((hi << 4) | lo);
                    index += 3;
                }
                _ => {
                    out.push(byte);
                    index += 1;
                }
            },
            _ => {
                out.push(byte);
                index += 1;
            }
        }
    }

    out
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
