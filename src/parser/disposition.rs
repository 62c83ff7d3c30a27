//! `Content-Disposition` parsing (RFC 6266 with RFC 2231/5987 extended parameters).

use std::{borrow::Cow, collections::BTreeMap};

use encoding_rs::Encoding;
use percent_encoding::percent_decode_str;
use thiserror::Error;

const SEPARATORS: &[u8] = b"()<>@,;:\\\"/[]?={} \t";

/// Non-fatal diagnostic produced while parsing a `Content-Disposition` value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispositionWarning {
    /// The whole header was rejected.
    #[error("bad Content-Disposition header `{header}`")]
    BadContentDispositionHeader {
        /// Raw header value.
        header: String,
    },
    /// A single parameter was dropped.
    #[error("bad Content-Disposition parameter `{param}`")]
    BadContentDispositionParam {
        /// Raw `name=value` fragment.
        param: String,
    },
}

/// Best-effort parse of a `Content-Disposition` value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentDisposition {
    /// Lowercased disposition type, `None` when the header was absent or rejected.
    pub disposition_type: Option<String>,
    /// Parameters keyed by lowercased name.
    pub params: BTreeMap<String, String>,
    /// Diagnostics raised while parsing.
    pub warnings: Vec<DispositionWarning>,
}

impl ContentDisposition {
    /// Returns a parameter value by (lowercase) name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Returns the `name` parameter used by `form-data` parts.
    pub fn name(&self) -> Option<&str> {
        self.param("name")
    }

    /// Returns the file name, see [`content_disposition_filename`].
    pub fn filename(&self) -> Option<String> {
        content_disposition_filename(&self.params)
    }

    /// Returns `true` when the whole header was rejected.
    pub fn is_rejected(&self) -> bool {
        self.warnings
            .iter()
            .any(|warning| matches!(warning, DispositionWarning::BadContentDispositionHeader { .. }))
    }

    fn rejected(header: &str) -> Self {
        #[cfg(feature = "tracing")]
        tracing::warn!(header = header, "content-disposition: header rejected");

        Self {
            disposition_type: None,
            params: BTreeMap::new(),
            warnings: vec![DispositionWarning::BadContentDispositionHeader {
                header: header.to_owned(),
            }],
        }
    }
}

/// Parses a `Content-Disposition` header value.
///
/// Never fails: malformed input degrades to an empty result (whole header
/// rejected) or to a result missing the offending parameter, with the reason
/// recorded in [`ContentDisposition::warnings`].
pub fn parse_content_disposition<'a>(header: impl Into<Option<&'a str>>) -> ContentDisposition {
    let Some(header) = header.into().filter(|value| !value.is_empty()) else {
        return ContentDisposition::default();
    };

    let mut segments = split_semicolon_aware(header).into_iter();
    let disposition_type = segments.next().unwrap_or_default();
    let disposition_type = disposition_type.trim();
    if !is_token(disposition_type) {
        return ContentDisposition::rejected(header);
    }

    let mut params = BTreeMap::new();
    let mut warnings = Vec::new();

    for item in segments {
        let Some((raw_key, raw_value)) = item.split_once('=') else {
            return ContentDisposition::rejected(header);
        };

        let key = raw_key.trim().to_ascii_lowercase();
        let value = raw_value.trim();

        if params.contains_key(&key) {
            return ContentDisposition::rejected(header);
        }

        let bad_param = || {
            #[cfg(feature = "tracing")]
            tracing::warn!(param = item.as_str(), "content-disposition: parameter dropped");

            DispositionWarning::BadContentDispositionParam {
                param: item.clone(),
            }
        };

        if !is_token(&key) {
            warnings.push(bad_param());
            continue;
        }

        let value = if is_continuous_param(&key) {
            if is_quoted(value) {
                unescape(&value[1..value.len() - 1])
            } else if is_token(value) {
                value.to_owned()
            } else {
                warnings.push(bad_param());
                continue;
            }
        } else if key.ends_with('*') {
            let decoded = is_rfc5987(value)
                .then(|| decode_extended_value(value))
                .flatten();
            match decoded {
                Some(decoded) => decoded,
                None => {
                    warnings.push(bad_param());
                    continue;
                }
            }
        } else if is_quoted(value) {
            unescape(value[1..value.len() - 1].trim_start_matches(['\\', '/']))
        } else if is_token(value) {
            value.to_owned()
        } else {
            return ContentDisposition::rejected(header);
        };

        params.insert(key, value);
    }

    ContentDisposition {
        disposition_type: Some(disposition_type.to_ascii_lowercase()),
        params,
        warnings,
    }
}

/// Extracts the file name from parsed `Content-Disposition` parameters.
///
/// `filename*` wins, then the `filename*0`, `filename*1`, ... continuation
/// (contiguous from zero, no leading zeros), then plain `filename`.
pub fn content_disposition_filename(params: &BTreeMap<String, String>) -> Option<String> {
    if let Some(value) = params.get("filename*") {
        return Some(value.clone());
    }

    let mut parts = Vec::new();
    for index in 0usize.. {
        let value = params
            .get(&format!("filename*{index}"))
            .or_else(|| params.get(&format!("filename*{index}*")));
        match value {
            Some(value) => parts.push(value.as_str()),
            None => break,
        }
    }

    if !parts.is_empty() {
        let joined = parts.concat();
        if joined.contains('\'') {
            return Some(decode_extended_value(&joined).unwrap_or(joined));
        }
        return Some(joined);
    }

    params.get("filename").cloned()
}

/// Decodes an RFC 2231 `charset'language'percent-encoded` value.
///
/// An empty charset means UTF-8. Returns `None` for unknown charsets or
/// bytes that are invalid in the declared charset.
pub(crate) fn decode_extended_value(value: &str) -> Option<String> {
    let mut pieces = value.splitn(3, '\'');
    let charset = pieces.next()?;
    let _language = pieces.next()?;
    let encoded = pieces.next()?;

    let encoding = if charset.is_empty() {
        encoding_rs::UTF_8
    } else {
        Encoding::for_label(charset.trim().as_bytes())?
    };

    let bytes: Cow<'_, [u8]> = percent_decode_str(encoded).into();
    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes)
        .map(Cow::into_owned)
}

/// Removes surrounding quotes (unescaping the quoted text) or stray quotes and spaces.
pub(crate) fn unquote(raw: &str) -> String {
    if is_quoted(raw) {
        return unescape(&raw[1..raw.len() - 1]);
    }
    raw.trim_matches(|c| c == ' ' || c == '"').to_owned()
}

/// Splits on `;` outside of quoted strings.
///
/// A backslash escapes the next character in and out of quotes, so `\"`
/// never opens or closes a quoted section.
pub(crate) fn split_semicolon_aware(value: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in value.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }

        match ch {
            '\\' => {
                current.push(ch);
                escaped = true;
            }
            '"' => {
                current.push(ch);
                in_quotes = !in_quotes;
            }
            ';' if !in_quotes => {
                segments.push(current);
                current = String::new();
            }
            _ => current.push(ch),
        }
    }

    segments.push(current);
    segments
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii() && !b.is_ascii_control() && !SEPARATORS.contains(&b))
}

fn is_quoted(value: &str) -> bool {
    value.len() >= 2 && value.starts_with('"') && value.ends_with('"')
}

fn is_rfc5987(value: &str) -> bool {
    is_token(value) && value.matches('\'').count() == 2
}

fn is_continuous_param(key: &str) -> bool {
    let Some((_, tail)) = key.split_once('*') else {
        return false;
    };
    let index = tail.strip_suffix('*').unwrap_or(tail);
    !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit())
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next_if(char::is_ascii) {
                out.push(next);
                continue;
            }
        }
        out.push(ch);
    }

    out
}
