use std::collections::BTreeMap;

use super::disposition::{decode_extended_value, split_semicolon_aware, unquote};

/// A parsed MIME type: `type/subtype+suffix; name=value`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MimeType {
    /// Lowercased main type (`multipart`, `text`, ...).
    pub main_type: String,
    /// Lowercased subtype without the structured-syntax suffix.
    pub subtype: String,
    /// Lowercased structured-syntax suffix (`xml` for `rss+xml`).
    pub suffix: String,
    /// Parameters keyed by lowercased name; values keep their case.
    pub params: BTreeMap<String, String>,
}

impl MimeType {
    /// Returns `type/subtype` without suffix or parameters.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.subtype)
    }

    /// Returns a parameter value by (lowercase) name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Returns `true` for any `multipart/*` type.
    pub fn is_multipart(&self) -> bool {
        self.main_type == mime::MULTIPART.as_str()
    }
}

/// Parses a MIME type string into type, subtype, suffix and parameters.
///
/// Parsing is lenient: empty input yields an all-empty value and fragments
/// without a usable name are skipped.
pub fn parse_mimetype(mimetype: &str) -> MimeType {
    if mimetype.trim().is_empty() {
        return MimeType::default();
    }

    let mut segments = split_semicolon_aware(mimetype).into_iter();
    let full_type = segments
        .next()
        .map(|segment| segment.trim().to_ascii_lowercase())
        .unwrap_or_default();

    let mut params = BTreeMap::new();
    let mut extended = Vec::new();
    for segment in segments {
        let (raw_key, raw_value) = segment.split_once('=').unwrap_or((segment.as_str(), ""));
        let key = raw_key.trim().to_ascii_lowercase();
        if key.is_empty() {
            continue;
        }

        let value = unquote(raw_value.trim());
        match key.strip_suffix('*') {
            Some(base) if !base.is_empty() => match decode_extended_value(&value) {
                Some(decoded) => extended.push((base.to_owned(), decoded)),
                None => {
                    params.insert(key, value);
                }
            },
            _ => {
                params.insert(key, value);
            }
        }
    }
    // extended values win over their plain counterparts
    params.extend(extended);

    let full_type = if full_type == "*" {
        "*/*".to_owned()
    } else {
        full_type
    };
    let (main_type, rest) = full_type.split_once('/').unwrap_or((full_type.as_str(), ""));
    let (subtype, suffix) = rest.split_once('+').unwrap_or((rest, ""));

    MimeType {
        main_type: main_type.to_owned(),
        subtype: subtype.to_owned(),
        suffix: suffix.to_owned(),
        params,
    }
}
