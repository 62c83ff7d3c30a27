use crate::error::ParseError;

use super::mimetype::parse_mimetype;

/// Extracts and validates the `boundary` parameter from a multipart `Content-Type` value.
pub fn extract_boundary(content_type: &str, max_len: usize) -> Result<String, ParseError> {
    let mimetype = parse_mimetype(content_type);

    if !mimetype.is_multipart() {
        return Err(ParseError::new(format!(
            "multipart/* content type expected, got `{content_type}`"
        )));
    }

    let boundary = mimetype.param(mime::BOUNDARY.as_str()).ok_or_else(|| {
        ParseError::new(format!(
            "missing multipart boundary parameter for Content-Type: {content_type}"
        ))
    })?;

    validate_boundary(boundary, max_len)?;
    Ok(boundary.to_owned())
}

fn validate_boundary(boundary: &str, max_len: usize) -> Result<(), ParseError> {
    if boundary.is_empty() {
        return Err(ParseError::new("multipart boundary cannot be empty"));
    }

    if boundary.len() > max_len {
        return Err(ParseError::new(format!(
            "multipart boundary {boundary:?} is too long ({max_len} chars max)"
        )));
    }

    if boundary.contains(['\r', '\n']) {
        return Err(ParseError::new("multipart boundary cannot contain CRLF"));
    }

    Ok(())
}
