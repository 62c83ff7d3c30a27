/// Size limits enforced while reading multipart framing and part headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum length in bytes of a single line inside a part header block.
    pub max_line_size: usize,
    /// Maximum length in bytes of one header field, continuation lines included.
    pub max_field_size: usize,
    /// Maximum number of header fields in one part header block.
    pub max_headers: usize,
    /// Maximum length of a `boundary` parameter (RFC 2046 caps it at 70).
    pub max_boundary_len: usize,
}

impl Limits {
    /// Default `max_line_size`.
    pub const DEFAULT_MAX_LINE_SIZE: usize = 8190;
    /// Default `max_field_size`.
    pub const DEFAULT_MAX_FIELD_SIZE: usize = 8190;
    /// Default `max_headers`.
    pub const DEFAULT_MAX_HEADERS: usize = 128;
    /// Default `max_boundary_len`.
    pub const DEFAULT_MAX_BOUNDARY_LEN: usize = 70;

    /// Creates the default limits configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Length of the longest boundary line these limits admit (`--` + boundary + `--` + CRLF).
    pub fn max_boundary_line(&self) -> usize {
        self.max_boundary_len + 6
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_line_size: Self::DEFAULT_MAX_LINE_SIZE,
            max_field_size: Self::DEFAULT_MAX_FIELD_SIZE,
            max_headers: Self::DEFAULT_MAX_HEADERS,
            max_boundary_len: Self::DEFAULT_MAX_BOUNDARY_LEN,
        }
    }
}
