use crate::{error::ConfigError, limits::Limits};

/// Default size of a single chunk produced by length-bounded part reads.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Top-level reader configuration model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Chunk size used by `read`/`release` on parts with a declared length.
    pub chunk_size: usize,
    /// Framing and header limits.
    pub limits: Limits,
}

impl ReaderConfig {
    /// Creates a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates all configured values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("chunk_size", self.chunk_size),
            ("max_line_size", self.limits.max_line_size),
            ("max_field_size", self.limits.max_field_size),
            ("max_headers", self.limits.max_headers),
            ("max_boundary_len", self.limits.max_boundary_len),
        ];

        for (limit, value) in checks {
            if value == 0 {
                return Err(ConfigError::InvalidLimitValue { limit });
            }
        }

        let boundary_line = self.limits.max_boundary_line();
        if self.limits.max_line_size < boundary_line {
            return Err(ConfigError::LineSizeBelowBoundary {
                max_line_size: self.limits.max_line_size,
                boundary_line,
            });
        }

        Ok(())
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            limits: Limits::default(),
        }
    }
}
