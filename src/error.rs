//! Error types for compositing operations

use thiserror::Error;

/// Result type alias for compositing operations
pub type Result<T> = std::result::Result<T, CompositeError>;

/// Error types for compositing operations
///
/// The pure compositing pipeline only ever returns [`CompositeError::DimensionMismatch`]
/// (and [`CompositeError::InvalidConfig`] when a request fails validation). The
/// remaining variants come from the file I/O and batch layers.
#[derive(Error, Debug)]
pub enum CompositeError {
    /// Original and background-removed images differ in size
    #[error(
        "Dimension mismatch: original is {}x{} but background-removed image is {}x{}",
        original.0,
        original.1,
        removed.0,
        removed.1
    )]
    DimensionMismatch {
        /// Original image dimensions (width, height)
        original: (u32, u32),
        /// Background-removed image dimensions (width, height)
        removed: (u32, u32),
    },

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unsupported file format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Batch scheduling or worker errors
    #[error("Processing error: {0}")]
    Processing(String),
}

impl CompositeError {
    /// Create a dimension mismatch error
    #[must_use]
    pub fn dimension_mismatch(original: (u32, u32), removed: (u32, u32)) -> Self {
        Self::DimensionMismatch { original, removed }
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(format: S) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Whether this error is a violated input precondition rather than an
    /// environmental failure
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. } | Self::InvalidConfig(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = CompositeError::invalid_config("test config error");
        assert!(matches!(err, CompositeError::InvalidConfig(_)));

        let err = CompositeError::unsupported_format("bmp");
        assert!(matches!(err, CompositeError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = CompositeError::dimension_mismatch((500, 500), (400, 400));
        assert_eq!(
            err.to_string(),
            "Dimension mismatch: original is 500x500 but background-removed image is 400x400"
        );
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_enhanced_error_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = CompositeError::file_io_error("read image file", Path::new("/tmp/a.png"), &io_error);
        let error_string = err.to_string();
        assert!(error_string.contains("read image file"));
        assert!(error_string.contains("/tmp/a.png"));
        assert!(!err.is_invalid_input());

        let err = CompositeError::config_value_error("near-white threshold", 300, "0-255", Some(240));
        let error_string = err.to_string();
        assert!(error_string.contains("near-white threshold"));
        assert!(error_string.contains("300"));
        assert!(error_string.contains("Recommended: 240"));
    }
}
