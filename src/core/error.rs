//! Error types for motion photo operations
//!
//! This module defines all error types used throughout the crate, together
//! with the coarse status taxonomy callers usually branch on.

use thiserror::Error;

/// Error types for motion photo operations
#[derive(Debug, Error)]
pub enum MphotoError {
    /// Malformed or inconsistent input (bad format, mismatched mime, bad length)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A metadata field is present but cannot be converted to its expected type
    #[error("Incorrect type: {0}")]
    IncorrectType(String),

    /// A required XMP node or attribute is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation invoked before its required setup
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// Parse error (XML parsing failed)
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Bad XPath expression
    #[error("Bad XPath: {0}")]
    BadXPath(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Internal error (should not occur in normal operation)
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Known capability gap
    #[error("Unimplemented: {0}")]
    Unimplemented(String),
}

/// Coarse classification of an [`MphotoError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    FailedPrecondition,
    Internal,
    Unimplemented,
}

impl MphotoError {
    /// Get the status kind of this error.
    ///
    /// `IncorrectType` and `ParseError` are reported as `InvalidArgument`:
    /// both describe input that is present but unusable.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MphotoError::InvalidArgument(_)
            | MphotoError::IncorrectType(_)
            | MphotoError::ParseError(_) => ErrorKind::InvalidArgument,
            MphotoError::NotFound(_) => ErrorKind::NotFound,
            MphotoError::FailedPrecondition(_) => ErrorKind::FailedPrecondition,
            MphotoError::BadXPath(_) | MphotoError::IoError(_) | MphotoError::InternalError(_) => {
                ErrorKind::Internal
            }
            MphotoError::Unimplemented(_) => ErrorKind::Unimplemented,
        }
    }

    /// Check if this error reports a field of the wrong type
    pub fn is_incorrect_type(&self) -> bool {
        matches!(self, MphotoError::IncorrectType(_))
    }
}

/// Result type alias for motion photo operations
pub type MphotoResult<T> = Result<T, MphotoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MphotoError::NotFound("Camera:MotionPhotoVersion".to_string());
        assert!(err
            .to_string()
            .contains("Not found: Camera:MotionPhotoVersion"));
    }

    #[test]
    fn test_incorrect_type_is_invalid_argument() {
        let err = MphotoError::IncorrectType("latest".to_string());
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.is_incorrect_type());
        assert!(!MphotoError::InvalidArgument("x".into()).is_incorrect_type());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MphotoError = io_err.into();
        assert!(matches!(err, MphotoError::IoError(_)));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
