//! Error types for core data operations.

use thiserror::Error;

/// Errors raised by volume, point set and transform construction.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Buffer length or shape does not match the declared dimensions.
    #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// An operation required a non-empty volume.
    #[error("Empty volume: {0}")]
    EmptyVolume(String),

    /// Argument outside its valid domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Matrix could not be inverted.
    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    /// Underlying reader or writer failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// Malformed file content.
    #[error("Format error: {0}")]
    Format(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::DimensionMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a singular matrix error.
    pub fn singular_matrix(msg: impl Into<String>) -> Self {
        Self::SingularMatrix(msg.into())
    }

    /// Create an I/O error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Create a format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
