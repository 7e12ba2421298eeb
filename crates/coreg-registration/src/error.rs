//! Error types for registration operations.
//!
//! Expected degenerate geometry (empty masks, all-background volumes, points
//! with no surface nearby) is never an error: objectives encode it as the
//! sentinel cost. These variants cover invalid construction and configuration.

use coreg_core::CoreError;
use thiserror::Error;

/// Main error type for registration operations.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Input that cannot be fitted at all.
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    /// Volumes or masks that must share dims do not.
    #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Parameter bounds or values outside their domain.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The same parameter tag was declared twice.
    #[error("Duplicate parameter: {0}")]
    DuplicateParameter(String),

    /// Numerical instability detected.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// Reader or writer failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// Error raised by the core data model.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for registration operations.
pub type Result<T> = std::result::Result<T, RegistrationError>;

impl RegistrationError {
    /// Create a degenerate input error.
    pub fn degenerate_input(msg: impl Into<String>) -> Self {
        Self::DegenerateInput(msg.into())
    }

    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::DimensionMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a duplicate parameter error.
    pub fn duplicate_parameter(msg: impl Into<String>) -> Self {
        Self::DuplicateParameter(msg.into())
    }

    /// Create a numerical instability error.
    pub fn numerical_instability(msg: impl Into<String>) -> Self {
        Self::NumericalInstability(msg.into())
    }

    /// Create an I/O error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = RegistrationError::invalid_configuration("test error");
        assert!(matches!(err, RegistrationError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_error_display() {
        let err = RegistrationError::duplicate_parameter("RotationX");
        assert_eq!(err.to_string(), "Duplicate parameter: RotationX");
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = RegistrationError::dimension_mismatch(&[10, 10, 10], &[5, 5, 5]);
        let err_str = err.to_string();
        assert!(err_str.contains("expected"));
        assert!(err_str.contains("got"));
    }

    #[test]
    fn test_core_error_conversion() {
        let err: RegistrationError = CoreError::invalid_argument("bad").into();
        assert!(matches!(err, RegistrationError::Core(_)));
        assert_eq!(err.to_string(), "Invalid argument: bad");
    }
}
