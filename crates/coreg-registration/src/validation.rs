//! Validation helpers shared by the config structs and fit entry points.

use coreg_core::Volume;

use crate::error::{RegistrationError, Result};

/// Validate the requested and outlier precisions of a solve call.
///
/// Both are relative step sizes in `(0, 1]`; trimming must switch on no
/// later than convergence, so `outliers_precision >= requested_precision`.
pub fn validate_precision(requested: f64, outliers: f64) -> Result<()> {
    if !(requested.is_finite() && requested > 0.0 && requested <= 1.0) {
        return Err(RegistrationError::invalid_configuration(format!(
            "requested precision must be in (0, 1], got {}",
            requested
        )));
    }
    if !(outliers.is_finite() && outliers > 0.0 && outliers <= 1.0) {
        return Err(RegistrationError::invalid_configuration(format!(
            "outliers precision must be in (0, 1], got {}",
            outliers
        )));
    }
    if outliers < requested {
        return Err(RegistrationError::invalid_configuration(format!(
            "outliers precision ({}) must not be below requested precision ({})",
            outliers, requested
        )));
    }
    Ok(())
}

/// Validate iteration count.
pub fn validate_iterations(iterations: usize) -> Result<()> {
    if iterations == 0 {
        return Err(RegistrationError::invalid_configuration(
            "Iterations must be positive",
        ));
    }

    if iterations > 1_000_000 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Iterations too large: {}",
            iterations
        )));
    }

    Ok(())
}

/// Validate a factor that must lie strictly inside `(0, 1)`.
pub fn validate_unit_factor(name: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0 && value < 1.0) {
        return Err(RegistrationError::invalid_configuration(format!(
            "{} must be in (0, 1), got {}",
            name, value
        )));
    }
    Ok(())
}

/// Validate a strictly positive finite value.
pub fn validate_positive(name: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(RegistrationError::invalid_configuration(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Validate parameter bounds.
pub fn validate_bounds(name: &str, min: f64, max: f64) -> Result<()> {
    if !(min.is_finite() && max.is_finite()) || min > max {
        return Err(RegistrationError::invalid_parameter(format!(
            "{}: invalid bounds [{}, {}]",
            name, min, max
        )));
    }
    Ok(())
}

/// Validate that a volume and its mask share dims.
pub fn validate_same_dims(volume: &Volume, mask: &Volume) -> Result<()> {
    if volume.dims() != mask.dims() {
        return Err(RegistrationError::dimension_mismatch(&volume.dims(), &mask.dims()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_precision() {
        assert!(validate_precision(1e-3, 1e-2).is_ok());
        assert!(validate_precision(0.0, 1e-2).is_err());
        assert!(validate_precision(1e-2, 1e-3).is_err());
        assert!(validate_precision(1e-3, f64::NAN).is_err());
    }

    #[test]
    fn test_validate_iterations() {
        assert!(validate_iterations(100).is_ok());
        assert!(validate_iterations(0).is_err());
        assert!(validate_iterations(2_000_000).is_err());
    }

    #[test]
    fn test_validate_bounds() {
        assert!(validate_bounds("RotationX", -10.0, 10.0).is_ok());
        assert!(validate_bounds("RotationX", 0.0, 0.0).is_ok());
        assert!(matches!(
            validate_bounds("RotationX", 1.0, -1.0),
            Err(RegistrationError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_validate_same_dims() {
        let a = Volume::new([4, 4, 4]);
        let b = Volume::new([4, 4, 5]);
        assert!(validate_same_dims(&a, &a).is_ok());
        assert!(matches!(
            validate_same_dims(&a, &b),
            Err(RegistrationError::DimensionMismatch { .. })
        ));
    }
}
