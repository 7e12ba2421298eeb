//! Spacing type for representing physical distances between voxels.

use super::Vector;

/// Spacing between adjacent voxels along each axis.
///
/// This is a type alias to Vector for semantic clarity.
pub type Spacing<const D: usize> = Vector<D>;

impl<const D: usize> Spacing<D> {
    /// Create uniform spacing (same value for all dimensions).
    pub fn uniform(value: f64) -> Self {
        let mut spacing = Vector::zeros();
        for i in 0..D {
            spacing[i] = value;
        }
        spacing
    }

    /// Check if spacing is uniform (all components equal).
    pub fn is_uniform(&self) -> bool {
        if D == 0 {
            return true;
        }
        let first = self[0];
        (1..D).all(|i| (self[i] - first).abs() < 1e-9)
    }

    /// Get the minimum spacing value.
    pub fn min_spacing(&self) -> f64 {
        (0..D).map(|i| self[i]).fold(f64::INFINITY, f64::min)
    }

    /// Get the maximum spacing value.
    pub fn max_spacing(&self) -> f64 {
        (0..D).map(|i| self[i]).fold(f64::NEG_INFINITY, f64::max)
    }

    /// Arithmetic mean of the components.
    pub fn mean_spacing(&self) -> f64 {
        if D == 0 {
            return 0.0;
        }
        (0..D).map(|i| self[i]).sum::<f64>() / D as f64
    }

    /// Product of the components (voxel volume for D = 3).
    pub fn cell_volume(&self) -> f64 {
        (0..D).map(|i| self[i]).product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Spacing3 = Spacing<3>;

    #[test]
    fn test_spacing_uniform() {
        let s = Spacing3::uniform(1.5);
        assert!(s.is_uniform());
        assert_eq!(s.cell_volume(), 1.5 * 1.5 * 1.5);
    }

    #[test]
    fn test_spacing_min_max_mean() {
        let s = Spacing3::new([1.0, 2.0, 3.0]);
        assert!(!s.is_uniform());
        assert_eq!(s.min_spacing(), 1.0);
        assert_eq!(s.max_spacing(), 3.0);
        assert_eq!(s.mean_spacing(), 2.0);
    }
}
