//! Direction type for representing volume orientation.

use nalgebra::SMatrix;
use serde::{Deserialize, Serialize};
use super::Vector;

/// Direction matrix representing volume orientation.
///
/// Column i is the direction of the i-th volume axis in physical space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction<const D: usize>(pub SMatrix<f64, D, D>);

impl<const D: usize> Direction<D> {
    /// Create an identity direction matrix (no rotation).
    pub fn identity() -> Self {
        Self(SMatrix::identity())
    }

    /// Build from column vectors.
    pub fn from_columns(columns: [Vector<D>; D]) -> Self {
        let cols: Vec<_> = columns.iter().map(|c| c.0).collect();
        Self(SMatrix::from_columns(&cols))
    }

    /// Check if direction matrix is orthogonal (rotation or reflection).
    pub fn is_orthogonal(&self) -> bool {
        let product = self.0 * self.0.transpose();
        (0..D).all(|i| {
            (0..D).all(|j| {
                let expected = if i == j { 1.0 } else { 0.0 };
                (product[(i, j)] - expected).abs() < 1e-6
            })
        })
    }

    /// Try to compute the inverse of the direction matrix.
    pub fn try_inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }
}

impl Direction<3> {
    /// Determinant of the direction matrix; negative for a reflection.
    pub fn determinant(&self) -> f64 {
        self.0.determinant()
    }
}

impl<const D: usize> Default for Direction<D> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<const D: usize> std::ops::Index<(usize, usize)> for Direction<D> {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::Mul<Vector<D>> for Direction<D> {
    type Output = Vector<D>;

    fn mul(self, vector: Vector<D>) -> Self::Output {
        Vector(self.0 * vector.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Direction3 = Direction<3>;
    type Vector3 = Vector<3>;

    #[test]
    fn test_direction_identity() {
        let d = Direction3::identity();
        assert!(d.is_orthogonal());
        assert_eq!(d.determinant(), 1.0);
    }

    #[test]
    fn test_direction_from_columns() {
        let d = Direction3::from_columns([
            Vector3::new([0.0, 1.0, 0.0]),
            Vector3::new([-1.0, 0.0, 0.0]),
            Vector3::new([0.0, 0.0, 1.0]),
        ]);
        assert!(d.is_orthogonal());
        let v = d * Vector3::new([1.0, 0.0, 0.0]);
        assert_eq!(v, Vector3::new([0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_direction_reflection_is_orthogonal() {
        let mut d = Direction3::identity();
        d.0[(0, 0)] = -1.0;
        assert!(d.is_orthogonal());
        assert!(d.determinant() < 0.0);
    }
}
