//! Vector type for representing spatial displacements and directions.

use nalgebra::SVector;
use serde::{Deserialize, Serialize};

/// A vector in D-dimensional space.
///
/// Vectors represent displacements, search directions, gradients and spacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector<const D: usize>(pub SVector<f64, D>);

impl<const D: usize> Vector<D> {
    /// Create a new vector from components.
    pub fn new(components: [f64; D]) -> Self {
        Self(SVector::from(components))
    }

    /// Create a zero vector.
    pub fn zeros() -> Self {
        Self(SVector::zeros())
    }

    /// Convert vector to an array of components.
    pub fn to_array(&self) -> [f64; D] {
        let mut out = [0.0; D];
        for (i, value) in out.iter_mut().enumerate() {
            *value = self.0[i];
        }
        out
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.0.norm()
    }

    /// Dot product.
    pub fn dot(&self, other: &Self) -> f64 {
        self.0.dot(&other.0)
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector.
    pub fn normalized(&self) -> Option<Self> {
        let norm = self.norm();
        if norm < crate::EPSILON {
            None
        } else {
            Some(Self(self.0 / norm))
        }
    }
}

impl Vector<3> {
    /// Unit vector along x.
    pub fn x_axis() -> Self {
        Self::new([1.0, 0.0, 0.0])
    }

    /// Unit vector along y.
    pub fn y_axis() -> Self {
        Self::new([0.0, 1.0, 0.0])
    }

    /// Unit vector along z.
    pub fn z_axis() -> Self {
        Self::new([0.0, 0.0, 1.0])
    }
}

impl<const D: usize> std::ops::Index<usize> for Vector<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Vector<D> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const D: usize> std::ops::Add for Vector<D> {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self(self.0 + other.0)
    }
}

impl<const D: usize> std::ops::Sub for Vector<D> {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self(self.0 - other.0)
    }
}

impl<const D: usize> std::ops::Mul<f64> for Vector<D> {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self(self.0 * scalar)
    }
}

impl<const D: usize> std::ops::Div<f64> for Vector<D> {
    type Output = Self;

    fn div(self, scalar: f64) -> Self::Output {
        Self(self.0 / scalar)
    }
}

impl<const D: usize> std::ops::Neg for Vector<D> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Vector3 = Vector<3>;

    #[test]
    fn test_vector_arithmetic() {
        let v1 = Vector3::new([1.0, 2.0, 3.0]);
        let v2 = Vector3::new([4.0, 5.0, 6.0]);

        assert_eq!(v1 + v2, Vector3::new([5.0, 7.0, 9.0]));
        assert_eq!(v2 - v1, Vector3::new([3.0, 3.0, 3.0]));
        assert_eq!(v1 * 2.0, Vector3::new([2.0, 4.0, 6.0]));
        assert_eq!(v2 / 2.0, Vector3::new([2.0, 2.5, 3.0]));
        assert_eq!(-v1, Vector3::new([-1.0, -2.0, -3.0]));
        assert_eq!(v1.dot(&v2), 32.0);
    }

    #[test]
    fn test_vector_normalized() {
        let v = Vector3::new([0.0, 3.0, 4.0]);
        let u = v.normalized().unwrap();
        assert!((u.norm() - 1.0).abs() < 1e-12);
        assert!(Vector3::zeros().normalized().is_none());
    }
}
