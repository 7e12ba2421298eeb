//! 4×4 homogeneous matrix with explicit multiplication side.
//!
//! Every compound operation takes a [`MultiplySide`]:
//!
//! * [`MultiplySide::Left`] computes `M = Op * M`: the new operation is
//!   applied *after* the transforms already accumulated in `M`.
//! * [`MultiplySide::Right`] computes `M = M * Op`: the new operation is
//!   applied *before* them.
//!
//! Points are column vectors, angles are in degrees.

use nalgebra::{Matrix4, Vector4};
use serde::{Deserialize, Serialize};

use super::trait_::Transform;
use crate::error::{CoreError, Result};
use crate::spatial::{Axis, Point3, Vector3};

/// Side on which a new operation is multiplied into an accumulated matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MultiplySide {
    /// `M = Op * M`
    Left,
    /// `M = M * Op`
    Right,
}

/// Homogeneous 4×4 transform matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix44(pub Matrix4<f64>);

impl Default for Matrix44 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix44 {
    pub fn identity() -> Self {
        Self(Matrix4::identity())
    }

    /// Build from row-major rows.
    pub fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        let mut m = Matrix4::zeros();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                m[(r, c)] = *value;
            }
        }
        Self(m)
    }

    /// Row-major copy of the coefficients.
    pub fn to_rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = self.0[(r, c)];
            }
        }
        rows
    }

    pub fn translation(tx: f64, ty: f64, tz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = tx;
        m[(1, 3)] = ty;
        m[(2, 3)] = tz;
        Self(m)
    }

    pub fn scaling(sx: f64, sy: f64, sz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 0)] = sx;
        m[(1, 1)] = sy;
        m[(2, 2)] = sz;
        Self(m)
    }

    /// Rotation around an axis by `degrees`, right-handed.
    pub fn rotation(axis: Axis, degrees: f64) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        let (a, b) = match axis {
            Axis::X => (1, 2),
            Axis::Y => (2, 0),
            Axis::Z => (0, 1),
        };
        let mut m = Matrix4::identity();
        m[(a, a)] = c;
        m[(a, b)] = -s;
        m[(b, a)] = s;
        m[(b, b)] = c;
        Self(m)
    }

    pub fn rotation_x(degrees: f64) -> Self {
        Self::rotation(Axis::X, degrees)
    }

    pub fn rotation_y(degrees: f64) -> Self {
        Self::rotation(Axis::Y, degrees)
    }

    pub fn rotation_z(degrees: f64) -> Self {
        Self::rotation(Axis::Z, degrees)
    }

    /// Shear adding `factor * coord[from]` to `coord[to]`.
    pub fn shearing(from: Axis, to: Axis, factor: f64) -> Self {
        let mut m = Matrix4::identity();
        if from != to {
            m[(to.index(), from.index())] = factor;
        }
        Self(m)
    }

    pub fn set_identity(&mut self) -> &mut Self {
        self.0 = Matrix4::identity();
        self
    }

    /// Multiply `other` into this matrix on the given side.
    pub fn multiply(&mut self, other: &Matrix44, side: MultiplySide) -> &mut Self {
        self.0 = match side {
            MultiplySide::Left => other.0 * self.0,
            MultiplySide::Right => self.0 * other.0,
        };
        self
    }

    pub fn translate(&mut self, tx: f64, ty: f64, tz: f64, side: MultiplySide) -> &mut Self {
        self.multiply(&Self::translation(tx, ty, tz), side)
    }

    pub fn translate_x(&mut self, t: f64, side: MultiplySide) -> &mut Self {
        self.translate(t, 0.0, 0.0, side)
    }

    pub fn translate_y(&mut self, t: f64, side: MultiplySide) -> &mut Self {
        self.translate(0.0, t, 0.0, side)
    }

    pub fn translate_z(&mut self, t: f64, side: MultiplySide) -> &mut Self {
        self.translate(0.0, 0.0, t, side)
    }

    pub fn rotate_x(&mut self, degrees: f64, side: MultiplySide) -> &mut Self {
        self.multiply(&Self::rotation_x(degrees), side)
    }

    pub fn rotate_y(&mut self, degrees: f64, side: MultiplySide) -> &mut Self {
        self.multiply(&Self::rotation_y(degrees), side)
    }

    pub fn rotate_z(&mut self, degrees: f64, side: MultiplySide) -> &mut Self {
        self.multiply(&Self::rotation_z(degrees), side)
    }

    /// Per-axis scaling.
    pub fn scale(&mut self, sx: f64, sy: f64, sz: f64, side: MultiplySide) -> &mut Self {
        self.multiply(&Self::scaling(sx, sy, sz), side)
    }

    /// Same scaling factor on all three axes.
    pub fn scale_uniform(&mut self, factor: f64, side: MultiplySide) -> &mut Self {
        self.scale(factor, factor, factor, side)
    }

    pub fn scale_x(&mut self, factor: f64, side: MultiplySide) -> &mut Self {
        self.scale(factor, 1.0, 1.0, side)
    }

    pub fn scale_y(&mut self, factor: f64, side: MultiplySide) -> &mut Self {
        self.scale(1.0, factor, 1.0, side)
    }

    pub fn scale_z(&mut self, factor: f64, side: MultiplySide) -> &mut Self {
        self.scale(1.0, 1.0, factor, side)
    }

    pub fn shear(&mut self, from: Axis, to: Axis, factor: f64, side: MultiplySide) -> &mut Self {
        self.multiply(&Self::shearing(from, to, factor), side)
    }

    /// Shift x proportionally to y.
    pub fn shear_x(&mut self, factor: f64, side: MultiplySide) -> &mut Self {
        self.shear(Axis::Y, Axis::X, factor, side)
    }

    /// Shift y proportionally to z.
    pub fn shear_y(&mut self, factor: f64, side: MultiplySide) -> &mut Self {
        self.shear(Axis::Z, Axis::Y, factor, side)
    }

    /// Shift z proportionally to x.
    pub fn shear_z(&mut self, factor: f64, side: MultiplySide) -> &mut Self {
        self.shear(Axis::X, Axis::Z, factor, side)
    }

    /// Inverse matrix, `None` when singular.
    pub fn inverse(&self) -> Option<Matrix44> {
        self.0.try_inverse().map(Matrix44)
    }

    /// Invert in place.
    pub fn invert(&mut self) -> Result<&mut Self> {
        let inv = self
            .inverse()
            .ok_or_else(|| CoreError::singular_matrix(format!("{:?}", self.to_rows())))?;
        *self = inv;
        Ok(self)
    }

    /// Apply to a point (w = 1), with perspective division when the last row is not affine.
    pub fn apply(&self, point: &Point3) -> Point3 {
        let v = self.0 * Vector4::new(point[0], point[1], point[2], 1.0);
        let w = if v[3] == 0.0 || v[3] == 1.0 { 1.0 } else { v[3] };
        Point3::new([v[0] / w, v[1] / w, v[2] / w])
    }

    /// Apply the linear part to a direction (w = 0).
    pub fn apply_vector(&self, vector: &Vector3) -> Vector3 {
        let v = self.0 * Vector4::new(vector[0], vector[1], vector[2], 0.0);
        Vector3::new([v[0], v[1], v[2]])
    }

    pub fn translation_part(&self) -> Vector3 {
        Vector3::new([self.0[(0, 3)], self.0[(1, 3)], self.0[(2, 3)]])
    }

    /// Determinant of the upper-left 3×3 block.
    pub fn linear_determinant(&self) -> f64 {
        self.0.fixed_view::<3, 3>(0, 0).determinant()
    }

    pub fn approx_eq(&self, other: &Matrix44, tolerance: f64) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    pub fn is_identity(&self, tolerance: f64) -> bool {
        self.approx_eq(&Self::identity(), tolerance)
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl std::ops::Mul for Matrix44 {
    type Output = Matrix44;

    fn mul(self, rhs: Matrix44) -> Matrix44 {
        Matrix44(self.0 * rhs.0)
    }
}

impl Transform for Matrix44 {
    fn transform_point(&self, point: &Point3) -> Point3 {
        self.apply(point)
    }

    fn inverse(&self) -> Option<Box<dyn Transform>> {
        Matrix44::inverse(self).map(|m| Box::new(m) as Box<dyn Transform>)
    }
}
