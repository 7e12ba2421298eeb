//! Assembly of 4×4 matrices from transform parameters.

use coreg_core::{Axis, Matrix44, MultiplySide, Point3};

use crate::optimizer::ParameterKind::{self, *};
use crate::optimizer::ParameterVector;

const SHEARS: [(ParameterKind, Axis, Axis); 6] = [
    (ShearXtoY, Axis::X, Axis::Y),
    (ShearXtoZ, Axis::X, Axis::Z),
    (ShearYtoX, Axis::Y, Axis::X),
    (ShearYtoZ, Axis::Y, Axis::Z),
    (ShearZtoX, Axis::Z, Axis::X),
    (ShearZtoY, Axis::Z, Axis::Y),
];

/// Linear part: shears, then scales, then rotations about X, Y and Z.
/// Absent parameters contribute the identity.
pub fn linear_matrix(params: &ParameterVector) -> Matrix44 {
    let left = MultiplySide::Left;
    let mut m = Matrix44::identity();
    for (kind, from, to) in SHEARS {
        if let Some(factor) = params.get(kind) {
            m.shear(from, to, factor, left);
        }
    }
    let s = params.value(Scale);
    m.scale(
        s * params.value(ScaleX),
        s * params.value(ScaleY),
        s * params.value(ScaleZ),
        left,
    )
    .rotate_x(params.value(RotationX), left)
    .rotate_y(params.value(RotationY), left)
    .rotate_z(params.value(RotationZ), left);
    m
}

/// `T(to + t) · L · T(-from)`: the linear part acts about `from`, which
/// lands on `to` before the parameter translation.
pub fn matrix_about(params: &ParameterVector, from: &Point3, to: &Point3) -> Matrix44 {
    let left = MultiplySide::Left;
    let mut m = Matrix44::translation(-from[0], -from[1], -from[2]);
    m.multiply(&linear_matrix(params), left).translate(
        to[0] + params.value(TranslationX),
        to[1] + params.value(TranslationY),
        to[2] + params.value(TranslationZ),
        left,
    );
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(entries: &[(ParameterKind, f64)]) -> ParameterVector {
        ParameterVector::from_entries(entries.to_vec()).unwrap()
    }

    #[test]
    fn test_empty_vector_is_identity() {
        let m = matrix_about(&vector(&[]), &Point3::new([1.0, 2.0, 3.0]), &Point3::new([1.0, 2.0, 3.0]));
        assert!(m.is_identity(1e-12));
    }

    #[test]
    fn test_rotation_about_center() {
        let c = Point3::new([10.0, 0.0, 0.0]);
        let m = matrix_about(&vector(&[(RotationZ, 90.0)]), &c, &c);
        let p = m.apply(&Point3::new([11.0, 0.0, 0.0]));
        assert!(p.distance(&Point3::new([10.0, 1.0, 0.0])) < 1e-9);
        assert!(m.apply(&c).distance(&c) < 1e-9);
    }

    #[test]
    fn test_scale_then_translate() {
        let origin = Point3::origin();
        let m = matrix_about(&vector(&[(Scale, 2.0), (ScaleX, 1.5), (TranslationY, 4.0)]), &origin, &origin);
        let p = m.apply(&Point3::new([1.0, 1.0, 1.0]));
        assert!(p.distance(&Point3::new([3.0, 6.0, 2.0])) < 1e-12);
    }

    #[test]
    fn test_shear_moves_target_axis() {
        let m = linear_matrix(&vector(&[(ShearXtoY, 0.5)]));
        let p = m.apply(&Point3::new([2.0, 0.0, 0.0]));
        assert!(p.distance(&Point3::new([2.0, 1.0, 0.0])) < 1e-12);
    }
}
