use coreg_core::spatial::Point3;
use coreg_core::{Matrix44, MultiplySide, Transform};
use proptest::prelude::*;

fn build(rx: f64, ry: f64, rz: f64, s: [f64; 3], t: [f64; 3], side: MultiplySide) -> Matrix44 {
    let mut m = Matrix44::identity();
    m.scale(s[0], s[1], s[2], side)
        .rotate_x(rx, side)
        .rotate_y(ry, side)
        .rotate_z(rz, side)
        .translate(t[0], t[1], t[2], side);
    m
}

proptest! {
    #[test]
    fn test_apply_inverse_round_trip(
        rx in -180.0f64..180.0, ry in -180.0f64..180.0, rz in -180.0f64..180.0,
        sx in 0.2f64..5.0, sy in 0.2f64..5.0, sz in 0.2f64..5.0,
        tx in -100.0f64..100.0, ty in -100.0f64..100.0, tz in -100.0f64..100.0,
        px in -100.0f64..100.0, py in -100.0f64..100.0, pz in -100.0f64..100.0,
        left in any::<bool>()
    ) {
        let side = if left { MultiplySide::Left } else { MultiplySide::Right };
        let m = build(rx, ry, rz, [sx, sy, sz], [tx, ty, tz], side);
        let inv = m.inverse().unwrap();
        let p = Point3::new([px, py, pz]);
        let back = m.apply(&inv.apply(&p));
        for i in 0..3 {
            prop_assert!((back[i] - p[i]).abs() < 1e-6);
        }
        prop_assert!((m * inv).is_identity(1e-9));
    }

    #[test]
    fn test_shear_round_trip(
        f in -2.0f64..2.0,
        px in -10.0f64..10.0, py in -10.0f64..10.0, pz in -10.0f64..10.0
    ) {
        let mut m = Matrix44::identity();
        m.shear_x(f, MultiplySide::Left).shear_y(-f, MultiplySide::Left).shear_z(0.5 * f, MultiplySide::Right);
        let mut inv = m;
        inv.invert().unwrap();
        let p = Point3::new([px, py, pz]);
        let back = inv.apply(&m.apply(&p));
        for i in 0..3 {
            prop_assert!((back[i] - p[i]).abs() < 1e-6);
        }
    }
}

#[test]
fn test_multiply_side_changes_result() {
    let mut left = Matrix44::identity();
    left.rotate_z(30.0, MultiplySide::Left).translate(10.0, 0.0, 0.0, MultiplySide::Left);

    let mut right = Matrix44::identity();
    right.rotate_z(30.0, MultiplySide::Right).translate(10.0, 0.0, 0.0, MultiplySide::Right);

    assert!(!left.approx_eq(&right, 1e-6));

    // Left: rotate, then translate
    let p = left.apply(&Point3::new([0.0, 0.0, 0.0]));
    assert!((p[0] - 10.0).abs() < 1e-9);
    // Right: translate, then rotate
    let q = right.apply(&Point3::new([0.0, 0.0, 0.0]));
    assert!((q[0] - 10.0 * 30f64.to_radians().cos()).abs() < 1e-9);
    assert!((q[1] - 10.0 * 30f64.to_radians().sin()).abs() < 1e-9);
}

#[test]
fn test_transform_trait_object() {
    let m = Matrix44::translation(1.0, 2.0, 3.0);
    let t: &dyn Transform = &m;
    let inv = t.inverse().unwrap();
    let p = Point3::new([4.0, 5.0, 6.0]);
    let back = inv.transform_point(&t.transform_point(&p));
    assert!(back.distance(&p) < 1e-12);
    assert_eq!(t.transform_points(&[p]).len(), 1);
}
