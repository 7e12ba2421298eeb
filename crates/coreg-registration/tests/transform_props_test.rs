use coreg_core::Point3;
use coreg_registration::objective::matrix_about;
use coreg_registration::{CoregistrationTransform, ParameterKind::*, ParameterVector};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_wrapper_edits_commute_across_factors(
        rx in -90.0f64..90.0, rz in -90.0f64..90.0,
        tx in -50.0f64..50.0, ty in -50.0f64..50.0,
        s in 0.5f64..2.0
    ) {
        let mut a = CoregistrationTransform::new();
        a.rotate_x(rx).translate_x(tx).scale(s).rotate_z(rz).translate_y(ty);
        let mut b = CoregistrationTransform::new();
        b.translate_y(ty).scale(s).translate_x(tx).rotate_x(rx).rotate_z(rz);
        prop_assert!(a.matrix().approx_eq(&b.matrix(), 1e-9));
    }

    #[test]
    fn test_pivot_lands_on_shifted_target(
        rx in -45.0f64..45.0, ry in -45.0f64..45.0, rz in -45.0f64..45.0,
        scale in 0.5f64..1.5,
        t in prop::array::uniform3(-20.0f64..20.0),
        from in prop::array::uniform3(-50.0f64..50.0),
        to in prop::array::uniform3(-50.0f64..50.0)
    ) {
        let params = ParameterVector::from_entries(vec![
            (TranslationX, t[0]),
            (TranslationY, t[1]),
            (TranslationZ, t[2]),
            (RotationX, rx),
            (RotationY, ry),
            (RotationZ, rz),
            (Scale, scale),
        ])
        .unwrap();
        let m = matrix_about(&params, &Point3::new(from), &Point3::new(to));
        let landed = m.apply(&Point3::new(from));
        for d in 0..3 {
            prop_assert!((landed[d] - (to[d] + t[d])).abs() < 1e-9);
        }
    }
}
