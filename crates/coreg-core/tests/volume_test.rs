use coreg_core::filter::{binarize, threshold_mask, GaussianFilter, ResampleFilter};
use coreg_core::spatial::Point3;
use coreg_core::{BoundingBox, GradientField, Interpolation, Matrix44, Volume};

fn sphere(dims: usize, radius: f64) -> Volume {
    let c = (dims as f64 - 1.0) / 2.0;
    Volume::from_fn([dims; 3], |x, y, z| {
        let r = ((x as f64 - c).powi(2) + (y as f64 - c).powi(2) + (z as f64 - c).powi(2)).sqrt();
        if r <= radius { 100.0 } else { 0.0 }
    })
}

#[test]
fn test_sphere_background_and_bounds() {
    let v = sphere(21, 6.0);
    assert_eq!(v.background(), 0.0);
    assert_eq!(v.max_value(), 100.0);
    let b = BoundingBox::from_volume(&v, 50.0).unwrap();
    assert_eq!(b.center(), Point3::new([10.0, 10.0, 10.0]));
    assert_eq!(b.radius(), 6.0);
}

#[test]
fn test_gradient_points_inward_on_sphere() {
    let v = GaussianFilter::isotropic(1.0).apply(&sphere(21, 6.0));
    let g = GradientField::from_volume(&v);
    // on the +x side, intensity decreases outward
    let at = g.at(&Point3::new([16.0, 10.0, 10.0]));
    assert!(at[0] < 0.0);
    assert!(at[1].abs() < 1e-3);
}

#[test]
fn test_rotation_resample_keeps_sphere() {
    let v = sphere(21, 6.0);
    let c = v.center();
    let mut m = Matrix44::translation(-c[0], -c[1], -c[2]);
    m.rotate_z(37.0, coreg_core::MultiplySide::Left)
        .translate(c[0], c[1], c[2], coreg_core::MultiplySide::Left);
    let out = ResampleFilter::from_reference(&v, m)
        .with_interpolation(Interpolation::Nearest)
        .apply(&v);
    let before = binarize(&v, 50.0).count_above(0.5) as f64;
    let after = binarize(&out, 50.0).count_above(0.5) as f64;
    assert!((before - after).abs() / before < 0.05);
}

#[test]
fn test_threshold_mask_of_sphere() {
    let v = sphere(21, 6.0);
    let mask = threshold_mask(&v, 50.0, 1);
    assert_eq!(mask.get(10, 10, 10), 1.0);
    assert_eq!(mask.get(0, 0, 0), 0.0);
}
