use coreg_core::{Point3, Vector3, Volume};
use coreg_registration::objective::{VolumeFitConfig, VolumeFitMode};
use coreg_registration::{fit_volume_to_volume, FitOptions};

fn ellipsoid(center: [f64; 3], degrees: f64) -> Volume {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Volume::from_fn([28, 28, 28], |x, y, z| {
        let (dx, dy, dz) = (x as f64 - center[0], y as f64 - center[1], z as f64 - center[2]);
        let lx = dx * cos + dy * sin;
        let ly = -dx * sin + dy * cos;
        let rho = ((lx / 5.0).powi(2) + (ly / 8.0).powi(2) + (dz / 6.0).powi(2)).sqrt();
        (200.0 * (1.25 - rho)).clamp(0.0, 100.0) as f32
    })
}

#[test]
fn test_identical_volumes_stay_at_identity() {
    let volume = ellipsoid([14.0, 14.0, 14.0], 0.0);
    let outcome = fit_volume_to_volume(
        &volume,
        &volume,
        VolumeFitMode::Intensity,
        VolumeFitConfig::default(),
        &FitOptions::default(),
    )
    .unwrap();
    assert!(outcome.result.best_cost < 1e-6, "cost {}", outcome.result.best_cost);
    assert!(outcome.matrix.is_identity(1e-3), "matrix {:?}", outcome.matrix);
}

#[test]
fn test_shifted_volume_maps_centers() {
    let source = ellipsoid([11.0, 14.0, 14.0], 0.0);
    let target = ellipsoid([15.0, 13.0, 14.0], 0.0);
    let outcome = fit_volume_to_volume(
        &source,
        &target,
        VolumeFitMode::Intensity,
        VolumeFitConfig::default(),
        &FitOptions::default(),
    )
    .unwrap();
    let moved = outcome.matrix.apply(&Point3::new([11.0, 14.0, 14.0]));
    assert!(moved.distance(&Point3::new([15.0, 13.0, 14.0])) < 0.5, "center {moved:?}");
}

#[test]
fn test_turned_volume_recovers_rotation() {
    let source = ellipsoid([14.0, 14.0, 14.0], 10.0);
    let target = ellipsoid([14.0, 14.0, 14.0], 0.0);
    let outcome = fit_volume_to_volume(
        &source,
        &target,
        VolumeFitMode::Intensity,
        VolumeFitConfig::default(),
        &FitOptions::default(),
    )
    .unwrap();
    let (sin, cos) = 10f64.to_radians().sin_cos();
    let long_axis = Vector3::new([-sin, cos, 0.0]);
    let mapped = outcome.matrix.apply_vector(&long_axis).normalized().unwrap();
    assert!(mapped.dot(&Vector3::y_axis()).abs() > 3f64.to_radians().cos(), "axis {mapped:?}");
}
