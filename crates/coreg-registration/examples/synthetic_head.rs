//! Synthetic Head Example
//!
//! Builds a tilted ellipsoidal "head", then:
//!
//! 1. Finds its mid-sagittal plane
//! 2. Fits a ring of electrodes onto the scalp
//! 3. Glues the fitted electrodes to the surface with a small margin
//!
//! Usage:
//!   cargo run --example synthetic_head

use coreg_core::{Point3, PointSet, Statistics, Volume};
use coreg_registration::objective::{PointsFitConfig, SelfFitConfig, SelfFitMode};
use coreg_registration::{
    find_sagittal_plane, fit_points_to_volume, ConsoleProgressCallback, CoregistrationTransform, FitOptions,
    ProgressTracker,
};
use std::sync::Arc;

fn head() -> Volume {
    let (sin, cos) = 6f64.to_radians().sin_cos();
    Volume::from_fn([40, 48, 40], |x, y, z| {
        let (dx, dy, dz) = (x as f64 - 20.0, y as f64 - 24.0, z as f64 - 20.0);
        let lx = dx * cos + dy * sin;
        let ly = -dx * sin + dy * cos;
        let rho = ((lx / 14.0).powi(2) + (ly / 18.0).powi(2) + (dz / 15.0).powi(2)).sqrt();
        (300.0 * (1.1 - rho)).clamp(0.0, 100.0) as f32
    })
}

fn electrodes() -> PointSet {
    let mut points = PointSet::new();
    for i in 0..16 {
        let theta = i as f64 * std::f64::consts::TAU / 16.0;
        points.push(Point3::new([21.5 + 17.0 * theta.cos(), 23.0 + 21.0 * theta.sin(), 26.0]));
    }
    points
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let volume = head();
    let progress = ProgressTracker::new().with_callback(Arc::new(ConsoleProgressCallback::new(20)));
    let options = FitOptions::new().with_progress(progress);

    println!("Step 1: mid-sagittal plane");
    let sagittal = find_sagittal_plane(&volume, SelfFitMode::Sagittal, SelfFitConfig::default(), &options)?;
    println!("  cost {:.5} after {} iterations", sagittal.result.best_cost, sagittal.result.iterations);
    println!("  plane origin {:?}", sagittal.matrix.translation_part());

    println!("Step 2: electrodes to scalp");
    let points = electrodes();
    let mut stats = Statistics::new();
    let fit = fit_points_to_volume(
        &points,
        &volume,
        PointsFitConfig::default(),
        None,
        &options,
        Some(&mut stats),
    )?;
    println!("  cost {:.5}, {} residuals kept", fit.result.best_cost, stats.len());

    println!("Step 3: glue with a 1 mm margin");
    let mut transform = CoregistrationTransform::new();
    transform.set_orientation(fit.matrix).set_gluing(true);
    let mut glued = points.clone();
    let count = transform.apply(&mut glued, &volume, None, &volume.center(), None, 1.0)?;
    println!("  {count} of {} electrodes glued", glued.len());

    Ok(())
}
