//! One-call fits: build the objective and parameter space, run a schedule.

use coreg_core::{Matrix44, PointSet, Statistics, Volume};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RegistrationError, Result};
use crate::objective::{
    PointsFitConfig, PointsToSurfaceFit, SelfFit, SelfFitConfig, SelfFitMode, VolumeFitConfig, VolumeFitMode,
    VolumeToVolumeFit,
};
use crate::optimizer::ParameterKind::*;
use crate::optimizer::{GlobalOptimizer, OptimizationResult, OptimizerConfig, ParameterSpace};
use crate::progress::{CancellationToken, ProgressTracker};
use crate::schedule::FitSchedule;

/// Optimizer settings shared by the fit entry points.
#[derive(Clone, Default)]
pub struct FitOptions {
    pub optimizer: OptimizerConfig,
    pub schedule: FitSchedule,
    pub progress: ProgressTracker,
    pub cancellation: Option<CancellationToken>,
}

impl FitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_schedule(mut self, schedule: FitSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn optimizer(&self, space: ParameterSpace) -> Result<GlobalOptimizer> {
        let optimizer = GlobalOptimizer::new(space, self.optimizer.clone())?.with_progress(self.progress.clone());
        Ok(match &self.cancellation {
            Some(token) => optimizer.with_cancellation(token.clone()),
            None => optimizer,
        })
    }
}

/// Result of a fit entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitOutcome {
    /// Plane-local to voxel matrix for plane fits, world to world otherwise.
    pub matrix: Matrix44,
    pub result: OptimizationResult,
}

fn largest_dim(volume: &Volume) -> f64 {
    volume.dims().iter().copied().max().unwrap_or(0) as f64
}

/// Physical size of the largest volume axis.
fn largest_extent(volume: &Volume) -> f64 {
    let spacing = volume.geometry().spacing();
    let dims = volume.dims();
    (0..3).map(|d| dims[d] as f64 * spacing[d]).fold(0.0, f64::max)
}

/// Locate the mid-sagittal plane of a head volume.
///
/// `mode` must be one of the sagittal modes.
pub fn find_sagittal_plane(
    volume: &Volume,
    mode: SelfFitMode,
    config: SelfFitConfig,
    options: &FitOptions,
) -> Result<FitOutcome> {
    if !mode.is_sagittal() {
        return Err(RegistrationError::invalid_parameter(format!("{mode:?} is not a sagittal mode")));
    }
    let objective = SelfFit::new(volume, config)?;
    let reach = largest_dim(volume) / 4.0;
    let space = ParameterSpace::new()
        .with_group(&[(TranslationX, -reach, reach)])?
        .with_group(&[(RotationY, -20.0, 20.0), (RotationZ, -20.0, 20.0)])?;
    let mut optimizer = options.optimizer(space)?;
    let result = options.schedule.run(&mut optimizer, &objective, mode, "sagittal plane", None)?;
    let matrix = objective.plane_matrix(&result.best_parameters);
    info!(cost = result.best_cost, origin = ?matrix.translation_part(), "sagittal plane found");
    Ok(FitOutcome { matrix, result })
}

/// Locate a transverse plane, optionally matching a reference slice.
///
/// [`SelfFitMode::TransverseMni`] requires `reference`.
pub fn find_transverse_plane(
    volume: &Volume,
    mode: SelfFitMode,
    config: SelfFitConfig,
    reference: Option<&Volume>,
    options: &FitOptions,
) -> Result<FitOutcome> {
    if !mode.is_transverse() {
        return Err(RegistrationError::invalid_parameter(format!("{mode:?} is not a transverse mode")));
    }
    let mut objective = SelfFit::new(volume, config)?;
    let reach = largest_dim(volume) / 4.0;
    let mut space = ParameterSpace::new();
    space
        .add_group(&[(TranslationZ, -reach, reach)])?
        .add_group(&[(RotationX, -20.0, 20.0), (RotationY, -20.0, 20.0)])?;
    if mode == SelfFitMode::TransverseMni {
        let reference = reference.ok_or_else(|| {
            RegistrationError::invalid_parameter("reference slice required for TransverseMni")
        })?;
        objective = objective.with_reference(reference);
        space
            .add_group(&[(TranslationX, -reach, reach), (TranslationY, -reach, reach)])?
            .add_group(&[(Scale, 0.7, 1.3)])?;
    }
    let mut optimizer = options.optimizer(space)?;
    let result = options.schedule.run(&mut optimizer, &objective, mode, "transverse plane", None)?;
    let matrix = objective.plane_matrix(&result.best_parameters);
    info!(cost = result.best_cost, ?mode, "transverse plane found");
    Ok(FitOutcome { matrix, result })
}

/// Locate the plane separating the head from the neck.
pub fn find_guillotine_plane(volume: &Volume, config: SelfFitConfig, options: &FitOptions) -> Result<FitOutcome> {
    let objective = SelfFit::new(volume, config)?;
    let reach = volume.dims()[2] as f64 / 2.0;
    let space = ParameterSpace::new()
        .with_group(&[(TranslationZ, -reach, reach)])?
        .with_group(&[(RotationX, -15.0, 15.0), (RotationY, -15.0, 15.0)])?;
    let mut optimizer = options.optimizer(space)?;
    let result = options.schedule.run(
        &mut optimizer,
        &objective,
        SelfFitMode::Guillotine,
        "guillotine plane",
        None,
    )?;
    let matrix = objective.plane_matrix(&result.best_parameters);
    info!(cost = result.best_cost, "guillotine plane found");
    Ok(FitOutcome { matrix, result })
}

/// Fit electrode positions onto the head surface of `volume`.
///
/// Returns the world-to-world matrix to apply to the points. `stats`
/// receives the final point-to-surface distances kept after trimming.
pub fn fit_points_to_volume(
    points: &PointSet,
    volume: &Volume,
    config: PointsFitConfig,
    guillotine: Option<&Matrix44>,
    options: &FitOptions,
    stats: Option<&mut Statistics>,
) -> Result<FitOutcome> {
    let mut objective = PointsToSurfaceFit::new(points, volume, config)?;
    if let Some(plane) = guillotine {
        objective = objective.with_guillotine(plane)?;
    }
    let reach = largest_extent(volume) / 4.0;
    let space = ParameterSpace::new()
        .with_group(&[
            (TranslationX, -reach, reach),
            (TranslationY, -reach, reach),
            (TranslationZ, -reach, reach),
        ])?
        .with_group(&[
            (RotationX, -30.0, 30.0),
            (RotationY, -30.0, 30.0),
            (RotationZ, -30.0, 30.0),
        ])?
        .with_group(&[(Scale, 0.85, 1.15)])?;
    let mut optimizer = options.optimizer(space)?;
    let result = options.schedule.run(&mut optimizer, &objective, (), "points to surface", stats)?;
    let matrix = objective.transform(&result.best_parameters);
    info!(cost = result.best_cost, points = objective.points().len(), "points fitted");
    Ok(FitOutcome { matrix, result })
}

/// Fit `source` onto `target`; the matrix maps source world to target world.
pub fn fit_volume_to_volume(
    source: &Volume,
    target: &Volume,
    mode: VolumeFitMode,
    config: VolumeFitConfig,
    options: &FitOptions,
) -> Result<FitOutcome> {
    let objective = VolumeToVolumeFit::new(source, target, config)?;
    let reach = largest_extent(target) / 8.0;
    let space = ParameterSpace::new()
        .with_group(&[
            (TranslationX, -reach, reach),
            (TranslationY, -reach, reach),
            (TranslationZ, -reach, reach),
        ])?
        .with_group(&[
            (RotationX, -15.0, 15.0),
            (RotationY, -15.0, 15.0),
            (RotationZ, -15.0, 15.0),
        ])?
        .with_group(&[(Scale, 0.8, 1.2)])?;
    let mut optimizer = options.optimizer(space)?;
    let result = options.schedule.run(&mut optimizer, &objective, mode, "volume to volume", None)?;
    let matrix = objective.transform(&result.best_parameters);
    info!(cost = result.best_cost, ?mode, "volumes fitted");
    Ok(FitOutcome { matrix, result })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_family_is_checked() {
        let v = Volume::new([4, 4, 4]);
        let options = FitOptions::default();
        assert!(find_sagittal_plane(&v, SelfFitMode::Guillotine, SelfFitConfig::default(), &options).is_err());
        assert!(find_transverse_plane(&v, SelfFitMode::Sagittal, SelfFitConfig::default(), None, &options).is_err());
        assert!(
            find_transverse_plane(&v, SelfFitMode::TransverseMni, SelfFitConfig::default(), None, &options).is_err()
        );
    }

    #[test]
    fn test_degenerate_volume_is_not_an_error() {
        let v = Volume::new([8, 8, 8]);
        let outcome = find_guillotine_plane(&v, SelfFitConfig::default(), &FitOptions::default()).unwrap();
        assert_eq!(outcome.result.termination, crate::optimizer::TerminationReason::Degenerate);
        assert!(!outcome.result.is_valid());
    }
}
