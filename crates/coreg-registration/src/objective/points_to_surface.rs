//! Fit of a point set onto the iso-surface of a volume.

use coreg_core::filter::GaussianFilter;
use coreg_core::{GradientField, Matrix44, MultiplySide, Point3, PointSet, Statistics, Volume};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::params::matrix_about;
use super::surface::SurfaceSearch;
use super::trait_::{EvaluationContext, Objective, MAX_EVALUATION};
use crate::error::{RegistrationError, Result};
use crate::optimizer::ParameterVector;
use crate::validation::{validate_positive, validate_unit_factor};

/// Settings of [`PointsToSurfaceFit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsFitConfig {
    /// Iso-surface level; derived from the volume when `None`.
    pub threshold: Option<f32>,
    /// Derived threshold as a fraction between background and maximum.
    pub threshold_fraction: f64,
    /// Gaussian sigma (voxels) of the volume the surface normals come from. Zero disables.
    pub normal_smoothing: f64,
    /// Points beyond this count are evenly resampled.
    pub max_points: usize,
    /// Bisection precision of the surface search, in voxels.
    pub search_precision: f64,
}

impl Default for PointsFitConfig {
    fn default() -> Self {
        Self {
            threshold: None,
            threshold_fraction: 0.5,
            normal_smoothing: 1.0,
            max_points: 2000,
            search_precision: 0.01,
        }
    }
}

impl PointsFitConfig {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points;
        self
    }

    pub fn with_normal_smoothing(mut self, sigma: f64) -> Self {
        self.normal_smoothing = sigma;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_unit_factor("threshold_fraction", self.threshold_fraction)?;
        validate_positive("search_precision", self.search_precision)?;
        if self.normal_smoothing < 0.0 || !self.normal_smoothing.is_finite() {
            return Err(RegistrationError::invalid_configuration(format!(
                "normal_smoothing must be >= 0, got {}",
                self.normal_smoothing
            )));
        }
        if self.max_points == 0 {
            return Err(RegistrationError::invalid_configuration("max_points must be > 0"));
        }
        Ok(())
    }
}

/// Mean squared distance from transformed points to a volume's iso-surface.
///
/// Points live in the world frame of the volume. Rotations and scales act
/// about the center of mass of the points. Null points are ignored and
/// points below the optional guillotine plane are clipped.
#[derive(Debug, Clone)]
pub struct PointsToSurfaceFit {
    points: PointSet,
    center: Point3,
    volume: Volume,
    gradient: GradientField,
    threshold: f32,
    surface_center: Point3,
    world_to_index: Matrix44,
    spacing: f64,
    clip: Option<Matrix44>,
    config: PointsFitConfig,
}

impl PointsToSurfaceFit {
    /// Bind `points` and `volume`.
    ///
    /// Empty input does not fail: the objective is then degenerate and
    /// every evaluation returns the sentinel.
    pub fn new(points: &PointSet, volume: &Volume, config: PointsFitConfig) -> Result<Self> {
        config.validate()?;
        let valid: PointSet = points.valid_points().copied().collect();
        let valid = if valid.len() > config.max_points {
            valid.resample(config.max_points)
        } else {
            valid
        };
        let center = valid.center_of_mass().unwrap_or_else(Point3::origin);

        let threshold = config.threshold.unwrap_or_else(|| {
            let background = volume.background();
            background + config.threshold_fraction as f32 * (volume.max_value() - background)
        });
        let gradient = if volume.is_empty() {
            GradientField::from_volume(volume)
        } else if config.normal_smoothing > 0.0 {
            let smoothed = GaussianFilter::isotropic(config.normal_smoothing)
                .in_voxels()
                .apply(volume);
            GradientField::from_volume(&smoothed)
        } else {
            GradientField::from_volume(volume)
        };
        let surface_center = volume
            .center_of_mass(threshold)
            .unwrap_or_else(|| volume.center());

        debug!(
            points = valid.len(),
            skipped = points.len().saturating_sub(valid.len()),
            threshold,
            "points-to-surface objective"
        );
        if valid.is_empty() || volume.is_empty() {
            warn!("points-to-surface objective has no data");
        }

        Ok(Self {
            points: valid,
            center,
            volume: volume.clone(),
            gradient,
            threshold,
            surface_center,
            world_to_index: volume.geometry().world_to_index_matrix(),
            spacing: volume.geometry().spacing().mean_spacing(),
            clip: None,
            config,
        })
    }

    /// Clip points that land below a guillotine plane.
    ///
    /// `plane` maps plane-local coordinates to voxel indices of the volume,
    /// with the kept half at positive local z.
    pub fn with_guillotine(mut self, plane: &Matrix44) -> Result<Self> {
        let inverse = plane
            .inverse()
            .ok_or_else(|| RegistrationError::numerical_instability("guillotine plane is singular"))?;
        self.clip = Some(inverse);
        Ok(self)
    }

    /// World-to-world transform for `params`.
    pub fn transform(&self, params: &ParameterVector) -> Matrix44 {
        matrix_about(params, &self.center, &self.center)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn points(&self) -> &PointSet {
        &self.points
    }

    /// Center of mass of the points, about which rotations act.
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    fn search(&self) -> SurfaceSearch<'_> {
        SurfaceSearch::new(&self.volume, self.threshold)
            .with_center(self.surface_center)
            .with_gradient(&self.gradient)
            .with_precision(self.config.search_precision)
    }

    /// Distance in world units of every kept point.
    pub fn distances(&self, params: &ParameterVector) -> Vec<f64> {
        let mut to_voxels = self.transform(params);
        to_voxels.multiply(&self.world_to_index, MultiplySide::Left);
        let search = self.search();
        self.points
            .as_slice()
            .par_iter()
            .filter_map(|p| {
                let v = to_voxels.apply(p);
                if let Some(clip) = &self.clip {
                    if clip.apply(&v)[2] < 0.0 {
                        return None;
                    }
                }
                search.minimum_distance(&v).map(|hit| hit.distance * self.spacing)
            })
            .collect()
    }
}

impl Objective for PointsToSurfaceFit {
    type Mode = ();

    fn evaluate(
        &self,
        params: &ParameterVector,
        ctx: &EvaluationContext<()>,
        stats: Option<&mut Statistics>,
    ) -> f64 {
        if self.is_degenerate() {
            return MAX_EVALUATION;
        }
        let all: Statistics = self.distances(params).into_iter().collect();
        let kept = match ctx.outlier_sd {
            Some(k) => all.trimmed(k),
            None => all,
        };
        if let Some(stats) = stats {
            stats.merge(&kept);
        }
        kept.mean_square().unwrap_or(MAX_EVALUATION)
    }

    fn name(&self) -> &'static str {
        "points_to_surface"
    }

    fn is_degenerate(&self) -> bool {
        self.points.is_empty() || self.volume.is_empty()
    }
}
