//! Fit of a source volume onto a target volume.

use std::path::Path;
use std::sync::{Arc, Mutex};

use coreg_core::filter::{threshold_mask, DownsampleFilter, GaussianFilter, ResampleFilter};
use coreg_core::io::VolumeWriter;
use coreg_core::{non_null, Interpolation, Matrix44, MultiplySide, Point3, Statistics, Volume};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::params::matrix_about;
use super::remap::Remap;
use super::smoothing_cache::SmoothingCache;
use super::trait_::{EvaluationContext, Objective, Tally, MAX_EVALUATION};
use crate::error::{RegistrationError, Result};
use crate::optimizer::ParameterVector;
use crate::validation::{validate_same_dims, validate_unit_factor};

/// Preparation of one side of a volume fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideConfig {
    pub remap: Remap,
    /// Mask level; derived from the volume when `None`.
    pub threshold: Option<f32>,
    /// Derived threshold as a fraction between background and maximum.
    pub threshold_fraction: f64,
    /// Radius of the opening that carves thin structures off the mask.
    pub carve_radius: usize,
}

impl Default for SideConfig {
    fn default() -> Self {
        Self {
            remap: Remap::None,
            threshold: None,
            threshold_fraction: 0.10,
            carve_radius: 1,
        }
    }
}

impl SideConfig {
    pub fn with_remap(mut self, remap: Remap) -> Self {
        self.remap = remap;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_carve_radius(mut self, radius: usize) -> Self {
        self.carve_radius = radius;
        self
    }

    fn threshold_for(&self, volume: &Volume) -> f32 {
        self.threshold.unwrap_or_else(|| {
            let background = volume.background();
            background + self.threshold_fraction as f32 * (volume.max_value() - background)
        })
    }
}

/// What is compared at each scanned voxel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolumeFitMode {
    /// Relative intensity difference of the remapped volumes.
    #[default]
    Intensity,
    /// Disagreement of the binary masks.
    Masks,
}

/// Gaussian pre-smoothing of both sides during the search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum SmoothingPolicy {
    #[default]
    None,
    /// Constant sigma, in voxels.
    Fixed { sigma: f64 },
    /// Sigma proportional to the current search precision, up to `max_sigma` voxels.
    Adaptive { max_sigma: f64 },
}

impl SmoothingPolicy {
    /// Sigma used at `precision`, quantized to tenths of a voxel.
    fn key(self, precision: f64) -> u32 {
        let sigma = match self {
            Self::None => 0.0,
            Self::Fixed { sigma } => sigma,
            Self::Adaptive { max_sigma } => max_sigma * (precision / 0.25).clamp(0.0, 1.0),
        };
        (sigma.max(0.0) * 10.0).round() as u32
    }
}

/// Settings of [`VolumeToVolumeFit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeFitConfig {
    pub source: SideConfig,
    pub target: SideConfig,
    pub smoothing: SmoothingPolicy,
    /// Stride of the voxel scan.
    pub sample_step: usize,
    /// Smoothed copies kept in memory.
    pub cache_capacity: usize,
}

impl Default for VolumeFitConfig {
    fn default() -> Self {
        Self {
            source: SideConfig::default(),
            target: SideConfig::default(),
            smoothing: SmoothingPolicy::None,
            sample_step: 2,
            cache_capacity: 5,
        }
    }
}

impl VolumeFitConfig {
    pub fn with_sides(mut self, source: SideConfig, target: SideConfig) -> Self {
        self.source = source;
        self.target = target;
        self
    }

    pub fn with_smoothing(mut self, smoothing: SmoothingPolicy) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn with_sample_step(mut self, step: usize) -> Self {
        self.sample_step = step;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_unit_factor("source.threshold_fraction", self.source.threshold_fraction)?;
        validate_unit_factor("target.threshold_fraction", self.target.threshold_fraction)?;
        if self.sample_step == 0 {
            return Err(RegistrationError::invalid_configuration("sample_step must be > 0"));
        }
        if self.cache_capacity == 0 {
            return Err(RegistrationError::invalid_configuration("cache_capacity must be > 0"));
        }
        match self.smoothing {
            SmoothingPolicy::Fixed { sigma: s } | SmoothingPolicy::Adaptive { max_sigma: s }
                if s < 0.0 || !s.is_finite() =>
            {
                Err(RegistrationError::invalid_configuration(format!("smoothing sigma must be >= 0, got {s}")))
            }
            _ => Ok(()),
        }
    }
}

/// Output policy of [`VolumeToVolumeFit::transform_to_target`] and
/// [`VolumeToVolumeFit::transform_to_source`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResampleOptions {
    pub interpolation: Interpolation,
    /// Gaussian sigma (voxels) applied to the input before resampling.
    pub prefilter: Option<f64>,
    /// Output block-averaging factor; 1 keeps the full grid.
    pub subsampling: usize,
}

impl Default for ResampleOptions {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::Linear,
            prefilter: None,
            subsampling: 1,
        }
    }
}

/// Which grid a transformed volume is written on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformDirection {
    /// Source intensities on the target grid.
    ToTarget,
    /// Target intensities on the source grid.
    ToSource,
}

#[derive(Debug, Clone)]
struct Side {
    original: Volume,
    volume: Volume,
    mask: Volume,
    count: usize,
    center: Point3,
}

impl Side {
    fn new(volume: &Volume, config: &SideConfig, mask: Option<&Volume>) -> Result<Self> {
        let threshold = config.threshold_for(volume);
        let mask = match mask {
            Some(mask) => {
                validate_same_dims(volume, mask)?;
                mask.clone()
            }
            None => threshold_mask(volume, threshold, config.carve_radius),
        };
        let remapped = config.remap.apply(volume, &mask, threshold)?;
        let count = mask.count_above(0.5);
        let center_index = mask.center_of_mass(0.5).unwrap_or_else(|| volume.center());
        Ok(Self {
            original: volume.clone(),
            volume: remapped,
            count,
            center: volume.geometry().index_to_world(&center_index),
            mask,
        })
    }
}

#[derive(Debug)]
struct SmoothedPair {
    source: Volume,
    target: Volume,
}

/// Mean squared relative difference between a source volume mapped into a
/// target volume.
///
/// Only masked voxels are scanned, from the side with the larger mask, or
/// from both sides when the masks have the same size, in which case the
/// second scan only keeps voxels the first one could not reach. Rotations, scales and
/// shears act about the source mask center, which the identity maps onto
/// the target mask center.
#[derive(Debug)]
pub struct VolumeToVolumeFit {
    source: Side,
    target: Side,
    config: VolumeFitConfig,
    cache: Mutex<SmoothingCache<SmoothedPair>>,
}

impl VolumeToVolumeFit {
    /// Bind source and target, deriving masks by threshold and carve-back.
    pub fn new(source: &Volume, target: &Volume, config: VolumeFitConfig) -> Result<Self> {
        Self::build(source, target, None, config)
    }

    /// Bind source and target with caller-supplied masks.
    ///
    /// Fails when a mask does not have the dims of its volume.
    pub fn with_masks(
        source: &Volume,
        source_mask: &Volume,
        target: &Volume,
        target_mask: &Volume,
        config: VolumeFitConfig,
    ) -> Result<Self> {
        Self::build(source, target, Some((source_mask, target_mask)), config)
    }

    fn build(
        source: &Volume,
        target: &Volume,
        masks: Option<(&Volume, &Volume)>,
        config: VolumeFitConfig,
    ) -> Result<Self> {
        config.validate()?;
        let source = Side::new(source, &config.source, masks.map(|m| m.0))?;
        let target = Side::new(target, &config.target, masks.map(|m| m.1))?;
        debug!(
            source_mask = source.count,
            target_mask = target.count,
            source_remap = ?config.source.remap,
            target_remap = ?config.target.remap,
            "volume-to-volume objective"
        );
        if source.count == 0 || target.count == 0 {
            warn!("volume-to-volume objective has an empty mask");
        }
        let cache = Mutex::new(SmoothingCache::new(config.cache_capacity));
        Ok(Self {
            source,
            target,
            config,
            cache,
        })
    }

    /// Source world to target world transform for `params`.
    pub fn transform(&self, params: &ParameterVector) -> Matrix44 {
        matrix_about(params, &self.source.center, &self.target.center)
    }

    /// Source voxel index to target voxel index for `params`.
    pub fn voxel_mapping(&self, params: &ParameterVector) -> Matrix44 {
        let mut m = self.source.original.geometry().index_to_world_matrix();
        m.multiply(&self.transform(params), MultiplySide::Left)
            .multiply(&self.target.original.geometry().world_to_index_matrix(), MultiplySide::Left);
        m
    }

    pub fn source_mask(&self) -> &Volume {
        &self.source.mask
    }

    pub fn target_mask(&self) -> &Volume {
        &self.target.mask
    }

    /// Number of smoothed copies currently cached.
    pub fn cached_smoothings(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    fn smoothed(&self, precision: f64) -> Option<Arc<SmoothedPair>> {
        let key = self.config.smoothing.key(precision);
        if key == 0 {
            return None;
        }
        let mut cache = self.cache.lock().unwrap();
        if let Some(pair) = cache.get(key) {
            return Some(pair);
        }
        let filter = GaussianFilter::isotropic(key as f64 / 10.0).in_voxels();
        let pair = Arc::new(SmoothedPair {
            source: filter.apply(&self.source.volume),
            target: filter.apply(&self.target.volume),
        });
        debug!(sigma = key as f64 / 10.0, "smoothed copies cached");
        cache.insert(key, pair.clone());
        Some(pair)
    }

    /// Compare every masked voxel of `from` with `to` sampled through `mapping`.
    ///
    /// With `skip_overlap`, voxels landing inside the mask of `to` are left out
    /// since the opposite scan already paired them.
    #[allow(clippy::too_many_arguments)]
    fn scan(
        &self,
        from: &Side,
        from_volume: &Volume,
        to: &Side,
        to_volume: &Volume,
        mapping: &Matrix44,
        mode: VolumeFitMode,
        keep: bool,
        skip_overlap: bool,
    ) -> Tally {
        let step = self.config.sample_step;
        let [dx, dy, dz] = from.mask.dims();
        let slices: Vec<usize> = (0..dz).step_by(step).collect();
        slices
            .par_iter()
            .fold(
                || Tally::new(keep),
                |mut tally, &z| {
                    for y in (0..dy).step_by(step) {
                        for x in (0..dx).step_by(step) {
                            if from.mask.get(x, y, z) <= 0.5 {
                                continue;
                            }
                            let p = mapping.apply(&Point3::new([x as f64, y as f64, z as f64]));
                            if skip_overlap && to.mask.sample(&p, Interpolation::Nearest) > 0.5 {
                                continue;
                            }
                            let residual = match mode {
                                VolumeFitMode::Intensity => {
                                    let a = from_volume.get(x, y, z) as f64;
                                    let b = to_volume.sample(&p, Interpolation::Linear) as f64;
                                    (a - b) / non_null(a.abs().max(b.abs()))
                                }
                                VolumeFitMode::Masks => 1.0 - to.mask.sample(&p, Interpolation::Linear) as f64,
                            };
                            tally = tally.add(residual * residual, 1.0);
                        }
                    }
                    tally
                },
            )
            .reduce(|| Tally::new(keep), Tally::merge)
    }

    fn resample(
        &self,
        input: &Volume,
        output: &Volume,
        output_to_input: Matrix44,
        options: &ResampleOptions,
    ) -> Result<Volume> {
        let input = match options.prefilter {
            Some(sigma) if sigma > 0.0 => GaussianFilter::isotropic(sigma).in_voxels().apply(input),
            _ => input.clone(),
        };
        let resampled = ResampleFilter::from_reference(output, output_to_input)
            .with_interpolation(options.interpolation)
            .apply(&input);
        if options.subsampling > 1 {
            Ok(DownsampleFilter::uniform(options.subsampling)
                .with_averaging()
                .apply(&resampled)?)
        } else {
            Ok(resampled)
        }
    }

    /// Source intensities resampled onto the target grid.
    pub fn transform_to_target(&self, params: &ParameterVector, options: &ResampleOptions) -> Result<Volume> {
        let inverse = self
            .transform(params)
            .inverse()
            .ok_or_else(|| RegistrationError::numerical_instability("fit transform is singular"))?;
        self.resample(&self.source.original, &self.target.original, inverse, options)
    }

    /// Target intensities resampled onto the source grid.
    pub fn transform_to_source(&self, params: &ParameterVector, options: &ResampleOptions) -> Result<Volume> {
        self.resample(&self.target.original, &self.source.original, self.transform(params), options)
    }

    /// Resample in `direction` and hand the result to `writer`.
    pub fn write_transformed(
        &self,
        writer: &dyn VolumeWriter,
        path: &Path,
        params: &ParameterVector,
        direction: TransformDirection,
        options: &ResampleOptions,
    ) -> Result<()> {
        let volume = match direction {
            TransformDirection::ToTarget => self.transform_to_target(params, options)?,
            TransformDirection::ToSource => self.transform_to_source(params, options)?,
        };
        writer.write_volume(&volume, path)?;
        info!(path = %path.display(), ?direction, dims = ?volume.dims(), "transformed volume written");
        Ok(())
    }
}

impl Objective for VolumeToVolumeFit {
    type Mode = VolumeFitMode;

    fn evaluate(
        &self,
        params: &ParameterVector,
        ctx: &EvaluationContext<VolumeFitMode>,
        stats: Option<&mut Statistics>,
    ) -> f64 {
        if self.is_degenerate() {
            return MAX_EVALUATION;
        }
        let smoothed = self.smoothed(ctx.precision);
        let (source, target) = match smoothed.as_deref() {
            Some(pair) => (&pair.source, &pair.target),
            None => (&self.source.volume, &self.target.volume),
        };
        let keep = stats.is_some();
        let forward = self.voxel_mapping(params);
        let mut tally = Tally::new(keep);

        let both = self.source.count == self.target.count;
        if self.source.count >= self.target.count {
            tally = tally.merge(self.scan(&self.source, source, &self.target, target, &forward, ctx.how, keep, false));
        }
        if self.target.count >= self.source.count {
            let Some(backward) = forward.inverse() else {
                return MAX_EVALUATION;
            };
            tally = tally.merge(self.scan(&self.target, target, &self.source, source, &backward, ctx.how, keep, both));
        }
        tally.finish(stats)
    }

    fn name(&self) -> &'static str {
        "volume_to_volume"
    }

    fn is_degenerate(&self) -> bool {
        self.source.count == 0 || self.target.count == 0
    }
}
