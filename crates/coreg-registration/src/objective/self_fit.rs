//! Plane-detection objectives evaluated on a single volume.
//!
//! Every mode positions a candidate plane with [`SelfFit::plane_matrix`],
//! which maps plane-local coordinates (voxel units, origin on the plane) to
//! voxel indices. The sagittal plane is local `x = 0`; transverse and
//! guillotine planes are local `z = 0`.

use coreg_core::filter::histogram_equalize;
use coreg_core::{non_null, Interpolation, Matrix44, Point3, Statistics, Volume};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::params::matrix_about;
use super::trait_::{EvaluationContext, Objective, Tally, MAX_EVALUATION};
use crate::error::{RegistrationError, Result};
use crate::optimizer::ParameterVector;
use crate::validation::{validate_positive, validate_unit_factor};

/// Geometric criterion of a [`SelfFit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelfFitMode {
    /// Mirror symmetry about the plane.
    Sagittal,
    /// Symmetry, penalizing bright white matter crossing the plane.
    SagittalWhiteMatter,
    /// Symmetry, rewarding a dark signal on the plane.
    SagittalDarkVein,
    /// Symmetry with both extra terms.
    SagittalCombined,
    /// Longest antero-posterior extent within the plane.
    TransverseLongest,
    /// Biggest bounding box within the plane.
    TransverseBiggestBox,
    /// Biggest filled surface, weighted toward the center.
    TransverseBiggestSurface,
    /// Agreement with a reference slice.
    TransverseMni,
    /// Head above, neck below.
    Guillotine,
}

impl SelfFitMode {
    pub fn is_sagittal(self) -> bool {
        matches!(
            self,
            Self::Sagittal | Self::SagittalWhiteMatter | Self::SagittalDarkVein | Self::SagittalCombined
        )
    }

    pub fn is_transverse(self) -> bool {
        matches!(
            self,
            Self::TransverseLongest
                | Self::TransverseBiggestBox
                | Self::TransverseBiggestSurface
                | Self::TransverseMni
        )
    }
}

/// Settings of [`SelfFit`]. Weights are empirical defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfFitConfig {
    /// Foreground level; derived from the volume when `None`.
    pub threshold: Option<f32>,
    /// Derived threshold as a fraction between background and maximum.
    pub threshold_fraction: f64,
    /// Spacing of the sampling grid on the plane, in voxels.
    pub sample_step: f64,
    /// Extra weight of the upper half of the plane.
    pub upper_weight: f64,
    /// Extra weight of the antero-posterior center line.
    pub central_weight: f64,
    /// Level above which a voxel counts as white matter, as a fraction between background and maximum.
    pub bright_fraction: f64,
    pub white_matter_weight: f64,
    pub dark_vein_weight: f64,
    /// Histogram-equalize the volume and the reference slice before comparing.
    pub equalize_reference: bool,
    /// Minimum foreground voxels on both sides for equalization.
    pub min_equalize_samples: usize,
    /// Smallest half-height of the guillotine probe, in voxels.
    pub guillotine_min_range: f64,
    /// Penalty for an empty column above the cut with tissue below.
    pub guillotine_wrong_penalty: f64,
    /// Penalty for a column with tissue on both or neither side.
    pub guillotine_ambiguous_penalty: f64,
}

impl Default for SelfFitConfig {
    fn default() -> Self {
        Self {
            threshold: None,
            threshold_fraction: 0.10,
            sample_step: 2.0,
            upper_weight: 1.0,
            central_weight: 0.5,
            bright_fraction: 0.75,
            white_matter_weight: 1.0,
            dark_vein_weight: 0.5,
            equalize_reference: true,
            min_equalize_samples: 1000,
            guillotine_min_range: 0.5,
            guillotine_wrong_penalty: 1.0,
            guillotine_ambiguous_penalty: 0.1,
        }
    }
}

impl SelfFitConfig {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_sample_step(mut self, step: f64) -> Self {
        self.sample_step = step;
        self
    }

    pub fn with_equalize_reference(mut self, equalize: bool) -> Self {
        self.equalize_reference = equalize;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_unit_factor("threshold_fraction", self.threshold_fraction)?;
        validate_unit_factor("bright_fraction", self.bright_fraction)?;
        validate_positive("sample_step", self.sample_step)?;
        validate_positive("guillotine_min_range", self.guillotine_min_range)?;
        let weights = [
            self.upper_weight,
            self.central_weight,
            self.white_matter_weight,
            self.dark_vein_weight,
            self.guillotine_wrong_penalty,
            self.guillotine_ambiguous_penalty,
        ];
        if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err(RegistrationError::invalid_configuration("weights and penalties must be >= 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Template {
    source: Volume,
    reference: Volume,
    source_scale: f64,
    reference_scale: f64,
    reference_center: Point3,
}

/// Plane-detection objective bound to one volume.
#[derive(Debug, Clone)]
pub struct SelfFit {
    volume: Volume,
    config: SelfFitConfig,
    threshold: f32,
    bright: f32,
    scale: f64,
    center: Point3,
    half_extent: f64,
    template: Option<Template>,
    degenerate: bool,
}

impl SelfFit {
    /// Bind `volume`. An empty or all-background volume gives a degenerate objective.
    pub fn new(volume: &Volume, config: SelfFitConfig) -> Result<Self> {
        config.validate()?;
        let background = volume.background();
        let range = volume.max_value() - background;
        let threshold = config
            .threshold
            .unwrap_or(background + config.threshold_fraction as f32 * range);
        let bright = background + config.bright_fraction as f32 * range;
        let center = volume
            .center_of_mass(threshold)
            .unwrap_or_else(|| volume.center());
        let half_extent = volume.dims().iter().copied().max().unwrap_or(0) as f64 / 2.0;
        debug!(threshold, bright, ?center, "self-fit objective");
        Ok(Self {
            volume: volume.clone(),
            config,
            threshold,
            bright,
            scale: non_null(range.abs() as f64),
            center,
            half_extent,
            template: None,
            degenerate: volume.is_empty() || volume.count_above(threshold) == 0,
        })
    }

    /// Attach the reference slice used by [`SelfFitMode::TransverseMni`].
    ///
    /// The slice is sampled in its own voxel units around its center; the
    /// `Scale` parameter absorbs any size difference.
    pub fn with_reference(mut self, reference: &Volume) -> Self {
        if reference.is_empty() {
            self.template = None;
            return self;
        }
        let enough = |v: &Volume, t: f32| v.count_above(t) >= self.config.min_equalize_samples;
        let equalize = self.config.equalize_reference
            && enough(&self.volume, self.threshold)
            && enough(reference, reference.background());
        let (source, reference) = if equalize {
            (histogram_equalize(&self.volume, 256), histogram_equalize(reference, 256))
        } else {
            (self.volume.clone(), reference.clone())
        };
        debug!(equalize, dims = ?reference.dims(), "reference slice attached");
        self.template = Some(Template {
            source_scale: non_null(source.max_value() as f64),
            reference_scale: non_null(reference.max_value() as f64),
            reference_center: reference.center(),
            source,
            reference,
        });
        self
    }

    /// Plane-local to voxel transform for `params`.
    pub fn plane_matrix(&self, params: &ParameterVector) -> Matrix44 {
        matrix_about(params, &Point3::origin(), &self.center)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Voxel position of the plane origin at identity parameters.
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    #[inline]
    fn at(&self, m: &Matrix44, u: f64, v: f64, w: f64) -> f32 {
        self.volume
            .sample(&m.apply(&Point3::new([u, v, w])), Interpolation::Linear)
    }

    /// Symmetric sampling positions along one plane axis.
    fn axis(&self) -> Vec<f64> {
        let step = self.config.sample_step;
        let n = (self.half_extent / step).floor() as i64;
        (-n..=n).map(|i| i as f64 * step).collect()
    }

    fn sagittal(&self, m: &Matrix44, how: SelfFitMode, keep: bool) -> Tally {
        let cfg = &self.config;
        let axis = self.axis();
        let depth: Vec<f64> = axis.iter().copied().filter(|&u| u > 0.0).collect();
        let rows: Vec<(f64, f64)> = axis
            .iter()
            .flat_map(|&v| axis.iter().map(move |&w| (v, w)))
            .collect();
        let half = non_null(self.half_extent);
        let white_matter = matches!(how, SelfFitMode::SagittalWhiteMatter | SelfFitMode::SagittalCombined);
        let dark_vein = matches!(how, SelfFitMode::SagittalDarkVein | SelfFitMode::SagittalCombined);
        let threshold = self.threshold;
        let background = self.volume.background();

        rows.par_iter()
            .fold(
                || Tally::new(keep),
                |mut tally, &(v, w)| {
                    let upper = (0.5 + 0.5 * w / half).clamp(0.0, 1.0);
                    let central = (1.0 - (v / half).abs()).max(0.0);
                    let weight = (1.0 + cfg.upper_weight * upper) * (1.0 + cfg.central_weight * central);
                    for &u in &depth {
                        let a = self.at(m, u, v, w);
                        let b = self.at(m, -u, v, w);
                        if a > threshold || b > threshold {
                            tally = tally.add((a - b).abs() as f64 / self.scale, weight);
                        }
                    }
                    if white_matter || dark_vein {
                        let on_plane = self.at(m, 0.0, v, w);
                        if on_plane > threshold {
                            if white_matter {
                                let hit = if on_plane > self.bright { cfg.white_matter_weight } else { 0.0 };
                                tally = tally.add(hit, weight);
                            }
                            if dark_vein {
                                let level = (on_plane - background) as f64 / self.scale;
                                tally = tally.add(cfg.dark_vein_weight * level, weight);
                            }
                        }
                    }
                    tally
                },
            )
            .reduce(|| Tally::new(keep), Tally::merge)
    }

    /// Farthest in-plane distance along `(du, dv)` still above threshold.
    fn reach(&self, m: &Matrix44, du: f64, dv: f64) -> f64 {
        let step = 0.5;
        let mut t = self.half_extent * 1.5;
        while t > 0.0 {
            if self.at(m, du * t, dv * t, 0.0) > self.threshold {
                return t;
            }
            t -= step;
        }
        0.0
    }

    fn transverse(&self, m: &Matrix44, how: SelfFitMode) -> f64 {
        let extent = match how {
            SelfFitMode::TransverseLongest => self.reach(m, 0.0, 1.0) + self.reach(m, 0.0, -1.0),
            SelfFitMode::TransverseBiggestBox => {
                let width = self.reach(m, 1.0, 0.0) + self.reach(m, -1.0, 0.0);
                let length = self.reach(m, 0.0, 1.0) + self.reach(m, 0.0, -1.0);
                width * length
            }
            _ => {
                let axis = self.axis();
                let radius = non_null(self.half_extent * 1.5);
                let step_area = self.config.sample_step * self.config.sample_step;
                axis.par_iter()
                    .map(|&u| {
                        axis.iter()
                            .filter(|&&v| self.at(m, u, v, 0.0) > self.threshold)
                            .map(|&v| (1.0 - (u * u + v * v).sqrt() / radius).max(0.0) * step_area)
                            .sum::<f64>()
                    })
                    .sum()
            }
        };
        if extent > 0.0 {
            1.0 / extent
        } else {
            MAX_EVALUATION
        }
    }

    fn mni(&self, m: &Matrix44, keep: bool) -> Tally {
        let Some(t) = &self.template else {
            return Tally::new(keep);
        };
        let [rx, ry, rz] = t.reference.dims();
        let c = t.reference_center;
        (0..ry * rz)
            .into_par_iter()
            .fold(
                || Tally::new(keep),
                |mut tally, row| {
                    let (y, z) = (row % ry, row / ry);
                    for x in 0..rx {
                        let local = Point3::new([x as f64 - c[0], y as f64 - c[1], z as f64 - c[2]]);
                        let s = t.source.sample(&m.apply(&local), Interpolation::Linear) as f64;
                        let r = t.reference.get(x, y, z) as f64;
                        tally = tally.add((s / t.source_scale - r / t.reference_scale).abs(), 1.0);
                    }
                    tally
                },
            )
            .reduce(|| Tally::new(keep), Tally::merge)
    }

    /// True when `index` lies between the first and last voxel centers.
    fn interior(&self, index: &Point3) -> bool {
        let dims = self.volume.dims();
        (0..3).all(|d| index[d] >= 0.0 && index[d] <= dims[d] as f64 - 1.0)
    }

    /// Probe half-height: wide while the search is coarse.
    fn guillotine_range(&self, precision: f64) -> f64 {
        (precision * 2.0 * self.half_extent).max(self.config.guillotine_min_range)
    }

    fn guillotine(&self, m: &Matrix44, precision: f64, keep: bool) -> Tally {
        let cfg = &self.config;
        let axis = self.axis();
        let range = self.guillotine_range(precision);
        axis.par_iter()
            .fold(
                || Tally::new(keep),
                |mut tally, &u| {
                    for &v in &axis {
                        if !self.interior(&m.apply(&Point3::new([u, v, 0.0]))) {
                            continue;
                        }
                        let above = self.at(m, u, v, range) > self.threshold;
                        let below = self.at(m, u, v, -range) > self.threshold;
                        let penalty = match (above, below) {
                            (true, false) => 0.0,
                            (false, true) => cfg.guillotine_wrong_penalty,
                            _ => cfg.guillotine_ambiguous_penalty,
                        };
                        tally = tally.add(penalty, 1.0);
                    }
                    tally
                },
            )
            .reduce(|| Tally::new(keep), Tally::merge)
    }
}

impl Objective for SelfFit {
    type Mode = SelfFitMode;

    fn evaluate(
        &self,
        params: &ParameterVector,
        ctx: &EvaluationContext<SelfFitMode>,
        stats: Option<&mut Statistics>,
    ) -> f64 {
        if self.is_degenerate() {
            return MAX_EVALUATION;
        }
        let m = self.plane_matrix(params);
        let keep = stats.is_some();
        match ctx.how {
            SelfFitMode::Sagittal
            | SelfFitMode::SagittalWhiteMatter
            | SelfFitMode::SagittalDarkVein
            | SelfFitMode::SagittalCombined => self.sagittal(&m, ctx.how, keep).finish(stats),
            SelfFitMode::TransverseLongest
            | SelfFitMode::TransverseBiggestBox
            | SelfFitMode::TransverseBiggestSurface => {
                let cost = self.transverse(&m, ctx.how);
                if let Some(stats) = stats {
                    stats.add(cost);
                }
                cost
            }
            SelfFitMode::TransverseMni => self.mni(&m, keep).finish(stats),
            SelfFitMode::Guillotine => self.guillotine(&m, ctx.precision, keep).finish(stats),
        }
    }

    fn name(&self) -> &'static str {
        "self_fit"
    }

    fn is_degenerate(&self) -> bool {
        self.degenerate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::ParameterKind::{self, *};

    fn params(entries: &[(ParameterKind, f64)]) -> ParameterVector {
        ParameterVector::from_entries(entries.to_vec()).unwrap()
    }

    fn ellipsoid(n: usize) -> Volume {
        let c = (n as f64 - 1.0) / 2.0;
        Volume::from_fn([n, n, n], move |x, y, z| {
            let (dx, dy, dz) = ((x as f64 - c) / 6.0, (y as f64 - c) / 9.0, (z as f64 - c) / 7.0);
            if dx * dx + dy * dy + dz * dz <= 1.0 {
                100.0
            } else {
                0.0
            }
        })
    }

    fn ctx(how: SelfFitMode) -> EvaluationContext<SelfFitMode> {
        EvaluationContext::single(how)
    }

    #[test]
    fn test_symmetric_volume_has_no_asymmetry() {
        let fit = SelfFit::new(&ellipsoid(25), SelfFitConfig::default()).unwrap();
        let centered = fit.evaluate(&params(&[]), &ctx(SelfFitMode::Sagittal), None);
        assert!(centered < 1e-9, "cost {centered}");
        let shifted = fit.evaluate(&params(&[(TranslationX, 2.0)]), &ctx(SelfFitMode::Sagittal), None);
        assert!(shifted > 0.01);
        let tilted = fit.evaluate(&params(&[(RotationZ, 10.0)]), &ctx(SelfFitMode::Sagittal), None);
        assert!(tilted > 0.01);
    }

    #[test]
    fn test_sagittal_variants_add_terms() {
        let fit = SelfFit::new(&ellipsoid(25), SelfFitConfig::default()).unwrap();
        let plain = fit.evaluate(&params(&[]), &ctx(SelfFitMode::Sagittal), None);
        let white = fit.evaluate(&params(&[]), &ctx(SelfFitMode::SagittalWhiteMatter), None);
        let combined = fit.evaluate(&params(&[]), &ctx(SelfFitMode::SagittalCombined), None);
        assert!(white > plain);
        assert!(combined > plain);
    }

    #[test]
    fn test_transverse_prefers_central_cut() {
        let fit = SelfFit::new(&ellipsoid(25), SelfFitConfig::default()).unwrap();
        for how in [
            SelfFitMode::TransverseLongest,
            SelfFitMode::TransverseBiggestBox,
            SelfFitMode::TransverseBiggestSurface,
        ] {
            let central = fit.evaluate(&params(&[]), &ctx(how), None);
            let off = fit.evaluate(&params(&[(TranslationZ, 5.0)]), &ctx(how), None);
            assert!(central < off, "{how:?}: {central} vs {off}");
        }
    }

    #[test]
    fn test_mni_reference_matches_own_slice() {
        let volume = ellipsoid(25);
        let slice = Volume::from_fn([25, 25, 1], |x, y, _| volume.get(x, y, 12));
        let fit = SelfFit::new(&volume, SelfFitConfig::default().with_equalize_reference(false))
            .unwrap()
            .with_reference(&slice);
        let aligned = fit.evaluate(&params(&[]), &ctx(SelfFitMode::TransverseMni), None);
        assert!(aligned < 1e-9, "cost {aligned}");
        let off = fit.evaluate(&params(&[(TranslationZ, 5.0)]), &ctx(SelfFitMode::TransverseMni), None);
        assert!(off > aligned);
    }

    #[test]
    fn test_mni_without_reference_is_sentinel() {
        let fit = SelfFit::new(&ellipsoid(15), SelfFitConfig::default()).unwrap();
        assert_eq!(
            fit.evaluate(&params(&[]), &ctx(SelfFitMode::TransverseMni), None),
            MAX_EVALUATION
        );
    }

    #[test]
    fn test_guillotine_on_stepped_volume() {
        let stepped = Volume::from_fn([16, 16, 16], |_, _, z| if z > 5 { 100.0 } else { 0.0 });
        let fit = SelfFit::new(&stepped, SelfFitConfig::default().with_threshold(50.0)).unwrap();
        let mut ctx = ctx(SelfFitMode::Guillotine);
        ctx.precision = 1e-3;
        // plane half-way between z = 5 and z = 6
        let tz = 5.5 - fit.center()[2];
        let at_step = fit.evaluate(&params(&[(TranslationZ, tz)]), &ctx, None);
        assert!(at_step < 1e-12, "cost {at_step}");
        let too_high = fit.evaluate(&params(&[(TranslationZ, tz + 4.0)]), &ctx, None);
        assert!(too_high > 0.05);
        // upside down: the head is below the plane
        let flipped = fit.evaluate(&params(&[(TranslationZ, tz), (RotationX, 180.0)]), &ctx, None);
        assert!(flipped > too_high);
    }

    #[test]
    fn test_degenerate_volume() {
        let fit = SelfFit::new(&Volume::empty(), SelfFitConfig::default()).unwrap();
        assert!(fit.is_degenerate());
        let mut stats = Statistics::new();
        let cost = fit.evaluate(&params(&[]), &ctx(SelfFitMode::Sagittal), Some(&mut stats));
        assert_eq!(cost, MAX_EVALUATION);

        let flat = SelfFit::new(&Volume::new([4, 4, 4]), SelfFitConfig::default()).unwrap();
        assert!(flat.is_degenerate());
    }

    #[test]
    fn test_degenerate_flag_is_fixed_at_construction() {
        let volume = ellipsoid(15);
        for threshold in [0.0, 50.0, 99.0, 100.0, 150.0] {
            let fit = SelfFit::new(&volume, SelfFitConfig::default().with_threshold(threshold)).unwrap();
            assert_eq!(fit.degenerate, volume.count_above(threshold) == 0, "threshold {threshold}");
        }
        let fit = SelfFit::new(&volume, SelfFitConfig::default().with_threshold(100.0)).unwrap();
        let ctx = ctx(SelfFitMode::Guillotine);
        for _ in 0..3 {
            assert_eq!(fit.evaluate(&params(&[]), &ctx, None), MAX_EVALUATION);
        }
    }

    #[test]
    fn test_invalid_config() {
        let config = SelfFitConfig::default().with_sample_step(0.0);
        assert!(SelfFit::new(&ellipsoid(9), config).is_err());
    }
}
