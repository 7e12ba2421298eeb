//! Resample a volume onto a new grid through a transform.

use rayon::prelude::*;

use crate::interpolation::Interpolation;
use crate::spatial::Point3;
use crate::transform::Matrix44;
use crate::volume::{Volume, VolumeGeometry};

/// Resample filter.
///
/// Every output voxel is mapped to output physical space, through
/// `transform` into input physical space, then to an input continuous index
/// where the input is interpolated. The transform therefore maps
/// output space to input space, the inverse of a source-to-target fit.
#[derive(Debug, Clone)]
pub struct ResampleFilter {
    size: [usize; 3],
    geometry: VolumeGeometry,
    transform: Matrix44,
    interpolation: Interpolation,
    default_value: Option<f32>,
}

impl ResampleFilter {
    /// Create a new resample filter.
    ///
    /// # Arguments
    /// * `size` - Output grid dims
    /// * `geometry` - Output grid geometry
    /// * `transform` - Output physical space to input physical space
    pub fn new(size: [usize; 3], geometry: VolumeGeometry, transform: Matrix44) -> Self {
        Self {
            size,
            geometry,
            transform,
            interpolation: Interpolation::Linear,
            default_value: None,
        }
    }

    /// Output grid copied from a reference volume.
    pub fn from_reference(reference: &Volume, transform: Matrix44) -> Self {
        Self::new(reference.dims(), *reference.geometry(), transform)
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Value for output voxels falling outside the input.
    /// Defaults to the input's background level.
    pub fn with_default_value(mut self, value: f32) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Apply the filter to an input volume.
    pub fn apply(&self, input: &Volume) -> Volume {
        // output index -> output world -> input world -> input index
        let chain = input.geometry().world_to_index_matrix()
            * self.transform
            * self.geometry.index_to_world_matrix();
        let default = self.default_value.unwrap_or_else(|| input.background());
        let [dx, dy, _] = self.size;
        let len = self.size.iter().product::<usize>();

        let data: Vec<f32> = (0..len)
            .into_par_iter()
            .map(|i| {
                let index = Point3::new([(i % dx) as f64, ((i / dx) % dy) as f64, (i / (dx * dy)) as f64]);
                let source = chain.apply(&index);
                if input.contains_index(&source) {
                    input.sample(&source, self.interpolation)
                } else {
                    default
                }
            })
            .collect();

        let mut out = Volume::new(self.size).with_geometry(self.geometry);
        out.data_mut().copy_from_slice(&data);
        out.refresh_statistics();
        out
    }
}
