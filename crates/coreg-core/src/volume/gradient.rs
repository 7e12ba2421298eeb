//! Precomputed intensity gradient of a volume.

use rayon::prelude::*;

use super::volume::Volume;
use crate::interpolation::Interpolation;
use crate::spatial::{Point3, Vector3};

/// Central-difference gradient stored as one volume per component.
#[derive(Debug, Clone)]
pub struct GradientField {
    components: [Volume; 3],
}

impl GradientField {
    /// Compute the gradient of `volume` at every voxel.
    pub fn from_volume(volume: &Volume) -> Self {
        let len = volume.len();
        let grads: Vec<Vector3> = (0..len)
            .into_par_iter()
            .map(|i| {
                let [x, y, z] = volume.coords(i);
                volume.gradient_at(x, y, z)
            })
            .collect();

        let component = |d: usize| {
            let data: Vec<f32> = grads.iter().map(|g| g[d] as f32).collect();
            let mut v = Volume::from_vec(volume.dims(), data)
                .unwrap_or_else(|_| Volume::new(volume.dims()))
                .with_geometry(*volume.geometry());
            v.set_background(0.0);
            v
        };

        Self {
            components: [component(0), component(1), component(2)],
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        self.components[0].dims()
    }

    pub fn is_empty(&self) -> bool {
        self.components[0].is_empty()
    }

    /// Component volume along axis `d`.
    pub fn component(&self, d: usize) -> &Volume {
        &self.components[d]
    }

    /// Linearly interpolated gradient at a continuous voxel index.
    pub fn at(&self, index: &Point3) -> Vector3 {
        Vector3::new([
            self.components[0].sample(index, Interpolation::Linear) as f64,
            self.components[1].sample(index, Interpolation::Linear) as f64,
            self.components[2].sample(index, Interpolation::Linear) as f64,
        ])
    }
}
