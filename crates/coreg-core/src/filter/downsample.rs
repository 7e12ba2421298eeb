//! Integer-factor downsampling.

use crate::error::{CoreError, Result};
use crate::volume::{Volume, VolumeGeometry};

/// Downsample filter.
///
/// Reduces the volume size by integer factors, either by keeping every Nth
/// voxel or by averaging each N×N×N block. Spacing grows by the factor;
/// the origin is kept since sampling starts at index 0.
#[derive(Debug, Clone)]
pub struct DownsampleFilter {
    factors: [usize; 3],
    average: bool,
}

impl DownsampleFilter {
    /// Create a new downsample filter (keep every Nth voxel).
    pub fn new(factors: [usize; 3]) -> Self {
        Self {
            factors: factors.map(|f| f.max(1)),
            average: false,
        }
    }

    /// Same factor on all axes.
    pub fn uniform(factor: usize) -> Self {
        Self::new([factor; 3])
    }

    /// Average each block instead of picking its first voxel.
    pub fn with_averaging(mut self) -> Self {
        self.average = true;
        self
    }

    /// Apply the filter to a volume.
    pub fn apply(&self, volume: &Volume) -> Result<Volume> {
        let dims = volume.dims();
        let new_dims = [0, 1, 2].map(|d| dims[d].div_ceil(self.factors[d]));
        let [fx, fy, fz] = self.factors;

        let out = Volume::from_fn(new_dims, |x, y, z| {
            if !self.average {
                return volume.get(x * fx, y * fy, z * fz);
            }
            let mut sum = 0.0f64;
            let mut count = 0usize;
            for k in z * fz..((z + 1) * fz).min(dims[2]) {
                for j in y * fy..((y + 1) * fy).min(dims[1]) {
                    for i in x * fx..((x + 1) * fx).min(dims[0]) {
                        sum += volume.get(i, j, k) as f64;
                        count += 1;
                    }
                }
            }
            (sum / count.max(1) as f64) as f32
        });

        let g = volume.geometry();
        let mut spacing = *g.spacing();
        for d in 0..3 {
            spacing[d] *= self.factors[d] as f64;
        }
        let geometry = VolumeGeometry::new(*g.origin(), spacing, *g.direction())
            .map_err(|e| CoreError::invalid_argument(format!("downsampled geometry: {e}")))?;
        Ok(out.with_geometry(geometry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::Spacing3;

    #[test]
    fn test_downsample_pick() {
        let v = Volume::from_fn([5, 4, 2], |x, y, z| (x + 10 * y + 100 * z) as f32);
        let d = DownsampleFilter::uniform(2).apply(&v).unwrap();
        assert_eq!(d.dims(), [3, 2, 1]);
        assert_eq!(d.get(2, 1, 0), 24.0);
        assert_eq!(d.geometry().spacing(), &Spacing3::uniform(2.0));
    }

    #[test]
    fn test_downsample_average() {
        let v = Volume::from_fn([4, 2, 2], |x, _, _| x as f32);
        let d = DownsampleFilter::uniform(2).with_averaging().apply(&v).unwrap();
        assert_eq!(d.dims(), [2, 1, 1]);
        assert_eq!(d.data(), &[0.5, 2.5]);
    }
}
