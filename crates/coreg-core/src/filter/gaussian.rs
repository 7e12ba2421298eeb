//! Separable Gaussian smoothing.

use rayon::prelude::*;

use crate::volume::Volume;

/// Gaussian smoothing filter.
///
/// Applies separable 1D convolutions along each axis with edge replication.
/// Sigmas are in physical units unless [`GaussianFilter::in_voxels`] is set.
#[derive(Debug, Clone)]
pub struct GaussianFilter {
    sigmas: [f64; 3],
    voxel_units: bool,
    max_kernel_width: usize,
}

impl GaussianFilter {
    /// Create a new Gaussian filter with one standard deviation per axis.
    pub fn new(sigmas: [f64; 3]) -> Self {
        Self {
            sigmas,
            voxel_units: false,
            max_kernel_width: 65,
        }
    }

    /// Same sigma along every axis.
    pub fn isotropic(sigma: f64) -> Self {
        Self::new([sigma; 3])
    }

    /// Interpret sigmas as voxel counts instead of physical distances.
    pub fn in_voxels(mut self) -> Self {
        self.voxel_units = true;
        self
    }

    /// Set the maximum kernel width (radius * 2 + 1).
    pub fn with_max_kernel_width(mut self, width: usize) -> Self {
        self.max_kernel_width = width.max(1);
        self
    }

    /// Apply the filter, returning a new volume with the same geometry.
    pub fn apply(&self, volume: &Volume) -> Volume {
        let mut data = volume.data().to_vec();
        let dims = volume.dims();
        let spacing = *volume.geometry().spacing();

        for axis in 0..3 {
            let sigma = self.sigmas[axis];
            if sigma <= 1e-6 || dims[axis] < 2 {
                continue;
            }
            let voxel_sigma = if self.voxel_units { sigma } else { sigma / spacing[axis] };
            let radius = (3.0 * voxel_sigma).ceil() as usize;
            let width = (2 * radius + 1).min(self.max_kernel_width);
            let kernel = generate_kernel(voxel_sigma, (width - 1) / 2);
            data = convolve_axis(&data, dims, axis, &kernel);
        }

        volume.replaced(data)
    }
}

fn generate_kernel(sigma: f64, radius: usize) -> Vec<f32> {
    let two_sigma2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-x * x / two_sigma2).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel.into_iter().map(|v| v as f32).collect()
}

fn convolve_axis(input: &[f32], dims: [usize; 3], axis: usize, kernel: &[f32]) -> Vec<f32> {
    let radius = (kernel.len() / 2) as i64;
    let stride = match axis {
        0 => 1,
        1 => dims[0],
        _ => dims[0] * dims[1],
    };
    let n = dims[axis] as i64;

    (0..input.len())
        .into_par_iter()
        .map(|i| {
            let pos = ((i / stride) % dims[axis]) as i64;
            let line_start = i - pos as usize * stride;
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let p = (pos + k as i64 - radius).clamp(0, n - 1) as usize;
                    w * input[line_start + p * stride]
                })
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_normalized() {
        let k = generate_kernel(1.5, 5);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(k.len(), 11);
        assert!((k[0] - k[10]).abs() < 1e-7);
    }

    #[test]
    fn test_constant_volume_unchanged() {
        let v = Volume::from_fn([8, 6, 5], |_, _, _| 3.0);
        let out = GaussianFilter::isotropic(1.0).apply(&v);
        assert!(out.data().iter().all(|&x| (x - 3.0).abs() < 1e-5));
    }

    #[test]
    fn test_impulse_spreads_and_preserves_mass() {
        let v = Volume::from_fn([11, 11, 11], |x, y, z| if (x, y, z) == (5, 5, 5) { 1.0 } else { 0.0 });
        let out = GaussianFilter::isotropic(1.0).in_voxels().apply(&v);
        let total: f32 = out.data().iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(out.get(5, 5, 5) < 1.0);
        assert!(out.get(6, 5, 5) > 0.0);
        assert!((out.get(4, 5, 5) - out.get(6, 5, 5)).abs() < 1e-7);
    }
}
