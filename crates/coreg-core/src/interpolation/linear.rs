//! Linear interpolation implementation.

use super::trait_::Interpolator;
use crate::spatial::Point3;
use crate::volume::Volume;

/// Trilinear interpolation over the 8 surrounding voxels.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearInterpolator;

impl Interpolator for LinearInterpolator {
    fn interpolate(&self, volume: &Volume, index: &Point3) -> f32 {
        let x0 = index[0].floor();
        let y0 = index[1].floor();
        let z0 = index[2].floor();
        let fx = index[0] - x0;
        let fy = index[1] - y0;
        let fz = index[2] - z0;
        let (x0, y0, z0) = (x0 as i64, y0 as i64, z0 as i64);

        let v = |dx: i64, dy: i64, dz: i64| volume.get_checked(x0 + dx, y0 + dy, z0 + dz) as f64;

        let c00 = v(0, 0, 0) * (1.0 - fx) + v(1, 0, 0) * fx;
        let c10 = v(0, 1, 0) * (1.0 - fx) + v(1, 1, 0) * fx;
        let c01 = v(0, 0, 1) * (1.0 - fx) + v(1, 0, 1) * fx;
        let c11 = v(0, 1, 1) * (1.0 - fx) + v(1, 1, 1) * fx;

        let c0 = c00 * (1.0 - fy) + c10 * fy;
        let c1 = c01 * (1.0 - fy) + c11 * fy;

        (c0 * (1.0 - fz) + c1 * fz) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_exact_on_grid() {
        let v = Volume::from_fn([3, 3, 3], |x, y, z| (x * y + z) as f32);
        let value = LinearInterpolator.interpolate(&v, &Point3::new([2.0, 1.0, 1.0]));
        assert_eq!(value, 3.0);
    }

    #[test]
    fn test_linear_reproduces_affine_field() {
        let v = Volume::from_fn([4, 4, 4], |x, y, z| (x + 2 * y + 3 * z) as f32);
        let value = LinearInterpolator.interpolate(&v, &Point3::new([1.25, 0.5, 2.75]));
        assert!((value - (1.25 + 1.0 + 8.25)).abs() < 1e-5);
    }
}
