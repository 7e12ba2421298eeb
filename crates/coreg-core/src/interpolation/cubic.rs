//! Catmull-Rom cubic interpolation.

use super::trait_::Interpolator;
use crate::spatial::Point3;
use crate::volume::Volume;

/// Separable Catmull-Rom spline over the 4×4×4 neighbourhood.
///
/// Interpolating (passes through the voxel values) but may overshoot near edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct CubicInterpolator;

fn weights(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ]
}

impl Interpolator for CubicInterpolator {
    fn interpolate(&self, volume: &Volume, index: &Point3) -> f32 {
        let base = [index[0].floor(), index[1].floor(), index[2].floor()];
        let wx = weights(index[0] - base[0]);
        let wy = weights(index[1] - base[1]);
        let wz = weights(index[2] - base[2]);
        let (bx, by, bz) = (base[0] as i64 - 1, base[1] as i64 - 1, base[2] as i64 - 1);

        let mut acc = 0.0f64;
        for (k, wzk) in wz.iter().enumerate() {
            let mut plane = 0.0;
            for (j, wyj) in wy.iter().enumerate() {
                let mut row = 0.0;
                for (i, wxi) in wx.iter().enumerate() {
                    row += wxi * volume.get_checked(bx + i as i64, by + j as i64, bz + k as i64) as f64;
                }
                plane += wyj * row;
            }
            acc += wzk * plane;
        }
        acc as f32
    }
}
