//! Nearest neighbour interpolation.

use super::trait_::Interpolator;
use crate::spatial::Point3;
use crate::volume::Volume;

/// Returns the value of the closest voxel.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestInterpolator;

impl Interpolator for NearestInterpolator {
    fn interpolate(&self, volume: &Volume, index: &Point3) -> f32 {
        volume.get_checked(
            index[0].round() as i64,
            index[1].round() as i64,
            index[2].round() as i64,
        )
    }
}
