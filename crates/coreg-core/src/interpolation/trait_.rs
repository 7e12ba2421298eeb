//! Interpolator trait for sampling values at continuous coordinates.

use crate::spatial::Point3;
use crate::volume::Volume;

/// Samples a volume at non-integer voxel indices.
///
/// Neighbours falling outside the grid read the volume's background level
/// through [`Volume::get_checked`], so implementations never index out of bounds.
pub trait Interpolator: Send + Sync {
    /// Interpolate `volume` at the continuous voxel `index`.
    fn interpolate(&self, volume: &Volume, index: &Point3) -> f32;
}
