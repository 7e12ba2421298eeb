//! Interpolation of volume values at continuous voxel indices.

pub mod trait_;
pub mod nearest;
pub mod linear;
pub mod cubic;

use serde::{Deserialize, Serialize};

pub use trait_::Interpolator;
pub use nearest::NearestInterpolator;
pub use linear::LinearInterpolator;
pub use cubic::CubicInterpolator;

/// Interpolation method selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interpolation {
    Nearest,
    #[default]
    Linear,
    /// Catmull-Rom cubic.
    Cubic,
}

impl Interpolation {
    /// Interpolator implementing this method.
    pub fn interpolator(self) -> &'static dyn Interpolator {
        match self {
            Interpolation::Nearest => &NearestInterpolator,
            Interpolation::Linear => &LinearInterpolator,
            Interpolation::Cubic => &CubicInterpolator,
        }
    }
}
