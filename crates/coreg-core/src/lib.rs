//! Core data model for MRI / electrode coregistration.
//!
//! This crate provides the value types shared by the optimizer and the
//! objective functions: spatial points and vectors, the 4×4 homogeneous
//! transform algebra, sampled volumes with their physical geometry,
//! interpolation, volume filters, point sets, bounding boxes and sample
//! statistics.

pub mod error;
pub mod spatial;
pub mod transform;
pub mod volume;
pub mod interpolation;
pub mod filter;
pub mod pointset;
pub mod bounding_box;
pub mod stats;
pub mod io;

pub use error::{CoreError, Result};
pub use spatial::{Axis, Direction3, Point3, Spacing3, Vector3};
pub use transform::{Matrix44, MultiplySide, Transform};
pub use volume::{GradientField, Volume, VolumeGeometry};
pub use interpolation::Interpolation;
pub use pointset::PointSet;
pub use bounding_box::BoundingBox;
pub use stats::Statistics;

/// Smallest magnitude accepted as a divisor.
pub const EPSILON: f64 = 1e-12;

/// Clamp a divisor away from zero, keeping its sign.
///
/// Every division by a quantity derived from data extents or sample counts
/// goes through this helper.
#[inline]
pub fn non_null(value: f64) -> f64 {
    if value.abs() < EPSILON {
        if value.is_sign_negative() {
            -EPSILON
        } else {
            EPSILON
        }
    } else {
        value
    }
}
