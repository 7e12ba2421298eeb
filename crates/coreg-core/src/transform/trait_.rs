//! Transform trait for spatial coordinate transformations.

use crate::spatial::Point3;

/// Maps points from one physical space to another.
pub trait Transform {
    /// Apply the transform to a single point.
    fn transform_point(&self, point: &Point3) -> Point3;

    /// Apply the transform to a batch of points.
    fn transform_points(&self, points: &[Point3]) -> Vec<Point3> {
        points.iter().map(|p| self.transform_point(p)).collect()
    }

    /// Get the inverse transform (if available).
    ///
    /// Not every transform is invertible, so this returns an Option.
    fn inverse(&self) -> Option<Box<dyn Transform>> {
        None
    }
}
