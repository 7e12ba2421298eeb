//! Axis-aligned bounding boxes.

use serde::{Deserialize, Serialize};

use crate::spatial::{Point3, Vector3};
use crate::volume::Volume;

/// Axis-aligned box with `min[i] <= max[i]` on every axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    min: Point3,
    max: Point3,
}

impl BoundingBox {
    /// Box spanning two corners given in any order.
    pub fn new(a: Point3, b: Point3) -> Self {
        let mut min = a;
        let mut max = b;
        for i in 0..3 {
            if min[i] > max[i] {
                std::mem::swap(&mut min[i], &mut max[i]);
            }
        }
        Self { min, max }
    }

    /// Smallest box containing every point, `None` when the iterator is empty.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bbox = Self { min: first, max: first };
        for p in iter {
            bbox.include(p);
        }
        Some(bbox)
    }

    /// Box of the voxels strictly above `threshold`, in voxel coordinates.
    pub fn from_volume(volume: &Volume, threshold: f32) -> Option<Self> {
        let [dx, dy, dz] = volume.dims();
        let mut lo = [usize::MAX; 3];
        let mut hi = [0usize; 3];
        let mut any = false;
        for z in 0..dz {
            for y in 0..dy {
                for x in 0..dx {
                    if volume.get(x, y, z) > threshold {
                        any = true;
                        for (d, c) in [x, y, z].into_iter().enumerate() {
                            lo[d] = lo[d].min(c);
                            hi[d] = hi[d].max(c);
                        }
                    }
                }
            }
        }
        any.then(|| Self {
            min: Point3::new(lo.map(|v| v as f64)),
            max: Point3::new(hi.map(|v| v as f64)),
        })
    }

    pub fn min(&self) -> &Point3 {
        &self.min
    }

    pub fn max(&self) -> &Point3 {
        &self.max
    }

    /// Grow the box to contain `point`.
    pub fn include(&mut self, point: &Point3) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(point[i]);
            self.max[i] = self.max[i].max(point[i]);
        }
    }

    pub fn center(&self) -> Point3 {
        Point3::new([
            0.5 * (self.min[0] + self.max[0]),
            0.5 * (self.min[1] + self.max[1]),
            0.5 * (self.min[2] + self.max[2]),
        ])
    }

    /// Size along each axis, never negative.
    pub fn extent(&self) -> Vector3 {
        self.max - self.min
    }

    /// Half extent along each axis.
    pub fn radii(&self) -> Vector3 {
        self.extent() * 0.5
    }

    /// Largest half extent.
    pub fn radius(&self) -> f64 {
        let r = self.radii();
        r[0].max(r[1]).max(r[2])
    }

    /// Mean of the three half extents.
    pub fn mean_radius(&self) -> f64 {
        let r = self.radii();
        (r[0] + r[1] + r[2]) / 3.0
    }

    pub fn contains(&self, point: &Point3) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }

    /// Box grown by `margin` on every side; a negative margin never inverts the box.
    pub fn expand(&self, margin: f64) -> Self {
        let mut out = *self;
        for i in 0..3 {
            let center = 0.5 * (self.min[i] + self.max[i]);
            out.min[i] = (self.min[i] - margin).min(center);
            out.max[i] = (self.max[i] + margin).max(center);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let pts = [
            Point3::new([1.0, -2.0, 3.0]),
            Point3::new([-1.0, 4.0, 0.0]),
        ];
        let b = BoundingBox::from_points(pts.iter()).unwrap();
        assert_eq!(b.min(), &Point3::new([-1.0, -2.0, 0.0]));
        assert_eq!(b.max(), &Point3::new([1.0, 4.0, 3.0]));
        assert_eq!(b.center(), Point3::new([0.0, 1.0, 1.5]));
        assert_eq!(b.radius(), 3.0);
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_from_volume() {
        let v = Volume::from_fn([6, 6, 6], |x, y, z| if x >= 2 && y == 3 && z < 2 { 1.0 } else { 0.0 });
        let b = BoundingBox::from_volume(&v, 0.5).unwrap();
        assert_eq!(b.min(), &Point3::new([2.0, 3.0, 0.0]));
        assert_eq!(b.max(), &Point3::new([5.0, 3.0, 1.0]));
        assert!(BoundingBox::from_volume(&v, 2.0).is_none());
    }

    #[test]
    fn test_expand_never_inverts() {
        let b = BoundingBox::new(Point3::new([0.0, 0.0, 0.0]), Point3::new([2.0, 2.0, 2.0]));
        let shrunk = b.expand(-5.0);
        for i in 0..3 {
            assert!(shrunk.min()[i] <= shrunk.max()[i]);
        }
        assert!(b.expand(1.0).contains(&Point3::new([-0.5, 2.5, 1.0])));
    }
}
