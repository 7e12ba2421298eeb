//! Ordered 3D point sets.
//!
//! Insertion order matters: index `i` correlates with external name lists.
//! A point at the exact origin is a "null" point meaning no data; geometric
//! summaries skip it and transforms leave it untouched.

use serde::{Deserialize, Serialize};

use crate::bounding_box::BoundingBox;
use crate::spatial::Point3;
use crate::transform::{Matrix44, MultiplySide};

/// Ordered, mutable list of points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    points: Vec<Point3>,
}

impl PointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: Vec<Point3>) -> Self {
        Self { points }
    }

    pub fn push(&mut self, point: Point3) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Point3> {
        self.points.get(index)
    }

    pub fn set(&mut self, index: usize, point: Point3) {
        self.points[index] = point;
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point3> {
        self.points.iter()
    }

    pub fn as_slice(&self) -> &[Point3] {
        &self.points
    }

    /// Points carrying data (not at the exact origin).
    pub fn valid_points(&self) -> impl Iterator<Item = &Point3> {
        self.points.iter().filter(|p| !p.is_null())
    }

    pub fn valid_count(&self) -> usize {
        self.valid_points().count()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.valid_points())
    }

    pub fn center_of_mass(&self) -> Option<Point3> {
        let mut sum = [0.0; 3];
        let mut n = 0usize;
        for p in self.valid_points() {
            for (d, s) in sum.iter_mut().enumerate() {
                *s += p[d];
            }
            n += 1;
        }
        (n > 0).then(|| Point3::new(sum.map(|s| s / n as f64)))
    }

    /// Center the points on their center of mass and scale them to a unit
    /// mean radius. Returns the matrix that was applied, or `None` when
    /// there is nothing to normalize.
    pub fn normalize(&mut self) -> Option<Matrix44> {
        let center = self.center_of_mass()?;
        let mean_radius = {
            let n = self.valid_count() as f64;
            self.valid_points().map(|p| p.distance(&center)).sum::<f64>() / n
        };
        let mut m = Matrix44::translation(-center[0], -center[1], -center[2]);
        m.scale_uniform(1.0 / crate::non_null(mean_radius), MultiplySide::Left);
        self.transform(&m);
        Some(m)
    }

    /// `count` points picked evenly along the sequence.
    pub fn resample(&self, count: usize) -> PointSet {
        if self.is_empty() || count == 0 {
            return PointSet::new();
        }
        if count == 1 {
            return PointSet::from_points(vec![self.points[0]]);
        }
        let last = (self.len() - 1) as f64;
        let points = (0..count)
            .map(|i| {
                let idx = (i as f64 * last / (count - 1) as f64).round() as usize;
                self.points[idx]
            })
            .collect();
        PointSet::from_points(points)
    }

    /// Every `step`-th point, starting with the first.
    pub fn downsample(&self, step: usize) -> PointSet {
        PointSet::from_points(self.points.iter().step_by(step.max(1)).copied().collect())
    }

    /// Apply `matrix` in place; null points stay null.
    pub fn transform(&mut self, matrix: &Matrix44) {
        for p in self.points.iter_mut().filter(|p| !p.is_null()) {
            *p = matrix.apply(p);
        }
    }

    pub fn transformed(&self, matrix: &Matrix44) -> PointSet {
        let mut out = self.clone();
        out.transform(matrix);
        out
    }
}

impl FromIterator<Point3> for PointSet {
    fn from_iter<I: IntoIterator<Item = Point3>>(iter: I) -> Self {
        Self::from_points(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a Point3;
    type IntoIter = std::slice::Iter<'a, Point3>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
