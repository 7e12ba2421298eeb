//! Radial search for the iso-surface of a thresholded volume.

use coreg_core::{GradientField, Interpolation, Point3, Vector3, Volume};
use serde::{Deserialize, Serialize};

/// Nearest crossing of the threshold surface along the radial direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceHit {
    /// Distance to the surface in voxels, corrected toward the surface normal.
    pub distance: f64,
    /// Crossing point in voxel coordinates.
    pub surface_point: Point3,
    /// True when the query point was inside the surface.
    pub inside: bool,
}

/// Searches the threshold crossing along the line through a center point.
///
/// All coordinates are continuous voxel indices of `volume`. The raw radial
/// gap is multiplied by the cosine between the search direction and the
/// local intensity gradient, approximating the orthogonal distance.
pub struct SurfaceSearch<'a> {
    volume: &'a Volume,
    gradient: Option<&'a GradientField>,
    threshold: f32,
    center: Point3,
    max_distance: f64,
    initial_step: f64,
    max_step: f64,
    precision: f64,
}

impl<'a> SurfaceSearch<'a> {
    /// Search around the geometric center of the grid.
    pub fn new(volume: &'a Volume, threshold: f32) -> Self {
        let [dx, dy, dz] = volume.dims();
        let diagonal = ((dx * dx + dy * dy + dz * dz) as f64).sqrt();
        Self {
            volume,
            gradient: None,
            threshold,
            center: volume.center(),
            max_distance: diagonal.max(1.0),
            initial_step: 0.5,
            max_step: 4.0,
            precision: 1e-3,
        }
    }

    pub fn with_center(mut self, center: Point3) -> Self {
        self.center = center;
        self
    }

    /// Use a precomputed gradient for the normal correction.
    pub fn with_gradient(mut self, gradient: &'a GradientField) -> Self {
        self.gradient = Some(gradient);
        self
    }

    /// Bisection stops once the bracket is below `precision` voxels.
    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision.max(1e-9);
        self
    }

    pub fn center(&self) -> &Point3 {
        &self.center
    }

    fn is_inside(&self, p: &Point3) -> bool {
        self.volume.sample(p, Interpolation::Linear) >= self.threshold
    }

    fn gradient(&self, p: &Point3) -> Vector3 {
        if let Some(field) = self.gradient {
            return field.at(p);
        }
        let mut g = [0.0; 3];
        for (d, component) in g.iter_mut().enumerate() {
            let mut ahead = *p;
            let mut behind = *p;
            ahead[d] += 0.5;
            behind[d] -= 0.5;
            *component = (self.volume.sample(&ahead, Interpolation::Linear)
                - self.volume.sample(&behind, Interpolation::Linear)) as f64;
        }
        Vector3::new(g)
    }

    /// Outward radial direction at `point`; straight up at the center.
    pub fn direction(&self, point: &Point3) -> Vector3 {
        (*point - self.center).normalized().unwrap_or_else(Vector3::z_axis)
    }

    /// Distance from `point` to the surface, `None` when no crossing exists
    /// along the radial line.
    pub fn minimum_distance(&self, point: &Point3) -> Option<SurfaceHit> {
        if self.volume.is_empty() || !point.is_finite() {
            return None;
        }
        let inside = self.is_inside(point);
        // inside points move outward, outside points move toward the center
        let dir = if inside { self.direction(point) } else { -self.direction(point) };
        let limit = if inside {
            self.max_distance
        } else {
            (*point - self.center).norm() + self.initial_step
        };

        let mut near = 0.0;
        let mut step = self.initial_step;
        let far = loop {
            let t = (near + step).min(limit);
            if self.is_inside(&(*point + dir * t)) != inside {
                break t;
            }
            if t >= limit {
                return None;
            }
            near = t;
            step = (step * 2.0).min(self.max_step);
        };

        let (mut lo, mut hi) = (near, far);
        while hi - lo > self.precision {
            let mid = 0.5 * (lo + hi);
            if self.is_inside(&(*point + dir * mid)) == inside {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let raw = 0.5 * (lo + hi);
        let surface_point = *point + dir * raw;

        let cosine = self
            .gradient(&surface_point)
            .normalized()
            .map_or(1.0, |g| g.dot(&dir).abs());
        Some(SurfaceHit {
            distance: raw * cosine,
            surface_point,
            inside,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Radial ramp crossing 50 at radius 10 around (16, 16, 16).
    fn ramp_sphere() -> Volume {
        Volume::from_fn([33, 33, 33], |x, y, z| {
            let r = ((x as f64 - 16.0).powi(2) + (y as f64 - 16.0).powi(2) + (z as f64 - 16.0).powi(2)).sqrt();
            (100.0 - 5.0 * r).max(0.0) as f32
        })
    }

    #[test]
    fn test_point_on_surface() {
        let volume = ramp_sphere();
        let search = SurfaceSearch::new(&volume, 50.0).with_center(Point3::new([16.0, 16.0, 16.0]));
        let hit = search.minimum_distance(&Point3::new([26.0, 16.0, 16.0])).unwrap();
        assert!(hit.distance < 0.1, "distance {}", hit.distance);
    }

    #[test]
    fn test_point_at_center() {
        let volume = ramp_sphere();
        let center = Point3::new([16.0, 16.0, 16.0]);
        let search = SurfaceSearch::new(&volume, 50.0).with_center(center);
        let hit = search.minimum_distance(&center).unwrap();
        assert!(hit.inside);
        assert!((hit.distance - 10.0).abs() < 0.2, "distance {}", hit.distance);
        assert!((hit.surface_point.distance(&center) - 10.0).abs() < 0.2);
    }

    #[test]
    fn test_outside_point_moves_inward() {
        let volume = ramp_sphere();
        let center = Point3::new([16.0, 16.0, 16.0]);
        let gradient = GradientField::from_volume(&volume);
        let search = SurfaceSearch::new(&volume, 50.0)
            .with_center(center)
            .with_gradient(&gradient);
        let hit = search.minimum_distance(&Point3::new([16.0, 30.0, 16.0])).unwrap();
        assert!(!hit.inside);
        assert!((hit.distance - 4.0).abs() < 0.2, "distance {}", hit.distance);
    }

    #[test]
    fn test_empty_volume_has_no_surface() {
        let volume = Volume::new([8, 8, 8]);
        let search = SurfaceSearch::new(&volume, 0.5);
        assert!(search.minimum_distance(&Point3::new([4.0, 4.0, 4.0])).is_none());
        let empty = Volume::empty();
        assert!(SurfaceSearch::new(&empty, 0.5)
            .minimum_distance(&Point3::origin())
            .is_none());
    }
}
