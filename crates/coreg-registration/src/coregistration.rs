//! Editable source-to-target transform with optional surface gluing.

use coreg_core::{GradientField, Matrix44, MultiplySide, Point3, PointSet, Transform, Volume};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RegistrationError, Result};
use crate::objective::SurfaceSearch;

/// Source-to-target transform kept as four independent factors.
///
/// The composed matrix is always `translate * rotate * scale * orientation`.
/// Each mutator only touches its own factor, so a snapshot of the whole
/// value is enough to undo any sequence of edits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoregistrationTransform {
    orientation: Matrix44,
    scale: Matrix44,
    rotate: Matrix44,
    translate: Matrix44,
    gluing: bool,
}

impl Default for CoregistrationTransform {
    fn default() -> Self {
        Self {
            orientation: Matrix44::identity(),
            scale: Matrix44::identity(),
            rotate: Matrix44::identity(),
            translate: Matrix44::identity(),
            gluing: false,
        }
    }
}

impl CoregistrationTransform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matrix(&self) -> Matrix44 {
        let mut m = self.orientation;
        m.multiply(&self.scale, MultiplySide::Left)
            .multiply(&self.rotate, MultiplySide::Left)
            .multiply(&self.translate, MultiplySide::Left);
        m
    }

    pub fn orientation(&self) -> &Matrix44 {
        &self.orientation
    }

    pub fn scale_matrix(&self) -> &Matrix44 {
        &self.scale
    }

    pub fn rotation(&self) -> &Matrix44 {
        &self.rotate
    }

    pub fn translation(&self) -> &Matrix44 {
        &self.translate
    }

    pub fn gluing(&self) -> bool {
        self.gluing
    }

    pub fn set_orientation(&mut self, orientation: Matrix44) -> &mut Self {
        self.orientation = orientation;
        self
    }

    pub fn rotate_x(&mut self, degrees: f64) -> &mut Self {
        self.rotate.rotate_x(degrees, MultiplySide::Left);
        self
    }

    pub fn rotate_y(&mut self, degrees: f64) -> &mut Self {
        self.rotate.rotate_y(degrees, MultiplySide::Left);
        self
    }

    pub fn rotate_z(&mut self, degrees: f64) -> &mut Self {
        self.rotate.rotate_z(degrees, MultiplySide::Left);
        self
    }

    pub fn translate_x(&mut self, t: f64) -> &mut Self {
        self.translate.translate_x(t, MultiplySide::Left);
        self
    }

    pub fn translate_y(&mut self, t: f64) -> &mut Self {
        self.translate.translate_y(t, MultiplySide::Left);
        self
    }

    pub fn translate_z(&mut self, t: f64) -> &mut Self {
        self.translate.translate_z(t, MultiplySide::Left);
        self
    }

    pub fn scale(&mut self, factor: f64) -> &mut Self {
        self.scale.scale_uniform(factor, MultiplySide::Left);
        self
    }

    pub fn scale_x(&mut self, factor: f64) -> &mut Self {
        self.scale.scale_x(factor, MultiplySide::Left);
        self
    }

    pub fn scale_y(&mut self, factor: f64) -> &mut Self {
        self.scale.scale_y(factor, MultiplySide::Left);
        self
    }

    pub fn scale_z(&mut self, factor: f64) -> &mut Self {
        self.scale.scale_z(factor, MultiplySide::Left);
        self
    }

    pub fn toggle_gluing(&mut self) -> &mut Self {
        self.gluing = !self.gluing;
        self
    }

    pub fn set_gluing(&mut self, gluing: bool) -> &mut Self {
        self.gluing = gluing;
        self
    }

    /// Back to identity with gluing off.
    pub fn reset(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }

    /// Linear part only; gluing needs volumes, see [`Self::apply`].
    pub fn apply_point(&self, point: &Point3) -> Point3 {
        self.matrix().apply(point)
    }

    /// Transform `points` in place and, when gluing is on, snap them onto
    /// the surface of `mask` before pushing them `inflate` world units
    /// outward from `origin`.
    ///
    /// Null points are left alone. With a `guillotine` plane (plane-local
    /// to mask voxel matrix), points below the plane keep their linear
    /// position. Returns how many points were snapped.
    pub fn apply(
        &self,
        points: &mut PointSet,
        mask: &Volume,
        gradient: Option<&GradientField>,
        origin: &Point3,
        guillotine: Option<&Matrix44>,
        inflate: f64,
    ) -> Result<usize> {
        points.transform(&self.matrix());
        if !self.gluing {
            return Ok(0);
        }
        if mask.is_empty() {
            return Err(RegistrationError::degenerate_input("gluing needs a non-empty mask"));
        }
        let below = match guillotine {
            Some(plane) => Some(
                plane
                    .inverse()
                    .ok_or_else(|| RegistrationError::numerical_instability("guillotine plane is singular"))?,
            ),
            None => None,
        };

        let geometry = mask.geometry();
        let background = mask.background();
        let threshold = background + 0.5 * (mask.max_value() - background);
        let mut search = SurfaceSearch::new(mask, threshold).with_center(geometry.world_to_index(origin));
        if let Some(field) = gradient {
            search = search.with_gradient(field);
        }
        let inflate_voxels = inflate / geometry.spacing().mean_spacing();

        let mut glued = 0;
        for i in 0..points.len() {
            let Some(&world) = points.get(i) else { continue };
            if world.is_null() {
                continue;
            }
            let index = geometry.world_to_index(&world);
            if below.is_some_and(|m| m.apply(&index)[2] < 0.0) {
                continue;
            }
            if let Some(hit) = search.minimum_distance(&index) {
                let snapped = hit.surface_point + search.direction(&hit.surface_point) * inflate_voxels;
                points.set(i, geometry.index_to_world(&snapped));
                glued += 1;
            }
        }
        debug!(glued, total = points.len(), "points glued to surface");
        Ok(glued)
    }
}

impl Transform for CoregistrationTransform {
    fn transform_point(&self, point: &Point3) -> Point3 {
        self.apply_point(point)
    }

    fn inverse(&self) -> Option<Box<dyn Transform>> {
        self.matrix().inverse().map(|m| Box::new(m) as Box<dyn Transform>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_sphere() -> Volume {
        Volume::from_fn([33, 33, 33], |x, y, z| {
            let r = ((x as f64 - 16.0).powi(2) + (y as f64 - 16.0).powi(2) + (z as f64 - 16.0).powi(2)).sqrt();
            (100.0 - 5.0 * r).max(0.0) as f32
        })
    }

    #[test]
    fn test_default_is_identity() {
        let t = CoregistrationTransform::new();
        assert!(t.matrix().is_identity(1e-12));
        assert!(!t.gluing());
    }

    #[test]
    fn test_factor_order_ignores_call_order() {
        let mut a = CoregistrationTransform::new();
        a.rotate_x(30.0).translate_y(10.0);
        let mut b = CoregistrationTransform::new();
        b.translate_y(10.0).rotate_x(30.0);
        assert!(a.matrix().approx_eq(&b.matrix(), 1e-12));

        let translate_after = Matrix44::translation(0.0, 10.0, 0.0) * Matrix44::rotation_x(30.0);
        let translate_before = Matrix44::rotation_x(30.0) * Matrix44::translation(0.0, 10.0, 0.0);
        assert!(a.matrix().approx_eq(&translate_after, 1e-12));
        assert!(!a.matrix().approx_eq(&translate_before, 1e-6));
    }

    #[test]
    fn test_increments_accumulate() {
        let mut t = CoregistrationTransform::new();
        t.rotate_z(10.0).rotate_z(15.0).scale(2.0).scale_x(1.5);
        assert!(t.rotation().approx_eq(&Matrix44::rotation_z(25.0), 1e-12));
        assert!(t.scale_matrix().approx_eq(&Matrix44::scaling(3.0, 2.0, 2.0), 1e-12));
        assert!(t.translation().is_identity(1e-12));
    }

    #[test]
    fn test_orientation_applies_first() {
        let mut t = CoregistrationTransform::new();
        t.set_orientation(Matrix44::rotation_z(90.0)).translate_x(5.0);
        let p = t.apply_point(&Point3::new([1.0, 0.0, 0.0]));
        assert!((p[0] - 5.0).abs() < 1e-9);
        assert!((p[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut t = CoregistrationTransform::new();
        t.rotate_y(12.0).translate_z(-3.0).scale_z(0.9).toggle_gluing();
        let json = serde_json::to_string(&t).unwrap();
        let back: CoregistrationTransform = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);

        let snapshot = t;
        t.reset();
        assert!(t.matrix().is_identity(1e-12));
        assert!(snapshot.gluing());
    }

    #[test]
    fn test_apply_without_gluing_is_linear() {
        let mask = ramp_sphere();
        let mut t = CoregistrationTransform::new();
        t.translate_x(2.0);
        let mut points = PointSet::from_points(vec![Point3::new([1.0, 1.0, 1.0]), Point3::origin()]);
        let glued = t.apply(&mut points, &mask, None, &Point3::new([16.0, 16.0, 16.0]), None, 0.0).unwrap();
        assert_eq!(glued, 0);
        assert_eq!(points.get(0).unwrap()[0], 3.0);
        assert!(points.get(1).unwrap().is_null());
    }

    #[test]
    fn test_gluing_snaps_and_inflates() {
        let mask = ramp_sphere();
        let center = Point3::new([16.0, 16.0, 16.0]);
        let mut t = CoregistrationTransform::new();
        t.set_gluing(true);
        let mut points = PointSet::from_points(vec![
            Point3::new([30.0, 16.0, 16.0]),
            Point3::new([16.0, 20.0, 16.0]),
        ]);
        let glued = t.apply(&mut points, &mask, None, &center, None, 1.0).unwrap();
        assert_eq!(glued, 2);
        for p in points.iter() {
            assert!((p.distance(&center) - 11.0).abs() < 0.1, "radius {}", p.distance(&center));
        }
    }

    #[test]
    fn test_gluing_skips_points_below_guillotine() {
        let mask = ramp_sphere();
        let center = Point3::new([16.0, 16.0, 16.0]);
        let mut t = CoregistrationTransform::new();
        t.set_gluing(true);
        let plane = Matrix44::translation(0.0, 0.0, 16.0);
        let mut points = PointSet::from_points(vec![
            Point3::new([16.0, 16.0, 30.0]),
            Point3::new([16.0, 16.0, 2.0]),
        ]);
        let glued = t.apply(&mut points, &mask, None, &center, Some(&plane), 0.0).unwrap();
        assert_eq!(glued, 1);
        assert!((points.get(0).unwrap()[2] - 26.0).abs() < 0.1);
        assert_eq!(points.get(1).unwrap()[2], 2.0);
    }
}
