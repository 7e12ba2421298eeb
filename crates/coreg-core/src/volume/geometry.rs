//! Volume geometry: how voxel indices map to physical coordinates.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::spatial::{Direction3, Point3, Spacing3, Vector3};
use crate::transform::Matrix44;

/// Physical placement of a voxel grid.
///
/// `world = origin + direction * (index ⊙ spacing)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeGeometry {
    /// Physical coordinate of voxel (0, 0, 0).
    origin: Point3,
    /// Physical distance between voxels along each axis.
    spacing: Spacing3,
    /// Orientation of the volume axes.
    direction: Direction3,
}

impl VolumeGeometry {
    /// Create new geometry.
    ///
    /// Spacing must be strictly positive and the direction invertible.
    pub fn new(origin: Point3, spacing: Spacing3, direction: Direction3) -> Result<Self> {
        if (0..3).any(|i| spacing[i] <= 0.0 || !spacing[i].is_finite()) {
            return Err(CoreError::invalid_argument(format!(
                "spacing must be positive, got {:?}",
                spacing.to_array()
            )));
        }
        if direction.try_inverse().is_none() {
            return Err(CoreError::singular_matrix("volume direction"));
        }
        Ok(Self {
            origin,
            spacing,
            direction,
        })
    }

    /// Unit spacing, zero origin, identity direction with the given spacing.
    pub fn with_spacing(spacing: Spacing3) -> Result<Self> {
        Self::new(Point3::origin(), spacing, Direction3::identity())
    }

    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    pub fn spacing(&self) -> &Spacing3 {
        &self.spacing
    }

    pub fn direction(&self) -> &Direction3 {
        &self.direction
    }

    pub fn set_origin(&mut self, origin: Point3) {
        self.origin = origin;
    }

    /// Convert a continuous index to a physical point.
    pub fn index_to_world(&self, index: &Point3) -> Point3 {
        let mut scaled = Vector3::zeros();
        for i in 0..3 {
            scaled[i] = index[i] * self.spacing[i];
        }
        self.origin + self.direction * scaled
    }

    /// Convert a physical point to a continuous index.
    pub fn world_to_index(&self, point: &Point3) -> Point3 {
        self.world_to_index_matrix().apply(point)
    }

    /// Matrix mapping voxel indices to physical coordinates.
    pub fn index_to_world_matrix(&self) -> Matrix44 {
        let mut m = Matrix44::identity();
        for r in 0..3 {
            for c in 0..3 {
                m.0[(r, c)] = self.direction[(r, c)] * self.spacing[c];
            }
            m.0[(r, 3)] = self.origin[r];
        }
        m
    }

    /// Matrix mapping physical coordinates to voxel indices.
    pub fn world_to_index_matrix(&self) -> Matrix44 {
        // construction guarantees an invertible direction and positive spacing
        self.index_to_world_matrix()
            .inverse()
            .unwrap_or_else(Matrix44::identity)
    }
}

impl Default for VolumeGeometry {
    fn default() -> Self {
        Self {
            origin: Point3::origin(),
            spacing: Spacing3::uniform(1.0),
            direction: Direction3::identity(),
        }
    }
}
