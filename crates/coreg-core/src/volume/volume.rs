//! Dense 3D scalar volume.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::geometry::VolumeGeometry;
use crate::error::{CoreError, Result};
use crate::interpolation::Interpolation;
use crate::spatial::{Point3, Vector3};

/// A 3D scalar grid stored x-fastest.
///
/// Besides the voxels the volume caches two scalars that the objectives use
/// constantly: the background level (median of the border voxels) and the
/// maximum value. Both are refreshed on construction and by
/// [`Volume::refresh_statistics`] after in-place edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    dims: [usize; 3],
    data: Vec<f32>,
    geometry: VolumeGeometry,
    background: f32,
    max_value: f32,
}

impl Volume {
    /// Zero-filled volume with default geometry.
    pub fn new(dims: [usize; 3]) -> Self {
        let len = dims[0] * dims[1] * dims[2];
        Self {
            dims,
            data: vec![0.0; len],
            geometry: VolumeGeometry::default(),
            background: 0.0,
            max_value: 0.0,
        }
    }

    /// Unallocated volume. Objectives treat it as degenerate input.
    pub fn empty() -> Self {
        Self::new([0, 0, 0])
    }

    /// Wrap an existing x-fastest buffer.
    pub fn from_vec(dims: [usize; 3], data: Vec<f32>) -> Result<Self> {
        let expected = dims[0] * dims[1] * dims[2];
        if data.len() != expected {
            return Err(CoreError::dimension_mismatch(&[expected], &[data.len()]));
        }
        let mut volume = Self {
            dims,
            data,
            geometry: VolumeGeometry::default(),
            background: 0.0,
            max_value: 0.0,
        };
        volume.refresh_statistics();
        Ok(volume)
    }

    /// Build a volume by evaluating `f(x, y, z)` on every voxel.
    pub fn from_fn<F>(dims: [usize; 3], f: F) -> Self
    where
        F: Fn(usize, usize, usize) -> f32 + Sync,
    {
        let [dx, dy, _] = dims;
        let len = dims[0] * dims[1] * dims[2];
        let data: Vec<f32> = (0..len)
            .into_par_iter()
            .map(|i| f(i % dx, (i / dx) % dy, i / (dx * dy)))
            .collect();
        let mut volume = Self {
            dims,
            data,
            geometry: VolumeGeometry::default(),
            background: 0.0,
            max_value: 0.0,
        };
        volume.refresh_statistics();
        volume
    }

    /// Same voxels with a new geometry.
    pub fn with_geometry(mut self, geometry: VolumeGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// New volume with the same dims and geometry and the given voxels.
    pub fn with_data(&self, data: Vec<f32>) -> Result<Self> {
        Ok(Self::from_vec(self.dims, data)?.with_geometry(self.geometry))
    }

    /// Same dims and geometry around a buffer produced by a filter.
    ///
    /// Filters always produce one value per voxel.
    pub(crate) fn replaced(&self, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), self.data.len());
        let mut out = Self {
            dims: self.dims,
            data,
            geometry: self.geometry,
            background: 0.0,
            max_value: 0.0,
        };
        out.refresh_statistics();
        out
    }

    /// Apply `f` to every voxel, keeping dims and geometry.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f32) -> f32 + Sync,
    {
        self.replaced(self.data.par_iter().map(|&v| f(v)).collect())
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable voxels. Call [`Volume::refresh_statistics`] after editing.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    pub fn background(&self) -> f32 {
        self.background
    }

    /// Override the cached background level.
    pub fn set_background(&mut self, background: f32) {
        self.background = background;
    }

    pub fn max_value(&self) -> f32 {
        self.max_value
    }

    /// Linear offset of voxel `(x, y, z)`.
    #[inline]
    pub fn offset(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.dims[0] * (y + self.dims[1] * z)
    }

    /// Voxel coordinates of a linear offset.
    #[inline]
    pub fn coords(&self, offset: usize) -> [usize; 3] {
        let [dx, dy, _] = self.dims;
        [offset % dx, (offset / dx) % dy, offset / (dx * dy)]
    }

    /// Unchecked access; panics outside the grid like slice indexing.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
        self.data[self.offset(x, y, z)]
    }

    /// Checked access returning the background level outside the grid.
    #[inline]
    pub fn get_checked(&self, x: i64, y: i64, z: i64) -> f32 {
        if x < 0
            || y < 0
            || z < 0
            || x >= self.dims[0] as i64
            || y >= self.dims[1] as i64
            || z >= self.dims[2] as i64
        {
            return self.background;
        }
        self.get(x as usize, y as usize, z as usize)
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: f32) {
        let offset = self.offset(x, y, z);
        self.data[offset] = value;
    }

    /// True when the continuous index lies within half a voxel of the grid.
    pub fn contains_index(&self, index: &Point3) -> bool {
        (0..3).all(|i| index[i].is_finite() && index[i] >= -0.5 && index[i] <= self.dims[i] as f64 - 0.5)
    }

    /// Interpolated value at a continuous voxel index.
    ///
    /// Positions outside the grid yield the background level.
    pub fn sample(&self, index: &Point3, interpolation: Interpolation) -> f32 {
        if !self.contains_index(index) {
            return self.background;
        }
        interpolation.interpolator().interpolate(self, index)
    }

    /// Intensity gradient by central differences at an integer voxel.
    pub fn gradient_at(&self, x: usize, y: usize, z: usize) -> Vector3 {
        let (x, y, z) = (x as i64, y as i64, z as i64);
        Vector3::new([
            0.5 * (self.get_checked(x + 1, y, z) - self.get_checked(x - 1, y, z)) as f64,
            0.5 * (self.get_checked(x, y + 1, z) - self.get_checked(x, y - 1, z)) as f64,
            0.5 * (self.get_checked(x, y, z + 1) - self.get_checked(x, y, z - 1)) as f64,
        ])
    }

    /// Recompute the cached background and maximum.
    pub fn refresh_statistics(&mut self) {
        if self.data.is_empty() {
            self.background = 0.0;
            self.max_value = 0.0;
            return;
        }
        self.max_value = self
            .data
            .par_iter()
            .copied()
            .reduce(|| f32::NEG_INFINITY, f32::max);
        self.background = self.border_median();
    }

    fn border_median(&self) -> f32 {
        let [dx, dy, dz] = self.dims;
        let mut border: Vec<f32> = Vec::new();
        for z in 0..dz {
            for y in 0..dy {
                let on_yz_face = z == 0 || z == dz - 1 || y == 0 || y == dy - 1;
                if on_yz_face {
                    for x in 0..dx {
                        border.push(self.get(x, y, z));
                    }
                } else {
                    border.push(self.get(0, y, z));
                    if dx > 1 {
                        border.push(self.get(dx - 1, y, z));
                    }
                }
            }
        }
        border.sort_unstable_by(|a, b| a.total_cmp(b));
        border[border.len() / 2]
    }

    /// Number of voxels strictly above `threshold`.
    pub fn count_above(&self, threshold: f32) -> usize {
        self.data.par_iter().filter(|&&v| v > threshold).count()
    }

    /// Geometrical center in voxel coordinates.
    pub fn center(&self) -> Point3 {
        Point3::new([
            (self.dims[0] as f64 - 1.0) / 2.0,
            (self.dims[1] as f64 - 1.0) / 2.0,
            (self.dims[2] as f64 - 1.0) / 2.0,
        ])
    }

    /// Center of mass of voxels above `threshold`, in voxel coordinates.
    pub fn center_of_mass(&self, threshold: f32) -> Option<Point3> {
        let (sum, weight) = self
            .data
            .par_iter()
            .enumerate()
            .filter(|(_, &v)| v > threshold)
            .fold(
                || ([0.0f64; 3], 0.0f64),
                |(mut s, w), (i, &v)| {
                    let c = self.coords(i);
                    let v = v as f64;
                    for d in 0..3 {
                        s[d] += c[d] as f64 * v;
                    }
                    (s, w + v)
                },
            )
            .reduce(
                || ([0.0f64; 3], 0.0f64),
                |(a, wa), (b, wb)| ([a[0] + b[0], a[1] + b[1], a[2] + b[2]], wa + wb),
            );
        if weight <= 0.0 {
            return None;
        }
        Some(Point3::new([sum[0] / weight, sum[1] / weight, sum[2] / weight]))
    }

    /// Error unless `other` has the same dims.
    pub fn check_same_dims(&self, other: &Volume) -> Result<()> {
        if self.dims != other.dims {
            return Err(CoreError::dimension_mismatch(&self.dims, &other.dims));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Volume {
        Volume::from_fn([4, 3, 2], |x, y, z| (x + 10 * y + 100 * z) as f32)
    }

    #[test]
    fn test_from_vec_length_mismatch() {
        let err = Volume::from_vec([2, 2, 2], vec![0.0; 7]);
        assert!(matches!(err, Err(CoreError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_layout_x_fastest() {
        let v = ramp();
        assert_eq!(v.get(3, 0, 0), 3.0);
        assert_eq!(v.get(0, 2, 0), 20.0);
        assert_eq!(v.get(1, 1, 1), 111.0);
        assert_eq!(v.data()[v.offset(2, 1, 1)], 112.0);
        assert_eq!(v.coords(v.offset(2, 1, 1)), [2, 1, 1]);
    }

    #[test]
    fn test_checked_access_returns_background() {
        let mut v = Volume::from_fn([5, 5, 5], |x, y, z| {
            if (1..4).contains(&x) && (1..4).contains(&y) && (1..4).contains(&z) {
                10.0
            } else {
                2.0
            }
        });
        assert_eq!(v.background(), 2.0);
        assert_eq!(v.max_value(), 10.0);
        assert_eq!(v.get_checked(-1, 0, 0), 2.0);
        assert_eq!(v.get_checked(0, 0, 5), 2.0);
        v.set_background(-1.0);
        assert_eq!(v.sample(&Point3::new([9.0, 2.0, 2.0]), Interpolation::Linear), -1.0);
    }

    #[test]
    fn test_sample_linear_midpoint() {
        let v = ramp();
        let value = v.sample(&Point3::new([1.5, 0.5, 0.0]), Interpolation::Linear);
        assert!((value - 6.5).abs() < 1e-5);
    }

    #[test]
    fn test_gradient_and_counts() {
        let v = ramp();
        let g = v.gradient_at(1, 1, 0);
        assert!((g[0] - 1.0).abs() < 1e-9);
        assert!((g[1] - 10.0).abs() < 1e-9);
        assert_eq!(v.count_above(100.0), 11);
        assert_eq!(v.center(), Point3::new([1.5, 1.0, 0.5]));
    }

    #[test]
    fn test_center_of_mass() {
        let v = Volume::from_fn([5, 5, 5], |x, y, z| if x == 3 && y == 1 && z == 2 { 1.0 } else { 0.0 });
        assert_eq!(v.center_of_mass(0.5), Some(Point3::new([3.0, 1.0, 2.0])));
        assert_eq!(Volume::new([2, 2, 2]).center_of_mass(0.5), None);
    }

    #[test]
    fn test_empty_volume() {
        let v = Volume::empty();
        assert!(v.is_empty());
        assert_eq!(v.get_checked(0, 0, 0), 0.0);
        assert_eq!(v.sample(&Point3::origin(), Interpolation::Nearest), 0.0);
    }
}
