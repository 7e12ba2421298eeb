//! Reader and writer interfaces for volumes and point sets.
//!
//! Concrete file formats live outside this crate; the optimizer and the
//! objectives only see these traits.

use std::path::Path;

use crate::error::Result;
use crate::pointset::PointSet;
use crate::volume::Volume;

/// Loads a volume, including its geometry.
pub trait VolumeReader {
    fn read_volume(&self, path: &Path) -> Result<Volume>;
}

/// Stores a volume. Voxel size, origin and orientation come from the volume geometry.
pub trait VolumeWriter {
    fn write_volume(&self, volume: &Volume, path: &Path) -> Result<()>;
}

/// Loads a point set together with one name per point.
pub trait PointsReader {
    fn read_points(&self, path: &Path) -> Result<(PointSet, Vec<String>)>;
}

/// Stores a point set with one name per point.
pub trait PointsWriter {
    fn write_points(&self, points: &PointSet, names: &[String], path: &Path) -> Result<()>;
}
