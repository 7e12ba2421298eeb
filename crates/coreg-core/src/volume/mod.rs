//! Sampled 3D scalar volumes and their physical geometry.

pub mod geometry;
#[allow(clippy::module_inception)]
pub mod volume;
pub mod gradient;
pub mod tensor;

pub use geometry::VolumeGeometry;
pub use volume::Volume;
pub use gradient::GradientField;
