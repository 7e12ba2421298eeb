//! Objective functions scored by the global optimizer.
//!
//! - [`SelfFit`]: plane detection on one volume (sagittal symmetry,
//!   transverse extents, reference-slice matching, guillotine cut)
//! - [`PointsToSurfaceFit`]: electrode positions onto a head surface
//! - [`VolumeToVolumeFit`]: one volume onto another, with masking,
//!   intensity remapping and cached pre-smoothing

pub mod params;
pub mod points_to_surface;
pub mod remap;
pub mod self_fit;
mod smoothing_cache;
pub mod surface;
pub mod trait_;
pub mod volume_to_volume;

pub use params::{linear_matrix, matrix_about};
pub use points_to_surface::{PointsFitConfig, PointsToSurfaceFit};
pub use remap::Remap;
pub use self_fit::{SelfFit, SelfFitConfig, SelfFitMode};
pub use surface::{SurfaceHit, SurfaceSearch};
pub use trait_::{EvaluationContext, Objective, MAX_EVALUATION};
pub use volume_to_volume::{
    ResampleOptions, SideConfig, SmoothingPolicy, TransformDirection, VolumeFitConfig, VolumeFitMode,
    VolumeToVolumeFit,
};
