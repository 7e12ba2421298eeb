//! Volume filters: smoothing, rank statistics, morphology and resampling.

pub mod gaussian;
pub mod rank;
pub mod morphology;
pub mod downsample;
pub mod resample;

pub use gaussian::GaussianFilter;
pub use rank::{histogram_equalize, median_filter, rank_filter, rank_ramp, rank_transform};
pub use morphology::{apply_mask, binarize, dilate, erode, invert, threshold_mask};
pub use downsample::DownsampleFilter;
pub use resample::ResampleFilter;
