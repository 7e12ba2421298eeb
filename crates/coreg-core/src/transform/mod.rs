//! Homogeneous transform algebra.

pub mod trait_;
pub mod matrix;
pub mod tensor;

pub use trait_::Transform;
pub use matrix::{Matrix44, MultiplySide};
pub use tensor::transform_tensor_points;
