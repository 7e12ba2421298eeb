//! Batched point transformation on burn tensors.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

use super::matrix::Matrix44;

/// Apply an affine matrix to a batch of points.
///
/// # Arguments
/// * `matrix` - Affine transform; the projective row is ignored
/// * `points` - Tensor of shape `[Batch, 3]`
///
/// # Returns
/// Tensor of shape `[Batch, 3]` with the transformed points
pub fn transform_tensor_points<B: Backend>(matrix: &Matrix44, points: Tensor<B, 2>) -> Tensor<B, 2> {
    let device = points.device();
    let mut linear = Vec::with_capacity(9);
    for r in 0..3 {
        for c in 0..3 {
            linear.push(matrix.0[(r, c)] as f32);
        }
    }
    let t = matrix.translation_part();
    let a = Tensor::<B, 2>::from_data(TensorData::new(linear, [3, 3]), &device);
    let t = Tensor::<B, 2>::from_data(
        TensorData::new(vec![t[0] as f32, t[1] as f32, t[2] as f32], [1, 3]),
        &device,
    );

    // Row vectors: y = x @ A^T + t
    points.matmul(a.transpose()) + t
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_transform_tensor_points_matches_apply() {
        let device = Default::default();
        let mut m = Matrix44::rotation_z(90.0);
        m.translate(1.0, 2.0, 3.0, crate::MultiplySide::Left);

        let points = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0, 0.0], [0.0, 2.0, 1.0]], &device);
        let out = transform_tensor_points(&m, points).into_data();
        let slice = out.as_slice::<f32>().unwrap();

        let expected = [
            m.apply(&crate::Point3::new([1.0, 0.0, 0.0])),
            m.apply(&crate::Point3::new([0.0, 2.0, 1.0])),
        ];
        for (i, p) in expected.iter().enumerate() {
            for d in 0..3 {
                assert!((slice[i * 3 + d] as f64 - p[d]).abs() < 1e-5);
            }
        }
    }
}
