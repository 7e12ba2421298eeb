//! Conversion between [`Volume`] and burn tensors.
//!
//! Tensors use the `[z, y, x]` axis order so that the contiguous tensor
//! memory matches the x-fastest voxel buffer.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

use super::geometry::VolumeGeometry;
use super::volume::Volume;
use crate::error::{CoreError, Result};

impl Volume {
    /// Build a volume from a `[z, y, x]` tensor.
    pub fn from_tensor<B: Backend>(tensor: Tensor<B, 3>, geometry: VolumeGeometry) -> Result<Self> {
        let [dz, dy, dx] = tensor.dims();
        let data = tensor
            .into_data()
            .convert::<f32>()
            .into_vec::<f32>()
            .map_err(|e| CoreError::format(format!("tensor data: {:?}", e)))?;
        Ok(Volume::from_vec([dx, dy, dz], data)?.with_geometry(geometry))
    }

    /// Copy the voxels into a `[z, y, x]` tensor on `device`.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 3> {
        let [dx, dy, dz] = self.dims();
        Tensor::from_data(TensorData::new(self.data().to_vec(), [dz, dy, dx]), device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_tensor_round_trip() {
        let device = Default::default();
        let v = Volume::from_fn([4, 3, 2], |x, y, z| (x + 10 * y + 100 * z) as f32);
        let t = v.to_tensor::<TestBackend>(&device);
        assert_eq!(t.dims(), [2, 3, 4]);

        let back = Volume::from_tensor(t, *v.geometry()).unwrap();
        assert_eq!(back.dims(), [4, 3, 2]);
        assert_eq!(back.get(3, 2, 1), 123.0);
        assert_eq!(back, v);
    }
}
