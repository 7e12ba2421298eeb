use anyhow::{Context, Result};
use coreg_core::io::{VolumeReader, VolumeWriter};
use coreg_core::{CoreError, Direction3, Point3, Spacing3, Vector3, Volume, VolumeGeometry};
use nalgebra::Matrix3;
use ndarray::{Array3, Axis, Ix3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::path::Path;
use tracing::{debug, warn};

/// Voxel-to-world rows of the header: sform, then qform, then pixdim only.
fn header_affine(header: &NiftiHeader) -> [[f64; 4]; 3] {
    let pixdim = |i: usize| {
        let d = header.pixdim[i] as f64;
        if d > 0.0 && d.is_finite() {
            d
        } else {
            1.0
        }
    };

    if header.sform_code > 0 {
        let row = |r: [f32; 4]| r.map(f64::from);
        [row(header.srow_x), row(header.srow_y), row(header.srow_z)]
    } else if header.qform_code > 0 {
        let b = header.quatern_b as f64;
        let c = header.quatern_c as f64;
        let d = header.quatern_d as f64;
        let a = (1.0 - (b * b + c * c + d * d).min(1.0)).sqrt();
        let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
        let (dx, dy, dz) = (pixdim(1), pixdim(2), pixdim(3) * qfac);
        [
            [
                (a * a + b * b - c * c - d * d) * dx,
                2.0 * (b * c - a * d) * dy,
                2.0 * (b * d + a * c) * dz,
                header.quatern_x as f64,
            ],
            [
                2.0 * (b * c + a * d) * dx,
                (a * a + c * c - b * b - d * d) * dy,
                2.0 * (c * d - a * b) * dz,
                header.quatern_y as f64,
            ],
            [
                2.0 * (b * d - a * c) * dx,
                2.0 * (c * d + a * b) * dy,
                (a * a + d * d - c * c - b * b) * dz,
                header.quatern_z as f64,
            ],
        ]
    } else {
        [
            [pixdim(1), 0.0, 0.0, 0.0],
            [0.0, pixdim(2), 0.0, 0.0],
            [0.0, 0.0, pixdim(3), 0.0],
        ]
    }
}

/// Split an affine into origin, spacing and unit direction columns.
fn geometry_from_affine(affine: &[[f64; 4]; 3]) -> coreg_core::Result<VolumeGeometry> {
    let origin = Point3::new([affine[0][3], affine[1][3], affine[2][3]]);
    let mut spacing = Spacing3::zeros();
    let columns: [Vector3; 3] = std::array::from_fn(|c| {
        let column = Vector3::new([affine[0][c], affine[1][c], affine[2][c]]);
        spacing[c] = column.norm();
        column.normalized().unwrap_or_else(|| {
            let mut axis = Vector3::zeros();
            axis[c] = 1.0;
            axis
        })
    });
    VolumeGeometry::new(origin, spacing, Direction3::from_columns(columns))
}

/// Read a 3D NIfTI-1 file (`.nii` or `.nii.gz`) into a volume.
///
/// Trailing singleton dimensions are dropped. Intensity scaling from the
/// header is applied.
pub fn read_nifti<P: AsRef<Path>>(path: P) -> Result<Volume> {
    let path = path.as_ref();
    let obj = ReaderOptions::new()
        .read_file(path)
        .with_context(|| format!("Failed to read NIfTI file {}", path.display()))?;
    let affine = header_affine(obj.header());

    let mut array = obj
        .into_volume()
        .into_ndarray::<f32>()
        .context("Failed to convert volume to ndarray")?;
    while array.ndim() > 3 && array.shape()[array.ndim() - 1] == 1 {
        let last = array.ndim() - 1;
        array = array.index_axis_move(Axis(last), 0);
    }
    if array.ndim() != 3 {
        anyhow::bail!("Expected 3D NIfTI file, found {} dimensions", array.ndim());
    }
    let array = array.into_dimensionality::<Ix3>()?;
    let (nx, ny, nz) = array.dim();

    let mut data = Vec::with_capacity(nx * ny * nz);
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                data.push(array[[x, y, z]]);
            }
        }
    }
    let volume = Volume::from_vec([nx, ny, nz], data)?;

    let geometry = match geometry_from_affine(&affine) {
        Ok(geometry) => geometry,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "unusable NIfTI orientation, keeping voxel sizes only");
            let spacing = Vector3::new([0, 1, 2].map(|c| {
                let s = Vector3::new([affine[0][c], affine[1][c], affine[2][c]]).norm();
                if s > 0.0 {
                    s
                } else {
                    1.0
                }
            }));
            VolumeGeometry::with_spacing(spacing)?
        }
    };
    debug!(dims = ?[nx, ny, nz], spacing = ?geometry.spacing().to_array(), "read NIfTI volume");
    Ok(volume.with_geometry(geometry))
}

/// Write a volume as NIfTI-1, storing voxel size and an sform built from
/// the volume geometry.
pub fn write_nifti<P: AsRef<Path>>(path: P, volume: &Volume) -> Result<()> {
    use nifti::writer::WriterOptions;

    let path = path.as_ref();
    let [nx, ny, nz] = volume.dims();
    let array = Array3::from_shape_fn((nx, ny, nz), |(x, y, z)| volume.get(x, y, z));

    let geometry = volume.geometry();
    let affine = geometry.index_to_world_matrix();
    let spacing = geometry.spacing();
    let row = |r: usize| [0, 1, 2, 3].map(|c| affine.0[(r, c)] as f32);

    let mut header = NiftiHeader::default();
    header.pixdim[1] = spacing[0] as f32;
    header.pixdim[2] = spacing[1] as f32;
    header.pixdim[3] = spacing[2] as f32;
    header.sform_code = 1;
    header.qform_code = 0;
    header.srow_x = row(0);
    header.srow_y = row(1);
    header.srow_z = row(2);
    // mm
    header.xyzt_units = 2;

    let direction: Matrix3<f64> = geometry.direction().0;
    if direction.determinant() < 0.0 {
        header.pixdim[0] = -1.0;
    }

    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(&array)
        .with_context(|| format!("Failed to write NIfTI file {}", path.display()))?;
    debug!(dims = ?[nx, ny, nz], path = %path.display(), "wrote NIfTI volume");
    Ok(())
}

/// NIfTI reader and writer for the core I/O traits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NiftiFormat;

impl VolumeReader for NiftiFormat {
    fn read_volume(&self, path: &Path) -> coreg_core::Result<Volume> {
        read_nifti(path).map_err(|e| CoreError::io(format!("{e:#}")))
    }
}

impl VolumeWriter for NiftiFormat {
    fn write_volume(&self, volume: &Volume, path: &Path) -> coreg_core::Result<()> {
        write_nifti(path, volume).map_err(|e| CoreError::io(format!("{e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nifti::writer::WriterOptions;
    use tempfile::tempdir;

    #[test]
    fn test_read_plain_nifti() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("plain.nii");

        let array = Array3::from_shape_fn((3, 4, 5), |(x, y, z)| (x + 10 * y + 100 * z) as f32);
        WriterOptions::new(&file_path).write_nifti(&array)?;

        let volume = read_nifti(&file_path)?;
        assert_eq!(volume.dims(), [3, 4, 5]);
        assert_eq!(volume.get(0, 0, 0), 0.0);
        assert_eq!(volume.get(2, 1, 0), 12.0);
        assert_eq!(volume.get(2, 3, 4), 432.0);
        assert!(volume.geometry().origin().is_null());
        Ok(())
    }

    #[test]
    fn test_qform_affine() {
        let mut header = NiftiHeader::default();
        header.qform_code = 1;
        header.sform_code = 0;
        header.pixdim = [1.0, 2.0, 3.0, 4.0, 0.0, 0.0, 0.0, 0.0];
        // 180 degrees about z
        header.quatern_b = 0.0;
        header.quatern_c = 0.0;
        header.quatern_d = 1.0;
        header.quatern_x = 5.0;
        header.quatern_y = 6.0;
        header.quatern_z = 7.0;

        let affine = header_affine(&header);
        assert!((affine[0][0] + 2.0).abs() < 1e-9);
        assert!((affine[1][1] + 3.0).abs() < 1e-9);
        assert!((affine[2][2] - 4.0).abs() < 1e-9);
        assert_eq!([affine[0][3], affine[1][3], affine[2][3]], [5.0, 6.0, 7.0]);

        let geometry = geometry_from_affine(&affine).unwrap();
        assert_eq!(geometry.spacing().to_array(), [2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_pixdim_fallback() {
        let mut header = NiftiHeader::default();
        header.qform_code = 0;
        header.sform_code = 0;
        header.pixdim = [1.0, 1.5, 0.0, 2.5, 0.0, 0.0, 0.0, 0.0];
        let affine = header_affine(&header);
        let geometry = geometry_from_affine(&affine).unwrap();
        assert_eq!(geometry.spacing().to_array(), [1.5, 1.0, 2.5]);
    }
}
