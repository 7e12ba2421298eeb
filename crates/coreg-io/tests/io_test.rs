use anyhow::Result;
use coreg_core::io::{PointsReader, PointsWriter, VolumeReader, VolumeWriter};
use coreg_core::{Direction3, Point3, PointSet, Spacing3, Volume, VolumeGeometry};
use coreg_io::{read_nifti, read_xyz, write_nifti, write_xyz, NiftiFormat, XyzFile, XyzFormat};
use tempfile::tempdir;

fn placed_volume() -> Volume {
    let geometry = VolumeGeometry::new(
        Point3::new([10.0, -5.0, 4.0]),
        Spacing3::new([2.0, 1.5, 3.0]),
        Direction3::identity(),
    )
    .unwrap();
    Volume::from_fn([6, 5, 4], |x, y, z| (x * y + z) as f32).with_geometry(geometry)
}

#[test]
fn test_nifti_keeps_voxels_and_geometry() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("head.nii");
    let volume = placed_volume();
    write_nifti(&path, &volume)?;

    let back = read_nifti(&path)?;
    assert_eq!(back.dims(), volume.dims());
    assert_eq!(back.data(), volume.data());
    let spacing = back.geometry().spacing().to_array();
    for (a, b) in spacing.iter().zip([2.0, 1.5, 3.0]) {
        assert!((a - b).abs() < 1e-5);
    }
    let origin = back.geometry().origin();
    assert!(origin.distance(&Point3::new([10.0, -5.0, 4.0])) < 1e-4);
    Ok(())
}

#[test]
fn test_nifti_gz_through_format_traits() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("head.nii.gz");
    let volume = placed_volume();
    NiftiFormat.write_volume(&volume, &path)?;
    let back = NiftiFormat.read_volume(&path)?;
    assert_eq!(back.data(), volume.data());
    Ok(())
}

#[test]
fn test_missing_nifti_is_an_error() {
    let dir = tempdir().unwrap();
    assert!(read_nifti(dir.path().join("absent.nii")).is_err());
    assert!(NiftiFormat.read_volume(&dir.path().join("absent.nii")).is_err());
}

#[test]
fn test_xyz_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("cap.xyz");
    let file = XyzFile {
        points: PointSet::from_points(vec![Point3::new([-71.25, -23.5, -12.0]), Point3::new([0.0, 88.0, -3.0])]),
        names: vec!["T7".into(), "Fpz".into()],
        radius: 5.0,
    };
    write_xyz(&path, &file)?;
    assert_eq!(read_xyz(&path)?, file);
    Ok(())
}

#[test]
fn test_xyz_through_format_traits() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("cap.xyz");
    let points = PointSet::from_points(vec![Point3::new([1.0, 2.0, 3.0])]);
    let format = XyzFormat::new(4.0);
    format.write_points(&points, &["Cz".to_string()], &path)?;
    let (back, names) = format.read_points(&path)?;
    assert_eq!(back, points);
    assert_eq!(names, vec!["Cz".to_string()]);

    assert!(format.write_points(&points, &[], &path).is_err());
    Ok(())
}
