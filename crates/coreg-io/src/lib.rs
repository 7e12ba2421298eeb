pub mod nifti_io;
pub mod xyz_io;

pub use nifti_io::{read_nifti, write_nifti, NiftiFormat};
pub use xyz_io::{read_xyz, write_xyz, XyzFile, XyzFormat};
