//! Binary masks and morphology.
//!
//! Masks are ordinary volumes holding 0.0 or 1.0; any value above 0.5 counts as set.

use rayon::prelude::*;

use crate::error::Result;
use crate::volume::Volume;

/// 1.0 where the voxel is strictly above `threshold`, 0.0 elsewhere.
pub fn binarize(volume: &Volume, threshold: f32) -> Volume {
    let mut out = volume.map(|v| if v > threshold { 1.0 } else { 0.0 });
    out.set_background(0.0);
    out
}

/// Zero every voxel outside `mask`.
///
/// Fails when the mask dims differ from the volume dims.
pub fn apply_mask(volume: &Volume, mask: &Volume) -> Result<Volume> {
    volume.check_same_dims(mask)?;
    let data = volume
        .data()
        .par_iter()
        .zip(mask.data().par_iter())
        .map(|(&v, &m)| if m > 0.5 { v } else { 0.0 })
        .collect();
    Ok(volume.replaced(data))
}

/// Mirror the intensities inside their range: `min + max - v`.
pub fn invert(volume: &Volume) -> Volume {
    if volume.is_empty() {
        return volume.clone();
    }
    let min = volume.data().par_iter().copied().reduce(|| f32::INFINITY, f32::min);
    let max = volume.max_value();
    volume.map(|v| min + max - v)
}

fn ball_offsets(radius: usize) -> Vec<[i64; 3]> {
    let r = radius as i64;
    let r2 = r * r;
    let mut offsets = Vec::new();
    for k in -r..=r {
        for j in -r..=r {
            for i in -r..=r {
                if i * i + j * j + k * k <= r2 {
                    offsets.push([i, j, k]);
                }
            }
        }
    }
    offsets
}

fn morph(mask: &Volume, radius: usize, erode: bool) -> Volume {
    if radius == 0 || mask.is_empty() {
        return mask.clone();
    }
    let offsets = ball_offsets(radius);
    let [dx, dy, dz] = mask.dims();
    let inside = |x: i64, y: i64, z: i64| {
        x >= 0 && y >= 0 && z >= 0 && x < dx as i64 && y < dy as i64 && z < dz as i64
    };
    let data = (0..mask.len())
        .into_par_iter()
        .map(|i| {
            let [x, y, z] = mask.coords(i);
            let (x, y, z) = (x as i64, y as i64, z as i64);
            let mut hits = offsets.iter().map(|o| {
                let (a, b, c) = (x + o[0], y + o[1], z + o[2]);
                // outside the grid counts as unset
                inside(a, b, c) && mask.get(a as usize, b as usize, c as usize) > 0.5
            });
            let set = if erode { hits.all(|h| h) } else { hits.any(|h| h) };
            if set { 1.0 } else { 0.0 }
        })
        .collect();
    let mut out = mask.replaced(data);
    out.set_background(0.0);
    out
}

/// Binary erosion with a ball of the given radius (in voxels).
pub fn erode(mask: &Volume, radius: usize) -> Volume {
    morph(mask, radius, true)
}

/// Binary dilation with a ball of the given radius (in voxels).
pub fn dilate(mask: &Volume, radius: usize) -> Volume {
    morph(mask, radius, false)
}

/// Threshold then carve back thin structures with a morphological opening.
pub fn threshold_mask(volume: &Volume, threshold: f32, carve_radius: usize) -> Volume {
    let mask = binarize(volume, threshold);
    dilate(&erode(&mask, carve_radius), carve_radius)
}
