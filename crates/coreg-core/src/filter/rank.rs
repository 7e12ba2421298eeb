//! Rank-order filters and intensity remappings based on value ranks.

use rayon::prelude::*;

use crate::volume::Volume;

fn neighbourhood(volume: &Volume, x: usize, y: usize, z: usize, radius: usize, buf: &mut Vec<f32>) {
    buf.clear();
    let [dx, dy, dz] = volume.dims();
    let lo = |c: usize| c.saturating_sub(radius);
    let hi = |c: usize, d: usize| (c + radius).min(d - 1);
    for k in lo(z)..=hi(z, dz) {
        for j in lo(y)..=hi(y, dy) {
            for i in lo(x)..=hi(x, dx) {
                buf.push(volume.get(i, j, k));
            }
        }
    }
}

/// Replace every voxel with the `rank`-quantile (0 = min, 1 = max) of its
/// cubic neighbourhood of the given radius. Neighbours outside the grid are ignored.
pub fn rank_filter(volume: &Volume, radius: usize, rank: f64) -> Volume {
    if volume.is_empty() || radius == 0 {
        return volume.clone();
    }
    let rank = rank.clamp(0.0, 1.0);
    let data = (0..volume.len())
        .into_par_iter()
        .map_init(Vec::new, |buf, i| {
            let [x, y, z] = volume.coords(i);
            neighbourhood(volume, x, y, z, radius, buf);
            let pos = ((buf.len() - 1) as f64 * rank).round() as usize;
            let (_, value, _) = buf.select_nth_unstable_by(pos, |a, b| a.total_cmp(b));
            *value
        })
        .collect();
    volume.replaced(data)
}

/// Median of each voxel's cubic neighbourhood.
pub fn median_filter(volume: &Volume, radius: usize) -> Volume {
    rank_filter(volume, radius, 0.5)
}

fn sorted_values(volume: &Volume) -> Vec<f32> {
    let mut sorted = volume.data().to_vec();
    sorted.par_sort_unstable_by(|a, b| a.total_cmp(b));
    sorted
}

/// Fraction of sorted values that are ≤ `value`.
fn rank_of(sorted: &[f32], value: f32) -> f32 {
    let count = sorted.partition_point(|&v| v <= value);
    count as f32 / sorted.len().max(1) as f32
}

/// Map every voxel to its rank fraction in (0, 1].
pub fn rank_transform(volume: &Volume) -> Volume {
    if volume.is_empty() {
        return volume.clone();
    }
    let sorted = sorted_values(volume);
    volume.map(|v| rank_of(&sorted, v))
}

/// Rank transform restricted to voxels above `threshold`.
///
/// Voxels at or below the threshold map to 0, the others ramp linearly
/// with their rank among the above-threshold voxels.
pub fn rank_ramp(volume: &Volume, threshold: f32) -> Volume {
    let mut above: Vec<f32> = volume.data().par_iter().copied().filter(|&v| v > threshold).collect();
    if above.is_empty() {
        return volume.map(|_| 0.0);
    }
    above.par_sort_unstable_by(|a, b| a.total_cmp(b));
    volume.map(|v| if v > threshold { rank_of(&above, v) } else { 0.0 })
}

/// Histogram equalization over `bins` bins.
///
/// The output keeps the input range: `min + cdf(v) * (max - min)`.
pub fn histogram_equalize(volume: &Volume, bins: usize) -> Volume {
    if volume.is_empty() || bins == 0 {
        return volume.clone();
    }
    let (min, max) = volume
        .data()
        .par_iter()
        .fold(
            || (f32::INFINITY, f32::NEG_INFINITY),
            |(lo, hi), &v| (lo.min(v), hi.max(v)),
        )
        .reduce(
            || (f32::INFINITY, f32::NEG_INFINITY),
            |(a, b), (c, d)| (a.min(c), b.max(d)),
        );
    let range = max - min;
    if range <= 0.0 || !range.is_finite() {
        return volume.clone();
    }

    let bin_of = |v: f32| (((v - min) / range) * (bins as f32 - 1.0)).round() as usize;
    let mut histogram = vec![0usize; bins];
    for &v in volume.data() {
        histogram[bin_of(v).min(bins - 1)] += 1;
    }
    let total = volume.len() as f32;
    let mut cdf = Vec::with_capacity(bins);
    let mut running = 0usize;
    for count in histogram {
        running += count;
        cdf.push(running as f32 / total);
    }
    volume.map(|v| min + cdf[bin_of(v).min(bins - 1)] * range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_removes_salt_noise() {
        let v = Volume::from_fn([5, 5, 5], |x, y, z| if (x, y, z) == (2, 2, 2) { 100.0 } else { 1.0 });
        let out = median_filter(&v, 1);
        assert_eq!(out.get(2, 2, 2), 1.0);
    }

    #[test]
    fn test_rank_filter_min_max() {
        let v = Volume::from_fn([3, 1, 1], |x, _, _| x as f32);
        assert_eq!(rank_filter(&v, 1, 0.0).get(1, 0, 0), 0.0);
        assert_eq!(rank_filter(&v, 1, 1.0).get(1, 0, 0), 2.0);
    }

    #[test]
    fn test_rank_transform_monotone() {
        let v = Volume::from_fn([4, 1, 1], |x, _, _| (x * x) as f32);
        let r = rank_transform(&v);
        assert_eq!(r.data(), &[0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_rank_ramp_zeroes_below_threshold() {
        let v = Volume::from_fn([4, 1, 1], |x, _, _| x as f32);
        let r = rank_ramp(&v, 1.5);
        assert_eq!(r.data(), &[0.0, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_histogram_equalize_keeps_range() {
        let v = Volume::from_fn([10, 1, 1], |x, _, _| if x < 8 { 0.0 } else { 10.0 });
        let e = histogram_equalize(&v, 16);
        assert!((e.get(0, 0, 0) - 8.0).abs() < 1e-5);
        assert!((e.get(9, 0, 0) - 10.0).abs() < 1e-5);
    }
}
