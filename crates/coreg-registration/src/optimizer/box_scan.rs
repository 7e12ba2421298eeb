//! Grid scan of each parameter group around the incumbent.

use super::config::OptimizerConfig;
use super::search::Search;
use crate::objective::Objective;

/// Largest number of parameters scanned jointly.
const MAX_JOINT: usize = 3;

/// One pass over all groups.
///
/// For each group the full `grid_points^n` lattice spanning `±step` is
/// evaluated; the incumbent moves to the best lattice point. A group whose
/// centre stays best has its steps shrunk.
pub(crate) fn iterate<O: Objective>(search: &mut Search<'_, O>, config: &OptimizerConfig) {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for dim in 0..search.dims() {
        match groups.last_mut() {
            Some(last)
                if search.group_of[last[0]] == search.group_of[dim] && last.len() < MAX_JOINT =>
            {
                last.push(dim)
            }
            _ => groups.push(vec![dim]),
        }
    }

    let half = (config.grid_points / 2) as i64;
    for dims in groups {
        let center = search.best.clone();
        let mut improved = false;
        let mut offsets = vec![-half; dims.len()];
        loop {
            if offsets.iter().any(|&o| o != 0) {
                let mut u = center.clone();
                for (k, &d) in dims.iter().enumerate() {
                    u[d] += offsets[k] as f64 / half as f64 * search.steps[d];
                }
                improved |= search.try_point(&u);
            }
            // odometer increment
            let mut k = 0;
            while k < offsets.len() {
                offsets[k] += 1;
                if offsets[k] <= half {
                    break;
                }
                offsets[k] = -half;
                k += 1;
            }
            if k == offsets.len() {
                break;
            }
        }
        if !improved {
            for &d in &dims {
                search.shrink(d, config.shrink_factor);
            }
        }
    }
}
