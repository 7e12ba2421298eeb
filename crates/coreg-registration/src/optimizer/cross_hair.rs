//! Coordinate descent: probe each parameter on both sides of the incumbent.

use super::config::OptimizerConfig;
use super::search::Search;
use crate::objective::Objective;

/// One pass over all free parameters. A parameter whose probes both fail
/// has its step shrunk.
pub(crate) fn iterate<O: Objective>(search: &mut Search<'_, O>, config: &OptimizerConfig) {
    for dim in 0..search.dims() {
        let mut moved = false;
        for direction in [1.0, -1.0] {
            let mut u = search.best.clone();
            u[dim] += direction * search.steps[dim];
            if search.try_point(&u) {
                moved = true;
                break;
            }
        }
        if !moved {
            search.shrink(dim, config.shrink_factor);
        }
    }
}
