//! Simulated annealing with uniform random perturbations.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::config::OptimizerConfig;
use super::search::{clamp_unit, Search};
use crate::objective::{Objective, MAX_EVALUATION};

/// Random walk that accepts worse moves with a temperature-controlled probability.
///
/// Temperatures are relative to the magnitude of the current cost, so the
/// acceptance rule does not depend on the objective's scale.
pub(crate) struct Annealing {
    rng: StdRng,
    temperature: f64,
    current: Option<(Vec<f64>, f64)>,
}

impl Annealing {
    pub fn new(config: &OptimizerConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            temperature: config.initial_temperature,
            current: None,
        }
    }

    /// Reheat and restart the walk from the incumbent.
    pub fn restart(&mut self, config: &OptimizerConfig) {
        self.temperature = config.initial_temperature;
        self.current = None;
    }

    /// Restart the walk from the incumbent after a context change.
    pub fn resync(&mut self) {
        self.current = None;
    }

    pub fn iterate<O: Objective>(&mut self, search: &mut Search<'_, O>, config: &OptimizerConfig) {
        let (mut current, mut current_cost) = self
            .current
            .take()
            .unwrap_or_else(|| (search.best.clone(), search.best_cost));
        let mut improved = false;

        for _ in 0..config.annealing_trials {
            let mut candidate = current.clone();
            for (d, value) in candidate.iter_mut().enumerate() {
                let step = search.steps[d];
                *value += self.rng.random_range(-1.0..=1.0) * step;
            }
            clamp_unit(&mut candidate);
            let cost = search.evaluate(&candidate);
            improved |= search.consider(&candidate, cost);

            let accept = if cost <= current_cost {
                true
            } else if cost < MAX_EVALUATION && current_cost < MAX_EVALUATION {
                let scale = coreg_core::non_null(current_cost.abs()) * self.temperature;
                self.rng.random::<f64>() < (-(cost - current_cost) / scale).exp()
            } else {
                false
            };
            if accept {
                current = candidate;
                current_cost = cost;
            }
        }

        self.temperature *= config.cooling_factor;
        if !improved {
            for d in 0..search.dims() {
                search.shrink(d, config.shrink_factor);
            }
            // drift back to the incumbent when the walk stalls
            current = search.best.clone();
            current_cost = search.best_cost;
        }
        self.current = Some((current, current_cost));
    }
}
