//! Optimizer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RegistrationError, Result};
use crate::validation::{validate_iterations, validate_positive, validate_unit_factor};

/// Search strategy used by [`GlobalOptimizer`](super::GlobalOptimizer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchMethod {
    /// Joint grid scan of each parameter group around the incumbent.
    BoxScan,
    /// Coordinate descent, one parameter at a time.
    CrossHair,
    /// Nelder-Mead simplex on normalized parameters.
    NelderMead,
    /// Simulated annealing with random perturbations.
    Annealing,
}

/// Configuration for the global optimizer.
///
/// The defaults are empirically tuned values, not derived optima.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Hard iteration ceiling per solve.
    pub max_iterations: usize,
    /// Starting step as a fraction of each parameter range.
    pub initial_step_fraction: f64,
    /// Step multiplier applied when a step brings no improvement.
    pub shrink_factor: f64,
    /// Grid points per parameter for the box scan (odd, >= 3).
    pub grid_points: usize,
    /// Outlier band (in SDs) when trimming switches on.
    pub outlier_sd_start: f64,
    /// Outlier band (in SDs) at the requested precision.
    pub outlier_sd_end: f64,
    /// Proposals per annealing iteration.
    pub annealing_trials: usize,
    /// Initial annealing temperature, relative to the current cost.
    pub initial_temperature: f64,
    /// Temperature multiplier per annealing iteration.
    pub cooling_factor: f64,
    /// Seed of the annealing random generator.
    pub seed: u64,
    /// Wall-clock limit per solve.
    pub timeout: Option<Duration>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            initial_step_fraction: 0.25,
            shrink_factor: 0.5,
            grid_points: 3,
            outlier_sd_start: 4.0,
            outlier_sd_end: 1.0,
            annealing_trials: 20,
            initial_temperature: 0.1,
            cooling_factor: 0.85,
            seed: 42,
            timeout: None,
        }
    }
}

impl OptimizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    pub fn with_initial_step_fraction(mut self, fraction: f64) -> Self {
        self.initial_step_fraction = fraction;
        self
    }

    pub fn with_shrink_factor(mut self, factor: f64) -> Self {
        self.shrink_factor = factor;
        self
    }

    pub fn with_grid_points(mut self, points: usize) -> Self {
        self.grid_points = points;
        self
    }

    /// Set the outlier band at the start and end of trimming.
    pub fn with_outlier_sd(mut self, start: f64, end: f64) -> Self {
        self.outlier_sd_start = start;
        self.outlier_sd_end = end;
        self
    }

    pub fn with_annealing(mut self, trials: usize, initial_temperature: f64, cooling_factor: f64) -> Self {
        self.annealing_trials = trials;
        self.initial_temperature = initial_temperature;
        self.cooling_factor = cooling_factor;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validate_iterations(self.max_iterations)?;
        validate_unit_factor("shrink_factor", self.shrink_factor)?;
        validate_unit_factor("cooling_factor", self.cooling_factor)?;
        if !(self.initial_step_fraction > 0.0 && self.initial_step_fraction <= 1.0) {
            return Err(RegistrationError::invalid_configuration(format!(
                "initial_step_fraction must be in (0, 1], got {}",
                self.initial_step_fraction
            )));
        }
        if self.grid_points < 3 || self.grid_points % 2 == 0 {
            return Err(RegistrationError::invalid_configuration(format!(
                "grid_points must be odd and >= 3, got {}",
                self.grid_points
            )));
        }
        validate_positive("outlier_sd_start", self.outlier_sd_start)?;
        validate_positive("outlier_sd_end", self.outlier_sd_end)?;
        if self.outlier_sd_end > self.outlier_sd_start {
            return Err(RegistrationError::invalid_configuration(
                "outlier band must shrink: outlier_sd_end > outlier_sd_start",
            ));
        }
        if self.annealing_trials == 0 {
            return Err(RegistrationError::invalid_configuration(
                "annealing_trials must be positive",
            ));
        }
        validate_positive("initial_temperature", self.initial_temperature)?;
        Ok(())
    }

    /// Outlier band for the current relative step.
    ///
    /// `None` until the step reaches `outliers_precision`, then shrinking
    /// log-linearly from `outlier_sd_start` to `outlier_sd_end` as the step
    /// approaches `requested_precision`.
    pub fn outlier_sd(&self, step: f64, requested_precision: f64, outliers_precision: f64) -> Option<f64> {
        if step > outliers_precision {
            return None;
        }
        let span = (outliers_precision / requested_precision).ln();
        let t = if span <= 0.0 {
            1.0
        } else {
            ((outliers_precision / step.max(requested_precision)).ln() / span).clamp(0.0, 1.0)
        };
        let (a, b) = (self.outlier_sd_start.ln(), self.outlier_sd_end.ln());
        Some((a + t * (b - a)).exp())
    }
}
