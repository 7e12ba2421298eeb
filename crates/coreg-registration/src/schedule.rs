//! Coarse-to-fine sequences of optimizer runs.

use coreg_core::Statistics;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RegistrationError, Result};
use crate::objective::Objective;
use crate::optimizer::{GlobalOptimizer, OptimizationResult, SearchMethod, TerminationReason};
use crate::validation::validate_precision;

/// One optimizer run of a [`FitSchedule`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitStage {
    pub method: SearchMethod,
    /// Relative step at which the stage stops.
    pub precision: f64,
    /// Relative step at which outlier trimming starts.
    pub outliers_precision: f64,
}

impl FitStage {
    pub fn new(method: SearchMethod, precision: f64, outliers_precision: f64) -> Self {
        Self {
            method,
            precision,
            outliers_precision,
        }
    }
}

/// Ordered stages run on the same optimizer, each starting from the
/// previous best parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSchedule {
    stages: Vec<FitStage>,
}

impl Default for FitSchedule {
    /// A grid scan to 1% followed by a simplex polish to 0.1%.
    fn default() -> Self {
        Self {
            stages: vec![
                FitStage::new(SearchMethod::BoxScan, 1e-2, 5e-2),
                FitStage::new(SearchMethod::NelderMead, 1e-3, 1e-2),
            ],
        }
    }
}

impl FitSchedule {
    /// Empty schedule; add stages with [`FitSchedule::with_stage`].
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn single(method: SearchMethod, precision: f64, outliers_precision: f64) -> Self {
        Self::new().with_stage(method, precision, outliers_precision)
    }

    pub fn with_stage(mut self, method: SearchMethod, precision: f64, outliers_precision: f64) -> Self {
        self.stages.push(FitStage::new(method, precision, outliers_precision));
        self
    }

    pub fn stages(&self) -> &[FitStage] {
        &self.stages
    }

    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(RegistrationError::invalid_configuration("fit schedule has no stage"));
        }
        for stage in &self.stages {
            validate_precision(stage.precision, stage.outliers_precision)?;
        }
        Ok(())
    }

    /// Run every stage in order.
    ///
    /// The returned result carries the last stage's parameters, cost and
    /// termination, with iterations, evaluations and history accumulated
    /// over all stages. A degenerate or cancelled stage ends the schedule.
    pub fn run<O: Objective>(
        &self,
        optimizer: &mut GlobalOptimizer,
        objective: &O,
        how: O::Mode,
        title: &str,
        mut stats: Option<&mut Statistics>,
    ) -> Result<OptimizationResult> {
        self.validate()?;
        let mut total: Option<OptimizationResult> = None;
        for (index, stage) in self.stages.iter().enumerate() {
            let last = index + 1 == self.stages.len();
            let label = format!("{title} [{}/{}]", index + 1, self.stages.len());
            let result = optimizer.get_solution(
                objective,
                stage.method,
                how,
                stage.precision,
                stage.outliers_precision,
                &label,
                if last { stats.as_deref_mut() } else { None },
            )?;
            info!(
                stage = %label,
                method = ?stage.method,
                cost = result.best_cost,
                termination = ?result.termination,
                "stage done"
            );
            let stop = matches!(
                result.termination,
                TerminationReason::Degenerate | TerminationReason::Cancelled
            );
            total = Some(match total {
                None => result,
                Some(mut acc) => {
                    acc.iterations += result.iterations;
                    acc.evaluations += result.evaluations;
                    acc.history.extend(result.history);
                    acc.best_parameters = result.best_parameters;
                    acc.best_cost = result.best_cost;
                    acc.termination = result.termination;
                    acc
                }
            });
            if stop {
                break;
            }
        }
        total.ok_or_else(|| RegistrationError::invalid_configuration("fit schedule has no stage"))
    }
}
