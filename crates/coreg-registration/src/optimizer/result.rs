//! Optimization outcome types.

use serde::{Deserialize, Serialize};

use super::parameter::ParameterVector;
use crate::objective::MAX_EVALUATION;

/// Lifecycle of a [`GlobalOptimizer`](super::GlobalOptimizer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerState {
    Idle,
    Initializing,
    Iterating,
    Converged,
    IterationLimitReached,
    Cancelled,
    /// Nothing to search: no free parameter or unusable objective.
    Degenerate,
}

/// Why a solve stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Steps fell below the requested precision with a valid incumbent.
    Converged,
    /// The iteration ceiling was hit first.
    IterationLimitReached,
    /// No free parameter, or the objective reported degenerate input.
    Degenerate,
    /// Cancellation token or timeout.
    Cancelled,
}

/// Outcome of one solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub best_parameters: ParameterVector,
    pub best_cost: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: TerminationReason,
    /// Incumbent cost after every iteration.
    pub history: Vec<f64>,
}

impl OptimizationResult {
    pub fn converged(&self) -> bool {
        self.termination == TerminationReason::Converged
    }

    /// True when the best cost is a real cost rather than the sentinel.
    pub fn is_valid(&self) -> bool {
        self.best_cost < MAX_EVALUATION
    }
}
