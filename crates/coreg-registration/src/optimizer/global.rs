//! Derivative-free global optimizer.

use std::time::Instant;

use coreg_core::Statistics;
use tracing::{debug, info, warn};

use super::annealing::Annealing;
use super::config::{OptimizerConfig, SearchMethod};
use super::nelder_mead::NelderMead;
use super::parameter::{ParameterSpace, ParameterVector};
use super::result::{OptimizationResult, OptimizerState, TerminationReason};
use super::search::{sanitize, Search};
use super::{box_scan, cross_hair};
use crate::error::Result;
use crate::objective::{EvaluationContext, Objective, MAX_EVALUATION};
use crate::progress::{CancellationToken, ProgressTracker};
use crate::validation::validate_precision;

/// Method-specific state carried between iterations of one solve.
enum Strategy {
    BoxScan,
    CrossHair,
    NelderMead(NelderMead),
    Annealing(Annealing),
}

impl Strategy {
    fn new(method: SearchMethod, config: &OptimizerConfig) -> Self {
        match method {
            SearchMethod::BoxScan => Self::BoxScan,
            SearchMethod::CrossHair => Self::CrossHair,
            SearchMethod::NelderMead => Self::NelderMead(NelderMead::new()),
            SearchMethod::Annealing => Self::Annealing(Annealing::new(config)),
        }
    }

    fn iterate<O: Objective>(&mut self, search: &mut Search<'_, O>, config: &OptimizerConfig) {
        match self {
            Self::BoxScan => box_scan::iterate(search, config),
            Self::CrossHair => cross_hair::iterate(search, config),
            Self::NelderMead(simplex) => simplex.iterate(search),
            Self::Annealing(annealing) => annealing.iterate(search, config),
        }
    }

    fn context_changed<O: Objective>(&mut self, search: &mut Search<'_, O>) {
        match self {
            Self::NelderMead(simplex) => simplex.rescore(search),
            Self::Annealing(annealing) => annealing.resync(),
            _ => {}
        }
    }

    fn restart(&mut self, config: &OptimizerConfig) {
        match self {
            Self::NelderMead(simplex) => simplex.restart(),
            Self::Annealing(annealing) => annealing.restart(config),
            _ => {}
        }
    }
}

/// Power-of-two bucket of a relative step.
///
/// Objectives see the precision in buckets so that the incumbent only
/// needs re-scoring when the bucket changes.
fn precision_level(step: f64) -> f64 {
    if step > 0.0 && step.is_finite() {
        2f64.powi(step.log2().floor() as i32).min(1.0)
    } else {
        0.0
    }
}

/// Generic minimizer over a bounded [`ParameterSpace`].
///
/// The best parameters of one solve become the starting point of the next,
/// so a sequence of solves with decreasing precision refines one fit.
pub struct GlobalOptimizer {
    config: OptimizerConfig,
    space: ParameterSpace,
    state: OptimizerState,
    current: Vec<f64>,
    progress: ProgressTracker,
    cancellation: Option<CancellationToken>,
}

impl GlobalOptimizer {
    pub fn new(space: ParameterSpace, config: OptimizerConfig) -> Result<Self> {
        config.validate()?;
        let current = space.initial_values();
        Ok(Self {
            config,
            space,
            state: OptimizerState::Idle,
            current,
            progress: ProgressTracker::new(),
            cancellation: None,
        })
    }

    pub fn with_progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    pub fn state(&self) -> OptimizerState {
        self.state
    }

    /// Starting point of the next solve.
    pub fn current_parameters(&self) -> ParameterVector {
        self.space.vector(&self.current)
    }

    /// Back to `Idle`, starting again from the initial values.
    pub fn reset(&mut self) {
        self.state = OptimizerState::Idle;
        self.current = self.space.initial_values();
    }

    fn should_stop(&self, started: Instant) -> bool {
        let cancelled = self
            .cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled);
        let timed_out = self.config.timeout.is_some_and(|limit| started.elapsed() >= limit);
        cancelled || timed_out
    }

    /// Minimize `objective` with `method`.
    ///
    /// # Arguments
    /// * `how` - Criterion of the objective to minimize
    /// * `requested_precision` - Relative step at which the search stops
    /// * `outliers_precision` - Relative step at which outlier trimming starts
    /// * `title` - Label for progress reporting
    /// * `stats_out` - Receives the residuals of the best parameters
    ///
    /// Hitting the iteration ceiling is not an error; it is reported in
    /// [`OptimizationResult::termination`].
    #[allow(clippy::too_many_arguments)]
    pub fn get_solution<O: Objective>(
        &mut self,
        objective: &O,
        method: SearchMethod,
        how: O::Mode,
        requested_precision: f64,
        outliers_precision: f64,
        title: &str,
        stats_out: Option<&mut Statistics>,
    ) -> Result<OptimizationResult> {
        validate_precision(requested_precision, outliers_precision)?;
        self.state = OptimizerState::Initializing;
        let started = Instant::now();
        let config = self.config.clone();

        if objective.is_degenerate() || self.space.free_count() == 0 {
            let params = self.space.vector(&self.current);
            let ctx = EvaluationContext::single(how);
            let best_cost = sanitize(objective.evaluate(&params, &ctx, stats_out));
            warn!(
                objective = objective.name(),
                free = self.space.free_count(),
                "nothing to optimize"
            );
            self.state = OptimizerState::Degenerate;
            return Ok(OptimizationResult {
                best_parameters: params,
                best_cost,
                iterations: 0,
                evaluations: 1,
                termination: TerminationReason::Degenerate,
                history: Vec::new(),
            });
        }

        let step = config.initial_step_fraction;
        let ctx = EvaluationContext {
            how,
            precision: precision_level(step),
            outlier_sd: config.outlier_sd(precision_level(step), requested_precision, outliers_precision),
            iteration: 0,
        };
        let mut search = Search::new(objective, &self.space, &self.current, ctx, step);
        let mut strategy = Strategy::new(method, &config);

        info!(
            title,
            objective = objective.name(),
            ?method,
            ?how,
            free = search.dims(),
            initial_cost = search.best_cost,
            "optimizer start"
        );
        self.progress.start(title);
        self.state = OptimizerState::Iterating;

        let mut history = Vec::new();
        let mut iterations = 0;
        let mut termination = TerminationReason::IterationLimitReached;

        for iteration in 1..=config.max_iterations {
            if self.should_stop(started) {
                termination = TerminationReason::Cancelled;
                break;
            }

            let level = precision_level(search.max_step());
            let outlier_sd = config.outlier_sd(level, requested_precision, outliers_precision);
            search.ctx.iteration = iteration;
            if level != search.ctx.precision || outlier_sd != search.ctx.outlier_sd {
                search.ctx.precision = level;
                search.ctx.outlier_sd = outlier_sd;
                search.rescore();
                strategy.context_changed(&mut search);
                debug!(iteration, level, ?outlier_sd, cost = search.best_cost, "context changed");
            }

            strategy.iterate(&mut search, &config);
            iterations = iteration;
            history.push(search.best_cost);
            self.progress.update(iteration, Some(config.max_iterations), search.best_cost);

            if search.max_step() <= requested_precision {
                if search.best_cost < MAX_EVALUATION {
                    termination = TerminationReason::Converged;
                    break;
                }
                debug!(iteration, "no valid incumbent at target precision, restarting steps");
                search.reset_steps(config.initial_step_fraction);
                strategy.restart(&config);
            }
        }

        let best_values = search.values(&search.best);
        let best_parameters = self.space.vector(&best_values);
        let best_cost = search.best_cost;
        if let Some(stats) = stats_out {
            stats.clear();
            objective.evaluate(&best_parameters, &search.ctx, Some(stats));
        }
        let evaluations = search.evaluations;

        if best_cost < MAX_EVALUATION {
            self.current = best_values;
        } else {
            warn!(title, "optimizer found no valid parameters");
        }
        self.state = match termination {
            TerminationReason::Converged => OptimizerState::Converged,
            TerminationReason::IterationLimitReached => OptimizerState::IterationLimitReached,
            TerminationReason::Cancelled => OptimizerState::Cancelled,
            TerminationReason::Degenerate => OptimizerState::Degenerate,
        };
        self.progress.complete(iterations, best_cost);
        info!(title, ?termination, iterations, evaluations, best_cost, "optimizer done");

        Ok(OptimizationResult {
            best_parameters,
            best_cost,
            iterations,
            evaluations,
            termination,
            history,
        })
    }
}
