//! Shared state of a running search, in normalized parameter coordinates.
//!
//! Every free parameter is mapped to `[0, 1]` over its bounds, so step sizes
//! are relative to the parameter ranges and directly comparable with the
//! requested precision.

use super::parameter::{ParameterSpace, ParameterVector};
use crate::objective::{EvaluationContext, Objective, MAX_EVALUATION};

pub(crate) struct Search<'a, O: Objective> {
    objective: &'a O,
    space: &'a ParameterSpace,
    pub ctx: EvaluationContext<O::Mode>,
    /// Full real-valued vector; fixed parameters keep their value here.
    base: Vec<f64>,
    /// Indices of the free parameters in the full vector.
    free: Vec<usize>,
    lower: Vec<f64>,
    range: Vec<f64>,
    /// Group index of each free parameter.
    pub group_of: Vec<usize>,
    pub best: Vec<f64>,
    pub best_cost: f64,
    pub steps: Vec<f64>,
    pub evaluations: usize,
}

/// Clamp normalized coordinates into the bounds.
pub(crate) fn clamp_unit(u: &mut [f64]) {
    for v in u.iter_mut() {
        *v = v.clamp(0.0, 1.0);
    }
}

/// Map NaN, infinities and anything above the sentinel to the sentinel.
pub(crate) fn sanitize(cost: f64) -> f64 {
    if cost.is_finite() {
        cost.min(MAX_EVALUATION)
    } else {
        MAX_EVALUATION
    }
}

impl<'a, O: Objective> Search<'a, O> {
    pub fn new(
        objective: &'a O,
        space: &'a ParameterSpace,
        start: &[f64],
        ctx: EvaluationContext<O::Mode>,
        step: f64,
    ) -> Self {
        let mut free = Vec::new();
        let mut lower = Vec::new();
        let mut range = Vec::new();
        let mut group_of = Vec::new();
        let mut best = Vec::new();
        let mut index = 0;
        for (g, group) in space.groups().iter().enumerate() {
            for def in group {
                if def.is_free() {
                    free.push(index);
                    lower.push(def.min);
                    range.push(def.range());
                    group_of.push(g);
                    best.push(((start[index] - def.min) / def.range()).clamp(0.0, 1.0));
                }
                index += 1;
            }
        }
        let steps = vec![step; free.len()];
        let mut search = Self {
            objective,
            space,
            ctx,
            base: start.to_vec(),
            free,
            lower,
            range,
            group_of,
            best,
            best_cost: MAX_EVALUATION,
            steps,
            evaluations: 0,
        };
        search.rescore();
        search
    }

    pub fn dims(&self) -> usize {
        self.free.len()
    }

    /// Full real-valued vector for normalized free coordinates.
    pub fn values(&self, u: &[f64]) -> Vec<f64> {
        let mut values = self.base.clone();
        for (i, &idx) in self.free.iter().enumerate() {
            values[idx] = self.lower[i] + u[i].clamp(0.0, 1.0) * self.range[i];
        }
        values
    }

    pub fn vector(&self, u: &[f64]) -> ParameterVector {
        self.space.vector(&self.values(u))
    }

    /// Evaluate normalized coordinates, sanitizing the cost.
    pub fn evaluate(&mut self, u: &[f64]) -> f64 {
        self.evaluations += 1;
        let params = self.vector(u);
        sanitize(self.objective.evaluate(&params, &self.ctx, None))
    }

    /// Replace the incumbent if `cost` is strictly better.
    pub fn consider(&mut self, u: &[f64], cost: f64) -> bool {
        if cost < self.best_cost {
            self.best_cost = cost;
            self.best.copy_from_slice(u);
            clamp_unit(&mut self.best);
            true
        } else {
            false
        }
    }

    /// Evaluate and consider; returns whether the incumbent improved.
    pub fn try_point(&mut self, u: &[f64]) -> bool {
        let mut u = u.to_vec();
        clamp_unit(&mut u);
        let cost = self.evaluate(&u);
        self.consider(&u, cost)
    }

    /// Re-score the incumbent under the current context.
    pub fn rescore(&mut self) {
        let best = self.best.clone();
        self.best_cost = self.evaluate(&best);
    }

    pub fn max_step(&self) -> f64 {
        self.steps.iter().copied().fold(0.0, f64::max)
    }

    pub fn reset_steps(&mut self, step: f64) {
        self.steps.iter_mut().for_each(|s| *s = step);
    }

    pub fn shrink(&mut self, dim: usize, factor: f64) {
        self.steps[dim] *= factor;
    }
}
