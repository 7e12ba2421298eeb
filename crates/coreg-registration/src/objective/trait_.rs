//! Objective trait: the scoring function minimized by the optimizer.

use std::fmt::Debug;

use coreg_core::Statistics;

use crate::optimizer::ParameterVector;

/// Sentinel cost meaning "this parameter vector cannot be evaluated".
///
/// Finite and far above any real cost, so it is never mistaken for a minimum.
pub const MAX_EVALUATION: f64 = 1e10;

/// Per-call evaluation settings decided by the optimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationContext<M> {
    /// Sub-criterion of the objective.
    pub how: M,
    /// Current relative step size of the search, in `(0, 1]`.
    pub precision: f64,
    /// Outlier band half-width in SDs, `None` while trimming is off.
    pub outlier_sd: Option<f64>,
    /// Optimizer iteration.
    pub iteration: usize,
}

impl<M> EvaluationContext<M> {
    /// Context for a single evaluation outside of a search.
    pub fn single(how: M) -> Self {
        Self {
            how,
            precision: 1.0,
            outlier_sd: None,
            iteration: 0,
        }
    }
}

/// Objective trait for scoring a candidate parameter vector.
///
/// Lower cost is better. Implementations must never return NaN: invalid
/// configurations (no compared samples, empty masks, degenerate input)
/// return [`MAX_EVALUATION`].
pub trait Objective: Sync {
    /// Selector of the geometric criterion.
    type Mode: Copy + Debug + Send + Sync;

    /// Score `params`.
    ///
    /// # Arguments
    /// * `params` - Current value of every active parameter
    /// * `ctx` - Criterion, precision and outlier settings of this call
    /// * `stats` - Optional sink for the per-sample residuals
    fn evaluate(
        &self,
        params: &ParameterVector,
        ctx: &EvaluationContext<Self::Mode>,
        stats: Option<&mut Statistics>,
    ) -> f64;

    /// Get the name of this objective.
    fn name(&self) -> &'static str;

    /// True when the bound data cannot be fitted at all.
    fn is_degenerate(&self) -> bool {
        false
    }
}

/// Parallel reduction of weighted residuals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Accumulator {
    pub sum: f64,
    pub weight: f64,
    pub count: usize,
}

impl Accumulator {
    #[inline]
    pub fn add(mut self, value: f64, weight: f64) -> Self {
        self.sum += value * weight;
        self.weight += weight;
        self.count += 1;
        self
    }

    #[inline]
    pub fn merge(self, other: Self) -> Self {
        Self {
            sum: self.sum + other.sum,
            weight: self.weight + other.weight,
            count: self.count + other.count,
        }
    }

    /// Weighted mean, or the sentinel when nothing was accumulated.
    pub fn mean_or_max(&self) -> f64 {
        if self.count == 0 || self.weight <= 0.0 {
            MAX_EVALUATION
        } else {
            self.sum / self.weight
        }
    }
}

/// Accumulator that optionally keeps every residual for the caller's statistics.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tally {
    pub acc: Accumulator,
    samples: Option<Statistics>,
}

impl Tally {
    pub fn new(keep_samples: bool) -> Self {
        Self {
            acc: Accumulator::default(),
            samples: keep_samples.then(Statistics::new),
        }
    }

    #[inline]
    pub fn add(mut self, value: f64, weight: f64) -> Self {
        self.acc = self.acc.add(value, weight);
        if let Some(samples) = self.samples.as_mut() {
            samples.add(value);
        }
        self
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.acc = self.acc.merge(other.acc);
        match (self.samples.as_mut(), other.samples) {
            (Some(mine), Some(theirs)) => mine.merge(&theirs),
            (None, Some(theirs)) => self.samples = Some(theirs),
            _ => {}
        }
        self
    }

    /// Weighted mean (or sentinel), handing the residuals to `stats`.
    pub fn finish(self, stats: Option<&mut Statistics>) -> f64 {
        if let (Some(out), Some(samples)) = (stats, self.samples.as_ref()) {
            out.merge(samples);
        }
        self.acc.mean_or_max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_mean() {
        let a = Accumulator::default().add(1.0, 1.0).add(3.0, 1.0);
        let b = Accumulator::default().add(5.0, 2.0);
        let m = a.merge(b);
        assert_eq!(m.count, 3);
        assert!((m.mean_or_max() - 14.0 / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_accumulator_is_sentinel() {
        assert_eq!(Accumulator::default().mean_or_max(), MAX_EVALUATION);
    }

    #[test]
    fn test_tally_keeps_samples_on_request() {
        let tally = Tally::new(true).add(1.0, 1.0).merge(Tally::new(true).add(2.0, 3.0));
        let mut stats = Statistics::new();
        let mean = tally.finish(Some(&mut stats));
        assert_eq!(stats.len(), 2);
        assert!((mean - 7.0 / 4.0).abs() < 1e-12);

        let mut untouched = Statistics::new();
        Tally::new(false).add(1.0, 1.0).finish(Some(&mut untouched));
        assert!(untouched.is_empty());
    }

    #[test]
    fn test_single_context() {
        let ctx = EvaluationContext::single(3u8);
        assert_eq!(ctx.how, 3);
        assert!(ctx.outlier_sd.is_none());
    }
}
