//! Sample statistics with outlier trimming.
//!
//! Objectives push one residual per compared sample; the optimizer then asks
//! for robust aggregates where samples outside `mean ± k·SD` are dropped.

use serde::{Deserialize, Serialize};

/// Accumulator of scalar samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    values: Vec<f64>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Add a sample. Non-finite values are ignored.
    pub fn add(&mut self, value: f64) {
        if value.is_finite() {
            self.values.push(value);
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Append all samples of `other`.
    pub fn merge(&mut self, other: &Statistics) {
        self.values.extend_from_slice(&other.values);
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn mean(&self) -> Option<f64> {
        (!self.is_empty()).then(|| self.sum() / self.len() as f64)
    }

    /// Mean of the squared samples.
    pub fn mean_square(&self) -> Option<f64> {
        (!self.is_empty()).then(|| self.values.iter().map(|v| v * v).sum::<f64>() / self.len() as f64)
    }

    /// Population variance.
    pub fn variance(&self) -> Option<f64> {
        let mean = self.mean()?;
        Some(self.values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / self.len() as f64)
    }

    /// Population standard deviation.
    pub fn sd(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    /// Quantile `q` in `[0, 1]` by linear interpolation between order statistics.
    pub fn quantile(&self, q: f64) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let mut sorted = self.values.clone();
        sorted.sort_unstable_by(|a, b| a.total_cmp(b));
        let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        let frac = pos - lo as f64;
        Some(sorted[lo] * (1.0 - frac) + sorted[hi] * frac)
    }

    pub fn median(&self) -> Option<f64> {
        self.quantile(0.5)
    }

    /// Samples within `mean ± k·SD`.
    ///
    /// A non-positive or infinite `k` disables trimming. The band is widened
    /// by a few ulps so samples sitting exactly on `k·SD` are kept.
    pub fn trimmed(&self, k: f64) -> Statistics {
        let (Some(mean), Some(sd)) = (self.mean(), self.sd()) else {
            return Statistics::new();
        };
        if !(k.is_finite() && k > 0.0) {
            return self.clone();
        }
        let band = k * sd * (1.0 + 1e-9) + 1e-12 * mean.abs();
        Statistics {
            values: self
                .values
                .iter()
                .copied()
                .filter(|v| (v - mean).abs() <= band)
                .collect(),
        }
    }

    /// Mean square of the trimmed samples.
    pub fn trimmed_mean_square(&self, k: f64) -> Option<f64> {
        self.trimmed(k).mean_square()
    }

    /// Mean of the trimmed samples.
    pub fn trimmed_mean(&self, k: f64) -> Option<f64> {
        self.trimmed(k).mean()
    }
}

impl Extend<f64> for Statistics {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for v in iter {
            self.add(v);
        }
    }
}

impl FromIterator<f64> for Statistics {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Statistics::new();
        stats.extend(iter);
        stats
    }
}
