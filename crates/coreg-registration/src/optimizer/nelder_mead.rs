//! Nelder-Mead simplex on normalized parameters.

use super::search::{clamp_unit, Search};
use crate::objective::Objective;

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Simplex state kept across iterations.
#[derive(Debug, Default)]
pub(crate) struct NelderMead {
    simplex: Vec<(Vec<f64>, f64)>,
}

fn combine(a: &[f64], b: &[f64], t: f64) -> Vec<f64> {
    // a + t * (b - a)
    a.iter().zip(b).map(|(x, y)| x + t * (y - x)).collect()
}

impl NelderMead {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the simplex; the next iteration rebuilds it around the incumbent.
    pub fn restart(&mut self) {
        self.simplex.clear();
    }

    /// Re-score every vertex after the evaluation context changed.
    pub fn rescore<O: Objective>(&mut self, search: &mut Search<'_, O>) {
        for (vertex, cost) in self.simplex.iter_mut() {
            *cost = search.evaluate(vertex);
        }
    }

    fn eval<O: Objective>(search: &mut Search<'_, O>, mut u: Vec<f64>) -> (Vec<f64>, f64) {
        clamp_unit(&mut u);
        let cost = search.evaluate(&u);
        search.consider(&u, cost);
        (u, cost)
    }

    fn build<O: Objective>(&mut self, search: &mut Search<'_, O>) {
        let n = search.dims();
        self.simplex.clear();
        self.simplex.push((search.best.clone(), search.best_cost));
        for i in 0..n {
            let mut u = search.best.clone();
            u[i] += search.steps[i];
            if u[i] > 1.0 {
                u[i] -= 2.0 * search.steps[i];
            }
            let vertex = Self::eval(search, u);
            self.simplex.push(vertex);
        }
    }

    /// One simplex move; afterwards each step is the simplex extent along
    /// that parameter.
    pub fn iterate<O: Objective>(&mut self, search: &mut Search<'_, O>) {
        let n = search.dims();
        if self.simplex.len() != n + 1 {
            self.build(search);
        }
        self.simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut centroid = vec![0.0; n];
        for (vertex, _) in &self.simplex[..n] {
            for (c, v) in centroid.iter_mut().zip(vertex) {
                *c += v / n as f64;
            }
        }
        let (worst, worst_cost) = self.simplex[n].clone();
        let best_cost = self.simplex[0].1;
        let second_worst_cost = self.simplex[n - 1].1;

        let reflected = Self::eval(search, combine(&centroid, &worst, -REFLECT));
        if reflected.1 < best_cost {
            let expanded = Self::eval(search, combine(&centroid, &reflected.0, EXPAND));
            self.simplex[n] = if expanded.1 < reflected.1 { expanded } else { reflected };
        } else if reflected.1 < second_worst_cost {
            self.simplex[n] = reflected;
        } else {
            let contracted = if reflected.1 < worst_cost {
                Self::eval(search, combine(&centroid, &reflected.0, CONTRACT))
            } else {
                Self::eval(search, combine(&centroid, &worst, CONTRACT))
            };
            if contracted.1 < reflected.1.min(worst_cost) {
                self.simplex[n] = contracted;
            } else {
                let anchor = self.simplex[0].0.clone();
                for i in 1..=n {
                    let moved = combine(&anchor, &self.simplex[i].0, SHRINK);
                    self.simplex[i] = Self::eval(search, moved);
                }
            }
        }

        for d in 0..n {
            let (lo, hi) = self
                .simplex
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (v, _)| (lo.min(v[d]), hi.max(v[d])));
            search.steps[d] = hi - lo;
        }
    }
}
