//! Row-stochastic transition matrix and the damped Google matrix.
//!
//! ```text
//! S_ij = w_ij / Σ_k w_ik      (row i has edges)
//! S_ij = 1 / N                (row i dangling: no edges or zero total weight)
//! G    = α·S + (1 − α)·(1/N)·J
//! ```
//!
//! Every row of `S` and of `G` sums to 1. `G` is never materialized for
//! propagation: `Gᵀ·x = α·Sᵀ·x + (1 − α)/N · Σx · 1`, and the dangling rows of
//! `S` are folded in the same way. [`GoogleMatrix::to_dense`] builds the full
//! `N×N` array for export only.
//!
//! ## Propagation modes
//!
//! | [`Propagation`]  | Result                                                 |
//! |------------------|--------------------------------------------------------|
//! | `SingleStep`     | `Gᵀ·s`, one multiplication                              |
//! | `Personalized`   | fixed point of `x ← α·Sᵀ·x + (1 − α)·v`, `v = s / ‖s‖₁` |

use std::sync::Arc;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use hostprox_graph::{NodeOrder, PpiGraph};

use crate::error::DiffusionError;
use crate::laplacian::EdgeWeighting;

pub const DEFAULT_DAMPING: f64 = 0.85;
pub const DEFAULT_PPR_TOLERANCE: f64 = 1e-10;
pub const DEFAULT_PPR_MAX_ITERATIONS: usize = 1_000;

const STEP_PROPAGATE: &str = "google propagation";
const STEP_PERSONALIZED: &str = "personalized pagerank";

// ─────────────────────────────────────────────
// StochasticMatrix
// ─────────────────────────────────────────────

/// Sparse row-stochastic `S`; dangling rows are implicit `1/N` rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StochasticMatrix {
    n:        usize,
    /// `rows[i]` = `[(j, S_ij)]`, empty for dangling rows.
    rows:     Vec<Vec<(usize, f64)>>,
    dangling: Vec<bool>,
}

impl StochasticMatrix {
    pub fn build(graph: &PpiGraph, weighting: EdgeWeighting) -> Self {
        let adj = weighting.adjacency(graph);
        let n = adj.len();
        let mut rows = Vec::with_capacity(n);
        let mut dangling = Vec::with_capacity(n);

        for row in adj {
            let total: f64 = row.iter().map(|&(_, w)| w).sum();
            if total > 0.0 && total.is_finite() {
                rows.push(row.into_iter().map(|(j, w)| (j, w / total)).collect());
                dangling.push(false);
            } else {
                rows.push(Vec::new());
                dangling.push(true);
            }
        }

        let n_dangling = dangling.iter().filter(|&&d| d).count();
        if n_dangling > 0 {
            warn!(dangling = n_dangling, nodes = n, "dangling nodes redistribute uniformly");
        }
        Self { n, rows, dangling }
    }

    #[inline] pub fn n(&self) -> usize { self.n }

    #[inline]
    pub fn is_dangling(&self, i: usize) -> bool {
        self.dangling[i]
    }

    pub fn dangling_count(&self) -> usize {
        self.dangling.iter().filter(|&&d| d).count()
    }

    pub fn entry(&self, i: usize, j: usize) -> f64 {
        if self.dangling[i] {
            return 1.0 / self.n as f64;
        }
        self.rows[i]
            .iter()
            .find(|&&(k, _)| k == j)
            .map_or(0.0, |&(_, p)| p)
    }

    pub fn row_dense(&self, i: usize) -> Vec<f64> {
        if self.dangling[i] {
            return vec![1.0 / self.n as f64; self.n];
        }
        let mut row = vec![0.0; self.n];
        for &(j, p) in &self.rows[i] {
            row[j] = p;
        }
        row
    }

    /// `y = Sᵀ·x`: node `i` hands `x_i` to its row's targets.
    pub fn apply_transpose(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.n);
        let mut y = vec![0.0; self.n];
        let mut uniform = 0.0;
        for i in 0..self.n {
            if self.dangling[i] {
                uniform += x[i];
                continue;
            }
            for &(j, p) in &self.rows[i] {
                y[j] += p * x[i];
            }
        }
        if uniform != 0.0 {
            let share = uniform / self.n as f64;
            for v in y.iter_mut() {
                *v += share;
            }
        }
        y
    }
}

// ─────────────────────────────────────────────
// GoogleMatrix
// ─────────────────────────────────────────────

/// `G = α·S + (1 − α)/N·J`, keyed by the node order it was built from.
#[derive(Debug, Clone)]
pub struct GoogleMatrix {
    order:     Arc<NodeOrder>,
    s:         StochasticMatrix,
    damping:   f64,
    weighting: EdgeWeighting,
}

impl GoogleMatrix {
    pub fn build(graph: &PpiGraph, weighting: EdgeWeighting, damping: f64) -> Result<Self, DiffusionError> {
        check_damping(damping)?;
        let s = StochasticMatrix::build(graph, weighting);
        debug!(nodes = s.n, damping, weighting = ?weighting, "google matrix built");
        Ok(Self { order: Arc::clone(graph.order()), s, damping, weighting })
    }

    pub(crate) fn from_parts(
        order:     Arc<NodeOrder>,
        s:         StochasticMatrix,
        damping:   f64,
        weighting: EdgeWeighting,
    ) -> Result<Self, DiffusionError> {
        check_damping(damping)?;
        if s.n != order.len() || s.rows.len() != s.n || s.dangling.len() != s.n {
            return Err(DiffusionError::LengthMismatch { expected: order.len(), got: s.n });
        }
        Ok(Self { order, s, damping, weighting })
    }

    #[inline] pub fn n(&self) -> usize { self.s.n }
    #[inline] pub fn damping(&self) -> f64 { self.damping }
    #[inline] pub fn weighting(&self) -> EdgeWeighting { self.weighting }

    pub fn order(&self) -> &Arc<NodeOrder> {
        &self.order
    }

    pub fn stochastic(&self) -> &StochasticMatrix {
        &self.s
    }

    #[inline]
    fn teleport(&self) -> f64 {
        (1.0 - self.damping) / self.s.n as f64
    }

    pub fn entry(&self, i: usize, j: usize) -> f64 {
        self.damping * self.s.entry(i, j) + self.teleport()
    }

    pub fn row(&self, i: usize) -> Vec<f64> {
        let t = self.teleport();
        self.s.row_dense(i).into_iter().map(|p| self.damping * p + t).collect()
    }

    /// `Gᵀ·x`.
    pub fn propagate(&self, x: &[f64]) -> Vec<f64> {
        let total: f64 = x.iter().sum();
        let t = self.teleport() * total;
        self.s
            .apply_transpose(x)
            .into_iter()
            .map(|v| self.damping * v + t)
            .collect()
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let n = self.s.n;
        let mut g = Array2::from_elem((n, n), self.teleport());
        for i in 0..n {
            for (j, p) in self.s.row_dense(i).into_iter().enumerate() {
                g[[i, j]] += self.damping * p;
            }
        }
        g
    }
}

fn check_damping(damping: f64) -> Result<(), DiffusionError> {
    if damping.is_finite() && damping > 0.0 && damping < 1.0 {
        Ok(())
    } else {
        Err(DiffusionError::InvalidDamping(damping))
    }
}

// ─────────────────────────────────────────────
// Propagation
// ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Propagation {
    SingleStep,
    Personalized { tolerance: f64, max_iterations: usize },
}

impl Default for Propagation {
    fn default() -> Self {
        Propagation::SingleStep
    }
}

impl Propagation {
    pub fn personalized() -> Self {
        Propagation::Personalized {
            tolerance:      DEFAULT_PPR_TOLERANCE,
            max_iterations: DEFAULT_PPR_MAX_ITERATIONS,
        }
    }
}

/// A [`GoogleMatrix`] paired with how seed mass is pushed through it.
#[derive(Debug, Clone)]
pub struct GooglePropagator {
    matrix:      GoogleMatrix,
    propagation: Propagation,
}

impl GooglePropagator {
    pub fn new(matrix: GoogleMatrix, propagation: Propagation) -> Result<Self, DiffusionError> {
        if let Propagation::Personalized { tolerance, max_iterations } = propagation {
            if !(tolerance.is_finite() && tolerance > 0.0) || max_iterations == 0 {
                return Err(DiffusionError::InvalidSolver(format!(
                    "personalized propagation needs tolerance > 0 and max_iterations > 0, got {tolerance} / {max_iterations}"
                )));
            }
        }
        Ok(Self { matrix, propagation })
    }

    pub fn matrix(&self) -> &GoogleMatrix {
        &self.matrix
    }

    pub fn propagation(&self) -> Propagation {
        self.propagation
    }

    pub fn propagate(&self, seed: &[f64]) -> Result<Vec<f64>, DiffusionError> {
        let n = self.matrix.n();
        if seed.len() != n {
            return Err(DiffusionError::LengthMismatch { expected: n, got: seed.len() });
        }

        let out = match self.propagation {
            Propagation::SingleStep => self.matrix.propagate(seed),
            Propagation::Personalized { tolerance, max_iterations } => {
                self.personalized(seed, tolerance, max_iterations)?
            }
        };

        if out.iter().any(|v| !v.is_finite()) {
            return Err(DiffusionError::NonFinite { step: STEP_PROPAGATE });
        }
        Ok(out)
    }

    /// Power iteration `x ← α·Sᵀ·x + (1 − α)·v` from `x₀ = v`.
    fn personalized(&self, seed: &[f64], tolerance: f64, max_iterations: usize) -> Result<Vec<f64>, DiffusionError> {
        let mass: f64 = seed.iter().map(|v| v.abs()).sum();
        if mass == 0.0 {
            return Ok(vec![0.0; seed.len()]);
        }
        let v: Vec<f64> = seed.iter().map(|s| s / mass).collect();
        let alpha = self.matrix.damping;

        let mut x = v.clone();
        let mut diff = f64::INFINITY;
        for k in 1..=max_iterations {
            let next: Vec<f64> = self.matrix.s
                .apply_transpose(&x)
                .into_iter()
                .zip(&v)
                .map(|(sx, vi)| alpha * sx + (1.0 - alpha) * vi)
                .collect();

            diff = x.iter().zip(&next).map(|(a, b)| (a - b).abs()).sum();
            x = next;

            if diff < tolerance {
                debug!(iterations = k, delta = diff, "personalized pagerank converged");
                return Ok(x);
            }
        }

        Err(DiffusionError::NotConverged {
            step:       STEP_PERSONALIZED,
            iterations: max_iterations,
            residual:   diff,
        })
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{assert_close, graph};

    fn star_with_isolated() -> PpiGraph {
        // A is the hub; E has no edges
        graph(&[("A", "B", 0.9), ("A", "C", 0.3), ("A", "D", 0.6), ("B", "C", 0.1)], &["E"])
    }

    #[test]
    fn stochastic_rows_sum_to_one() {
        let g = star_with_isolated();
        for weighting in [EdgeWeighting::Unit, EdgeWeighting::Confidence] {
            let s = StochasticMatrix::build(&g, weighting);
            assert_eq!(s.dangling_count(), 1);
            for i in 0..s.n() {
                assert_close(s.row_dense(i).iter().sum(), 1.0, 1e-12);
            }
        }
    }

    #[test]
    fn unit_rows_split_evenly() {
        let s = StochasticMatrix::build(&star_with_isolated(), EdgeWeighting::Unit);
        assert_close(s.entry(0, 1), 1.0 / 3.0, 1e-12);
        assert_eq!(s.entry(3, 0), 1.0);
        assert_eq!(s.entry(1, 3), 0.0);
        assert_eq!(s.row_dense(4), vec![0.2; 5]);
    }

    #[test]
    fn confidence_rows_follow_weights() {
        let s = StochasticMatrix::build(&star_with_isolated(), EdgeWeighting::Confidence);
        assert_close(s.entry(0, 1), 0.9 / 1.8, 1e-12);
        assert_close(s.entry(0, 2), 0.3 / 1.8, 1e-12);
    }

    #[test]
    fn zero_weight_row_is_dangling() {
        let g = graph(&[("A", "B", 0.0)], &[]);
        let s = StochasticMatrix::build(&g, EdgeWeighting::Confidence);
        assert!(s.is_dangling(0) && s.is_dangling(1));
        assert!(!StochasticMatrix::build(&g, EdgeWeighting::Unit).is_dangling(0));
    }

    #[test]
    fn google_rows_sum_to_one() {
        let g = GoogleMatrix::build(&star_with_isolated(), EdgeWeighting::Unit, DEFAULT_DAMPING).unwrap();
        let dense = g.to_dense();
        for i in 0..g.n() {
            assert_close(g.row(i).iter().sum(), 1.0, 1e-12);
            assert_close(dense.row(i).sum(), 1.0, 1e-12);
            for j in 0..g.n() {
                assert_close(dense[[i, j]], g.entry(i, j), 1e-15);
            }
        }
    }

    #[test]
    fn propagate_matches_dense_transpose() {
        let g = GoogleMatrix::build(&star_with_isolated(), EdgeWeighting::Confidence, 0.7).unwrap();
        let x = [1.0, 0.0, 0.5, 0.0, 2.0];
        let dense = g.to_dense().t().dot(&ndarray::arr1(&x));
        for (a, b) in g.propagate(&x).iter().zip(dense.iter()) {
            assert_close(*a, *b, 1e-12);
        }
    }

    #[test]
    fn propagation_preserves_mass() {
        let g = GoogleMatrix::build(&star_with_isolated(), EdgeWeighting::Unit, 0.85).unwrap();
        let y = g.propagate(&[0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_close(y.iter().sum(), 1.0, 1e-12);
    }

    #[test]
    fn rejects_damping_outside_open_interval() {
        let g = star_with_isolated();
        for d in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let err = GoogleMatrix::build(&g, EdgeWeighting::Unit, d).unwrap_err();
            assert!(matches!(err, DiffusionError::InvalidDamping(_)));
        }
    }

    #[test]
    fn personalized_is_a_fixed_point() {
        let m = GoogleMatrix::build(&star_with_isolated(), EdgeWeighting::Unit, 0.85).unwrap();
        let prop = GooglePropagator::new(m.clone(), Propagation::personalized()).unwrap();
        let seed = [0.0, 1.0, 0.0, 0.0, 0.0];
        let x = prop.propagate(&seed).unwrap();

        assert_close(x.iter().sum(), 1.0, 1e-9);
        let again: Vec<f64> = m.stochastic()
            .apply_transpose(&x)
            .iter()
            .zip(seed)
            .map(|(sx, v)| 0.85 * sx + 0.15 * v)
            .collect();
        for (a, b) in x.iter().zip(&again) {
            assert_close(*a, *b, 1e-9);
        }
        assert!(x[1] > x[2]);
    }

    #[test]
    fn zero_seed_propagates_to_zero() {
        let m = GoogleMatrix::build(&star_with_isolated(), EdgeWeighting::Unit, 0.85).unwrap();
        for mode in [Propagation::SingleStep, Propagation::personalized()] {
            let out = GooglePropagator::new(m.clone(), mode).unwrap().propagate(&[0.0; 5]).unwrap();
            assert!(out.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn personalized_iteration_cap_is_an_error() {
        let m = GoogleMatrix::build(&star_with_isolated(), EdgeWeighting::Unit, 0.85).unwrap();
        let prop = GooglePropagator::new(m, Propagation::Personalized { tolerance: 1e-15, max_iterations: 2 }).unwrap();
        let err = prop.propagate(&[1.0, 0.0, 0.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, DiffusionError::NotConverged { iterations: 2, .. }));
    }
}
