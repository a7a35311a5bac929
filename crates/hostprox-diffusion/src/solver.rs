//! Solving `M·x = s` for the diffusion operator `M = I + α·L`.
//!
//! `M` is symmetric positive definite, so two backends apply:
//!
//! | Backend                | Preparation             | Per seed vector            |
//! |------------------------|-------------------------|----------------------------|
//! | Direct (Cholesky)      | dense `O(N³)`, `O(N²)` memory | two triangular solves |
//! | Conjugate gradient     | Jacobi preconditioner   | `O(k·|E|)` matrix-free     |
//!
//! [`PreparedDiffusion`] does the preparation once and is then reused for
//! every seed set evaluated against the same graph.

use std::sync::Arc;

use nalgebra::{Cholesky, DVector, Dyn};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use hostprox_graph::NodeOrder;

use crate::error::DiffusionError;
use crate::laplacian::DiffusionOperator;

/// Largest graph solved with the dense backend under [`SolverStrategy::Auto`].
pub const DEFAULT_DENSE_LIMIT: usize = 10_000;
pub const DEFAULT_CG_TOLERANCE: f64 = 1e-10;
pub const DEFAULT_CG_MAX_ITERATIONS: usize = 10_000;

const STEP_FACTOR: &str = "laplacian cholesky";
const STEP_SOLVE: &str = "laplacian solve";
const STEP_CG: &str = "laplacian conjugate gradient";

// ─────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SolverStrategy {
    /// Direct at or below `dense_limit` nodes, conjugate gradient above.
    Auto { dense_limit: usize },
    Direct,
    ConjugateGradient,
}

impl Default for SolverStrategy {
    fn default() -> Self {
        SolverStrategy::Auto { dense_limit: DEFAULT_DENSE_LIMIT }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    pub strategy:          SolverStrategy,
    /// Relative residual `‖b − M·x‖ / ‖b‖` at which CG stops.
    pub cg_tolerance:      f64,
    pub cg_max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            strategy:          SolverStrategy::default(),
            cg_tolerance:      DEFAULT_CG_TOLERANCE,
            cg_max_iterations: DEFAULT_CG_MAX_ITERATIONS,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<(), DiffusionError> {
        if !(self.cg_tolerance.is_finite() && self.cg_tolerance > 0.0) {
            return Err(DiffusionError::InvalidSolver(format!(
                "cg_tolerance must be finite and > 0, got {}",
                self.cg_tolerance
            )));
        }
        if self.cg_max_iterations == 0 {
            return Err(DiffusionError::InvalidSolver("cg_max_iterations must be > 0".into()));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Solve result
// ─────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Solution {
    pub x:          Vec<f64>,
    /// CG iterations; 0 for the direct backend.
    pub iterations: usize,
    /// Final relative residual; 0 for the direct backend.
    pub residual:   f64,
}

// ─────────────────────────────────────────────
// PreparedDiffusion
// ─────────────────────────────────────────────

enum Backend {
    Dense(Cholesky<f64, Dyn>),
    Cg { inv_diag: Vec<f64> },
}

/// A diffusion operator with its solver prepared (factorized or preconditioned).
pub struct PreparedDiffusion {
    op:      DiffusionOperator,
    backend: Backend,
    config:  SolverConfig,
}

impl std::fmt::Debug for PreparedDiffusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedDiffusion")
            .field("n", &self.op.n())
            .field("alpha", &self.op.alpha())
            .field("backend", &self.backend_name())
            .finish()
    }
}

impl PreparedDiffusion {
    pub fn prepare(op: DiffusionOperator, config: SolverConfig) -> Result<Self, DiffusionError> {
        config.validate()?;
        let n = op.n();

        let use_dense = match config.strategy {
            SolverStrategy::Auto { dense_limit } => n <= dense_limit,
            SolverStrategy::Direct => true,
            SolverStrategy::ConjugateGradient => false,
        };

        let backend = if use_dense && n > 0 {
            let dense = op.to_dense();
            let chol = dense
                .cholesky()
                .ok_or(DiffusionError::Factorization { step: STEP_FACTOR, n })?;
            Backend::Dense(chol)
        } else {
            Backend::Cg {
                inv_diag: op.diagonal().iter().map(|d| 1.0 / d).collect(),
            }
        };

        info!(nodes = n, alpha = op.alpha(), backend = backend_label(&backend), "diffusion solver prepared");
        Ok(Self { op, backend, config })
    }

    pub fn operator(&self) -> &DiffusionOperator {
        &self.op
    }

    pub fn order(&self) -> &Arc<NodeOrder> {
        self.op.order()
    }

    pub fn backend_name(&self) -> &'static str {
        backend_label(&self.backend)
    }

    /// Solve `M·x = b`.
    pub fn solve(&self, b: &[f64]) -> Result<Solution, DiffusionError> {
        let n = self.op.n();
        if b.len() != n {
            return Err(DiffusionError::LengthMismatch { expected: n, got: b.len() });
        }
        if b.iter().any(|v| !v.is_finite()) {
            return Err(DiffusionError::NonFinite { step: STEP_SOLVE });
        }

        let solution = match &self.backend {
            Backend::Dense(chol) => {
                let x = chol.solve(&DVector::from_column_slice(b));
                Solution { x: x.as_slice().to_vec(), iterations: 0, residual: 0.0 }
            }
            Backend::Cg { inv_diag } => self.conjugate_gradient(b, inv_diag)?,
        };

        if solution.x.iter().any(|v| !v.is_finite()) {
            return Err(DiffusionError::NonFinite { step: STEP_SOLVE });
        }
        Ok(solution)
    }

    /// Jacobi-preconditioned conjugate gradient from `x₀ = 0`.
    fn conjugate_gradient(&self, b: &[f64], inv_diag: &[f64]) -> Result<Solution, DiffusionError> {
        let n = b.len();
        let b_norm = norm(b);
        if b_norm == 0.0 {
            return Ok(Solution { x: vec![0.0; n], iterations: 0, residual: 0.0 });
        }

        let tol = self.config.cg_tolerance;
        let max_iter = self.config.cg_max_iterations;

        let mut x = vec![0.0; n];
        let mut r = b.to_vec();
        let mut z: Vec<f64> = r.iter().zip(inv_diag).map(|(ri, di)| ri * di).collect();
        let mut p = z.clone();
        let mut rz = dot(&r, &z);
        let mut residual = 1.0;

        for k in 1..=max_iter {
            let ap = self.op.apply(&p);
            let pap = dot(&p, &ap);
            if !(pap.is_finite() && pap > 0.0) {
                return Err(DiffusionError::NonFinite { step: STEP_CG });
            }

            let step = rz / pap;
            for i in 0..n {
                x[i] += step * p[i];
                r[i] -= step * ap[i];
            }

            residual = norm(&r) / b_norm;
            if residual <= tol {
                debug!(iterations = k, residual, "conjugate gradient converged");
                if k > n.max(1) {
                    warn!(iterations = k, nodes = n, "conjugate gradient needed more iterations than nodes");
                }
                return Ok(Solution { x, iterations: k, residual });
            }

            for i in 0..n {
                z[i] = r[i] * inv_diag[i];
            }
            let rz_next = dot(&r, &z);
            let beta = rz_next / rz;
            rz = rz_next;
            for i in 0..n {
                p[i] = z[i] + beta * p[i];
            }
        }

        Err(DiffusionError::NotConverged { step: STEP_CG, iterations: max_iter, residual })
    }
}

fn backend_label(backend: &Backend) -> &'static str {
    match backend {
        Backend::Dense(_) => "direct",
        Backend::Cg { .. } => "conjugate_gradient",
    }
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::laplacian::EdgeWeighting;
    use crate::test_support::{assert_close, graph, ring};

    fn config(strategy: SolverStrategy) -> SolverConfig {
        SolverConfig { strategy, ..SolverConfig::default() }
    }

    fn both() -> [SolverConfig; 2] {
        [config(SolverStrategy::Direct), config(SolverStrategy::ConjugateGradient)]
    }

    #[test]
    fn auto_switches_on_dense_limit() {
        let g = ring(8);
        let op = || DiffusionOperator::build(&g, EdgeWeighting::Unit, 0.1).unwrap();
        let small = PreparedDiffusion::prepare(op(), config(SolverStrategy::Auto { dense_limit: 8 })).unwrap();
        let large = PreparedDiffusion::prepare(op(), config(SolverStrategy::Auto { dense_limit: 7 })).unwrap();
        assert_eq!(small.backend_name(), "direct");
        assert_eq!(large.backend_name(), "conjugate_gradient");
    }

    #[test]
    fn two_node_closed_form() {
        let (alpha, w) = (0.3, 0.8);
        let g = graph(&[("A", "B", w)], &[]);
        for cfg in both() {
            let op = DiffusionOperator::build(&g, EdgeWeighting::Confidence, alpha).unwrap();
            let solver = PreparedDiffusion::prepare(op, cfg).unwrap();
            let x = solver.solve(&[1.0, 0.0]).unwrap().x;
            let denom = 1.0 + 2.0 * alpha * w;
            assert_close(x[0], (1.0 + alpha * w) / denom, 1e-9);
            assert_close(x[1], alpha * w / denom, 1e-9);
        }
    }

    #[test]
    fn zero_seed_gives_zero() {
        let g = ring(5);
        for cfg in both() {
            let op = DiffusionOperator::build(&g, EdgeWeighting::Unit, 0.1).unwrap();
            let x = PreparedDiffusion::prepare(op, cfg).unwrap().solve(&[0.0; 5]).unwrap().x;
            assert!(x.iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn backends_agree_on_ring() {
        let g = ring(40);
        let mut b = vec![0.0; 40];
        b[0] = 1.0;
        b[17] = 1.0;

        let solve = |cfg| {
            let op = DiffusionOperator::build(&g, EdgeWeighting::Unit, 0.7).unwrap();
            PreparedDiffusion::prepare(op, cfg).unwrap().solve(&b).unwrap()
        };
        let direct = solve(config(SolverStrategy::Direct));
        let cg = solve(config(SolverStrategy::ConjugateGradient));

        assert!(cg.iterations > 0);
        for (d, c) in direct.x.iter().zip(&cg.x) {
            assert_close(*d, *c, 1e-8);
        }
    }

    #[test]
    fn solution_satisfies_system() {
        let g = graph(&[("A", "B", 0.9), ("B", "C", 0.4), ("A", "C", 0.2)], &["D"]);
        let op = DiffusionOperator::build(&g, EdgeWeighting::Confidence, 1.5).unwrap();
        let solver = PreparedDiffusion::prepare(op, config(SolverStrategy::ConjugateGradient)).unwrap();
        let b = [0.0, 1.0, 0.0, 1.0];
        let x = solver.solve(&b).unwrap().x;
        for (mx, bi) in solver.operator().apply(&x).iter().zip(b) {
            assert_close(*mx, bi, 1e-8);
        }
        assert_close(x[3], 1.0, 1e-8);
    }

    #[test]
    fn cg_iteration_cap_is_an_error() {
        let g = ring(30);
        let op = DiffusionOperator::build(&g, EdgeWeighting::Unit, 5.0).unwrap();
        let cfg = SolverConfig {
            strategy:          SolverStrategy::ConjugateGradient,
            cg_tolerance:      1e-14,
            cg_max_iterations: 1,
        };
        let mut b = vec![0.0; 30];
        b[0] = 1.0;
        let err = PreparedDiffusion::prepare(op, cfg).unwrap().solve(&b).unwrap_err();
        assert!(matches!(err, DiffusionError::NotConverged { iterations: 1, .. }));
    }

    #[test]
    fn rejects_wrong_length_and_non_finite_input() {
        let op = DiffusionOperator::build(&ring(3), EdgeWeighting::Unit, 0.1).unwrap();
        let solver = PreparedDiffusion::prepare(op, SolverConfig::default()).unwrap();
        assert!(matches!(solver.solve(&[1.0]), Err(DiffusionError::LengthMismatch { expected: 3, got: 1 })));
        assert!(matches!(solver.solve(&[f64::NAN, 0.0, 0.0]), Err(DiffusionError::NonFinite { .. })));
    }

    #[test]
    fn empty_graph_solves_to_empty() {
        let op = DiffusionOperator::build(&graph(&[], &[]), EdgeWeighting::Unit, 0.1).unwrap();
        let solver = PreparedDiffusion::prepare(op, SolverConfig::default()).unwrap();
        assert!(solver.solve(&[]).unwrap().x.is_empty());
    }

    #[test]
    fn invalid_cg_settings_rejected() {
        let op = DiffusionOperator::build(&ring(3), EdgeWeighting::Unit, 0.1).unwrap();
        let cfg = SolverConfig { cg_tolerance: 0.0, ..SolverConfig::default() };
        assert!(matches!(PreparedDiffusion::prepare(op, cfg), Err(DiffusionError::InvalidSolver(_))));
    }
}
