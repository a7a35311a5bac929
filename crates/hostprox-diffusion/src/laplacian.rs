//! Weighted graph Laplacian and the diffusion operator built on it.
//!
//! ## Operators
//!
//! | Operator                | Formula       | Properties                         |
//! |-------------------------|---------------|------------------------------------|
//! | [`Laplacian`]           | `L = D − A`   | symmetric PSD, rows sum to 0       |
//! | [`DiffusionOperator`]   | `M = I + α·L` | symmetric positive definite, α > 0 |
//!
//! Diffusion from a seed indicator `s` is the solution of `M·x = s`
//! (see [`crate::solver`]). Both operators are stored sparse as symmetric
//! adjacency lists and applied matrix-free; `to_dense` exists for small
//! graphs and for the direct solver.
//!
//! ## Edge weighting
//!
//! | [`EdgeWeighting`] | `w_ij`                       |
//! |-------------------|------------------------------|
//! | `Unit`            | 1 for every retained edge    |
//! | `Confidence`      | stored (scaled) edge weight  |

use std::sync::Arc;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use hostprox_graph::{NodeOrder, PpiGraph};

use crate::error::DiffusionError;

/// Default diffusion strength `α`.
pub const DEFAULT_ALPHA: f64 = 0.1;

// ─────────────────────────────────────────────
// EdgeWeighting
// ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeWeighting {
    Unit,
    Confidence,
}

impl EdgeWeighting {
    #[inline]
    pub fn weight(self, stored: f64) -> f64 {
        match self {
            EdgeWeighting::Unit       => 1.0,
            EdgeWeighting::Confidence => stored,
        }
    }

    /// Weighted adjacency of `graph` as symmetric lists `adj[i] = [(j, w_ij)]`.
    pub(crate) fn adjacency(self, graph: &PpiGraph) -> Vec<Vec<(usize, f64)>> {
        (0..graph.node_count())
            .map(|i| {
                graph.neighbors(i)
                    .iter()
                    .map(|&(j, w)| (j, self.weight(w)))
                    .collect()
            })
            .collect()
    }
}

// ─────────────────────────────────────────────
// Laplacian
// ─────────────────────────────────────────────

/// Sparse combinatorial Laplacian `L = D − A`.
#[derive(Debug, Clone)]
pub struct Laplacian {
    /// Number of nodes.
    pub n:      usize,
    order:      Arc<NodeOrder>,
    /// `adj[i]` = `[(j, w_ij)]`  (both directions)
    adj:        Vec<Vec<(usize, f64)>>,
    /// Weighted degree `d_i = Σ_j w_ij`.
    degree:     Vec<f64>,
    weighting:  EdgeWeighting,
}

impl Laplacian {
    pub fn build(graph: &PpiGraph, weighting: EdgeWeighting) -> Self {
        let adj = weighting.adjacency(graph);
        let degree: Vec<f64> = adj.iter().map(|row| row.iter().map(|&(_, w)| w).sum()).collect();

        debug!(
            nodes     = graph.node_count(),
            edges     = graph.edge_count(),
            weighting = ?weighting,
            "laplacian built"
        );

        Self {
            n: graph.node_count(),
            order: Arc::clone(graph.order()),
            adj,
            degree,
            weighting,
        }
    }

    pub fn order(&self) -> &Arc<NodeOrder> {
        &self.order
    }

    pub fn degree(&self) -> &[f64] {
        &self.degree
    }

    pub fn weighting(&self) -> EdgeWeighting {
        self.weighting
    }

    pub fn neighbors(&self, i: usize) -> &[(usize, f64)] {
        &self.adj[i]
    }

    /// `(L·x)_i = d_i·x_i − Σ_j w_ij·x_j`.
    pub fn apply(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.n);
        (0..self.n)
            .map(|i| {
                let spread: f64 = self.adj[i].iter().map(|&(j, w)| w * x[j]).sum();
                self.degree[i] * x[i] - spread
            })
            .collect()
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(self.n, self.n);
        for i in 0..self.n {
            m[(i, i)] = self.degree[i];
            for &(j, w) in &self.adj[i] {
                m[(i, j)] -= w;
            }
        }
        m
    }
}

// ─────────────────────────────────────────────
// DiffusionOperator
// ─────────────────────────────────────────────

/// `M = I + α·L`.
#[derive(Debug, Clone)]
pub struct DiffusionOperator {
    laplacian: Laplacian,
    alpha:     f64,
}

impl DiffusionOperator {
    pub fn new(laplacian: Laplacian, alpha: f64) -> Result<Self, DiffusionError> {
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(DiffusionError::InvalidAlpha(alpha));
        }
        Ok(Self { laplacian, alpha })
    }

    /// Build `L` from `graph` and wrap it.
    pub fn build(graph: &PpiGraph, weighting: EdgeWeighting, alpha: f64) -> Result<Self, DiffusionError> {
        Self::new(Laplacian::build(graph, weighting), alpha)
    }

    #[inline] pub fn n(&self) -> usize { self.laplacian.n }
    #[inline] pub fn alpha(&self) -> f64 { self.alpha }

    pub fn order(&self) -> &Arc<NodeOrder> {
        self.laplacian.order()
    }

    pub fn laplacian(&self) -> &Laplacian {
        &self.laplacian
    }

    /// `M·x = x + α·L·x`.
    pub fn apply(&self, x: &[f64]) -> Vec<f64> {
        let lx = self.laplacian.apply(x);
        x.iter().zip(lx).map(|(xi, lxi)| xi + self.alpha * lxi).collect()
    }

    /// `diag(M)_i = 1 + α·d_i`; the Jacobi preconditioner.
    pub fn diagonal(&self) -> Vec<f64> {
        self.laplacian.degree.iter().map(|d| 1.0 + self.alpha * d).collect()
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let n = self.n();
        DMatrix::identity(n, n) + self.laplacian.to_dense() * self.alpha
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
