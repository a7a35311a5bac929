//! Ranking: push a seed vector through an operator and sort the result.
//!
//! | Operator                | Mode          | Score                                 |
//! |-------------------------|---------------|---------------------------------------|
//! | [`PreparedDiffusion`]   | `laplacian`   | `x` solving `(I + α·L)·x = s`         |
//! | [`GooglePropagator`]    | `google`      | `Gᵀ·s` or personalized PageRank       |
//!
//! Results are sorted by descending score, ties broken by canonical id, so
//! identical inputs always produce identical output.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use hostprox_graph::{NodeOrder, ProteinId};

use crate::error::DiffusionError;
use crate::seeds::{SeedSet, SeedVector};
use crate::solver::PreparedDiffusion;
use crate::stochastic::GooglePropagator;

// ─────────────────────────────────────────────
// RankMode / RankingOperator
// ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMode {
    Laplacian,
    Google,
}

impl RankMode {
    pub fn label(self) -> &'static str {
        match self {
            RankMode::Laplacian => "laplacian",
            RankMode::Google    => "google",
        }
    }
}

impl fmt::Display for RankMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An operator that maps a seed vector to one score per node.
pub trait RankingOperator {
    /// Basis the operator was built over.
    fn order(&self) -> &Arc<NodeOrder>;

    fn mode(&self) -> RankMode;

    fn scores(&self, seed: &[f64]) -> Result<Vec<f64>, DiffusionError>;
}

impl RankingOperator for PreparedDiffusion {
    fn order(&self) -> &Arc<NodeOrder> {
        PreparedDiffusion::order(self)
    }

    fn mode(&self) -> RankMode {
        RankMode::Laplacian
    }

    fn scores(&self, seed: &[f64]) -> Result<Vec<f64>, DiffusionError> {
        self.solve(seed).map(|s| s.x)
    }
}

impl RankingOperator for GooglePropagator {
    fn order(&self) -> &Arc<NodeOrder> {
        self.matrix().order()
    }

    fn mode(&self) -> RankMode {
        RankMode::Google
    }

    fn scores(&self, seed: &[f64]) -> Result<Vec<f64>, DiffusionError> {
        self.propagate(seed)
    }
}

// ─────────────────────────────────────────────
// RankedResult
// ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub seed_set: String,
    pub mode:     RankMode,
    /// `(protein, score)`, descending score then ascending id.
    pub entries:  Vec<(ProteinId, f64)>,
}

impl RankedResult {
    #[inline] pub fn len(&self) -> usize { self.entries.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn top_k(&self, k: usize) -> &[(ProteinId, f64)] {
        let end = k.min(self.entries.len());
        &self.entries[..end]
    }

    pub fn score_of(&self, id: &str) -> Option<f64> {
        self.entries.iter().find(|(p, _)| p.as_str() == id).map(|&(_, s)| s)
    }

    /// Zero-based position of `id` in the ranking.
    pub fn rank_of(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|(p, _)| p.as_str() == id)
    }

    /// The ranking with the seed members removed.
    pub fn discovered<'a>(&'a self, seeds: &'a SeedSet) -> impl Iterator<Item = &'a (ProteinId, f64)> + 'a {
        self.entries.iter().filter(move |(p, _)| !seeds.contains(p.as_str()))
    }
}

fn by_score_then_id(a: &(ProteinId, f64), b: &(ProteinId, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

// ─────────────────────────────────────────────
// rank
// ─────────────────────────────────────────────

/// Score every node for `seed` and sort.
///
/// Fails with [`DiffusionError::OrderMismatch`] when the seed vector was built
/// over a different node order than `op`.
pub fn rank(op: &dyn RankingOperator, seed: &SeedVector) -> Result<RankedResult, DiffusionError> {
    if !NodeOrder::same_basis(op.order(), &seed.order) {
        return Err(DiffusionError::OrderMismatch { seed_set: seed.name.clone() });
    }

    let scores = op.scores(&seed.values)?;
    let order = op.order();

    let mut entries: Vec<(ProteinId, f64)> = scores
        .into_iter()
        .enumerate()
        // fold -0.0 into 0.0 so the sort key is total over equal scores
        .map(|(i, s)| (order.id(i).clone(), if s == 0.0 { 0.0 } else { s }))
        .collect();
    entries.sort_by(by_score_then_id);

    let nonzero = entries.iter().filter(|(_, s)| *s != 0.0).count();
    info!(
        seed_set = %seed.name,
        mode     = %op.mode(),
        nodes    = entries.len(),
        nonzero,
        "ranking complete"
    );

    Ok(RankedResult { seed_set: seed.name.clone(), mode: op.mode(), entries })
}

/// [`rank`] for several seed vectors against one prepared operator.
pub fn rank_all(op: &dyn RankingOperator, seeds: &[SeedVector]) -> Result<Vec<RankedResult>, DiffusionError> {
    seeds.iter().map(|s| rank(op, s)).collect()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
