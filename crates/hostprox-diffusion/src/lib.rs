//! `hostprox-diffusion`: proximity ranking over a reconciled PPI graph.
//!
//! Two operators share one frozen [`NodeOrder`](hostprox_graph::NodeOrder):
//! a Laplacian diffusion `(I + α·L)·x = s` and a damped Google matrix
//! `G = α·S + (1 − α)/N·J`. Seed sets become indicator vectors over that
//! order and are ranked against either operator.
//!
//! ## Crate structure
//!
//! | Module           | Responsibility                                             |
//! |------------------|------------------------------------------------------------|
//! | [`laplacian`]    | [`Laplacian`] `D − A` and [`DiffusionOperator`] `I + α·L`  |
//! | [`solver`]       | [`PreparedDiffusion`]: dense Cholesky or Jacobi-PCG        |
//! | [`stochastic`]   | [`StochasticMatrix`], [`GoogleMatrix`], [`GooglePropagator`] |
//! | [`artifact`]     | Google matrix `.npy` / bincode export                      |
//! | [`seeds`]        | [`SeedSet`], [`SeedRegistry`], [`make_seed_vector`]        |
//! | [`engine`]       | [`RankingOperator`], [`rank`], [`RankedResult`]            |
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use hostprox_diffusion::*;
//!
//! let op = DiffusionOperator::build(&graph, EdgeWeighting::Confidence, DEFAULT_ALPHA)?;
//! let solver = PreparedDiffusion::prepare(op, SolverConfig::default())?;
//!
//! let seeds = make_seed_vector(graph.order(), &covid_seeds);
//! let ranked = rank(&solver, &seeds)?;
//! for (protein, score) in ranked.top_k(20) {
//!     println!("{protein}\t{score}");
//! }
//! ```

pub mod artifact;
pub mod engine;
pub mod error;
pub mod laplacian;
pub mod seeds;
pub mod solver;
pub mod stochastic;

#[cfg(test)]
mod test_support;

// ── Operators ─────────────────────────────────────────────────────────────────
pub use laplacian::{DiffusionOperator, EdgeWeighting, Laplacian, DEFAULT_ALPHA};
pub use solver::{
    PreparedDiffusion, Solution, SolverConfig, SolverStrategy, DEFAULT_CG_MAX_ITERATIONS,
    DEFAULT_CG_TOLERANCE, DEFAULT_DENSE_LIMIT,
};
pub use stochastic::{
    GoogleMatrix, GooglePropagator, Propagation, StochasticMatrix, DEFAULT_DAMPING,
    DEFAULT_PPR_MAX_ITERATIONS, DEFAULT_PPR_TOLERANCE,
};

// ── Artifacts ─────────────────────────────────────────────────────────────────
pub use artifact::{
    read_dense_google, read_google_matrix, read_node_order, write_google_matrix, write_node_order,
    ArtifactFormat,
};

// ── Seeds and ranking ─────────────────────────────────────────────────────────
pub use engine::{rank, rank_all, RankMode, RankedResult, RankingOperator};
pub use error::DiffusionError;
pub use seeds::{make_seed_vector, SeedRegistry, SeedSet, SeedSetBuilder, SeedVector};
