use std::path::PathBuf;

use thiserror::Error;

/// Failures of operator construction, solving and ranking.
///
/// Numerical variants name the operator step that failed so a ranking run
/// can be traced back to the Laplacian solve or the Google propagation.
#[derive(Debug, Error)]
pub enum DiffusionError {
    #[error("invalid diffusion strength alpha = {0} (must be finite and > 0)")]
    InvalidAlpha(f64),

    #[error("invalid damping factor {0} (must lie strictly inside (0, 1))")]
    InvalidDamping(f64),

    #[error("invalid solver setting: {0}")]
    InvalidSolver(String),

    #[error("vector length {got} does not match operator dimension {expected}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("seed set '{seed_set}' was built against a different node order")]
    OrderMismatch { seed_set: String },

    #[error("duplicate seed set name '{0}'")]
    DuplicateSeedSet(String),

    #[error("{step}: factorization failed on a {n}×{n} system")]
    Factorization { step: &'static str, n: usize },

    #[error("{step}: no convergence after {iterations} iterations (residual {residual:.3e})")]
    NotConverged {
        step:       &'static str,
        iterations: usize,
        residual:   f64,
    },

    #[error("{step}: produced a non-finite value")]
    NonFinite { step: &'static str },

    #[error("I/O on {path}: {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encoding {path}: {message}")]
    Encode { path: PathBuf, message: String },
}
