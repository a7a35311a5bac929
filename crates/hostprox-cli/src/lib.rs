//! # hostprox-cli
//!
//! The outer shell around `hostprox-graph` and `hostprox-diffusion`: a TOML run
//! manifest, table ingestion with progress reporting, and result writers. The
//! `hostprox` binary is a thin clap front end over [`pipeline`].
//!
//! | Module       | Responsibility                                          |
//! |--------------|---------------------------------------------------------|
//! | [`config`]   | [`RunConfig`] parsing, path resolution, validation      |
//! | [`pipeline`] | resolver → graph → seed sets → operators → rankings     |
//! | [`report`]   | ranked TSVs, `build_report.json`, `seed_sets.json`      |

pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;

pub use config::{RunConfig, ENV_LOG, ENV_OUTPUT_DIR};
pub use error::{ConfigError, PipelineError};
pub use pipeline::{build_graph, run_check, run_google_matrix, run_rank, BuiltGraph, RankRun};
