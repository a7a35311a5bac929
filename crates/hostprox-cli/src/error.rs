use std::path::PathBuf;

use thiserror::Error;

use hostprox_diffusion::DiffusionError;
use hostprox_graph::GraphError;

/// Problems in the run manifest, all raised before any table is ingested.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path:   PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{what} file not found: {path}")]
    MissingFile { what: String, path: PathBuf },

    #[error("duplicate {what} '{name}'")]
    Duplicate { what: &'static str, name: String },

    #[error("{what} '{name}' is not declared")]
    UnknownReference { what: &'static str, name: String },

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Diffusion(#[from] DiffusionError),

    #[error("I/O on {path}: {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("writing {path}: {source}")]
    Json {
        path:   PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
