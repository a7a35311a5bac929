use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("unknown namespace: {0}")]
    UnknownNamespace(String),

    #[error("namespace registered twice: {0}")]
    DuplicateNamespace(String),

    #[error("namespace limit reached while registering {0}")]
    NamespaceLimit(String),

    #[error("invalid confidence threshold: {0} (must be finite)")]
    InvalidThreshold(f64),

    #[error("invalid score scale for source {source_tag}: {scale} (must be finite and > 0)")]
    InvalidScale { source_tag: String, scale: f64 },

    #[error("cannot open {}: {source}", path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("table read error in {}: {source}", path.display())]
    Table {
        path:   PathBuf,
        #[source]
        source: csv::Error,
    },
}
