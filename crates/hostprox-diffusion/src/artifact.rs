//! Google-matrix artifacts on disk.
//!
//! | Format     | Files                                  | Content                        |
//! |------------|----------------------------------------|--------------------------------|
//! | `npy`      | `<stem>.npy`, `<stem>.nodes.txt`       | dense `N×N` f64, row order ids |
//! | `bincode`  | `<stem>.bin`                           | sparse `S`, damping, node ids  |
//!
//! The dense file is what numpy consumers load directly; the bincode form is
//! `O(|E|)` and round-trips into a [`GoogleMatrix`].

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use ndarray::Array2;
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use serde::{Deserialize, Serialize};
use tracing::info;

use hostprox_graph::{NodeOrder, ProteinId};

use crate::error::DiffusionError;
use crate::laplacian::EdgeWeighting;
use crate::stochastic::{GoogleMatrix, StochasticMatrix};

const ARTIFACT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    Npy,
    Bincode,
}

impl ArtifactFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactFormat::Npy     => "npy",
            ArtifactFormat::Bincode => "bin",
        }
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArtifactFormat::Npy     => "npy",
            ArtifactFormat::Bincode => "bincode",
        })
    }
}

impl FromStr for ArtifactFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "npy"     => Ok(ArtifactFormat::Npy),
            "bincode" => Ok(ArtifactFormat::Bincode),
            other     => Err(format!("unknown artifact format '{other}' (expected npy or bincode)")),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct SparseGoogle {
    version:   u32,
    damping:   f64,
    weighting: EdgeWeighting,
    ids:       Vec<ProteinId>,
    s:         StochasticMatrix,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> DiffusionError + '_ {
    move |source| DiffusionError::Io { path: path.to_path_buf(), source }
}

fn encode_err(path: &Path, e: impl fmt::Display) -> DiffusionError {
    DiffusionError::Encode { path: path.to_path_buf(), message: e.to_string() }
}

fn create(path: &Path) -> Result<BufWriter<File>, DiffusionError> {
    File::create(path).map(BufWriter::new).map_err(io_err(path))
}

/// Write `matrix` under `dir` as `<stem>.<ext>`; returns every file written.
pub fn write_google_matrix(
    matrix: &GoogleMatrix,
    dir:    &Path,
    stem:   &str,
    format: ArtifactFormat,
) -> Result<Vec<PathBuf>, DiffusionError> {
    std::fs::create_dir_all(dir).map_err(io_err(dir))?;
    let path = dir.join(format!("{stem}.{}", format.extension()));

    let written = match format {
        ArtifactFormat::Npy => {
            let mut w = create(&path)?;
            matrix.to_dense().write_npy(&mut w).map_err(|e| encode_err(&path, e))?;
            w.flush().map_err(io_err(&path))?;
            let nodes = dir.join(format!("{stem}.nodes.txt"));
            write_node_order(matrix.order(), &nodes)?;
            vec![path, nodes]
        }
        ArtifactFormat::Bincode => {
            let artifact = SparseGoogle {
                version:   ARTIFACT_VERSION,
                damping:   matrix.damping(),
                weighting: matrix.weighting(),
                ids:       matrix.order().ids().to_vec(),
                s:         matrix.stochastic().clone(),
            };
            let mut w = create(&path)?;
            bincode::serialize_into(&mut w, &artifact).map_err(|e| encode_err(&path, e))?;
            w.flush().map_err(io_err(&path))?;
            vec![path]
        }
    };

    info!(format = %format, nodes = matrix.n(), files = ?written, "google matrix written");
    Ok(written)
}

/// One canonical id per line, in basis order.
pub fn write_node_order(order: &NodeOrder, path: &Path) -> Result<(), DiffusionError> {
    let mut w = create(path)?;
    for id in order.ids() {
        writeln!(w, "{id}").map_err(io_err(path))?;
    }
    w.flush().map_err(io_err(path))
}

pub fn read_node_order(path: &Path) -> Result<NodeOrder, DiffusionError> {
    let file = File::open(path).map_err(io_err(path))?;
    let mut ids = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(io_err(path))?;
        if !line.is_empty() {
            ids.push(ProteinId::new(line));
        }
    }
    NodeOrder::new(ids).ok_or_else(|| encode_err(path, "duplicate id in node order"))
}

/// Load a sparse artifact written with [`ArtifactFormat::Bincode`].
pub fn read_google_matrix(path: &Path) -> Result<GoogleMatrix, DiffusionError> {
    let file = File::open(path).map_err(io_err(path))?;
    let artifact: SparseGoogle =
        bincode::deserialize_from(BufReader::new(file)).map_err(|e| encode_err(path, e))?;
    if artifact.version != ARTIFACT_VERSION {
        return Err(encode_err(path, format!("unsupported artifact version {}", artifact.version)));
    }
    let order = NodeOrder::new(artifact.ids).ok_or_else(|| encode_err(path, "duplicate id in node order"))?;
    GoogleMatrix::from_parts(Arc::new(order), artifact.s, artifact.damping, artifact.weighting)
}

/// Load a dense `.npy` artifact with its `.nodes.txt` sidecar.
pub fn read_dense_google(npy: &Path, nodes: &Path) -> Result<(NodeOrder, Array2<f64>), DiffusionError> {
    let order = read_node_order(nodes)?;
    let file = File::open(npy).map_err(io_err(npy))?;
    let dense = Array2::<f64>::read_npy(BufReader::new(file)).map_err(|e| encode_err(npy, e))?;
    if dense.nrows() != order.len() || dense.ncols() != order.len() {
        return Err(DiffusionError::LengthMismatch { expected: order.len(), got: dense.nrows() });
    }
    Ok((order, dense))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::graph;
    use tempfile::TempDir;

    fn google() -> GoogleMatrix {
        let g = graph(&[("A", "B", 0.8), ("B", "C", 0.5)], &["D"]);
        GoogleMatrix::build(&g, EdgeWeighting::Confidence, 0.85).unwrap()
    }

    #[test]
    fn dense_artifact_matches_matrix() {
        let dir = TempDir::new().unwrap();
        let g = google();
        let files = write_google_matrix(&g, dir.path(), "google", ArtifactFormat::Npy).unwrap();
        assert_eq!(files.len(), 2);

        let (order, dense) = read_dense_google(&files[0], &files[1]).unwrap();
        assert_eq!(order.ids(), g.order().ids());
        assert_eq!(dense, g.to_dense());
    }

    #[test]
    fn sparse_artifact_restores_operator() {
        let dir = TempDir::new().unwrap();
        let g = google();
        let files = write_google_matrix(&g, dir.path(), "google", ArtifactFormat::Bincode).unwrap();
        assert_eq!(files[0].extension().unwrap(), "bin");

        let back = read_google_matrix(&files[0]).unwrap();
        assert_eq!(back.damping(), g.damping());
        assert_eq!(back.weighting(), EdgeWeighting::Confidence);
        assert!(NodeOrder::same_basis(back.order(), g.order()));
        assert_eq!(back.stochastic(), g.stochastic());
    }

    #[test]
    fn garbage_artifact_is_an_encode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.bin");
        std::fs::write(&path, b"not a matrix").unwrap();
        assert!(matches!(read_google_matrix(&path), Err(DiffusionError::Encode { .. })));
    }

    #[test]
    fn format_parses() {
        assert_eq!("npy".parse::<ArtifactFormat>().unwrap(), ArtifactFormat::Npy);
        assert!("csv".parse::<ArtifactFormat>().is_err());
    }
}
