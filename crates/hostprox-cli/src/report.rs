//! Result writers: ranked tables, build report, seed summary.
//!
//! | File                               | Content                                  |
//! |------------------------------------|------------------------------------------|
//! | `<seed>.<mode>.tsv`                | `protein\tscore`, one row per graph node |
//! | `<seed>.<mode>.discovered.tsv`     | same, seed members removed               |
//! | `build_report.json`                | [`BuildReport`]                          |
//! | `seed_sets.json`                   | matched / missing members per seed set   |

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use hostprox_diffusion::{RankedResult, SeedSet, SeedVector};
use hostprox_graph::{BuildReport, ProteinId};

use crate::error::PipelineError;

pub const BUILD_REPORT_FILE: &str = "build_report.json";
pub const SEED_SUMMARY_FILE: &str = "seed_sets.json";

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PipelineError + '_ {
    move |source| PipelineError::Io { path: path.to_path_buf(), source }
}

fn create(dir: &Path, name: &str) -> Result<(PathBuf, BufWriter<File>), PipelineError> {
    std::fs::create_dir_all(dir).map_err(io_err(dir))?;
    let path = dir.join(name);
    let file = File::create(&path).map_err(io_err(&path))?;
    Ok((path, BufWriter::new(file)))
}

/// Portable file stem for a free-text seed name. Bytes outside
/// `[A-Za-z0-9._-]` are percent-encoded, so distinct names never share a file.
fn file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for b in name.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.') {
            stem.push(b as char);
        } else {
            stem.push_str(&format!("%{b:02X}"));
        }
    }
    stem
}

fn write_rows<'a>(
    path: &Path,
    mut w: BufWriter<File>,
    rows: impl Iterator<Item = &'a (ProteinId, f64)>,
) -> Result<(), PipelineError> {
    writeln!(w, "protein\tscore").map_err(io_err(path))?;
    for (protein, score) in rows {
        writeln!(w, "{protein}\t{score}").map_err(io_err(path))?;
    }
    w.flush().map_err(io_err(path))
}

/// Write the full ranking and the discovered-only ranking.
pub fn write_ranked(dir: &Path, result: &RankedResult, seeds: &SeedSet) -> Result<Vec<PathBuf>, PipelineError> {
    let stem = format!("{}.{}", file_stem(&result.seed_set), result.mode);

    let (full, w) = create(dir, &format!("{stem}.tsv"))?;
    write_rows(&full, w, result.entries.iter())?;

    let (discovered, w) = create(dir, &format!("{stem}.discovered.tsv"))?;
    write_rows(&discovered, w, result.discovered(seeds))?;

    Ok(vec![full, discovered])
}

fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf, PipelineError> {
    let (path, mut w) = create(dir, name)?;
    serde_json::to_writer_pretty(&mut w, value).map_err(|source| PipelineError::Json {
        path: path.clone(),
        source,
    })?;
    writeln!(w).map_err(io_err(&path))?;
    w.flush().map_err(io_err(&path))?;
    Ok(path)
}

pub fn write_build_report(dir: &Path, report: &BuildReport) -> Result<PathBuf, PipelineError> {
    write_json(dir, BUILD_REPORT_FILE, report)
}

/// How one seed set lined up with the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub name:    String,
    pub matched: usize,
    pub missing: Vec<String>,
}

impl From<&SeedVector> for SeedSummary {
    fn from(v: &SeedVector) -> Self {
        Self {
            name:    v.name.clone(),
            matched: v.matched,
            missing: v.missing.iter().map(|p| p.as_str().to_string()).collect(),
        }
    }
}

pub fn write_seed_summary(dir: &Path, summaries: &[SeedSummary]) -> Result<PathBuf, PipelineError> {
    write_json(dir, SEED_SUMMARY_FILE, &summaries)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
