//! Import: delimited identifier-map, edge and id-list tables.
//!
//! Tables are read with the `csv` crate in headerless, flexible mode; header
//! lines are skipped by count. A space delimiter splits on runs of ASCII
//! whitespace, so column-aligned tables read the same as single-spaced ones. A line with too few columns or a non-numeric
//! score is *malformed*: it is counted and skipped, never fatal. Only an
//! unreadable file aborts.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use tracing::{info, warn};

use crate::builder::{EdgeOutcome, GraphBuilder};
use crate::error::GraphError;
use crate::idmap::IdentifierMap;
use crate::model::{NamespaceId, SourceTag};

/// Rows between progress log lines.
pub const PROGRESS_EVERY: u64 = 100_000;

// ─────────────────────────────────────────────
// TableFormat / TableStats
// ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFormat {
    pub delimiter: u8,
    /// Leading lines to skip (headers).
    pub skip_rows: usize,
}

impl TableFormat {
    pub fn new(delimiter: u8, skip_rows: usize) -> Self {
        Self { delimiter, skip_rows }
    }

    pub fn tsv() -> Self {
        Self::new(b'\t', 0)
    }

    /// Whitespace separated, as STRING distributes its link files.
    pub fn space() -> Self {
        Self::new(b' ', 0)
    }

    pub fn splits_on_whitespace(&self) -> bool {
        self.delimiter == b' '
    }

    pub fn skip(mut self, rows: usize) -> Self {
        self.skip_rows = rows;
        self
    }
}

/// Line counters for one table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// Data lines read (after skipped headers).
    pub rows:      u64,
    pub accepted:  u64,
    pub malformed: u64,
}

// ─────────────────────────────────────────────
// Line reader
// ─────────────────────────────────────────────

fn for_each_row(
    path:   &Path,
    format: TableFormat,
    mut on_row: impl FnMut(&StringRecord) -> bool,
) -> Result<TableStats, GraphError> {
    let file = File::open(path).map_err(|source| GraphError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = ReaderBuilder::new()
        .delimiter(format.delimiter)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(BufReader::new(file));

    let mut stats = TableStats::default();
    let mut record = StringRecord::new();
    let mut compact = StringRecord::new();
    let mut skipped = 0usize;

    loop {
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) if skipped < format.skip_rows => {
                skipped += 1;
            }
            Ok(true) => {
                stats.rows += 1;
                let row = if format.splits_on_whitespace() {
                    compact.clear();
                    for part in record.iter().flat_map(str::split_ascii_whitespace) {
                        compact.push_field(part);
                    }
                    &compact
                } else {
                    &record
                };
                if on_row(row) {
                    stats.accepted += 1;
                } else {
                    stats.malformed += 1;
                }
                if stats.rows % PROGRESS_EVERY == 0 {
                    info!(path = %path.display(), rows = stats.rows, "reading table");
                }
            }
            Err(e) if e.is_io_error() => {
                return Err(GraphError::Table { path: path.to_path_buf(), source: e });
            }
            Err(e) => {
                // undecodable line; the reader has already moved past it
                if skipped < format.skip_rows {
                    skipped += 1;
                    continue;
                }
                stats.rows += 1;
                stats.malformed += 1;
                warn!(path = %path.display(), error = %e, "skipping undecodable line");
            }
        }
    }

    Ok(stats)
}

fn field(record: &StringRecord, col: usize) -> Option<&str> {
    record.get(col).map(str::trim).filter(|s| !s.is_empty())
}

// ─────────────────────────────────────────────
// Identifier maps
// ─────────────────────────────────────────────

/// Read a `(source id, canonical id)` table into an [`IdentifierMap`].
pub fn read_identifier_map(
    path:     &Path,
    format:   TableFormat,
    from_col: usize,
    to_col:   usize,
) -> Result<(IdentifierMap, TableStats), GraphError> {
    let mut map = IdentifierMap::new();
    let stats = for_each_row(path, format, |rec| {
        match (field(rec, from_col), field(rec, to_col)) {
            (Some(from), Some(to)) => {
                map.insert(from, to);
                true
            }
            _ => false,
        }
    })?;

    info!(
        path      = %path.display(),
        entries   = map.len(),
        conflicts = map.conflicts(),
        malformed = stats.malformed,
        "identifier map loaded"
    );
    Ok((map, stats))
}

// ─────────────────────────────────────────────
// Edge tables
// ─────────────────────────────────────────────

/// One parsed edge line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeRecord<'a> {
    pub raw_1: &'a str,
    pub raw_2: &'a str,
    pub score: f64,
}

/// Layout of an edge-source table.
#[derive(Debug, Clone)]
pub struct EdgeTable {
    pub path:          PathBuf,
    pub format:        TableFormat,
    /// Columns holding the two endpoints.
    pub columns:       [usize; 2],
    /// Score column; `None` gives every record `default_score`.
    pub score_column:  Option<usize>,
    pub default_score: f64,
}

impl EdgeTable {
    pub fn new(path: impl Into<PathBuf>, format: TableFormat, columns: [usize; 2]) -> Self {
        Self {
            path: path.into(),
            format,
            columns,
            score_column: None,
            default_score: 1.0,
        }
    }

    pub fn score_column(mut self, col: usize) -> Self {
        self.score_column = Some(col);
        self
    }

    pub fn parse<'a>(&self, rec: &'a StringRecord) -> Option<EdgeRecord<'a>> {
        let raw_1 = field(rec, self.columns[0])?;
        let raw_2 = field(rec, self.columns[1])?;
        let score = match self.score_column {
            Some(col) => field(rec, col)?.parse::<f64>().ok()?,
            None      => self.default_score,
        };
        Some(EdgeRecord { raw_1, raw_2, score })
    }

    /// Stream every well-formed record to `on_record`.
    pub fn read(&self, mut on_record: impl FnMut(EdgeRecord<'_>)) -> Result<TableStats, GraphError> {
        for_each_row(&self.path, self.format, |rec| match self.parse(rec) {
            Some(r) => {
                on_record(r);
                true
            }
            None => false,
        })
    }
}

/// Feed an edge table into `builder` under `source`.
///
/// `on_outcome` sees every builder outcome (seed collection hooks in here).
/// Malformed lines are recorded on the builder's report.
pub fn ingest_edges(
    builder:    &mut GraphBuilder<'_>,
    table:      &EdgeTable,
    namespaces: [NamespaceId; 2],
    source:     &SourceTag,
    mut on_outcome: impl FnMut(&GraphBuilder<'_>, &EdgeOutcome),
) -> Result<TableStats, GraphError> {
    let stats = table.read(|r| {
        let out = builder.add_edge(r.raw_1, r.raw_2, namespaces[0], namespaces[1], r.score, source);
        on_outcome(builder, &out);
    })?;
    builder.record_malformed(source, stats.malformed);

    info!(
        source    = %source,
        path      = %table.path.display(),
        rows      = stats.rows,
        malformed = stats.malformed,
        nodes     = builder.node_count(),
        edges     = builder.edge_count(),
        "edge source ingested"
    );
    Ok(stats)
}

// ─────────────────────────────────────────────
// Id lists
// ─────────────────────────────────────────────

/// Read one id per line from column `col`.
pub fn read_id_list(path: &Path, format: TableFormat, col: usize) -> Result<(Vec<String>, TableStats), GraphError> {
    let mut ids = Vec::new();
    let stats = for_each_row(path, format, |rec| match field(rec, col) {
        Some(id) => {
            ids.push(id.to_string());
            true
        }
        None => false,
    })?;
    Ok((ids, stats))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
