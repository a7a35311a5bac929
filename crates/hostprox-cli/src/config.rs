//! Run manifest (TOML) plus environment overrides.
//!
//! Every input path is resolved against the manifest's directory and every
//! reference (namespace, source, seed set) is checked by [`RunConfig::validate`]
//! before any table is read.
//!
//! | Variable              | Default | Description                                  |
//! |-----------------------|---------|----------------------------------------------|
//! | `HOSTPROX_LOG`        | `info`  | tracing filter (`hostprox_graph=debug,info`) |
//! | `HOSTPROX_OUTPUT_DIR` | none    | replaces `[output].dir`                      |
//!
//! Command-line flags override both.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use hostprox_diffusion::{
    ArtifactFormat, EdgeWeighting, Propagation, SolverConfig, SolverStrategy, DEFAULT_ALPHA,
    DEFAULT_CG_MAX_ITERATIONS, DEFAULT_CG_TOLERANCE, DEFAULT_DAMPING, DEFAULT_DENSE_LIMIT,
    DEFAULT_PPR_MAX_ITERATIONS, DEFAULT_PPR_TOLERANCE,
};
use hostprox_graph::{EdgeTable, MergePolicy, NamespaceSpec, Organism, TableFormat};

use crate::error::ConfigError;

pub const ENV_LOG: &str = "HOSTPROX_LOG";
pub const ENV_OUTPUT_DIR: &str = "HOSTPROX_OUTPUT_DIR";

// ─────────────────────────────────────────────
// Delimiter
// ─────────────────────────────────────────────

/// A single-byte field separator; `"tab"`, `"space"`, `"whitespace"` and
/// `"comma"` are accepted by name. A space splits on runs of whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Delimiter(pub u8);

impl Default for Delimiter {
    fn default() -> Self {
        Delimiter(b'\t')
    }
}

impl TryFrom<String> for Delimiter {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "tab" => Ok(Delimiter(b'\t')),
            "space" | "whitespace" => Ok(Delimiter(b' ')),
            "comma" => Ok(Delimiter(b',')),
            one if one.len() == 1 => Ok(Delimiter(one.as_bytes()[0])),
            other => Err(format!("delimiter must be one ASCII character, got {other:?}")),
        }
    }
}

// ─────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphSection {
    pub merge_policy:   MergePolicy,
    pub min_confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceKind {
    Mapped,
    Canonical,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapTable {
    pub path:        PathBuf,
    #[serde(default)]
    pub delimiter:   Delimiter,
    #[serde(default)]
    pub skip_rows:   usize,
    #[serde(default)]
    pub from_column: usize,
    #[serde(default = "one_usize")]
    pub to_column:   usize,
}

impl MapTable {
    pub fn format(&self) -> TableFormat {
        TableFormat::new(self.delimiter.0, self.skip_rows)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamespaceSection {
    pub name:     String,
    pub kind:     NamespaceKind,
    pub organism: Organism,
    pub strip_prefix: Option<String>,
    #[serde(default)]
    pub underscore_whitespace: bool,
    pub pathogen_suffix: Option<String>,
    #[serde(default)]
    pub qualified: bool,
    pub map: Option<MapTable>,
}

impl NamespaceSection {
    pub fn spec(&self) -> NamespaceSpec {
        let mut spec = NamespaceSpec::new(&self.name, self.organism);
        if let Some(prefix) = &self.strip_prefix {
            spec = spec.strip_prefix(prefix);
        }
        if self.underscore_whitespace {
            spec = spec.underscore_whitespace();
        }
        if let Some(suffix) = &self.pathogen_suffix {
            spec = spec.pathogen_suffix(suffix);
        }
        if self.qualified {
            spec = spec.qualified();
        }
        spec
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSection {
    pub tag:  String,
    pub path: PathBuf,
    #[serde(default)]
    pub delimiter: Delimiter,
    #[serde(default)]
    pub skip_rows: usize,
    #[serde(default = "endpoint_columns")]
    pub columns: [usize; 2],
    pub namespaces: [String; 2],
    pub score_column: Option<usize>,
    #[serde(default = "one_f64")]
    pub default_score: f64,
    #[serde(default = "one_f64")]
    pub scale: f64,
    /// Replaces `[graph].min_confidence` for this source.
    pub min_confidence: Option<f64>,
}

impl SourceSection {
    pub fn table(&self) -> EdgeTable {
        let mut table = EdgeTable::new(&self.path, TableFormat::new(self.delimiter.0, self.skip_rows), self.columns);
        table.default_score = self.default_score;
        if let Some(col) = self.score_column {
            table = table.score_column(col);
        }
        table
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedSection {
    pub name:      String,
    /// Collect endpoints of accepted edges from this source...
    pub source:    Option<String>,
    /// ...keeping only proteins of this organism.
    pub organism:  Option<Organism>,
    /// Or read one id per line from this file...
    pub file:      Option<PathBuf>,
    /// ...resolved through this namespace.
    pub namespace: Option<String>,
    #[serde(default)]
    pub column:    usize,
    #[serde(default)]
    pub skip_rows: usize,
    #[serde(default)]
    pub delimiter: Delimiter,
}

/// Where a seed set's members come from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeedOrigin<'a> {
    Source { tag: &'a str, organism: Organism },
    File { path: &'a Path, namespace: &'a str, format: TableFormat, column: usize },
}

impl SeedSection {
    pub fn origin(&self) -> Result<SeedOrigin<'_>, ConfigError> {
        match (&self.source, &self.file) {
            (Some(tag), None) => {
                let organism = self.organism.ok_or_else(|| {
                    ConfigError::Invalid(format!("seed set '{}': `source` needs `organism`", self.name))
                })?;
                Ok(SeedOrigin::Source { tag, organism })
            }
            (None, Some(path)) => {
                let namespace = self.namespace.as_deref().ok_or_else(|| {
                    ConfigError::Invalid(format!("seed set '{}': `file` needs `namespace`", self.name))
                })?;
                Ok(SeedOrigin::File {
                    path,
                    namespace,
                    format: TableFormat::new(self.delimiter.0, self.skip_rows),
                    column: self.column,
                })
            }
            _ => Err(ConfigError::Invalid(format!(
                "seed set '{}' needs exactly one of `source` or `file`",
                self.name
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    Auto,
    Direct,
    Cg,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiffusionSection {
    pub alpha:             f64,
    pub weighting:         EdgeWeighting,
    pub solver:            SolverKind,
    pub dense_limit:       usize,
    pub cg_tolerance:      f64,
    pub cg_max_iterations: usize,
}

impl Default for DiffusionSection {
    fn default() -> Self {
        Self {
            alpha:             DEFAULT_ALPHA,
            weighting:         EdgeWeighting::Confidence,
            solver:            SolverKind::Auto,
            dense_limit:       DEFAULT_DENSE_LIMIT,
            cg_tolerance:      DEFAULT_CG_TOLERANCE,
            cg_max_iterations: DEFAULT_CG_MAX_ITERATIONS,
        }
    }
}

impl DiffusionSection {
    pub fn solver_config(&self) -> SolverConfig {
        let strategy = match self.solver {
            SolverKind::Auto   => SolverStrategy::Auto { dense_limit: self.dense_limit },
            SolverKind::Direct => SolverStrategy::Direct,
            SolverKind::Cg     => SolverStrategy::ConjugateGradient,
        };
        SolverConfig {
            strategy,
            cg_tolerance:      self.cg_tolerance,
            cg_max_iterations: self.cg_max_iterations,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationKind {
    Single,
    Personalized,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GoogleSection {
    pub damping:            f64,
    pub weighting:          EdgeWeighting,
    pub propagation:        PropagationKind,
    pub ppr_tolerance:      f64,
    pub ppr_max_iterations: usize,
    pub format:             ArtifactFormat,
}

impl Default for GoogleSection {
    fn default() -> Self {
        Self {
            damping:            DEFAULT_DAMPING,
            weighting:          EdgeWeighting::Unit,
            propagation:        PropagationKind::Single,
            ppr_tolerance:      DEFAULT_PPR_TOLERANCE,
            ppr_max_iterations: DEFAULT_PPR_MAX_ITERATIONS,
            format:             ArtifactFormat::Npy,
        }
    }
}

impl GoogleSection {
    pub fn propagation(&self) -> Propagation {
        match self.propagation {
            PropagationKind::Single => Propagation::SingleStep,
            PropagationKind::Personalized => Propagation::Personalized {
                tolerance:      self.ppr_tolerance,
                max_iterations: self.ppr_max_iterations,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self { dir: PathBuf::from("results") }
    }
}

fn one_usize() -> usize { 1 }
fn one_f64() -> f64 { 1.0 }
fn endpoint_columns() -> [usize; 2] { [0, 1] }

// ─────────────────────────────────────────────
// RunConfig
// ─────────────────────────────────────────────

/// The whole run manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub graph: GraphSection,
    #[serde(default, rename = "namespace")]
    pub namespaces: Vec<NamespaceSection>,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceSection>,
    #[serde(default, rename = "seed")]
    pub seeds: Vec<SeedSection>,
    #[serde(default)]
    pub diffusion: DiffusionSection,
    #[serde(default)]
    pub google: GoogleSection,
    #[serde(default)]
    pub output: OutputSection,
}

impl RunConfig {
    /// Read, resolve paths, apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut cfg = Self::parse(&text, base)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse manifest text; relative paths are taken relative to `base`.
    pub fn from_toml_str(text: &str, base: &Path) -> Result<Self, ConfigError> {
        Self::parse(text, base).map_err(|source| ConfigError::Parse { path: base.to_path_buf(), source })
    }

    fn parse(text: &str, base: &Path) -> Result<Self, toml::de::Error> {
        let mut cfg: RunConfig = toml::from_str(text)?;
        cfg.resolve_paths(base);
        Ok(cfg)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for ns in &mut self.namespaces {
            if let Some(map) = &mut ns.map {
                join(&mut map.path);
            }
        }
        for src in &mut self.sources {
            join(&mut src.path);
        }
        for seed in &mut self.seeds {
            if let Some(file) = &mut seed.file {
                join(file);
            }
        }
        join(&mut self.output.dir);
    }

    /// Environment overrides; `lookup` is `std::env::var` outside tests.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.is_empty()) {
            self.output.dir = PathBuf::from(dir);
        }
    }

    /// Every check that can fail before ingestion.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(c) = self.graph.min_confidence {
            finite("graph.min_confidence", c)?;
        }

        if self.namespaces.is_empty() {
            return Err(ConfigError::Invalid("at least one [[namespace]] is required".into()));
        }
        let namespaces = unique("namespace", self.namespaces.iter().map(|n| n.name.as_str()))?;
        for ns in &self.namespaces {
            match (ns.kind, &ns.map) {
                (NamespaceKind::Mapped, Some(map)) => exists("identifier map", &map.path)?,
                (NamespaceKind::Mapped, None) => {
                    return Err(ConfigError::Invalid(format!("mapped namespace '{}' needs a `map` table", ns.name)));
                }
                (NamespaceKind::Canonical, Some(_)) => {
                    return Err(ConfigError::Invalid(format!("canonical namespace '{}' cannot have a `map`", ns.name)));
                }
                (NamespaceKind::Canonical, None) => {}
            }
        }

        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("at least one [[source]] is required".into()));
        }
        let sources = unique("source", self.sources.iter().map(|s| s.tag.as_str()))?;
        for src in &self.sources {
            exists("edge source", &src.path)?;
            for ns in &src.namespaces {
                known("namespace", ns, &namespaces)?;
            }
            if !(src.scale.is_finite() && src.scale > 0.0) {
                return Err(ConfigError::Invalid(format!("source '{}': scale must be > 0, got {}", src.tag, src.scale)));
            }
            finite("source.default_score", src.default_score)?;
            if let Some(c) = src.min_confidence {
                finite("source.min_confidence", c)?;
            }
        }

        unique("seed set", self.seeds.iter().map(|s| s.name.as_str()))?;
        for seed in &self.seeds {
            match seed.origin()? {
                SeedOrigin::Source { tag, .. } => known("source", tag, &sources)?,
                SeedOrigin::File { path, namespace, .. } => {
                    exists("seed list", path)?;
                    known("namespace", namespace, &namespaces)?;
                }
            }
        }

        let d = &self.diffusion;
        if !(d.alpha.is_finite() && d.alpha > 0.0) {
            return Err(ConfigError::Invalid(format!("diffusion.alpha must be > 0, got {}", d.alpha)));
        }
        if !(d.cg_tolerance.is_finite() && d.cg_tolerance > 0.0) || d.cg_max_iterations == 0 {
            return Err(ConfigError::Invalid("diffusion.cg_tolerance and cg_max_iterations must be > 0".into()));
        }

        let g = &self.google;
        if !(g.damping.is_finite() && g.damping > 0.0 && g.damping < 1.0) {
            return Err(ConfigError::Invalid(format!("google.damping must lie in (0, 1), got {}", g.damping)));
        }
        if !(g.ppr_tolerance.is_finite() && g.ppr_tolerance > 0.0) || g.ppr_max_iterations == 0 {
            return Err(ConfigError::Invalid("google.ppr_tolerance and ppr_max_iterations must be > 0".into()));
        }

        Ok(())
    }
}

fn unique<'a>(what: &'static str, names: impl Iterator<Item = &'a str>) -> Result<HashSet<&'a str>, ConfigError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ConfigError::Duplicate { what, name: name.to_string() });
        }
    }
    Ok(seen)
}

fn known(what: &'static str, name: &str, declared: &HashSet<&str>) -> Result<(), ConfigError> {
    if declared.contains(name) {
        Ok(())
    } else {
        Err(ConfigError::UnknownReference { what, name: name.to_string() })
    }
}

fn exists(what: &str, path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::MissingFile { what: what.to_string(), path: path.to_path_buf() })
    }
}

fn finite(field: &str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{field} must be finite, got {v}")))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
