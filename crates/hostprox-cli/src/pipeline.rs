//! The batch pipeline: manifest → resolver → graph → operators → rankings.
//!
//! Strictly sequential. Identifier maps are loaded in full before the first
//! edge is read; the graph is frozen before any operator is built.

use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use hostprox_diffusion::{
    make_seed_vector, rank_all, write_google_matrix, ArtifactFormat, DiffusionOperator,
    GoogleMatrix, GooglePropagator, PreparedDiffusion, RankMode, RankedResult, SeedRegistry,
    SeedSetBuilder, SeedVector,
};
use hostprox_graph::import::{ingest_edges, read_id_list, read_identifier_map};
use hostprox_graph::{
    BuildConfig, BuildReport, GraphBuilder, IdResolver, Organism, PpiGraph, SourceRules,
    SourceTag,
};

use crate::config::{NamespaceKind, RunConfig, SeedOrigin};
use crate::error::{ConfigError, PipelineError};
use crate::report::{self, SeedSummary};

// ─────────────────────────────────────────────
// Progress
// ─────────────────────────────────────────────

fn spinner(visible: bool, label: &str) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("  {spinner:.green} {msg} {pos} records ({per_sec})") {
        pb.set_style(style);
    }
    pb.set_message(label.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

// ─────────────────────────────────────────────
// Graph construction
// ─────────────────────────────────────────────

/// Register every namespace, loading mapped namespaces' tables.
pub fn build_resolver(cfg: &RunConfig) -> Result<IdResolver, PipelineError> {
    let mut builder = IdResolver::builder();
    for ns in &cfg.namespaces {
        builder = match (ns.kind, &ns.map) {
            (NamespaceKind::Mapped, Some(map)) => {
                let (table, _) = read_identifier_map(&map.path, map.format(), map.from_column, map.to_column)?;
                builder.mapped(ns.spec(), table)?
            }
            (NamespaceKind::Canonical, None) => builder.canonical(ns.spec())?,
            _ => {
                return Err(ConfigError::Invalid(format!("namespace '{}' has the wrong map setting", ns.name)).into());
            }
        };
    }
    Ok(builder.build())
}

/// The frozen graph and everything collected while building it.
#[derive(Debug)]
pub struct BuiltGraph {
    pub graph:  PpiGraph,
    pub report: BuildReport,
    pub seeds:  SeedRegistry,
}

pub fn build_graph(cfg: &RunConfig, show_progress: bool) -> Result<BuiltGraph, PipelineError> {
    let resolver = build_resolver(cfg)?;

    let mut config = BuildConfig::new(cfg.graph.merge_policy);
    if let Some(cutoff) = cfg.graph.min_confidence {
        config = config.min_confidence(cutoff);
    }
    let mut builder = GraphBuilder::new(&resolver, config)?;

    let origins = cfg.seeds.iter().map(|s| s.origin()).collect::<Result<Vec<_>, _>>()?;
    let mut collectors: Vec<SeedSetBuilder> = cfg.seeds.iter().map(|s| SeedSetBuilder::new(&s.name)).collect();

    for src in &cfg.sources {
        let tag = SourceTag::new(&src.tag);
        builder.set_source_rules(tag.clone(), SourceRules {
            min_confidence: src.min_confidence,
            scale:          src.scale,
        })?;
        let namespaces = [resolver.namespace(&src.namespaces[0])?, resolver.namespace(&src.namespaces[1])?];

        // seed sets fed by this source, with the organism they keep
        let hooks: Vec<(usize, Organism)> = origins
            .iter()
            .enumerate()
            .filter_map(|(k, o)| match *o {
                SeedOrigin::Source { tag, organism } if tag == src.tag => Some((k, organism)),
                _ => None,
            })
            .collect();

        let pb = spinner(show_progress, &src.tag);
        ingest_edges(&mut builder, &src.table(), namespaces, &tag, |b, outcome| {
            pb.inc(1);
            let Some((i, j)) = outcome.endpoints() else { return };
            for &(k, organism) in &hooks {
                for idx in [i, j] {
                    let node = b.node(idx);
                    if node.organism == organism {
                        collectors[k].insert(node.id.clone());
                    }
                }
            }
        })?;
        pb.finish_and_clear();
    }

    for (k, origin) in origins.iter().enumerate() {
        let SeedOrigin::File { path, namespace, format, column } = *origin else { continue };
        let ns = resolver.namespace(namespace)?;
        let (ids, _) = read_id_list(path, format, column)?;
        let mut unresolved = 0usize;
        for raw in &ids {
            match resolver.resolve(ns, raw) {
                Some(id) => {
                    collectors[k].insert(id);
                }
                None => unresolved += 1,
            }
        }
        if unresolved > 0 {
            warn!(seed_set = collectors[k].name(), unresolved, namespace, "seed ids did not resolve");
        }
    }

    let (graph, report) = builder.finish();

    let mut seeds = SeedRegistry::new();
    for collector in collectors {
        if collector.is_empty() {
            warn!(seed_set = collector.name(), "seed set is empty");
        }
        seeds.insert(collector.build())?;
    }

    Ok(BuiltGraph { graph, report, seeds })
}

// ─────────────────────────────────────────────
// Ranking
// ─────────────────────────────────────────────

/// Seed vectors for every registered set, in name order.
pub fn seed_vectors(built: &BuiltGraph) -> Vec<SeedVector> {
    built.seeds.iter().map(|s| make_seed_vector(built.graph.order(), s)).collect()
}

/// Rank every seed set under each mode; each operator is prepared once.
pub fn rank_seeds(
    built:   &BuiltGraph,
    cfg:     &RunConfig,
    vectors: &[SeedVector],
    modes:   &[RankMode],
) -> Result<Vec<RankedResult>, PipelineError> {
    let mut results = Vec::with_capacity(vectors.len() * modes.len());
    for &mode in modes {
        match mode {
            RankMode::Laplacian => {
                let d = &cfg.diffusion;
                let op = DiffusionOperator::build(&built.graph, d.weighting, d.alpha)?;
                let solver = PreparedDiffusion::prepare(op, d.solver_config())?;
                results.extend(rank_all(&solver, vectors)?);
            }
            RankMode::Google => {
                let g = &cfg.google;
                let matrix = GoogleMatrix::build(&built.graph, g.weighting, g.damping)?;
                let propagator = GooglePropagator::new(matrix, g.propagation())?;
                results.extend(rank_all(&propagator, vectors)?);
            }
        }
    }
    Ok(results)
}

// ─────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────

/// `hostprox check`: build the graph and return its report.
pub fn run_check(cfg: &RunConfig, show_progress: bool) -> Result<BuiltGraph, PipelineError> {
    let built = build_graph(cfg, show_progress)?;
    for vector in seed_vectors(&built) {
        info!(
            seed_set = %vector.name,
            matched  = vector.matched,
            missing  = vector.missing.len(),
            "seed set checked"
        );
    }
    Ok(built)
}

#[derive(Debug)]
pub struct RankRun {
    pub built:   BuiltGraph,
    pub results: Vec<RankedResult>,
    pub files:   Vec<PathBuf>,
}

/// `hostprox rank`: full pipeline, writing ranked tables and reports under `cfg.output.dir`.
pub fn run_rank(cfg: &RunConfig, modes: &[RankMode], show_progress: bool) -> Result<RankRun, PipelineError> {
    let built = build_graph(cfg, show_progress)?;
    let out = &cfg.output.dir;

    let mut files = vec![report::write_build_report(out, &built.report)?];

    let vectors = seed_vectors(&built);
    let summaries: Vec<SeedSummary> = vectors.iter().map(SeedSummary::from).collect();
    files.push(report::write_seed_summary(out, &summaries)?);

    let results = rank_seeds(&built, cfg, &vectors, modes)?;
    for result in &results {
        let Some(seeds) = built.seeds.get(&result.seed_set) else { continue };
        files.extend(report::write_ranked(out, result, seeds)?);
    }

    info!(dir = %out.display(), files = files.len(), rankings = results.len(), "rank run complete");
    Ok(RankRun { built, results, files })
}

/// `hostprox google-matrix`: build and save the Google matrix artifact.
pub fn run_google_matrix(
    cfg:           &RunConfig,
    format:        ArtifactFormat,
    show_progress: bool,
) -> Result<Vec<PathBuf>, PipelineError> {
    let built = build_graph(cfg, show_progress)?;
    let matrix = GoogleMatrix::build(&built.graph, cfg.google.weighting, cfg.google.damping)?;
    if format == ArtifactFormat::Npy && matrix.n() > 20_000 {
        warn!(nodes = matrix.n(), "dense google matrix export is N×N f64");
    }
    Ok(write_google_matrix(&matrix, &cfg.output.dir, "google_matrix", format)?)
}
