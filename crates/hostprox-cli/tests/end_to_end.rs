//! End-to-end runs of the pipeline over small on-disk tables.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use hostprox_cli::{run_check, run_google_matrix, run_rank, RunConfig};
use hostprox_diffusion::{read_google_matrix, ArtifactFormat, RankMode};
use tempfile::TempDir;

// ── fixtures ─────────────────────────────────────────────────────────────────

const MAP: &str = "\
string_id\tuniprot_ac
ENSP0001\tPA
ENSP0002\tPB
ENSP0003\tPC
ENSP0004\tPD
";

/// A–B 800, B–C 500, C–D 900 (column-aligned), plus a self-loop and an unmapped endpoint.
const LINKS: &str = "\
protein1 protein2 combined_score
9606.ENSP0001 9606.ENSP0002 800
9606.ENSP0002 9606.ENSP0003 500
9606.ENSP0003   9606.ENSP0004    900
9606.ENSP0001 9606.ENSP0001 999
9606.ENSP9999 9606.ENSP0001 950
9606.ENSP0004 not-a-score
";

const VIRUS_HOST: &str = "\
nsp1_CVHSA\tPA
orf9b_CVHSA\tQX
";

fn manifest(extra: &str) -> String {
    format!(
        r#"
[graph]
merge_policy   = "max"
min_confidence = 700

[[namespace]]
name         = "string"
kind         = "mapped"
organism     = "host"
strip_prefix = "9606."
map          = {{ path = "map.tsv", skip_rows = 1 }}

[[namespace]]
name            = "uniprot"
kind            = "canonical"
organism        = "host"
pathogen_suffix = "_CVHSA"

[[source]]
tag          = "string"
path         = "links.txt"
delimiter    = "space"
skip_rows    = 1
namespaces   = ["string", "string"]
score_column = 2
scale        = 1000.0

[[seed]]
name      = "file-seeds"
file      = "seeds.txt"
namespace = "uniprot"

[output]
dir = "out"
{extra}
"#
    )
}

fn workspace(extra: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("map.tsv"), MAP).unwrap();
    fs::write(dir.path().join("links.txt"), LINKS).unwrap();
    fs::write(dir.path().join("vh.tsv"), VIRUS_HOST).unwrap();
    fs::write(dir.path().join("seeds.txt"), "PA\n").unwrap();
    let path = dir.path().join("run.toml");
    fs::write(&path, manifest(extra)).unwrap();
    (dir, path)
}

fn read_scores(path: &Path) -> Vec<(String, f64)> {
    let text = fs::read_to_string(path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("protein\tscore"));
    lines
        .map(|l| {
            let (id, score) = l.split_once('\t').unwrap();
            (id.to_string(), score.parse().unwrap())
        })
        .collect()
}

fn score(rows: &[(String, f64)], id: &str) -> f64 {
    rows.iter().find(|(p, _)| p == id).map(|&(_, s)| s).unwrap()
}

// ── graph ────────────────────────────────────────────────────────────────────

#[test]
fn threshold_self_loop_and_unresolved_are_counted() {
    let (_dir, path) = workspace("");
    let cfg = RunConfig::load(&path).unwrap();
    let built = run_check(&cfg, false).unwrap();

    assert_eq!(built.graph.node_count(), 4);
    assert_eq!(built.graph.edge_count(), 2);
    assert_eq!(built.graph.weight_between("PA", "PB"), Some(0.8));
    assert_eq!(built.graph.weight_between("PC", "PD"), Some(0.9));
    assert_eq!(built.graph.weight_between("PB", "PC"), None);

    let string = built.report.source("string").unwrap();
    assert_eq!(string.records, 5);
    assert_eq!(string.inserted, 2);
    assert_eq!(string.below_threshold, 1);
    assert_eq!(string.self_loops, 1);
    assert_eq!(string.unresolved, 1);
    assert_eq!(string.malformed, 1);
    assert_eq!(built.report.unresolved_by_namespace.get("string"), Some(&1));
    assert_eq!(built.report.components, 2);

    let ids: Vec<&str> = built.graph.order().ids().iter().map(|p| p.as_str()).collect();
    assert_eq!(ids, vec!["PA", "PB", "PC", "PD"]);
}

// ── ranking ──────────────────────────────────────────────────────────────────

#[test]
fn laplacian_and_google_rankings() {
    let (dir, path) = workspace("");
    let cfg = RunConfig::load(&path).unwrap();
    let run = run_rank(&cfg, &[RankMode::Laplacian, RankMode::Google], false).unwrap();
    assert_eq!(run.results.len(), 2);

    let out = dir.path().join("out");
    assert!(out.join("build_report.json").is_file());
    assert!(out.join("seed_sets.json").is_file());

    let lap = read_scores(&out.join("file-seeds.laplacian.tsv"));
    assert_eq!(lap.len(), 4);
    assert_eq!(lap[0].0, "PA");
    assert_eq!(lap[1].0, "PB");
    let (alpha, w) = (0.1, 0.8);
    assert!((score(&lap, "PA") - (1.0 + alpha * w) / (1.0 + 2.0 * alpha * w)).abs() < 1e-9);
    assert!((score(&lap, "PB") - alpha * w / (1.0 + 2.0 * alpha * w)).abs() < 1e-9);
    assert_eq!(score(&lap, "PC"), 0.0);
    assert_eq!(score(&lap, "PD"), 0.0);

    let google = read_scores(&out.join("file-seeds.google.tsv"));
    assert_eq!(google[0].0, "PB");
    assert!(score(&google, "PC") > 0.0);
    assert!(score(&google, "PD") > 0.0);
    assert!((google.iter().map(|(_, s)| s).sum::<f64>() - 1.0).abs() < 1e-9);

    let discovered = read_scores(&out.join("file-seeds.laplacian.discovered.tsv"));
    assert!(discovered.iter().all(|(p, _)| p != "PA"));
    assert_eq!(discovered.len(), 3);
}

#[test]
fn seed_set_from_virus_host_source() {
    let extra = r#"
[[source]]
tag            = "covid-human"
path           = "vh.tsv"
namespaces     = ["uniprot", "uniprot"]
min_confidence = 0

[[seed]]
name     = "covid"
source   = "covid-human"
organism = "host"

[[seed]]
name     = "viral"
source   = "covid-human"
organism = "pathogen"
"#;
    let (_dir, path) = workspace(extra);
    let cfg = RunConfig::load(&path).unwrap();
    let built = run_check(&cfg, false).unwrap();

    let covid = built.seeds.get("covid").unwrap();
    let members: Vec<&str> = covid.iter().map(|p| p.as_str()).collect();
    assert_eq!(members, vec!["PA", "QX"]);

    let viral = built.seeds.get("viral").unwrap();
    assert!(viral.contains("nsp1_CVHSA") && viral.contains("orf9b_CVHSA"));
    assert_eq!(built.report.pathogen_nodes, 2);
}

#[test]
fn seed_names_differing_only_in_punctuation_get_their_own_files() {
    let extra = r#"
[[seed]]
name      = "covid 19"
file      = "seeds.txt"
namespace = "uniprot"

[[seed]]
name      = "covid_19"
file      = "seeds_c.txt"
namespace = "uniprot"
"#;
    let (dir, path) = workspace(extra);
    fs::write(dir.path().join("seeds_c.txt"), "PC\n").unwrap();
    let cfg = RunConfig::load(&path).unwrap();
    let run = run_rank(&cfg, &[RankMode::Laplacian], false).unwrap();

    let unique: HashSet<&PathBuf> = run.files.iter().collect();
    assert_eq!(unique.len(), run.files.len());

    let out = dir.path().join("out");
    assert_eq!(read_scores(&out.join("covid%2019.laplacian.tsv"))[0].0, "PA");
    assert_eq!(read_scores(&out.join("covid_19.laplacian.tsv"))[0].0, "PC");
}

#[test]
fn identical_inputs_give_identical_output() {
    let (dir, path) = workspace("");
    let mut cfg = RunConfig::load(&path).unwrap();

    let mut outputs = Vec::new();
    for run in ["a", "b"] {
        cfg.output.dir = dir.path().join(run);
        run_rank(&cfg, &[RankMode::Laplacian, RankMode::Google], false).unwrap();
        outputs.push(fs::read(cfg.output.dir.join("file-seeds.google.tsv")).unwrap());
        outputs.push(fs::read(cfg.output.dir.join("file-seeds.laplacian.tsv")).unwrap());
    }
    assert_eq!(outputs[0], outputs[2]);
    assert_eq!(outputs[1], outputs[3]);
}

#[test]
fn google_matrix_artifact_round_trips() {
    let (dir, path) = workspace("");
    let cfg = RunConfig::load(&path).unwrap();

    let files = run_google_matrix(&cfg, ArtifactFormat::Bincode, false).unwrap();
    assert_eq!(files, vec![dir.path().join("out").join("google_matrix.bin")]);
    let g = read_google_matrix(&files[0]).unwrap();
    assert_eq!(g.n(), 4);
    assert_eq!(g.damping(), 0.85);

    let files = run_google_matrix(&cfg, ArtifactFormat::Npy, false).unwrap();
    assert_eq!(files.len(), 2);
    let nodes = fs::read_to_string(&files[1]).unwrap();
    assert_eq!(nodes, "PA\nPB\nPC\nPD\n");
}

// ── configuration errors ─────────────────────────────────────────────────────

#[test]
fn missing_edge_file_fails_before_ingestion() {
    let (dir, path) = workspace("");
    fs::remove_file(dir.path().join("links.txt")).unwrap();
    let err = RunConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("links.txt"));
}

// ── binary ───────────────────────────────────────────────────────────────────

#[test]
fn check_command_prints_build_report() {
    let (_dir, path) = workspace("");
    let output = Command::new(env!("CARGO_BIN_EXE_hostprox"))
        .args(["--quiet", "--log", "warn", "check", "--config"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["nodes"], 4);
    assert_eq!(report["edges"], 2);
    assert_eq!(report["merge_policy"], "max");
}

#[test]
fn log_filter_comes_from_environment() {
    let (_dir, path) = workspace("");
    let run = |filter: &str| {
        let output = Command::new(env!("CARGO_BIN_EXE_hostprox"))
            .env("HOSTPROX_LOG", filter)
            .args(["--quiet", "check", "--config"])
            .arg(&path)
            .output()
            .unwrap();
        assert!(output.status.success());
        String::from_utf8_lossy(&output.stderr).into_owned()
    };
    assert!(run("info").contains("hostprox starting"));
    assert!(!run("error").contains("hostprox starting"));
}

#[test]
fn unknown_mode_is_a_usage_error() {
    let (_dir, path) = workspace("");
    let status = Command::new(env!("CARGO_BIN_EXE_hostprox"))
        .args(["rank", "--mode", "sideways", "--config"])
        .arg(&path)
        .status()
        .unwrap();
    assert!(!status.success());
}
