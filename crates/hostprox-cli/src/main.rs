//! # hostprox
//!
//! Ranks proteins of a reconciled host–pathogen PPI network by proximity to
//! seed sets, with Laplacian diffusion and a damped Google matrix.
//!
//! ## Usage
//!
//! ```text
//! hostprox check --config run.toml
//! hostprox rank --config run.toml --mode both --output results/
//! hostprox google-matrix --config run.toml --format bincode
//! ```
//!
//! `HOSTPROX_LOG` sets the tracing filter, `HOSTPROX_OUTPUT_DIR` the output
//! directory; flags override both.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use hostprox_cli::{run_check, run_google_matrix, run_rank, RunConfig, ENV_LOG};
use hostprox_diffusion::{ArtifactFormat, RankMode};

// ─────────────────────────────────────────────
// Arguments
// ─────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "hostprox", version)]
#[command(about = "Host–pathogen PPI proximity ranking")]
struct Cli {
    /// Tracing filter, e.g. `hostprox_diffusion=debug,info`.
    #[arg(long, env = ENV_LOG, default_value = "info", global = true)]
    log: String,

    /// Hide progress spinners.
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the manifest, build the graph and print the build report.
    Check {
        #[arg(long)]
        config: PathBuf,
    },
    /// Run the full pipeline and write ranked tables.
    Rank {
        #[arg(long)]
        config: PathBuf,
        #[arg(long, value_enum, default_value_t = ModeArg::Both)]
        mode: ModeArg,
        /// Replaces `[output].dir` and `HOSTPROX_OUTPUT_DIR`.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Build the Google matrix and save it.
    GoogleMatrix {
        #[arg(long)]
        config: PathBuf,
        /// Defaults to `[google].format`.
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Laplacian,
    Google,
    Both,
}

impl ModeArg {
    fn modes(self) -> &'static [RankMode] {
        match self {
            ModeArg::Laplacian => &[RankMode::Laplacian],
            ModeArg::Google    => &[RankMode::Google],
            ModeArg::Both      => &[RankMode::Laplacian, RankMode::Google],
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Npy,
    Bincode,
}

impl From<FormatArg> for ArtifactFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Npy     => ArtifactFormat::Npy,
            FormatArg::Bincode => ArtifactFormat::Bincode,
        }
    }
}

fn load(path: &Path, output: Option<PathBuf>) -> anyhow::Result<RunConfig> {
    let mut cfg = RunConfig::load(path).with_context(|| format!("loading {}", path.display()))?;
    if let Some(dir) = output {
        cfg.output.dir = dir;
    }
    Ok(cfg)
}

// ─────────────────────────────────────────────
// main
// ─────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "hostprox starting");
    let progress = !cli.quiet;

    match cli.command {
        Command::Check { config } => {
            let cfg = load(&config, None)?;
            let built = run_check(&cfg, progress)?;
            println!("{}", serde_json::to_string_pretty(&built.report)?);
        }
        Command::Rank { config, mode, output } => {
            let cfg = load(&config, output)?;
            let run = run_rank(&cfg, mode.modes(), progress)?;
            for path in &run.files {
                println!("{}", path.display());
            }
        }
        Command::GoogleMatrix { config, format, output } => {
            let cfg = load(&config, output)?;
            let format = format.map(ArtifactFormat::from).unwrap_or(cfg.google.format);
            for path in run_google_matrix(&cfg, format, progress)? {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}
