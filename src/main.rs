//! chancap CLI

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use chancap::batch::{self, BatchTable, DirectoryLayout};
use chancap::{BinRule, CapacityEstimator, Class, EstimatorConfig, Formulation, SampleStore};

/// Exit code when the resolution search hit its cap.
const EXIT_NON_CONVERGENCE: u8 = 2;

#[derive(Parser)]
#[command(name = "chancap")]
#[command(about = "Channel capacity of self vs foreign signaling readouts")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate capacity for one pair of sample files
    Estimate {
        /// Foreign-ligand readouts (flat numeric text)
        #[arg(long = "foreign")]
        foreign: PathBuf,

        /// Self-ligand readouts (flat numeric text)
        #[arg(long = "self")]
        self_: PathBuf,

        /// Print resolution and normalization integral after the capacity.
        #[arg(long)]
        verbose_result: bool,

        /// Output file. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        estimator: EstimatorArgs,
    },

    /// Estimate capacity for every directory listed in a file_paths table
    Batch {
        /// Tab-separated table with a `file_path` column
        #[arg(long, default_value = "file_paths")]
        table: PathBuf,

        /// Foreign-class subdirectory under each file_path
        #[arg(long, default_value = "Ls_Lf_30")]
        foreign_subdir: PathBuf,

        /// Self-class subdirectory under each file_path
        #[arg(long, default_value = "Ls")]
        self_subdir: PathBuf,

        /// Report file (tab-separated)
        #[arg(short, long, default_value = "output_info")]
        output: PathBuf,

        /// Threads (0 = auto).
        #[arg(long, default_value = "0")]
        threads: usize,

        #[command(flatten)]
        estimator: EstimatorArgs,
    },
}

#[derive(Args)]
struct EstimatorArgs {
    /// JSON estimator config; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Support-detection rule (fd, scott, sturges, sqrt, rice, auto)
    #[arg(long)]
    rule: Option<BinRule>,

    /// Prior probability of the foreign class
    #[arg(long)]
    prior: Option<f64>,

    /// Normalization threshold for the mixture density
    #[arg(long)]
    threshold: Option<f64>,

    /// Largest bin count tried before giving up
    #[arg(long)]
    max_resolution: Option<usize>,

    /// Report the entropy-decomposition integral instead of the log-ratio one.
    #[arg(long)]
    entropy_form: bool,
}

impl EstimatorArgs {
    fn build(&self) -> Result<CapacityEstimator> {
        let mut cfg = match &self.config {
            Some(path) => EstimatorConfig::from_json_file(path)?,
            None => EstimatorConfig::default(),
        };
        if let Some(rule) = self.rule {
            cfg.rule = rule;
        }
        if let Some(prior) = self.prior {
            cfg.prior = prior;
        }
        if let Some(threshold) = self.threshold {
            cfg.threshold = threshold;
        }
        if let Some(max) = self.max_resolution {
            cfg.max_resolution = max;
        }
        if self.entropy_form {
            cfg.formulation = Formulation::Entropy;
        }
        Ok(CapacityEstimator::new(cfg)?)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Estimate {
            foreign,
            self_,
            verbose_result,
            output,
            estimator,
        } => cmd_estimate(&foreign, &self_, verbose_result, output.as_deref(), &estimator),
        Commands::Batch {
            table,
            foreign_subdir,
            self_subdir,
            output,
            threads,
            estimator,
        } => {
            let layout = DirectoryLayout {
                foreign_subdir,
                self_subdir,
            };
            cmd_batch(&table, &layout, &output, threads, &estimator)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_NON_CONVERGENCE),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the search converged.
fn cmd_estimate(
    foreign: &Path,
    self_: &Path,
    verbose_result: bool,
    output: Option<&Path>,
    args: &EstimatorArgs,
) -> Result<bool> {
    let estimator = args.build()?;
    let store = SampleStore::load(foreign, self_).context("loading sample sets")?;
    let est = estimator.estimate(&store)?;
    tracing::info!(
        capacity = est.capacity,
        resolution = est.resolution,
        norm = est.normalization_integral,
        status = est.status.as_str(),
        foreign_mean = store.mean(Class::Foreign).ok(),
        self_mean = store.mean(Class::SelfLigand).ok(),
        "estimate complete"
    );

    let mut text = format!("{}\n", est.capacity);
    if verbose_result {
        text.push_str(&format!("{}\n{}\n", est.resolution, est.normalization_integral));
    }
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("writing {}", path.display()))?,
        None => std::io::stdout().write_all(text.as_bytes())?,
    }

    if !est.converged() {
        eprintln!(
            "warning: normalization integral {:.4} below threshold at {} bins",
            est.normalization_integral, est.resolution
        );
    }
    Ok(est.converged())
}

fn cmd_batch(
    table: &Path,
    layout: &DirectoryLayout,
    output: &Path,
    threads: usize,
    args: &EstimatorArgs,
) -> Result<bool> {
    if threads > 0 {
        // Best-effort; if a global pool already exists, keep going.
        let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
    }
    let estimator = args.build()?;

    tracing::info!(path = %table.display(), "loading batch table");
    let table = BatchTable::read(table)?;
    let records = batch::run_batch(&table, layout, &estimator)?;
    batch::write_report(output, &table, &records)?;
    tracing::info!(rows = records.len(), path = %output.display(), "batch report written");

    let unconverged = records.iter().filter(|r| !r.estimate.converged()).count();
    if unconverged > 0 {
        eprintln!("warning: {unconverged} of {} rows did not converge", records.len());
    }
    Ok(unconverged == 0)
}
