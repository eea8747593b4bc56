//! down-arrow CLI: compute and inspect down-arrow Ramsey ideals of host graphs.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use down_arrow::report::render;
use down_arrow::{ColoringStrategy, FsCache, Pipeline, PipelineConfig};

#[derive(Parser)]
#[command(name = "down-arrow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report errors; also hides progress bars
    #[arg(short, long)]
    quiet: bool,

    /// Configuration file (TOML)
    #[arg(short, long, env = "DOWN_ARROW_CONFIG")]
    config: Option<PathBuf>,

    /// Artifact cache directory override
    #[arg(long, env = "DOWN_ARROW_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Worker count override
    #[arg(short, long, env = "DOWN_ARROW_WORKERS")]
    workers: Option<usize>,

    /// Coloring generation strategy
    #[arg(long, value_enum)]
    strategy: Option<ColoringStrategy>,

    /// Checkpoint each aggregation worker after this many colorings
    #[arg(long)]
    checkpoint_every: Option<usize>,

    /// Disable progress bars
    #[arg(long)]
    no_progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run (or resume) the pipeline for each host, e.g. K_4, K_2,3, C_5, P_4, Zim
    Run {
        #[arg(required = true)]
        hosts: Vec<String>,
    },

    /// Print the summary of a completed host
    Show { host: String },

    /// List hosts with a completed run
    List,

    /// Delete every cached artifact of a host
    Clear { host: String },
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::load_or_default(self.config.as_deref())
            .context("failed to load configuration")?;
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(strategy) = self.strategy {
            config.coloring_strategy = strategy;
        }
        if self.checkpoint_every.is_some() {
            config.checkpoint_every = self.checkpoint_every;
        }
        if self.no_progress || self.quiet {
            config.progress = false;
        }
        Ok(config)
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match verbose {
        0 if quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("down_arrow={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = cli.pipeline_config()?;
    debug!(?config, "resolved configuration");
    let cache = Arc::new(FsCache::new(config.cache_dir.clone()));
    let pipeline = Pipeline::new(config, cache).context("failed to start worker pool")?;

    match cli.command {
        Commands::Run { hosts } => {
            let outcomes = pipeline.run_many(&hosts).context("pipeline run failed")?;
            for outcome in outcomes {
                if outcome.fully_cached() {
                    debug!(host = %outcome.host, "every phase came from the cache");
                }
                if let Some(summary) = pipeline.summary(&outcome.host)? {
                    print!("{}", render(&summary));
                }
            }
        }
        Commands::Show { host } => match pipeline.summary(&host)? {
            Some(summary) => print!("{}", render(&summary)),
            None => bail!("no completed run for host {host}"),
        },
        Commands::List => {
            for host in pipeline.completed_hosts()? {
                println!("{host}");
            }
        }
        Commands::Clear { host } => {
            pipeline
                .clear(&host)
                .with_context(|| format!("failed to clear {host}"))?;
        }
    }
    Ok(())
}
