//! mapmark: pick out addresses from a saved web page and put them on a map.

mod cmd;
mod config;
mod prompt;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geocode::ProviderKind;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cmd::geocode::GeocodeOptions;
use crate::config::Config;

#[derive(Parser)]
#[command(name = "mapmark")]
#[command(about = "Learn address patterns from web pages and geocode them")]
#[command(version)]
struct Cli {
    /// Log pattern and geocoding progress
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learn a pattern from sample elements and list what it matches
    Match {
        /// Saved HTML page
        #[arg(long)]
        page: PathBuf,

        /// CSS selector for one sample element (give at least two)
        #[arg(long = "sample", required = true)]
        samples: Vec<String>,

        /// Similarity threshold for matching
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Geocode one address per line and write the map view
    Geocode {
        /// File with one address per line
        #[arg(long)]
        input: PathBuf,

        #[command(flatten)]
        geocode: GeocodeArgs,
    },

    /// Learn a pattern, exclude unwanted matches, then geocode the rest
    Run {
        /// Saved HTML page
        #[arg(long)]
        page: PathBuf,

        /// CSS selector for one sample element (give at least two)
        #[arg(long = "sample", required = true)]
        samples: Vec<String>,

        /// CSS selector for matches to exclude; similar matches go too
        #[arg(long = "exclude")]
        excludes: Vec<String>,

        /// Similarity threshold for matching
        #[arg(long)]
        threshold: Option<f64>,

        #[command(flatten)]
        geocode: GeocodeArgs,
    },

    /// Manage the geocode cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(clap::Args)]
struct GeocodeArgs {
    /// Area appended to each query, e.g. "Springfield, IL"
    #[arg(long)]
    hint: Option<String>,

    /// Geocoding provider (nominatim or google)
    #[arg(long)]
    provider: Option<ProviderKind>,

    /// Write the map view here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,

    /// Skip ambiguous and unknown addresses instead of asking
    #[arg(long)]
    no_input: bool,
}

impl From<GeocodeArgs> for GeocodeOptions {
    fn from(args: GeocodeArgs) -> Self {
        Self {
            provider: args.provider,
            hint: args.hint,
            out: args.out,
            no_input: args.no_input,
        }
    }
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Remove cached results
    Clear {
        /// Only this provider's entries
        #[arg(long)]
        provider: Option<ProviderKind>,
    },

    /// Count cached results
    Count,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout carries command output
    let default_filter = if cli.verbose {
        "info,pattern=debug,geocode=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Match {
            page,
            samples,
            threshold,
        } => {
            cmd::matching::run(&page, &samples, &[], threshold)?;
        }
        Commands::Geocode { input, geocode } => {
            let config = Config::from_env().context("Failed to load configuration")?;
            cmd::geocode::run(&config, &input, &geocode.into()).await?;
        }
        Commands::Run {
            page,
            samples,
            excludes,
            threshold,
            geocode,
        } => {
            let config = Config::from_env().context("Failed to load configuration")?;
            cmd::run::run(&config, &page, &samples, &excludes, threshold, &geocode.into()).await?;
        }
        Commands::Cache { command } => {
            let config = Config::from_env().context("Failed to load configuration")?;
            match command {
                CacheCommands::Clear { provider } => {
                    cmd::cache::clear(&config, provider).await?;
                }
                CacheCommands::Count => {
                    cmd::cache::count(&config).await?;
                }
            }
        }
    }

    Ok(())
}
