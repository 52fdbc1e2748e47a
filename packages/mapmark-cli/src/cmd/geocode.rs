//! `mapmark geocode`: resolve addresses, asking the operator when needed.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use geocode::{
    BatchOutcome, GeocodeCache, GeocodeOrchestrator, GeocodeProvider, KeyValueStore, Phase, ProviderKind,
    QueryItem, SqliteStore,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;
use crate::prompt::{self, Decision};

/// Options shared by `geocode` and `run`.
#[derive(Debug, Clone, Default)]
pub struct GeocodeOptions {
    pub provider: Option<ProviderKind>,
    pub hint: Option<String>,
    pub out: Option<PathBuf>,
    /// Skip every item that needs a decision instead of prompting.
    pub no_input: bool,
}

/// Non-empty, trimmed lines of an address file.
pub fn read_addresses(path: &Path) -> Result<Vec<String>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read addresses from {}", path.display()))?;
    Ok(parse_addresses(&contents))
}

fn parse_addresses(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn run(config: &Config, input: &Path, options: &GeocodeOptions) -> Result<BatchOutcome> {
    let addresses = read_addresses(input)?;
    geocode_addresses(config, addresses, options).await
}

/// Geocode `addresses` against the configured provider and cache, then write
/// the map view.
pub async fn geocode_addresses(
    config: &Config,
    addresses: Vec<String>,
    options: &GeocodeOptions,
) -> Result<BatchOutcome> {
    if addresses.is_empty() {
        bail!("No addresses to geocode");
    }

    let kind = options.provider.unwrap_or(config.provider);
    if kind == ProviderKind::Google && config.google_api_key.is_none() {
        eprintln!(
            "{}",
            "GOOGLE_GEOCODING_API_KEY is not set; Google lookups will fail".bright_yellow()
        );
    }

    let provider = config
        .provider_config(kind)
        .build()
        .context("Failed to set up the geocoding provider")?;
    let store = SqliteStore::new(&config.cache_url)
        .await
        .with_context(|| format!("Failed to open cache at {}", config.cache_url))?;
    let mut orch = GeocodeOrchestrator::new(provider, GeocodeCache::new(store));

    let hint = options.hint.as_deref().or(config.area_hint.as_deref());
    let queue = QueryItem::batch(addresses, hint);
    eprintln!(
        "{} {} addresses with {}",
        "Geocoding".bright_blue().bold(),
        queue.len(),
        kind
    );

    let outcome = drive(&mut orch, queue, options.no_input).await?;
    report(&outcome);
    write_map_view(&outcome, options.out.as_deref())?;
    Ok(outcome)
}

/// Run the batch to completion, prompting at every suspension. A cancelled
/// batch yields what was resolved before the cancel.
async fn drive<G, S>(
    orch: &mut GeocodeOrchestrator<G, S>,
    queue: Vec<QueryItem>,
    no_input: bool,
) -> Result<BatchOutcome>
where
    G: GeocodeProvider,
    S: KeyValueStore,
{
    let mut phase = orch.start(queue).await?;

    loop {
        let decision = match (phase, orch.pending()) {
            (Phase::Done, _) => break,
            (_, Some(_)) if no_input => Decision::Skip,
            (Phase::SuspendedOnDisambiguation, Some(pending)) => prompt::disambiguate(pending)?,
            (Phase::SuspendedOnNotFound, Some(pending)) => prompt::not_found(pending)?,
            (other, _) => bail!("Geocoding stopped unexpectedly while {}", other),
        };

        phase = match decision {
            Decision::Choose(index) => orch.choose(index).await?,
            Decision::Coordinates { lat, lng } => orch.provide_coordinates(lat, lng).await?,
            Decision::Skip => orch.skip().await?,
            Decision::Cancel => {
                orch.cancel();
                let state = orch.state();
                info!(resolved = state.resolved.len(), "batch cancelled by operator");
                return Ok(BatchOutcome::new(state.resolved.clone(), state.errors.clone()));
            }
        };
    }

    orch.outcome().context("Geocoding finished without an outcome")
}

fn report(outcome: &BatchOutcome) {
    eprintln!();
    eprintln!(
        "{} {} of {} addresses",
        "Placed".bright_green().bold(),
        outcome.resolved.len(),
        outcome.total()
    );
    if let Some(summary) = outcome.error_summary() {
        eprintln!("{}", summary.bright_yellow());
    }
}

fn write_map_view(outcome: &BatchOutcome, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(&outcome.map_view()).context("Failed to serialize map view")?;
    match out {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} {}", "Wrote".bright_green(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
