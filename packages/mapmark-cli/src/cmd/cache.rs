//! `mapmark cache`: inspect and clear the geocode cache.

use anyhow::{Context, Result};
use colored::Colorize;
use geocode::{GeocodeCache, ProviderKind, SqliteStore};

use crate::config::Config;

async fn open(config: &Config) -> Result<GeocodeCache<SqliteStore>> {
    let store = SqliteStore::new(&config.cache_url)
        .await
        .with_context(|| format!("Failed to open cache at {}", config.cache_url))?;
    Ok(GeocodeCache::new(store))
}

pub async fn clear(config: &Config, provider: Option<ProviderKind>) -> Result<usize> {
    let cache = open(config).await?;
    let removed = cache.clear(provider).await.context("Failed to clear cache")?;

    let scope = provider.map_or_else(|| "all providers".to_string(), |p| p.to_string());
    println!(
        "{} {} cached entries ({})",
        "Removed".bright_green().bold(),
        removed,
        scope
    );
    Ok(removed)
}

pub async fn count(config: &Config) -> Result<usize> {
    let cache = open(config).await?;
    let entries = cache.len().await.context("Failed to read cache")?;
    println!("{} cached entries in {}", entries, config.cache_url);
    Ok(entries)
}
