//! `mapmark run`: learn a pattern, then geocode what it matched.

use anyhow::{bail, Result};
use geocode::BatchOutcome;
use std::path::Path;

use super::geocode::{geocode_addresses, GeocodeOptions};
use super::matching;
use crate::config::Config;

pub async fn run(
    config: &Config,
    page: &Path,
    samples: &[String],
    excludes: &[String],
    threshold: Option<f64>,
    options: &GeocodeOptions,
) -> Result<BatchOutcome> {
    let learned = matching::learn_from_file(page, samples, excludes, threshold)?;
    // stdout is reserved for the map view
    eprintln!("{}", matching::describe(&learned));

    if learned.texts.is_empty() {
        bail!("The pattern matched no text to geocode");
    }
    geocode_addresses(config, learned.texts, options).await
}
