//! `mapmark match`: learn a pattern from sample elements.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use pattern::{
    location_strings, refine, AutoExcludeConfig, ElementKey, FingerprintArena, HtmlPage, HtmlSnapshot, Mark,
    MatchConfig, MatchPipeline, MatchResult, Selection,
};
use std::fs;
use std::path::Path;
use tracing::debug;

/// A learned pattern and the text it picked out.
#[derive(Debug)]
pub struct Learned {
    pub result: MatchResult,
    /// Final match set after exclusions, in document order.
    pub matches: Vec<ElementKey>,
    /// Elements excluded, by hand or by the cascade.
    pub excluded: Vec<ElementKey>,
    pub texts: Vec<String>,
}

pub fn load_page(path: &Path) -> Result<HtmlPage> {
    let html = fs::read_to_string(path).with_context(|| format!("Failed to read page {}", path.display()))?;
    Ok(HtmlPage::parse(&html))
}

/// First element matched by each sample selector.
pub fn resolve_samples(snapshot: &HtmlSnapshot<'_>, selectors: &[String]) -> Result<Vec<ElementKey>> {
    selectors
        .iter()
        .map(|css| {
            let keys = snapshot
                .find(css)
                .with_context(|| format!("Invalid sample selector '{}'", css))?;
            keys.first()
                .copied()
                .with_context(|| format!("Sample selector '{}' matched nothing", css))
        })
        .collect()
}

/// Run the pipeline, then apply exclusions and refine.
pub fn learn(
    snapshot: &HtmlSnapshot<'_>,
    samples: &[ElementKey],
    excludes: &[String],
    config: &MatchConfig,
) -> Result<Learned> {
    let result = MatchPipeline::new(config.clone())
        .run(snapshot, samples)
        .context("Failed to learn a pattern from the samples")?;

    let mut selection = Selection::new();
    for key in samples {
        selection.add_sample(snapshot, *key)?;
    }
    selection.apply_matches(snapshot, &result);

    if !excludes.is_empty() {
        let arena = FingerprintArena::build(snapshot, &config.reserved_prefix);
        let auto = AutoExcludeConfig::default();
        for css in excludes {
            let keys = snapshot
                .find(css)
                .with_context(|| format!("Invalid exclude selector '{}'", css))?;
            for key in keys {
                if selection.mark(key) == Some(Mark::Matched) {
                    let newly = selection.exclude(snapshot, &arena, key, &auto)?;
                    debug!(selector = %css, excluded = newly.len(), "excluded");
                }
            }
        }

        if selection.active_matches().len() >= 2 {
            let refined = refine(snapshot, &selection, config).context("Failed to refine the match set")?;
            if !refined.is_empty() {
                selection.apply_matches(snapshot, &refined);
            }
        }
    }

    let matches = selection.active_matches();
    let texts = location_strings(snapshot, &matches);
    Ok(Learned {
        result,
        excluded: selection.excluded(),
        matches,
        texts,
    })
}

/// Human-readable summary of a learned pattern.
pub fn describe(learned: &Learned) -> String {
    let mut lines = Vec::new();
    match &learned.result.selector {
        Some(selector) => {
            lines.push(format!("{} {}", "Selector:".bold(), selector.query.bright_cyan()));
            lines.push(format!("{} {}", "Strategy:".bold(), selector.strategy));
        }
        None => lines.push("No pattern found".bright_red().to_string()),
    }
    let confidence = learned.result.confidence.to_string();
    lines.push(format!("{} {}", "Confidence:".bold(), confidence.bright_yellow()));
    if !learned.excluded.is_empty() {
        lines.push(format!("{} {}", "Excluded:".bold(), learned.excluded.len()));
    }
    lines.push(format!(
        "{} {} elements, {} distinct texts",
        "Matched:".bold(),
        learned.matches.len(),
        learned.texts.len()
    ));
    for (i, text) in learned.texts.iter().enumerate() {
        lines.push(format!("  {:>3}. {}", i + 1, text));
    }
    lines.join("\n")
}

/// Load a saved page and learn from CSS-selected samples.
pub fn learn_from_file(
    page: &Path,
    samples: &[String],
    excludes: &[String],
    threshold: Option<f64>,
) -> Result<Learned> {
    if samples.len() < 2 {
        bail!("Give at least two --sample selectors");
    }

    let mut config = MatchConfig::default();
    if let Some(threshold) = threshold {
        config = config.with_threshold(threshold);
    }

    let page = load_page(page)?;
    let snapshot = page.snapshot();
    let keys = resolve_samples(&snapshot, samples)?;
    learn(&snapshot, &keys, excludes, &config)
}

pub fn run(page: &Path, samples: &[String], excludes: &[String], threshold: Option<f64>) -> Result<Learned> {
    let learned = learn_from_file(page, samples, excludes, threshold)?;
    println!("{}", describe(&learned));
    Ok(learned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pattern::Confidence;

    const PAGE: &str = r#"
        <html><body>
          <div class="nav">Home</div>
          <div id="results">
            <div class="listing"><span class="addr">123 Main St, Springfield</span></div>
            <div class="listing"><span class="addr">456 Oak Ave, Springfield</span></div>
            <div class="listing"><span class="addr">789 Pine Rd, Springfield</span></div>
            <div class="listing"><span class="addr">12 Elm St, Springfield</span></div>
            <div class="listing"><span class="addr">34 Birch Ln, Springfield</span></div>
          </div>
        </body></html>
    "#;

    fn selectors(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_learns_listing_pattern() {
        let page = HtmlPage::parse(PAGE);
        let snapshot = page.snapshot();
        let samples = resolve_samples(
            &snapshot,
            &selectors(&[".listing:nth-child(1)", ".listing:nth-child(2)"]),
        )
        .unwrap();

        let learned = learn(&snapshot, &samples, &[], &MatchConfig::default()).unwrap();
        assert_eq!(learned.result.selector.as_ref().unwrap().query, "div.listing");
        assert_eq!(learned.result.confidence, Confidence::High);
        assert_eq!(learned.texts.len(), 5);
        assert_eq!(learned.texts[0], "123 Main St, Springfield");
    }

    #[test]
    fn test_excluded_listing_is_dropped() {
        let page = HtmlPage::parse(PAGE);
        let snapshot = page.snapshot();
        let samples = resolve_samples(
            &snapshot,
            &selectors(&[".listing:nth-child(1)", ".listing:nth-child(2)"]),
        )
        .unwrap();

        let learned = learn(
            &snapshot,
            &samples,
            &selectors(&[".listing:nth-child(5)"]),
            &MatchConfig::default(),
        )
        .unwrap();
        assert!(!learned.texts.contains(&"34 Birch Ln, Springfield".to_string()));
        assert!(learned.texts.contains(&"123 Main St, Springfield".to_string()));
        assert!(!learned.excluded.is_empty());
    }

    #[test]
    fn test_sample_selector_must_match() {
        let page = HtmlPage::parse(PAGE);
        let snapshot = page.snapshot();
        assert!(resolve_samples(&snapshot, &selectors(&[".missing"])).is_err());
        assert!(resolve_samples(&snapshot, &selectors(&["div[["])).is_err());
    }
}
