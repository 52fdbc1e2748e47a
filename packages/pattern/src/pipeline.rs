//! The match strategy pipeline.
//!
//! Strategies run in a fixed order and the first one that finds at least as
//! many matches as there are samples wins:
//!
//! 1. [`Strategy::CommonSelector`]: query the common selector, keep elements
//!    similar to *any* sample.
//! 2. [`Strategy::ParentPattern`]: query the parent-relative pattern, same
//!    filter.
//! 3. [`Strategy::AncestorScan`]: every element of the samples' tag inside the
//!    common ancestor, keep those similar to the samples *on average*.
//! 4. [`Strategy::GlobalScan`]: every element of the tag in the document, with
//!    a lowered average threshold and a result cap. Always low confidence.
//!
//! The pipeline is a pure function of the page snapshot, the samples and the
//! config, so re-running it on an unchanged page gives the same result.

use tracing::{debug, info, instrument, warn};

use crate::error::{PatternError, Result};
use crate::fingerprint::FingerprintArena;
use crate::page::{ElementKey, Page};
use crate::synth::{normalize_samples, synthesize, Synthesis};
use crate::types::config::MatchConfig;
use crate::types::matching::{CandidateSelector, Confidence, MatchResult, Strategy};

/// Expands a few samples into a full match set.
#[derive(Debug, Clone, Default)]
pub struct MatchPipeline {
    config: MatchConfig,
}

/// How a strategy compares a candidate with the samples.
#[derive(Debug, Clone, Copy)]
enum Filter {
    /// Highest similarity to any single sample.
    Any,
    /// Mean similarity across all samples.
    Mean,
}

impl MatchPipeline {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Run the pipeline on a page.
    ///
    /// Errors only on unusable samples (fewer than two, or keys the page did
    /// not issue). Samples that share no structure, or a page where every
    /// strategy comes up short, give [`MatchResult::empty`].
    #[instrument(skip_all, fields(samples = samples.len()))]
    pub fn run<P: Page + ?Sized>(&self, page: &P, samples: &[ElementKey]) -> Result<MatchResult> {
        let samples = normalize_samples(page, samples)?;
        let arena = FingerprintArena::build(page, &self.config.reserved_prefix);
        self.run_with_arena(page, &arena, &samples)
    }

    /// Run the pipeline against a prebuilt fingerprint arena.
    pub fn run_with_arena<P: Page + ?Sized>(
        &self,
        page: &P,
        arena: &FingerprintArena,
        samples: &[ElementKey],
    ) -> Result<MatchResult> {
        let samples = normalize_samples(page, samples)?;

        let synthesis = match synthesize(page, arena, &samples, &self.config) {
            Ok(synthesis) => synthesis,
            Err(PatternError::StructuralMismatch) => {
                debug!("samples share no structure");
                return Ok(MatchResult::empty());
            }
            Err(e) => return Err(e),
        };

        for strategy in Strategy::ORDER {
            match self.attempt(page, arena, &synthesis, &samples, strategy) {
                Ok(Some(result)) => {
                    info!(
                        strategy = %strategy,
                        matches = result.matches.len(),
                        confidence = %result.confidence,
                        "pattern matched"
                    );
                    return Ok(result);
                }
                Ok(None) => {
                    debug!(strategy = %strategy, "strategy came up short");
                }
                Err(PatternError::SelectorInvalid { selector, reason }) => {
                    warn!(strategy = %strategy, selector = %selector, reason = %reason, "strategy skipped");
                }
                Err(e) => return Err(e),
            }
        }

        debug!("no strategy matched");
        Ok(MatchResult::empty())
    }

    /// Try a single strategy. `None` means it found fewer matches than
    /// samples.
    pub fn attempt<P: Page + ?Sized>(
        &self,
        page: &P,
        arena: &FingerprintArena,
        synthesis: &Synthesis,
        samples: &[ElementKey],
        strategy: Strategy,
    ) -> Result<Option<MatchResult>> {
        let threshold = self.config.threshold;

        let (query, candidates, filter, threshold) = match strategy {
            Strategy::CommonSelector => {
                let query = synthesis.common_selector.clone();
                let found = page.select(page.root(), &query)?;
                (query, found, Filter::Any, threshold)
            }
            Strategy::ParentPattern => {
                let query = synthesis.parent_pattern.clone();
                let found = page.select(page.root(), &query)?;
                (query, found, Filter::Any, threshold)
            }
            Strategy::AncestorScan => {
                let found = page.select(synthesis.ancestor, &synthesis.tag)?;
                let query = format!("{} {}", synthesis.ancestor_selector, synthesis.tag);
                (query, found, Filter::Mean, threshold)
            }
            Strategy::GlobalScan => {
                let found = page.select(page.root(), &synthesis.tag)?;
                let lowered = threshold * self.config.global_threshold_factor;
                (synthesis.tag.clone(), found, Filter::Mean, lowered)
            }
        };

        let mut scored: Vec<(ElementKey, f64)> = candidates
            .into_iter()
            .map(|key| {
                let score = match filter {
                    Filter::Any => arena.max_similarity(key, samples),
                    Filter::Mean => arena.mean_similarity(key, samples),
                };
                (key, score)
            })
            .filter(|(_, score)| *score >= threshold)
            .collect();

        if strategy == Strategy::GlobalScan {
            self.apply_cap(&mut scored);
        }

        if scored.len() < samples.len() {
            return Ok(None);
        }

        let matches: Vec<ElementKey> = scored.into_iter().map(|(key, _)| key).collect();
        let confidence = match strategy {
            Strategy::GlobalScan => Confidence::Low,
            _ => Confidence::for_counts(matches.len(), samples.len()),
        };

        Ok(Some(MatchResult {
            matches,
            selector: Some(CandidateSelector {
                query,
                strategy,
                confidence,
            }),
            confidence,
        }))
    }

    /// Keep the best-scoring candidates up to the cap, in document order.
    fn apply_cap(&self, scored: &mut Vec<(ElementKey, f64)>) {
        let Some(cap) = self.config.global_result_cap else {
            return;
        };
        if scored.len() <= cap {
            return;
        }

        warn!(found = scored.len(), cap, "global fallback hit its result cap");
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(cap);
        scored.sort_by_key(|(key, _)| *key);
    }
}
