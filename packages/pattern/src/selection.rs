//! What the user has told the tool about a page, kept apart from the page.
//!
//! A [`Selection`] maps element keys to marks. Exclusions are also recorded
//! by [`ElementPath`], so an excluded element stays excluded when refinement
//! finds it again through a different selector.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{PatternError, Result};
use crate::fingerprint::FingerprintArena;
use crate::page::{ElementKey, ElementPath, Page};
use crate::pipeline::MatchPipeline;
use crate::text::text_similarity;
use crate::types::config::{AutoExcludeConfig, MatchConfig};
use crate::types::matching::MatchResult;

/// Status of one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    /// Picked by the user as an example.
    Sample,
    /// Found by the pipeline.
    Matched,
    /// Removed from the match set, by the user or by auto-exclusion.
    Excluded,
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    marks: BTreeMap<ElementKey, Mark>,
    excluded_paths: BTreeSet<ElementPath>,
    /// Re-included by the user; never auto-excluded again.
    pinned: BTreeSet<ElementKey>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, key: ElementKey) -> Option<Mark> {
        self.marks.get(&key).copied()
    }

    /// Mark an element as a sample. A previously excluded element is
    /// reinstated.
    pub fn add_sample<P: Page + ?Sized>(&mut self, page: &P, key: ElementKey) -> Result<()> {
        check(page, key)?;
        if self.mark(key) == Some(Mark::Excluded) {
            self.excluded_paths.remove(&page.path(key));
        }
        self.marks.insert(key, Mark::Sample);
        Ok(())
    }

    /// Unmark a sample. Returns false if `key` was not a sample.
    pub fn remove_sample(&mut self, key: ElementKey) -> bool {
        if self.mark(key) == Some(Mark::Sample) {
            self.marks.remove(&key);
            true
        } else {
            false
        }
    }

    /// Replace the current matches with a pipeline result.
    ///
    /// Samples keep their mark, and excluded elements (by key or by path) are
    /// not re-admitted.
    pub fn apply_matches<P: Page + ?Sized>(&mut self, page: &P, result: &MatchResult) {
        self.marks.retain(|_, mark| *mark != Mark::Matched);
        for key in &result.matches {
            if !page.contains(*key) || self.marks.contains_key(key) {
                continue;
            }
            if self.excluded_paths.contains(&page.path(*key)) {
                continue;
            }
            self.marks.insert(*key, Mark::Matched);
        }
    }

    /// Exclude a match, along with any other match that looks like it.
    ///
    /// Returns every key newly excluded, `key` first. Samples and re-included
    /// elements are never excluded by the cascade.
    #[instrument(skip(self, page, arena, auto))]
    pub fn exclude<P: Page + ?Sized>(
        &mut self,
        page: &P,
        arena: &FingerprintArena,
        key: ElementKey,
        auto: &AutoExcludeConfig,
    ) -> Result<Vec<ElementKey>> {
        check(page, key)?;
        if self.mark(key) == Some(Mark::Excluded) {
            return Ok(Vec::new());
        }

        self.set_excluded(page, key);
        self.pinned.remove(&key);
        let mut newly = vec![key];

        let excluded_text = page.text(key);
        let candidates: Vec<ElementKey> = self
            .marks
            .iter()
            .filter(|(k, mark)| **mark == Mark::Matched && !self.pinned.contains(*k))
            .map(|(k, _)| *k)
            .collect();

        for other in candidates {
            let structural = arena.similarity(key, other);
            let textual = text_similarity(&excluded_text, &page.text(other));
            if auto.should_exclude(structural, textual) {
                debug!(%other, structural, textual, "auto-excluded");
                self.set_excluded(page, other);
                newly.push(other);
            }
        }

        Ok(newly)
    }

    /// Put one excluded element back into the match set. Never cascades.
    ///
    /// Returns false if `key` was not excluded.
    pub fn include<P: Page + ?Sized>(&mut self, page: &P, key: ElementKey) -> Result<bool> {
        check(page, key)?;
        if self.mark(key) != Some(Mark::Excluded) {
            return Ok(false);
        }
        self.excluded_paths.remove(&page.path(key));
        self.marks.insert(key, Mark::Matched);
        self.pinned.insert(key);
        Ok(true)
    }

    pub fn samples(&self) -> Vec<ElementKey> {
        self.keys_with(|m| m == Mark::Sample)
    }

    /// Samples and matches that are not excluded, in document order.
    pub fn active_matches(&self) -> Vec<ElementKey> {
        self.keys_with(|m| m != Mark::Excluded)
    }

    pub fn excluded(&self) -> Vec<ElementKey> {
        self.keys_with(|m| m == Mark::Excluded)
    }

    pub fn excluded_paths(&self) -> &BTreeSet<ElementPath> {
        &self.excluded_paths
    }

    pub fn is_pinned(&self, key: ElementKey) -> bool {
        self.pinned.contains(&key)
    }

    /// Whether `key` is excluded directly or sits at an excluded path.
    pub fn is_excluded<P: Page + ?Sized>(&self, page: &P, key: ElementKey) -> bool {
        self.mark(key) == Some(Mark::Excluded)
            || (page.contains(key) && self.excluded_paths.contains(&page.path(key)))
    }

    fn set_excluded<P: Page + ?Sized>(&mut self, page: &P, key: ElementKey) {
        self.marks.insert(key, Mark::Excluded);
        self.excluded_paths.insert(page.path(key));
    }

    fn keys_with(&self, pred: impl Fn(Mark) -> bool) -> Vec<ElementKey> {
        self.marks
            .iter()
            .filter(|(_, mark)| pred(**mark))
            .map(|(key, _)| *key)
            .collect()
    }
}

fn check<P: Page + ?Sized>(page: &P, key: ElementKey) -> Result<()> {
    if page.contains(key) {
        Ok(())
    } else {
        Err(PatternError::UnknownElement { key })
    }
}

/// Re-run the pipeline on the non-excluded matches at the refinement
/// threshold.
///
/// Anything excluded, by key or by path, is filtered out of the result no
/// matter how similar it is to the remaining matches.
#[instrument(skip_all)]
pub fn refine<P: Page + ?Sized>(page: &P, selection: &Selection, config: &MatchConfig) -> Result<MatchResult> {
    let active = selection.active_matches();
    let pipeline = MatchPipeline::new(config.clone().with_threshold(config.refine_threshold));

    let mut result = pipeline.run(page, &active)?;
    let before = result.matches.len();
    result.matches.retain(|key| !selection.is_excluded(page, *key));

    debug!(
        samples = active.len(),
        matches = result.matches.len(),
        dropped = before - result.matches.len(),
        "refined"
    );
    Ok(result)
}
