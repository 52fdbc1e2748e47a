//! Structural fingerprints and the similarity score between them.
//!
//! A fingerprint is a derived summary of one element, used for comparison and
//! never for identity. Fingerprints are built once per page snapshot into a
//! [`FingerprintArena`] indexed by [`ElementKey`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::page::{ElementKey, Page};

/// Tag equality: a hard gate, and always in play.
const TAG_WEIGHT: f64 = 2.0;
/// Class-set overlap, in play only when either element has classes.
const CLASS_WEIGHT: f64 = 2.0;
/// Child-count closeness.
const CHILD_WEIGHT: f64 = 1.0;
/// Text-length closeness (binary).
const TEXT_WEIGHT: f64 = 0.5;
/// Attribute-name overlap, in play only when either element has attributes.
const ATTRIBUTE_WEIGHT: f64 = 1.0;
/// Relative text-length difference below which lengths count as close.
const TEXT_LENGTH_TOLERANCE: f64 = 0.5;
/// Runs of this many digits mark an id as generated.
const GENERATED_ID_DIGITS: usize = 3;

/// Structural signature of a single element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementFingerprint {
    pub tag: String,
    pub classes: BTreeSet<String>,
    pub has_stable_id: bool,
    pub child_count: usize,
    /// Length in characters of the element's normalized text.
    pub text_length: usize,
    pub attribute_names: BTreeSet<String>,
}

impl ElementFingerprint {
    /// Fingerprint one element, ignoring anything in the tool's reserved
    /// namespace (`<prefix>*` classes, ids and attributes, and
    /// `data-<prefix>*` attributes).
    pub fn of<P: Page + ?Sized>(page: &P, key: ElementKey, reserved_prefix: &str) -> Self {
        let reserved = Reserved::new(reserved_prefix);

        let classes: BTreeSet<String> = page
            .classes(key)
            .into_iter()
            .filter(|c| !reserved.covers(c))
            .map(str::to_string)
            .collect();

        // A class or id attribute holding only reserved values counts as absent.
        let attribute_names = page
            .attributes(key)
            .into_iter()
            .filter(|(name, value)| match *name {
                "class" => !classes.is_empty(),
                "id" => !reserved.covers(value.trim()),
                name => !reserved.covers(name),
            })
            .map(|(name, _)| name.to_string())
            .collect();

        let has_stable_id = page
            .attribute(key, "id")
            .is_some_and(|id| is_stable_id(id, &reserved));

        Self {
            tag: page.tag(key).to_string(),
            classes,
            has_stable_id,
            child_count: page.children(key).len(),
            text_length: page.text(key).chars().count(),
            attribute_names,
        }
    }
}

struct Reserved {
    bare: String,
    data: String,
}

impl Reserved {
    fn new(prefix: &str) -> Self {
        Self {
            bare: prefix.to_string(),
            data: format!("data-{}", prefix),
        }
    }

    fn covers(&self, name: &str) -> bool {
        !self.bare.is_empty() && (name.starts_with(&self.bare) || name.starts_with(&self.data))
    }
}

/// Whether an id looks hand-written rather than generated.
fn is_stable_id(id: &str, reserved: &Reserved) -> bool {
    if id.trim().is_empty() || reserved.covers(id) || id.contains(':') {
        return false;
    }

    let mut run = 0;
    for c in id.chars() {
        if c.is_ascii_digit() {
            run += 1;
            if run >= GENERATED_ID_DIGITS {
                return false;
            }
        } else {
            run = 0;
        }
    }
    true
}

/// Similarity of two fingerprints in `[0, 1]`.
///
/// Different tags score exactly 0. Otherwise the score is the weighted mean of
/// the factors in play: class overlap, child-count closeness, text-length
/// closeness and attribute-name overlap, plus the tag match itself. Overlap
/// factors whose union is empty drop out of both numerator and denominator.
///
/// Every factor is symmetric and the summation order is fixed, so
/// `similarity(a, b) == similarity(b, a)` holds exactly.
pub fn similarity(a: &ElementFingerprint, b: &ElementFingerprint) -> f64 {
    if a.tag != b.tag {
        return 0.0;
    }

    let mut score = TAG_WEIGHT;
    let mut total = TAG_WEIGHT;

    if let Some(overlap) = overlap_ratio(&a.classes, &b.classes) {
        score += CLASS_WEIGHT * overlap;
        total += CLASS_WEIGHT;
    }

    let max_children = a.child_count.max(b.child_count).max(1) as f64;
    let child_closeness = 1.0 - a.child_count.abs_diff(b.child_count) as f64 / max_children;
    score += CHILD_WEIGHT * child_closeness;
    total += CHILD_WEIGHT;

    if text_lengths_close(a.text_length, b.text_length) {
        score += TEXT_WEIGHT;
    }
    total += TEXT_WEIGHT;

    if let Some(overlap) = overlap_ratio(&a.attribute_names, &b.attribute_names) {
        score += ATTRIBUTE_WEIGHT * overlap;
        total += ATTRIBUTE_WEIGHT;
    }

    score / total
}

/// `|a ∩ b| / |a ∪ b|`, or `None` when the union is empty.
fn overlap_ratio(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Option<f64> {
    let union = a.union(b).count();
    if union == 0 {
        return None;
    }
    let common = a.intersection(b).count();
    Some(common as f64 / union as f64)
}

fn text_lengths_close(a: usize, b: usize) -> bool {
    let max = a.max(b);
    if max == 0 {
        return true;
    }
    (a.abs_diff(b) as f64 / max as f64) < TEXT_LENGTH_TOLERANCE
}

/// Fingerprints for every element of one page snapshot.
///
/// Built eagerly and never updated: a changed page needs a new snapshot and a
/// new arena.
#[derive(Debug, Clone)]
pub struct FingerprintArena {
    prints: Vec<ElementFingerprint>,
}

impl FingerprintArena {
    pub fn build<P: Page + ?Sized>(page: &P, reserved_prefix: &str) -> Self {
        let prints = (0..page.len())
            .map(|i| ElementFingerprint::of(page, ElementKey(i), reserved_prefix))
            .collect();
        Self { prints }
    }

    pub fn get(&self, key: ElementKey) -> Option<&ElementFingerprint> {
        self.prints.get(key.0)
    }

    pub fn len(&self) -> usize {
        self.prints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prints.is_empty()
    }

    /// Similarity of two elements; 0 if either key is unknown.
    pub fn similarity(&self, a: ElementKey, b: ElementKey) -> f64 {
        match (self.get(a), self.get(b)) {
            (Some(a), Some(b)) => similarity(a, b),
            _ => 0.0,
        }
    }

    /// Highest similarity of `key` to any of `samples`.
    pub fn max_similarity(&self, key: ElementKey, samples: &[ElementKey]) -> f64 {
        samples
            .iter()
            .map(|s| self.similarity(key, *s))
            .fold(0.0, f64::max)
    }

    /// Mean similarity of `key` across all `samples`.
    pub fn mean_similarity(&self, key: ElementKey, samples: &[ElementKey]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = samples.iter().map(|s| self.similarity(key, *s)).sum();
        sum / samples.len() as f64
    }
}
