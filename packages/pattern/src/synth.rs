//! Selector synthesis.
//!
//! Generalizes a handful of sample elements into structural CSS queries: a
//! common selector (shared tag and classes) and a parent-relative pattern
//! rooted at the samples' nearest common ancestor.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{PatternError, Result};
use crate::fingerprint::FingerprintArena;
use crate::page::{ElementKey, Page};
use crate::types::config::MatchConfig;

/// Class names this short are usually utility classes.
const SHORT_CLASS_LEN: usize = 2;

/// Tags that are unique in a document and need no qualifier.
const SINGLETON_TAGS: &[&str] = &["html", "body"];

/// Selectors derived from one sample set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    /// Tag shared by every sample.
    pub tag: String,

    /// Classes shared by every sample, most specific first.
    pub shared_classes: Vec<String>,

    /// `tag.class1.class2...`
    pub common_selector: String,

    /// Nearest element containing every sample.
    pub ancestor: ElementKey,

    /// Selector describing [`Synthesis::ancestor`].
    pub ancestor_selector: String,

    /// Ancestor selector followed by the path the samples share below it.
    pub parent_pattern: String,
}

/// Deduplicate samples and check the page issued them.
pub fn normalize_samples<P: Page + ?Sized>(page: &P, samples: &[ElementKey]) -> Result<Vec<ElementKey>> {
    if let Some(key) = samples.iter().find(|k| !page.contains(**k)) {
        return Err(PatternError::UnknownElement { key: *key });
    }

    let unique: Vec<ElementKey> = samples.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    if unique.len() < 2 {
        return Err(PatternError::NotEnoughSamples { count: unique.len() });
    }
    Ok(unique)
}

/// Derive the candidate selectors for `samples`.
///
/// Fails with [`PatternError::StructuralMismatch`] when the samples disagree on
/// tag or share no ancestor.
pub fn synthesize<P: Page + ?Sized>(
    page: &P,
    arena: &FingerprintArena,
    samples: &[ElementKey],
    config: &MatchConfig,
) -> Result<Synthesis> {
    let samples = normalize_samples(page, samples)?;

    let tag = page.tag(samples[0]).to_string();
    if samples.iter().any(|s| page.tag(*s) != tag) {
        return Err(PatternError::StructuralMismatch);
    }

    let shared_classes = shared_classes(arena, &samples, config.max_common_classes);
    let common_selector = compound(&tag, &shared_classes);

    let ancestor = common_ancestor(page, &samples).ok_or(PatternError::StructuralMismatch)?;
    let ancestor_selector = describe(page, arena, ancestor, config.max_common_classes);
    let parent_pattern = parent_pattern(page, arena, ancestor, &ancestor_selector, &samples, &common_selector, config);

    debug!(
        common_selector = %common_selector,
        parent_pattern = %parent_pattern,
        ancestor = %ancestor,
        "synthesized selectors"
    );

    Ok(Synthesis {
        tag,
        shared_classes,
        common_selector,
        ancestor,
        ancestor_selector,
        parent_pattern,
    })
}

/// Classes every element carries, ranked and truncated to `limit`.
fn shared_classes(arena: &FingerprintArena, keys: &[ElementKey], limit: usize) -> Vec<String> {
    let mut sets = keys.iter().filter_map(|k| arena.get(*k)).map(|fp| &fp.classes);
    let Some(first) = sets.next() else {
        return Vec::new();
    };

    let mut common: BTreeSet<String> = first.clone();
    for set in sets {
        common.retain(|c| set.contains(c));
    }

    let mut ranked: Vec<String> = common.into_iter().collect();
    ranked.sort_by(|a, b| rank_classes(a, b));
    ranked.truncate(limit);
    ranked
}

/// Specific class names first: short names last, then longer before
/// shorter, then alphabetical.
fn rank_classes(a: &str, b: &str) -> Ordering {
    let a_short = a.chars().count() <= SHORT_CLASS_LEN;
    let b_short = b.chars().count() <= SHORT_CLASS_LEN;
    a_short
        .cmp(&b_short)
        .then_with(|| b.chars().count().cmp(&a.chars().count()))
        .then_with(|| a.cmp(b))
}

fn compound(tag: &str, classes: &[String]) -> String {
    let mut selector = tag.to_string();
    for class in classes {
        selector.push('.');
        selector.push_str(&css_escape(class));
    }
    selector
}

/// Nearest element that strictly contains every sample.
fn common_ancestor<P: Page + ?Sized>(page: &P, samples: &[ElementKey]) -> Option<ElementKey> {
    let (first, rest) = samples.split_first()?;
    page.ancestors(*first)
        .into_iter()
        .find(|candidate| rest.iter().all(|s| page.is_ancestor(*candidate, *s)))
}

/// Selector for a single element: its id when stable, else tag and classes.
fn describe<P: Page + ?Sized>(
    page: &P,
    arena: &FingerprintArena,
    key: ElementKey,
    max_classes: usize,
) -> String {
    let tag = page.tag(key);
    if SINGLETON_TAGS.contains(&tag) {
        return tag.to_string();
    }

    if arena.get(key).is_some_and(|fp| fp.has_stable_id) {
        if let Some(id) = page.attribute(key, "id") {
            return format!("#{}", css_escape(id));
        }
    }

    compound(tag, &shared_classes(arena, &[key], max_classes))
}

/// Walk from the ancestor toward the samples, one depth at a time, while every
/// sample's chain agrees on tag.
fn parent_pattern<P: Page + ?Sized>(
    page: &P,
    arena: &FingerprintArena,
    ancestor: ElementKey,
    ancestor_selector: &str,
    samples: &[ElementKey],
    common_selector: &str,
    config: &MatchConfig,
) -> String {
    let chains: Vec<Vec<ElementKey>> = samples
        .iter()
        .map(|s| chain_below(page, ancestor, *s))
        .collect();

    let shortest = chains.iter().map(Vec::len).min().unwrap_or(0);
    let mut segments = Vec::new();
    let mut complete = true;

    for depth in 0..shortest {
        let level: Vec<ElementKey> = chains.iter().map(|c| c[depth]).collect();
        let tag = page.tag(level[0]);
        if level.iter().any(|k| page.tag(*k) != tag) {
            complete = false;
            break;
        }
        segments.push(compound(tag, &shared_classes(arena, &level, config.max_common_classes)));
    }

    if chains.iter().any(|c| c.len() != shortest) {
        complete = false;
    }

    let mut pattern = ancestor_selector.to_string();
    for segment in &segments {
        pattern.push_str(" > ");
        pattern.push_str(segment);
    }
    if !complete || segments.is_empty() {
        pattern.push(' ');
        pattern.push_str(common_selector);
    }
    pattern
}

/// Elements from just below `ancestor` down to `key`, inclusive.
fn chain_below<P: Page + ?Sized>(page: &P, ancestor: ElementKey, key: ElementKey) -> Vec<ElementKey> {
    let mut chain = vec![key];
    for parent in page.ancestors(key) {
        if parent == ancestor {
            break;
        }
        chain.push(parent);
    }
    chain.reverse();
    chain
}

/// Escape an identifier for use in a CSS class or id selector.
pub fn css_escape(ident: &str) -> String {
    if ident == "-" {
        return "\\-".to_string();
    }

    let mut out = String::with_capacity(ident.len());
    for (i, c) in ident.chars().enumerate() {
        let leading_digit = c.is_ascii_digit() && (i == 0 || (i == 1 && ident.starts_with('-')));
        if leading_digit {
            out.push_str(&format!("\\{:x} ", c as u32));
        } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}
