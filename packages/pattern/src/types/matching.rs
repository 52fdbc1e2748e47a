//! Match results and the selectors that produced them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::page::ElementKey;

/// The matching strategies, in the order the pipeline tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Shared tag and classes queried across the page.
    CommonSelector,
    /// Path from the samples' nearest common ancestor down to the samples.
    ParentPattern,
    /// Every element of the samples' tag under the common ancestor.
    AncestorScan,
    /// Every element of the samples' tag in the document.
    GlobalScan,
}

impl Strategy {
    pub const ORDER: [Strategy; 4] = [
        Strategy::CommonSelector,
        Strategy::ParentPattern,
        Strategy::AncestorScan,
        Strategy::GlobalScan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CommonSelector => "common_selector",
            Strategy::ParentPattern => "parent_pattern",
            Strategy::AncestorScan => "ancestor_scan",
            Strategy::GlobalScan => "global_scan",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse trust label on a match set. Not a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Confidence for a non-fallback strategy: sets more than three times the
    /// sample count are suspiciously broad.
    pub fn for_counts(matches: usize, samples: usize) -> Self {
        if matches <= samples.saturating_mul(3) {
            Confidence::High
        } else {
            Confidence::Medium
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        })
    }
}

/// A structural query produced by one strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSelector {
    /// CSS selector text.
    pub query: String,
    pub strategy: Strategy,
    pub confidence: Confidence,
}

/// Outcome of running the pipeline on a set of samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Matched elements in document order.
    pub matches: Vec<ElementKey>,
    pub selector: Option<CandidateSelector>,
    pub confidence: Confidence,
}

impl MatchResult {
    /// No rule could be learned.
    pub fn empty() -> Self {
        Self {
            matches: Vec::new(),
            selector: None,
            confidence: Confidence::Low,
        }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn contains(&self, key: ElementKey) -> bool {
        self.matches.binary_search(&key).is_ok()
    }

    pub fn strategy(&self) -> Option<Strategy> {
        self.selector.as_ref().map(|s| s.strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_for_counts() {
        assert_eq!(Confidence::for_counts(5, 2), Confidence::High);
        assert_eq!(Confidence::for_counts(6, 2), Confidence::High);
        assert_eq!(Confidence::for_counts(7, 2), Confidence::Medium);
    }

    #[test]
    fn test_strategy_order() {
        assert_eq!(Strategy::ORDER[0], Strategy::CommonSelector);
        assert_eq!(Strategy::ORDER[3], Strategy::GlobalScan);
    }

    #[test]
    fn test_match_result_serializes() {
        let result = MatchResult {
            matches: vec![ElementKey(3), ElementKey(9)],
            selector: Some(CandidateSelector {
                query: "div.listing".to_string(),
                strategy: Strategy::CommonSelector,
                confidence: Confidence::High,
            }),
            confidence: Confidence::High,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["selector"]["strategy"], "common_selector");
        assert_eq!(json["confidence"], "high");
        assert_eq!(json["matches"][1], 9);
    }
}
