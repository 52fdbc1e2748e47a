//! Configuration types for matching and exclusion.

use serde::{Deserialize, Serialize};

/// Class and attribute prefix the tool uses for its own markers.
pub const DEFAULT_RESERVED_PREFIX: &str = "mapmark-";

/// Configuration for the match strategy pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Minimum similarity for a candidate to join the match set.
    ///
    /// Default: 0.6.
    pub threshold: f64,

    /// Threshold used when refining a match set after exclusions.
    ///
    /// Default: 0.7.
    pub refine_threshold: f64,

    /// Multiplier applied to the threshold by the global fallback strategy.
    ///
    /// Default: 0.8.
    pub global_threshold_factor: f64,

    /// Upper bound on the number of matches the global fallback may return.
    /// The highest-scoring candidates are kept. `None` disables the cap.
    ///
    /// Default: 500.
    pub global_result_cap: Option<usize>,

    /// Maximum number of shared classes in a synthesized selector.
    ///
    /// Default: 3.
    pub max_common_classes: usize,

    /// Reserved class/attribute namespace ignored by fingerprinting.
    pub reserved_prefix: String,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            refine_threshold: 0.7,
            global_threshold_factor: 0.8,
            global_result_cap: Some(500),
            max_common_classes: 3,
            reserved_prefix: DEFAULT_RESERVED_PREFIX.to_string(),
        }
    }
}

impl MatchConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the similarity threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the refinement threshold.
    pub fn with_refine_threshold(mut self, threshold: f64) -> Self {
        self.refine_threshold = threshold;
        self
    }

    /// Set the global fallback threshold multiplier.
    pub fn with_global_threshold_factor(mut self, factor: f64) -> Self {
        self.global_threshold_factor = factor;
        self
    }

    /// Set (or remove) the global fallback result cap.
    pub fn with_global_result_cap(mut self, cap: Option<usize>) -> Self {
        self.global_result_cap = cap;
        self
    }

    /// Set the reserved namespace prefix.
    pub fn with_reserved_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reserved_prefix = prefix.into();
        self
    }
}

/// Thresholds for excluding look-alikes when the user excludes one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoExcludeConfig {
    /// Structural similarity required together with textual similarity.
    pub structural_threshold: f64,

    /// Textual similarity required together with structural similarity.
    pub textual_threshold: f64,

    /// Structural similarity that excludes on its own.
    pub structural_only_threshold: f64,
}

impl Default for AutoExcludeConfig {
    fn default() -> Self {
        Self {
            structural_threshold: 0.75,
            textual_threshold: 0.3,
            structural_only_threshold: 0.9,
        }
    }
}

impl AutoExcludeConfig {
    /// Whether a match this similar to an excluded element goes with it.
    pub fn should_exclude(&self, structural: f64, textual: f64) -> bool {
        structural >= self.structural_only_threshold
            || (structural >= self.structural_threshold && textual >= self.textual_threshold)
    }

    /// A config that never auto-excludes anything.
    pub fn disabled() -> Self {
        Self {
            structural_threshold: f64::INFINITY,
            textual_threshold: f64::INFINITY,
            structural_only_threshold: f64::INFINITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MatchConfig::default();
        assert_eq!(config.threshold, 0.6);
        assert_eq!(config.refine_threshold, 0.7);
        assert_eq!(config.global_threshold_factor, 0.8);
        assert_eq!(config.global_result_cap, Some(500));
    }

    #[test]
    fn test_builder() {
        let config = MatchConfig::new()
            .with_threshold(0.5)
            .with_global_result_cap(None)
            .with_reserved_prefix("x-");
        assert_eq!(config.threshold, 0.5);
        assert_eq!(config.global_result_cap, None);
        assert_eq!(config.reserved_prefix, "x-");
    }

    #[test]
    fn test_auto_exclude_rule() {
        let config = AutoExcludeConfig::default();

        // Structurally close and textually alike
        assert!(config.should_exclude(0.95, 0.4));
        assert!(config.should_exclude(0.8, 0.3));

        // Structurally close but textually different
        assert!(!config.should_exclude(0.8, 0.2));

        // Near-identical structure needs no textual support
        assert!(config.should_exclude(0.9, 0.0));

        // Structurally distant
        assert!(!config.should_exclude(0.5, 1.0));
    }

    #[test]
    fn test_disabled_never_excludes() {
        let config = AutoExcludeConfig::disabled();
        assert!(!config.should_exclude(1.0, 1.0));
    }
}
