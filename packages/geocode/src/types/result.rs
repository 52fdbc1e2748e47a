//! The outcome of resolving one query.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider-reported precision of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchQuality {
    RooftopExact,
    RangeInterpolated,
    GeometricCenter,
    Approximate,
}

impl fmt::Display for MatchQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchQuality::RooftopExact => "rooftop-exact",
            MatchQuality::RangeInterpolated => "range-interpolated",
            MatchQuality::GeometricCenter => "geometric-center",
            MatchQuality::Approximate => "approximate",
        })
    }
}

/// A single resolved location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub formatted_address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,

    /// Only reported by providers that grade their matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_quality: Option<MatchQuality>,

    /// Provider matched only part of the query.
    #[serde(default)]
    pub partial_match: bool,

    /// Coordinates were typed in by a person, not returned by a provider.
    #[serde(default)]
    pub manual: bool,
}

impl Location {
    pub fn new(lat: f64, lng: f64, formatted_address: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            formatted_address: formatted_address.into(),
            place_id: None,
            match_quality: None,
            partial_match: false,
            manual: false,
        }
    }

    /// A location entered by hand for `address`.
    pub fn manual(lat: f64, lng: f64, address: impl Into<String>) -> Self {
        Self {
            manual: true,
            ..Self::new(lat, lng, address)
        }
    }

    pub fn with_place_id(mut self, place_id: impl Into<String>) -> Self {
        self.place_id = Some(place_id.into());
        self
    }

    pub fn with_match_quality(mut self, quality: MatchQuality) -> Self {
        self.match_quality = Some(quality);
        self
    }

    pub fn with_partial_match(mut self, partial: bool) -> Self {
        self.partial_match = partial;
        self
    }
}

/// Why a provider call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Transport failure or server error
    Network,
    /// Provider asked us to slow down
    RateLimited,
    /// Missing, invalid or rejected credential
    Auth,
    /// Provider refused the query itself
    InvalidRequest,
    /// Provider answered with something we could not read
    InvalidResponse,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::Network => "network",
            FailureKind::RateLimited => "rate limited",
            FailureKind::Auth => "auth",
            FailureKind::InvalidRequest => "invalid request",
            FailureKind::InvalidResponse => "invalid response",
        })
    }
}

/// Result of resolving one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GeocodeResult {
    /// Exactly one location.
    Resolved(Location),

    /// Several plausible locations, in provider rank order. A person picks one.
    NeedsDisambiguation { candidates: Vec<Location> },

    /// Valid query, nothing found. A person may supply coordinates.
    NotFound,

    /// The provider call failed.
    Failed {
        message: String,
        retryable: bool,
        kind: FailureKind,
    },
}

impl GeocodeResult {
    /// Classify a ranked candidate list.
    pub fn from_candidates(mut candidates: Vec<Location>) -> Self {
        match candidates.len() {
            0 => GeocodeResult::NotFound,
            1 => GeocodeResult::Resolved(candidates.remove(0)),
            _ => GeocodeResult::NeedsDisambiguation { candidates },
        }
    }

    /// A failure. Only rate limiting is worth retrying.
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        GeocodeResult::Failed {
            message: message.into(),
            retryable: kind == FailureKind::RateLimited,
            kind,
        }
    }

    /// Failures are transient and never cached.
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, GeocodeResult::Failed { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            GeocodeResult::Resolved(_) => "resolved",
            GeocodeResult::NeedsDisambiguation { .. } => "needs_disambiguation",
            GeocodeResult::NotFound => "not_found",
            GeocodeResult::Failed { .. } => "failed",
        }
    }
}
