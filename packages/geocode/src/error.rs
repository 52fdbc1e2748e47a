//! Typed errors for the geocode library.
//!
//! Provider failures (network, rate limiting, bad credentials) are not errors
//! here: they are [`GeocodeResult::Failed`](crate::GeocodeResult::Failed)
//! values, recorded per item so a batch never aborts on one bad address.

use thiserror::Error;

use crate::orchestrator::Phase;

/// Errors raised while setting up geocoding.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// Provider name not recognized
    #[error("unknown provider: {name}")]
    UnknownProvider { name: String },

    /// Cache storage failed
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from the cache persistence boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Storage backend failed
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A cached value could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from driving the orchestrator with the wrong input.
///
/// The orchestrator's state is unchanged whenever one of these is returned.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Event not valid in the current phase
    #[error("cannot {event} while {phase}")]
    InvalidTransition { phase: Phase, event: &'static str },

    /// Disambiguation choice outside the candidate list
    #[error("candidate {index} out of range (have {len})")]
    CandidateOutOfRange { index: usize, len: usize },

    /// Manual coordinates outside the valid range
    #[error("invalid coordinates ({lat}, {lng})")]
    InvalidCoordinates { lat: f64, lng: f64 },

    /// Snapshot does not describe a reachable state
    #[error("cannot restore orchestrator state: {0}")]
    Restore(String),
}

/// Result type alias for geocode setup operations.
pub type Result<T> = std::result::Result<T, GeocodeError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for orchestrator events.
pub type OrchestratorResult<T> = std::result::Result<T, OrchestratorError>;
