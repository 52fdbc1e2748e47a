//! # Geocode
//!
//! Turn a list of free-text addresses into map coordinates, one at a time,
//! pausing for a person whenever the answer is ambiguous or missing.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use geocode::{GeocodeCache, GeocodeOrchestrator, MemoryStore, ProviderConfig, QueryItem};
//!
//! let provider = ProviderConfig::nominatim().build()?;
//! let mut orch = GeocodeOrchestrator::new(provider, GeocodeCache::new(MemoryStore::new()));
//!
//! orch.start(QueryItem::batch(["123 Main St"], Some("Springfield, IL"))).await?;
//! if let Some(outcome) = orch.outcome() {
//!     println!("{}", serde_json::to_string(&outcome.map_view())?);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`providers`]: Nominatim and Google adapters behind [`GeocodeProvider`]
//! - [`cache`]: provider-scoped result cache over a [`KeyValueStore`]
//! - [`stores`]: storage backends (memory, SQLite with the `sqlite` feature)
//! - [`rate_limit`]: per-provider request spacing
//! - [`orchestrator`]: the suspend/resume batch state machine
//! - [`output`]: map markers and bounds
//! - [`testing`]: mock provider and store

pub mod cache;
pub mod credentials;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod providers;
pub mod rate_limit;
pub mod stores;
pub mod testing;
pub mod types;

pub use cache::{cache_key, normalize_query, GeocodeCache};
pub use credentials::ApiKey;
pub use error::{GeocodeError, OrchestratorError, OrchestratorResult, Result, StoreError, StoreResult};
pub use orchestrator::{
    GeocodeOrchestrator, ItemError, ItemErrorReason, OrchestratorConfig, OrchestratorState, PendingItem, Phase,
    ResolvedItem, SkipCause,
};
pub use output::{BatchOutcome, Bounds, MapMarker, MapView};
pub use providers::{GeocodeProvider, Provider, ProviderConfig, ProviderKind};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use stores::{KeyValueStore, MemoryStore};
pub use types::{FailureKind, GeocodeResult, Location, MatchQuality, QueryItem};

#[cfg(feature = "sqlite")]
pub use stores::SqliteStore;

// Re-export testing utilities
pub use testing::{FailingStore, MockProvider};
