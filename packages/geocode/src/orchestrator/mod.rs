//! Batch geocoding with human-in-the-loop suspension.
//!
//! [`GeocodeOrchestrator`] walks a queue of [`QueryItem`]s one at a time:
//! cache, then rate limiter, then provider. It stops whenever a person has to
//! decide something (several candidates, or nothing found) and picks up again
//! when the decision arrives as an event. All bookkeeping lives in
//! [`OrchestratorState`], which is pure and serializable; this module only
//! adds the I/O.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut orch = GeocodeOrchestrator::new(provider, GeocodeCache::new(MemoryStore::new()));
//! let mut phase = orch.start(QueryItem::batch(addresses, Some("Springfield, IL"))).await?;
//! while phase != Phase::Done {
//!     phase = match phase {
//!         Phase::SuspendedOnDisambiguation => orch.choose(0).await?,
//!         _ => orch.skip().await?,
//!     };
//! }
//! let outcome = orch.outcome();
//! ```

pub mod state;

pub use state::{
    Event, ItemError, ItemErrorReason, OrchestratorState, PendingItem, Phase, ResolvedItem, SkipCause,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::cache::GeocodeCache;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::output::BatchOutcome;
use crate::providers::GeocodeProvider;
use crate::rate_limit::RateLimiter;
use crate::stores::KeyValueStore;
use crate::types::{GeocodeResult, QueryItem};

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Candidates kept per lookup, in provider rank order. Default: 5.
    /// Values below 1 are treated as 1.
    pub max_candidates: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { max_candidates: 5 }
    }
}

impl OrchestratorConfig {
    pub fn with_max_candidates(mut self, max: usize) -> Self {
        self.max_candidates = max.max(1);
        self
    }

    /// The cap actually applied to candidate lists.
    pub fn candidate_cap(&self) -> usize {
        self.max_candidates.max(1)
    }
}

/// Drives [`OrchestratorState`] against a provider and a cache.
pub struct GeocodeOrchestrator<G, S> {
    provider: G,
    cache: GeocodeCache<S>,
    limiter: RateLimiter,
    config: OrchestratorConfig,
    state: OrchestratorState,
}

impl<G: GeocodeProvider, S: KeyValueStore> GeocodeOrchestrator<G, S> {
    /// New idle orchestrator sharing the process-wide rate limiter.
    pub fn new(provider: G, cache: GeocodeCache<S>) -> Self {
        Self {
            provider,
            cache,
            limiter: RateLimiter::global(),
            config: OrchestratorConfig::default(),
            state: OrchestratorState::new(),
        }
    }

    /// Pick up a saved state. A restored `Running` state continues on the
    /// next [`resume`](Self::resume).
    pub fn restore(provider: G, cache: GeocodeCache<S>, state: OrchestratorState) -> OrchestratorResult<Self> {
        state.validate()?;
        let mut orch = Self::new(provider, cache);
        orch.state = state;
        Ok(orch)
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// The item awaiting a decision, if suspended.
    pub fn pending(&self) -> Option<&PendingItem> {
        self.state.pending.as_ref()
    }

    pub fn provider(&self) -> &G {
        &self.provider
    }

    pub fn cache(&self) -> &GeocodeCache<S> {
        &self.cache
    }

    /// Begin a batch and run until it finishes or needs a decision.
    pub async fn start(&mut self, queue: Vec<QueryItem>) -> OrchestratorResult<Phase> {
        let total = queue.len();
        self.state.apply(Event::Start(queue))?;
        info!(provider = %self.provider.kind(), total, "geocoding batch started");
        self.drain().await
    }

    /// Resolve the pending item to one of its candidates.
    pub async fn choose(&mut self, index: usize) -> OrchestratorResult<Phase> {
        self.state.apply(Event::Choose(index))?;
        self.drain().await
    }

    /// Resolve the pending item to hand-entered coordinates.
    pub async fn provide_coordinates(&mut self, lat: f64, lng: f64) -> OrchestratorResult<Phase> {
        self.state.apply(Event::ProvideCoordinates { lat, lng })?;
        self.drain().await
    }

    /// Give up on the pending item.
    pub async fn skip(&mut self) -> OrchestratorResult<Phase> {
        self.state.apply(Event::Skip)?;
        self.drain().await
    }

    /// Continue a `Running` batch, e.g. after [`restore`](Self::restore).
    /// Suspended and finished batches are left as they are.
    pub async fn resume(&mut self) -> OrchestratorResult<Phase> {
        match self.state.phase {
            Phase::Running => self.drain().await,
            Phase::Idle => Err(OrchestratorError::InvalidTransition {
                phase: Phase::Idle,
                event: "resume",
            }),
            phase => Ok(phase),
        }
    }

    /// Drop the pending item and everything after it. Resolved items are
    /// kept in the state.
    pub fn cancel(&mut self) -> Phase {
        let dropped = self.state.remaining();
        // Cancel is accepted in every phase
        let phase = self.state.apply(Event::Cancel).unwrap_or(Phase::Idle);
        info!(dropped, kept = self.state.resolved.len(), "geocoding batch cancelled");
        phase
    }

    /// Final output, once the batch is done.
    pub fn outcome(&self) -> Option<BatchOutcome> {
        (self.state.phase == Phase::Done)
            .then(|| BatchOutcome::new(self.state.resolved.clone(), self.state.errors.clone()))
    }

    async fn drain(&mut self) -> OrchestratorResult<Phase> {
        while let Some(item) = self.state.current().cloned() {
            let result = self.lookup(&item).await;
            let phase = self.state.apply(Event::Looked(result))?;
            if phase.is_suspended() {
                debug!(address = %item.source_address, phase = %phase, "waiting for a decision");
            }
        }

        if self.state.phase == Phase::Done {
            info!(
                resolved = self.state.resolved.len(),
                errors = self.state.errors.len(),
                "geocoding batch finished"
            );
        }
        Ok(self.state.phase)
    }

    #[instrument(skip(self, item), fields(provider = %self.provider.kind(), query = %item.query_address))]
    async fn lookup(&self, item: &QueryItem) -> GeocodeResult {
        let kind = self.provider.kind();
        let query = item.query_address.as_str();

        match self.cache.get(kind, query).await {
            Ok(Some(hit)) => return self.cap_candidates(hit),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "cache read failed, treating as miss"),
        }

        let result = {
            let _permit = self.limiter.acquire(kind).await;
            self.provider.resolve(query).await
        };
        let result = self.cap_candidates(result);
        debug!(status = result.status(), "looked up");

        if let Err(e) = self.cache.put(kind, query, &result).await {
            warn!(error = %e, "cache write failed");
        }
        result
    }

    fn cap_candidates(&self, result: GeocodeResult) -> GeocodeResult {
        let cap = self.config.candidate_cap();
        match result {
            GeocodeResult::NeedsDisambiguation { mut candidates } if candidates.len() > cap => {
                debug!(returned = candidates.len(), kept = cap, "dropping low-ranked candidates");
                candidates.truncate(cap);
                GeocodeResult::from_candidates(candidates)
            }
            other => other,
        }
    }
}
