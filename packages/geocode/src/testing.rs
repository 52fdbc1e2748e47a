//! Testing utilities including mock implementations.
//!
//! These let applications exercise the orchestrator without network access
//! or a real database.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{StoreError, StoreResult};
use crate::providers::{GeocodeProvider, ProviderKind};
use crate::stores::KeyValueStore;
use crate::types::{GeocodeResult, Location};

/// A scripted provider.
///
/// Returns the result registered for a query, matched exactly, and
/// [`GeocodeResult::NotFound`] for anything else. Every call is recorded.
#[derive(Debug, Clone)]
pub struct MockProvider {
    kind: ProviderKind,

    /// Predefined results by query
    results: Arc<RwLock<HashMap<String, GeocodeResult>>>,

    /// Queries received, in order
    calls: Arc<RwLock<Vec<String>>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(ProviderKind::Nominatim)
    }
}

impl MockProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            results: Arc::default(),
            calls: Arc::default(),
        }
    }

    /// Add a predefined result for a query.
    pub fn with_result(self, query: impl Into<String>, result: GeocodeResult) -> Self {
        self.results
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(query.into(), result);
        self
    }

    /// Resolve `query` to a single location.
    pub fn with_location(self, query: impl Into<String>, lat: f64, lng: f64, formatted: &str) -> Self {
        self.with_result(query, GeocodeResult::Resolved(Location::new(lat, lng, formatted)))
    }

    /// Answer `query` with several ranked candidates.
    pub fn with_candidates(self, query: impl Into<String>, candidates: Vec<Location>) -> Self {
        self.with_result(query, GeocodeResult::NeedsDisambiguation { candidates })
    }

    /// Get all queries made to this mock.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[async_trait]
impl GeocodeProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn resolve(&self, query: &str) -> GeocodeResult {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.to_string());

        self.results
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(query)
            .cloned()
            .unwrap_or(GeocodeResult::NotFound)
    }
}

/// A store whose every operation fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStore;

impl FailingStore {
    fn error() -> StoreError {
        StoreError::Backend("store unavailable".into())
    }
}

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        Err(Self::error())
    }

    async fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
        Err(Self::error())
    }

    async fn delete_prefix(&self, _prefix: &str) -> StoreResult<usize> {
        Err(Self::error())
    }

    async fn len(&self) -> StoreResult<usize> {
        Err(Self::error())
    }
}
