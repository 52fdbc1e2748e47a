//! Provider-scoped cache of geocode results.
//!
//! Keys are `"<provider>:<normalized query>"`, where normalization lowercases
//! and collapses whitespace. Entries never expire; they live until cleared.

use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::providers::ProviderKind;
use crate::stores::KeyValueStore;
use crate::types::GeocodeResult;

/// Lowercase, trim and collapse internal whitespace.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Storage key for a query against a provider.
pub fn cache_key(provider: ProviderKind, query: &str) -> String {
    format!("{}{}", key_prefix(provider), normalize_query(query))
}

fn key_prefix(provider: ProviderKind) -> String {
    format!("{}:", provider.as_str())
}

/// Geocode results persisted in a [`KeyValueStore`].
pub struct GeocodeCache<S> {
    store: S,
}

impl<S: KeyValueStore> GeocodeCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Look up a previous result. Entries that no longer decode count as a
    /// miss.
    pub async fn get(&self, provider: ProviderKind, query: &str) -> StoreResult<Option<GeocodeResult>> {
        let key = cache_key(provider, query);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<GeocodeResult>(&raw) {
            Ok(result) if result.is_cacheable() => {
                debug!(key = %key, status = result.status(), "cache hit");
                Ok(Some(result))
            }
            Ok(_) => {
                warn!(key = %key, "ignoring cached failure");
                Ok(None)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "ignoring undecodable cache entry");
                Ok(None)
            }
        }
    }

    /// Store a result. Failures are rejected; returns whether anything was
    /// written.
    pub async fn put(&self, provider: ProviderKind, query: &str, result: &GeocodeResult) -> StoreResult<bool> {
        if !result.is_cacheable() {
            return Ok(false);
        }

        let value = serde_json::to_string(result)?;
        self.store.set(&cache_key(provider, query), &value).await?;
        Ok(true)
    }

    /// Remove every entry for one provider, or for all providers when `None`.
    /// Returns the number removed.
    pub async fn clear(&self, provider: Option<ProviderKind>) -> StoreResult<usize> {
        let providers = match provider {
            Some(p) => vec![p],
            None => ProviderKind::ALL.to_vec(),
        };

        let mut removed = 0;
        for p in providers {
            removed += self.store.delete_prefix(&key_prefix(p)).await?;
        }
        debug!(removed, "cache cleared");
        Ok(removed)
    }

    /// Number of entries across all providers.
    pub async fn len(&self) -> StoreResult<usize> {
        self.store.len().await
    }
}
