//! Per-provider request spacing.
//!
//! Each provider gets one slot. Acquiring a permit waits until the configured
//! interval has passed since the *previous request finished*, and the permit
//! is held for the whole request, so concurrent callers queue up behind each
//! other instead of bursting. Slow requests therefore push the next one back
//! rather than eating into its delay.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::providers::ProviderKind;

lazy_static! {
    static ref GLOBAL: RateLimiter = RateLimiter::new(RateLimitConfig::default());
}

/// Minimum spacing between requests, per provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Default: 1.1s (Nominatim's usage policy allows one request per second).
    pub nominatim: Duration,

    /// Default: 100ms.
    pub google: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            nominatim: Duration::from_millis(1100),
            google: Duration::from_millis(100),
        }
    }
}

impl RateLimitConfig {
    /// No spacing at all.
    pub fn disabled() -> Self {
        Self {
            nominatim: Duration::ZERO,
            google: Duration::ZERO,
        }
    }

    pub fn interval(&self, provider: ProviderKind) -> Duration {
        match provider {
            ProviderKind::Nominatim => self.nominatim,
            ProviderKind::Google => self.google,
        }
    }

    pub fn with_interval(mut self, provider: ProviderKind, interval: Duration) -> Self {
        match provider {
            ProviderKind::Nominatim => self.nominatim = interval,
            ProviderKind::Google => self.google = interval,
        }
        self
    }
}

/// Completion time of the last request through a slot.
type Slot = Arc<Mutex<Option<Instant>>>;

/// Shared request spacing. Clones share the same slots.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    nominatim: Slot,
    google: Slot,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            nominatim: Arc::new(Mutex::new(None)),
            google: Arc::new(Mutex::new(None)),
        }
    }

    /// The process-wide limiter with default spacing.
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Wait for this provider's turn. Hold the permit until the request has
    /// completed; dropping it starts the next interval.
    pub async fn acquire(&self, provider: ProviderKind) -> RatePermit {
        let slot = match provider {
            ProviderKind::Nominatim => Arc::clone(&self.nominatim),
            ProviderKind::Google => Arc::clone(&self.google),
        };

        let guard = slot.lock_owned().await;
        if let Some(last) = *guard {
            let ready_at = last + self.config.interval(provider);
            if ready_at > Instant::now() {
                debug!(provider = %provider, wait_ms = (ready_at - Instant::now()).as_millis() as u64, "rate limiting");
                sleep_until(ready_at).await;
            }
        }

        RatePermit { guard }
    }
}

/// Exclusive right to send one request to a provider.
pub struct RatePermit {
    guard: OwnedMutexGuard<Option<Instant>>,
}

impl Drop for RatePermit {
    fn drop(&mut self) {
        *self.guard = Some(Instant::now());
    }
}
