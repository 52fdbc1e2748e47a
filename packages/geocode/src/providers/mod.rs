//! Geocoding providers.
//!
//! Two backends sit behind [`GeocodeProvider`]: the open-data Nominatim
//! service and the Google Geocoding API. The set is closed, so the choice is
//! made once per batch as a [`Provider`] value rather than re-checked on every
//! call.

pub mod google;
pub mod nominatim;

pub use google::GoogleProvider;
pub use nominatim::NominatimProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::credentials::ApiKey;
use crate::error::{GeocodeError, Result};
use crate::types::{FailureKind, GeocodeResult};

/// Request timeout for provider calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Identifies a provider, for cache scoping and rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Nominatim,
    Google,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Nominatim, ProviderKind::Google];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Nominatim => "nominatim",
            ProviderKind::Google => "google",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = GeocodeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nominatim" | "osm" | "openstreetmap" => Ok(ProviderKind::Nominatim),
            "google" => Ok(ProviderKind::Google),
            _ => Err(GeocodeError::UnknownProvider {
                name: s.to_string(),
            }),
        }
    }
}

/// Resolves free-text queries to locations.
///
/// Implementations never return errors: every failure is a
/// [`GeocodeResult::Failed`] value, and more than one candidate is always
/// reported as [`GeocodeResult::NeedsDisambiguation`].
#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn resolve(&self, query: &str) -> GeocodeResult;
}

/// The configured provider for a batch.
#[derive(Debug, Clone)]
pub enum Provider {
    Nominatim(NominatimProvider),
    Google(GoogleProvider),
}

#[async_trait]
impl GeocodeProvider for Provider {
    fn kind(&self) -> ProviderKind {
        match self {
            Provider::Nominatim(_) => ProviderKind::Nominatim,
            Provider::Google(_) => ProviderKind::Google,
        }
    }

    async fn resolve(&self, query: &str) -> GeocodeResult {
        match self {
            Provider::Nominatim(p) => p.resolve(query).await,
            Provider::Google(p) => p.resolve(query).await,
        }
    }
}

/// Provider selection and settings.
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    Nominatim {
        /// Default: `https://nominatim.openstreetmap.org`.
        base_url: String,
        /// Nominatim's usage policy requires an identifying user agent.
        user_agent: String,
        /// Contact address sent with each request.
        email: Option<String>,
    },
    Google {
        api_key: Option<ApiKey>,
        /// Default: `https://maps.googleapis.com`.
        base_url: String,
        /// Region bias, as a ccTLD code.
        region: Option<String>,
    },
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::nominatim()
    }
}

impl ProviderConfig {
    pub fn nominatim() -> Self {
        ProviderConfig::Nominatim {
            base_url: nominatim::DEFAULT_BASE_URL.to_string(),
            user_agent: nominatim::DEFAULT_USER_AGENT.to_string(),
            email: None,
        }
    }

    pub fn google(api_key: Option<ApiKey>) -> Self {
        ProviderConfig::Google {
            api_key,
            base_url: google::DEFAULT_BASE_URL.to_string(),
            region: None,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderConfig::Nominatim { .. } => ProviderKind::Nominatim,
            ProviderConfig::Google { .. } => ProviderKind::Google,
        }
    }

    /// Override the service base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        match &mut self {
            ProviderConfig::Nominatim { base_url, .. } | ProviderConfig::Google { base_url, .. } => {
                *base_url = url.into();
            }
        }
        self
    }

    pub fn build(self) -> Result<Provider> {
        Ok(match self {
            ProviderConfig::Nominatim {
                base_url,
                user_agent,
                email,
            } => Provider::Nominatim(NominatimProvider::new(base_url, &user_agent, email)?),
            ProviderConfig::Google {
                api_key,
                base_url,
                region,
            } => Provider::Google(GoogleProvider::new(api_key, base_url, region)?),
        })
    }
}

/// Map a non-success HTTP status to a failure.
pub(crate) fn failure_for_status(status: u16) -> GeocodeResult {
    let kind = match status {
        429 | 503 => FailureKind::RateLimited,
        401 | 403 => FailureKind::Auth,
        400..=499 => FailureKind::InvalidRequest,
        500..=599 => FailureKind::Network,
        _ => FailureKind::InvalidResponse,
    };
    GeocodeResult::failed(kind, format!("provider returned HTTP {}", status))
}

/// Map a transport error to a failure.
pub(crate) fn failure_for_transport(error: &reqwest::Error) -> GeocodeResult {
    if error.is_timeout() {
        GeocodeResult::failed(FailureKind::Network, "provider request timed out")
    } else if error.is_decode() {
        GeocodeResult::failed(FailureKind::InvalidResponse, format!("unreadable response: {}", error))
    } else {
        GeocodeResult::failed(FailureKind::Network, format!("request failed: {}", error))
    }
}
