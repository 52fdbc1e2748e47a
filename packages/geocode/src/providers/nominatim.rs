//! Nominatim (OpenStreetMap) geocoding.
//!
//! Free and keyless, but the public instance allows roughly one request per
//! second per client. Spacing is enforced by the orchestrator's
//! [`RateLimiter`](crate::RateLimiter), not here.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{failure_for_status, failure_for_transport, GeocodeProvider, ProviderKind, REQUEST_TIMEOUT};
use crate::error::Result;
use crate::types::{FailureKind, GeocodeResult, Location};

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = concat!("mapmark/", env!("CARGO_PKG_VERSION"));

/// Candidates requested per query.
const RESULT_LIMIT: usize = 5;

/// One entry of a `/search?format=jsonv2` response.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    place_id: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct NominatimProvider {
    client: reqwest::Client,
    base_url: String,
    email: Option<String>,
}

impl NominatimProvider {
    pub fn new(base_url: impl Into<String>, user_agent: &str, email: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            email,
        })
    }
}

#[async_trait]
impl GeocodeProvider for NominatimProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Nominatim
    }

    #[instrument(skip(self), fields(provider = "nominatim"))]
    async fn resolve(&self, query: &str) -> GeocodeResult {
        let limit = RESULT_LIMIT.to_string();
        let mut params = vec![("q", query), ("format", "jsonv2"), ("limit", limit.as_str())];
        if let Some(email) = &self.email {
            params.push(("email", email.as_str()));
        }

        let response = match self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&params)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Nominatim request failed");
                return failure_for_transport(&e);
            }
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => interpret_response(status, &body),
            Err(e) => {
                warn!(error = %e, "failed to read Nominatim response");
                failure_for_transport(&e)
            }
        }
    }
}

/// Translate a Nominatim HTTP response into a result.
pub fn interpret_response(status: u16, body: &str) -> GeocodeResult {
    if !(200..300).contains(&status) {
        return failure_for_status(status);
    }

    let places: Vec<NominatimPlace> = match serde_json::from_str(body) {
        Ok(places) => places,
        Err(e) => {
            return GeocodeResult::failed(
                FailureKind::InvalidResponse,
                format!("unreadable Nominatim response: {}", e),
            )
        }
    };

    let mut candidates = Vec::with_capacity(places.len());
    for place in places {
        let (Ok(lat), Ok(lng)) = (place.lat.parse::<f64>(), place.lon.parse::<f64>()) else {
            return GeocodeResult::failed(
                FailureKind::InvalidResponse,
                format!("invalid coordinates in Nominatim response: {}, {}", place.lat, place.lon),
            );
        };

        let mut location = Location::new(lat, lng, place.display_name);
        if let Some(id) = place.place_id {
            location = location.with_place_id(id.to_string());
        }
        candidates.push(location);
    }

    debug!(candidates = candidates.len(), "Nominatim answered");
    GeocodeResult::from_candidates(candidates)
}
