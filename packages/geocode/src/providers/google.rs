//! Google Geocoding API.
//!
//! Needs an API key. Reports match quality (`location_type`) and partial
//! matches, and signals most failures through a `status` field in a 200 body.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{failure_for_status, failure_for_transport, GeocodeProvider, ProviderKind, REQUEST_TIMEOUT};
use crate::credentials::ApiKey;
use crate::error::Result;
use crate::types::{FailureKind, GeocodeResult, Location, MatchQuality};

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com";

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleResult {
    formatted_address: String,
    #[serde(default)]
    place_id: Option<String>,
    geometry: GoogleGeometry,
    #[serde(default)]
    partial_match: bool,
}

#[derive(Debug, Deserialize)]
struct GoogleGeometry {
    location: GoogleLatLng,
    #[serde(default)]
    location_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleLatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Clone)]
pub struct GoogleProvider {
    client: reqwest::Client,
    api_key: Option<ApiKey>,
    base_url: String,
    region: Option<String>,
}

impl GoogleProvider {
    pub fn new(api_key: Option<ApiKey>, base_url: impl Into<String>, region: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            region,
        })
    }
}

#[async_trait]
impl GeocodeProvider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    #[instrument(skip(self), fields(provider = "google"))]
    async fn resolve(&self, query: &str) -> GeocodeResult {
        let Some(key) = self.api_key.as_ref().filter(|k| !k.is_blank()) else {
            warn!("no Google API key configured");
            return GeocodeResult::failed(FailureKind::Auth, "Google geocoding requires an API key");
        };

        let mut params = vec![("address", query), ("key", key.expose())];
        if let Some(region) = &self.region {
            params.push(("region", region.as_str()));
        }

        let response = match self
            .client
            .get(format!("{}/maps/api/geocode/json", self.base_url))
            .query(&params)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                // reqwest errors carry the URL, which includes the key
                let e = e.without_url();
                warn!(error = %e, "Google request failed");
                return failure_for_transport(&e);
            }
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => interpret_response(status, &body),
            Err(e) => {
                let e = e.without_url();
                warn!(error = %e, "failed to read Google response");
                failure_for_transport(&e)
            }
        }
    }
}

/// Translate a Google Geocoding HTTP response into a result.
pub fn interpret_response(status: u16, body: &str) -> GeocodeResult {
    if !(200..300).contains(&status) {
        return failure_for_status(status);
    }

    let response: GoogleResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => {
            return GeocodeResult::failed(
                FailureKind::InvalidResponse,
                format!("unreadable Google response: {}", e),
            )
        }
    };

    let kind = match response.status.as_str() {
        "OK" => None,
        "ZERO_RESULTS" => return GeocodeResult::NotFound,
        "OVER_QUERY_LIMIT" => Some(FailureKind::RateLimited),
        "REQUEST_DENIED" | "OVER_DAILY_LIMIT" => Some(FailureKind::Auth),
        "INVALID_REQUEST" => Some(FailureKind::InvalidRequest),
        "UNKNOWN_ERROR" => Some(FailureKind::Network),
        _ => Some(FailureKind::InvalidResponse),
    };

    if let Some(kind) = kind {
        let message = match response.error_message.as_deref().filter(|m| !m.is_empty()) {
            Some(detail) => format!("Google returned {}: {}", response.status, detail),
            None => format!("Google returned {}", response.status),
        };
        // UNKNOWN_ERROR is a server-side hiccup that may succeed on retry
        let retryable = kind == FailureKind::RateLimited || response.status == "UNKNOWN_ERROR";
        return GeocodeResult::Failed {
            message,
            retryable,
            kind,
        };
    }

    let candidates: Vec<Location> = response
        .results
        .into_iter()
        .map(|r| {
            let mut location = Location::new(r.geometry.location.lat, r.geometry.location.lng, r.formatted_address)
                .with_match_quality(match_quality(r.geometry.location_type.as_deref()))
                .with_partial_match(r.partial_match);
            if let Some(id) = r.place_id {
                location = location.with_place_id(id);
            }
            location
        })
        .collect();

    debug!(candidates = candidates.len(), "Google answered");
    GeocodeResult::from_candidates(candidates)
}

fn match_quality(location_type: Option<&str>) -> MatchQuality {
    match location_type {
        Some("ROOFTOP") => MatchQuality::RooftopExact,
        Some("RANGE_INTERPOLATED") => MatchQuality::RangeInterpolated,
        Some("GEOMETRIC_CENTER") => MatchQuality::GeometricCenter,
        _ => MatchQuality::Approximate,
    }
}
