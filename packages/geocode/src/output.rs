//! Records handed to the map at the end of a batch.

use serde::Serialize;
use std::fmt::Write as _;

use crate::orchestrator::{ItemError, ResolvedItem};
use crate::types::MatchQuality;

/// One pin on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    pub lat: f64,
    pub lng: f64,
    /// 1-based, in resolution order.
    pub label: usize,
    pub original_address: String,
    pub formatted_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_quality: Option<MatchQuality>,
    pub manual: bool,
}

/// Box enclosing every marker, for the map's "fit all".
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    fn around(lat: f64, lng: f64) -> Self {
        Self {
            south: lat,
            west: lng,
            north: lat,
            east: lng,
        }
    }

    fn extend(&mut self, lat: f64, lng: f64) {
        self.south = self.south.min(lat);
        self.north = self.north.max(lat);
        self.west = self.west.min(lng);
        self.east = self.east.max(lng);
    }
}

/// What the map sink consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub markers: Vec<MapMarker>,
    pub bounds: Option<Bounds>,
}

/// Everything a finished batch produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub resolved: Vec<ResolvedItem>,
    pub errors: Vec<ItemError>,
}

impl BatchOutcome {
    pub fn new(resolved: Vec<ResolvedItem>, errors: Vec<ItemError>) -> Self {
        Self { resolved, errors }
    }

    pub fn markers(&self) -> Vec<MapMarker> {
        self.resolved
            .iter()
            .enumerate()
            .map(|(i, r)| MapMarker {
                lat: r.location.lat,
                lng: r.location.lng,
                label: i + 1,
                original_address: r.item.source_address.clone(),
                formatted_address: r.location.formatted_address.clone(),
                match_quality: r.location.match_quality,
                manual: r.location.manual,
            })
            .collect()
    }

    /// `None` when nothing resolved.
    pub fn fit_bounds(&self) -> Option<Bounds> {
        let mut locations = self.resolved.iter().map(|r| (r.location.lat, r.location.lng));
        let (lat, lng) = locations.next()?;
        let mut bounds = Bounds::around(lat, lng);
        for (lat, lng) in locations {
            bounds.extend(lat, lng);
        }
        Some(bounds)
    }

    pub fn map_view(&self) -> MapView {
        MapView {
            markers: self.markers(),
            bounds: self.fit_bounds(),
        }
    }

    /// One line per item that did not resolve, or `None` if all did.
    pub fn error_summary(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }

        let mut summary = format!("{} of {} addresses not placed:", self.errors.len(), self.total());
        for error in &self.errors {
            let _ = write!(summary, "\n  - {}: {}", error.item.source_address, error.reason);
        }
        Some(summary)
    }

    pub fn total(&self) -> usize {
        self.resolved.len() + self.errors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{ItemErrorReason, SkipCause};
    use crate::types::{FailureKind, Location, QueryItem};

    fn resolved(address: &str, lat: f64, lng: f64) -> ResolvedItem {
        ResolvedItem {
            item: QueryItem::new(address, None),
            location: Location::new(lat, lng, format!("{}, USA", address))
                .with_match_quality(MatchQuality::RooftopExact),
        }
    }

    fn outcome() -> BatchOutcome {
        BatchOutcome::new(
            vec![
                resolved("123 Main St", 39.78, -89.65),
                resolved("456 Oak Ave", 39.80, -89.70),
                ResolvedItem {
                    item: QueryItem::new("Back lot", None),
                    location: Location::manual(39.75, -89.60, "Back lot"),
                },
            ],
            vec![
                ItemError {
                    item: QueryItem::new("100 Elm St", None),
                    reason: ItemErrorReason::Skipped { cause: SkipCause::Ambiguous },
                },
                ItemError {
                    item: QueryItem::new("9 Pine", None),
                    reason: ItemErrorReason::Failed {
                        message: "rate limited".to_string(),
                        retryable: true,
                        kind: FailureKind::RateLimited,
                    },
                },
            ],
        )
    }

    #[test]
    fn test_markers_are_labelled_in_order() {
        let markers = outcome().markers();
        assert_eq!(markers.iter().map(|m| m.label).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(markers[1].original_address, "456 Oak Ave");
        assert_eq!(markers[1].formatted_address, "456 Oak Ave, USA");
        assert!(markers[2].manual);
        assert_eq!(markers[2].match_quality, None);
    }

    #[test]
    fn test_fit_bounds() {
        let bounds = outcome().fit_bounds().unwrap();
        assert_eq!(bounds.south, 39.75);
        assert_eq!(bounds.north, 39.80);
        assert_eq!(bounds.west, -89.70);
        assert_eq!(bounds.east, -89.60);

        assert_eq!(BatchOutcome::new(vec![], vec![]).fit_bounds(), None);
    }

    #[test]
    fn test_error_summary() {
        let summary = outcome().error_summary().unwrap();
        assert!(summary.starts_with("2 of 5 addresses not placed:"));
        assert!(summary.contains("100 Elm St: skipped (ambiguous)"));
        assert!(summary.contains("9 Pine: rate limited (retryable)"));

        assert_eq!(BatchOutcome::new(vec![], vec![]).error_summary(), None);
    }

    #[test]
    fn test_map_view_json_shape() {
        let json = serde_json::to_value(outcome().map_view()).unwrap();
        let first = &json["markers"][0];
        assert_eq!(first["label"], 1);
        assert_eq!(first["originalAddress"], "123 Main St");
        assert_eq!(first["matchQuality"], "rooftop-exact");
        assert!(json["markers"][2].get("matchQuality").is_none());
        assert_eq!(json["bounds"]["north"], 39.80);
    }
}
