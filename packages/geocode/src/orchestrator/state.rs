//! The orchestrator's state and its pure transitions.
//!
//! Nothing in this module does I/O. Every change of state goes through
//! [`OrchestratorState::apply`], which either moves the machine forward or
//! rejects the event and leaves the state untouched. The state serializes, so
//! a suspended batch can be saved and picked up later.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::types::{FailureKind, GeocodeResult, Location, QueryItem};

/// Where the machine is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Running,
    /// Waiting for a person to pick one of several candidates.
    SuspendedOnDisambiguation,
    /// Waiting for a person to supply coordinates or skip.
    SuspendedOnNotFound,
    Done,
}

impl Phase {
    pub fn is_suspended(self) -> bool {
        matches!(self, Phase::SuspendedOnDisambiguation | Phase::SuspendedOnNotFound)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Idle => "idle",
            Phase::Running => "running",
            Phase::SuspendedOnDisambiguation => "awaiting disambiguation",
            Phase::SuspendedOnNotFound => "awaiting coordinates",
            Phase::Done => "done",
        })
    }
}

/// A query and where it resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedItem {
    pub item: QueryItem,
    pub location: Location,
}

/// Why a suspended item was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipCause {
    Ambiguous,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ItemErrorReason {
    /// A person skipped the item instead of resolving it.
    Skipped { cause: SkipCause },
    /// The provider call failed.
    Failed {
        message: String,
        retryable: bool,
        kind: FailureKind,
    },
}

impl fmt::Display for ItemErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemErrorReason::Skipped { cause: SkipCause::Ambiguous } => f.write_str("skipped (ambiguous)"),
            ItemErrorReason::Skipped { cause: SkipCause::NotFound } => f.write_str("skipped (not found)"),
            ItemErrorReason::Failed { message, retryable, .. } => {
                write!(f, "{}", message)?;
                if *retryable {
                    f.write_str(" (retryable)")?;
                }
                Ok(())
            }
        }
    }
}

/// An item that ended without a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemError {
    pub item: QueryItem,
    pub reason: ItemErrorReason,
}

/// The item the machine is suspended on, with the result that suspended it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingItem {
    pub item: QueryItem,
    pub result: GeocodeResult,
}

impl PendingItem {
    /// Candidates to choose from; empty unless disambiguating.
    pub fn candidates(&self) -> &[Location] {
        match &self.result {
            GeocodeResult::NeedsDisambiguation { candidates } => candidates,
            _ => &[],
        }
    }
}

/// Inputs that drive the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Begin a new batch.
    Start(Vec<QueryItem>),
    /// The current item was looked up.
    Looked(GeocodeResult),
    /// Pick a disambiguation candidate by index.
    Choose(usize),
    /// Supply coordinates for an item nobody could find.
    ProvideCoordinates { lat: f64, lng: f64 },
    /// Give up on the suspended item.
    Skip,
    /// Abandon the rest of the batch.
    Cancel,
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Event::Start(_) => "start",
            Event::Looked(_) => "record a lookup",
            Event::Choose(_) => "choose",
            Event::ProvideCoordinates { .. } => "provide coordinates",
            Event::Skip => "skip",
            Event::Cancel => "cancel",
        }
    }
}

/// Serializable orchestrator state.
///
/// `cursor` indexes the item in flight. It only moves while nothing is
/// pending, and every item before it is accounted for in exactly one of
/// `resolved` or `errors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorState {
    pub phase: Phase,
    pub queue: Vec<QueryItem>,
    pub cursor: usize,
    pub resolved: Vec<ResolvedItem>,
    pub errors: Vec<ItemError>,
    pub pending: Option<PendingItem>,
}

impl OrchestratorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. On error the state is unchanged.
    pub fn apply(&mut self, event: Event) -> OrchestratorResult<Phase> {
        let invalid = |phase: Phase, event: &Event| OrchestratorError::InvalidTransition {
            phase,
            event: event.name(),
        };

        match (self.phase, event) {
            (Phase::Idle | Phase::Done, Event::Start(queue)) => {
                self.queue = queue;
                self.cursor = 0;
                self.resolved.clear();
                self.errors.clear();
                self.pending = None;
                self.phase = Phase::Running;
                self.finish_if_drained();
            }

            (Phase::Running, Event::Looked(result)) => {
                let Some(item) = self.queue.get(self.cursor).cloned() else {
                    return Err(invalid(self.phase, &Event::Looked(result)));
                };
                self.record(item, result);
            }

            (Phase::SuspendedOnDisambiguation, Event::Choose(index)) => {
                let len = self.pending.as_ref().map_or(0, |p| p.candidates().len());
                if index >= len {
                    return Err(OrchestratorError::CandidateOutOfRange { index, len });
                }
                if let Some(pending) = self.pending.take() {
                    let location = pending.candidates()[index].clone();
                    self.resolve(pending.item, location);
                }
            }

            (Phase::SuspendedOnNotFound, Event::ProvideCoordinates { lat, lng }) => {
                if !valid_coordinates(lat, lng) {
                    return Err(OrchestratorError::InvalidCoordinates { lat, lng });
                }
                if let Some(pending) = self.pending.take() {
                    let location = Location::manual(lat, lng, pending.item.source_address.clone());
                    self.resolve(pending.item, location);
                }
            }

            (phase, Event::Skip) if phase.is_suspended() => {
                let cause = match phase {
                    Phase::SuspendedOnDisambiguation => SkipCause::Ambiguous,
                    _ => SkipCause::NotFound,
                };
                if let Some(pending) = self.pending.take() {
                    self.fail(pending.item, ItemErrorReason::Skipped { cause });
                }
            }

            (_, Event::Cancel) => {
                self.pending = None;
                self.queue.truncate(self.cursor);
                self.phase = Phase::Idle;
            }

            (phase, event) => return Err(invalid(phase, &event)),
        }

        Ok(self.phase)
    }

    /// The item to look up next, or `None` if the machine is not ready for
    /// one.
    pub fn current(&self) -> Option<&QueryItem> {
        if self.phase == Phase::Running {
            self.queue.get(self.cursor)
        } else {
            None
        }
    }

    /// Items not yet looked up, including the one in flight.
    pub fn remaining(&self) -> usize {
        self.queue.len().saturating_sub(self.cursor)
    }

    /// Check that a deserialized state could have been reached by
    /// [`OrchestratorState::apply`].
    pub fn validate(&self) -> OrchestratorResult<()> {
        let fail = |msg: &str| Err(OrchestratorError::Restore(msg.to_string()));

        if self.cursor > self.queue.len() {
            return fail("cursor is past the end of the queue");
        }
        if self.resolved.len() + self.errors.len() != self.cursor {
            return fail("outcomes do not match the cursor");
        }
        match (self.phase, &self.pending) {
            (Phase::SuspendedOnDisambiguation, Some(p)) if p.candidates().len() >= 2 => {}
            (Phase::SuspendedOnNotFound, Some(p)) if p.result == GeocodeResult::NotFound => {}
            (Phase::SuspendedOnDisambiguation | Phase::SuspendedOnNotFound, _) => {
                return fail("suspended without a matching pending item");
            }
            (_, Some(_)) => return fail("pending item outside a suspended phase"),
            (_, None) => {}
        }
        if self.phase.is_suspended() && self.cursor >= self.queue.len() {
            return fail("suspended with nothing in flight");
        }
        if self.phase == Phase::Done && self.cursor != self.queue.len() {
            return fail("done with items remaining");
        }
        Ok(())
    }

    fn record(&mut self, item: QueryItem, result: GeocodeResult) {
        // A one-candidate list is a plain resolution
        let result = match result {
            GeocodeResult::NeedsDisambiguation { candidates } => GeocodeResult::from_candidates(candidates),
            other => other,
        };

        match result {
            GeocodeResult::Resolved(location) => self.resolve(item, location),
            GeocodeResult::NeedsDisambiguation { .. } => {
                self.pending = Some(PendingItem { item, result });
                self.phase = Phase::SuspendedOnDisambiguation;
            }
            GeocodeResult::NotFound => {
                self.pending = Some(PendingItem { item, result });
                self.phase = Phase::SuspendedOnNotFound;
            }
            GeocodeResult::Failed {
                message,
                retryable,
                kind,
            } => self.fail(
                item,
                ItemErrorReason::Failed {
                    message,
                    retryable,
                    kind,
                },
            ),
        }
    }

    fn resolve(&mut self, item: QueryItem, location: Location) {
        self.resolved.push(ResolvedItem { item, location });
        self.advance();
    }

    fn fail(&mut self, item: QueryItem, reason: ItemErrorReason) {
        self.errors.push(ItemError { item, reason });
        self.advance();
    }

    fn advance(&mut self) {
        self.cursor += 1;
        self.phase = Phase::Running;
        self.finish_if_drained();
    }

    fn finish_if_drained(&mut self) {
        if self.phase == Phase::Running && self.cursor >= self.queue.len() {
            self.phase = Phase::Done;
        }
    }
}

fn valid_coordinates(lat: f64, lng: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(addresses: &[&str]) -> Vec<QueryItem> {
        QueryItem::batch(addresses.iter().copied(), None)
    }

    fn two_candidates() -> GeocodeResult {
        GeocodeResult::NeedsDisambiguation {
            candidates: vec![
                Location::new(1.0, 1.0, "100 Elm St, Town A"),
                Location::new(2.0, 2.0, "100 Elm St, Town B"),
            ],
        }
    }

    #[test]
    fn test_start_resets_and_runs() {
        let mut state = OrchestratorState::new();
        assert_eq!(state.apply(Event::Start(queue(&["a", "b"]))).unwrap(), Phase::Running);
        assert_eq!(state.current().unwrap().source_address, "a");
        assert_eq!(state.remaining(), 2);
    }

    #[test]
    fn test_empty_queue_is_done_immediately() {
        let mut state = OrchestratorState::new();
        assert_eq!(state.apply(Event::Start(vec![])).unwrap(), Phase::Done);
    }

    #[test]
    fn test_resolved_advances_and_finishes() {
        let mut state = OrchestratorState::new();
        state.apply(Event::Start(queue(&["a"]))).unwrap();
        let phase = state
            .apply(Event::Looked(GeocodeResult::Resolved(Location::new(1.0, 2.0, "A"))))
            .unwrap();
        assert_eq!(phase, Phase::Done);
        assert_eq!(state.resolved.len(), 1);
        assert_eq!(state.cursor, 1);
    }

    #[test]
    fn test_suspends_and_cursor_holds() {
        let mut state = OrchestratorState::new();
        state.apply(Event::Start(queue(&["elm", "b"]))).unwrap();
        let phase = state.apply(Event::Looked(two_candidates())).unwrap();
        assert_eq!(phase, Phase::SuspendedOnDisambiguation);
        assert_eq!(state.cursor, 0);
        assert!(state.current().is_none());
        assert_eq!(state.pending.as_ref().unwrap().candidates().len(), 2);

        assert_eq!(state.apply(Event::Choose(1)).unwrap(), Phase::Running);
        assert_eq!(state.resolved[0].location.formatted_address, "100 Elm St, Town B");
        assert_eq!(state.cursor, 1);
        assert!(state.pending.is_none());
    }

    #[test]
    fn test_single_candidate_list_resolves() {
        let mut state = OrchestratorState::new();
        state.apply(Event::Start(queue(&["a"]))).unwrap();
        let one = GeocodeResult::NeedsDisambiguation {
            candidates: vec![Location::new(1.0, 1.0, "only")],
        };
        assert_eq!(state.apply(Event::Looked(one)).unwrap(), Phase::Done);
        assert_eq!(state.resolved.len(), 1);
    }

    #[test]
    fn test_manual_coordinates() {
        let mut state = OrchestratorState::new();
        state.apply(Event::Start(queue(&["Unknown Place Name"]))).unwrap();
        assert_eq!(
            state.apply(Event::Looked(GeocodeResult::NotFound)).unwrap(),
            Phase::SuspendedOnNotFound
        );

        let err = state
            .apply(Event::ProvideCoordinates { lat: 91.0, lng: 0.0 })
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidCoordinates { .. }));
        assert_eq!(state.phase, Phase::SuspendedOnNotFound);

        let phase = state
            .apply(Event::ProvideCoordinates { lat: 37.0, lng: -122.0 })
            .unwrap();
        assert_eq!(phase, Phase::Done);
        let location = &state.resolved[0].location;
        assert!(location.manual);
        assert_eq!((location.lat, location.lng), (37.0, -122.0));
        assert_eq!(location.formatted_address, "Unknown Place Name");
    }

    #[test]
    fn test_nan_coordinates_are_rejected() {
        let mut state = OrchestratorState::new();
        state.apply(Event::Start(queue(&["x"]))).unwrap();
        state.apply(Event::Looked(GeocodeResult::NotFound)).unwrap();
        assert!(state
            .apply(Event::ProvideCoordinates { lat: f64::NAN, lng: 0.0 })
            .is_err());
    }

    #[test]
    fn test_skip_records_error() {
        let mut state = OrchestratorState::new();
        state.apply(Event::Start(queue(&["elm"]))).unwrap();
        state.apply(Event::Looked(two_candidates())).unwrap();
        assert_eq!(state.apply(Event::Skip).unwrap(), Phase::Done);
        assert_eq!(
            state.errors[0].reason,
            ItemErrorReason::Skipped { cause: SkipCause::Ambiguous }
        );
        assert!(state.resolved.is_empty());
    }

    #[test]
    fn test_failures_record_and_continue() {
        let mut state = OrchestratorState::new();
        state.apply(Event::Start(queue(&["a", "b"]))).unwrap();
        let phase = state
            .apply(Event::Looked(GeocodeResult::failed(FailureKind::Network, "down")))
            .unwrap();
        assert_eq!(phase, Phase::Running);
        assert_eq!(state.errors.len(), 1);
        assert_eq!(state.cursor, 1);
    }

    #[test]
    fn test_wrong_phase_events_leave_state_unchanged() {
        let mut state = OrchestratorState::new();
        state.apply(Event::Start(queue(&["a", "b"]))).unwrap();
        let before = state.clone();

        for event in [
            Event::Choose(0),
            Event::Skip,
            Event::ProvideCoordinates { lat: 0.0, lng: 0.0 },
            Event::Start(queue(&["c"])),
        ] {
            let err = state.apply(event).unwrap_err();
            assert!(matches!(err, OrchestratorError::InvalidTransition { phase: Phase::Running, .. }));
            assert_eq!(state, before);
        }

        state.apply(Event::Looked(two_candidates())).unwrap();
        let before = state.clone();
        let err = state.apply(Event::Choose(2)).unwrap_err();
        assert!(matches!(err, OrchestratorError::CandidateOutOfRange { index: 2, len: 2 }));
        assert_eq!(state, before);
    }

    #[test]
    fn test_cancel_keeps_resolved_and_drops_the_rest() {
        let mut state = OrchestratorState::new();
        state.apply(Event::Start(queue(&["a", "elm", "c"]))).unwrap();
        state
            .apply(Event::Looked(GeocodeResult::Resolved(Location::new(1.0, 1.0, "A"))))
            .unwrap();
        state.apply(Event::Looked(two_candidates())).unwrap();

        assert_eq!(state.apply(Event::Cancel).unwrap(), Phase::Idle);
        assert!(state.pending.is_none());
        assert_eq!(state.resolved.len(), 1);
        assert_eq!(state.queue.len(), 1);
        assert!(state.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inconsistent_snapshots() {
        let mut state = OrchestratorState::new();
        state.apply(Event::Start(queue(&["a", "b"]))).unwrap();
        state.apply(Event::Looked(GeocodeResult::NotFound)).unwrap();
        assert!(state.validate().is_ok());

        let mut broken = state.clone();
        broken.pending = None;
        assert!(matches!(broken.validate(), Err(OrchestratorError::Restore(_))));

        let mut broken = state.clone();
        broken.cursor = 2;
        assert!(broken.validate().is_err());

        let mut broken = state;
        broken.phase = Phase::Done;
        assert!(broken.validate().is_err());
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut state = OrchestratorState::new();
        state.apply(Event::Start(queue(&["elm", "b"]))).unwrap();
        state.apply(Event::Looked(two_candidates())).unwrap();

        let json = serde_json::to_string(&state).unwrap();
        let back: OrchestratorState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
        assert_eq!(back.phase, Phase::SuspendedOnDisambiguation);
    }
}
