use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::event::{Event, EventDate, EventId, GameEvent, PlacementState};
use crate::placement::{PlacementError, Selection};
use crate::pool;
use crate::score::ScoreTracker;

/// Reasons a saved state is refused on load.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("event {0} appears more than once")]
    DuplicateId(EventId),
    #[error("event {id} is not below the next id {next_id}")]
    IdNotAllocated { id: EventId, next_id: u32 },
    #[error("unplaced event {0} is placed or already judged")]
    StaleUnplaced(EventId),
    #[error("placed event {0} is not marked placed and judged")]
    UnjudgedPlaced(EventId),
    #[error("placed events are not in chronological order")]
    OutOfOrder,
    #[error("selection does not match the selected unplaced event")]
    SelectionMismatch,
    #[error("score {score} exceeds the maximum {max}")]
    ScoreTooHigh { score: u32, max: u32 },
}

#[derive(Deserialize)]
struct RawGameState {
    unplaced: Vec<GameEvent>,
    ordered: Vec<GameEvent>,
    score: ScoreTracker,
    #[serde(default)]
    selection: Selection,
    next_id: u32,
}

/// Authoritative state of one game session.
///
/// Every event in play lives in exactly one of `unplaced` or `ordered`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "RawGameState")]
pub struct GameState {
    pub(crate) unplaced: Vec<GameEvent>,
    pub(crate) ordered: Vec<GameEvent>,
    pub(crate) score: ScoreTracker,
    pub(crate) selection: Selection,
    next_id: u32,
}

impl TryFrom<RawGameState> for GameState {
    type Error = StateError;

    fn try_from(raw: RawGameState) -> Result<Self, Self::Error> {
        let mut seen = HashSet::new();
        for event in raw.ordered.iter().chain(raw.unplaced.iter()) {
            let id = event.id();
            if !seen.insert(id) {
                return Err(StateError::DuplicateId(id));
            }
            if id.0 >= raw.next_id {
                return Err(StateError::IdNotAllocated {
                    id,
                    next_id: raw.next_id,
                });
            }
        }
        if let Some(stale) = raw
            .unplaced
            .iter()
            .find(|e| e.placement() == PlacementState::Placed || e.verdict().is_judged())
        {
            return Err(StateError::StaleUnplaced(stale.id()));
        }
        if let Some(unjudged) = raw
            .ordered
            .iter()
            .find(|e| e.placement() != PlacementState::Placed || !e.verdict().is_judged())
        {
            return Err(StateError::UnjudgedPlaced(unjudged.id()));
        }
        if !raw.ordered.windows(2).all(|w| w[0].date() <= w[1].date()) {
            return Err(StateError::OutOfOrder);
        }
        let mut marked = raw
            .unplaced
            .iter()
            .filter(|e| e.placement() == PlacementState::Selected)
            .map(GameEvent::id);
        let consistent = match raw.selection.selected() {
            Some(id) => marked.next() == Some(id) && marked.next().is_none(),
            None => marked.next().is_none(),
        };
        if !consistent {
            return Err(StateError::SelectionMismatch);
        }

        let mut state = Self {
            unplaced: raw.unplaced,
            ordered: raw.ordered,
            score: raw.score,
            selection: raw.selection,
            next_id: raw.next_id,
        };
        let max = ScoreTracker::max_for(state.total_in_play());
        let score = state.score.current_score();
        if score > max {
            return Err(StateError::ScoreTooHigh { score, max });
        }
        state.refresh_max_score();
        Ok(state)
    }
}

impl GameState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh state with every event unplaced, in the given order.
    #[must_use]
    pub fn with_events(events: Vec<Event>) -> Self {
        let mut state = Self::new();
        state.extend_unplaced(events);
        state
    }

    #[must_use]
    pub fn unplaced(&self) -> &[GameEvent] {
        &self.unplaced
    }

    #[must_use]
    pub fn ordered(&self) -> &[GameEvent] {
        &self.ordered
    }

    #[must_use]
    pub const fn score(&self) -> &ScoreTracker {
        &self.score
    }

    #[must_use]
    pub const fn current_score(&self) -> u32 {
        self.score.current_score()
    }

    #[must_use]
    pub const fn max_score(&self) -> u32 {
        self.score.max_score()
    }

    #[must_use]
    pub fn total_in_play(&self) -> usize {
        self.unplaced.len() + self.ordered.len()
    }

    /// True once every event in play has been placed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty() && !self.ordered.is_empty()
    }

    /// Iterate over every in-play event, placed events first.
    pub fn in_play(&self) -> impl Iterator<Item = &GameEvent> {
        self.ordered.iter().chain(self.unplaced.iter())
    }

    #[must_use]
    pub fn in_play_dates(&self) -> HashSet<EventDate> {
        pool::in_play_dates(self.in_play())
    }

    #[must_use]
    pub fn get(&self, id: EventId) -> Option<&GameEvent> {
        self.in_play().find(|e| e.id() == id)
    }

    /// Current position of a placed event. Shifts as other events are placed.
    #[must_use]
    pub fn sequence_index(&self, id: EventId) -> Option<usize> {
        self.ordered.iter().position(|e| e.id() == id)
    }

    /// True when `ordered` is sorted by date, earliest first.
    #[must_use]
    pub fn is_chronological(&self) -> bool {
        self.ordered.windows(2).all(|w| w[0].date() <= w[1].date())
    }

    /// Events for sharing: placed events first, then unplaced, as plain records.
    #[must_use]
    pub fn share_events(&self) -> Vec<Event> {
        self.in_play().map(|e| e.event().clone()).collect()
    }

    /// Add events to `unplaced`, returning their new ids.
    ///
    /// No date de-duplication happens here; that is the pool's job.
    pub fn extend_unplaced(&mut self, events: Vec<Event>) -> Vec<EventId> {
        let ids = events
            .into_iter()
            .map(|event| {
                let id = self.allocate_id();
                self.unplaced.push(GameEvent::new(id, event));
                id
            })
            .collect();
        self.refresh_max_score();
        ids
    }

    /// Manually add a single event to `unplaced`.
    pub fn add_event(&mut self, event: Event) -> EventId {
        log::debug!("manual add: {event}");
        self.extend_unplaced(vec![event])[0]
    }

    /// Remove an unplaced event from play.
    ///
    /// # Errors
    ///
    /// Placed events can never be removed ([`PlacementError::PermissionDenied`]);
    /// unknown ids yield [`PlacementError::UnknownEvent`].
    pub fn remove_event(&mut self, id: EventId) -> Result<Event, PlacementError> {
        if self.ordered.iter().any(|e| e.id() == id) {
            log::warn!("refused to remove placed event {id}");
            return Err(PlacementError::PermissionDenied(id));
        }
        let index = self
            .unplaced
            .iter()
            .position(|e| e.id() == id)
            .ok_or(PlacementError::UnknownEvent(id))?;
        if self.selection.selected() == Some(id) {
            self.selection = Selection::Idle;
        }
        let removed = self.unplaced.remove(index);
        self.refresh_max_score();
        Ok(removed.into_event())
    }

    /// Put every event back into `unplaced` as a fresh, unjudged entity and zero the score.
    pub fn reset_to_unsorted(&mut self) {
        let events = self.share_events();
        self.unplaced.clear();
        self.ordered.clear();
        self.selection = Selection::Idle;
        self.score.reset();
        self.extend_unplaced(events);
        log::debug!("reset {} events to unsorted", self.total_in_play());
    }

    /// Drop every event and zero the score.
    pub fn clear(&mut self) {
        self.unplaced.clear();
        self.ordered.clear();
        self.selection = Selection::Idle;
        self.score.reset();
        self.refresh_max_score();
    }

    fn allocate_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    pub(crate) fn refresh_max_score(&mut self) {
        self.score.recompute_max_score(self.total_in_play());
    }

    pub(crate) fn set_placement(&mut self, id: EventId, placement: PlacementState) {
        if let Some(event) = self.unplaced.iter_mut().find(|e| e.id() == id) {
            event.set_placement(placement);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Verdict;

    fn events(records: &[(&str, &str)]) -> Vec<Event> {
        records
            .iter()
            .map(|(name, date)| Event::new(*name, date).unwrap())
            .collect()
    }

    #[test]
    fn with_events_tracks_max_score() {
        let state = GameState::with_events(events(&[
            ("A", "2000-01-01"),
            ("B", "1990-01-01"),
            ("C", "2010-01-01"),
        ]));
        assert_eq!(state.unplaced().len(), 3);
        assert_eq!(state.max_score(), 2);
        assert_eq!(state.current_score(), 0);
        assert!(!state.is_complete());
    }

    #[test]
    fn manual_add_allows_duplicate_dates() {
        let mut state = GameState::with_events(events(&[("A", "2000-01-01")]));
        let id = state.add_event(Event::new("A again", "2000-01-01").unwrap());
        assert_eq!(state.total_in_play(), 2);
        assert_eq!(state.in_play_dates().len(), 1);
        assert_eq!(state.get(id).unwrap().name(), "A again");
        assert_eq!(state.max_score(), 1);
    }

    #[test]
    fn removing_placed_event_is_denied() {
        let mut state = GameState::with_events(events(&[("A", "2000-01-01"), ("B", "1990-01-01")]));
        let first = state.unplaced()[0].id();
        state.select(first).unwrap();
        state.commit_at(0).unwrap();
        let before = state.clone();
        assert_eq!(
            state.remove_event(first),
            Err(PlacementError::PermissionDenied(first))
        );
        assert_eq!(state, before);
    }

    #[test]
    fn removing_unplaced_event_updates_max() {
        let mut state = GameState::with_events(events(&[("A", "2000-01-01"), ("B", "1990-01-01")]));
        let id = state.unplaced()[1].id();
        state.select(id).unwrap();
        let removed = state.remove_event(id).unwrap();
        assert_eq!(removed.name(), "B");
        assert_eq!(state.max_score(), 0);
        assert_eq!(state.selection, Selection::Idle);
        assert_eq!(
            state.remove_event(id),
            Err(PlacementError::UnknownEvent(id))
        );
    }

    #[test]
    fn reset_to_unsorted_creates_fresh_entities() {
        let mut state = GameState::with_events(events(&[
            ("A", "2000-01-01"),
            ("B", "1990-01-01"),
            ("C", "2010-01-01"),
        ]));
        let b = state.unplaced()[1].id();
        state.select(b).unwrap();
        state.commit_at(0).unwrap();
        let a = state.unplaced()[0].id();
        state.select(a).unwrap();
        state.commit_at(1).unwrap();
        assert_eq!(state.current_score(), 1);

        state.reset_to_unsorted();
        assert!(state.ordered().is_empty());
        assert_eq!(state.unplaced().len(), 3);
        assert_eq!(state.current_score(), 0);
        assert_eq!(state.max_score(), 2);
        assert!(
            state
                .unplaced()
                .iter()
                .all(|e| e.verdict() == Verdict::Unjudged && e.id() != a && e.id() != b)
        );
        let names: Vec<_> = state.unplaced().iter().map(GameEvent::name).collect();
        assert_eq!(names, ["B", "A", "C"]);
    }

    #[test]
    fn share_events_lists_placed_first() {
        let mut state = GameState::with_events(events(&[("A", "2000-01-01"), ("B", "1990-01-01")]));
        let b = state.unplaced()[1].id();
        state.select(b).unwrap();
        state.commit_at(0).unwrap();
        let names: Vec<_> = state.share_events().iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, ["B", "A"]);
    }

    fn saved_game() -> serde_json::Value {
        let mut state = GameState::with_events(events(&[
            ("A", "2000-01-01"),
            ("B", "1990-01-01"),
            ("C", "2010-01-01"),
        ]));
        let b = state.unplaced()[1].id();
        state.select(b).unwrap();
        state.commit_at(0).unwrap();
        let a = state.unplaced()[0].id();
        state.select(a).unwrap();
        state.commit_at(1).unwrap();
        serde_json::to_value(&state).unwrap()
    }

    fn load(value: serde_json::Value) -> Result<GameState, String> {
        serde_json::from_value(value).map_err(|e| e.to_string())
    }

    #[test]
    fn saved_state_loads_back() {
        let saved = saved_game();
        let state = load(saved.clone()).unwrap();
        assert_eq!(serde_json::to_value(&state).unwrap(), saved);
        assert_eq!(state.current_score(), 1);
        assert_eq!(state.max_score(), 2);
    }

    #[test]
    fn tampered_state_is_refused() {
        let mut low_id = saved_game();
        low_id["next_id"] = serde_json::json!(1);
        assert!(load(low_id).unwrap_err().contains("next id"));

        let mut duplicate = saved_game();
        duplicate["unplaced"][0]["id"] = duplicate["ordered"][0]["id"].clone();
        assert!(load(duplicate).unwrap_err().contains("more than once"));

        let mut inflated = saved_game();
        inflated["score"]["score"] = serde_json::json!(5);
        assert!(load(inflated).unwrap_err().contains("exceeds the maximum"));

        let mut swapped = saved_game();
        let first = swapped["ordered"][0].clone();
        swapped["ordered"][0] = swapped["ordered"][1].clone();
        swapped["ordered"][1] = first;
        assert!(load(swapped).unwrap_err().contains("chronological"));

        let mut dangling = saved_game();
        dangling["selection"] = serde_json::json!({ "Selected": 0 });
        assert!(load(dangling).unwrap_err().contains("selection"));
    }
}
