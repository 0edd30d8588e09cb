//! Selection and placement state machine.
//!
//! One unplaced event may be selected at a time. While selected, the ordered
//! sequence offers `len + 1` insertion slots. Committing to a slot moves the
//! event into the sequence, judges it once against the dates already placed,
//! and relocates it to its chronological slot if the guess was wrong.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::{EventId, PlacementState, Verdict};
use crate::state::GameState;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PlacementError {
    #[error("event {0} is not waiting to be placed")]
    NotUnplaced(EventId),
    #[error("no event is selected")]
    NoSelection,
    #[error("event {0} is already placed and cannot be removed")]
    PermissionDenied(EventId),
    #[error("event {0} is not in play")]
    UnknownEvent(EventId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Selection {
    #[default]
    Idle,
    Selected(EventId),
}

impl Selection {
    #[must_use]
    pub const fn selected(self) -> Option<EventId> {
        match self {
            Self::Idle => None,
            Self::Selected(id) => Some(id),
        }
    }
}

/// A place the selected event can be committed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionSlot {
    pub index: usize,
    /// Placed event immediately before the slot.
    pub after: Option<EventId>,
    /// Placed event immediately after the slot.
    pub before: Option<EventId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    Selected { slots: usize },
    Deselected,
}

/// What happened when an event was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementOutcome {
    pub event: EventId,
    pub verdict: Verdict,
    /// Position the player chose, clamped to the sequence.
    pub actual_index: usize,
    /// Position the event belongs at among the other placed events.
    pub correct_index: usize,
    /// Position after any auto-correction.
    pub final_index: usize,
    pub scored: bool,
    pub first_placement: bool,
}

impl PlacementOutcome {
    #[must_use]
    pub const fn was_corrected(&self) -> bool {
        self.actual_index != self.final_index
    }
}

impl GameState {
    #[must_use]
    pub const fn selection(&self) -> Selection {
        self.selection
    }

    /// Select an unplaced event, or deselect it if it is already selected.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::NotUnplaced`] if the event is placed or not in play.
    /// The state is left untouched.
    pub fn select(&mut self, id: EventId) -> Result<SelectOutcome, PlacementError> {
        if !self.unplaced.iter().any(|e| e.id() == id) {
            return Err(PlacementError::NotUnplaced(id));
        }
        if self.selection.selected() == Some(id) {
            self.deselect();
            return Ok(SelectOutcome::Deselected);
        }
        self.deselect();
        self.set_placement(id, PlacementState::Selected);
        self.selection = Selection::Selected(id);
        let slots = self.ordered.len() + 1;
        log::debug!("selected {id} with {slots} slots");
        Ok(SelectOutcome::Selected { slots })
    }

    /// Clear any selection.
    pub fn deselect(&mut self) {
        if let Selection::Selected(previous) = self.selection {
            self.set_placement(previous, PlacementState::Unplaced);
        }
        self.selection = Selection::Idle;
    }

    /// Insertion slots for the current selection; empty when idle.
    #[must_use]
    pub fn insertion_slots(&self) -> Vec<InsertionSlot> {
        if self.selection.selected().is_none() {
            return Vec::new();
        }
        (0..=self.ordered.len())
            .map(|index| InsertionSlot {
                index,
                after: index
                    .checked_sub(1)
                    .and_then(|i| self.ordered.get(i))
                    .map(|e| e.id()),
                before: self.ordered.get(index).map(|e| e.id()),
            })
            .collect()
    }

    /// Commit the selected event at `slot_index`; indexes past the end append.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::NoSelection`] when idle. The state is left untouched.
    pub fn commit_at(&mut self, slot_index: usize) -> Result<PlacementOutcome, PlacementError> {
        let id = self.selection.selected().ok_or(PlacementError::NoSelection)?;
        let position = self
            .unplaced
            .iter()
            .position(|e| e.id() == id)
            .ok_or(PlacementError::NotUnplaced(id))?;

        let mut event = self.unplaced.remove(position);
        event.set_placement(PlacementState::Placed);
        let actual_index = slot_index.min(self.ordered.len());
        self.ordered.insert(actual_index, event);
        self.selection = Selection::Idle;

        let outcome = self.judge(actual_index);
        log::debug!(
            "committed {} at {} -> {} (correct slot {}, final {})",
            outcome.event,
            outcome.actual_index,
            outcome.verdict,
            outcome.correct_index,
            outcome.final_index
        );
        Ok(outcome)
    }

    /// Judge the event just inserted at `actual_index`.
    ///
    /// Equal dates do not count as earlier, so a new event lands ahead of
    /// placed events sharing its date.
    fn judge(&mut self, actual_index: usize) -> PlacementOutcome {
        let committed = &self.ordered[actual_index];
        let id = committed.id();
        let date = committed.date().clone();
        debug_assert!(
            !committed.verdict().is_judged(),
            "unplaced events are always fresh and unjudged"
        );
        let others = self.ordered.len() - 1;
        let first_placement = others == 0;
        let correct_index = self
            .ordered
            .iter()
            .enumerate()
            .filter(|(i, e)| *i != actual_index && e.date() < &date)
            .count();

        if actual_index == correct_index {
            self.ordered[actual_index].record_verdict(Verdict::Correct);
            let scored = !first_placement;
            if scored {
                self.score.award_point();
            }
            return PlacementOutcome {
                event: id,
                verdict: Verdict::Correct,
                actual_index,
                correct_index,
                final_index: actual_index,
                scored,
                first_placement,
            };
        }

        let mut misplaced = self.ordered.remove(actual_index);
        misplaced.record_verdict(Verdict::Incorrect);
        let final_index = correct_index.min(self.ordered.len());
        self.ordered.insert(final_index, misplaced);
        PlacementOutcome {
            event: id,
            verdict: Verdict::Incorrect,
            actual_index,
            correct_index,
            final_index,
            scored: false,
            first_placement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;

    fn state(records: &[(&str, &str)]) -> GameState {
        GameState::with_events(
            records
                .iter()
                .map(|(name, date)| Event::new(*name, date).unwrap())
                .collect(),
        )
    }

    fn id_of(state: &GameState, name: &str) -> EventId {
        state.in_play().find(|e| e.name() == name).unwrap().id()
    }

    fn names(state: &GameState) -> Vec<&str> {
        state.ordered().iter().map(|e| e.name()).collect()
    }

    #[test]
    fn select_toggles_and_materializes_slots() {
        let mut game = state(&[("A", "2000-01-01"), ("B", "1990-01-01")]);
        let a = id_of(&game, "A");
        assert_eq!(game.select(a), Ok(SelectOutcome::Selected { slots: 1 }));
        assert_eq!(game.get(a).unwrap().placement(), PlacementState::Selected);
        assert_eq!(game.insertion_slots().len(), 1);
        assert_eq!(game.select(a), Ok(SelectOutcome::Deselected));
        assert_eq!(game.selection(), Selection::Idle);
        assert_eq!(game.get(a).unwrap().placement(), PlacementState::Unplaced);
        assert!(game.insertion_slots().is_empty());
    }

    #[test]
    fn selecting_another_event_replaces_selection() {
        let mut game = state(&[("A", "2000-01-01"), ("B", "1990-01-01")]);
        let (a, b) = (id_of(&game, "A"), id_of(&game, "B"));
        game.select(a).unwrap();
        game.select(b).unwrap();
        assert_eq!(game.selection(), Selection::Selected(b));
        assert_eq!(game.get(a).unwrap().placement(), PlacementState::Unplaced);
    }

    #[test]
    fn select_placed_event_is_rejected_without_change() {
        let mut game = state(&[("A", "2000-01-01"), ("B", "1990-01-01")]);
        let a = id_of(&game, "A");
        game.select(a).unwrap();
        game.commit_at(0).unwrap();
        let before = game.clone();
        assert_eq!(game.select(a), Err(PlacementError::NotUnplaced(a)));
        assert_eq!(game, before);
        assert_eq!(
            game.select(EventId(999)),
            Err(PlacementError::NotUnplaced(EventId(999)))
        );
    }

    #[test]
    fn commit_without_selection_is_rejected() {
        let mut game = state(&[("A", "2000-01-01")]);
        let before = game.clone();
        assert_eq!(game.commit_at(0), Err(PlacementError::NoSelection));
        assert_eq!(game, before);
    }

    #[test]
    fn first_placement_is_correct_but_unscored() {
        let mut game = state(&[("A", "2000-01-01"), ("B", "1990-01-01"), ("C", "2010-01-01")]);
        let b = id_of(&game, "B");
        game.select(b).unwrap();
        let outcome = game.commit_at(0).unwrap();
        assert_eq!(outcome.verdict, Verdict::Correct);
        assert!(outcome.first_placement);
        assert!(!outcome.scored);
        assert_eq!(game.current_score(), 0);
        assert_eq!(names(&game), ["B"]);
    }

    #[test]
    fn wrong_slot_is_judged_incorrect_and_corrected() {
        let mut game = state(&[("A", "2000-01-01"), ("B", "1990-01-01"), ("C", "2010-01-01")]);
        let (a, b) = (id_of(&game, "A"), id_of(&game, "B"));
        game.select(b).unwrap();
        game.commit_at(0).unwrap();
        game.select(a).unwrap();
        let outcome = game.commit_at(0).unwrap();
        assert_eq!(outcome.verdict, Verdict::Incorrect);
        assert_eq!(outcome.correct_index, 1);
        assert_eq!(outcome.actual_index, 0);
        assert_eq!(outcome.final_index, 1);
        assert!(outcome.was_corrected());
        assert_eq!(game.current_score(), 0);
        assert_eq!(names(&game), ["B", "A"]);
        assert_eq!(game.sequence_index(a), Some(1));
    }

    #[test]
    fn correct_slot_scores_a_point() {
        let mut game = state(&[("A", "2000-01-01"), ("B", "1990-01-01"), ("C", "2010-01-01")]);
        let (a, b, c) = (id_of(&game, "A"), id_of(&game, "B"), id_of(&game, "C"));
        game.select(a).unwrap();
        game.commit_at(0).unwrap();
        game.select(c).unwrap();
        assert!(game.commit_at(usize::MAX).unwrap().scored);
        game.select(b).unwrap();
        let outcome = game.commit_at(0).unwrap();
        assert_eq!(outcome.verdict, Verdict::Correct);
        assert_eq!(game.current_score(), 2);
        assert_eq!(game.current_score(), game.max_score());
        assert_eq!(names(&game), ["B", "A", "C"]);
        assert!(game.is_complete());
    }

    #[test]
    fn later_corrections_never_rejudge() {
        let mut game = state(&[("A", "2000-01-01"), ("B", "1990-01-01"), ("C", "2010-01-01")]);
        let (a, b, c) = (id_of(&game, "A"), id_of(&game, "B"), id_of(&game, "C"));
        game.select(c).unwrap();
        game.commit_at(0).unwrap();
        game.select(a).unwrap();
        game.commit_at(1).unwrap();
        assert_eq!(game.get(a).unwrap().verdict(), Verdict::Incorrect);
        game.select(b).unwrap();
        game.commit_at(0).unwrap();
        assert_eq!(game.get(a).unwrap().verdict(), Verdict::Incorrect);
        assert_eq!(game.get(b).unwrap().verdict(), Verdict::Correct);
        assert_eq!(game.get(c).unwrap().verdict(), Verdict::Correct);
        assert_eq!(names(&game), ["B", "A", "C"]);
        assert_eq!(game.sequence_index(c), Some(2));
    }

    #[test]
    fn equal_dates_place_new_event_first() {
        let mut game = state(&[("Old", "1950-05-05"), ("New", "1950-05-05")]);
        let (old, new) = (id_of(&game, "Old"), id_of(&game, "New"));
        game.select(old).unwrap();
        game.commit_at(0).unwrap();
        game.select(new).unwrap();
        let outcome = game.commit_at(1).unwrap();
        assert_eq!(outcome.correct_index, 0);
        assert_eq!(outcome.verdict, Verdict::Incorrect);
        assert_eq!(names(&game), ["New", "Old"]);
        assert!(game.is_chronological());
    }

    #[test]
    fn slots_describe_neighbours() {
        let mut game = state(&[("A", "2000-01-01"), ("B", "1990-01-01"), ("C", "2010-01-01")]);
        let (a, b, c) = (id_of(&game, "A"), id_of(&game, "B"), id_of(&game, "C"));
        game.select(b).unwrap();
        game.commit_at(0).unwrap();
        game.select(a).unwrap();
        game.commit_at(1).unwrap();
        game.select(c).unwrap();
        let slots = game.insertion_slots();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].after, None);
        assert_eq!(slots[0].before, Some(b));
        assert_eq!(slots[1].after, Some(b));
        assert_eq!(slots[1].before, Some(a));
        assert_eq!(slots[2].after, Some(a));
        assert_eq!(slots[2].before, None);
    }

    #[test]
    fn replay_after_reset_is_judged_afresh() {
        let mut game = state(&[("A", "2000-01-01"), ("B", "1990-01-01")]);
        let (a, b) = (id_of(&game, "A"), id_of(&game, "B"));
        game.select(b).unwrap();
        game.commit_at(0).unwrap();
        game.select(a).unwrap();
        assert_eq!(game.commit_at(0).unwrap().verdict, Verdict::Incorrect);

        game.reset_to_unsorted();
        let (a, b) = (id_of(&game, "A"), id_of(&game, "B"));
        game.select(b).unwrap();
        game.commit_at(0).unwrap();
        game.select(a).unwrap();
        let outcome = game.commit_at(1).unwrap();
        assert_eq!(outcome.verdict, Verdict::Correct);
        assert!(outcome.scored);
        assert_eq!(game.get(a).unwrap().verdict(), Verdict::Correct);
        assert_eq!(game.current_score(), 1);
    }
}
