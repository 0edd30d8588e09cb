//! Score bookkeeping
use serde::{Deserialize, Serialize};

/// Current and achievable score for a session.
///
/// `max` is one less than the number of events in play, since the first
/// placement has nothing to be judged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ScoreTracker {
    score: u32,
    max: u32,
}

impl ScoreTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self { score: 0, max: 0 }
    }

    #[must_use]
    pub const fn max_for(total_in_play: usize) -> u32 {
        let total = if total_in_play > u32::MAX as usize {
            u32::MAX
        } else {
            total_in_play as u32
        };
        total.saturating_sub(1)
    }

    pub fn recompute_max_score(&mut self, total_in_play: usize) -> u32 {
        self.max = Self::max_for(total_in_play);
        debug_assert!(self.score <= self.max, "score exceeds achievable maximum");
        self.max
    }

    #[must_use]
    pub const fn current_score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub const fn max_score(&self) -> u32 {
        self.max
    }

    pub(crate) fn award_point(&mut self) {
        self.score = self.score.saturating_add(1).min(self.max);
    }

    pub(crate) const fn reset(&mut self) {
        self.score = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_score_never_negative() {
        let mut tracker = ScoreTracker::new();
        assert_eq!(tracker.recompute_max_score(0), 0);
        assert_eq!(tracker.recompute_max_score(1), 0);
        assert_eq!(tracker.recompute_max_score(10), 9);
    }

    #[test]
    fn award_is_capped_at_max() {
        let mut tracker = ScoreTracker::new();
        tracker.recompute_max_score(2);
        tracker.award_point();
        tracker.award_point();
        assert_eq!(tracker.current_score(), 1);
        tracker.reset();
        assert_eq!(tracker.current_score(), 0);
        assert_eq!(tracker.max_score(), 1);
    }
}
