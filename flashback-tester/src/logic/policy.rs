use std::fmt;

use clap::ValueEnum;
use flashback_game::{EventId, GameState};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

/// Placement chosen by a [`PlayerPolicy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementDecision {
    pub event: EventId,
    pub slot: usize,
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Pick the next event and slot, or `None` when nothing is left to place.
    fn decide(&mut self, state: &GameState) -> Option<PlacementDecision>;
}

/// Built-in strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GameplayStrategy {
    /// Knows every date and always picks the right slot.
    Historian,
    /// Picks a random event and a random slot.
    Guesser,
    /// Always appends to the end of the timeline.
    Appender,
    /// Always inserts at the front of the timeline.
    Contrarian,
}

impl GameplayStrategy {
    pub const ALL: [Self; 4] = [
        Self::Historian,
        Self::Guesser,
        Self::Appender,
        Self::Contrarian,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Historian => "Historian",
            Self::Guesser => "Guesser",
            Self::Appender => "Appender",
            Self::Contrarian => "Contrarian",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            Self::Historian => Box::new(HistorianPolicy),
            Self::Guesser => Box::new(GuesserPolicy::new(seed)),
            Self::Appender => Box::new(AppenderPolicy),
            Self::Contrarian => Box::new(ContrarianPolicy),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct HistorianPolicy;
struct AppenderPolicy;
struct ContrarianPolicy;

struct GuesserPolicy {
    rng: ChaCha20Rng,
}

impl GuesserPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed ^ 0x6755_E55E),
        }
    }
}

impl PlayerPolicy for HistorianPolicy {
    fn name(&self) -> &'static str {
        "Historian"
    }

    fn decide(&mut self, state: &GameState) -> Option<PlacementDecision> {
        let next = state.unplaced().first()?;
        let slot = state
            .ordered()
            .iter()
            .filter(|placed| placed.date() < next.date())
            .count();
        Some(PlacementDecision {
            event: next.id(),
            slot,
        })
    }
}

impl PlayerPolicy for GuesserPolicy {
    fn name(&self) -> &'static str {
        "Guesser"
    }

    fn decide(&mut self, state: &GameState) -> Option<PlacementDecision> {
        if state.unplaced().is_empty() {
            return None;
        }
        let pick = self.rng.gen_range(0..state.unplaced().len());
        let slot = self.rng.gen_range(0..=state.ordered().len());
        Some(PlacementDecision {
            event: state.unplaced()[pick].id(),
            slot,
        })
    }
}

impl PlayerPolicy for AppenderPolicy {
    fn name(&self) -> &'static str {
        "Appender"
    }

    fn decide(&mut self, state: &GameState) -> Option<PlacementDecision> {
        state.unplaced().first().map(|next| PlacementDecision {
            event: next.id(),
            slot: state.ordered().len(),
        })
    }
}

impl PlayerPolicy for ContrarianPolicy {
    fn name(&self) -> &'static str {
        "Contrarian"
    }

    fn decide(&mut self, state: &GameState) -> Option<PlacementDecision> {
        state.unplaced().last().map(|next| PlacementDecision {
            event: next.id(),
            slot: 0,
        })
    }
}
