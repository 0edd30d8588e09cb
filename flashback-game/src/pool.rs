//! Event sampling with date-based de-duplication
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

use crate::catalog::Catalog;
use crate::event::{Event, EventDate, GameEvent};

/// Result of a pool draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolDraw {
    pub events: Vec<Event>,
    pub requested: usize,
}

impl PoolDraw {
    /// True when fewer events were available than requested.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.events.len() < self.requested
    }

    #[must_use]
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.events.len())
    }
}

/// Dates represented by any in-play event, placed or not.
pub fn in_play_dates<'a, I>(events: I) -> HashSet<EventDate>
where
    I: IntoIterator<Item = &'a GameEvent>,
{
    events.into_iter().map(|e| e.date().clone()).collect()
}

/// Draw up to `count` catalog events whose dates are not in `excluded`.
///
/// The filtered candidates are shuffled uniformly and taken from the front,
/// skipping any date already taken by this draw. Catalog entries that share
/// a date therefore never both appear in one sample, while distinct dates
/// with the same name are allowed through. The catalog is not modified.
pub fn sample<R: Rng + ?Sized>(
    catalog: &Catalog,
    excluded: &HashSet<EventDate>,
    count: usize,
    rng: &mut R,
) -> PoolDraw {
    let mut candidates: Vec<&Event> = catalog
        .iter()
        .filter(|event| !excluded.contains(event.date()))
        .collect();
    candidates.shuffle(rng);

    let mut taken: HashSet<&EventDate> = HashSet::with_capacity(count.min(candidates.len()));
    let mut events = Vec::with_capacity(count.min(candidates.len()));
    for event in candidates {
        if events.len() == count {
            break;
        }
        if taken.insert(event.date()) {
            events.push(event.clone());
        }
    }

    if events.len() < count {
        log::warn!(
            "event pool exhausted: requested {count}, drew {}",
            events.len()
        );
    }

    PoolDraw {
        events,
        requested: count,
    }
}
